//! The unique per-world present.
//!
//! Which chunk and which tile host the present is a pure function of the
//! world seed; it does not depend on play order or load order.

use tilecraft_common::{tile_ids, ChunkCoord, ObjectKind, TileId, WorldSeed};
use tilecraft_worldgen::hash32;
use tracing::{info, warn};

use crate::chunk::Chunk;

/// Tiles of a baseline that may host the present: grass, else any land.
#[must_use]
pub fn eligible_present_tiles(baseline: &[TileId]) -> Vec<u32> {
    let pick = |wanted: fn(TileId) -> bool| -> Vec<u32> {
        baseline
            .iter()
            .enumerate()
            .filter(|&(_, &t)| wanted(t))
            .map(|(i, _)| i as u32)
            .collect()
    };
    let grass = pick(|t| t == tile_ids::GRASS);
    if grass.is_empty() {
        pick(|t| t != tile_ids::WATER)
    } else {
        grass
    }
}

/// Where the present goes for one world seed.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PresentPlan {
    chunk: ChunkCoord,
    tile_hash: u32,
}

impl PresentPlan {
    /// Plans the present among the `(2r+1)^2` chunks around the origin.
    #[must_use]
    pub fn new(world_seed: &WorldSeed, radius: u32) -> Self {
        let side = 2 * radius + 1;
        let pick = hash32(&format!("{world_seed}:present")) % (side * side);
        let r = radius as i32;
        let chunk = ChunkCoord::new((pick % side) as i32 - r, (pick / side) as i32 - r);
        Self {
            chunk,
            tile_hash: hash32(&format!("{world_seed}:present:tile")),
        }
    }

    /// Chunk chosen to host the present.
    #[must_use]
    pub const fn chunk(&self) -> ChunkCoord {
        self.chunk
    }

    /// Tile of `chunk` for the present, probing past occupied tiles.
    ///
    /// Returns local `(x, y)`, or `None` when every eligible tile is taken.
    #[must_use]
    pub fn choose_tile(&self, chunk: &Chunk) -> Option<(i32, i32)> {
        let eligible = eligible_present_tiles(chunk.baseline());
        if eligible.is_empty() {
            return None;
        }
        let start = self.tile_hash as usize % eligible.len();
        let edge = chunk.edge();
        (0..eligible.len())
            .map(|step| eligible[(start + step) % eligible.len()])
            .find(|index| !chunk.objects().contains_key(index))
            .map(|index| ((index % edge) as i32, (index / edge) as i32))
    }
}

/// Places the present at most once per process.
#[derive(Debug, Clone)]
pub struct PresentPlacer {
    plan: PresentPlan,
    placed: bool,
}

impl PresentPlacer {
    /// Creates a placer for `plan`.
    #[must_use]
    pub const fn new(plan: PresentPlan) -> Self {
        Self {
            plan,
            placed: false,
        }
    }

    /// Plan in use.
    #[must_use]
    pub const fn plan(&self) -> &PresentPlan {
        &self.plan
    }

    /// Whether the present was placed during this process.
    #[must_use]
    pub const fn placed(&self) -> bool {
        self.placed
    }

    /// Places the present into a freshly generated chunk if it is the chosen
    /// one, the present was not placed yet, and the player does not own it.
    ///
    /// Returns the local tile on placement.
    pub fn try_place(&mut self, chunk: &mut Chunk, already_owned: bool) -> Option<(i32, i32)> {
        if self.placed || already_owned || chunk.coord() != self.plan.chunk {
            return None;
        }
        let Some((x, y)) = self.plan.choose_tile(chunk) else {
            warn!("Chunk {} has no free tile for the present", chunk.coord());
            return None;
        };
        if !chunk.add_object(ObjectKind::Present, x, y) {
            return None;
        }
        self.placed = true;
        info!("Placed present in chunk {} at ({x}, {y})", chunk.coord());
        Some((x, y))
    }
}
