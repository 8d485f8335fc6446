//! Deterministic scatter of flowers and rocks over a generated chunk.

use tilecraft_common::{tile_ids, ObjectKind, TileId};

use crate::biome::BiomeDef;
use crate::rng::SeededRng;

/// Default number of eligible grass tiles per flower.
pub const DEFAULT_FLOWER_DENSITY: u32 = 30;

/// Default number of eligible land tiles per rock.
pub const DEFAULT_ROCK_DENSITY: u32 = 90;

/// Scatter densities, expressed as "one in N eligible tiles".
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ScatterDensity {
    /// One flower per this many grass tiles (0 disables flowers)
    pub flowers: u32,
    /// One rock per this many land tiles (0 disables rocks)
    pub rocks: u32,
}

impl Default for ScatterDensity {
    fn default() -> Self {
        Self {
            flowers: DEFAULT_FLOWER_DENSITY,
            rocks: DEFAULT_ROCK_DENSITY,
        }
    }
}

/// Places objects over `tiles` for a chunk of the given biome.
///
/// Tiles are visited in index order with a generator seeded from
/// `"{chunk_seed}:objects"`, so the result depends only on the chunk seed,
/// the baseline tiles, the biome and the densities. Returned entries are
/// sorted by tile index and never share a tile.
#[must_use]
pub fn scatter_objects(
    chunk_seed: u32,
    tiles: &[TileId],
    biome: &BiomeDef,
    density: ScatterDensity,
) -> Vec<(usize, ObjectKind)> {
    let mut rng = SeededRng::from_key(&format!("{chunk_seed}:objects"));
    let flowers = biome.grows_flowers();
    let mut placed = Vec::new();

    for (index, &tile) in tiles.iter().enumerate() {
        if tile == tile_ids::WATER {
            continue;
        }
        if flowers && tile == tile_ids::GRASS && rng.one_in(density.flowers) {
            let kind = ObjectKind::FLOWERS[rng.below(ObjectKind::FLOWERS.len() as u32) as usize];
            placed.push((index, kind));
            continue;
        }
        if rng.one_in(density.rocks) {
            let kind = ObjectKind::ROCKS[rng.below(ObjectKind::ROCKS.len() as u32) as usize];
            placed.push((index, kind));
        }
    }

    placed
}
