//! One active chunk: tile layer, baseline, sparse diff and object layer.
//!
//! A chunk generates its terrain synchronously on construction and keeps an
//! immutable baseline snapshot of it. Every later change is tracked twice:
//! in `overlay` (index → tile, exactly the tiles that differ from baseline)
//! for persistence, and in the dirty queue for the render budget.

use std::collections::{BTreeMap, VecDeque};
use std::sync::atomic::{AtomicU64, Ordering};

use rustc_hash::FxHashSet;
use tilecraft_common::{
    tile_ids, ChunkCoord, LocalCoord, ObjectKind, TileId, WorldSeed, CHUNK_FORMAT_VERSION,
};
use tilecraft_worldgen::{
    scatter_objects, tiles_hash, BiomeClass, BiomeDef, IslandGenerator, ScatterDensity,
};
use tracing::{trace, warn};

use crate::events::{ChunkEvent, ChunkEventSender};
use crate::render::TileLayer;
use crate::serialized::{now_millis, DiffEntry, ObjectEntry, SerializedChunk};

/// Draw order of chunk ground layers.
pub const CHUNK_LAYER_DEPTH: i32 = 0;

static NEXT_INSTANCE: AtomicU64 = AtomicU64::new(1);

/// Process-unique id of one chunk instance.
///
/// A coordinate can be evicted and regenerated; the instance id tells the two
/// objects apart so late persistence results are not applied to the wrong one.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct ChunkInstanceId(u64);

impl ChunkInstanceId {
    fn next() -> Self {
        Self(NEXT_INSTANCE.fetch_add(1, Ordering::Relaxed))
    }

    /// Creates an id from its raw value.
    #[must_use]
    pub const fn from_raw(raw: u64) -> Self {
        Self(raw)
    }

    /// Raw value.
    #[must_use]
    pub const fn raw(self) -> u64 {
        self.0
    }
}

/// Generation inputs of one chunk.
#[derive(Debug, Clone, Copy)]
pub struct ChunkSetup<'a> {
    /// Chunk coordinate
    pub coord: ChunkCoord,
    /// Seed derived from world seed and coordinate
    pub chunk_seed: u32,
    /// Tiles per edge
    pub edge: u32,
    /// Pixels per tile
    pub tile_size: u32,
    /// Registry biome of this chunk
    pub biome: &'a BiomeDef,
    /// Object scatter densities
    pub density: ScatterDensity,
}

/// One chunk of the world.
pub struct Chunk {
    coord: ChunkCoord,
    instance: ChunkInstanceId,
    edge: u32,
    chunk_seed: u32,
    biome_id: String,
    biome_class: BiomeClass,

    tiles: Vec<TileId>,
    baseline: Vec<TileId>,
    overlay: BTreeMap<u32, TileId>,

    dirty: VecDeque<u32>,
    dirty_mask: Vec<bool>,

    objects: BTreeMap<u32, ObjectKind>,

    // Indices touched interactively since construction; persisted state
    // arriving later must not overwrite them.
    local_tile_edits: FxHashSet<u32>,
    local_object_edits: FxHashSet<u32>,

    needs_save: bool,
    // A persisted document may still arrive; saving now would overwrite it.
    load_pending: bool,
    layer: Box<dyn TileLayer>,
    events: Option<ChunkEventSender>,
}

impl std::fmt::Debug for Chunk {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Chunk")
            .field("coord", &self.coord)
            .field("instance", &self.instance)
            .field("biome_id", &self.biome_id)
            .field("overlay", &self.overlay.len())
            .field("dirty", &self.dirty.len())
            .field("objects", &self.objects.len())
            .field("needs_save", &self.needs_save)
            .field("load_pending", &self.load_pending)
            .finish_non_exhaustive()
    }
}

impl Chunk {
    /// Generates a chunk and renders it in full.
    ///
    /// Terrain, baseline snapshot and scattered objects are produced before
    /// this returns. Nothing here emits mutation events.
    #[must_use]
    pub fn new(
        setup: ChunkSetup<'_>,
        mut layer: Box<dyn TileLayer>,
        events: Option<ChunkEventSender>,
    ) -> Self {
        let ChunkSetup {
            coord,
            chunk_seed,
            edge,
            tile_size,
            biome,
            density,
        } = setup;

        let tiles = IslandGenerator::new(chunk_seed, edge).generate();
        let baseline = tiles.clone();
        let objects: BTreeMap<u32, ObjectKind> =
            scatter_objects(chunk_seed, &baseline, biome, density)
                .into_iter()
                .map(|(index, kind)| (index as u32, kind))
                .collect();

        let origin = coord.pixel_origin(edge, tile_size);
        layer.set_position(origin.x, origin.y);
        layer.set_depth(CHUNK_LAYER_DEPTH);

        let area = tiles.len();
        let mut chunk = Self {
            coord,
            instance: ChunkInstanceId::next(),
            edge,
            chunk_seed,
            biome_id: biome.id.clone(),
            biome_class: biome.class,
            tiles,
            baseline,
            overlay: BTreeMap::new(),
            dirty: VecDeque::new(),
            dirty_mask: vec![false; area],
            objects,
            local_tile_edits: FxHashSet::default(),
            local_object_edits: FxHashSet::default(),
            needs_save: false,
            load_pending: false,
            layer,
            events,
        };
        chunk.render_all();

        trace!(
            "Generated chunk {} ({}, {} objects)",
            chunk.coord,
            chunk.biome_id,
            chunk.objects.len()
        );
        chunk
    }

    fn render_all(&mut self) {
        for (index, &tile) in self.tiles.iter().enumerate() {
            let local = LocalCoord::from_index(index, self.edge);
            self.layer
                .put_tile_at(tile, u32::from(local.x), u32::from(local.y));
        }
        for (&index, &kind) in &self.objects {
            let local = LocalCoord::from_index(index as usize, self.edge);
            self.layer
                .show_object(kind, u32::from(local.x), u32::from(local.y));
        }
    }

    fn index_of(&self, x: i32, y: i32) -> Option<u32> {
        let edge = self.edge as i32;
        if (0..edge).contains(&x) && (0..edge).contains(&y) {
            Some((x + y * edge) as u32)
        } else {
            None
        }
    }

    fn local_of(&self, index: u32) -> (u32, u32) {
        (index % self.edge, index / self.edge)
    }

    fn mark_dirty(&mut self, index: u32) {
        let slot = &mut self.dirty_mask[index as usize];
        if !*slot {
            *slot = true;
            self.dirty.push_back(index);
        }
    }

    fn write_tile(&mut self, index: u32, tile: TileId) -> bool {
        let i = index as usize;
        if self.tiles[i] == tile {
            return false;
        }
        self.tiles[i] = tile;
        if self.baseline[i] == tile {
            self.overlay.remove(&index);
        } else {
            self.overlay.insert(index, tile);
        }
        self.mark_dirty(index);
        true
    }

    fn touch(&mut self) {
        self.needs_save = true;
        if let Some(events) = &self.events {
            events.publish(ChunkEvent::Mutated {
                coord: self.coord,
                instance: self.instance,
            });
        }
    }

    /// Chunk coordinate.
    #[must_use]
    pub const fn coord(&self) -> ChunkCoord {
        self.coord
    }

    /// Instance id.
    #[must_use]
    pub const fn instance(&self) -> ChunkInstanceId {
        self.instance
    }

    /// Tiles per edge.
    #[must_use]
    pub const fn edge(&self) -> u32 {
        self.edge
    }

    /// Seed the terrain was generated from.
    #[must_use]
    pub const fn chunk_seed(&self) -> u32 {
        self.chunk_seed
    }

    /// Registry biome id.
    #[must_use]
    pub fn biome_id(&self) -> &str {
        &self.biome_id
    }

    /// Registry biome class.
    #[must_use]
    pub const fn biome_class(&self) -> BiomeClass {
        self.biome_class
    }

    /// Current tiles, row-major.
    #[must_use]
    pub fn tiles(&self) -> &[TileId] {
        &self.tiles
    }

    /// Generated tiles, row-major. Never changes after construction.
    #[must_use]
    pub fn baseline(&self) -> &[TileId] {
        &self.baseline
    }

    /// Tiles that differ from the baseline.
    #[must_use]
    pub const fn overlay(&self) -> &BTreeMap<u32, TileId> {
        &self.overlay
    }

    /// Object layer, keyed by tile index.
    #[must_use]
    pub const fn objects(&self) -> &BTreeMap<u32, ObjectKind> {
        &self.objects
    }

    /// Tile at local `(x, y)`; `None` out of bounds.
    #[must_use]
    pub fn tile_at(&self, x: i32, y: i32) -> Option<TileId> {
        self.index_of(x, y).map(|i| self.tiles[i as usize])
    }

    /// Sets the tile at local `(x, y)`.
    ///
    /// Returns whether anything changed. Writing the current value or writing
    /// out of bounds is a no-op and publishes nothing.
    pub fn put_tile_at(&mut self, x: i32, y: i32, tile: TileId) -> bool {
        let Some(index) = self.index_of(x, y) else {
            return false;
        };
        if !self.write_tile(index, tile) {
            return false;
        }
        self.local_tile_edits.insert(index);
        self.touch();
        true
    }

    /// Tiles waiting to be pushed to the render layer.
    #[must_use]
    pub fn dirty_count(&self) -> usize {
        self.dirty.len()
    }

    /// Pushes up to `limit` dirty tiles (all when `None`) to the render layer.
    ///
    /// Returns how many were pushed. Tiles are pushed oldest first with their
    /// current value.
    pub fn flush_dirty(&mut self, limit: Option<usize>) -> usize {
        let count = limit.map_or(self.dirty.len(), |l| l.min(self.dirty.len()));
        for _ in 0..count {
            let Some(index) = self.dirty.pop_front() else {
                break;
            };
            self.dirty_mask[index as usize] = false;
            let (x, y) = self.local_of(index);
            self.layer.put_tile_at(self.tiles[index as usize], x, y);
        }
        count
    }

    /// Object at local `(x, y)`.
    #[must_use]
    pub fn object_at(&self, x: i32, y: i32) -> Option<ObjectKind> {
        self.index_of(x, y)
            .and_then(|i| self.objects.get(&i).copied())
    }

    /// Places an object. Fails when out of bounds or the tile is occupied.
    pub fn add_object(&mut self, kind: ObjectKind, x: i32, y: i32) -> bool {
        let Some(index) = self.index_of(x, y) else {
            return false;
        };
        if self.objects.contains_key(&index) {
            return false;
        }
        self.objects.insert(index, kind);
        self.layer.show_object(kind, x as u32, y as u32);
        self.local_object_edits.insert(index);
        self.touch();
        true
    }

    /// Removes and returns the object at local `(x, y)`.
    pub fn remove_object_at(&mut self, x: i32, y: i32) -> Option<ObjectKind> {
        let index = self.index_of(x, y)?;
        let kind = self.objects.remove(&index)?;
        self.layer.clear_object(x as u32, y as u32);
        self.local_object_edits.insert(index);
        self.touch();
        Some(kind)
    }

    /// Walkable: in bounds, not water, no object.
    #[must_use]
    pub fn is_walkable(&self, x: i32, y: i32) -> bool {
        self.index_of(x, y).is_some_and(|i| {
            self.tiles[i as usize] != tile_ids::WATER && !self.objects.contains_key(&i)
        })
    }

    /// Whether the chunk changed since its last save.
    #[must_use]
    pub const fn needs_save(&self) -> bool {
        self.needs_save
    }

    /// Clears the unsaved-changes flag.
    pub fn mark_saved(&mut self) {
        self.needs_save = false;
    }

    /// Whether a requested load of the persisted document has not resolved yet.
    #[must_use]
    pub const fn load_pending(&self) -> bool {
        self.load_pending
    }

    /// Sets whether a load of the persisted document is outstanding.
    pub fn set_load_pending(&mut self, pending: bool) {
        self.load_pending = pending;
    }

    /// Hash of the current tiles.
    #[must_use]
    pub fn content_hash(&self) -> u32 {
        tiles_hash(&self.tiles)
    }

    /// Builds the persisted document: sparse diff, full object layer, timestamp.
    #[must_use]
    pub fn serialize_diff(&self, world_seed: &WorldSeed) -> SerializedChunk {
        SerializedChunk {
            version: CHUNK_FORMAT_VERSION,
            world_seed: world_seed.clone(),
            chunk_x: self.coord.x,
            chunk_y: self.coord.y,
            biome_id: Some(self.biome_id.clone()),
            diff: self
                .overlay
                .iter()
                .map(|(&i, &t)| DiffEntry { i, t })
                .collect(),
            objects: Some(
                self.objects
                    .iter()
                    .map(|(&i, &kind)| ObjectEntry { i, k: kind.id() })
                    .collect(),
            ),
            last_touched: now_millis(),
        }
    }

    /// Replays a persisted tile diff.
    ///
    /// Indices edited interactively since construction keep their value.
    /// Returns the number of tiles that changed. Publishes nothing.
    pub fn apply_diff(&mut self, entries: &[DiffEntry]) -> usize {
        let mut changed = 0;
        for entry in entries {
            if entry.i as usize >= self.tiles.len() || self.local_tile_edits.contains(&entry.i) {
                continue;
            }
            if self.write_tile(entry.i, entry.t) {
                changed += 1;
            }
        }
        changed
    }

    /// Replaces the object layer with a persisted list.
    ///
    /// Indices whose object was interactively added or removed since
    /// construction keep their current state. Unknown kind ids are skipped.
    /// Publishes nothing.
    pub fn apply_serialized_objects(&mut self, entries: &[ObjectEntry]) {
        let area = self.tiles.len();
        let mut next: BTreeMap<u32, ObjectKind> = self
            .objects
            .iter()
            .filter(|(i, _)| self.local_object_edits.contains(*i))
            .map(|(&i, &kind)| (i, kind))
            .collect();

        for entry in entries {
            if entry.i as usize >= area || self.local_object_edits.contains(&entry.i) {
                continue;
            }
            match ObjectKind::from_id(entry.k) {
                Some(kind) => {
                    next.entry(entry.i).or_insert(kind);
                },
                None => {
                    warn!(
                        "Chunk {}: skipping unknown object kind {} at {}",
                        self.coord, entry.k, entry.i
                    );
                },
            }
        }

        let removed: Vec<u32> = self
            .objects
            .keys()
            .filter(|i| !next.contains_key(*i))
            .copied()
            .collect();
        for index in removed {
            let (x, y) = self.local_of(index);
            self.layer.clear_object(x, y);
        }
        for (&index, &kind) in &next {
            if self.objects.get(&index) != Some(&kind) {
                let (x, y) = self.local_of(index);
                self.layer.show_object(kind, x, y);
            }
        }
        self.objects = next;
    }
}
