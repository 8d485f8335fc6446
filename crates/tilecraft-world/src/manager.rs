//! World manager: streamed window of chunks around the player.
//!
//! ## Overview
//!
//! The manager:
//! - Keeps every chunk within `neighbor_radius` of the player active
//! - Generates at most `max_new_chunks_per_frame` chunks per tick, queueing
//!   the rest nearest-first
//! - Saves evicted chunks and debounces saves of mutated ones
//! - Spreads a fixed dirty-tile budget over chunks each tick
//! - Places the unique present once per process
//!
//! Per tick the work runs in a fixed order: persistence completions, window
//! maintenance, mutation bookkeeping, budgeted flush, pending-load retry.

use std::collections::{BTreeMap, VecDeque};
use std::ops::Bound::{Excluded, Unbounded};
use std::sync::Arc;
use std::time::{Duration, Instant};

use glam::Vec2;
use rustc_hash::{FxHashMap, FxHashSet};
use tilecraft_common::{ChunkCoord, ObjectKind, TileCoord, TileId, TilecraftResult, WorldSeed};
use tilecraft_worldgen::{chunk_seed, BiomeRegistry};
use tracing::{debug, error, info, warn};

use crate::chunk::{Chunk, ChunkSetup};
use crate::config::WorldConfig;
use crate::events::{ChunkEvent, ChunkEventBus};
use crate::inventory::Inventory;
use crate::io::{ChunkIo, IoCompletion};
use crate::metrics::WorldMetrics;
use crate::present::{PresentPlacer, PresentPlan};
use crate::render::RenderHost;
use crate::serialized::storage_key;
use crate::store::ChunkStore;

/// Outcome of asking for a chunk.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ChunkRequest {
    /// Already active.
    Ready,
    /// Generated now.
    Created,
    /// Creation budget for this tick is spent.
    Throttled,
    /// The active-chunk cap is reached.
    AtCapacity,
}

/// Owner of all active chunks.
pub struct WorldManager {
    config: WorldConfig,
    world_seed: WorldSeed,
    registry: BiomeRegistry,
    host: Box<dyn RenderHost>,
    io: ChunkIo,
    events: ChunkEventBus,

    /// Active chunks, ordered for deterministic iteration
    chunks: BTreeMap<ChunkCoord, Chunk>,
    /// Chunk containing the player at the last window maintenance
    player_chunk: Option<ChunkCoord>,
    /// Neighbor loads waiting for creation budget (spiral order)
    pending_loads: VecDeque<ChunkCoord>,
    pending_set: FxHashSet<ChunkCoord>,
    /// Save deadlines on the tick clock, one per chunk
    pending_saves: FxHashMap<ChunkCoord, Duration>,
    /// Sum of all tick deltas
    clock: Duration,
    created_this_tick: usize,
    /// Last chunk that made flush progress
    flush_cursor: Option<ChunkCoord>,

    present: PresentPlacer,
    present_owned: bool,
    metrics: WorldMetrics,
}

impl std::fmt::Debug for WorldManager {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("WorldManager")
            .field("world_seed", &self.world_seed)
            .field("active", &self.chunks.len())
            .field("player_chunk", &self.player_chunk)
            .field("pending_loads", &self.pending_loads.len())
            .field("pending_saves", &self.pending_saves.len())
            .field("io", &self.io)
            .finish_non_exhaustive()
    }
}

impl WorldManager {
    /// Creates a manager over the default biome registry.
    pub fn new(
        config: WorldConfig,
        world_seed: impl Into<WorldSeed>,
        host: Box<dyn RenderHost>,
        store: Arc<dyn ChunkStore>,
        inventory: &dyn Inventory,
    ) -> TilecraftResult<Self> {
        Self::with_registry(
            config,
            world_seed,
            BiomeRegistry::with_defaults(),
            host,
            store,
            inventory,
        )
    }

    /// Creates a manager over a custom biome registry.
    ///
    /// Fails if the registry is empty.
    pub fn with_registry(
        mut config: WorldConfig,
        world_seed: impl Into<WorldSeed>,
        registry: BiomeRegistry,
        host: Box<dyn RenderHost>,
        store: Arc<dyn ChunkStore>,
        inventory: &dyn Inventory,
    ) -> TilecraftResult<Self> {
        config.validate();
        registry.ensure_populated()?;

        let world_seed = world_seed.into();
        let plan = PresentPlan::new(&world_seed, config.present_radius);
        let io = ChunkIo::new(store, config.io_mode);

        info!(
            "World {world_seed}: {} biomes, radius {}, store {} ({:?})",
            registry.len(),
            config.neighbor_radius,
            io.store_name(),
            io.mode()
        );
        if config.debug {
            debug!("Present planned in chunk {}", plan.chunk());
        }

        Ok(Self {
            config,
            world_seed,
            registry,
            host,
            io,
            events: ChunkEventBus::new(),
            chunks: BTreeMap::new(),
            player_chunk: None,
            pending_loads: VecDeque::new(),
            pending_set: FxHashSet::default(),
            pending_saves: FxHashMap::default(),
            clock: Duration::ZERO,
            created_this_tick: 0,
            flush_cursor: None,
            present: PresentPlacer::new(plan),
            present_owned: inventory.has_present(),
            metrics: WorldMetrics::default(),
        })
    }

    /// Runs one tick with the player at pixel position `player`.
    pub fn update(&mut self, player: Vec2, dt: Duration) {
        self.metrics.frame += 1;
        self.clock += dt;
        self.created_this_tick = 0;

        self.process_io();

        let center =
            ChunkCoord::from_pixel(player, self.config.chunk_edge, self.config.tile_size);
        if self.player_chunk != Some(center) {
            self.player_chunk = Some(center);
            self.maintain_window(center);
        }

        self.collect_mutations();
        self.fire_due_saves();
        self.flush_budgeted();
        self.retry_pending_loads();

        self.metrics.chunks_active = self.chunks.len();
        self.metrics.pending_loads = self.pending_loads.len();
    }

    /// Applies every persistence completion available now.
    pub fn process_io(&mut self) {
        for completion in self.io.drain() {
            match completion {
                IoCompletion::Loaded {
                    coord,
                    instance,
                    result,
                } => {
                    let Some(chunk) = self
                        .chunks
                        .get_mut(&coord)
                        .filter(|chunk| chunk.instance() == instance)
                    else {
                        self.metrics.stale_loads_dropped += 1;
                        debug!("Dropping stale load for chunk {coord}");
                        continue;
                    };
                    chunk.set_load_pending(false);
                    match result {
                        Ok(Some(doc)) => {
                            let changed = chunk.apply_diff(&doc.diff);
                            if let Some(objects) = &doc.objects {
                                chunk.apply_serialized_objects(objects);
                            }
                            self.metrics.loads_applied += 1;
                            if self.config.debug {
                                debug!(
                                    "Applied persisted chunk {coord}: {} diff entries, {changed} changed",
                                    doc.diff.len()
                                );
                            }
                        },
                        Ok(None) => {},
                        Err(e) => warn!("Failed to load chunk {coord}: {e}"),
                    }
                },
                IoCompletion::Saved { key, result } => match result {
                    Ok(()) => self.metrics.saves_performed += 1,
                    Err(e) => {
                        self.metrics.save_failures += 1;
                        warn!("Failed to save {key}: {e}");
                    },
                },
            }
        }
    }

    /// Blocks until queued persistence work has run, then applies it.
    pub fn sync_io(&mut self) {
        self.io.flush();
        self.process_io();
    }

    fn maintain_window(&mut self, center: ChunkCoord) {
        let radius = self.config.neighbor_radius;

        let far: Vec<ChunkCoord> = self
            .chunks
            .keys()
            .filter(|coord| coord.chebyshev_distance(center) > radius)
            .copied()
            .collect();
        for coord in far {
            self.unload_chunk(coord);
        }

        self.pending_loads.clear();
        self.pending_set.clear();
        for coord in center.spiral(radius) {
            match self.request_chunk(coord) {
                ChunkRequest::Ready | ChunkRequest::Created => {},
                ChunkRequest::Throttled | ChunkRequest::AtCapacity => {
                    if self.pending_set.insert(coord) {
                        self.pending_loads.push_back(coord);
                    }
                },
            }
        }

        if self.config.debug {
            debug!(
                "Window at {center}: {} active, {} pending",
                self.chunks.len(),
                self.pending_loads.len()
            );
        }
    }

    fn retry_pending_loads(&mut self) {
        while self.created_this_tick < self.config.max_new_chunks_per_frame {
            let Some(coord) = self.pending_loads.pop_front() else {
                break;
            };
            self.pending_set.remove(&coord);
            match self.request_chunk(coord) {
                ChunkRequest::Ready | ChunkRequest::Created => {},
                ChunkRequest::Throttled | ChunkRequest::AtCapacity => {
                    self.pending_set.insert(coord);
                    self.pending_loads.push_front(coord);
                    break;
                },
            }
        }
    }

    /// Chunk the cap fallback returns: the player's chunk, else the origin.
    #[must_use]
    pub fn primary_coord(&self) -> ChunkCoord {
        self.player_chunk.unwrap_or(ChunkCoord::ORIGIN)
    }

    /// Makes `coord` active if budget and cap allow.
    pub fn request_chunk(&mut self, coord: ChunkCoord) -> ChunkRequest {
        if self.chunks.contains_key(&coord) {
            return ChunkRequest::Ready;
        }
        if self.chunks.len() >= self.config.max_active_chunks && coord != self.primary_coord() {
            self.metrics.requests_rejected += 1;
            debug!("Chunk cap reached, rejecting {coord}");
            return ChunkRequest::AtCapacity;
        }
        if self.created_this_tick >= self.config.max_new_chunks_per_frame {
            self.metrics.requests_throttled += 1;
            return ChunkRequest::Throttled;
        }
        self.create_chunk(coord)
    }

    /// Returns the chunk at `coord`, creating it if allowed, or else the
    /// primary chunk.
    pub fn chunk_or_primary(&mut self, coord: ChunkCoord) -> Option<&Chunk> {
        let target = match self.request_chunk(coord) {
            ChunkRequest::Ready | ChunkRequest::Created => coord,
            ChunkRequest::Throttled | ChunkRequest::AtCapacity => self.primary_coord(),
        };
        self.chunks.get(&target)
    }

    fn create_chunk(&mut self, coord: ChunkCoord) -> ChunkRequest {
        let started = Instant::now();
        let biome = match self
            .registry
            .pick_chunk_biome(&self.world_seed, coord.x, coord.y)
        {
            Ok(biome) => biome,
            Err(e) => {
                error!("Cannot pick biome for chunk {coord}: {e}");
                return ChunkRequest::Throttled;
            },
        };

        let edge = self.config.chunk_edge;
        let layer = self.host.create_layer(edge, edge);
        let mut chunk = Chunk::new(
            ChunkSetup {
                coord,
                chunk_seed: chunk_seed(&self.world_seed, coord.x, coord.y),
                edge,
                tile_size: self.config.tile_size,
                biome,
                density: self.config.scatter_density(),
            },
            layer,
            Some(self.events.sender()),
        );
        self.present.try_place(&mut chunk, self.present_owned);

        self.io
            .request_load(storage_key(&self.world_seed, coord), coord, chunk.instance());
        chunk.set_load_pending(true);
        if self.config.debug {
            debug!("Created chunk {coord} ({})", chunk.biome_id());
        }
        self.chunks.insert(coord, chunk);
        self.created_this_tick += 1;
        self.metrics.record_generation(started.elapsed());
        ChunkRequest::Created
    }

    fn unload_chunk(&mut self, coord: ChunkCoord) {
        let unmerged = self
            .chunks
            .get(&coord)
            .is_some_and(|chunk| chunk.needs_save() && chunk.load_pending());
        if unmerged {
            self.sync_io();
        }
        let Some(mut chunk) = self.chunks.remove(&coord) else {
            return;
        };
        self.pending_saves.remove(&coord);
        if chunk.needs_save() {
            Self::enqueue_save(&mut self.io, &self.world_seed, &mut chunk);
        }
        self.metrics.chunks_unloaded += 1;
        if self.config.debug {
            debug!("Unloaded chunk {coord}");
        }
    }

    fn enqueue_save(io: &mut ChunkIo, world_seed: &WorldSeed, chunk: &mut Chunk) {
        let data = chunk.serialize_diff(world_seed);
        io.request_save(storage_key(world_seed, chunk.coord()), data);
        chunk.mark_saved();
    }

    fn collect_mutations(&mut self) {
        let deadline = self.clock + self.config.save_debounce();
        for event in self.events.drain() {
            match event {
                ChunkEvent::Mutated { coord, instance } => {
                    let live = self
                        .chunks
                        .get(&coord)
                        .is_some_and(|chunk| chunk.instance() == instance);
                    if live {
                        self.pending_saves.entry(coord).or_insert(deadline);
                    }
                },
            }
        }
    }

    fn fire_due_saves(&mut self) {
        let due: Vec<ChunkCoord> = self
            .pending_saves
            .iter()
            .filter(|&(_, &deadline)| deadline <= self.clock)
            .map(|(&coord, _)| coord)
            .collect();
        for coord in due {
            match self.chunks.get_mut(&coord) {
                // Timer stays armed until the persisted document is merged.
                Some(chunk) if chunk.load_pending() => {},
                Some(chunk) => {
                    self.pending_saves.remove(&coord);
                    if chunk.needs_save() {
                        Self::enqueue_save(&mut self.io, &self.world_seed, chunk);
                    }
                },
                None => {
                    self.pending_saves.remove(&coord);
                },
            }
        }
    }

    fn flush_budgeted(&mut self) {
        let started = Instant::now();
        let total: usize = self.chunks.values().map(Chunk::dirty_count).sum();
        if total == 0 {
            self.metrics.record_flush(0, started.elapsed());
            return;
        }

        let budget = self.config.dirty_flush_budget;
        let order: Vec<ChunkCoord> = match self.flush_cursor {
            Some(cursor) => self
                .chunks
                .range((Excluded(cursor), Unbounded))
                .chain(self.chunks.range(..=cursor))
                .map(|(&coord, _)| coord)
                .collect(),
            None => self.chunks.keys().copied().collect(),
        };

        let mut remaining = budget;
        for coord in order {
            if remaining == 0 {
                break;
            }
            let Some(chunk) = self.chunks.get_mut(&coord) else {
                continue;
            };
            let dirty = chunk.dirty_count();
            if dirty == 0 {
                continue;
            }
            let share = (dirty * budget).div_ceil(total).max(1).min(remaining);
            let flushed = chunk.flush_dirty(Some(share));
            if flushed > 0 {
                remaining -= flushed;
                self.flush_cursor = Some(coord);
            }
        }

        self.metrics
            .record_flush(budget - remaining, started.elapsed());
    }

    /// Enqueues saves of every active chunk with unsaved changes.
    ///
    /// Outstanding loads of those chunks are waited for and merged first.
    pub fn save_all(&mut self) {
        let unmerged = self
            .chunks
            .values()
            .any(|chunk| chunk.needs_save() && chunk.load_pending());
        if unmerged {
            self.sync_io();
        }
        self.pending_saves.clear();
        for chunk in self.chunks.values_mut() {
            if chunk.needs_save() {
                Self::enqueue_save(&mut self.io, &self.world_seed, chunk);
            }
        }
    }

    /// Saves everything, waits for persistence to finish and returns the
    /// final metrics.
    pub fn shutdown(mut self) -> WorldMetrics {
        self.save_all();
        self.sync_io();
        info!(
            "World {} shut down after {} frames, {} saves",
            self.world_seed, self.metrics.frame, self.metrics.saves_performed
        );
        self.metrics()
    }

    // === Coordinate translation ===

    /// Global tile containing a pixel position.
    #[must_use]
    pub fn pixel_to_tile(&self, position: Vec2) -> TileCoord {
        TileCoord::from_pixel(position, self.config.tile_size)
    }

    fn locate(&self, tx: i32, ty: i32) -> (ChunkCoord, i32, i32) {
        let (chunk, local) = TileCoord::new(tx, ty).split(self.config.chunk_edge);
        (chunk, i32::from(local.x), i32::from(local.y))
    }

    fn owning_chunk(&self, tx: i32, ty: i32) -> Option<(&Chunk, i32, i32)> {
        let (coord, x, y) = self.locate(tx, ty);
        self.chunks.get(&coord).map(|chunk| (chunk, x, y))
    }

    fn owning_chunk_mut(&mut self, tx: i32, ty: i32) -> Option<(&mut Chunk, i32, i32)> {
        let (coord, x, y) = self.locate(tx, ty);
        self.chunks.get_mut(&coord).map(|chunk| (chunk, x, y))
    }

    /// Tile at a global tile coordinate; `None` if not active.
    #[must_use]
    pub fn tile_at_global(&self, tx: i32, ty: i32) -> Option<TileId> {
        self.owning_chunk(tx, ty)
            .and_then(|(chunk, x, y)| chunk.tile_at(x, y))
    }

    /// Sets a tile at a global tile coordinate. False if unchanged or not active.
    pub fn put_tile_at_global(&mut self, tx: i32, ty: i32, tile: TileId) -> bool {
        self.owning_chunk_mut(tx, ty)
            .is_some_and(|(chunk, x, y)| chunk.put_tile_at(x, y, tile))
    }

    /// Object at a global tile coordinate; `None` if none or not active.
    #[must_use]
    pub fn object_at_global(&self, tx: i32, ty: i32) -> Option<ObjectKind> {
        self.owning_chunk(tx, ty)
            .and_then(|(chunk, x, y)| chunk.object_at(x, y))
    }

    /// Places an object on a walkable tile.
    pub fn add_object_at_global(&mut self, kind: ObjectKind, tx: i32, ty: i32) -> bool {
        if !self.is_tile_walkable(tx, ty) {
            return false;
        }
        self.owning_chunk_mut(tx, ty)
            .is_some_and(|(chunk, x, y)| chunk.add_object(kind, x, y))
    }

    /// Removes and returns the object at a global tile coordinate.
    pub fn remove_object_at_global(&mut self, tx: i32, ty: i32) -> Option<ObjectKind> {
        self.owning_chunk_mut(tx, ty)
            .and_then(|(chunk, x, y)| chunk.remove_object_at(x, y))
    }

    /// Moves the object at a global tile into `inventory`.
    ///
    /// The object is removed only if the inventory accepted it.
    pub fn collect_object_at_global(
        &mut self,
        tx: i32,
        ty: i32,
        inventory: &mut dyn Inventory,
    ) -> Option<ObjectKind> {
        let kind = self.object_at_global(tx, ty)?;
        let accepted = match kind {
            ObjectKind::Present => inventory.obtain_present(),
            other => inventory.add_object(other),
        };
        if !accepted {
            return None;
        }
        if kind == ObjectKind::Present {
            info!("Present collected at ({tx}, {ty})");
        }
        self.remove_object_at_global(tx, ty)
    }

    /// Whether a global tile can be walked on. Inactive regions never can.
    #[must_use]
    pub fn is_tile_walkable(&self, tx: i32, ty: i32) -> bool {
        self.owning_chunk(tx, ty)
            .is_some_and(|(chunk, x, y)| chunk.is_walkable(x, y))
    }

    /// Whether a pixel position can be walked on.
    #[must_use]
    pub fn is_walkable(&self, position: Vec2) -> bool {
        let tile = self.pixel_to_tile(position);
        self.is_tile_walkable(tile.x, tile.y)
    }

    // === Accessors ===

    /// Counter snapshot.
    #[must_use]
    pub fn metrics(&self) -> WorldMetrics {
        WorldMetrics {
            chunks_active: self.chunks.len(),
            pending_loads: self.pending_loads.len(),
            ..self.metrics.clone()
        }
    }

    /// Active configuration (validated).
    #[must_use]
    pub const fn config(&self) -> &WorldConfig {
        &self.config
    }

    /// World seed.
    #[must_use]
    pub const fn world_seed(&self) -> &WorldSeed {
        &self.world_seed
    }

    /// Number of active chunks.
    #[must_use]
    pub fn active_chunk_count(&self) -> usize {
        self.chunks.len()
    }

    /// Active chunk at `coord`.
    #[must_use]
    pub fn chunk(&self, coord: ChunkCoord) -> Option<&Chunk> {
        self.chunks.get(&coord)
    }

    /// All active chunks in coordinate order.
    pub fn chunks(&self) -> impl Iterator<Item = &Chunk> {
        self.chunks.values()
    }

    /// Chunk containing the player at the last tick.
    #[must_use]
    pub const fn player_chunk(&self) -> Option<ChunkCoord> {
        self.player_chunk
    }

    /// Neighbor loads waiting for creation budget.
    #[must_use]
    pub fn pending_load_count(&self) -> usize {
        self.pending_loads.len()
    }

    /// Chunks with a save timer running.
    #[must_use]
    pub fn pending_save_count(&self) -> usize {
        self.pending_saves.len()
    }

    /// Dirty tiles across all active chunks.
    #[must_use]
    pub fn dirty_tile_count(&self) -> usize {
        self.chunks.values().map(Chunk::dirty_count).sum()
    }

    /// Where the present goes.
    #[must_use]
    pub const fn present_plan(&self) -> &PresentPlan {
        self.present.plan()
    }

    /// Whether this process placed the present.
    #[must_use]
    pub const fn present_placed(&self) -> bool {
        self.present.placed()
    }

    /// Global tile of the present, if an active chunk hosts it.
    #[must_use]
    pub fn present_location(&self) -> Option<TileCoord> {
        let edge = self.config.chunk_edge;
        self.chunks.values().find_map(|chunk| {
            chunk
                .objects()
                .iter()
                .find(|&(_, &kind)| kind == ObjectKind::Present)
                .map(|(&index, _)| {
                    let origin = chunk.coord().origin_tile(edge);
                    TileCoord::new(
                        origin.x + (index % edge) as i32,
                        origin.y + (index / edge) as i32,
                    )
                })
        })
    }
}

impl Drop for WorldManager {
    fn drop(&mut self) {
        self.save_all();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::chunk::ChunkInstanceId;
    use crate::config::IoMode;
    use crate::inventory::SlotInventory;
    use crate::render::NullRenderHost;
    use crate::serialized::{DiffEntry, ObjectEntry, SerializedChunk};
    use crate::store::MemoryChunkStore;
    use tilecraft_common::{tile_ids, CHUNK_FORMAT_VERSION};

    const SEED: &str = "manager";

    fn config() -> WorldConfig {
        WorldConfig {
            io_mode: IoMode::Inline,
            ..WorldConfig::default()
        }
    }

    fn owned_present() -> SlotInventory {
        SlotInventory::restored(16, Vec::new(), true)
    }

    fn manager_with(config: WorldConfig, store: &Arc<MemoryChunkStore>) -> WorldManager {
        WorldManager::new(
            config,
            SEED,
            Box::new(NullRenderHost),
            store.clone(),
            &owned_present(),
        )
        .expect("manager")
    }

    fn manager() -> (WorldManager, Arc<MemoryChunkStore>) {
        let store = Arc::new(MemoryChunkStore::new());
        (manager_with(config(), &store), store)
    }

    fn centre(coord: ChunkCoord) -> Vec2 {
        Vec2::new(coord.x as f32 * 512.0 + 256.0, coord.y as f32 * 512.0 + 256.0)
    }

    fn settle(world: &mut WorldManager, coord: ChunkCoord) {
        for _ in 0..16 {
            world.update(centre(coord), Duration::ZERO);
        }
    }

    fn document(
        coord: ChunkCoord,
        diff: Vec<DiffEntry>,
        objects: Vec<ObjectEntry>,
    ) -> SerializedChunk {
        SerializedChunk {
            version: CHUNK_FORMAT_VERSION,
            world_seed: WorldSeed::text(SEED),
            chunk_x: coord.x,
            chunk_y: coord.y,
            biome_id: None,
            diff,
            objects: Some(objects),
            last_touched: 0,
        }
    }

    fn free_land(world: &WorldManager, coord: ChunkCoord) -> (i32, i32) {
        let origin = coord.origin_tile(32);
        (0..32 * 32)
            .map(|i| (origin.x + i % 32, origin.y + i / 32))
            .find(|&(tx, ty)| world.is_tile_walkable(tx, ty))
            .expect("walkable tile")
    }

    #[test]
    fn test_empty_registry_fails() {
        let result = WorldManager::with_registry(
            config(),
            SEED,
            BiomeRegistry::new(),
            Box::new(NullRenderHost),
            Arc::new(MemoryChunkStore::new()),
            &owned_present(),
        );
        assert!(matches!(
            result,
            Err(tilecraft_common::TilecraftError::Registry(
                tilecraft_common::RegistryError::Empty
            ))
        ));
    }

    #[test]
    fn test_creation_is_throttled() {
        let (mut world, _) = manager();
        world.update(centre(ChunkCoord::ORIGIN), Duration::ZERO);
        assert_eq!(world.active_chunk_count(), 2);
        assert!(world.chunk(ChunkCoord::ORIGIN).is_some());
        assert_eq!(world.pending_load_count(), 7);
        assert_eq!(world.metrics().requests_throttled, 7);

        for _ in 0..4 {
            world.update(centre(ChunkCoord::ORIGIN), Duration::ZERO);
        }
        assert_eq!(world.active_chunk_count(), 9);
        assert_eq!(world.pending_load_count(), 0);
        assert_eq!(world.metrics().chunks_loaded, 9);
    }

    #[test]
    fn test_far_chunks_unload() {
        let (mut world, _) = manager();
        settle(&mut world, ChunkCoord::ORIGIN);
        settle(&mut world, ChunkCoord::new(5, 0));

        assert_eq!(world.active_chunk_count(), 9);
        assert!(world
            .chunks()
            .all(|c| c.coord().chebyshev_distance(ChunkCoord::new(5, 0)) <= 1));
        assert_eq!(world.metrics().chunks_unloaded, 9);
    }

    #[test]
    fn test_pending_queue_drops_out_of_radius() {
        let (mut world, _) = manager();
        world.update(centre(ChunkCoord::ORIGIN), Duration::ZERO);
        world.update(centre(ChunkCoord::new(20, 20)), Duration::ZERO);
        settle(&mut world, ChunkCoord::new(20, 20));
        assert!(world
            .chunks()
            .all(|c| c.coord().chebyshev_distance(ChunkCoord::new(20, 20)) <= 1));
        assert_eq!(world.active_chunk_count(), 9);
    }

    #[test]
    fn test_mutations_coalesce_into_one_debounced_save() {
        let (mut world, store) = manager();
        settle(&mut world, ChunkCoord::ORIGIN);
        let (tx, ty) = free_land(&world, ChunkCoord::ORIGIN);
        let player = centre(ChunkCoord::ORIGIN);

        assert!(world.put_tile_at_global(tx, ty, tile_ids::PLANKS));
        world.update(player, Duration::ZERO);
        assert_eq!(world.pending_save_count(), 1);

        world.update(player, Duration::from_millis(1000));
        assert!(world.put_tile_at_global(tx, ty, tile_ids::SNOW));
        world.update(player, Duration::from_millis(400));
        assert!(store.is_empty());

        world.update(player, Duration::from_millis(100));
        assert_eq!(world.pending_save_count(), 0);
        world.update(player, Duration::ZERO);
        assert_eq!(world.metrics().saves_performed, 1);

        let key = storage_key(&WorldSeed::text(SEED), ChunkCoord::ORIGIN);
        let saved = store.load(&key).expect("load").expect("saved");
        let index = (tx + ty * 32) as u32;
        assert!(saved.diff.contains(&DiffEntry {
            i: index,
            t: tile_ids::SNOW
        }));
    }

    #[test]
    fn test_eviction_saves_unsaved_chunk() {
        let (mut world, store) = manager();
        settle(&mut world, ChunkCoord::ORIGIN);
        assert!(world.put_tile_at_global(0, 0, 500));
        settle(&mut world, ChunkCoord::new(4, 4));

        let key = storage_key(&WorldSeed::text(SEED), ChunkCoord::ORIGIN);
        let saved = store.load(&key).expect("load").expect("saved on eviction");
        assert_eq!(saved.diff, vec![DiffEntry { i: 0, t: 500 }]);
        assert_eq!(world.pending_save_count(), 0);
    }

    #[test]
    fn test_persisted_diff_applied_after_generation() {
        let store = Arc::new(MemoryChunkStore::new());
        let coord = ChunkCoord::new(2, 3);
        let doc = document(coord, vec![DiffEntry { i: 0, t: 500 }], Vec::new());
        store.save(&doc.key(), &doc).expect("seed store");

        let mut world = manager_with(config(), &store);
        world.update(centre(coord), Duration::ZERO);
        assert_ne!(world.tile_at_global(64, 96), Some(500));

        world.update(centre(coord), Duration::ZERO);
        assert_eq!(world.tile_at_global(64, 96), Some(500));
        let chunk = world.chunk(coord).expect("active");
        assert!(chunk.objects().is_empty());
        assert!(!chunk.needs_save());
        assert_eq!(world.metrics().loads_applied, 1);
    }

    #[test]
    fn test_local_edit_survives_late_load() {
        let store = Arc::new(MemoryChunkStore::new());
        let doc = document(
            ChunkCoord::ORIGIN,
            vec![DiffEntry { i: 5, t: 500 }, DiffEntry { i: 6, t: 501 }],
            Vec::new(),
        );
        store.save(&doc.key(), &doc).expect("seed store");

        let mut world = manager_with(config(), &store);
        world.update(centre(ChunkCoord::ORIGIN), Duration::ZERO);
        assert!(world.put_tile_at_global(5, 0, tile_ids::PLANKS));
        world.update(centre(ChunkCoord::ORIGIN), Duration::ZERO);

        assert_eq!(world.tile_at_global(5, 0), Some(tile_ids::PLANKS));
        assert_eq!(world.tile_at_global(6, 0), Some(501));
    }

    #[test]
    fn test_stale_load_is_dropped() {
        let store = Arc::new(MemoryChunkStore::new());
        let doc = document(ChunkCoord::ORIGIN, vec![DiffEntry { i: 0, t: 500 }], Vec::new());
        store.save(&doc.key(), &doc).expect("seed store");

        let mut world = manager_with(config(), &store);
        settle(&mut world, ChunkCoord::ORIGIN);
        assert_eq!(world.tile_at_global(0, 0), Some(500));
        let before = world.tile_at_global(1, 0);

        let stale = DiffEntry { i: 1, t: 777 };
        let late = document(ChunkCoord::ORIGIN, vec![stale], Vec::new());
        store.save(&late.key(), &late).expect("store");
        world
            .io
            .request_load(late.key(), ChunkCoord::ORIGIN, ChunkInstanceId::from_raw(u64::MAX));
        world.process_io();

        assert_eq!(world.tile_at_global(1, 0), before);
        assert_eq!(world.metrics().stale_loads_dropped, 1);
    }

    #[test]
    fn test_cap_falls_back_to_primary() {
        let (mut world, _) = manager();
        settle(&mut world, ChunkCoord::ORIGIN);
        assert_eq!(world.config().max_active_chunks, 25);

        let mut created = 0;
        let mut coords = (10..40).flat_map(|x| (10..12).map(move |y| ChunkCoord::new(x, y)));
        while world.active_chunk_count() < 25 {
            world.created_this_tick = 0;
            let coord = coords.next().expect("coords");
            assert_eq!(world.request_chunk(coord), ChunkRequest::Created);
            created += 1;
        }
        assert_eq!(created, 16);

        world.created_this_tick = 0;
        let far = ChunkCoord::new(99, 99);
        assert_eq!(world.request_chunk(far), ChunkRequest::AtCapacity);
        let fallback = world.chunk_or_primary(far).expect("primary").coord();
        assert_eq!(fallback, ChunkCoord::ORIGIN);
        assert_eq!(world.metrics().requests_rejected, 2);
        assert_eq!(
            world.request_chunk(ChunkCoord::ORIGIN),
            ChunkRequest::Ready
        );
    }

    #[test]
    fn test_request_throttled_when_budget_spent() {
        let (mut world, _) = manager();
        settle(&mut world, ChunkCoord::ORIGIN);
        world.created_this_tick = world.config().max_new_chunks_per_frame;
        let before = world.metrics().requests_throttled;
        assert_eq!(
            world.request_chunk(ChunkCoord::new(7, 7)),
            ChunkRequest::Throttled
        );
        assert_eq!(world.metrics().requests_throttled, before + 1);
    }

    #[test]
    fn test_global_coordinates_floor_negative() {
        let (mut world, _) = manager();
        settle(&mut world, ChunkCoord::ORIGIN);

        let chunk = world.chunk(ChunkCoord::new(-1, -1)).expect("active");
        assert_eq!(world.tile_at_global(-1, -1), chunk.tile_at(31, 31));
        assert_eq!(
            world.pixel_to_tile(Vec2::new(-0.5, -16.5)),
            TileCoord::new(-1, -2)
        );
    }

    #[test]
    fn test_inactive_region_is_closed() {
        let (mut world, _) = manager();
        settle(&mut world, ChunkCoord::ORIGIN);

        assert_eq!(world.tile_at_global(1000, 1000), None);
        assert!(!world.is_tile_walkable(1000, 1000));
        assert!(!world.is_walkable(Vec2::new(1.0e6, 0.0)));
        assert!(!world.put_tile_at_global(1000, 1000, tile_ids::SAND));
        assert!(!world.add_object_at_global(ObjectKind::RockSmall, 1000, 1000));
        assert_eq!(world.remove_object_at_global(1000, 1000), None);
    }

    #[test]
    fn test_place_requires_walkable_tile() {
        let (mut world, _) = manager();
        settle(&mut world, ChunkCoord::ORIGIN);
        let (tx, ty) = free_land(&world, ChunkCoord::ORIGIN);

        assert!(world.add_object_at_global(ObjectKind::RockSmall, tx, ty));
        assert!(!world.add_object_at_global(ObjectKind::RockSmall, tx, ty));
        assert!(!world.is_tile_walkable(tx, ty));

        world.put_tile_at_global(tx + 1, ty, tile_ids::WATER);
        if world.object_at_global(tx + 1, ty).is_none() {
            assert!(!world.add_object_at_global(ObjectKind::FlowerRed, tx + 1, ty));
        }
    }

    #[test]
    fn test_collect_respects_inventory() {
        let (mut world, _) = manager();
        settle(&mut world, ChunkCoord::ORIGIN);
        let (tx, ty) = free_land(&world, ChunkCoord::ORIGIN);
        assert!(world.add_object_at_global(ObjectKind::RockLarge, tx, ty));

        let mut full = SlotInventory::new(0);
        assert_eq!(world.collect_object_at_global(tx, ty, &mut full), None);
        assert_eq!(world.object_at_global(tx, ty), Some(ObjectKind::RockLarge));

        let mut bag = SlotInventory::new(4);
        assert_eq!(
            world.collect_object_at_global(tx, ty, &mut bag),
            Some(ObjectKind::RockLarge)
        );
        assert_eq!(bag.count(ObjectKind::RockLarge), 1);
        assert_eq!(world.object_at_global(tx, ty), None);
        assert_eq!(world.collect_object_at_global(tx, ty, &mut bag), None);
    }

    #[test]
    fn test_flush_budget_is_shared() {
        let store = Arc::new(MemoryChunkStore::new());
        let mut world = manager_with(
            WorldConfig {
                dirty_flush_budget: 16,
                ..config()
            },
            &store,
        );
        settle(&mut world, ChunkCoord::ORIGIN);

        for i in 0..100 {
            world.put_tile_at_global(i % 32, i / 32, 500);
        }
        for i in 0..10 {
            world.put_tile_at_global(32 + i, 0, 500);
        }
        let east = ChunkCoord::new(1, 0);
        assert_eq!(world.chunk(ChunkCoord::ORIGIN).expect("origin").dirty_count(), 100);
        assert_eq!(world.chunk(east).expect("east").dirty_count(), 10);

        world.update(centre(ChunkCoord::ORIGIN), Duration::ZERO);
        assert_eq!(world.metrics().tiles_flushed_last_tick, 16);
        assert!(world.chunk(ChunkCoord::ORIGIN).expect("origin").dirty_count() < 100);
        assert!(world.chunk(east).expect("east").dirty_count() < 10);

        for _ in 0..10 {
            world.update(centre(ChunkCoord::ORIGIN), Duration::ZERO);
        }
        assert_eq!(world.dirty_tile_count(), 0);
        assert_eq!(world.metrics().tiles_flushed_total, 110);
    }

    #[test]
    fn test_shutdown_persists_everything() {
        let (mut world, store) = manager();
        settle(&mut world, ChunkCoord::ORIGIN);
        world.put_tile_at_global(3, 3, tile_ids::PLANKS);
        world.put_tile_at_global(-3, -3, tile_ids::PLANKS);

        let metrics = world.shutdown();
        assert_eq!(metrics.saves_performed, 2);
        assert_eq!(store.len(), 2);
    }

    fn seeded_store() -> Arc<MemoryChunkStore> {
        let store = Arc::new(MemoryChunkStore::new());
        let doc = document(ChunkCoord::ORIGIN, vec![DiffEntry { i: 0, t: 500 }], Vec::new());
        store.save(&doc.key(), &doc).expect("seed store");
        store
    }

    fn origin_document(store: &MemoryChunkStore) -> SerializedChunk {
        let key = storage_key(&WorldSeed::text(SEED), ChunkCoord::ORIGIN);
        store.load(&key).expect("load").expect("saved")
    }

    #[test]
    fn test_shutdown_merges_outstanding_load_before_saving() {
        let store = seeded_store();
        let mut world = manager_with(config(), &store);
        world.update(centre(ChunkCoord::ORIGIN), Duration::ZERO);
        assert!(world
            .chunk(ChunkCoord::ORIGIN)
            .is_some_and(Chunk::load_pending));
        assert!(world.put_tile_at_global(5, 0, tile_ids::PLANKS));

        world.shutdown();

        let saved = origin_document(&store);
        assert_eq!(
            saved.diff,
            vec![
                DiffEntry { i: 0, t: 500 },
                DiffEntry {
                    i: 5,
                    t: tile_ids::PLANKS
                },
            ]
        );
        assert_eq!(saved.objects, Some(Vec::new()));
    }

    #[test]
    fn test_debounced_save_waits_for_outstanding_load() {
        let (mut world, store) = manager();
        settle(&mut world, ChunkCoord::ORIGIN);
        let player = centre(ChunkCoord::ORIGIN);
        assert!(world.put_tile_at_global(3, 3, tile_ids::PLANKS));
        world
            .chunks
            .get_mut(&ChunkCoord::ORIGIN)
            .expect("active")
            .set_load_pending(true);

        world.update(player, Duration::ZERO);
        world.update(player, Duration::from_millis(2000));
        world.update(player, Duration::ZERO);
        assert!(store.is_empty());
        assert_eq!(world.pending_save_count(), 1);

        world
            .chunks
            .get_mut(&ChunkCoord::ORIGIN)
            .expect("active")
            .set_load_pending(false);
        world.update(player, Duration::ZERO);
        assert_eq!(world.pending_save_count(), 0);
        assert_eq!(store.len(), 1);
    }

    #[test]
    fn test_eviction_merges_outstanding_load_in_background() {
        let store = seeded_store();
        let config = WorldConfig {
            io_mode: IoMode::Background,
            ..WorldConfig::default()
        };
        let mut world = manager_with(config, &store);
        world.update(centre(ChunkCoord::ORIGIN), Duration::ZERO);
        assert!(world.put_tile_at_global(5, 0, tile_ids::PLANKS));

        world.update(centre(ChunkCoord::new(4, 4)), Duration::ZERO);
        assert!(world.chunk(ChunkCoord::ORIGIN).is_none());
        world.sync_io();

        let saved = origin_document(&store);
        assert!(saved.diff.contains(&DiffEntry { i: 0, t: 500 }));
        assert!(saved.diff.contains(&DiffEntry {
            i: 5,
            t: tile_ids::PLANKS
        }));
        assert_eq!(saved.objects, Some(Vec::new()));
    }
}
