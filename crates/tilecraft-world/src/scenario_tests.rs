//! End-to-end scenarios for the world manager.
//!
//! These drive a full `WorldManager` the way a host engine would: ticking it
//! with player positions, editing through the global API and restarting over
//! the same store.

#![cfg(test)]

use std::sync::Arc;
use std::time::Duration;

use glam::Vec2;
use tilecraft_common::{tile_ids, ChunkCoord, ObjectKind, WorldSeed};
use tilecraft_worldgen::BiomeClass;

use crate::config::{IoMode, WorldConfig};
use crate::inventory::SlotInventory;
use crate::manager::WorldManager;
use crate::render::{NullRenderHost, RecordingHost};
use crate::store::{ChunkStore, FileChunkStore, MemoryChunkStore};

const FRAME: Duration = Duration::from_millis(16);

fn centre(coord: ChunkCoord) -> Vec2 {
    Vec2::new(coord.x as f32 * 512.0 + 256.0, coord.y as f32 * 512.0 + 256.0)
}

fn inline_config(radius: u32) -> WorldConfig {
    WorldConfig {
        neighbor_radius: radius,
        max_new_chunks_per_frame: 25,
        io_mode: IoMode::Inline,
        ..WorldConfig::default()
    }
}

fn world(
    config: WorldConfig,
    seed: &str,
    store: Arc<dyn ChunkStore>,
    inventory: &SlotInventory,
) -> WorldManager {
    WorldManager::new(config, seed, Box::new(NullRenderHost), store, inventory)
        .expect("manager")
}

fn memory() -> Arc<dyn ChunkStore> {
    Arc::new(MemoryChunkStore::new())
}

fn settle(world: &mut WorldManager, coord: ChunkCoord) {
    for _ in 0..8 {
        world.update(centre(coord), FRAME);
    }
    world.sync_io();
}

fn presents(world: &WorldManager) -> usize {
    world
        .chunks()
        .map(|chunk| {
            chunk
                .objects()
                .values()
                .filter(|&&kind| kind == ObjectKind::Present)
                .count()
        })
        .sum()
}

/// Persistence round trips through a real manager restart
mod persistence_tests {
    use super::*;

    #[test]
    fn e2e_tile_edit_survives_restart() {
        let dir = tempfile::tempdir().expect("tempdir");
        let config = WorldConfig {
            io_mode: IoMode::Background,
            save_dir: dir.path().join("chunks"),
            ..WorldConfig::default()
        };
        let store: Arc<dyn ChunkStore> =
            Arc::new(FileChunkStore::open(&config.save_dir).expect("open store"));
        let coord = ChunkCoord::new(2, 3);
        let inventory = SlotInventory::new(8);

        let mut first = world(config.clone(), "restart", Arc::clone(&store), &inventory);
        settle(&mut first, coord);
        assert!(first.put_tile_at_global(64, 96, 500));
        let hash = first.chunk(coord).expect("active").content_hash();
        first.shutdown();

        let mut second = world(config, "restart", store, &inventory);
        settle(&mut second, coord);
        assert_eq!(
            second.tile_at_global(64, 96),
            Some(500),
            "Edited tile should be restored from the store"
        );
        assert_eq!(second.chunk(coord).expect("active").content_hash(), hash);
    }

    #[test]
    fn e2e_collected_object_stays_gone() {
        let store: Arc<dyn ChunkStore> = Arc::new(MemoryChunkStore::new());
        let mut bag = SlotInventory::restored(64, Vec::new(), true);

        let mut first = world(inline_config(1), "collect", Arc::clone(&store), &bag);
        settle(&mut first, ChunkCoord::ORIGIN);
        let chunk = first.chunk(ChunkCoord::ORIGIN).expect("active");
        let before = chunk.objects().len();
        let (&index, &kind) = chunk.objects().iter().next().expect("scattered objects");
        let (tx, ty) = ((index % 32) as i32, (index / 32) as i32);

        assert_eq!(first.collect_object_at_global(tx, ty, &mut bag), Some(kind));
        first.shutdown();

        let mut second = world(inline_config(1), "collect", store, &bag);
        settle(&mut second, ChunkCoord::ORIGIN);
        assert_eq!(
            second.object_at_global(tx, ty),
            None,
            "Collected object must not respawn after reload"
        );
        assert_eq!(
            second.chunk(ChunkCoord::ORIGIN).expect("active").objects().len(),
            before - 1
        );
    }

    #[test]
    fn e2e_version_one_document_keeps_scatter() {
        let store = Arc::new(MemoryChunkStore::new());
        store.put_raw(
            "chunk:legacy:0:0",
            r#"{"version":1,"worldSeed":"legacy","chunkX":0,"chunkY":0,"diff":[{"i":2,"t":7}],"lastTouched":0}"#,
        );
        let inventory = SlotInventory::restored(1, Vec::new(), true);

        let mut fresh = world(
            inline_config(0),
            "legacy",
            Arc::new(MemoryChunkStore::new()),
            &inventory,
        );
        settle(&mut fresh, ChunkCoord::ORIGIN);
        let scattered = fresh
            .chunk(ChunkCoord::ORIGIN)
            .expect("active")
            .objects()
            .clone();

        let mut old = world(inline_config(0), "legacy", store, &inventory);
        settle(&mut old, ChunkCoord::ORIGIN);
        let chunk = old.chunk(ChunkCoord::ORIGIN).expect("active");
        assert_eq!(chunk.tile_at(2, 0), Some(tile_ids::PLANKS));
        assert_eq!(
            chunk.objects(),
            &scattered,
            "Documents without an object list keep the generated objects"
        );
    }

    #[test]
    fn e2e_corrupt_document_regenerates() {
        let store = Arc::new(MemoryChunkStore::new());
        store.put_raw("chunk:corrupt:0:0", "{\"version\": 2, \"diff\": [");
        let inventory = SlotInventory::new(1);

        let mut world = world(inline_config(0), "corrupt", store, &inventory);
        settle(&mut world, ChunkCoord::ORIGIN);
        let chunk = world.chunk(ChunkCoord::ORIGIN).expect("active");
        assert_eq!(chunk.tiles(), chunk.baseline());
        assert_eq!(world.metrics().loads_applied, 0);
    }
}

/// Active window behaviour while the player moves
mod window_tests {
    use super::*;

    #[test]
    fn e2e_window_bounded_during_walk() {
        let inventory = SlotInventory::new(1);
        let mut world = world(
            WorldConfig {
                io_mode: IoMode::Inline,
                ..WorldConfig::default()
            },
            "walk",
            Arc::new(MemoryChunkStore::new()),
            &inventory,
        );
        let cap = world.config().max_active_chunks;
        let radius = world.config().neighbor_radius;

        let mut position = centre(ChunkCoord::ORIGIN);
        for step in 0..400 {
            position += if step % 3 == 0 {
                Vec2::new(0.0, -40.0)
            } else {
                Vec2::new(48.0, 0.0)
            };
            world.update(position, FRAME);

            let here = world.player_chunk().expect("player chunk");
            assert!(world.active_chunk_count() <= cap);
            assert!(
                world.chunks().all(|c| c.coord().chebyshev_distance(here) <= radius),
                "No chunk may linger outside the neighbor radius"
            );
        }

        let here = world.player_chunk().expect("player chunk");
        settle(&mut world, here);
        for coord in here.spiral(radius) {
            assert!(world.chunk(coord).is_some(), "{coord} should be active");
        }
    }

    #[test]
    fn e2e_teleport_fills_window_over_frames() {
        let inventory = SlotInventory::new(1);
        let mut world = world(
            WorldConfig {
                neighbor_radius: 2,
                max_new_chunks_per_frame: 3,
                io_mode: IoMode::Inline,
                ..WorldConfig::default()
            },
            "teleport",
            Arc::new(MemoryChunkStore::new()),
            &inventory,
        );
        let target = ChunkCoord::new(-40, 17);
        world.update(centre(target), FRAME);
        assert_eq!(world.active_chunk_count(), 3);
        assert!(world.chunk(target).is_some(), "Primary chunk is generated first");

        let mut frames = 1;
        while world.active_chunk_count() < 25 {
            world.update(centre(target), FRAME);
            frames += 1;
            assert!(frames <= 9, "Window must fill within a bounded number of frames");
        }
        assert_eq!(world.pending_load_count(), 0);
    }

    #[test]
    fn e2e_generation_identical_across_managers() {
        let inventory = SlotInventory::restored(1, Vec::new(), true);
        let mut a = world(inline_config(1), "twins", memory(), &inventory);
        let mut b = world(inline_config(1), "twins", memory(), &inventory);
        settle(&mut a, ChunkCoord::new(-3, 8));
        settle(&mut b, ChunkCoord::new(-3, 8));

        for chunk in a.chunks() {
            let twin = b.chunk(chunk.coord()).expect("same window");
            assert_eq!(chunk.content_hash(), twin.content_hash());
            assert_eq!(chunk.objects(), twin.objects());
            assert_eq!(chunk.biome_id(), twin.biome_id());
        }
    }

    #[test]
    fn e2e_flushed_tiles_reach_render_layer() {
        let host = RecordingHost::new();
        let inventory = SlotInventory::new(1);
        let mut world = WorldManager::new(
            inline_config(0),
            "render",
            Box::new(host.clone()),
            Arc::new(MemoryChunkStore::new()),
            &inventory,
        )
        .expect("manager");
        settle(&mut world, ChunkCoord::ORIGIN);
        let drawn = host.tiles_drawn();
        assert_eq!(drawn, 32 * 32);

        for x in 0..10 {
            world.put_tile_at_global(x, 31, 500);
        }
        world.update(centre(ChunkCoord::ORIGIN), FRAME);
        assert_eq!(host.tiles_drawn(), drawn + 10);
        let logs = host.logs();
        let log = logs[0].lock();
        assert_eq!(log.tiles.last(), Some(&(9, 31, 500)));
    }
}

/// The unique present
mod present_tests {
    use super::*;

    #[test]
    fn e2e_exactly_one_present_and_deterministic() {
        let inventory = SlotInventory::new(4);
        let mut a = world(inline_config(2), "gift", memory(), &inventory);
        let mut b = world(inline_config(2), "gift", memory(), &inventory);
        settle(&mut a, ChunkCoord::ORIGIN);
        settle(&mut b, ChunkCoord::ORIGIN);

        assert_eq!(presents(&a), 1, "Exactly one present per world");
        assert!(a.present_placed());
        assert_eq!(a.present_location(), b.present_location());

        let location = a.present_location().expect("present");
        assert_eq!(location.to_chunk_coord(32), a.present_plan().chunk());
        assert!(!a.is_tile_walkable(location.x, location.y));
    }

    #[test]
    fn e2e_present_survives_eviction_without_duplicate() {
        let inventory = SlotInventory::new(4);
        let mut world = world(inline_config(2), "roundtrip", memory(), &inventory);
        settle(&mut world, ChunkCoord::ORIGIN);
        let location = world.present_location().expect("present");

        settle(&mut world, ChunkCoord::new(30, 30));
        assert_eq!(presents(&world), 0);

        settle(&mut world, ChunkCoord::ORIGIN);
        assert_eq!(presents(&world), 1);
        assert_eq!(world.present_location(), Some(location));
        assert!(!world.is_tile_walkable(location.x, location.y));
    }

    #[test]
    fn e2e_collected_present_never_returns() {
        let store: Arc<dyn ChunkStore> = Arc::new(MemoryChunkStore::new());
        let mut inventory = SlotInventory::new(4);
        let mut first = world(inline_config(2), "owned", Arc::clone(&store), &inventory);
        settle(&mut first, ChunkCoord::ORIGIN);

        let location = first.present_location().expect("present");
        assert_eq!(
            first.collect_object_at_global(location.x, location.y, &mut inventory),
            Some(ObjectKind::Present)
        );
        settle(&mut first, ChunkCoord::new(30, 30));
        settle(&mut first, ChunkCoord::ORIGIN);
        assert_eq!(presents(&first), 0);
        first.shutdown();

        let mut second = world(inline_config(2), "owned", store, &inventory);
        settle(&mut second, ChunkCoord::ORIGIN);
        assert_eq!(presents(&second), 0);
        assert!(!second.present_placed());
    }
}

/// Chunk biome and object scatter
mod biome_tests {
    use super::*;

    #[test]
    fn e2e_flowers_follow_chunk_biome() {
        let inventory = SlotInventory::restored(1, Vec::new(), true);
        let mut world = world(inline_config(2), "flora", memory(), &inventory);
        settle(&mut world, ChunkCoord::ORIGIN);
        let seed = WorldSeed::text("flora");

        for chunk in world.chunks() {
            let flowers: Vec<u32> = chunk
                .objects()
                .iter()
                .filter(|(_, kind)| kind.is_flower())
                .map(|(&index, _)| index)
                .collect();
            if chunk.biome_class() == BiomeClass::GrassLike {
                assert!(flowers
                    .iter()
                    .all(|&i| chunk.baseline()[i as usize] == tile_ids::GRASS));
            } else {
                assert!(flowers.is_empty(), "{} has flowers", chunk.coord());
            }
            assert_eq!(
                chunk.serialize_diff(&seed).biome_id.as_deref(),
                Some(chunk.biome_id())
            );
        }
    }
}
