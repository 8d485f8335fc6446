//! # Tilecraft Sim
//!
//! Headless driver for the Tilecraft world. Walks a player around a seeded
//! random path, collecting and placing objects on the way, then prints the
//! world metrics as JSON.
//!
//! Usage: `tilecraft-sim [config.toml] [frames] [seed]`

#![warn(missing_docs)]
#![warn(clippy::all)]
#![deny(clippy::unwrap_used)]

use std::time::Duration;

use anyhow::{Context, Result};
use glam::Vec2;
use tilecraft_common::{ObjectKind, WorldSeed};
use tilecraft_world::{
    open_store, Inventory, NullRenderHost, SlotInventory, WorldConfig, WorldManager,
};
use tilecraft_worldgen::hash32;
use tracing::{debug, info};
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

const DEFAULT_FRAMES: u64 = 3600;
const FRAME: Duration = Duration::from_millis(16);
/// Player speed in pixels per second.
const SPEED: f32 = 180.0;
const TURN_EVERY: u64 = 90;
const ACT_EVERY: u64 = 20;

struct Args {
    config: WorldConfig,
    frames: u64,
    seed: WorldSeed,
}

fn parse_args() -> Result<Args> {
    let mut args = std::env::args().skip(1);
    let config = args
        .next()
        .map_or_else(WorldConfig::default, WorldConfig::load_from);
    let frames = match args.next() {
        Some(text) => text
            .parse()
            .with_context(|| format!("invalid frame count {text:?}"))?,
        None => DEFAULT_FRAMES,
    };
    let seed = args.next().map_or_else(WorldSeed::default, |text| {
        text.parse::<i64>()
            .map_or_else(|_| WorldSeed::Text(text), WorldSeed::Number)
    });
    Ok(Args {
        config,
        frames,
        seed,
    })
}

fn random_heading(rng: &mut fastrand::Rng) -> Vec2 {
    let angle = rng.f32() * std::f32::consts::TAU;
    Vec2::new(angle.cos(), angle.sin())
}

/// Collects the first object within two tiles, or places a rock back.
fn act(
    world: &mut WorldManager,
    inventory: &mut SlotInventory,
    player: Vec2,
    rng: &mut fastrand::Rng,
) {
    let tile = world.pixel_to_tile(player);
    for dy in -2..=2 {
        for dx in -2..=2 {
            let (tx, ty) = (tile.x + dx, tile.y + dy);
            if let Some(kind) = world.collect_object_at_global(tx, ty, inventory) {
                debug!("Collected {kind:?} at ({tx}, {ty})");
                return;
            }
        }
    }

    let (tx, ty) = (tile.x + rng.i32(-2..=2), tile.y + rng.i32(-2..=2));
    for kind in ObjectKind::ROCKS {
        if inventory.take(kind) {
            if world.add_object_at_global(kind, tx, ty) {
                debug!("Placed {kind:?} at ({tx}, {ty})");
            } else {
                inventory.add_object(kind);
            }
            return;
        }
    }
}

fn main() -> Result<()> {
    tracing_subscriber::registry()
        .with(fmt::layer())
        .with(EnvFilter::from_default_env().add_directive("tilecraft=info".parse()?))
        .init();

    let Args {
        config,
        frames,
        seed,
    } = parse_args()?;
    info!("Tilecraft sim: seed {seed}, {frames} frames");

    let store = open_store(&config);
    let mut inventory = SlotInventory::new(32);
    let mut world = WorldManager::new(
        config,
        seed.clone(),
        Box::new(NullRenderHost),
        store,
        &inventory,
    )?;

    let mut rng = fastrand::Rng::with_seed(u64::from(hash32(&format!("{seed}:walk"))));
    let mut player = Vec2::splat(world.config().chunk_pixel_size() as f32 / 2.0);
    let mut heading = random_heading(&mut rng);
    let step = SPEED * FRAME.as_secs_f32();

    for frame in 0..frames {
        if frame % TURN_EVERY == 0 {
            heading = random_heading(&mut rng);
        }
        let next = player + heading * step;
        if world.is_walkable(next) || !world.is_walkable(player) {
            player = next;
        } else {
            heading = random_heading(&mut rng);
        }

        world.update(player, FRAME);

        if frame % ACT_EVERY == 0 {
            act(&mut world, &mut inventory, player, &mut rng);
        }
    }

    info!(
        "Walked to {player}, carrying {} objects (present: {})",
        inventory.len(),
        inventory.has_present()
    );
    let metrics = world.shutdown();
    println!("{}", serde_json::to_string_pretty(&metrics)?);
    Ok(())
}
