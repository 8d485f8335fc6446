//! Terrain zones and the chunk biome registry.
//!
//! Two separate concepts live here:
//! - [`TerrainZone`]: per-tile classification from elevation and moisture.
//!   It only selects the ground tile.
//! - [`BiomeDef`] / [`BiomeRegistry`]: the biome of a whole chunk, picked by
//!   seeded hash. This is the canonical biome: it is persisted with the chunk
//!   and decides which objects may be scattered there.

use serde::{Deserialize, Serialize};
use tilecraft_common::{tile_ids, RegistryError, TileId, WorldSeed};
use tracing::debug;

use crate::rng::hash32;

/// Elevation below which a tile is ocean.
pub const OCEAN_LEVEL: f64 = -0.2;
/// Elevation at which land starts.
pub const LAND_LEVEL: f64 = 0.0;
/// Elevation at which forest / scrub starts.
pub const FOREST_LEVEL: f64 = 0.35;
/// Elevation at which mountains start.
pub const MOUNTAIN_LEVEL: f64 = 0.65;

/// Terrain zone of a single tile.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum TerrainZone {
    /// Deep water.
    Ocean,
    /// Damp beach.
    ShoreWet,
    /// Dry beach.
    ShoreDry,
    /// Lush lowland.
    Grass,
    /// Dry lowland.
    DryGrass,
    /// Wet midland.
    Forest,
    /// Dry midland.
    Scrub,
    /// Wet highland.
    Mountain,
    /// Dry highland.
    MountainDry,
}

impl TerrainZone {
    /// Ground tile for this zone.
    #[must_use]
    pub const fn tile(self) -> TileId {
        match self {
            Self::Ocean => tile_ids::WATER,
            Self::ShoreWet | Self::ShoreDry => tile_ids::SAND,
            Self::Grass | Self::DryGrass => tile_ids::GRASS,
            Self::Forest | Self::Scrub => tile_ids::DIRT,
            Self::Mountain | Self::MountainDry => tile_ids::SNOW,
        }
    }
}

/// Classifies a tile from elevation (`[-1, 1]`) and moisture (`[0, 1]`).
#[must_use]
pub fn pick_zone_from_elevation_moisture(elevation: f64, moisture: f64) -> TerrainZone {
    let wet = moisture > 0.5;
    if elevation < OCEAN_LEVEL {
        TerrainZone::Ocean
    } else if elevation < LAND_LEVEL {
        if moisture > 0.0 {
            TerrainZone::ShoreWet
        } else {
            TerrainZone::ShoreDry
        }
    } else if elevation < FOREST_LEVEL {
        if wet {
            TerrainZone::Grass
        } else {
            TerrainZone::DryGrass
        }
    } else if elevation < MOUNTAIN_LEVEL {
        if wet {
            TerrainZone::Forest
        } else {
            TerrainZone::Scrub
        }
    } else if wet {
        TerrainZone::Mountain
    } else {
        TerrainZone::MountainDry
    }
}

/// Broad class of a chunk biome.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum BiomeClass {
    /// Temperate; flowers grow.
    GrassLike,
    /// Arid; no flowers.
    DesertLike,
    /// Frozen; no flowers.
    SnowLike,
}

/// Definition of one chunk biome.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BiomeDef {
    /// Stable id, persisted as `biomeId`
    pub id: String,
    /// Human-readable label
    pub label: String,
    /// Broad class (drives object eligibility)
    pub class: BiomeClass,
}

impl BiomeDef {
    /// Creates a biome definition.
    #[must_use]
    pub fn new(id: impl Into<String>, label: impl Into<String>, class: BiomeClass) -> Self {
        Self {
            id: id.into(),
            label: label.into(),
            class,
        }
    }

    /// Whether flowers may be scattered in chunks of this biome.
    #[must_use]
    pub const fn grows_flowers(&self) -> bool {
        matches!(self.class, BiomeClass::GrassLike)
    }
}

/// Registry of chunk biomes, indexed in insertion order.
#[derive(Debug, Clone, Default)]
pub struct BiomeRegistry {
    /// Registered biomes
    biomes: Vec<BiomeDef>,
}

impl BiomeRegistry {
    /// Creates an empty registry.
    #[must_use]
    pub const fn new() -> Self {
        Self { biomes: Vec::new() }
    }

    /// Creates the default registry: meadow, dunes, tundra.
    #[must_use]
    pub fn with_defaults() -> Self {
        Self {
            biomes: vec![
                BiomeDef::new("meadow", "Meadow", BiomeClass::GrassLike),
                BiomeDef::new("dunes", "Dunes", BiomeClass::DesertLike),
                BiomeDef::new("tundra", "Tundra", BiomeClass::SnowLike),
            ],
        }
    }

    /// Registers a biome. Ids must be unique.
    pub fn register(&mut self, biome: BiomeDef) -> Result<(), RegistryError> {
        if self.get(&biome.id).is_some() {
            return Err(RegistryError::DuplicateId(biome.id));
        }
        debug!("Registered biome '{}' ({:?})", biome.id, biome.class);
        self.biomes.push(biome);
        Ok(())
    }

    /// Looks up a biome by id.
    #[must_use]
    pub fn get(&self, id: &str) -> Option<&BiomeDef> {
        self.biomes.iter().find(|b| b.id == id)
    }

    /// Number of registered biomes.
    #[must_use]
    pub fn len(&self) -> usize {
        self.biomes.len()
    }

    /// Whether no biomes are registered.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.biomes.is_empty()
    }

    /// Iterates biomes in insertion order.
    pub fn iter(&self) -> impl Iterator<Item = &BiomeDef> {
        self.biomes.iter()
    }

    /// Fails if the registry has no entries.
    pub fn ensure_populated(&self) -> Result<(), RegistryError> {
        if self.biomes.is_empty() {
            Err(RegistryError::Empty)
        } else {
            Ok(())
        }
    }

    /// Picks the biome of a chunk:
    /// `hash32("{seed}:{x}:{y}:biome") mod count`.
    pub fn pick_chunk_biome(
        &self,
        world_seed: &WorldSeed,
        chunk_x: i32,
        chunk_y: i32,
    ) -> Result<&BiomeDef, RegistryError> {
        self.ensure_populated()?;
        let hash = hash32(&format!("{world_seed}:{chunk_x}:{chunk_y}:biome"));
        let index = hash as usize % self.biomes.len();
        Ok(&self.biomes[index])
    }
}
