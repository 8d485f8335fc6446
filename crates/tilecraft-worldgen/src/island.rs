//! Island terrain generation for a single chunk.
//!
//! Each chunk is shaped as an island: a radial falloff from the chunk centre
//! is blended with a multi-octave elevation field, and a separate moisture
//! field splits every elevation band into a wet and a dry zone.

use tilecraft_common::TileId;

use crate::biome::{pick_zone_from_elevation_moisture, TerrainZone};
use crate::noise::ValueNoise2D;
use crate::rng::{fmix32, hash_bytes};

/// Elevation octaves as `(frequency per tile, weight)`.
pub const ELEVATION_OCTAVES: [(f64, f64); 3] = [(1.0 / 12.0, 0.6), (1.0 / 6.0, 0.3), (1.0 / 3.0, 0.1)];

/// Moisture octaves as `(frequency per tile, weight)`.
pub const MOISTURE_OCTAVES: [(f64, f64); 2] = [(1.0 / 16.0, 0.7), (1.0 / 8.0, 0.3)];

/// Salt separating the moisture field's seed from the elevation field's.
pub const MOISTURE_SEED_SALT: u32 = 0x9E37_79B9;

/// Weight of the noise term in the elevation blend.
const NOISE_WEIGHT: f64 = 0.5;
/// Weight of the radial falloff in the elevation blend.
const RADIAL_WEIGHT: f64 = 1.05;
/// Constant bias pulling the chunk rim under water.
const ELEVATION_BIAS: f64 = 0.15;

/// Elevation and moisture of one tile.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct TerrainSample {
    /// Elevation in `[-1, 1]`
    pub elevation: f64,
    /// Moisture in `[0, 1]`
    pub moisture: f64,
}

/// Deterministic island generator for one chunk.
#[derive(Debug, Clone)]
pub struct IslandGenerator {
    /// Tiles per chunk edge
    edge: u32,
    /// Elevation field
    elevation: ValueNoise2D,
    /// Moisture field
    moisture: ValueNoise2D,
}

impl IslandGenerator {
    /// Creates a generator for a chunk with the given seed and edge length.
    #[must_use]
    pub const fn new(chunk_seed: u32, edge: u32) -> Self {
        Self {
            edge,
            elevation: ValueNoise2D::new(chunk_seed),
            moisture: ValueNoise2D::new(chunk_seed ^ MOISTURE_SEED_SALT),
        }
    }

    /// Tiles per chunk edge.
    #[must_use]
    pub const fn edge(&self) -> u32 {
        self.edge
    }

    /// Radial falloff: 1 at the chunk centre, 0 at the inscribed circle and beyond.
    #[must_use]
    pub fn radial(&self, x: u32, y: u32) -> f64 {
        let half = f64::from(self.edge) / 2.0;
        let dx = f64::from(x) + 0.5 - half;
        let dy = f64::from(y) + 0.5 - half;
        let distance = (dx * dx + dy * dy).sqrt() / half;
        1.0 - distance.min(1.0)
    }

    /// Samples elevation and moisture at a local tile.
    #[must_use]
    pub fn sample(&self, x: u32, y: u32) -> TerrainSample {
        let fx = f64::from(x);
        let fy = f64::from(y);
        let noise = self.elevation.fractal(fx, fy, &ELEVATION_OCTAVES);
        let elevation = (noise * NOISE_WEIGHT + self.radial(x, y) * RADIAL_WEIGHT
            - ELEVATION_BIAS)
            .clamp(-1.0, 1.0);
        let moisture = ((self.moisture.fractal(fx, fy, &MOISTURE_OCTAVES) + 1.0) / 2.0)
            .clamp(0.0, 1.0);
        TerrainSample {
            elevation,
            moisture,
        }
    }

    /// Terrain zone at a local tile.
    #[must_use]
    pub fn zone_at(&self, x: u32, y: u32) -> TerrainZone {
        let sample = self.sample(x, y);
        pick_zone_from_elevation_moisture(sample.elevation, sample.moisture)
    }

    /// Generates the full tile array, row-major (`x + y * edge`).
    #[must_use]
    pub fn generate(&self) -> Vec<TileId> {
        let mut tiles = Vec::with_capacity((self.edge * self.edge) as usize);
        for y in 0..self.edge {
            for x in 0..self.edge {
                tiles.push(self.zone_at(x, y).tile());
            }
        }
        tiles
    }
}

/// Content hash of a tile array, used to compare generated baselines.
#[must_use]
pub fn tiles_hash(tiles: &[TileId]) -> u32 {
    fmix32(hash_bytes(bytemuck::cast_slice(tiles)))
}
