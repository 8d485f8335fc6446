//! World configuration.
//!
//! Tunables for chunk geometry, the active window, per-frame budgets, and
//! persistence. Configuration can be loaded from and saved to a TOML file.

use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;
use tilecraft_common::ConfigError;
use tilecraft_worldgen::{ScatterDensity, DEFAULT_FLOWER_DENSITY, DEFAULT_ROCK_DENSITY};
use tracing::{info, warn};

/// How persistence requests are executed.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum IoMode {
    /// On the calling thread; completions are delivered on the next drain.
    Inline,
    /// On a dedicated worker thread.
    #[default]
    Background,
}

/// World configuration parameters.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct WorldConfig {
    // === Geometry ===
    /// Tiles per chunk edge
    pub chunk_edge: u32,
    /// Pixels per tile edge
    pub tile_size: u32,

    // === Active window ===
    /// Chebyshev radius of chunks kept active around the player
    pub neighbor_radius: u32,
    /// Hard cap on simultaneously active chunks
    pub max_active_chunks: usize,

    // === Per-frame budgets ===
    /// Chunks that may be generated in one tick
    pub max_new_chunks_per_frame: usize,
    /// Dirty tiles pushed to the render layer per tick, across all chunks
    pub dirty_flush_budget: usize,

    // === Persistence ===
    /// Delay between a chunk mutation and its save, in milliseconds
    pub save_debounce_ms: u64,
    /// Directory of the durable chunk store
    pub save_dir: PathBuf,
    /// Where persistence work runs
    pub io_mode: IoMode,

    // === Content ===
    /// Chebyshev radius around the origin of present candidate chunks
    pub present_radius: u32,
    /// One flower per this many grass tiles in grass-like chunks
    pub flower_density: u32,
    /// One rock per this many land tiles
    pub rock_density: u32,

    // === Debug ===
    /// Verbose per-chunk logging
    pub debug: bool,
}

impl Default for WorldConfig {
    fn default() -> Self {
        Self {
            chunk_edge: 32,
            tile_size: 16,

            neighbor_radius: 1,
            max_active_chunks: 25,

            max_new_chunks_per_frame: 2,
            dirty_flush_budget: 512,

            save_debounce_ms: 1500,
            save_dir: PathBuf::from("saves/chunks"),
            io_mode: IoMode::Background,

            present_radius: 2,
            flower_density: DEFAULT_FLOWER_DENSITY,
            rock_density: DEFAULT_ROCK_DENSITY,

            debug: false,
        }
    }
}

impl WorldConfig {
    /// Load configuration from a specific path.
    /// Returns default config if the file doesn't exist or is invalid.
    pub fn load_from<P: AsRef<Path>>(path: P) -> Self {
        let path = path.as_ref();

        if !path.exists() {
            info!("Config file {} not found, using defaults", path.display());
            return Self::default();
        }

        let contents = match fs::read_to_string(path) {
            Ok(contents) => contents,
            Err(e) => {
                warn!("Failed to read config file: {e}");
                return Self::default();
            },
        };

        match toml::from_str::<Self>(&contents) {
            Ok(mut config) => {
                config.validate();
                info!("Loaded config from {}", path.display());
                config
            },
            Err(e) => {
                warn!("Failed to parse config file: {e}");
                Self::default()
            },
        }
    }

    /// Save configuration to a specific path.
    pub fn save_to<P: AsRef<Path>>(&self, path: P) -> Result<(), ConfigError> {
        let path = path.as_ref();

        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent)?;
        }

        let contents =
            toml::to_string_pretty(self).map_err(|e| ConfigError::Encode(e.to_string()))?;
        fs::write(path, contents)?;

        info!("Saved config to {}", path.display());
        Ok(())
    }

    /// Validate and clamp configuration values to sensible ranges.
    pub fn validate(&mut self) {
        self.chunk_edge = self.chunk_edge.clamp(8, 256);
        self.tile_size = self.tile_size.clamp(1, 256);

        self.neighbor_radius = self.neighbor_radius.min(8);
        // The cap must always fit the whole neighbor square.
        self.max_active_chunks = self.max_active_chunks.max(self.window_area()).min(4096);

        self.max_new_chunks_per_frame = self.max_new_chunks_per_frame.clamp(1, 64);
        self.dirty_flush_budget = self.dirty_flush_budget.max(1);

        self.save_debounce_ms = self.save_debounce_ms.min(60_000);
        self.present_radius = self.present_radius.min(16);
    }

    /// Chunks in the full neighbor square, `(2r + 1)^2`.
    #[must_use]
    pub const fn window_area(&self) -> usize {
        let side = 2 * self.neighbor_radius as usize + 1;
        side * side
    }

    /// Pixel extent of one chunk edge.
    #[must_use]
    pub const fn chunk_pixel_size(&self) -> u32 {
        self.chunk_edge * self.tile_size
    }

    /// Save debounce delay.
    #[must_use]
    pub const fn save_debounce(&self) -> Duration {
        Duration::from_millis(self.save_debounce_ms)
    }

    /// Object scatter densities.
    #[must_use]
    pub const fn scatter_density(&self) -> ScatterDensity {
        ScatterDensity {
            flowers: self.flower_density,
            rocks: self.rock_density,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config_is_valid() {
        let mut config = WorldConfig::default();
        let before = config.clone();
        config.validate();
        assert_eq!(config, before);
        assert_eq!(config.chunk_pixel_size(), 512);
        assert_eq!(config.window_area(), 9);
    }

    #[test]
    fn test_validate_raises_cap_to_window() {
        let mut config = WorldConfig {
            neighbor_radius: 3,
            max_active_chunks: 4,
            max_new_chunks_per_frame: 0,
            dirty_flush_budget: 0,
            ..WorldConfig::default()
        };
        config.validate();
        assert_eq!(config.max_active_chunks, 49);
        assert_eq!(config.max_new_chunks_per_frame, 1);
        assert_eq!(config.dirty_flush_budget, 1);
    }

    #[test]
    fn test_toml_round_trip() {
        let dir = tempfile::tempdir().expect("tempdir");
        let path = dir.path().join("world.toml");
        let config = WorldConfig {
            neighbor_radius: 2,
            io_mode: IoMode::Inline,
            debug: true,
            ..WorldConfig::default()
        };
        config.save_to(&path).expect("save config");
        assert_eq!(WorldConfig::load_from(&path), config);
    }

    #[test]
    fn test_partial_toml_uses_defaults() {
        let config: WorldConfig =
            toml::from_str("neighbor_radius = 2\nio_mode = \"inline\"\n").expect("parse");
        assert_eq!(config.neighbor_radius, 2);
        assert_eq!(config.io_mode, IoMode::Inline);
        assert_eq!(config.chunk_edge, 32);
    }

    #[test]
    fn test_missing_or_broken_file_falls_back() {
        let dir = tempfile::tempdir().expect("tempdir");
        assert_eq!(
            WorldConfig::load_from(dir.path().join("absent.toml")),
            WorldConfig::default()
        );

        let broken = dir.path().join("broken.toml");
        fs::write(&broken, "chunk_edge = \"wide\"").expect("write");
        assert_eq!(WorldConfig::load_from(&broken), WorldConfig::default());
    }
}
