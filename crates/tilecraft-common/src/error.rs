//! Error types for Tilecraft.

use thiserror::Error;

/// Top-level error type for Tilecraft operations.
#[derive(Debug, Error)]
pub enum TilecraftError {
    /// Chunk persistence errors
    #[error("Store error: {0}")]
    Store(#[from] StoreError),

    /// Static biome registry misconfiguration
    #[error("Registry error: {0}")]
    Registry(#[from] RegistryError),

    /// Invalid configuration
    #[error("Config error: {0}")]
    Config(#[from] ConfigError),
}

/// Chunk persistence errors.
#[derive(Debug, Error)]
pub enum StoreError {
    /// Underlying I/O failed
    #[error("I/O failed for {key}: {source}")]
    Io {
        /// Storage key involved
        key: String,
        /// Cause
        #[source]
        source: std::io::Error,
    },

    /// Encoding a chunk document failed
    #[error("Failed to encode {key}: {reason}")]
    Encode {
        /// Storage key involved
        key: String,
        /// Cause
        reason: String,
    },

    /// The persistence worker is no longer running
    #[error("Persistence worker disconnected")]
    Disconnected,
}

/// Biome registry errors. These indicate a static configuration bug.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum RegistryError {
    /// No biome definitions registered
    #[error("Biome registry is empty")]
    Empty,

    /// A biome id was registered twice
    #[error("Duplicate biome id: {0}")]
    DuplicateId(String),
}

/// Configuration errors.
#[derive(Debug, Error)]
pub enum ConfigError {
    /// Reading or writing the config file failed
    #[error("Config I/O failed: {0}")]
    Io(#[from] std::io::Error),

    /// Config text could not be encoded
    #[error("Config encode failed: {0}")]
    Encode(String),
}

/// Result type alias for store operations.
pub type StoreResult<T> = Result<T, StoreError>;

/// Result type alias for Tilecraft operations.
pub type TilecraftResult<T> = Result<T, TilecraftError>;
