//! Persisted chunk document.
//!
//! A chunk is never saved whole. Its document holds only what differs from
//! the deterministic baseline: the sparse tile diff and the object layer.

use std::time::{SystemTime, UNIX_EPOCH};

use serde::{Deserialize, Serialize};
use tilecraft_common::{can_read_chunk_version, ChunkCoord, StoreError, TileId, WorldSeed};
use tracing::warn;

/// One changed tile: linear index and tile-type id.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct DiffEntry {
    /// Linear tile index (`x + y * edge`)
    pub i: u32,
    /// Tile-type id
    pub t: TileId,
}

/// One placed object: linear index and object kind id.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct ObjectEntry {
    /// Linear tile index (`x + y * edge`)
    pub i: u32,
    /// Object kind id
    pub k: u16,
}

/// Durable representation of one chunk.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SerializedChunk {
    /// Format version
    pub version: u32,
    /// World seed the chunk belongs to
    pub world_seed: WorldSeed,
    /// Chunk X coordinate
    pub chunk_x: i32,
    /// Chunk Y coordinate
    pub chunk_y: i32,
    /// Registry id of the chunk biome
    #[serde(default)]
    pub biome_id: Option<String>,
    /// Tiles differing from the baseline, sorted by index
    #[serde(default)]
    pub diff: Vec<DiffEntry>,
    /// Full object layer (absent in version 1 documents)
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub objects: Option<Vec<ObjectEntry>>,
    /// Last save time, epoch milliseconds
    #[serde(default)]
    pub last_touched: u64,
}

impl SerializedChunk {
    /// Chunk coordinate of this document.
    #[must_use]
    pub const fn coord(&self) -> ChunkCoord {
        ChunkCoord::new(self.chunk_x, self.chunk_y)
    }

    /// Storage key of this document.
    #[must_use]
    pub fn key(&self) -> String {
        storage_key(&self.world_seed, self.coord())
    }

    /// Encodes as JSON text.
    pub fn to_json(&self) -> Result<String, StoreError> {
        serde_json::to_string(self).map_err(|e| StoreError::Encode {
            key: self.key(),
            reason: e.to_string(),
        })
    }

    /// Decodes JSON text.
    ///
    /// Corrupt documents and documents of an unreadable version yield `None`
    /// with a warning; they are treated as "nothing persisted".
    #[must_use]
    pub fn from_json(key: &str, text: &str) -> Option<Self> {
        match serde_json::from_str::<Self>(text) {
            Ok(doc) if can_read_chunk_version(doc.version) => Some(doc),
            Ok(doc) => {
                warn!("Ignoring {key}: unsupported format version {}", doc.version);
                None
            },
            Err(e) => {
                warn!("Ignoring corrupt chunk document {key}: {e}");
                None
            },
        }
    }
}

/// Storage key of a chunk: `chunk:{seed}:{x}:{y}`.
#[must_use]
pub fn storage_key(world_seed: &WorldSeed, coord: ChunkCoord) -> String {
    format!("chunk:{world_seed}:{}:{}", coord.x, coord.y)
}

/// Current wall-clock time in epoch milliseconds.
#[must_use]
pub fn now_millis() -> u64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|d| d.as_millis() as u64)
        .unwrap_or(0)
}
