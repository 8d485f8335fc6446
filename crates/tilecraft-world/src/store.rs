//! Chunk persistence stores.
//!
//! Two implementations share one contract: a durable directory of JSON
//! documents and an in-memory fallback. Missing, corrupt or unreadable data
//! loads as `None`; only real I/O failures surface as errors.

use std::collections::HashMap;
use std::fs;
use std::io::ErrorKind;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use parking_lot::RwLock;
use tilecraft_common::{StoreError, StoreResult, CHUNK_FORMAT_VERSION};
use tracing::{debug, info, warn};

use crate::config::WorldConfig;
use crate::serialized::SerializedChunk;

/// Keyed chunk document storage.
pub trait ChunkStore: Send + Sync {
    /// Loads the document stored under `key`.
    fn load(&self, key: &str) -> StoreResult<Option<SerializedChunk>>;

    /// Stores `data` under `key`, stamped with the current format version.
    fn save(&self, key: &str, data: &SerializedChunk) -> StoreResult<()>;

    /// Short name for logs.
    fn name(&self) -> &'static str;
}

fn stamped(data: &SerializedChunk) -> SerializedChunk {
    SerializedChunk {
        version: CHUNK_FORMAT_VERSION,
        ..data.clone()
    }
}

/// Volatile store backed by a map of JSON text.
#[derive(Debug, Default)]
pub struct MemoryChunkStore {
    documents: RwLock<HashMap<String, String>>,
}

impl MemoryChunkStore {
    /// Creates an empty store.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of stored documents.
    #[must_use]
    pub fn len(&self) -> usize {
        self.documents.read().len()
    }

    /// Whether nothing is stored.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.documents.read().is_empty()
    }

    /// Stores raw text under `key` without validation.
    pub fn put_raw(&self, key: impl Into<String>, text: impl Into<String>) {
        self.documents.write().insert(key.into(), text.into());
    }
}

impl ChunkStore for MemoryChunkStore {
    fn load(&self, key: &str) -> StoreResult<Option<SerializedChunk>> {
        let documents = self.documents.read();
        Ok(documents
            .get(key)
            .and_then(|text| SerializedChunk::from_json(key, text)))
    }

    fn save(&self, key: &str, data: &SerializedChunk) -> StoreResult<()> {
        let text = stamped(data).to_json()?;
        self.documents.write().insert(key.to_owned(), text);
        Ok(())
    }

    fn name(&self) -> &'static str {
        "memory"
    }
}

/// Durable store: one JSON document per key inside a directory.
#[derive(Debug, Clone)]
pub struct FileChunkStore {
    dir: PathBuf,
}

impl FileChunkStore {
    /// Opens (creating if needed) a store rooted at `dir`.
    pub fn open(dir: impl AsRef<Path>) -> StoreResult<Self> {
        let dir = dir.as_ref().to_path_buf();
        fs::create_dir_all(&dir).map_err(|source| StoreError::Io {
            key: dir.display().to_string(),
            source,
        })?;
        Ok(Self { dir })
    }

    /// Root directory.
    #[must_use]
    pub fn dir(&self) -> &Path {
        &self.dir
    }

    /// File holding the document of `key`.
    #[must_use]
    pub fn path_for(&self, key: &str) -> PathBuf {
        let name: String = key
            .chars()
            .map(|c| if c.is_ascii_alphanumeric() || c == '-' { c } else { '_' })
            .collect();
        self.dir.join(format!("{name}.json"))
    }
}

impl ChunkStore for FileChunkStore {
    fn load(&self, key: &str) -> StoreResult<Option<SerializedChunk>> {
        let path = self.path_for(key);
        let text = match fs::read_to_string(&path) {
            Ok(text) => text,
            Err(e) if e.kind() == ErrorKind::NotFound => return Ok(None),
            Err(e) if e.kind() == ErrorKind::InvalidData => {
                warn!("Ignoring unreadable chunk document {}: {e}", path.display());
                return Ok(None);
            },
            Err(source) => {
                return Err(StoreError::Io {
                    key: key.to_owned(),
                    source,
                })
            },
        };
        Ok(SerializedChunk::from_json(key, &text))
    }

    fn save(&self, key: &str, data: &SerializedChunk) -> StoreResult<()> {
        let text = stamped(data).to_json()?;
        let path = self.path_for(key);
        let temp = path.with_extension("json.tmp");
        let io_err = |source: std::io::Error| StoreError::Io {
            key: key.to_owned(),
            source,
        };

        fs::write(&temp, text).map_err(io_err)?;
        fs::rename(&temp, &path).map_err(io_err)?;
        debug!("Saved {key} to {}", path.display());
        Ok(())
    }

    fn name(&self) -> &'static str {
        "file"
    }
}

/// Opens the durable store configured by `config`, falling back to memory.
#[must_use]
pub fn open_store(config: &WorldConfig) -> Arc<dyn ChunkStore> {
    match FileChunkStore::open(&config.save_dir) {
        Ok(store) => {
            info!("Chunk store at {}", store.dir().display());
            Arc::new(store)
        },
        Err(e) => {
            warn!("Durable chunk store unavailable ({e}), using in-memory store");
            Arc::new(MemoryChunkStore::new())
        },
    }
}
