//! Persistence worker.
//!
//! Loads and saves are queued as jobs and their outcomes come back as
//! completions the manager drains at the start of each tick. Jobs run in
//! submission order, so a load queued after a save of the same key observes
//! that save.

use std::collections::VecDeque;
use std::sync::Arc;
use std::thread::JoinHandle;

use crossbeam_channel::{bounded, unbounded, Receiver, Sender};
use tilecraft_common::{ChunkCoord, StoreError, StoreResult};
use tracing::{debug, error, warn};

use crate::chunk::ChunkInstanceId;
use crate::config::IoMode;
use crate::serialized::SerializedChunk;
use crate::store::ChunkStore;

/// One unit of persistence work.
#[derive(Debug, Clone)]
pub enum IoJob {
    /// Read the document of a freshly generated chunk.
    Load {
        /// Storage key
        key: String,
        /// Chunk coordinate
        coord: ChunkCoord,
        /// Chunk instance the result is meant for
        instance: ChunkInstanceId,
    },
    /// Write a chunk document.
    Save {
        /// Storage key
        key: String,
        /// Document to write
        data: Box<SerializedChunk>,
    },
}

impl IoJob {
    fn run(self, store: &dyn ChunkStore) -> IoCompletion {
        match self {
            Self::Load {
                key,
                coord,
                instance,
            } => IoCompletion::Loaded {
                coord,
                instance,
                result: store.load(&key),
            },
            Self::Save { key, data } => {
                let result = store.save(&key, &data);
                IoCompletion::Saved { key, result }
            },
        }
    }

    fn disconnected(self) -> IoCompletion {
        match self {
            Self::Load {
                coord, instance, ..
            } => IoCompletion::Loaded {
                coord,
                instance,
                result: Err(StoreError::Disconnected),
            },
            Self::Save { key, .. } => IoCompletion::Saved {
                key,
                result: Err(StoreError::Disconnected),
            },
        }
    }
}

/// Outcome of one [`IoJob`].
#[derive(Debug)]
pub enum IoCompletion {
    /// A load finished.
    Loaded {
        /// Chunk coordinate
        coord: ChunkCoord,
        /// Chunk instance the load was issued for
        instance: ChunkInstanceId,
        /// Loaded document, `None` when nothing usable was stored
        result: StoreResult<Option<SerializedChunk>>,
    },
    /// A save finished.
    Saved {
        /// Storage key
        key: String,
        /// Save outcome
        result: StoreResult<()>,
    },
}

enum Message {
    Job(IoJob),
    Flush(Sender<()>),
    Shutdown,
}

enum Backend {
    Inline {
        store: Arc<dyn ChunkStore>,
    },
    Background {
        requests: Sender<Message>,
        completions: Receiver<IoCompletion>,
        worker: Option<JoinHandle<()>>,
    },
}

/// Persistence job queue.
pub struct ChunkIo {
    backend: Backend,
    store_name: &'static str,
    // Completions produced on the calling thread.
    local: VecDeque<IoCompletion>,
    in_flight: usize,
}

impl std::fmt::Debug for ChunkIo {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ChunkIo")
            .field("mode", &self.mode())
            .field("store", &self.store_name)
            .field("in_flight", &self.in_flight)
            .finish()
    }
}

fn run_worker(store: &dyn ChunkStore, requests: &Receiver<Message>, done: &Sender<IoCompletion>) {
    while let Ok(message) = requests.recv() {
        match message {
            Message::Job(job) => {
                if done.send(job.run(store)).is_err() {
                    break;
                }
            },
            Message::Flush(ack) => {
                let _ = ack.send(());
            },
            Message::Shutdown => break,
        }
    }
    debug!("Persistence worker stopped");
}

impl ChunkIo {
    /// Creates a job queue over `store`.
    ///
    /// If the background thread cannot be spawned the queue runs inline.
    #[must_use]
    pub fn new(store: Arc<dyn ChunkStore>, mode: IoMode) -> Self {
        let store_name = store.name();
        let backend = match mode {
            IoMode::Inline => Backend::Inline { store },
            IoMode::Background => Self::spawn(store),
        };
        Self {
            backend,
            store_name,
            local: VecDeque::new(),
            in_flight: 0,
        }
    }

    fn spawn(store: Arc<dyn ChunkStore>) -> Backend {
        let (requests, jobs) = unbounded();
        let (done, completions) = unbounded();
        let worker_store = Arc::clone(&store);
        let spawned = std::thread::Builder::new()
            .name("tilecraft-io".into())
            .spawn(move || run_worker(worker_store.as_ref(), &jobs, &done));

        match spawned {
            Ok(handle) => Backend::Background {
                requests,
                completions,
                worker: Some(handle),
            },
            Err(e) => {
                warn!("Failed to spawn persistence worker ({e}), running inline");
                Backend::Inline { store }
            },
        }
    }

    /// Mode actually in use.
    #[must_use]
    pub const fn mode(&self) -> IoMode {
        match self.backend {
            Backend::Inline { .. } => IoMode::Inline,
            Backend::Background { .. } => IoMode::Background,
        }
    }

    /// Name of the underlying store.
    #[must_use]
    pub const fn store_name(&self) -> &'static str {
        self.store_name
    }

    /// Jobs submitted whose completion has not been drained yet.
    #[must_use]
    pub const fn in_flight(&self) -> usize {
        self.in_flight
    }

    /// Queues a job.
    pub fn submit(&mut self, job: IoJob) {
        self.in_flight += 1;
        match &self.backend {
            Backend::Inline { store } => {
                let completion = job.run(store.as_ref());
                self.local.push_back(completion);
            },
            Backend::Background { requests, .. } => {
                if let Err(failed) = requests.send(Message::Job(job)) {
                    error!("Persistence worker is gone");
                    if let Message::Job(job) = failed.into_inner() {
                        self.local.push_back(job.disconnected());
                    }
                }
            },
        }
    }

    /// Queues a load of `key` for a chunk instance.
    pub fn request_load(&mut self, key: String, coord: ChunkCoord, instance: ChunkInstanceId) {
        self.submit(IoJob::Load {
            key,
            coord,
            instance,
        });
    }

    /// Queues a save of `data` under `key`.
    pub fn request_save(&mut self, key: String, data: SerializedChunk) {
        self.submit(IoJob::Save {
            key,
            data: Box::new(data),
        });
    }

    /// Takes every completion available right now.
    pub fn drain(&mut self) -> Vec<IoCompletion> {
        let mut drained: Vec<IoCompletion> = self.local.drain(..).collect();
        if let Backend::Background { completions, .. } = &self.backend {
            drained.extend(completions.try_iter());
        }
        self.in_flight = self.in_flight.saturating_sub(drained.len());
        drained
    }

    /// Blocks until every job submitted so far has run.
    pub fn flush(&self) {
        if let Backend::Background { requests, .. } = &self.backend {
            let (ack, acked) = bounded(1);
            if requests.send(Message::Flush(ack)).is_ok() {
                let _ = acked.recv();
            }
        }
    }
}

impl Drop for ChunkIo {
    fn drop(&mut self) {
        if let Backend::Background {
            requests, worker, ..
        } = &mut self.backend
        {
            let _ = requests.send(Message::Shutdown);
            if let Some(handle) = worker.take() {
                if handle.join().is_err() {
                    error!("Persistence worker panicked");
                }
            }
        }
    }
}
