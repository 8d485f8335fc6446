//! Chunk event bus.
//!
//! Chunks publish what happened to them; the manager drains the bus once per
//! tick. Chunks never hold a reference to the manager.

use crossbeam_channel::{unbounded, Receiver, Sender};
use tilecraft_common::ChunkCoord;
use tracing::trace;

use crate::chunk::ChunkInstanceId;

/// Events published by chunks.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ChunkEvent {
    /// Tile or object state changed and should be persisted.
    Mutated {
        /// Chunk coordinate
        coord: ChunkCoord,
        /// Chunk instance that changed
        instance: ChunkInstanceId,
    },
}

/// Publishing handle held by each chunk.
#[derive(Debug, Clone)]
pub struct ChunkEventSender {
    /// Channel sender
    sender: Sender<ChunkEvent>,
}

impl ChunkEventSender {
    /// Publishes an event. Events sent after the bus is gone are dropped.
    pub fn publish(&self, event: ChunkEvent) {
        if self.sender.send(event).is_err() {
            trace!("Chunk event bus closed, dropping {event:?}");
        }
    }
}

/// Unbounded event bus; mutation events must never be dropped while the
/// manager is alive.
#[derive(Debug)]
pub struct ChunkEventBus {
    /// Sender for publishing events
    sender: Sender<ChunkEvent>,
    /// Receiver for collecting events
    receiver: Receiver<ChunkEvent>,
}

impl Default for ChunkEventBus {
    fn default() -> Self {
        Self::new()
    }
}

impl ChunkEventBus {
    /// Creates a new event bus.
    #[must_use]
    pub fn new() -> Self {
        let (sender, receiver) = unbounded();
        Self { sender, receiver }
    }

    /// Creates a publishing handle.
    #[must_use]
    pub fn sender(&self) -> ChunkEventSender {
        ChunkEventSender {
            sender: self.sender.clone(),
        }
    }

    /// Drains all pending events.
    pub fn drain(&self) -> Vec<ChunkEvent> {
        self.receiver.try_iter().collect()
    }

    /// Returns the number of pending events.
    #[must_use]
    pub fn pending_count(&self) -> usize {
        self.receiver.len()
    }
}
