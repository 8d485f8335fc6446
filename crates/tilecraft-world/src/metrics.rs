//! World manager counters.
//!
//! Purely observational: nothing in the manager reads these back to make a
//! decision.

use std::time::Duration;

use serde::Serialize;

/// Snapshot of world manager counters.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct WorldMetrics {
    /// Ticks run so far
    pub frame: u64,
    /// Chunks generated since start
    pub chunks_loaded: u64,
    /// Chunks evicted since start
    pub chunks_unloaded: u64,
    /// Chunks currently active
    pub chunks_active: usize,
    /// Wall time of the most recent chunk generation, in milliseconds
    pub last_generation_ms: f64,
    /// Wall time of all chunk generations, in milliseconds
    pub total_generation_ms: f64,
    /// Dirty tiles pushed to render layers in the last tick
    pub tiles_flushed_last_tick: usize,
    /// Dirty tiles pushed to render layers since start
    pub tiles_flushed_total: u64,
    /// Wall time of the last budgeted flush, in milliseconds
    pub last_flush_ms: f64,
    /// Chunk saves completed successfully
    pub saves_performed: u64,
    /// Chunk saves that failed
    pub save_failures: u64,
    /// Persisted documents applied to live chunks
    pub loads_applied: u64,
    /// Load results dropped because their chunk was gone or replaced
    pub stale_loads_dropped: u64,
    /// Chunk requests deferred by the per-tick creation budget
    pub requests_throttled: u64,
    /// Chunk requests refused by the active-chunk cap
    pub requests_rejected: u64,
    /// Neighbor loads waiting for creation budget
    pub pending_loads: usize,
}

impl WorldMetrics {
    /// Records one chunk generation.
    pub fn record_generation(&mut self, elapsed: Duration) {
        let ms = elapsed.as_secs_f64() * 1000.0;
        self.chunks_loaded += 1;
        self.last_generation_ms = ms;
        self.total_generation_ms += ms;
    }

    /// Records one budgeted flush pass.
    pub fn record_flush(&mut self, tiles: usize, elapsed: Duration) {
        self.tiles_flushed_last_tick = tiles;
        self.tiles_flushed_total += tiles as u64;
        self.last_flush_ms = elapsed.as_secs_f64() * 1000.0;
    }

    /// Mean chunk generation time in milliseconds.
    #[must_use]
    pub fn average_generation_ms(&self) -> f64 {
        if self.chunks_loaded == 0 {
            0.0
        } else {
            self.total_generation_ms / self.chunks_loaded as f64
        }
    }
}
