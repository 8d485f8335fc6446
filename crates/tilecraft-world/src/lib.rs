//! # Tilecraft World
//!
//! World management for Tilecraft.
//!
//! This crate handles:
//! - Chunk generation, mutation and sparse diffs
//! - The streamed window of active chunks around the player
//! - Budgeted render flushing through a host-provided tile layer
//! - Debounced chunk persistence on a background worker
//! - Placement of the unique per-world present

#![warn(missing_docs)]
#![warn(clippy::all)]
#![deny(clippy::unwrap_used)]

pub mod chunk;
pub mod config;
pub mod events;
pub mod inventory;
pub mod io;
pub mod manager;
pub mod metrics;
pub mod present;
pub mod render;
pub mod serialized;
pub mod store;

#[cfg(test)]
mod scenario_tests;

/// Prelude for convenient imports
pub mod prelude {
    pub use crate::chunk::*;
    pub use crate::config::*;
    pub use crate::events::*;
    pub use crate::inventory::*;
    pub use crate::io::*;
    pub use crate::manager::*;
    pub use crate::metrics::*;
    pub use crate::present::*;
    pub use crate::render::*;
    pub use crate::serialized::*;
    pub use crate::store::*;
}

pub use prelude::*;
