//! # Tilecraft Worldgen
//!
//! Deterministic procedural generation for Tilecraft.
//!
//! This crate provides:
//! - Seed hashing and a seeded pseudo-random generator
//! - 2D value noise
//! - Terrain zones and the chunk biome registry
//! - Island terrain generation per chunk
//! - Flower and rock scatter
//!
//! Everything here is a pure function of its inputs: identical world seed and
//! chunk coordinates always produce identical output.

#![warn(missing_docs)]
#![warn(clippy::all)]
#![deny(clippy::unwrap_used)]

pub mod biome;
pub mod island;
pub mod noise;
pub mod rng;
pub mod scatter;

/// Prelude for convenient imports
pub mod prelude {
    pub use crate::biome::*;
    pub use crate::island::*;
    pub use crate::noise::*;
    pub use crate::rng::*;
    pub use crate::scatter::*;
}

pub use prelude::*;
