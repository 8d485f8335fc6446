//! # Tilecraft Common
//!
//! Common types shared by every Tilecraft crate:
//! - Coordinate types (pixel, global tile, chunk, local tile)
//! - ID types (tile types, object kinds, world seeds)
//! - Persisted format versions
//! - Common error types

#![warn(missing_docs)]
#![warn(clippy::all)]
#![deny(clippy::unwrap_used)]

pub mod coords;
pub mod error;
pub mod ids;
pub mod version;

/// Prelude module for convenient imports
pub mod prelude {
    pub use crate::coords::*;
    pub use crate::error::*;
    pub use crate::ids::*;
    pub use crate::version::*;
}

pub use prelude::*;

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    #[test]
    fn test_version_window() {
        assert!(can_read_chunk_version(1));
        assert!(can_read_chunk_version(CHUNK_FORMAT_VERSION));
        assert!(!can_read_chunk_version(0));
        assert!(!can_read_chunk_version(CHUNK_FORMAT_VERSION + 1));
    }

    proptest! {
        #[test]
        fn prop_tile_split_round_trips(x in -1_000_000i32..1_000_000, y in -1_000_000i32..1_000_000, edge in 1u32..128) {
            let tile = TileCoord::new(x, y);
            let (chunk, local) = tile.split(edge);
            prop_assert!(local.in_bounds(edge));
            prop_assert_eq!(chunk.tile_at(local, edge), tile);
        }
    }
}
