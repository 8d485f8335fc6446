//! Coordinate types for pixel, global tile, chunk, and local tile positions.
//!
//! The world is an unbounded grid of square chunks. Every conversion between
//! spaces uses floor division (`div_euclid` / `rem_euclid`), so negative
//! coordinates map onto the chunk to their upper-left the same way positive
//! ones do.

use bytemuck::{Pod, Zeroable};
use glam::Vec2;
use serde::{Deserialize, Serialize};

/// Global tile coordinate (unbounded, in tile units).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Pod, Zeroable)]
#[repr(C)]
pub struct TileCoord {
    /// X coordinate in tile space
    pub x: i32,
    /// Y coordinate in tile space
    pub y: i32,
}

impl TileCoord {
    /// Creates a new global tile coordinate.
    #[must_use]
    pub const fn new(x: i32, y: i32) -> Self {
        Self { x, y }
    }

    /// Converts a pixel position to the tile containing it.
    #[must_use]
    pub fn from_pixel(position: Vec2, tile_size: u32) -> Self {
        let size = tile_size.max(1) as f32;
        Self {
            x: (position.x / size).floor() as i32,
            y: (position.y / size).floor() as i32,
        }
    }

    /// Converts to the chunk coordinate owning this tile.
    #[must_use]
    pub const fn to_chunk_coord(self, chunk_edge: u32) -> ChunkCoord {
        let edge = chunk_edge as i32;
        ChunkCoord {
            x: self.x.div_euclid(edge),
            y: self.y.div_euclid(edge),
        }
    }

    /// Converts to the local coordinate within the owning chunk.
    #[must_use]
    pub const fn to_local_coord(self, chunk_edge: u32) -> LocalCoord {
        let edge = chunk_edge as i32;
        LocalCoord {
            x: self.x.rem_euclid(edge) as u16,
            y: self.y.rem_euclid(edge) as u16,
        }
    }

    /// Splits into `(chunk, local)` in one call.
    #[must_use]
    pub const fn split(self, chunk_edge: u32) -> (ChunkCoord, LocalCoord) {
        (
            self.to_chunk_coord(chunk_edge),
            self.to_local_coord(chunk_edge),
        )
    }

    /// Pixel position of the tile's top-left corner.
    #[must_use]
    pub fn to_pixel(self, tile_size: u32) -> Vec2 {
        Vec2::new(
            self.x as f32 * tile_size as f32,
            self.y as f32 * tile_size as f32,
        )
    }
}

/// Chunk coordinate (identifies a chunk in the unbounded world grid).
///
/// Ordered by `x`, then `y`, so chunk maps iterate deterministically.
#[derive(
    Debug,
    Clone,
    Copy,
    PartialEq,
    Eq,
    Hash,
    PartialOrd,
    Ord,
    Serialize,
    Deserialize,
    Pod,
    Zeroable,
)]
#[repr(C)]
pub struct ChunkCoord {
    /// X coordinate in chunk space
    pub x: i32,
    /// Y coordinate in chunk space
    pub y: i32,
}

impl ChunkCoord {
    /// The chunk at the world origin.
    pub const ORIGIN: Self = Self::new(0, 0);

    /// Creates a new chunk coordinate.
    #[must_use]
    pub const fn new(x: i32, y: i32) -> Self {
        Self { x, y }
    }

    /// Converts a pixel position to the chunk containing it.
    #[must_use]
    pub fn from_pixel(position: Vec2, chunk_edge: u32, tile_size: u32) -> Self {
        TileCoord::from_pixel(position, tile_size).to_chunk_coord(chunk_edge)
    }

    /// Chebyshev (king-move) distance between two chunks.
    #[must_use]
    pub const fn chebyshev_distance(self, other: Self) -> u32 {
        let dx = self.x.abs_diff(other.x);
        let dy = self.y.abs_diff(other.y);
        if dx > dy {
            dx
        } else {
            dy
        }
    }

    /// Global tile coordinate of the chunk's top-left tile.
    #[must_use]
    pub const fn origin_tile(self, chunk_edge: u32) -> TileCoord {
        TileCoord {
            x: self.x * chunk_edge as i32,
            y: self.y * chunk_edge as i32,
        }
    }

    /// Global tile coordinate of a local tile in this chunk.
    #[must_use]
    pub const fn tile_at(self, local: LocalCoord, chunk_edge: u32) -> TileCoord {
        let origin = self.origin_tile(chunk_edge);
        TileCoord {
            x: origin.x + local.x as i32,
            y: origin.y + local.y as i32,
        }
    }

    /// Pixel offset of the chunk's top-left corner.
    #[must_use]
    pub fn pixel_origin(self, chunk_edge: u32, tile_size: u32) -> Vec2 {
        self.origin_tile(chunk_edge).to_pixel(tile_size)
    }

    /// All chunks within `radius` (Chebyshev), nearest ring first.
    ///
    /// Ring `n` is walked clockwise starting from its top-left corner.
    #[must_use]
    pub fn spiral(self, radius: u32) -> Vec<Self> {
        let side = 2 * radius as usize + 1;
        let mut result = Vec::with_capacity(side * side);
        result.push(self);

        for ring in 1..=radius as i32 {
            for x in -ring..ring {
                result.push(Self::new(self.x + x, self.y - ring));
            }
            for y in -ring..ring {
                result.push(Self::new(self.x + ring, self.y + y));
            }
            for x in (-ring + 1..=ring).rev() {
                result.push(Self::new(self.x + x, self.y + ring));
            }
            for y in (-ring + 1..=ring).rev() {
                result.push(Self::new(self.x - ring, self.y + y));
            }
        }

        result
    }
}

impl std::fmt::Display for ChunkCoord {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "({}, {})", self.x, self.y)
    }
}

/// Local tile coordinate within a chunk (0 to chunk_edge-1).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Pod, Zeroable)]
#[repr(C)]
pub struct LocalCoord {
    /// X coordinate within chunk
    pub x: u16,
    /// Y coordinate within chunk
    pub y: u16,
}

impl LocalCoord {
    /// Creates a new local coordinate.
    #[must_use]
    pub const fn new(x: u16, y: u16) -> Self {
        Self { x, y }
    }

    /// Converts to linear index (`x + y * edge`) for array access.
    #[must_use]
    pub const fn to_index(self, chunk_edge: u32) -> usize {
        (self.y as usize) * (chunk_edge as usize) + (self.x as usize)
    }

    /// Creates from linear index.
    #[must_use]
    pub const fn from_index(index: usize, chunk_edge: u32) -> Self {
        let edge = chunk_edge as usize;
        Self {
            x: (index % edge) as u16,
            y: (index / edge) as u16,
        }
    }

    /// Whether this coordinate lies inside a chunk of the given edge.
    #[must_use]
    pub const fn in_bounds(self, chunk_edge: u32) -> bool {
        (self.x as u32) < chunk_edge && (self.y as u32) < chunk_edge
    }
}
