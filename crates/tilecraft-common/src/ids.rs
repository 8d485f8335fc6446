//! ID types for tiles, world objects, and world seeds.

use serde::{Deserialize, Serialize};

/// Numeric ground-material id stored in a tile.
pub type TileId = u16;

/// Pre-defined tile-type ids.
pub mod tile_ids {
    use super::TileId;

    /// Open water. Never walkable.
    pub const WATER: TileId = 1;
    /// Beach sand.
    pub const SAND: TileId = 2;
    /// Grass (flowers grow here).
    pub const GRASS: TileId = 3;
    /// Brown forest floor / dirt.
    pub const DIRT: TileId = 4;
    /// Snow caps.
    pub const SNOW: TileId = 5;
    /// Bare rock ground.
    pub const ROCK_GROUND: TileId = 6;
    /// Player-placed planks.
    pub const PLANKS: TileId = 7;
}

/// Kind of object placed on a tile's object layer.
///
/// Objects never occupy the ground layer; a tile hosts at most one.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum ObjectKind {
    /// Red flower.
    FlowerRed,
    /// Yellow flower.
    FlowerYellow,
    /// Blue flower.
    FlowerBlue,
    /// Pebble-sized rock.
    RockSmall,
    /// Medium rock.
    RockMedium,
    /// Boulder.
    RockLarge,
    /// The unique per-world present.
    Present,
}

impl ObjectKind {
    /// All flower kinds, in draw order.
    pub const FLOWERS: [Self; 3] = [Self::FlowerRed, Self::FlowerYellow, Self::FlowerBlue];

    /// All rock size stages, smallest first.
    pub const ROCKS: [Self; 3] = [Self::RockSmall, Self::RockMedium, Self::RockLarge];

    /// Stable numeric id used in the persisted format.
    #[must_use]
    pub const fn id(self) -> u16 {
        match self {
            Self::FlowerRed => 1,
            Self::FlowerYellow => 2,
            Self::FlowerBlue => 3,
            Self::RockSmall => 10,
            Self::RockMedium => 11,
            Self::RockLarge => 12,
            Self::Present => 99,
        }
    }

    /// Looks up a kind from its persisted id.
    #[must_use]
    pub const fn from_id(id: u16) -> Option<Self> {
        match id {
            1 => Some(Self::FlowerRed),
            2 => Some(Self::FlowerYellow),
            3 => Some(Self::FlowerBlue),
            10 => Some(Self::RockSmall),
            11 => Some(Self::RockMedium),
            12 => Some(Self::RockLarge),
            99 => Some(Self::Present),
            _ => None,
        }
    }

    /// Whether this is one of the flower kinds.
    #[must_use]
    pub const fn is_flower(self) -> bool {
        matches!(self, Self::FlowerRed | Self::FlowerYellow | Self::FlowerBlue)
    }

    /// Whether this is one of the rock size stages.
    #[must_use]
    pub const fn is_rock(self) -> bool {
        matches!(self, Self::RockSmall | Self::RockMedium | Self::RockLarge)
    }
}

/// Opaque identifier of one save / playthrough.
///
/// Either free text or an integer; both render through `Display` into the
/// composite keys every derived seed is hashed from.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(untagged)]
pub enum WorldSeed {
    /// Numeric seed.
    Number(i64),
    /// Text seed.
    Text(String),
}

impl WorldSeed {
    /// Creates a text seed.
    #[must_use]
    pub fn text(seed: impl Into<String>) -> Self {
        Self::Text(seed.into())
    }
}

impl Default for WorldSeed {
    fn default() -> Self {
        Self::Number(12345)
    }
}

impl From<i64> for WorldSeed {
    fn from(value: i64) -> Self {
        Self::Number(value)
    }
}

impl From<&str> for WorldSeed {
    fn from(value: &str) -> Self {
        Self::Text(value.to_owned())
    }
}

impl From<String> for WorldSeed {
    fn from(value: String) -> Self {
        Self::Text(value)
    }
}

impl std::fmt::Display for WorldSeed {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Number(n) => write!(f, "{n}"),
            Self::Text(s) => f.write_str(s),
        }
    }
}
