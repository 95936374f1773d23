//! Compound (tile, level, index) identity of graph objects.

use std::fmt;

use serde::{Deserialize, Serialize};
use thiserror::Error;

const LEVEL_BITS: u32 = 3;
const TILE_BITS: u32 = 22;
const INDEX_BITS: u32 = 21;

/// Largest hierarchy level a [`GraphId`] can carry.
pub const MAX_LEVEL: u8 = (1 << LEVEL_BITS) as u8 - 1;
/// Largest tile index a [`GraphId`] can carry.
pub const MAX_TILE_ID: u32 = (1 << TILE_BITS) - 1;
/// Largest object index a [`GraphId`] can carry.
pub const MAX_INDEX: u32 = (1 << INDEX_BITS) - 1;

/// Packed value reserved for "no object".
pub const INVALID_VALUE: u64 = (1 << (LEVEL_BITS + TILE_BITS + INDEX_BITS)) - 1;

/// Errors raised when building a [`GraphId`] from out-of-range parts.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum GraphIdError {
    #[error("Level {0} exceeds the maximum level {MAX_LEVEL}")]
    LevelOutOfRange(u8),

    #[error("Tile id {0} exceeds the maximum tile id {MAX_TILE_ID}")]
    TileOutOfRange(u32),

    #[error("Index {0} exceeds the maximum index {MAX_INDEX}")]
    IndexOutOfRange(u32),
}

/// Identity of a node or directed edge: the tile it lives in, the hierarchy
/// level of that tile, and its index within the tile's record array.
///
/// Ids are plain values; they stay meaningful only while the referenced tile
/// can be loaded.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct GraphId {
    tile_id: u32,
    level: u8,
    id: u32,
}

impl GraphId {
    /// Create an id, checking every part fits its bit field.
    pub fn new(tile_id: u32, level: u8, id: u32) -> Result<Self, GraphIdError> {
        if level > MAX_LEVEL {
            return Err(GraphIdError::LevelOutOfRange(level));
        }
        if tile_id > MAX_TILE_ID {
            return Err(GraphIdError::TileOutOfRange(tile_id));
        }
        if id > MAX_INDEX {
            return Err(GraphIdError::IndexOutOfRange(id));
        }
        let graph_id = Self { tile_id, level, id };
        // all three fields at their max collide with the reserved value
        if graph_id.value() == INVALID_VALUE {
            return Err(GraphIdError::IndexOutOfRange(id));
        }
        Ok(graph_id)
    }

    /// Unpack a 46-bit value. Returns `None` for the reserved invalid value
    /// or values with bits above the 46th set.
    pub fn from_value(value: u64) -> Option<Self> {
        if value >= INVALID_VALUE {
            return None;
        }
        Some(Self {
            level: (value & u64::from(MAX_LEVEL)) as u8,
            tile_id: ((value >> LEVEL_BITS) & u64::from(MAX_TILE_ID)) as u32,
            id: ((value >> (LEVEL_BITS + TILE_BITS)) & u64::from(MAX_INDEX)) as u32,
        })
    }

    /// Packed 46-bit form: level in the low 3 bits, then tile id, then index.
    pub fn value(&self) -> u64 {
        u64::from(self.level)
            | u64::from(self.tile_id) << LEVEL_BITS
            | u64::from(self.id) << (LEVEL_BITS + TILE_BITS)
    }

    pub fn tile_id(&self) -> u32 {
        self.tile_id
    }

    pub fn level(&self) -> u8 {
        self.level
    }

    pub fn id(&self) -> u32 {
        self.id
    }

    /// Id of the tile itself (index zero).
    pub fn tile_base(&self) -> Self {
        Self { id: 0, ..*self }
    }

    /// Same tile and level, different index. `None` when the index does not fit.
    pub fn with_id(&self, id: u32) -> Option<Self> {
        Self::new(self.tile_id, self.level, id).ok()
    }

    /// Whether both ids address objects in the same tile.
    pub fn same_tile(&self, other: &GraphId) -> bool {
        self.tile_id == other.tile_id && self.level == other.level
    }
}

impl fmt::Display for GraphId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}/{}/{}", self.level, self.tile_id, self.id)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_value_layout() {
        let id = GraphId::new(756425, 2, 7).unwrap();
        assert_eq!(id.value(), 2 | (756425 << 3) | (7 << 25));
        assert_eq!(GraphId::from_value(id.value()), Some(id));
    }

    #[test]
    fn test_invalid_value() {
        assert_eq!(INVALID_VALUE, 0x3fff_ffff_ffff);
        assert_eq!(GraphId::from_value(INVALID_VALUE), None);
        assert_eq!(GraphId::from_value(u64::MAX), None);
        assert!(GraphId::new(MAX_TILE_ID, MAX_LEVEL, MAX_INDEX).is_err());
    }

    #[test]
    fn test_out_of_range_parts() {
        assert_eq!(
            GraphId::new(0, 8, 0),
            Err(GraphIdError::LevelOutOfRange(8))
        );
        assert_eq!(
            GraphId::new(MAX_TILE_ID + 1, 0, 0),
            Err(GraphIdError::TileOutOfRange(MAX_TILE_ID + 1))
        );
        assert_eq!(
            GraphId::new(0, 0, MAX_INDEX + 1),
            Err(GraphIdError::IndexOutOfRange(MAX_INDEX + 1))
        );
    }

    #[test]
    fn test_tile_base_and_with_id() {
        let id = GraphId::new(42, 1, 99).unwrap();
        assert_eq!(id.tile_base(), GraphId::new(42, 1, 0).unwrap());
        assert_eq!(id.with_id(3), Some(GraphId::new(42, 1, 3).unwrap()));
        assert_eq!(id.with_id(MAX_INDEX + 1), None);
        assert!(id.same_tile(&id.with_id(0).unwrap()));
        assert!(!id.same_tile(&GraphId::new(42, 2, 99).unwrap()));
    }

    #[test]
    fn test_display() {
        let id = GraphId::new(756425, 2, 7).unwrap();
        assert_eq!(id.to_string(), "2/756425/7");
    }

    mod property_tests {
        use super::*;
        use proptest::prelude::*;

        proptest! {
            #[test]
            fn test_pack_unpack_roundtrip(
                tile in 0u32..=MAX_TILE_ID,
                level in 0u8..MAX_LEVEL,
                index in 0u32..=MAX_INDEX,
            ) {
                let id = GraphId::new(tile, level, index)?;
                prop_assert!(id.value() < INVALID_VALUE);
                prop_assert_eq!(GraphId::from_value(id.value()), Some(id));
            }
        }
    }
}
