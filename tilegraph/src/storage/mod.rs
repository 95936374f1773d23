//! Sources of raw tile bytes.
//!
//! The cache never reads tiles itself; it asks a [`TileStorage`] for the
//! bytes of a tile id and decodes them. Two implementations are provided:
//!
//! - [`MemoryTileStorage`] - tiles held in a map, for tests and tools that
//!   assemble tiles at runtime
//! - [`DirectoryTileStorage`] - one file per tile under a root directory

use std::collections::HashMap;
use std::io;
use std::path::{Path, PathBuf};

use bytes::Bytes;
use parking_lot::RwLock;
use thiserror::Error;
use tracing::debug;

use crate::graph::{GraphId, TileHierarchy};

/// File extension of tile files.
pub const TILE_EXTENSION: &str = "gph";

/// Errors raised by tile storage.
#[derive(Debug, Error)]
pub enum StorageError {
    /// No tile exists for the id.
    #[error("Tile {0} not found")]
    NotFound(GraphId),

    /// The tile exists but could not be read.
    #[error("Failed to read tile {graph_id}: {source}")]
    Io {
        graph_id: GraphId,
        #[source]
        source: io::Error,
    },
}

/// Provides the raw bytes of graph tiles.
///
/// Implementations own latency, retries and timeouts. `load` is called with
/// the tile's base id (index zero).
pub trait TileStorage: Send + Sync {
    /// Load the bytes of a tile.
    ///
    /// # Errors
    ///
    /// [`StorageError::NotFound`] when the tile does not exist, or
    /// [`StorageError::Io`] when it cannot be read.
    fn load(&self, graph_id: GraphId) -> Result<Bytes, StorageError>;
}

/// Tiles kept in memory.
#[derive(Debug, Default)]
pub struct MemoryTileStorage {
    tiles: RwLock<HashMap<GraphId, Bytes>>,
}

impl MemoryTileStorage {
    pub fn new() -> Self {
        Self::default()
    }

    /// Store (or replace) the bytes of a tile.
    pub fn insert(&self, graph_id: GraphId, data: Bytes) {
        self.tiles.write().insert(graph_id.tile_base(), data);
    }

    /// Remove a tile. Returns whether it existed.
    pub fn remove(&self, graph_id: GraphId) -> bool {
        self.tiles.write().remove(&graph_id.tile_base()).is_some()
    }

    pub fn len(&self) -> usize {
        self.tiles.read().len()
    }

    pub fn is_empty(&self) -> bool {
        self.tiles.read().is_empty()
    }
}

impl TileStorage for MemoryTileStorage {
    fn load(&self, graph_id: GraphId) -> Result<Bytes, StorageError> {
        self.tiles
            .read()
            .get(&graph_id.tile_base())
            .cloned()
            .ok_or(StorageError::NotFound(graph_id))
    }
}

/// Tiles stored as files: `<root>/<level>/<tile id in groups of 3 digits>.gph`.
///
/// Tile ids are zero-padded to the digit count of the level's largest tile
/// id, rounded up to a multiple of three. Level 2 tile 756425 of a 0.25°
/// world grid lives at `2/000/756/425.gph`.
#[derive(Debug, Clone)]
pub struct DirectoryTileStorage {
    root: PathBuf,
    max_tile_ids: HashMap<u8, u32>,
}

impl DirectoryTileStorage {
    /// Read tiles of every level of `hierarchy` from under `root`.
    pub fn new(root: impl Into<PathBuf>, hierarchy: &TileHierarchy) -> Self {
        let max_tile_ids = hierarchy
            .levels()
            .chain(std::iter::once(hierarchy.transit_level()))
            .filter_map(|level| {
                let tiles = hierarchy.level_tiles(level.level)?;
                Some((level.level, tiles.tile_count() - 1))
            })
            .collect();
        Self {
            root: root.into(),
            max_tile_ids,
        }
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    /// Path of the tile file, or `None` for a level the hierarchy lacks.
    pub fn tile_path(&self, graph_id: GraphId) -> Option<PathBuf> {
        let max_tile_id = *self.max_tile_ids.get(&graph_id.level())?;
        let digits = max_tile_id.to_string().len().div_ceil(3) * 3;
        let padded = format!("{:0width$}", graph_id.tile_id(), width = digits);

        let mut path = self.root.join(graph_id.level().to_string());
        let groups: Vec<&str> = padded
            .as_bytes()
            .chunks(3)
            .filter_map(|chunk| std::str::from_utf8(chunk).ok())
            .collect();
        if let Some((file, dirs)) = groups.split_last() {
            for dir in dirs {
                path.push(dir);
            }
            path.push(format!("{}.{}", file, TILE_EXTENSION));
        }
        Some(path)
    }
}

impl TileStorage for DirectoryTileStorage {
    fn load(&self, graph_id: GraphId) -> Result<Bytes, StorageError> {
        let path = self
            .tile_path(graph_id)
            .ok_or(StorageError::NotFound(graph_id))?;
        match std::fs::read(&path) {
            Ok(data) => Ok(Bytes::from(data)),
            Err(e) if e.kind() == io::ErrorKind::NotFound => {
                debug!(tile = %graph_id, path = %path.display(), "Tile file missing");
                Err(StorageError::NotFound(graph_id))
            }
            Err(source) => Err(StorageError::Io { graph_id, source }),
        }
    }
}
