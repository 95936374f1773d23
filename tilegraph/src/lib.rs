//! Tilegraph - tiled routing graph access
//!
//! This library provides the geometry of regular tile grids and read access to
//! a routing graph split into tiles across a small hierarchy of levels.
//!
//! # Overview
//!
//! - [`grid`]: tile ids, bounds, neighbors, line supercover and closest-first
//!   search over a regular grid
//! - [`graph`]: graph ids, tile records, the tile binary layout and the level
//!   hierarchy
//! - [`cache`]: byte-budgeted cache of decoded tiles
//! - [`reader`]: traversal queries that span tiles
//!
//! ```ignore
//! use tilegraph::{GraphReader, GraphReaderConfig};
//!
//! let config = GraphReaderConfig::from_json_file("tilegraph.json")?;
//! let reader = GraphReader::from_config(&config)?;
//!
//! let opposing = reader.get_opposing_edge_id(edge_id);
//! let edges = reader.recover_shortcut(shortcut_id);
//! ```

pub mod cache;
pub mod config;
pub mod graph;
pub mod grid;
pub mod logging;
pub mod reader;
pub mod storage;

pub use cache::{CacheStats, TileCache, TileCacheError, TileHandle, TrimResult};
pub use config::{ConfigError, GraphReaderConfig};
pub use graph::{GraphId, GraphTile, TileHierarchy};
pub use grid::{BoundingBox, PointLL, Tiles};
pub use reader::{GraphReader, GraphReaderError};
pub use storage::{DirectoryTileStorage, MemoryTileStorage, TileStorage};

/// Version of the tilegraph library.
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
