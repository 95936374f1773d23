//! Graph tile data: identities, records, the binary tile format and the
//! level hierarchy.

mod graph_id;
mod hierarchy;
pub mod polyline;
mod records;
mod tile;
mod writer;

pub use graph_id::{GraphId, GraphIdError, INVALID_VALUE, MAX_INDEX, MAX_LEVEL, MAX_TILE_ID};
pub use hierarchy::{TileHierarchy, TileLevel, BINS_PER_TILE};
pub use records::{access, DirectedEdge, NodeInfo, NodeTransition, RoadClass, Surface, Use};
pub use tile::{EdgeInfo, GraphTile, TileDecodeError};
pub use writer::{GraphTileWriter, TileWriteError};
