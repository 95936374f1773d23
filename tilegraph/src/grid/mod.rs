//! Tiling geometry.
//!
//! A [`Tiles`] grid covers a bounding box with square tiles, each split into
//! `N×N` subdivisions (bins). The grid answers point lookups, neighbor
//! queries, bounding-box tile lists, linestring intersection at subdivision
//! granularity and nearest-first subdivision enumeration.
//!
//! # Example
//!
//! ```
//! use tilegraph::grid::{BoundingBox, PointLL, Tiles};
//!
//! let tiles = Tiles::new(BoundingBox::new(-180.0, -90.0, 180.0, 90.0), 1.0, 5).unwrap();
//! let id = tiles.tile_id(&PointLL::new(-76.5, 40.5)).unwrap();
//! assert_eq!(tiles.row_column(id).unwrap(), (130, 103));
//! ```

mod closest;
mod intersect;
mod tiles;
mod types;

pub use closest::ClosestFirst;
pub use intersect::Intersection;
pub use tiles::Tiles;
pub use types::{BoundingBox, Coordinate, GridError, Point2, PointLL};
