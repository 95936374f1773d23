//! Coordinate, bounding box and error types for the tiling scheme.

use std::fmt::Debug;

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// A 2D point the grid can tile.
///
/// Implementors pick the coordinate convention: planar grids treat `x` as an
/// ordinary axis, spherical grids treat `x` as longitude that wraps around
/// the date line. Latitude (`y`) never wraps.
pub trait Coordinate: Copy + Debug + PartialEq {
    /// Whether `x` wraps around the world (longitude).
    const SPHERICAL: bool;

    /// Create a coordinate from its two axis values.
    fn new(x: f64, y: f64) -> Self;

    /// Horizontal axis value (longitude for spherical coordinates).
    fn x(&self) -> f64;

    /// Vertical axis value (latitude for spherical coordinates).
    fn y(&self) -> f64;
}

/// A point on a plane.
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct Point2 {
    pub x: f64,
    pub y: f64,
}

impl Point2 {
    pub fn new(x: f64, y: f64) -> Self {
        Self { x, y }
    }
}

impl Coordinate for Point2 {
    const SPHERICAL: bool = false;

    fn new(x: f64, y: f64) -> Self {
        Self { x, y }
    }

    fn x(&self) -> f64 {
        self.x
    }

    fn y(&self) -> f64 {
        self.y
    }
}

/// A longitude/latitude pair in degrees.
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct PointLL {
    pub lng: f64,
    pub lat: f64,
}

impl PointLL {
    pub fn new(lng: f64, lat: f64) -> Self {
        Self { lng, lat }
    }

    pub fn lng(&self) -> f64 {
        self.lng
    }

    pub fn lat(&self) -> f64 {
        self.lat
    }
}

impl Coordinate for PointLL {
    const SPHERICAL: bool = true;

    fn new(x: f64, y: f64) -> Self {
        Self { lng: x, lat: y }
    }

    fn x(&self) -> f64 {
        self.lng
    }

    fn y(&self) -> f64 {
        self.lat
    }
}

/// Axis-aligned rectangle given by its min and max corners.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct BoundingBox<C> {
    min: C,
    max: C,
}

impl<C: Coordinate> BoundingBox<C> {
    /// Create a box from its corner values.
    pub fn new(minx: f64, miny: f64, maxx: f64, maxy: f64) -> Self {
        Self {
            min: C::new(minx, miny),
            max: C::new(maxx, maxy),
        }
    }

    /// Create a box from two corner points.
    pub fn from_corners(min: C, max: C) -> Self {
        Self { min, max }
    }

    /// A zero-area box around a single point.
    pub fn from_point(point: C) -> Self {
        Self {
            min: point,
            max: point,
        }
    }

    pub fn min(&self) -> C {
        self.min
    }

    pub fn max(&self) -> C {
        self.max
    }

    pub fn minx(&self) -> f64 {
        self.min.x()
    }

    pub fn miny(&self) -> f64 {
        self.min.y()
    }

    pub fn maxx(&self) -> f64 {
        self.max.x()
    }

    pub fn maxy(&self) -> f64 {
        self.max.y()
    }

    pub fn width(&self) -> f64 {
        self.maxx() - self.minx()
    }

    pub fn height(&self) -> f64 {
        self.maxy() - self.miny()
    }

    /// Whether the point lies inside the box or on its boundary.
    pub fn contains(&self, point: &C) -> bool {
        point.x() >= self.minx()
            && point.x() <= self.maxx()
            && point.y() >= self.miny()
            && point.y() <= self.maxy()
    }

    /// Whether the two boxes share any point (touching edges count).
    pub fn intersects(&self, other: &BoundingBox<C>) -> bool {
        self.minx() <= other.maxx()
            && other.minx() <= self.maxx()
            && self.miny() <= other.maxy()
            && other.miny() <= self.maxy()
    }

    /// Grow the box so it contains `point`.
    pub fn expand(&mut self, point: &C) {
        self.min = C::new(self.minx().min(point.x()), self.miny().min(point.y()));
        self.max = C::new(self.maxx().max(point.x()), self.maxy().max(point.y()));
    }
}

/// Errors raised by grid geometry.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum GridError {
    /// The grid configuration cannot describe any tiles.
    #[error("Invalid grid configuration: {0}")]
    InvalidConfig(String),

    /// A tile index outside `0..tile_count`.
    #[error("Invalid tile id {tile_id} (grid has {tile_count} tiles)")]
    InvalidTileId { tile_id: u32, tile_count: u32 },

    /// A subdivision index outside `0..N*N`.
    #[error("Invalid subdivision {subdivision} (tiles have {count} subdivisions)")]
    InvalidSubdivision { subdivision: u16, count: u32 },

    /// A coordinate outside a grid that does not wrap there.
    #[error("Coordinate ({x}, {y}) is outside the grid")]
    OutOfBounds { x: f64, y: f64 },

    /// The tile sits on a non-wrapping edge of the grid.
    #[error("Tile {tile_id} has no {direction} neighbor")]
    NoNeighbor {
        tile_id: u32,
        direction: &'static str,
    },

    /// A nearest-first enumeration was advanced after producing every subdivision.
    #[error("Subdivisions were exhausted")]
    Exhausted,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_bounding_box_contains_is_inclusive() {
        let bbox: BoundingBox<Point2> = BoundingBox::new(-1.0, -1.0, 1.0, 1.0);
        assert!(bbox.contains(&Point2::new(0.0, 0.0)));
        assert!(bbox.contains(&Point2::new(1.0, -1.0)));
        assert!(!bbox.contains(&Point2::new(1.0001, 0.0)));
    }

    #[test]
    fn test_bounding_box_expand() {
        let mut bbox = BoundingBox::from_point(PointLL::new(10.0, 20.0));
        bbox.expand(&PointLL::new(9.0, 21.5));
        bbox.expand(&PointLL::new(9.5, 20.5));
        assert_eq!(bbox.min(), PointLL::new(9.0, 20.0));
        assert_eq!(bbox.max(), PointLL::new(10.0, 21.5));
    }

    #[test]
    fn test_bounding_box_intersects_touching_edges() {
        let a: BoundingBox<Point2> = BoundingBox::new(0.0, 0.0, 1.0, 1.0);
        let b = BoundingBox::new(1.0, 0.5, 2.0, 2.0);
        let c = BoundingBox::new(1.5, 1.5, 2.0, 2.0);
        assert!(a.intersects(&b));
        assert!(!a.intersects(&c));
    }

    #[test]
    fn test_grid_error_display() {
        let err = GridError::InvalidTileId {
            tile_id: 70000,
            tile_count: 64800,
        };
        assert_eq!(err.to_string(), "Invalid tile id 70000 (grid has 64800 tiles)");
        assert_eq!(GridError::Exhausted.to_string(), "Subdivisions were exhausted");
    }
}
