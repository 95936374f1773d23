//! Regular tiling of a bounding box into square tiles and subdivisions.

use super::types::{BoundingBox, Coordinate, GridError};

/// Tolerance used only when deriving row/column counts from the configuration,
/// so that e.g. `360 / 0.1` does not round up to an extra column.
const COUNT_EPSILON: f64 = 1e-9;

/// A regular grid of square tiles, each split into `N×N` subdivisions.
///
/// Tile indices are row-major starting at the lower-left corner of the
/// bounds: `index = row * ncolumns + column`. Subdivision indices are
/// row-major within their tile.
#[derive(Debug, Clone, PartialEq)]
pub struct Tiles<C> {
    bounds: BoundingBox<C>,
    tile_size: f64,
    nsubdivisions: u16,
    ncolumns: u32,
    nrows: u32,
    subdivision_size: f64,
}

impl<C: Coordinate> Tiles<C> {
    /// Create a grid over `bounds` with square tiles of edge `tile_size`,
    /// each split into `nsubdivisions × nsubdivisions` bins.
    ///
    /// # Errors
    ///
    /// Returns [`GridError::InvalidConfig`] for empty or inverted bounds, a
    /// non-positive tile size, zero subdivisions, or a grid too large to index.
    pub fn new(
        bounds: BoundingBox<C>,
        tile_size: f64,
        nsubdivisions: u16,
    ) -> Result<Self, GridError> {
        if !(tile_size.is_finite() && tile_size > 0.0) {
            return Err(GridError::InvalidConfig(format!(
                "tile size must be positive, got {}",
                tile_size
            )));
        }
        if nsubdivisions == 0 {
            return Err(GridError::InvalidConfig(
                "tiles need at least one subdivision".to_string(),
            ));
        }
        if !(bounds.width() > 0.0 && bounds.height() > 0.0) {
            return Err(GridError::InvalidConfig(format!(
                "bounds must have positive area, got {}×{}",
                bounds.width(),
                bounds.height()
            )));
        }

        let ncolumns = cell_count(bounds.width(), tile_size)?;
        let nrows = cell_count(bounds.height(), tile_size)?;
        if u64::from(ncolumns) * u64::from(nrows) > u64::from(u32::MAX) {
            return Err(GridError::InvalidConfig(format!(
                "{} × {} tiles cannot be indexed",
                nrows, ncolumns
            )));
        }

        Ok(Self {
            bounds,
            tile_size,
            nsubdivisions,
            ncolumns,
            nrows,
            subdivision_size: tile_size / f64::from(nsubdivisions),
        })
    }

    /// Largest tile index for a grid over `bounds` with the given tile size.
    pub fn max_tile_id(bounds: BoundingBox<C>, tile_size: f64) -> Result<u32, GridError> {
        let tiles = Self::new(bounds, tile_size, 1)?;
        Ok(tiles.tile_count() - 1)
    }

    pub fn bounds(&self) -> &BoundingBox<C> {
        &self.bounds
    }

    pub fn tile_size(&self) -> f64 {
        self.tile_size
    }

    pub fn nsubdivisions(&self) -> u16 {
        self.nsubdivisions
    }

    pub fn subdivision_size(&self) -> f64 {
        self.subdivision_size
    }

    pub fn ncolumns(&self) -> u32 {
        self.ncolumns
    }

    pub fn nrows(&self) -> u32 {
        self.nrows
    }

    /// Total number of tiles in the grid.
    pub fn tile_count(&self) -> u32 {
        self.ncolumns * self.nrows
    }

    /// Tile containing the coordinate.
    ///
    /// Spherical grids wrap the column around the date line. Points on the
    /// max edge of the bounds belong to the last row/column.
    ///
    /// # Errors
    ///
    /// [`GridError::OutOfBounds`] when the coordinate is outside the grid on
    /// an axis that does not wrap.
    pub fn tile_id(&self, coord: &C) -> Result<u32, GridError> {
        let (x, y) = (coord.x(), coord.y());
        let out_of_bounds = || GridError::OutOfBounds { x, y };

        if !(y >= self.bounds.miny() && y <= self.bounds.maxy()) {
            return Err(out_of_bounds());
        }
        let row = (((y - self.bounds.miny()) / self.tile_size).floor() as u32).min(self.nrows - 1);

        let column = if C::SPHERICAL {
            if !x.is_finite() {
                return Err(out_of_bounds());
            }
            let column = ((x - self.bounds.minx()) / self.tile_size).floor() as i64;
            column.rem_euclid(i64::from(self.ncolumns)) as u32
        } else {
            if !(x >= self.bounds.minx() && x <= self.bounds.maxx()) {
                return Err(out_of_bounds());
            }
            (((x - self.bounds.minx()) / self.tile_size).floor() as u32).min(self.ncolumns - 1)
        };

        Ok(row * self.ncolumns + column)
    }

    /// Tile index for a row and column.
    pub fn tile_id_from_row_col(&self, row: u32, column: u32) -> Result<u32, GridError> {
        if row >= self.nrows || column >= self.ncolumns {
            return Err(GridError::InvalidTileId {
                tile_id: row.saturating_mul(self.ncolumns).saturating_add(column),
                tile_count: self.tile_count(),
            });
        }
        Ok(row * self.ncolumns + column)
    }

    /// Row and column of a tile index.
    pub fn row_column(&self, tile_id: u32) -> Result<(u32, u32), GridError> {
        self.check_tile(tile_id)?;
        Ok((tile_id / self.ncolumns, tile_id % self.ncolumns))
    }

    /// Lower-left corner of a tile.
    pub fn base(&self, tile_id: u32) -> Result<C, GridError> {
        let (row, column) = self.row_column(tile_id)?;
        Ok(C::new(
            self.bounds.minx() + f64::from(column) * self.tile_size,
            self.bounds.miny() + f64::from(row) * self.tile_size,
        ))
    }

    /// Rectangle covered by a tile.
    pub fn tile_bounds(&self, tile_id: u32) -> Result<BoundingBox<C>, GridError> {
        let base = self.base(tile_id)?;
        Ok(BoundingBox::new(
            base.x(),
            base.y(),
            base.x() + self.tile_size,
            base.y() + self.tile_size,
        ))
    }

    /// Tile one column to the left, wrapping across the date line on spherical grids.
    pub fn left_neighbor(&self, tile_id: u32) -> Result<u32, GridError> {
        let (row, column) = self.row_column(tile_id)?;
        if column > 0 {
            Ok(tile_id - 1)
        } else if C::SPHERICAL {
            Ok(row * self.ncolumns + self.ncolumns - 1)
        } else {
            Err(GridError::NoNeighbor {
                tile_id,
                direction: "left",
            })
        }
    }

    /// Tile one column to the right, wrapping across the date line on spherical grids.
    pub fn right_neighbor(&self, tile_id: u32) -> Result<u32, GridError> {
        let (row, column) = self.row_column(tile_id)?;
        if column + 1 < self.ncolumns {
            Ok(tile_id + 1)
        } else if C::SPHERICAL {
            Ok(row * self.ncolumns)
        } else {
            Err(GridError::NoNeighbor {
                tile_id,
                direction: "right",
            })
        }
    }

    /// Tile one row up. Rows never wrap.
    pub fn top_neighbor(&self, tile_id: u32) -> Result<u32, GridError> {
        let (row, _) = self.row_column(tile_id)?;
        if row + 1 < self.nrows {
            Ok(tile_id + self.ncolumns)
        } else {
            Err(GridError::NoNeighbor {
                tile_id,
                direction: "top",
            })
        }
    }

    /// Tile one row down. Rows never wrap.
    pub fn bottom_neighbor(&self, tile_id: u32) -> Result<u32, GridError> {
        let (row, _) = self.row_column(tile_id)?;
        if row > 0 {
            Ok(tile_id - self.ncolumns)
        } else {
            Err(GridError::NoNeighbor {
                tile_id,
                direction: "bottom",
            })
        }
    }

    /// Whether `other` is one of the four orthogonal neighbors of `tile_id`.
    pub fn are_neighbors(&self, tile_id: u32, other: u32) -> bool {
        if tile_id == other {
            return false;
        }
        [
            self.left_neighbor(tile_id),
            self.right_neighbor(tile_id),
            self.top_neighbor(tile_id),
            self.bottom_neighbor(tile_id),
        ]
        .into_iter()
        .any(|neighbor| neighbor == Ok(other))
    }

    /// Every tile whose rectangle intersects `bbox`, in row-major order.
    ///
    /// On spherical grids a box with `minx > maxx` is read as crossing the
    /// date line.
    pub fn tile_list(&self, bbox: &BoundingBox<C>) -> Vec<u32> {
        if bbox.miny() > bbox.maxy()
            || bbox.miny() > self.bounds.maxy()
            || bbox.maxy() < self.bounds.miny()
        {
            return Vec::new();
        }
        let crosses_date_line = C::SPHERICAL && bbox.minx() > bbox.maxx();
        if !crosses_date_line
            && (bbox.minx() > self.bounds.maxx() || bbox.maxx() < self.bounds.minx())
        {
            return Vec::new();
        }

        let min_row = self.row_of(bbox.miny());
        let max_row = self.row_of(bbox.maxy());
        let min_column = self.column_of(bbox.minx());
        let max_column = self.column_of(bbox.maxx());

        let columns: Vec<u32> = if crosses_date_line && min_column <= max_column {
            // both ends in one column: the box wraps the whole ring
            (0..self.ncolumns).collect()
        } else if crosses_date_line {
            (min_column..self.ncolumns).chain(0..=max_column).collect()
        } else {
            (min_column..=max_column).collect()
        };

        let mut list = Vec::with_capacity(columns.len() * (max_row - min_row + 1) as usize);
        for row in min_row..=max_row {
            list.extend(columns.iter().map(|column| row * self.ncolumns + column));
        }
        list
    }

    /// Convert a global subdivision cell to `(tile, subdivision)`.
    pub(crate) fn cell_to_tile(&self, cell_x: u64, cell_y: u64) -> (u32, u16) {
        let n = u64::from(self.nsubdivisions);
        let tile = (cell_y / n) * u64::from(self.ncolumns) + cell_x / n;
        let subdivision = (cell_y % n) * n + cell_x % n;
        (tile as u32, subdivision as u16)
    }

    /// Number of subdivision cells across the whole grid, per axis.
    pub(crate) fn cell_dimensions(&self) -> (u64, u64) {
        let n = u64::from(self.nsubdivisions);
        (u64::from(self.ncolumns) * n, u64::from(self.nrows) * n)
    }

    /// Width of the wrap-around period in native units (spherical grids only).
    pub(crate) fn wrap_width(&self) -> f64 {
        self.bounds.width()
    }

    fn check_tile(&self, tile_id: u32) -> Result<(), GridError> {
        if tile_id >= self.tile_count() {
            return Err(GridError::InvalidTileId {
                tile_id,
                tile_count: self.tile_count(),
            });
        }
        Ok(())
    }

    fn row_of(&self, y: f64) -> u32 {
        let y = y.clamp(self.bounds.miny(), self.bounds.maxy());
        (((y - self.bounds.miny()) / self.tile_size).floor() as u32).min(self.nrows - 1)
    }

    fn column_of(&self, x: f64) -> u32 {
        let x = x.clamp(self.bounds.minx(), self.bounds.maxx());
        (((x - self.bounds.minx()) / self.tile_size).floor() as u32).min(self.ncolumns - 1)
    }
}

/// Number of tiles of `size` needed to cover `extent`.
fn cell_count(extent: f64, size: f64) -> Result<u32, GridError> {
    let ratio = extent / size;
    let rounded = ratio.round();
    let count = if (ratio - rounded).abs() < COUNT_EPSILON {
        rounded
    } else {
        ratio.ceil()
    };
    if !(count >= 1.0 && count <= f64::from(u32::MAX)) {
        return Err(GridError::InvalidConfig(format!(
            "{} / {} does not give a usable tile count",
            extent, size
        )));
    }
    Ok(count as u32)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::grid::types::{Point2, PointLL};

    fn world(tile_size: f64) -> Tiles<PointLL> {
        Tiles::new(BoundingBox::new(-180.0, -90.0, 180.0, 90.0), tile_size, 5).unwrap()
    }

    #[test]
    fn test_max_tile_id_world() {
        let bounds = BoundingBox::<PointLL>::new(-180.0, -90.0, 180.0, 90.0);
        assert_eq!(Tiles::max_tile_id(bounds, 1.0).unwrap(), 64799);
        assert_eq!(Tiles::max_tile_id(bounds, 0.25).unwrap(), 1036799);
        assert_eq!(Tiles::max_tile_id(bounds, 4.0).unwrap(), 4049);
        assert_eq!(Tiles::max_tile_id(bounds, 0.33).unwrap(), 595685);
    }

    #[test]
    fn test_counts_do_not_round_up_on_float_noise() {
        let tiles = world(0.1);
        assert_eq!(tiles.ncolumns(), 3600);
        assert_eq!(tiles.nrows(), 1800);
    }

    #[test]
    fn test_invalid_config() {
        let bounds = BoundingBox::<Point2>::new(0.0, 0.0, 1.0, 1.0);
        assert!(matches!(
            Tiles::new(bounds, 0.0, 1),
            Err(GridError::InvalidConfig(_))
        ));
        assert!(matches!(
            Tiles::new(bounds, 1.0, 0),
            Err(GridError::InvalidConfig(_))
        ));
        let inverted = BoundingBox::<Point2>::new(1.0, 0.0, 0.0, 1.0);
        assert!(matches!(
            Tiles::new(inverted, 1.0, 1),
            Err(GridError::InvalidConfig(_))
        ));
    }

    #[test]
    fn test_tile_id_row_column_roundtrip() {
        let tiles = world(1.0);
        let id = tiles.tile_id(&PointLL::new(-76.5, 40.5)).unwrap();
        let (row, column) = tiles.row_column(id).unwrap();
        assert_eq!(row, 130);
        assert_eq!(column, 103);
        assert_eq!(tiles.tile_id_from_row_col(row, column).unwrap(), id);
    }

    #[test]
    fn test_tile_id_max_edge_belongs_to_last_row() {
        let tiles = world(1.0);
        let id = tiles.tile_id(&PointLL::new(0.5, 90.0)).unwrap();
        assert_eq!(tiles.row_column(id).unwrap().0, 179);
    }

    #[test]
    fn test_tile_id_spherical_wraps_longitude() {
        let tiles = world(1.0);
        let wrapped = tiles.tile_id(&PointLL::new(180.0, 0.5)).unwrap();
        let origin = tiles.tile_id(&PointLL::new(-180.0, 0.5)).unwrap();
        assert_eq!(wrapped, origin);

        let east = tiles.tile_id(&PointLL::new(190.5, 0.5)).unwrap();
        assert_eq!(east, tiles.tile_id(&PointLL::new(-169.5, 0.5)).unwrap());
    }

    #[test]
    fn test_tile_id_out_of_bounds() {
        let tiles = world(1.0);
        assert!(matches!(
            tiles.tile_id(&PointLL::new(0.0, 90.5)),
            Err(GridError::OutOfBounds { .. })
        ));

        let planar = Tiles::new(BoundingBox::<Point2>::new(0.0, 0.0, 10.0, 10.0), 1.0, 1).unwrap();
        assert!(matches!(
            planar.tile_id(&Point2::new(-0.1, 5.0)),
            Err(GridError::OutOfBounds { .. })
        ));
    }

    #[test]
    fn test_row_column_rejects_invalid_id() {
        let tiles = world(1.0);
        assert!(matches!(
            tiles.row_column(64800),
            Err(GridError::InvalidTileId { .. })
        ));
    }

    #[test]
    fn test_base() {
        let tiles = world(1.0);
        assert_eq!(tiles.base(0).unwrap(), PointLL::new(-180.0, -90.0));
        assert_eq!(tiles.base(1).unwrap(), PointLL::new(-179.0, -90.0));
        assert_eq!(tiles.base(360).unwrap(), PointLL::new(-180.0, -89.0));
        assert_eq!(tiles.base(64799).unwrap(), PointLL::new(179.0, 89.0));
    }

    #[test]
    fn test_neighbors() {
        let tiles = world(1.0);
        let id = tiles.tile_id(&PointLL::new(-76.5, 40.5)).unwrap();
        let (row, column) = tiles.row_column(id).unwrap();

        let left = tiles.left_neighbor(id).unwrap();
        assert!(tiles.are_neighbors(id, left));
        assert_eq!(tiles.row_column(left).unwrap(), (row, column - 1));

        let right = tiles.right_neighbor(id).unwrap();
        assert!(tiles.are_neighbors(id, right));
        assert_eq!(tiles.row_column(right).unwrap(), (row, column + 1));

        let top = tiles.top_neighbor(id).unwrap();
        assert!(tiles.are_neighbors(id, top));
        assert_eq!(tiles.row_column(top).unwrap(), (row + 1, column));

        let bottom = tiles.bottom_neighbor(id).unwrap();
        assert!(tiles.are_neighbors(id, bottom));
        assert_eq!(tiles.row_column(bottom).unwrap(), (row - 1, column));

        assert!(!tiles.are_neighbors(id, id));
        assert!(!tiles.are_neighbors(id, top + 1));
    }

    #[test]
    fn test_neighbors_wrap_on_spherical_grid_only() {
        let tiles = world(1.0);
        assert_eq!(tiles.left_neighbor(360).unwrap(), 719);
        assert_eq!(tiles.right_neighbor(719).unwrap(), 360);
        assert!(tiles.are_neighbors(360, 719));
        assert!(matches!(
            tiles.top_neighbor(64799),
            Err(GridError::NoNeighbor { .. })
        ));
        assert!(matches!(
            tiles.bottom_neighbor(5),
            Err(GridError::NoNeighbor { .. })
        ));

        let planar = Tiles::new(BoundingBox::<Point2>::new(0.0, 0.0, 4.0, 4.0), 1.0, 1).unwrap();
        assert!(matches!(
            planar.left_neighbor(4),
            Err(GridError::NoNeighbor { .. })
        ));
        assert!(matches!(
            planar.right_neighbor(7),
            Err(GridError::NoNeighbor { .. })
        ));
    }

    #[test]
    fn test_tile_list() {
        let tiles = world(1.0);
        let bbox = BoundingBox::new(-99.5, 30.5, -90.5, 39.5);
        let list = tiles.tile_list(&bbox);
        assert_eq!(list.len(), 100);

        let mut sorted = list.clone();
        sorted.sort_unstable();
        sorted.dedup();
        assert_eq!(sorted, list, "row-major order without duplicates");
    }

    #[test]
    fn test_tile_list_outside_grid_is_empty() {
        let planar = Tiles::new(BoundingBox::<Point2>::new(0.0, 0.0, 4.0, 4.0), 1.0, 1).unwrap();
        assert!(planar
            .tile_list(&BoundingBox::new(5.0, 5.0, 6.0, 6.0))
            .is_empty());
    }

    #[test]
    fn test_tile_list_across_date_line() {
        let tiles = world(1.0);
        let list = tiles.tile_list(&BoundingBox::new(178.5, 0.5, -178.5, 0.5));
        let row = 90 * 360;
        assert_eq!(list, vec![row + 358, row + 359, row, row + 1]);
    }

    #[test]
    fn test_tile_list_wrapping_within_one_column() {
        let tiles = world(1.0);
        let row = 90 * 360;
        let list = tiles.tile_list(&BoundingBox::new(10.5, 0.5, 10.2, 0.5));
        assert_eq!(list, (row..row + 360).collect::<Vec<_>>());

        let list = tiles.tile_list(&BoundingBox::new(10.5, 0.5, 9.5, 1.5));
        assert_eq!(list.len(), 2 * 360);
        let mut unique = list.clone();
        unique.sort_unstable();
        unique.dedup();
        assert_eq!(unique.len(), list.len());
    }

    mod property_tests {
        use super::*;
        use proptest::prelude::*;

        proptest! {
            #[test]
            fn test_row_column_roundtrip_property(id in 0u32..64800) {
                let tiles = world(1.0);
                let (row, column) = tiles.row_column(id)?;
                prop_assert_eq!(tiles.tile_id_from_row_col(row, column)?, id);
            }

            #[test]
            fn test_tile_id_contains_coordinate(
                lng in -180.0..180.0_f64,
                lat in -90.0..90.0_f64,
            ) {
                let tiles = world(0.25);
                let id = tiles.tile_id(&PointLL::new(lng, lat))?;
                let bounds = tiles.tile_bounds(id)?;
                prop_assert!(bounds.contains(&PointLL::new(lng, lat)));
            }

            #[test]
            fn test_tile_list_has_no_repeats(
                minx in -200.0..200.0_f64,
                maxx in -200.0..200.0_f64,
                miny in -100.0..100.0_f64,
                height in 0.0..20.0_f64,
            ) {
                let tiles = world(4.0);
                let list = tiles.tile_list(&BoundingBox::new(minx, miny, maxx, miny + height));
                let mut unique = list.clone();
                unique.sort_unstable();
                unique.dedup();
                prop_assert_eq!(unique.len(), list.len());
                prop_assert!(list.iter().all(|id| *id < tiles.tile_count()));
            }
        }
    }
}
