//! Rasterization of polylines onto the subdivision grid.
//!
//! Every segment is walked cell by cell across the global subdivision grid
//! (`ncolumns·N × nrows·N` cells) with a supercover traversal: each cell the
//! segment touches is recorded, and when the segment passes exactly through
//! a cell corner both side cells are recorded as well. Segments are clipped
//! to the grid before the walk, so they may start or end anywhere outside the
//! bounds and the walk never leaves the grid by more than one cell.

use std::collections::{HashMap, HashSet};

use super::tiles::Tiles;
use super::types::Coordinate;

/// Subdivisions touched by a polyline, keyed by tile index.
pub type Intersection = HashMap<u32, HashSet<u16>>;

impl<C: Coordinate> Tiles<C> {
    /// Tiles and subdivisions touched by `linestring`.
    ///
    /// An empty linestring gives an empty result. A single point (or a
    /// zero-length segment) records the subdivision containing it, provided
    /// it lies inside the grid. Spherical grids take the shorter way around
    /// the date line for each segment.
    pub fn intersect(&self, linestring: &[C]) -> Intersection {
        let mut raster = Raster::new(self);

        match linestring {
            [] => {}
            [point] => raster.segment(point, point),
            _ => {
                for segment in linestring.windows(2) {
                    raster.segment(&segment[0], &segment[1]);
                }
            }
        }

        raster.intersection
    }
}

/// Working state for one rasterization.
struct Raster<'a, C> {
    tiles: &'a Tiles<C>,
    columns: i64,
    rows: i64,
    wrap_cells: f64,
    intersection: Intersection,
}

impl<'a, C: Coordinate> Raster<'a, C> {
    fn new(tiles: &'a Tiles<C>) -> Self {
        let (columns, rows) = tiles.cell_dimensions();
        Self {
            tiles,
            columns: columns as i64,
            rows: rows as i64,
            wrap_cells: tiles.wrap_width() / tiles.subdivision_size(),
            intersection: Intersection::new(),
        }
    }

    /// Position of a coordinate in fractional cell units.
    fn to_cells(&self, point: &C) -> (f64, f64) {
        let bounds = self.tiles.bounds();
        let size = self.tiles.subdivision_size();
        (
            (point.x() - bounds.minx()) / size,
            (point.y() - bounds.miny()) / size,
        )
    }

    /// Clip one segment to the grid and walk what is left of it.
    fn segment(&mut self, from: &C, to: &C) {
        let (mut x0, y0) = self.to_cells(from);
        let (mut x1, y1) = self.to_cells(to);
        if !(x0.is_finite() && y0.is_finite() && x1.is_finite() && y1.is_finite()) {
            return;
        }
        if C::SPHERICAL {
            let period = self.wrap_cells;
            x0 = x0.rem_euclid(period);
            x1 = x1.rem_euclid(period);
            if x1 - x0 > period / 2.0 {
                x1 -= period;
            } else if x0 - x1 > period / 2.0 {
                x1 += period;
            }
        }
        let width = (!C::SPHERICAL).then_some(self.columns as f64);
        if let Some(((x0, y0), (x1, y1))) = clip((x0, y0), (x1, y1), width, self.rows as f64) {
            self.walk(x0, y0, x1, y1);
        }
    }

    fn mark(&mut self, x: i64, y: i64) {
        let x = if C::SPHERICAL {
            x.rem_euclid(self.columns)
        } else {
            x
        };
        if x < 0 || x >= self.columns || y < 0 || y >= self.rows {
            return;
        }
        let (tile, subdivision) = self.tiles.cell_to_tile(x as u64, y as u64);
        self.intersection.entry(tile).or_default().insert(subdivision);
    }

    /// Supercover walk from the cell of `(x0, y0)` to the cell of `(x1, y1)`.
    ///
    /// Terminates after at most `|Δcolumn| + |Δrow|` steps: each step moves
    /// one cell closer to the end cell and never past it on either axis.
    fn walk(&mut self, x0: f64, y0: f64, x1: f64, y1: f64) {
        if !(x0.is_finite() && y0.is_finite() && x1.is_finite() && y1.is_finite()) {
            return;
        }

        let (mut cx, mut cy) = (x0.floor() as i64, y0.floor() as i64);
        let (ex, ey) = (x1.floor() as i64, y1.floor() as i64);
        self.mark(cx, cy);

        let dx = x1 - x0;
        let dy = y1 - y0;
        let step_x = if dx > 0.0 { 1 } else { -1 };
        let step_y = if dy > 0.0 { 1 } else { -1 };

        // parametric distance along the segment to the next vertical/horizontal cell border
        let (mut t_max_x, t_delta_x) = axis_crossing(x0, cx, dx);
        let (mut t_max_y, t_delta_y) = axis_crossing(y0, cy, dy);

        let mut remaining = (ex - cx).abs() + (ey - cy).abs();
        while remaining > 0 {
            let can_x = cx != ex;
            let can_y = cy != ey;

            if can_x && (!can_y || t_max_x < t_max_y) {
                cx += step_x;
                t_max_x += t_delta_x;
                remaining -= 1;
            } else if can_y && (!can_x || t_max_y < t_max_x) {
                cy += step_y;
                t_max_y += t_delta_y;
                remaining -= 1;
            } else {
                // exactly through a corner
                self.mark(cx + step_x, cy);
                self.mark(cx, cy + step_y);
                cx += step_x;
                cy += step_y;
                t_max_x += t_delta_x;
                t_max_y += t_delta_y;
                remaining -= 2;
            }
            self.mark(cx, cy);
        }
    }
}

#[derive(Debug, Clone, Copy)]
enum Border {
    X(f64),
    Y(f64),
}

/// Liang-Barsky clip of a segment (in cell units) to `[0, width] × [0, height]`.
///
/// With no `width` only rows are clipped. Returns `None` when the segment
/// misses the box. A cut endpoint is placed exactly on the border that cut
/// it, and its other coordinate comes from the line's intercept with that
/// border, so segments with far-away endpoints keep their direction.
/// Returned points never leave the box or the segment's own extent.
fn clip(
    start: (f64, f64),
    end: (f64, f64),
    width: Option<f64>,
    height: f64,
) -> Option<((f64, f64), (f64, f64))> {
    // halved so differences of huge finite coordinates stay finite
    let dx = end.0 * 0.5 - start.0 * 0.5;
    let dy = end.1 * 0.5 - start.1 * 0.5;

    let mut borders = vec![
        (-dy, start.1 * 0.5, Border::Y(0.0)),
        (dy, height * 0.5 - start.1 * 0.5, Border::Y(height)),
    ];
    if let Some(width) = width {
        borders.push((-dx, start.0 * 0.5, Border::X(0.0)));
        borders.push((dx, width * 0.5 - start.0 * 0.5, Border::X(width)));
    }

    let (mut t_enter, mut enter) = (0.0, None);
    let (mut t_exit, mut exit) = (1.0, None);
    for (p, q, border) in borders {
        if p == 0.0 {
            if q < 0.0 {
                return None;
            }
            continue;
        }
        let t = q / p;
        if p < 0.0 {
            if t > t_enter {
                (t_enter, enter) = (t, Some(border));
            }
        } else if t < t_exit {
            (t_exit, exit) = (t, Some(border));
        }
    }
    if t_enter > t_exit + 4.0 * f64::EPSILON {
        return None;
    }

    let (min_x, max_x) = match width {
        Some(width) => (0.0, width),
        None => (start.0.min(end.0), start.0.max(end.0)),
    };
    let on_border = |border: Option<Border>, endpoint: (f64, f64)| {
        let (x, y) = match border {
            None => endpoint,
            Some(Border::X(x)) => {
                let slope = dy / dx;
                (x, start.1 - start.0 * slope + x * slope)
            }
            Some(Border::Y(y)) => {
                let slope = dx / dy;
                (start.0 - start.1 * slope + y * slope, y)
            }
        };
        (x.clamp(min_x, max_x), y.clamp(0.0, height))
    };
    Some((on_border(enter, start), on_border(exit, end)))
}

/// Parametric position of the first border crossing on one axis, and the
/// parametric length of one cell on that axis.
fn axis_crossing(start: f64, cell: i64, delta: f64) -> (f64, f64) {
    if delta > 0.0 {
        (((cell + 1) as f64 - start) / delta, 1.0 / delta)
    } else if delta < 0.0 {
        ((start - cell as f64) / -delta, 1.0 / -delta)
    } else {
        (f64::INFINITY, f64::INFINITY)
    }
}
