//! Nearest-first enumeration of subdivisions.

use std::cmp::{Ordering, Reverse};
use std::collections::{BinaryHeap, HashSet};

use super::tiles::Tiles;
use super::types::{Coordinate, GridError};

impl<C: Coordinate> Tiles<C> {
    /// Enumerate every subdivision of the grid, closest to `point` first.
    pub fn closest_first(&self, point: C) -> ClosestFirst<'_, C> {
        ClosestFirst::new(self, point)
    }

    /// Squared distance from `point` to the rectangle of a subdivision
    /// (zero when the point lies inside it).
    pub fn subdivision_distance_squared(
        &self,
        point: &C,
        tile_id: u32,
        subdivision: u16,
    ) -> Result<f64, GridError> {
        let (row, column) = self.row_column(tile_id)?;
        let n = u32::from(self.nsubdivisions());
        if u32::from(subdivision) >= n * n {
            return Err(GridError::InvalidSubdivision {
                subdivision,
                count: n * n,
            });
        }
        let cell_x = u64::from(column * n + u32::from(subdivision) % n);
        let cell_y = u64::from(row * n + u32::from(subdivision) / n);
        Ok(cell_distance_squared(self, point, cell_x, cell_y))
    }
}

/// Heap entry: ordered by distance, then by global row-major cell index.
#[derive(Debug, Clone, Copy)]
struct Candidate {
    distance: f64,
    cell: u64,
}

impl PartialEq for Candidate {
    fn eq(&self, other: &Self) -> bool {
        self.cmp(other) == Ordering::Equal
    }
}

impl Eq for Candidate {}

impl PartialOrd for Candidate {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl Ord for Candidate {
    fn cmp(&self, other: &Self) -> Ordering {
        self.distance
            .total_cmp(&other.distance)
            .then(self.cell.cmp(&other.cell))
    }
}

/// Resumable nearest-first producer of `(tile, subdivision)` pairs.
///
/// Yields every subdivision of the grid exactly once in non-decreasing order
/// of squared distance to the seed point, ties broken by the global
/// row-major subdivision index. It cannot be rewound; create a new one to
/// start over.
///
/// The search is best-first over the cell adjacency graph, seeded with the
/// 3×3 block of cells around the point. Every cell outside the minimal
/// distance set has an orthogonal neighbor strictly closer to the point, so
/// all cells tied at a distance are queued before the first of them is
/// produced.
pub struct ClosestFirst<'a, C> {
    tiles: &'a Tiles<C>,
    point: C,
    columns: u64,
    rows: u64,
    queue: BinaryHeap<Reverse<Candidate>>,
    queued: HashSet<u64>,
}

impl<'a, C: Coordinate> ClosestFirst<'a, C> {
    fn new(tiles: &'a Tiles<C>, point: C) -> Self {
        let (columns, rows) = tiles.cell_dimensions();
        let mut producer = Self {
            tiles,
            point,
            columns,
            rows,
            queue: BinaryHeap::new(),
            queued: HashSet::new(),
        };

        let bounds = tiles.bounds();
        let size = tiles.subdivision_size();
        let mut fx = (point.x() - bounds.minx()) / size;
        if C::SPHERICAL && fx.is_finite() {
            fx = fx.rem_euclid(tiles.wrap_width() / size);
        }
        let fy = (point.y() - bounds.miny()) / size;

        let xs = seed_cells(fx, columns, C::SPHERICAL);
        let ys = seed_cells(fy, rows, false);
        for &y in &ys {
            for &x in &xs {
                producer.enqueue(x, y);
            }
        }
        producer
    }

    /// Produce the next closest subdivision.
    ///
    /// # Errors
    ///
    /// [`GridError::Exhausted`] once every subdivision has been produced.
    pub fn next_closest(&mut self) -> Result<(u32, u16), GridError> {
        let Reverse(best) = self.queue.pop().ok_or(GridError::Exhausted)?;
        let x = best.cell % self.columns;
        let y = best.cell / self.columns;

        if x > 0 {
            self.enqueue(x - 1, y);
        } else if C::SPHERICAL {
            self.enqueue(self.columns - 1, y);
        }
        if x + 1 < self.columns {
            self.enqueue(x + 1, y);
        } else if C::SPHERICAL {
            self.enqueue(0, y);
        }
        if y > 0 {
            self.enqueue(x, y - 1);
        }
        if y + 1 < self.rows {
            self.enqueue(x, y + 1);
        }

        Ok(self.tiles.cell_to_tile(x, y))
    }

    /// Number of subdivisions not yet produced.
    pub fn remaining(&self) -> u64 {
        self.columns * self.rows - (self.queued.len() - self.queue.len()) as u64
    }

    fn enqueue(&mut self, x: u64, y: u64) {
        let cell = y * self.columns + x;
        if self.queued.insert(cell) {
            let distance = cell_distance_squared(self.tiles, &self.point, x, y);
            self.queue.push(Reverse(Candidate { distance, cell }));
        }
    }
}

impl<C: Coordinate> Iterator for ClosestFirst<'_, C> {
    type Item = (u32, u16);

    fn next(&mut self) -> Option<Self::Item> {
        self.next_closest().ok()
    }
}

/// Cells along one axis around fractional position `f`: the containing
/// cell and both of its neighbors, clamped (or wrapped) to the grid.
fn seed_cells(f: f64, count: u64, wraps: bool) -> Vec<u64> {
    let last = count as i64 - 1;
    let center = if f.is_finite() {
        (f.floor() as i64).clamp(0, last)
    } else {
        0
    };
    let mut cells: Vec<u64> = (center - 1..=center + 1)
        .filter_map(|cell| {
            if wraps {
                Some(cell.rem_euclid(count as i64) as u64)
            } else if (0..=last).contains(&cell) {
                Some(cell as u64)
            } else {
                None
            }
        })
        .collect();
    cells.sort_unstable();
    cells.dedup();
    cells
}

/// Squared distance from `point` to the rectangle of global cell `(x, y)`.
fn cell_distance_squared<C: Coordinate>(tiles: &Tiles<C>, point: &C, x: u64, y: u64) -> f64 {
    let bounds = tiles.bounds();
    let size = tiles.subdivision_size();

    let min_x = bounds.minx() + x as f64 * size;
    let min_y = bounds.miny() + y as f64 * size;
    let dx = if C::SPHERICAL {
        let period = tiles.wrap_width();
        [point.x(), point.x() - period, point.x() + period]
            .into_iter()
            .map(|px| axis_gap(px, min_x, min_x + size))
            .fold(f64::INFINITY, f64::min)
    } else {
        axis_gap(point.x(), min_x, min_x + size)
    };
    let dy = axis_gap(point.y(), min_y, min_y + size);
    dx * dx + dy * dy
}

fn axis_gap(value: f64, low: f64, high: f64) -> f64 {
    if value < low {
        low - value
    } else if value > high {
        value - high
    } else {
        0.0
    }
}
