//! Integration tests for grid geometry on the routing hierarchy.
//!
//! These tests check that the grid queries agree with each other on the
//! world-spanning level grids:
//! - line supercover stays within the bounding-box tile list
//! - closest-first search starts at the containing subdivision and never
//!   moves closer again
//! - graph ids derived from points land in tiles whose bounds hold them
//!
//! Run with: `cargo test --test grid_integration`

use tilegraph::grid::Coordinate;
use tilegraph::{BoundingBox, PointLL, TileHierarchy};

fn hierarchy() -> TileHierarchy {
    TileHierarchy::with_default_levels().unwrap()
}

#[test]
fn test_supercover_within_tile_list() {
    let hierarchy = hierarchy();
    let line = [
        PointLL::new(-77.33, 38.91),
        PointLL::new(-76.62, 39.27),
        PointLL::new(-75.21, 39.96),
        PointLL::new(-74.13, 40.71),
    ];
    let mut bbox = BoundingBox::from_point(line[0]);
    line.iter().for_each(|point| bbox.expand(point));

    for level in hierarchy.levels() {
        let tiles = hierarchy.level_tiles(level.level).unwrap();
        let listed = tiles.tile_list(&bbox);
        let crossed = tiles.intersect(&line);
        assert!(!crossed.is_empty());
        for tile_id in crossed.keys() {
            assert!(listed.contains(tile_id), "level {} tile {}", level.level, tile_id);
        }
        for point in &line {
            let tile_id = tiles.tile_id(point).unwrap();
            assert!(crossed.contains_key(&tile_id));
        }
    }
}

#[test]
fn test_closest_first_on_arterial_grid() {
    let hierarchy = hierarchy();
    let tiles = hierarchy.level_tiles(1).unwrap();
    let point = PointLL::new(-76.61, 39.29);

    let mut search = tiles.closest_first(point);
    let (first_tile, first_sub) = search.next_closest().unwrap();
    assert_eq!(first_tile, tiles.tile_id(&point).unwrap());
    assert_eq!(
        tiles
            .subdivision_distance_squared(&point, first_tile, first_sub)
            .unwrap(),
        0.0
    );

    let mut previous = 0.0;
    for (tile_id, subdivision) in search.take(500) {
        let distance = tiles
            .subdivision_distance_squared(&point, tile_id, subdivision)
            .unwrap();
        assert!(distance >= previous);
        previous = distance;
    }
}

#[test]
fn test_closest_first_wraps_the_date_line() {
    let hierarchy = hierarchy();
    let tiles = hierarchy.level_tiles(0).unwrap();
    let point = PointLL::new(179.9, 0.5);
    let west_edge = tiles.tile_id(&PointLL::new(-179.9, 0.5)).unwrap();

    let nearby: Vec<u32> = tiles
        .closest_first(point)
        .take(3 * 25)
        .map(|(tile_id, _)| tile_id)
        .collect();
    assert!(nearby.contains(&west_edge));
}

#[test]
fn test_graph_ids_land_in_their_bounds() {
    let hierarchy = hierarchy();
    let points = [
        PointLL::new(-76.61, 39.29),
        PointLL::new(2.35, 48.85),
        PointLL::new(151.2, -33.86),
        PointLL::new(-179.99, -89.99),
    ];
    for point in &points {
        for level in [0, 1, 2, 3] {
            let graph_id = hierarchy.graph_id(point, level).unwrap();
            assert_eq!(graph_id.level(), level);
            assert_eq!(graph_id.id(), 0);
            let bounds = hierarchy.tile_bounds(graph_id).unwrap();
            assert!(bounds.contains(point), "{} at level {}", graph_id, level);
            assert!(bounds.width() > 0.0 && bounds.min().x() <= point.lng);
        }
    }
}
