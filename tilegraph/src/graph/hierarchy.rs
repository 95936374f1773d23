//! Hierarchy levels and the world grid of each level.

use serde::{Deserialize, Serialize};

use super::graph_id::{GraphId, MAX_LEVEL, MAX_TILE_ID};
use crate::grid::{BoundingBox, GridError, PointLL, Tiles};

/// Subdivisions per tile edge on every level.
pub const BINS_PER_TILE: u16 = 5;

/// One level of the tile hierarchy.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TileLevel {
    pub level: u8,
    pub name: String,
    /// Tile edge length in degrees.
    pub tile_size: f64,
}

impl TileLevel {
    pub fn new(level: u8, name: impl Into<String>, tile_size: f64) -> Self {
        Self {
            level,
            name: name.into(),
            tile_size,
        }
    }

    /// Highway, arterial and local road levels.
    pub fn default_levels() -> Vec<TileLevel> {
        vec![
            TileLevel::new(0, "highway", 4.0),
            TileLevel::new(1, "arterial", 1.0),
            TileLevel::new(2, "local", 0.25),
        ]
    }

    pub fn default_transit_level() -> TileLevel {
        TileLevel::new(3, "transit", 0.25)
    }
}

/// World grids of the road levels (least detailed first) and the transit level.
#[derive(Debug, Clone)]
pub struct TileHierarchy {
    levels: Vec<(TileLevel, Tiles<PointLL>)>,
    transit: (TileLevel, Tiles<PointLL>),
}

impl TileHierarchy {
    /// Build the grids for the given levels.
    ///
    /// # Errors
    ///
    /// [`GridError::InvalidConfig`] when there are no road levels, a level
    /// number repeats or does not fit a graph id, or a tile size is unusable.
    pub fn new(levels: Vec<TileLevel>, transit_level: TileLevel) -> Result<Self, GridError> {
        if levels.is_empty() {
            return Err(GridError::InvalidConfig(
                "the hierarchy needs at least one road level".to_string(),
            ));
        }
        let mut seen = Vec::with_capacity(levels.len() + 1);
        for level in levels.iter().chain(std::iter::once(&transit_level)) {
            if level.level > MAX_LEVEL {
                return Err(GridError::InvalidConfig(format!(
                    "level {} exceeds {}",
                    level.level, MAX_LEVEL
                )));
            }
            if seen.contains(&level.level) {
                return Err(GridError::InvalidConfig(format!(
                    "level {} is defined twice",
                    level.level
                )));
            }
            seen.push(level.level);
        }

        let mut road = levels
            .into_iter()
            .map(|level| {
                let tiles = world_grid(level.tile_size)?;
                Ok((level, tiles))
            })
            .collect::<Result<Vec<_>, GridError>>()?;
        road.sort_by_key(|(level, _)| level.level);
        let transit_tiles = world_grid(transit_level.tile_size)?;

        Ok(Self {
            levels: road,
            transit: (transit_level, transit_tiles),
        })
    }

    /// Highway, arterial and local road levels plus the transit level.
    pub fn with_default_levels() -> Result<Self, GridError> {
        Self::new(
            TileLevel::default_levels(),
            TileLevel::default_transit_level(),
        )
    }

    /// Road levels, least detailed first.
    pub fn levels(&self) -> impl Iterator<Item = &TileLevel> {
        self.levels.iter().map(|(level, _)| level)
    }

    pub fn transit_level(&self) -> &TileLevel {
        &self.transit.0
    }

    /// The most detailed road level. No shortcuts exist on it.
    pub fn max_level(&self) -> u8 {
        self.levels
            .last()
            .map(|(level, _)| level.level)
            .unwrap_or_default()
    }

    /// Grid of a road or transit level.
    pub fn level_tiles(&self, level: u8) -> Option<&Tiles<PointLL>> {
        if self.transit.0.level == level {
            return Some(&self.transit.1);
        }
        self.levels
            .iter()
            .find(|(candidate, _)| candidate.level == level)
            .map(|(_, tiles)| tiles)
    }

    /// Id of the tile containing `point` on `level`.
    pub fn graph_id(&self, point: &PointLL, level: u8) -> Option<GraphId> {
        let tiles = self.level_tiles(level)?;
        let tile_id = tiles.tile_id(point).ok()?;
        GraphId::new(tile_id, level, 0).ok()
    }

    /// Ids of every road-level tile intersecting `bbox`, least detailed level first.
    pub fn graph_ids(&self, bbox: &BoundingBox<PointLL>) -> Vec<GraphId> {
        self.levels
            .iter()
            .flat_map(|(level, tiles)| {
                tiles
                    .tile_list(bbox)
                    .into_iter()
                    .filter_map(move |tile_id| GraphId::new(tile_id, level.level, 0).ok())
            })
            .collect()
    }

    /// Area covered by the tile of `graph_id`.
    pub fn tile_bounds(&self, graph_id: GraphId) -> Option<BoundingBox<PointLL>> {
        self.level_tiles(graph_id.level())?
            .tile_bounds(graph_id.tile_id())
            .ok()
    }
}

fn world_bounds() -> BoundingBox<PointLL> {
    BoundingBox::new(-180.0, -90.0, 180.0, 90.0)
}

fn world_grid(tile_size: f64) -> Result<Tiles<PointLL>, GridError> {
    let tiles = Tiles::new(world_bounds(), tile_size, BINS_PER_TILE)?;
    if tiles.tile_count() - 1 > MAX_TILE_ID {
        return Err(GridError::InvalidConfig(format!(
            "{}° tiles need more tile ids than a graph id holds",
            tile_size
        )));
    }
    Ok(tiles)
}
