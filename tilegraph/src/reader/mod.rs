//! Graph traversal over cached tiles.
//!
//! [`GraphReader`] combines a [`TileCache`] with the [`TileHierarchy`] and
//! answers questions that need records from more than one tile: the
//! reciprocal of an edge, whether two edges touch, which shortcut covers an
//! edge and which edges a shortcut covers, node densities, and the extent of
//! the graph inside a bounding box.
//!
//! Every query takes graph ids and loads the tiles it needs on demand. Tiles
//! that cannot be loaded make the query answer "not found" (`None`, `false`
//! or `0`); nothing panics on missing or inconsistent data.

mod bbox;
mod connectivity;
mod shortcut;

use std::sync::Arc;

use thiserror::Error;
use tracing::error;

use crate::cache::{TileCache, TileCacheError, TileHandle, TrimResult};
use crate::config::{ConfigError, GraphReaderConfig};
use crate::graph::{polyline, DirectedEdge, GraphId, NodeInfo, NodeTransition, TileHierarchy};
use crate::grid::PointLL;
use crate::storage::{DirectoryTileStorage, TileStorage};

#[derive(Debug, Error)]
pub enum GraphReaderError {
    #[error(transparent)]
    Config(#[from] ConfigError),

    #[error(transparent)]
    Tile(#[from] TileCacheError),
}

/// Read access to a tiled routing graph.
#[derive(Debug)]
pub struct GraphReader {
    cache: TileCache,
    hierarchy: TileHierarchy,
}

impl GraphReader {
    /// Create a reader over `storage`.
    ///
    /// # Errors
    ///
    /// [`GraphReaderError::Config`] when the configured hierarchy is invalid.
    pub fn new(
        storage: Arc<dyn TileStorage>,
        config: &GraphReaderConfig,
    ) -> Result<Self, GraphReaderError> {
        let hierarchy = config.hierarchy()?;
        Ok(Self {
            cache: TileCache::new(storage, config.max_cache_size),
            hierarchy,
        })
    }

    /// Create a reader over the configured tile directory.
    ///
    /// # Errors
    ///
    /// [`GraphReaderError::Config`] when no `tile_dir` is configured or the
    /// hierarchy is invalid.
    pub fn from_config(config: &GraphReaderConfig) -> Result<Self, GraphReaderError> {
        let tile_dir = config
            .tile_dir
            .clone()
            .ok_or_else(|| ConfigError::Invalid("tile_dir is not set".to_string()))?;
        let hierarchy = config.hierarchy()?;
        let storage = DirectoryTileStorage::new(tile_dir, &hierarchy);
        Ok(Self {
            cache: TileCache::new(Arc::new(storage), config.max_cache_size),
            hierarchy,
        })
    }

    pub fn hierarchy(&self) -> &TileHierarchy {
        &self.hierarchy
    }

    pub fn cache(&self) -> &TileCache {
        &self.cache
    }

    /// The tile containing `graph_id`, loaded on first access.
    pub fn get_tile(&self, graph_id: GraphId) -> Option<TileHandle> {
        self.cache.get_tile(graph_id)
    }

    /// Like [`get_tile`](Self::get_tile) but reports why a tile is unavailable.
    pub fn try_get_tile(&self, graph_id: GraphId) -> Result<TileHandle, GraphReaderError> {
        Ok(self.cache.try_get_tile(graph_id)?)
    }

    /// Whether resident tiles exceed the cache budget.
    pub fn over_committed(&self) -> bool {
        self.cache.over_committed()
    }

    /// Evict unreferenced tiles until within budget.
    pub fn trim(&self) -> TrimResult {
        self.cache.trim()
    }

    /// Drop every resident tile.
    pub fn clear(&self) {
        self.cache.clear()
    }

    pub fn node_info(&self, node_id: GraphId) -> Option<NodeInfo> {
        self.get_tile(node_id)?.node(node_id.id())
    }

    pub fn directed_edge(&self, edge_id: GraphId) -> Option<DirectedEdge> {
        self.get_tile(edge_id)?.directed_edge(edge_id.id())
    }

    /// The node an edge leads to.
    pub fn edge_endnode(&self, edge_id: GraphId) -> Option<GraphId> {
        self.directed_edge(edge_id).map(|edge| edge.endnode)
    }

    /// The node an edge leaves from: the end node of its opposing edge.
    pub fn edge_startnode(&self, edge_id: GraphId) -> Option<GraphId> {
        self.get_opposing_edge(edge_id).map(|(_, edge)| edge.endnode)
    }

    /// Start and end node of an edge.
    pub fn get_directed_edge_nodes(&self, edge_id: GraphId) -> Option<(GraphId, GraphId)> {
        let edge = self.directed_edge(edge_id)?;
        let (_, opposing) = self.opposing_of(edge_id, &edge)?;
        Some((opposing.endnode, edge.endnode))
    }

    /// The reciprocal of an edge: the edge leaving its end node back towards
    /// its start node.
    ///
    /// Returns `None` for transit lines, whose reciprocal is not unique, and
    /// when the end node's tile is unavailable.
    pub fn get_opposing_edge_id(&self, edge_id: GraphId) -> Option<GraphId> {
        self.get_opposing_edge(edge_id).map(|(id, _)| id)
    }

    /// The reciprocal edge with its id.
    pub fn get_opposing_edge(&self, edge_id: GraphId) -> Option<(GraphId, DirectedEdge)> {
        let edge = self.directed_edge(edge_id)?;
        self.opposing_of(edge_id, &edge)
    }

    fn opposing_of(&self, edge_id: GraphId, edge: &DirectedEdge) -> Option<(GraphId, DirectedEdge)> {
        if edge.is_transit_line() {
            return None;
        }
        let tile = self.get_tile(edge.endnode)?;
        let node = tile.node(edge.endnode.id())?;
        if u32::from(edge.opp_index) >= node.edge_count {
            error!(
                edge = %edge_id,
                endnode = %edge.endnode,
                opp_index = edge.opp_index,
                edge_count = node.edge_count,
                "Opposing edge index outside the end node's edges"
            );
            return None;
        }
        let opposing_id = edge
            .endnode
            .with_id(node.edge_index + u32::from(edge.opp_index))?;
        let opposing = tile.directed_edge(opposing_id.id())?;
        Some((opposing_id, opposing))
    }

    /// Density at the start of an edge, or 0 when it cannot be resolved.
    pub fn get_edge_density(&self, edge_id: GraphId) -> u32 {
        self.edge_startnode(edge_id)
            .and_then(|node| self.node_info(node))
            .map_or(0, |node| u32::from(node.density))
    }

    /// Level transitions recorded at a node.
    pub fn node_transitions(&self, node_id: GraphId) -> Vec<NodeTransition> {
        let Some(tile) = self.get_tile(node_id) else {
            return Vec::new();
        };
        let Some(node) = tile.node(node_id.id()) else {
            return Vec::new();
        };
        tile.transitions(&node).collect()
    }

    /// Shape of an edge in its direction of travel.
    pub fn edge_shape(&self, edge_id: GraphId) -> Option<Vec<PointLL>> {
        let tile = self.get_tile(edge_id)?;
        let edge = tile.directed_edge(edge_id.id())?;
        let mut shape = match tile.edge_shape(edge.edge_info_offset) {
            Ok(shape) => shape,
            Err(e) => {
                error!(edge = %edge_id, error = %e, "Edge shape unavailable");
                return None;
            }
        };
        if !edge.forward {
            shape.reverse();
        }
        Some(shape)
    }

    /// Shape of an edge in its direction of travel, polyline6-encoded.
    pub fn encoded_edge_shape(&self, edge_id: GraphId) -> Option<String> {
        self.edge_shape(edge_id).map(|shape| polyline::encode(&shape))
    }
}
