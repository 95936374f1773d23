//! Serializer for the graph tile layout.
//!
//! Nodes are appended in order; each directed edge and level transition is
//! attached to the most recently added node, so a node's records are always
//! contiguous.

use bytes::{BufMut, Bytes, BytesMut};
use thiserror::Error;

use super::graph_id::GraphId;
use super::records::{DirectedEdge, NodeInfo, NodeTransition};
use super::tile::{EDGE_INFO_HEADER_SIZE, HEADER_SIZE, MAGIC, VERSION};
use crate::grid::PointLL;

/// Errors raised while assembling a tile.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum TileWriteError {
    #[error("A node must be added before its {0}")]
    NoNode(&'static str),

    #[error("Node {node} has too many level transitions")]
    TooManyTransitions { node: u32 },
}

/// Builds the bytes of one graph tile.
#[derive(Debug, Clone)]
pub struct GraphTileWriter {
    graph_id: GraphId,
    base: PointLL,
    nodes: Vec<NodeInfo>,
    edges: Vec<DirectedEdge>,
    transitions: Vec<NodeTransition>,
    edge_info: BytesMut,
}

impl GraphTileWriter {
    /// Start a tile. The index part of `graph_id` is ignored.
    pub fn new(graph_id: GraphId, base: PointLL) -> Self {
        Self {
            graph_id: graph_id.tile_base(),
            base,
            nodes: Vec::new(),
            edges: Vec::new(),
            transitions: Vec::new(),
            edge_info: BytesMut::new(),
        }
    }

    /// Id of the tile being written.
    pub fn graph_id(&self) -> GraphId {
        self.graph_id
    }

    /// Append a node and return its index.
    pub fn add_node(&mut self, lat_lng: PointLL, density: u8) -> u32 {
        self.nodes.push(NodeInfo {
            lat_lng,
            edge_index: self.edges.len() as u32,
            edge_count: 0,
            transition_index: self.transitions.len() as u32,
            transition_count: 0,
            density,
        });
        self.nodes.len() as u32 - 1
    }

    /// Append an outgoing edge of the last node and return its index.
    pub fn add_directed_edge(&mut self, edge: DirectedEdge) -> Result<u32, TileWriteError> {
        let node = self
            .nodes
            .last_mut()
            .ok_or(TileWriteError::NoNode("directed edges"))?;
        node.edge_count += 1;
        self.edges.push(edge);
        Ok(self.edges.len() as u32 - 1)
    }

    /// Append a level transition of the last node and return its index.
    pub fn add_transition(&mut self, endnode: GraphId, up: bool) -> Result<u32, TileWriteError> {
        let node_index = self.nodes.len().saturating_sub(1) as u32;
        let node = self
            .nodes
            .last_mut()
            .ok_or(TileWriteError::NoNode("level transitions"))?;
        node.transition_count = node
            .transition_count
            .checked_add(1)
            .ok_or(TileWriteError::TooManyTransitions { node: node_index })?;
        self.transitions.push(NodeTransition { endnode, up });
        Ok(self.transitions.len() as u32 - 1)
    }

    /// Store a shape and return the offset to put in `edge_info_offset`.
    pub fn add_edge_shape(&mut self, way_id: u64, shape: &[PointLL]) -> u32 {
        let offset = self.edge_info.len() as u32;
        self.edge_info
            .reserve(EDGE_INFO_HEADER_SIZE + shape.len() * 16);
        self.edge_info.put_u64_le(way_id);
        self.edge_info.put_u32_le(shape.len() as u32);
        for point in shape {
            self.edge_info.put_f64_le(point.lng);
            self.edge_info.put_f64_le(point.lat);
        }
        offset
    }

    /// Number of directed edges written so far.
    pub fn directed_edge_count(&self) -> u32 {
        self.edges.len() as u32
    }

    /// Serialize the tile.
    pub fn into_bytes(self) -> Bytes {
        let size = HEADER_SIZE
            + self.nodes.len() * NodeInfo::SIZE
            + self.edges.len() * DirectedEdge::SIZE
            + self.transitions.len() * NodeTransition::SIZE
            + self.edge_info.len();
        let mut buf = BytesMut::with_capacity(size);

        buf.put_slice(MAGIC);
        buf.put_u16_le(VERSION);
        buf.put_u8(self.graph_id.level());
        buf.put_u8(0);
        buf.put_u32_le(self.graph_id.tile_id());
        buf.put_u32_le(self.nodes.len() as u32);
        buf.put_u32_le(self.edges.len() as u32);
        buf.put_u32_le(self.transitions.len() as u32);
        buf.put_u32_le(self.edge_info.len() as u32);
        buf.put_u32_le(0);
        buf.put_f64_le(self.base.lng);
        buf.put_f64_le(self.base.lat);

        for node in &self.nodes {
            node.encode(&mut buf);
        }
        for edge in &self.edges {
            edge.encode(&mut buf);
        }
        for transition in &self.transitions {
            transition.encode(&mut buf);
        }
        buf.put_slice(&self.edge_info);
        buf.freeze()
    }
}
