//! Read-only view over the bytes of one graph tile.
//!
//! A [`GraphTile`] owns its buffer (`bytes::Bytes`, so clones share it) and
//! decodes records on access. All section bounds and record ids are checked
//! once in [`GraphTile::from_bytes`]; accessors are index-based and return
//! `None` past the end of a section.

use bytes::{Buf, Bytes};
use thiserror::Error;

use super::graph_id::{GraphId, GraphIdError};
use super::records::{DirectedEdge, NodeInfo, NodeTransition};
use crate::grid::PointLL;

pub(crate) const MAGIC: &[u8; 4] = b"GTL1";
pub(crate) const VERSION: u16 = 1;
pub(crate) const HEADER_SIZE: usize = 48;
pub(crate) const EDGE_INFO_HEADER_SIZE: usize = 12;
const SHAPE_POINT_SIZE: usize = 16;

/// Errors raised while decoding a tile buffer.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum TileDecodeError {
    #[error("Tile is too short: {len} bytes (need at least {needed})")]
    TooShort { len: usize, needed: usize },

    #[error("Bad tile magic: {0:?}")]
    BadMagic([u8; 4]),

    #[error("Unsupported tile version {0}")]
    UnsupportedVersion(u16),

    #[error("Invalid tile id in header: {0}")]
    InvalidId(#[from] GraphIdError),

    #[error("Section {section} ends at byte {end} but the tile has {len} bytes")]
    SectionOutOfBounds {
        section: &'static str,
        end: u64,
        len: usize,
    },

    #[error("Invalid {section} record at index {index}")]
    InvalidRecord { section: &'static str, index: u32 },

    #[error("Edge info at offset {offset} exceeds the {size}-byte edge info section")]
    ShapeOutOfBounds { offset: u32, size: usize },
}

/// Shared attributes of an edge pair: the way it came from and its shape.
#[derive(Debug, Clone, PartialEq)]
pub struct EdgeInfo {
    pub way_id: u64,
    pub shape: Vec<PointLL>,
}

/// An immutable, decoded-on-demand graph tile.
#[derive(Debug, Clone)]
pub struct GraphTile {
    data: Bytes,
    graph_id: GraphId,
    base: PointLL,
    node_count: u32,
    directed_edge_count: u32,
    transition_count: u32,
    nodes_offset: usize,
    edges_offset: usize,
    transitions_offset: usize,
    edge_info_offset: usize,
    edge_info_size: usize,
}

impl GraphTile {
    /// Validate and wrap a tile buffer.
    ///
    /// # Errors
    ///
    /// Returns a [`TileDecodeError`] if the header is malformed, a section
    /// does not fit in the buffer, a record refers to an invalid id, or a
    /// node's edge or transition range leaves its section.
    pub fn from_bytes(data: Bytes) -> Result<Self, TileDecodeError> {
        let len = data.len();
        if len < HEADER_SIZE {
            return Err(TileDecodeError::TooShort {
                len,
                needed: HEADER_SIZE,
            });
        }

        let mut header = &data[..HEADER_SIZE];
        let mut magic = [0u8; 4];
        header.copy_to_slice(&mut magic);
        if &magic != MAGIC {
            return Err(TileDecodeError::BadMagic(magic));
        }
        let version = header.get_u16_le();
        if version != VERSION {
            return Err(TileDecodeError::UnsupportedVersion(version));
        }
        let level = header.get_u8();
        header.advance(1);
        let tile_id = header.get_u32_le();
        let node_count = header.get_u32_le();
        let directed_edge_count = header.get_u32_le();
        let transition_count = header.get_u32_le();
        let edge_info_size = header.get_u32_le();
        header.advance(4);
        let base = PointLL::new(header.get_f64_le(), header.get_f64_le());

        let graph_id = GraphId::new(tile_id, level, 0)?;

        let mut end = HEADER_SIZE as u64;
        let mut section = |name: &'static str, count: u32, size: usize| {
            let start = end;
            end += u64::from(count) * size as u64;
            if end > len as u64 {
                Err(TileDecodeError::SectionOutOfBounds {
                    section: name,
                    end,
                    len,
                })
            } else {
                Ok(start as usize)
            }
        };
        let nodes_offset = section("nodes", node_count, NodeInfo::SIZE)?;
        let edges_offset = section("directed edges", directed_edge_count, DirectedEdge::SIZE)?;
        let transitions_offset = section("transitions", transition_count, NodeTransition::SIZE)?;
        let edge_info_offset = section("edge info", edge_info_size, 1)?;

        let tile = Self {
            data,
            graph_id,
            base,
            node_count,
            directed_edge_count,
            transition_count,
            nodes_offset,
            edges_offset,
            transitions_offset,
            edge_info_offset,
            edge_info_size: edge_info_size as usize,
        };
        tile.validate_records()?;
        Ok(tile)
    }

    fn validate_records(&self) -> Result<(), TileDecodeError> {
        for index in 0..self.node_count {
            let invalid = TileDecodeError::InvalidRecord {
                section: "nodes",
                index,
            };
            let node = self.node(index).ok_or_else(|| invalid.clone())?;
            let edges_end = u64::from(node.edge_index) + u64::from(node.edge_count);
            let transitions_end =
                u64::from(node.transition_index) + u64::from(node.transition_count);
            if edges_end > u64::from(self.directed_edge_count)
                || transitions_end > u64::from(self.transition_count)
            {
                return Err(invalid);
            }
        }
        for index in 0..self.directed_edge_count {
            if self.directed_edge(index).is_none() {
                return Err(TileDecodeError::InvalidRecord {
                    section: "directed edges",
                    index,
                });
            }
        }
        for index in 0..self.transition_count {
            if self.transition(index).is_none() {
                return Err(TileDecodeError::InvalidRecord {
                    section: "transitions",
                    index,
                });
            }
        }
        Ok(())
    }

    /// Id of this tile (index zero).
    pub fn graph_id(&self) -> GraphId {
        self.graph_id
    }

    /// Lower-left corner of the tile.
    pub fn base(&self) -> PointLL {
        self.base
    }

    pub fn node_count(&self) -> u32 {
        self.node_count
    }

    pub fn directed_edge_count(&self) -> u32 {
        self.directed_edge_count
    }

    pub fn transition_count(&self) -> u32 {
        self.transition_count
    }

    /// Size of the underlying buffer, the unit the cache budgets in.
    pub fn size_bytes(&self) -> usize {
        self.data.len()
    }

    pub fn node(&self, index: u32) -> Option<NodeInfo> {
        self.record(self.nodes_offset, self.node_count, index, NodeInfo::SIZE)
            .map(NodeInfo::decode)
    }

    pub fn directed_edge(&self, index: u32) -> Option<DirectedEdge> {
        self.record(
            self.edges_offset,
            self.directed_edge_count,
            index,
            DirectedEdge::SIZE,
        )
        .and_then(DirectedEdge::decode)
    }

    pub fn transition(&self, index: u32) -> Option<NodeTransition> {
        self.record(
            self.transitions_offset,
            self.transition_count,
            index,
            NodeTransition::SIZE,
        )
        .and_then(NodeTransition::decode)
    }

    /// The outgoing edges of `node` with their indices in this tile.
    pub fn directed_edges<'a>(
        &'a self,
        node: &NodeInfo,
    ) -> impl Iterator<Item = (u32, DirectedEdge)> + 'a {
        node.edge_range()
            .filter_map(move |index| self.directed_edge(index).map(|edge| (index, edge)))
    }

    /// The level transitions recorded at `node`.
    pub fn transitions<'a>(&'a self, node: &NodeInfo) -> impl Iterator<Item = NodeTransition> + 'a {
        let start = node.transition_index;
        let end = start.saturating_add(u32::from(node.transition_count));
        (start..end).filter_map(move |index| self.transition(index))
    }

    /// Decode the edge info stored at `offset` in the edge info section.
    pub fn edge_info(&self, offset: u32) -> Result<EdgeInfo, TileDecodeError> {
        let out_of_bounds = || TileDecodeError::ShapeOutOfBounds {
            offset,
            size: self.edge_info_size,
        };
        let start = offset as usize;
        let header_end = start
            .checked_add(EDGE_INFO_HEADER_SIZE)
            .filter(|&end| end <= self.edge_info_size)
            .ok_or_else(out_of_bounds)?;

        let section = &self.data[self.edge_info_offset..self.edge_info_offset + self.edge_info_size];
        let mut header = &section[start..header_end];
        let way_id = header.get_u64_le();
        let point_count = header.get_u32_le() as usize;

        let shape_end = point_count
            .checked_mul(SHAPE_POINT_SIZE)
            .and_then(|size| header_end.checked_add(size))
            .filter(|&end| end <= self.edge_info_size)
            .ok_or_else(out_of_bounds)?;
        let mut points = &section[header_end..shape_end];
        let shape = (0..point_count)
            .map(|_| PointLL::new(points.get_f64_le(), points.get_f64_le()))
            .collect();
        Ok(EdgeInfo { way_id, shape })
    }

    /// Shape of the edge info stored at `offset`, in stored order.
    pub fn edge_shape(&self, offset: u32) -> Result<Vec<PointLL>, TileDecodeError> {
        self.edge_info(offset).map(|info| info.shape)
    }

    fn record(&self, section: usize, count: u32, index: u32, size: usize) -> Option<&[u8]> {
        if index >= count {
            return None;
        }
        let start = section + index as usize * size;
        self.data.get(start..start + size)
    }
}
