//! Fixed-size node, edge and transition records stored in a graph tile.
//!
//! Every record has a little-endian on-disk form of a fixed size. Decoding
//! takes a slice of exactly that size; the tile decoder is responsible for
//! slicing.

use bytes::{Buf, BufMut};
use serde::{Deserialize, Serialize};

use super::graph_id::GraphId;
use crate::grid::PointLL;

/// Access bits for `forward_access` / `reverse_access`.
pub mod access {
    pub const AUTO: u8 = 1;
    pub const PEDESTRIAN: u8 = 1 << 1;
    pub const BICYCLE: u8 = 1 << 2;
    pub const TRUCK: u8 = 1 << 3;
    pub const BUS: u8 = 1 << 4;
    pub const ALL: u8 = AUTO | PEDESTRIAN | BICYCLE | TRUCK | BUS;
}

const FLAG_TOLL: u8 = 1;
const FLAG_LINK: u8 = 1 << 1;
const FLAG_ROUNDABOUT: u8 = 1 << 2;
const FLAG_UNPAVED: u8 = 1 << 3;
const FLAG_DEST_ONLY: u8 = 1 << 4;
const FLAG_SIGN: u8 = 1 << 5;
const FLAG_FORWARD: u8 = 1 << 6;

/// What an edge is used for.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub enum Use {
    #[default]
    Road,
    Ramp,
    TurnChannel,
    Track,
    Driveway,
    Alley,
    ParkingAisle,
    Culdesac,
    Footway,
    Steps,
    Cycleway,
    Ferry,
    /// Scheduled rail line between two stops.
    Rail,
    /// Scheduled bus line between two stops.
    Bus,
    /// Road network to transit station.
    TransitConnection,
    /// Station to station egress.
    EgressConnection,
    /// Station to platform.
    PlatformConnection,
    Other,
}

impl Use {
    pub fn to_u8(self) -> u8 {
        match self {
            Use::Road => 0,
            Use::Ramp => 1,
            Use::TurnChannel => 2,
            Use::Track => 3,
            Use::Driveway => 4,
            Use::Alley => 5,
            Use::ParkingAisle => 6,
            Use::Culdesac => 7,
            Use::Footway => 8,
            Use::Steps => 9,
            Use::Cycleway => 10,
            Use::Ferry => 11,
            Use::Rail => 20,
            Use::Bus => 21,
            Use::TransitConnection => 30,
            Use::EgressConnection => 31,
            Use::PlatformConnection => 32,
            Use::Other => 255,
        }
    }

    /// Unknown codes read as [`Use::Other`].
    pub fn from_u8(value: u8) -> Self {
        match value {
            0 => Use::Road,
            1 => Use::Ramp,
            2 => Use::TurnChannel,
            3 => Use::Track,
            4 => Use::Driveway,
            5 => Use::Alley,
            6 => Use::ParkingAisle,
            7 => Use::Culdesac,
            8 => Use::Footway,
            9 => Use::Steps,
            10 => Use::Cycleway,
            11 => Use::Ferry,
            20 => Use::Rail,
            21 => Use::Bus,
            30 => Use::TransitConnection,
            31 => Use::EgressConnection,
            32 => Use::PlatformConnection,
            _ => Use::Other,
        }
    }

    /// Scheduled transit lines; these have no single reciprocal edge.
    pub fn is_transit_line(self) -> bool {
        matches!(self, Use::Rail | Use::Bus)
    }

    /// Connections between the road network and transit stations.
    pub fn is_transit_connection(self) -> bool {
        matches!(
            self,
            Use::TransitConnection | Use::EgressConnection | Use::PlatformConnection
        )
    }
}

/// Road classification, most important first.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Default, Serialize, Deserialize)]
pub enum RoadClass {
    Motorway,
    Trunk,
    Primary,
    Secondary,
    Tertiary,
    Unclassified,
    Residential,
    #[default]
    ServiceOther,
}

impl RoadClass {
    pub fn to_u8(self) -> u8 {
        self as u8
    }

    /// Only the low three bits are significant.
    pub fn from_u8(value: u8) -> Self {
        match value & 7 {
            0 => RoadClass::Motorway,
            1 => RoadClass::Trunk,
            2 => RoadClass::Primary,
            3 => RoadClass::Secondary,
            4 => RoadClass::Tertiary,
            5 => RoadClass::Unclassified,
            6 => RoadClass::Residential,
            _ => RoadClass::ServiceOther,
        }
    }
}

/// Road surface, smoothest first.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Default, Serialize, Deserialize)]
pub enum Surface {
    #[default]
    PavedSmooth,
    Paved,
    PavedRough,
    Compacted,
    Dirt,
    Gravel,
    Path,
    Impassable,
}

impl Surface {
    pub fn to_u8(self) -> u8 {
        self as u8
    }

    /// Only the low three bits are significant.
    pub fn from_u8(value: u8) -> Self {
        match value & 7 {
            0 => Surface::PavedSmooth,
            1 => Surface::Paved,
            2 => Surface::PavedRough,
            3 => Surface::Compacted,
            4 => Surface::Dirt,
            5 => Surface::Gravel,
            6 => Surface::Path,
            _ => Surface::Impassable,
        }
    }
}

/// A graph node: its location and the ranges of its outgoing edges and
/// level transitions.
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct NodeInfo {
    pub lat_lng: PointLL,
    /// Index of the first outgoing directed edge within the tile.
    pub edge_index: u32,
    pub edge_count: u32,
    /// Index of the first level transition within the tile.
    pub transition_index: u32,
    pub transition_count: u16,
    /// Relative road density around the node (0-15).
    pub density: u8,
}

impl NodeInfo {
    pub const SIZE: usize = 32;

    /// Range of this node's directed edge indices.
    pub fn edge_range(&self) -> std::ops::Range<u32> {
        self.edge_index..self.edge_index.saturating_add(self.edge_count)
    }

    pub(crate) fn decode(mut buf: &[u8]) -> Self {
        let lng = buf.get_f64_le();
        let lat = buf.get_f64_le();
        let edge_index = buf.get_u32_le();
        let edge_count = buf.get_u32_le();
        let transition_index = buf.get_u32_le();
        let transition_count = buf.get_u16_le();
        let density = buf.get_u8();
        Self {
            lat_lng: PointLL::new(lng, lat),
            edge_index,
            edge_count,
            transition_index,
            transition_count,
            density,
        }
    }

    pub(crate) fn encode(&self, buf: &mut impl BufMut) {
        buf.put_f64_le(self.lat_lng.lng);
        buf.put_f64_le(self.lat_lng.lat);
        buf.put_u32_le(self.edge_index);
        buf.put_u32_le(self.edge_count);
        buf.put_u32_le(self.transition_index);
        buf.put_u16_le(self.transition_count);
        buf.put_u8(self.density);
        buf.put_u8(0);
    }
}

/// A directed edge leaving a node.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct DirectedEdge {
    pub endnode: GraphId,
    /// Length in meters.
    pub length: u32,
    /// Offset of the shared edge info (shape) in the tile's edge info blob.
    pub edge_info_offset: u32,
    /// Index of the reciprocal edge within the end node's edge block.
    pub opp_index: u16,
    pub use_kind: Use,
    pub classification: RoadClass,
    pub surface: Surface,
    pub forward_access: u8,
    pub reverse_access: u8,
    /// Non-zero on shortcut edges: the bit identifying this shortcut.
    pub shortcut: u8,
    /// Non-zero on edges a shortcut supersedes: the shortcut's bit, which is
    /// also one more than the shortcut's index within the node's edge block.
    pub superseded: u8,
    pub toll: bool,
    pub link: bool,
    pub roundabout: bool,
    pub unpaved: bool,
    pub dest_only: bool,
    pub sign: bool,
    /// Whether the edge runs in the direction its shape was stored.
    pub forward: bool,
}

impl DirectedEdge {
    pub const SIZE: usize = 32;

    /// An ordinary two-way road edge towards `endnode`.
    pub fn new(endnode: GraphId, length: u32, opp_index: u16) -> Self {
        Self {
            endnode,
            length,
            edge_info_offset: 0,
            opp_index,
            use_kind: Use::Road,
            classification: RoadClass::default(),
            surface: Surface::default(),
            forward_access: access::ALL,
            reverse_access: access::ALL,
            shortcut: 0,
            superseded: 0,
            toll: false,
            link: false,
            roundabout: false,
            unpaved: false,
            dest_only: false,
            sign: false,
            forward: true,
        }
    }

    pub fn is_shortcut(&self) -> bool {
        self.shortcut != 0
    }

    pub fn is_transit_line(&self) -> bool {
        self.use_kind.is_transit_line()
    }

    /// Whether cars may travel along the edge in its direction.
    pub fn has_auto_access(&self) -> bool {
        self.forward_access & access::AUTO != 0
    }

    /// Whether `other` carries the same attributes a shortcut keeps uniform
    /// along the edges it replaces.
    pub(crate) fn same_shortcut_attributes(&self, other: &DirectedEdge) -> bool {
        self.sign == other.sign
            && self.use_kind == other.use_kind
            && self.classification == other.classification
            && self.roundabout == other.roundabout
            && self.link == other.link
            && self.toll == other.toll
            && self.dest_only == other.dest_only
            && self.unpaved == other.unpaved
            && self.surface == other.surface
    }

    /// `None` when the stored end node is not a valid id.
    pub(crate) fn decode(mut buf: &[u8]) -> Option<Self> {
        let endnode = GraphId::from_value(buf.get_u64_le())?;
        let length = buf.get_u32_le();
        let edge_info_offset = buf.get_u32_le();
        let opp_index = buf.get_u16_le();
        let use_kind = Use::from_u8(buf.get_u8());
        let classification = RoadClass::from_u8(buf.get_u8());
        let surface = Surface::from_u8(buf.get_u8());
        let forward_access = buf.get_u8();
        let reverse_access = buf.get_u8();
        let shortcut = buf.get_u8();
        let superseded = buf.get_u8();
        let flags = buf.get_u8();
        Some(Self {
            endnode,
            length,
            edge_info_offset,
            opp_index,
            use_kind,
            classification,
            surface,
            forward_access,
            reverse_access,
            shortcut,
            superseded,
            toll: flags & FLAG_TOLL != 0,
            link: flags & FLAG_LINK != 0,
            roundabout: flags & FLAG_ROUNDABOUT != 0,
            unpaved: flags & FLAG_UNPAVED != 0,
            dest_only: flags & FLAG_DEST_ONLY != 0,
            sign: flags & FLAG_SIGN != 0,
            forward: flags & FLAG_FORWARD != 0,
        })
    }

    pub(crate) fn encode(&self, buf: &mut impl BufMut) {
        let mut flags = 0;
        for (set, bit) in [
            (self.toll, FLAG_TOLL),
            (self.link, FLAG_LINK),
            (self.roundabout, FLAG_ROUNDABOUT),
            (self.unpaved, FLAG_UNPAVED),
            (self.dest_only, FLAG_DEST_ONLY),
            (self.sign, FLAG_SIGN),
            (self.forward, FLAG_FORWARD),
        ] {
            if set {
                flags |= bit;
            }
        }

        buf.put_u64_le(self.endnode.value());
        buf.put_u32_le(self.length);
        buf.put_u32_le(self.edge_info_offset);
        buf.put_u16_le(self.opp_index);
        buf.put_u8(self.use_kind.to_u8());
        buf.put_u8(self.classification.to_u8());
        buf.put_u8(self.surface.to_u8());
        buf.put_u8(self.forward_access);
        buf.put_u8(self.reverse_access);
        buf.put_u8(self.shortcut);
        buf.put_u8(self.superseded);
        buf.put_u8(flags);
        buf.put_bytes(0, 6);
    }
}

/// The same location on another hierarchy level.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct NodeTransition {
    pub endnode: GraphId,
    /// Whether the transition leads to a less detailed level.
    pub up: bool,
}

impl NodeTransition {
    pub const SIZE: usize = 16;

    pub(crate) fn decode(mut buf: &[u8]) -> Option<Self> {
        let endnode = GraphId::from_value(buf.get_u64_le())?;
        let up = buf.get_u8() != 0;
        Some(Self { endnode, up })
    }

    pub(crate) fn encode(&self, buf: &mut impl BufMut) {
        buf.put_u64_le(self.endnode.value());
        buf.put_u8(u8::from(self.up));
        buf.put_bytes(0, 7);
    }
}
