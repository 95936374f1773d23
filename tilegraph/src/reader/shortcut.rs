//! Shortcut lookup and expansion.
//!
//! A shortcut is an edge on a less detailed level that replaces a chain of
//! edges between two nodes. The first edge of the chain carries the
//! shortcut's bit in its `superseded` mask; that value minus one is the
//! shortcut's position within the start node's edges.

use std::collections::HashSet;

use thiserror::Error;
use tracing::error;

use super::GraphReader;
use crate::graph::{DirectedEdge, GraphId, GraphTile, NodeInfo};

/// Why a shortcut could not be expanded.
#[derive(Debug, Error)]
enum RecoveryError {
    #[error("the begin node cannot be resolved")]
    NoBeginNode,

    #[error("node {0} is unavailable")]
    MissingNode(GraphId),

    #[error("no edge at the begin node is superseded by the shortcut")]
    NoSeed,

    #[error("no continuing edge at node {0}")]
    NoContinuation(GraphId),

    #[error("more than one continuing edge at node {0}")]
    Ambiguous(GraphId),

    #[error("edge {0} was reached twice")]
    Revisited(GraphId),

    #[error("accumulated length {accumulated} does not match the shortcut length {expected}")]
    LengthMismatch { accumulated: u64, expected: u32 },
}

impl GraphReader {
    /// The shortcut that covers an edge, if any.
    ///
    /// Walks backwards from the edge through nodes with a single continuing
    /// edge until it arrives over an edge a shortcut supersedes. Returns
    /// `None` on the most detailed level, where no shortcuts exist, and when
    /// the walk branches, dead-ends or loops.
    pub fn get_shortcut(&self, edge_id: GraphId) -> Option<GraphId> {
        if edge_id.level() >= self.hierarchy.max_level() {
            return None;
        }
        let edge = self.directed_edge(edge_id)?;
        if edge.is_shortcut() {
            return Some(edge_id);
        }

        let (_, mut stepping) = self.opposing_of(edge_id, &edge)?;
        let mut visited = HashSet::new();
        loop {
            let node_id = stepping.endnode;
            let tile = self.get_tile(node_id)?;
            let node = tile.node(node_id.id())?;

            // the edge leaving this node back along the walk
            let arrival_index = node.edge_index + u32::from(stepping.opp_index);
            if !node.edge_range().contains(&arrival_index) {
                return None;
            }
            let arrival = tile.directed_edge(arrival_index)?;
            if arrival.superseded != 0 {
                return self.superseding_shortcut(&tile, node_id, &node, arrival_index, &arrival);
            }
            if !visited.insert(node_id.with_id(arrival_index)?) {
                return None;
            }
            stepping = continuing_edge(&tile, &node, arrival_index)?;
        }
    }

    /// Resolve the shortcut named by an edge's `superseded` value at `node`.
    fn superseding_shortcut(
        &self,
        tile: &GraphTile,
        node_id: GraphId,
        node: &NodeInfo,
        arrival_index: u32,
        arrival: &DirectedEdge,
    ) -> Option<GraphId> {
        let index = u32::from(arrival.superseded)
            .checked_sub(1)
            .and_then(|offset| node.edge_index.checked_add(offset))
            .filter(|index| node.edge_range().contains(index))
            .filter(|&index| {
                tile.directed_edge(index)
                    .is_some_and(|edge| edge.is_shortcut())
            });
        let Some(index) = index else {
            error!(
                node = %node_id,
                edge_index = arrival_index,
                superseded = arrival.superseded,
                edge_count = node.edge_count,
                "Superseded edge does not name a shortcut at its start node"
            );
            return None;
        };
        node_id.with_id(index)
    }

    /// The edges a shortcut replaces, in travel order.
    ///
    /// Returns `[shortcut_id]` when the edge is not a shortcut, and also when
    /// the chain cannot be recovered or its lengths do not add up to the
    /// shortcut's length; the latter is logged as an error.
    pub fn recover_shortcut(&self, shortcut_id: GraphId) -> Vec<GraphId> {
        let Some(shortcut) = self.directed_edge(shortcut_id) else {
            return vec![shortcut_id];
        };
        if !shortcut.is_shortcut() {
            return vec![shortcut_id];
        }
        match self.expand_shortcut(shortcut_id, &shortcut) {
            Ok(edges) => edges,
            Err(e) => {
                error!(shortcut = %shortcut_id, reason = %e, "Unable to recover shortcut");
                vec![shortcut_id]
            }
        }
    }

    fn expand_shortcut(
        &self,
        shortcut_id: GraphId,
        shortcut: &DirectedEdge,
    ) -> Result<Vec<GraphId>, RecoveryError> {
        let mut begin_node = self
            .edge_startnode(shortcut_id)
            .ok_or(RecoveryError::NoBeginNode)?;
        let tile = self
            .get_tile(begin_node)
            .ok_or(RecoveryError::MissingNode(begin_node))?;
        let node = tile
            .node(begin_node.id())
            .ok_or(RecoveryError::MissingNode(begin_node))?;
        let (seed_index, seed) = tile
            .directed_edges(&node)
            .find(|(_, edge)| edge.superseded & shortcut.shortcut != 0)
            .ok_or(RecoveryError::NoSeed)?;
        let seed_id = begin_node.with_id(seed_index).ok_or(RecoveryError::NoSeed)?;

        let expected = shortcut.length;
        let mut edges = vec![seed_id];
        let mut visited = HashSet::from([seed_id]);
        let mut current = seed;
        let mut accumulated = u64::from(seed.length);

        while current.endnode != shortcut.endnode {
            if accumulated > u64::from(expected) {
                return Err(RecoveryError::LengthMismatch {
                    accumulated,
                    expected,
                });
            }

            let node_id = current.endnode;
            let tile = self
                .get_tile(node_id)
                .ok_or(RecoveryError::MissingNode(node_id))?;
            let node = tile
                .node(node_id.id())
                .ok_or(RecoveryError::MissingNode(node_id))?;

            let mut candidates = tile.directed_edges(&node).filter(|(_, edge)| {
                edge.endnode != begin_node
                    && !edge.is_shortcut()
                    && edge.has_auto_access()
                    && edge.same_shortcut_attributes(shortcut)
            });
            let (index, next) = candidates
                .next()
                .ok_or(RecoveryError::NoContinuation(node_id))?;
            if candidates.next().is_some() {
                return Err(RecoveryError::Ambiguous(node_id));
            }

            let next_id = node_id
                .with_id(index)
                .ok_or(RecoveryError::NoContinuation(node_id))?;
            if !visited.insert(next_id) {
                return Err(RecoveryError::Revisited(next_id));
            }
            edges.push(next_id);
            begin_node = node_id;
            accumulated += u64::from(next.length);
            current = next;
        }

        if accumulated != u64::from(expected) {
            return Err(RecoveryError::LengthMismatch {
                accumulated,
                expected,
            });
        }
        Ok(edges)
    }
}

/// The single regular edge leaving `node` other than `arrival_index`,
/// ignoring shortcuts and transit connections.
fn continuing_edge(tile: &GraphTile, node: &NodeInfo, arrival_index: u32) -> Option<DirectedEdge> {
    let mut candidates = tile.directed_edges(node).filter(|(index, edge)| {
        *index != arrival_index && !edge.is_shortcut() && !edge.use_kind.is_transit_connection()
    });
    let (_, edge) = candidates.next()?;
    if candidates.next().is_some() {
        return None;
    }
    Some(edge)
}

#[cfg(test)]
mod tests {
    use super::super::test_graph::*;
    use crate::graph::{access, DirectedEdge, GraphId, GraphTileWriter, Use};
    use crate::grid::PointLL;
    use crate::storage::MemoryTileStorage;

    const TILE: u32 = 40;

    fn e(index: u32) -> GraphId {
        id(TILE, index)
    }

    fn n(index: u32) -> GraphId {
        id(TILE, index)
    }

    /// A straight chain n0 - n1 - n2 - n3 with 100 m edges and a shortcut
    /// in each direction between n0 and n3.
    ///
    /// ```text
    /// n0: e0 shortcut -> n3, e1 -> n1 (superseded by e0)
    /// n1: e2 -> n0, e3 -> n2
    /// n2: e4 -> n1, e5 -> n3
    /// n3: e6 shortcut -> n0, e7 -> n2 (superseded by e6)
    /// ```
    struct Chain {
        shortcut_length: u32,
        edit: fn(&mut Vec<DirectedEdge>),
    }

    impl Default for Chain {
        fn default() -> Self {
            Self {
                shortcut_length: 300,
                edit: |_| {},
            }
        }
    }

    impl Chain {
        fn edges(&self) -> Vec<DirectedEdge> {
            let road = |to: u32, opp: u16| DirectedEdge::new(n(to), 100, opp);
            let shortcut = |to: u32| {
                let mut edge = DirectedEdge::new(n(to), self.shortcut_length, 0);
                edge.shortcut = 1;
                edge
            };
            let superseded = |to: u32, opp: u16| {
                let mut edge = road(to, opp);
                edge.superseded = 1;
                edge
            };
            let mut edges = vec![
                shortcut(3),
                superseded(1, 0),
                road(0, 1),
                road(2, 0),
                road(1, 1),
                road(3, 1),
                shortcut(0),
                superseded(2, 1),
            ];
            (self.edit)(&mut edges);
            edges
        }

        fn storage(&self) -> MemoryTileStorage {
            let edges = self.edges();
            let mut w = GraphTileWriter::new(e(0), PointLL::new(-77.0, 40.0));
            for (node, chunk) in edges.chunks(2).enumerate() {
                w.add_node(PointLL::new(-76.9 + 0.01 * node as f64, 40.1), node as u8);
                for edge in chunk {
                    w.add_directed_edge(*edge).unwrap();
                }
            }
            let storage = MemoryTileStorage::new();
            storage.insert(e(0), w.into_bytes());
            storage
        }
    }

    #[test]
    fn test_chain_is_consistent() {
        let reader = reader(Chain::default().storage());
        for index in 0..8 {
            let opposing = reader.get_opposing_edge_id(e(index)).unwrap();
            assert_eq!(reader.get_opposing_edge_id(opposing), Some(e(index)));
        }
    }

    #[test]
    fn test_get_shortcut_walks_back_to_shortcut_start() {
        let reader = reader(Chain::default().storage());
        assert_eq!(reader.get_shortcut(e(1)), Some(e(0)));
        assert_eq!(reader.get_shortcut(e(3)), Some(e(0)));
        assert_eq!(reader.get_shortcut(e(5)), Some(e(0)));
        assert_eq!(reader.get_shortcut(e(7)), Some(e(6)));
        assert_eq!(reader.get_shortcut(e(4)), Some(e(6)));
        assert_eq!(reader.get_shortcut(e(2)), Some(e(6)));
    }

    #[test]
    fn test_get_shortcut_of_shortcut_is_itself() {
        let reader = reader(Chain::default().storage());
        assert_eq!(reader.get_shortcut(e(0)), Some(e(0)));
        assert_eq!(reader.get_shortcut(e(6)), Some(e(6)));
    }

    #[test]
    fn test_get_shortcut_on_most_detailed_level() {
        let reader = reader(Chain::default().storage());
        let local = GraphId::new(TILE, 2, 1).unwrap();
        assert_eq!(reader.get_shortcut(local), None);
        let transit = GraphId::new(TILE, 3, 1).unwrap();
        assert_eq!(reader.get_shortcut(transit), None);
    }

    #[test]
    fn test_get_shortcut_stops_at_branch() {
        // nothing is marked superseded, so both walks dead-end at a node
        // whose only other edge is a shortcut
        let chain = Chain {
            edit: |edges| {
                edges[1].superseded = 0;
                edges[7].superseded = 0;
            },
            ..Chain::default()
        };
        let reader = reader(chain.storage());
        assert_eq!(reader.get_shortcut(e(3)), None);
        assert_eq!(reader.get_shortcut(e(4)), None);
    }

    #[test]
    fn test_get_shortcut_rejects_superseded_past_node_edges() {
        // n0 has two edges, so a superseded value of 5 names no edge of it
        let chain = Chain {
            edit: |edges| edges[1].superseded = 5,
            ..Chain::default()
        };
        let reader = reader(chain.storage());
        assert_eq!(reader.get_shortcut(e(1)), None);
        assert_eq!(reader.get_shortcut(e(3)), None);
        assert_eq!(reader.get_shortcut(e(7)), Some(e(6)));
    }

    #[test]
    fn test_get_shortcut_rejects_superseded_naming_a_plain_edge() {
        // superseded 2 points at e1 itself, which is not a shortcut
        let chain = Chain {
            edit: |edges| edges[1].superseded = 2,
            ..Chain::default()
        };
        let reader = reader(chain.storage());
        assert_eq!(reader.get_shortcut(e(5)), None);
        assert_eq!(reader.get_shortcut(e(2)), Some(e(6)));
    }

    #[test]
    fn test_get_shortcut_ignores_transit_connections() {
        let chain = Chain {
            edit: |edges| {
                // n2 -> n1 becomes a transit connection; the walk from e5
                // finds no other continuing edge at n2
                edges[4].use_kind = Use::TransitConnection;
            },
            ..Chain::default()
        };
        let reader = reader(chain.storage());
        assert_eq!(reader.get_shortcut(e(5)), None);
        assert_eq!(reader.get_shortcut(e(1)), Some(e(0)));
    }

    #[test]
    fn test_get_shortcut_terminates_on_cycle() {
        // a ring of three nodes, no superseded edges
        let storage = MemoryTileStorage::new();
        let mut w = GraphTileWriter::new(e(0), PointLL::new(-77.0, 40.0));
        for node in 0..3u32 {
            w.add_node(PointLL::new(-76.9 + 0.01 * f64::from(node), 40.1), 0);
            // edge 2k -> next node, edge 2k+1 -> previous node
            w.add_directed_edge(DirectedEdge::new(n((node + 1) % 3), 10, 1))
                .unwrap();
            w.add_directed_edge(DirectedEdge::new(n((node + 2) % 3), 10, 0))
                .unwrap();
        }
        storage.insert(e(0), w.into_bytes());
        let reader = reader(storage);
        assert_eq!(reader.get_opposing_edge_id(e(0)), Some(e(3)));
        assert_eq!(reader.get_shortcut(e(0)), None);
    }

    #[test]
    fn test_recover_shortcut() {
        let reader = reader(Chain::default().storage());
        assert_eq!(reader.recover_shortcut(e(0)), vec![e(1), e(3), e(5)]);
        assert_eq!(reader.recover_shortcut(e(6)), vec![e(7), e(4), e(2)]);

        let total: u32 = reader
            .recover_shortcut(e(0))
            .into_iter()
            .map(|edge| reader.directed_edge(edge).unwrap().length)
            .sum();
        assert_eq!(total, reader.directed_edge(e(0)).unwrap().length);
    }

    #[test]
    fn test_recover_non_shortcut() {
        let reader = reader(Chain::default().storage());
        assert_eq!(reader.recover_shortcut(e(3)), vec![e(3)]);
        assert_eq!(reader.recover_shortcut(e(99)), vec![e(99)]);
    }

    #[test]
    fn test_recover_falls_back_on_length_mismatch() {
        for shortcut_length in [250, 350] {
            let chain = Chain {
                shortcut_length,
                ..Chain::default()
            };
            let reader = reader(chain.storage());
            assert_eq!(reader.recover_shortcut(e(0)), vec![e(0)]);
        }
    }

    #[test]
    fn test_recover_falls_back_without_seed() {
        let chain = Chain {
            edit: |edges| edges[1].superseded = 2,
            ..Chain::default()
        };
        let reader = reader(chain.storage());
        assert_eq!(reader.recover_shortcut(e(0)), vec![e(0)]);
    }

    #[test]
    fn test_recover_requires_matching_attributes() {
        let chain = Chain {
            edit: |edges| edges[3].toll = true,
            ..Chain::default()
        };
        let reader = reader(chain.storage());
        assert_eq!(reader.recover_shortcut(e(0)), vec![e(0)]);

        let chain = Chain {
            edit: |edges| edges[5].forward_access = access::PEDESTRIAN,
            ..Chain::default()
        };
        let reader = super::super::test_graph::reader(chain.storage());
        assert_eq!(reader.recover_shortcut(e(0)), vec![e(0)]);
    }

    #[test]
    fn test_recover_falls_back_when_ambiguous() {
        // n1's way back to n0 now leads to n2 too
        let chain = Chain {
            edit: |edges| edges[2].endnode = n(2),
            ..Chain::default()
        };
        let reader = reader(chain.storage());
        assert_eq!(reader.recover_shortcut(e(0)), vec![e(0)]);
    }
}
