//! Edge adjacency tests.

use super::GraphReader;
use crate::graph::GraphId;

impl GraphReader {
    /// Whether two edges share an endpoint.
    ///
    /// Each edge contributes its end node and the end node of its opposing
    /// edge (its start node). Endpoints match when they are the same node or
    /// the same location on two levels joined by a recorded transition.
    pub fn are_edges_connected(&self, edge1: GraphId, edge2: GraphId) -> bool {
        let (Some(de1), Some(de2)) = (self.directed_edge(edge1), self.directed_edge(edge2)) else {
            return false;
        };
        if self.nodes_coincide(de1.endnode, de2.endnode) {
            return true;
        }

        let start1 = self.edge_startnode(edge1);
        if let Some(start1) = start1 {
            if self.nodes_coincide(start1, de2.endnode) {
                return true;
            }
        }

        let Some(start2) = self.edge_startnode(edge2) else {
            return false;
        };
        if self.nodes_coincide(start2, de1.endnode) {
            return true;
        }
        start1.is_some_and(|start1| self.nodes_coincide(start1, start2))
    }

    /// Whether `edge2` leaves the node `edge1` arrives at.
    ///
    /// When `edge2` is on another level, the end node of `edge1` is first
    /// moved to that level through one of its transitions.
    pub fn are_edges_connected_forward(&self, edge1: GraphId, edge2: GraphId) -> bool {
        let Some(mut endnode) = self.edge_endnode(edge1) else {
            return false;
        };
        if endnode.level() != edge2.level() {
            let transition = self
                .node_transitions(endnode)
                .into_iter()
                .find(|transition| transition.endnode.level() == edge2.level());
            match transition {
                Some(transition) => endnode = transition.endnode,
                None => return false,
            }
        }
        if !endnode.same_tile(&edge2) {
            return false;
        }
        self.node_info(endnode)
            .is_some_and(|node| node.edge_range().contains(&edge2.id()))
    }

    /// Same node, or one transition apart.
    fn nodes_coincide(&self, a: GraphId, b: GraphId) -> bool {
        if a == b {
            return true;
        }
        if a.level() == b.level() {
            return false;
        }
        self.node_transitions(a).iter().any(|t| t.endnode == b)
            || self.node_transitions(b).iter().any(|t| t.endnode == a)
    }
}
