use crate::node::NodeId;
use std::fmt;

/// Unique identifier of the node pair an edge connects
///
/// Edges are undirected: for all nodes `n1` and `n2` the identifier
/// `(n1, n2)` is the same as the identifier `(n2, n1)`. Several parallel
/// [`Edge`]s may share the same identifier.
///
/// [`Edge`]: crate::edge::Edge
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct EdgeId {
    smaller_id: NodeId,
    larger_id: NodeId,
}

impl EdgeId {
    /// create the edge identifier from the given node tuple.
    ///
    /// ```
    /// # use probesim_core::{EdgeId, NodeId};
    /// assert_eq!(
    ///     EdgeId::new((NodeId::SOURCE, NodeId::DESTINATION)),
    ///     EdgeId::new((NodeId::DESTINATION, NodeId::SOURCE)),
    /// );
    /// ```
    pub fn new((a, b): (NodeId, NodeId)) -> Self {
        if a < b {
            Self {
                smaller_id: a,
                larger_id: b,
            }
        } else {
            Self {
                smaller_id: b,
                larger_id: a,
            }
        }
    }

    /// get the [`NodeId`]s that compose this edge identifier
    ///
    /// The nodes are always returned smallest first, whatever the order
    /// used at construction.
    #[inline]
    pub fn into_nodes(self) -> (NodeId, NodeId) {
        (self.smaller_id, self.larger_id)
    }

    /// `true` if `node` is one of the two ends of this edge.
    pub fn touches(&self, node: NodeId) -> bool {
        self.smaller_id == node || self.larger_id == node
    }
}

impl fmt::Display for EdgeId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}<->{}", self.smaller_id, self.larger_id)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn n1n2_eq_n2n1() {
        let n1 = NodeId::SOURCE;
        let n2 = NodeId::DESTINATION;

        assert_eq!(
            EdgeId::new((n1, n2)),
            // ==
            EdgeId::new((n2, n1)),
        );
    }

    #[test]
    fn into_nodes_is_ordered() {
        let (a, b) = EdgeId::new((NodeId::new(9), NodeId::new(3))).into_nodes();
        assert_eq!(a, NodeId::new(3));
        assert_eq!(b, NodeId::new(9));
    }

    #[test]
    fn display() {
        let id = EdgeId::new((NodeId::DESTINATION, NodeId::SOURCE));
        assert_eq!(id.to_string(), "1<->2");
        assert!(id.touches(NodeId::SOURCE));
        assert!(!id.touches(NodeId::new(3)));
    }
}
