//! Ground truth delay parameters of the simulated paths.
//!
//! A [`DelayDistributionTable`] lists every edge of the network together
//! with the normal distribution its delays follow. The two built-in
//! topologies are selected with a [`PathConfig`]; custom tables can be
//! assembled edge by edge.

use crate::{edge::Edge, measure::NormalParams, node::NodeId};
use std::{convert::Infallible, fmt, str::FromStr};

const SINGLE_EDGE: NormalParams = NormalParams::from_ms(10.0, 2.0);
const SECOND_EDGE: NormalParams = NormalParams::from_ms(15.0, 3.0);

/// Selects which built-in [`DelayDistributionTable`] populates the
/// network.
///
/// Keys are the path counts, as strings or integers. Any unknown key falls
/// back to [`PathConfig::Single`].
///
/// ```
/// # use probesim_core::PathConfig;
/// assert_eq!("1".parse::<PathConfig>().unwrap(), PathConfig::Single);
/// assert_eq!("2".parse::<PathConfig>().unwrap(), PathConfig::Double);
/// assert_eq!(PathConfig::from(2), PathConfig::Double);
///
/// // unknown keys fall back to the single edge table
/// assert_eq!("42".parse::<PathConfig>().unwrap(), PathConfig::Single);
/// ```
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq, Hash)]
pub enum PathConfig {
    /// One edge between source and destination: N(10ms, 2ms).
    #[default]
    Single,
    /// Two parallel edges between source and destination: N(10ms, 2ms)
    /// and N(15ms, 3ms).
    Double,
}

/// Per-edge normal delay parameters of a network topology.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct DelayDistributionTable {
    edges: Vec<Edge>,
}

impl PathConfig {
    /// Resolve a configuration key, falling back to [`PathConfig::Single`].
    pub fn from_key(key: &str) -> Self {
        match key.trim() {
            "1" => Self::Single,
            "2" => Self::Double,
            other => {
                tracing::warn!(key = other, "unknown path configuration, using the single edge");
                Self::Single
            }
        }
    }

    /// The fixed edge parameters of this configuration.
    pub fn table(self) -> DelayDistributionTable {
        let table = DelayDistributionTable::new().with_edge(
            NodeId::SOURCE,
            NodeId::DESTINATION,
            SINGLE_EDGE,
        );

        match self {
            Self::Single => table,
            Self::Double => table.with_edge(NodeId::SOURCE, NodeId::DESTINATION, SECOND_EDGE),
        }
    }
}

impl From<u64> for PathConfig {
    fn from(value: u64) -> Self {
        match value {
            1 => Self::Single,
            2 => Self::Double,
            other => {
                tracing::warn!(key = other, "unknown path configuration, using the single edge");
                Self::Single
            }
        }
    }
}

impl FromStr for PathConfig {
    type Err = Infallible;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Ok(Self::from_key(s))
    }
}

impl fmt::Display for PathConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Single => f.write_str("1"),
            Self::Double => f.write_str("2"),
        }
    }
}

impl DelayDistributionTable {
    /// An empty table, to be filled with [`with_edge`](Self::with_edge).
    pub fn new() -> Self {
        Self::default()
    }

    /// Add an edge between `a` and `b`.
    ///
    /// Adding a second edge between the same pair creates a parallel edge,
    /// it does not replace the first one.
    pub fn with_edge(mut self, a: NodeId, b: NodeId, params: NormalParams) -> Self {
        self.edges.push(Edge::new(a, b, params));
        self
    }

    pub fn edges(&self) -> &[Edge] {
        &self.edges
    }

    pub fn len(&self) -> usize {
        self.edges.len()
    }

    pub fn is_empty(&self) -> bool {
        self.edges.is_empty()
    }

    /// Every node referenced by at least one edge, in ascending order.
    pub fn nodes(&self) -> Vec<NodeId> {
        let mut nodes: Vec<NodeId> = self
            .edges
            .iter()
            .flat_map(|edge| {
                let (a, b) = edge.id().into_nodes();
                [a, b]
            })
            .collect();
        nodes.sort();
        nodes.dedup();
        nodes
    }
}

impl From<PathConfig> for DelayDistributionTable {
    fn from(value: PathConfig) -> Self {
        value.table()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn single_edge_table() {
        let table = PathConfig::Single.table();
        assert_eq!(table.len(), 1);

        let edge = table.edges()[0];
        assert_eq!(
            edge.id().into_nodes(),
            (NodeId::SOURCE, NodeId::DESTINATION)
        );
        assert_eq!(edge.params().mean(), 10.0);
        assert_eq!(edge.params().std(), 2.0);
    }

    #[test]
    fn double_edge_table_is_parallel() {
        let table = PathConfig::Double.table();
        assert_eq!(table.len(), 2);
        assert_eq!(table.edges()[0].id(), table.edges()[1].id());
        assert_eq!(table.nodes(), vec![NodeId::SOURCE, NodeId::DESTINATION]);
    }

    #[test]
    fn keys() {
        assert_eq!(PathConfig::from_key("1"), PathConfig::Single);
        assert_eq!(PathConfig::from_key(" 2 "), PathConfig::Double);
        assert_eq!(PathConfig::from(1), PathConfig::Single);
        assert_eq!(PathConfig::from(2), PathConfig::Double);
    }

    #[test]
    fn unknown_keys_fall_back() {
        assert_eq!(PathConfig::from_key("3"), PathConfig::Single);
        assert_eq!(PathConfig::from_key("two"), PathConfig::Single);
        assert_eq!(PathConfig::from_key(""), PathConfig::Single);
        assert_eq!(PathConfig::from(0), PathConfig::Single);
    }

    #[test]
    fn display_round_trip() {
        for path in [PathConfig::Single, PathConfig::Double] {
            assert_eq!(path.to_string().parse::<PathConfig>().unwrap(), path);
        }
    }

    #[test]
    fn custom_table() {
        let n3 = NodeId::new(3);
        let table = DelayDistributionTable::new()
            .with_edge(NodeId::SOURCE, n3, NormalParams::new(1.0, 0.0).unwrap())
            .with_edge(n3, NodeId::DESTINATION, NormalParams::new(2.0, 0.5).unwrap());
        assert_eq!(
            table.nodes(),
            vec![NodeId::SOURCE, NodeId::DESTINATION, n3]
        );
        assert!(!table.is_empty());
        assert!(DelayDistributionTable::new().is_empty());
    }
}
