mod packet;
mod switch;

use crate::{
    edge::{Edge, EdgeId},
    measure::NormalParams,
    node::NodeId,
    rng::{SimRng, seeded_rng},
    stats,
    table::{DelayDistributionTable, PathConfig},
};
use rand::Rng as _;
use std::{
    collections::{BTreeMap, HashMap},
    sync::{Arc, Mutex, PoisonError},
    thread,
    time::Duration,
};
use thiserror::Error;

pub use self::{
    packet::{Packet, PacketId, PacketIdGenerator},
    switch::{EstimatedParameters, Estimator, Sketch, Switch},
};

/// The probabilistic "ground truth" the estimators are scored against.
///
/// The [`GroundTruthNetwork`] is a multigraph: every pair of nodes may be
/// connected by several parallel [`Edge`]s, each with its own normal delay
/// distribution. Every node of the topology has a [`Switch`] where packets
/// are delivered.
///
/// All the randomness of the network comes from a single, owned
/// [`SimRng`]. It sits behind a mutex so that concurrent transmissions can
/// sample delays from the same `&GroundTruthNetwork` without corrupting
/// the stream.
///
/// # Example
///
/// ```
/// use probesim_core::{GroundTruthNetwork, NodeId, PathConfig};
///
/// let network = GroundTruthNetwork::new(PathConfig::Single, Some(42));
/// let delay = network
///     .sample_edge_delay(NodeId::SOURCE, NodeId::DESTINATION)
///     .unwrap();
/// assert!(delay >= 0.0);
/// ```
pub struct GroundTruthNetwork {
    table: DelayDistributionTable,

    /// parallel edges, grouped by the pair of nodes they connect
    edges: HashMap<EdgeId, Vec<Edge>>,

    switches: BTreeMap<NodeId, Switch>,

    seed: Option<u64>,

    rng: Mutex<SimRng>,
}

/// Error returned when the topology does not connect the requested nodes.
///
/// The built-in path configurations always connect [`NodeId::SOURCE`] and
/// [`NodeId::DESTINATION`]; hitting one of these errors means the caller
/// asked for a pair that was never configured.
#[derive(Debug, Error)]
pub enum TopologyError {
    #[error("Node ({node}) Not Found")]
    NodeNotFound { node: NodeId },
    #[error("Edge ({edge}) Not Found: nodes are not directly connected")]
    EdgeNotFound { edge: EdgeId },
}

/// Error returned by [`GroundTruthNetwork::transmit_packet`].
#[derive(Debug, Error)]
pub enum TransmitError {
    #[error(transparent)]
    Topology(#[from] TopologyError),
    #[error("Sampled delay ({delay}ms) cannot be waited for")]
    DelayOutOfRange { delay: f64 },
}

impl GroundTruthNetwork {
    /// Build one of the built-in topologies.
    ///
    /// `seed` drives every delay sample of the network; `None` makes the
    /// network non reproducible.
    pub fn new(path: PathConfig, seed: Option<u64>) -> Self {
        Self::with_table(path.table(), seed)
    }

    /// Build the network described by a custom table.
    pub fn with_table(table: DelayDistributionTable, seed: Option<u64>) -> Self {
        let mut edges: HashMap<EdgeId, Vec<Edge>> = HashMap::new();
        for edge in table.edges() {
            edges.entry(edge.id()).or_default().push(*edge);
        }

        // the source and destination always exist, even in a custom table
        // that does not reference them
        let switches = [NodeId::SOURCE, NodeId::DESTINATION]
            .into_iter()
            .chain(table.nodes())
            .map(|id| (id, Switch::new(id)))
            .collect();

        Self {
            table,
            edges,
            switches,
            seed,
            rng: Mutex::new(seeded_rng(seed)),
        }
    }

    /// The seed the network was created with.
    pub fn seed(&self) -> Option<u64> {
        self.seed
    }

    /// The resolved edge parameters, for comparison with estimates.
    pub fn get_distribution_parameters(&self) -> &DelayDistributionTable {
        &self.table
    }

    /// All the parallel edges between `u` and `v` (in any direction).
    pub fn edges_between(&self, u: NodeId, v: NodeId) -> &[Edge] {
        self.edges
            .get(&EdgeId::new((u, v)))
            .map(Vec::as_slice)
            .unwrap_or_default()
    }

    pub fn switch(&self, node: NodeId) -> Option<&Switch> {
        self.switches.get(&node)
    }

    pub fn source_switch(&self) -> &Switch {
        &self.switches[&NodeId::SOURCE]
    }

    pub fn destination_switch(&self) -> &Switch {
        &self.switches[&NodeId::DESTINATION]
    }

    /// Attach a passive collaborator to the switch of `node`.
    ///
    /// # Errors
    ///
    /// [`TopologyError::NodeNotFound`] if `node` is not part of the network.
    pub fn attach_sketch(&self, node: NodeId, sketch: Arc<dyn Sketch>) -> Result<(), TopologyError> {
        let switch = self
            .switches
            .get(&node)
            .ok_or(TopologyError::NodeNotFound { node })?;
        switch.attach(sketch);
        Ok(())
    }

    /// Sample a delay, in milliseconds, between `u` and `v`.
    ///
    /// If several parallel edges connect the two nodes one of them is
    /// chosen uniformly at random, then a delay is drawn from its normal
    /// distribution. Delays are clamped at zero.
    ///
    /// # Errors
    ///
    /// - [`TopologyError::NodeNotFound`] if either node does not exist.
    /// - [`TopologyError::EdgeNotFound`] if no edge connects `u` and `v`.
    pub fn sample_edge_delay(&self, u: NodeId, v: NodeId) -> Result<f64, TopologyError> {
        for node in [u, v] {
            if !self.switches.contains_key(&node) {
                return Err(TopologyError::NodeNotFound { node });
            }
        }

        let id = EdgeId::new((u, v));
        let edges = match self.edges.get(&id) {
            Some(edges) if !edges.is_empty() => edges,
            _ => return Err(TopologyError::EdgeNotFound { edge: id }),
        };

        let mut rng = self.rng.lock().unwrap_or_else(PoisonError::into_inner);

        let edge = if edges.len() == 1 {
            &edges[0]
        } else {
            &edges[rng.gen_range(0..edges.len())]
        };

        Ok(edge.sample_delay(&mut *rng))
    }

    /// Send a packet across the network.
    ///
    /// The transit delay is sampled, recorded on the packet, and the
    /// calling thread sleeps for that long before the packet is handed to
    /// the destination switch. No lock is held while sleeping, so several
    /// transmissions can be in flight at once; their delivery order is
    /// not guaranteed to match their departure order.
    ///
    /// # Errors
    ///
    /// Fails, without sleeping or delivering anything, if the packet's
    /// source and destination are not connected or if the sampled delay
    /// does not fit in a [`Duration`].
    pub fn transmit_packet(&self, mut packet: Packet) -> Result<(), TransmitError> {
        let delay = self.sample_edge_delay(packet.source(), packet.destination())?;
        let transit = Duration::try_from_secs_f64(delay / 1_000.0)
            .map_err(|_| TransmitError::DelayOutOfRange { delay })?;
        packet.set_true_delay(delay);

        let destination = packet.destination();
        let switch = self
            .switches
            .get(&destination)
            .ok_or(TopologyError::NodeNotFound { node: destination })?;

        tracing::trace!(packet = %packet.id(), delay, "packet in transit");

        thread::sleep(transit);

        switch.receive(packet);
        Ok(())
    }

    /// The normal distribution summarising the delays between the source
    /// and the destination.
    ///
    /// With a single edge this is the edge's own distribution. With
    /// parallel edges, chosen uniformly, it is the normal with the same
    /// mean and variance as the resulting mixture.
    pub fn end_to_end_parameters(&self) -> Option<NormalParams> {
        let params: Vec<NormalParams> = self
            .edges_between(NodeId::SOURCE, NodeId::DESTINATION)
            .iter()
            .map(Edge::params)
            .collect();
        stats::moment_match(&params)
    }

    /// Score an estimate of the end-to-end delay distribution.
    ///
    /// Returns the Kullback-Leibler divergence from the ground truth
    /// ([`end_to_end_parameters`](Self::end_to_end_parameters)) to the
    /// estimated normal distribution: `0.0` for a perfect estimate, growing
    /// as the estimate drifts away. Returns `f64::INFINITY` when the
    /// divergence is undefined (no ground truth, or a zero standard
    /// deviation on one side only).
    pub fn compare_distribution_parameters(&self, mean: f64, std: f64) -> f64 {
        let Some(truth) = self.end_to_end_parameters() else {
            return f64::INFINITY;
        };
        stats::kl_divergence(truth.mean(), truth.std(), mean, std)
    }
}

impl std::fmt::Debug for GroundTruthNetwork {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("GroundTruthNetwork")
            .field("table", &self.table)
            .field("switches", &self.switches)
            .field("seed", &self.seed)
            .finish_non_exhaustive()
    }
}
