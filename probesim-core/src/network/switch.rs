use crate::{network::Packet, node::NodeId};
use std::sync::{
    Arc, PoisonError, RwLock,
    atomic::{AtomicU64, Ordering},
};

/// A passive measurement collaborator attached to a [`Switch`].
///
/// The switch hands every packet it receives to the sketch. Packets may
/// arrive concurrently from several in-flight transmissions and in any
/// order, so implementations deal with their own synchronisation.
pub trait Sketch: Send + Sync {
    fn receive(&self, packet: Packet);
}

/// Delay distribution parameters inferred by an [`Estimator`], in
/// milliseconds.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct EstimatedParameters {
    pub estimated_mean: f64,
    pub estimated_std: f64,
}

/// A [`Sketch`] able to summarise what it has seen as a normal
/// distribution.
///
/// Scores are obtained by feeding the estimate to
/// [`GroundTruthNetwork::compare_distribution_parameters`].
///
/// [`GroundTruthNetwork::compare_distribution_parameters`]: crate::network::GroundTruthNetwork::compare_distribution_parameters
pub trait Estimator: Sketch {
    /// `None` until enough samples were received.
    fn estimate_parameters(&self) -> Option<EstimatedParameters>;
}

/// The network boundary at a node.
///
/// A switch only knows its identity and an optional forwarding hook;
/// all estimation logic lives in the attached [`Sketch`]. Packets received
/// while nothing is attached are counted and discarded.
pub struct Switch {
    id: NodeId,
    sketch: RwLock<Option<Arc<dyn Sketch>>>,
    received: AtomicU64,
}

impl Switch {
    pub fn new(id: NodeId) -> Self {
        Self {
            id,
            sketch: RwLock::new(None),
            received: AtomicU64::new(0),
        }
    }

    pub fn id(&self) -> NodeId {
        self.id
    }

    /// Attach the collaborator every received packet is forwarded to.
    ///
    /// Replaces any previously attached sketch.
    pub fn attach(&self, sketch: Arc<dyn Sketch>) {
        *self.sketch.write().unwrap_or_else(PoisonError::into_inner) = Some(sketch);
    }

    /// Remove the attached collaborator, returning it.
    pub fn detach(&self) -> Option<Arc<dyn Sketch>> {
        self.sketch
            .write()
            .unwrap_or_else(PoisonError::into_inner)
            .take()
    }

    pub fn is_attached(&self) -> bool {
        self.sketch
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .is_some()
    }

    /// Deliver a packet to this switch.
    pub fn receive(&self, packet: Packet) {
        self.received.fetch_add(1, Ordering::Relaxed);

        // release the lock before calling into the sketch
        let sketch = self
            .sketch
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .clone();

        match sketch {
            Some(sketch) => sketch.receive(packet),
            None => {
                tracing::trace!(switch = %self.id, packet = %packet.id(), "no sketch attached, discarding packet");
            }
        }
    }

    /// Number of packets received since creation.
    pub fn received(&self) -> u64 {
        self.received.load(Ordering::Relaxed)
    }
}

impl std::fmt::Debug for Switch {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Switch")
            .field("id", &self.id)
            .field("attached", &self.is_attached())
            .field("received", &self.received())
            .finish()
    }
}
