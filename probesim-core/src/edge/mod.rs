mod id;

use crate::{measure::NormalParams, node::NodeId};
use rand::Rng;

pub use self::id::EdgeId;

/// One probabilistic connection between two nodes.
///
/// The delay experienced on the edge follows the normal distribution
/// described by its [`NormalParams`], truncated at zero. Two nodes may be
/// connected by several parallel edges; the [`GroundTruthNetwork`] picks
/// one of them uniformly for every sample.
///
/// [`GroundTruthNetwork`]: crate::network::GroundTruthNetwork
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Edge {
    id: EdgeId,
    params: NormalParams,
}

impl Edge {
    pub fn new(a: NodeId, b: NodeId, params: NormalParams) -> Self {
        Self {
            id: EdgeId::new((a, b)),
            params,
        }
    }

    pub fn id(&self) -> EdgeId {
        self.id
    }

    pub fn params(&self) -> NormalParams {
        self.params
    }

    /// Draw a transit delay, in milliseconds, for this edge.
    ///
    /// Delays are physical quantities: the result is never negative.
    pub fn sample_delay<R: Rng + ?Sized>(&self, rng: &mut R) -> f64 {
        self.params.sample(rng)
    }
}
