//! Deterministic building blocks of the probe simulator.
//!
//! - [`GroundTruthNetwork`]: the probabilistic network every delay is
//!   sampled from;
//! - [`probe::ActiveProbeSimulator`]: caller-timed probing with bounds,
//!   rate limiting, packet loss and measurement caching;
//! - [`Switch`] and [`Sketch`]: the hook passive collaborators use to
//!   observe delivered packets.
//!
//! The threaded traffic generator lives in the `probesim` crate.

pub mod defaults;
mod edge;
mod measure;
pub mod network;
mod node;
pub mod probe;
mod rng;
pub mod stats;
mod table;
mod time;

pub use self::{
    edge::{Edge, EdgeId},
    measure::{
        DropProbability, DropProbabilityError, DropProbabilityParseError, NormalParams,
        ParamsError,
    },
    network::{
        EstimatedParameters, Estimator, GroundTruthNetwork, Packet, PacketId, PacketIdGenerator,
        Sketch, Switch, TopologyError, TransmitError,
    },
    node::NodeId,
    rng::{SimRng, seeded_rng},
    table::{DelayDistributionTable, PathConfig},
    time::HumanDuration,
};
