//! Active probing of the ground truth network.
//!
//! The [`ActiveProbeSimulator`] sends probes from [`NodeId::SOURCE`] to
//! [`NodeId::DESTINATION`] at caller chosen departure times and reports
//! the delay each of them experienced. Probes go through a pipeline of
//! [`Stage`]s before being measured:
//!
//! 1. [`Bounds`]: the departure time must be within
//!    `[0, max_departure_time]`;
//! 2. [`RateLimit`]: at most `max_probes_per_second` probes per whole
//!    second of departure time;
//! 3. [`PacketDrop`] ([`Evolution::V1`] only): the probe may be lost.
//!
//! A probe that passes every stage is measured: two probes departing at
//! the very same time see the same delay.
//!
//! ```
//! use probesim_core::{
//!     PathConfig,
//!     probe::{ActiveProbeSimulator, Evolution, Probe, ProbeError},
//! };
//!
//! let mut simulator = ActiveProbeSimulator::builder()
//!     .set_path(PathConfig::Single)
//!     .set_seed(42)
//!     .set_evolution(Evolution::V0)
//!     .build()
//!     .unwrap();
//!
//! let Probe::Measured(delay) = simulator.send_probe_at(1.0).unwrap() else {
//!     unreachable!("v0 never drops probes")
//! };
//! assert!(delay >= 0.0);
//!
//! assert!(matches!(
//!     simulator.send_probe_at(101.0),
//!     Err(ProbeError::OutOfRange { .. })
//! ));
//! ```

mod cache;
mod error;
mod event;
mod stage;

pub use self::{
    error::{BuildError, ProbeError},
    event::ProbeEvent,
    stage::{Bounds, Outcome, PacketDrop, RateLimit, Stage},
};

use self::cache::DelayCache;
use crate::{
    defaults::{DEFAULT_DROP_PROBABILITY, DEFAULT_MAX_DEPARTURE_TIME, DEFAULT_MAX_PROBES_PER_SECOND},
    edge::EdgeId,
    measure::DropProbability,
    network::{GroundTruthNetwork, TopologyError},
    node::NodeId,
    rng::seeded_rng,
    stats::{self, ProbeStats},
    table::PathConfig,
};
use anyhow::anyhow;
use std::{collections::HashSet, fmt, str::FromStr, sync::Arc};

/// The result of an admitted probe.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Probe {
    /// The probe came back after this many milliseconds.
    Measured(f64),
    /// The probe was lost in the network.
    Dropped,
}

/// The successive versions of the active prober.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Evolution {
    /// Bounds and rate limit, no packet loss.
    #[default]
    V0,
    /// [`V0`](Self::V0) plus random packet loss.
    V1,
}

/// Probes a [`GroundTruthNetwork`] and records what happened.
///
/// Obtained via [`ActiveProbeSimulator::builder`], or the
/// [`v0`](Self::v0) and [`v1`](Self::v1) shortcuts. The simulator is
/// mutated by every probe; wrap it in a `Mutex` to share it between
/// threads. The network itself may be shared with other simulators.
pub struct ActiveProbeSimulator {
    network: Arc<GroundTruthNetwork>,
    evolution: Evolution,
    max_departure_time: f64,
    max_probes_per_second: u32,
    stages: Vec<Box<dyn Stage>>,
    cache: DelayCache,
    events: Vec<ProbeEvent>,
}

/// Builder for an [`ActiveProbeSimulator`].
///
/// Every setting has a default: a fresh [`PathConfig::Single`] network,
/// [`Evolution::V0`], the bounds of [`crate::defaults`], and no seed.
pub struct ActiveProbeSimulatorBuilder {
    network: Option<Arc<GroundTruthNetwork>>,
    path: PathConfig,
    seed: Option<u64>,
    evolution: Evolution,
    drop_probability: DropProbability,
    max_departure_time: f64,
    max_probes_per_second: u32,
    extra_stages: Vec<Box<dyn Stage>>,
}

impl Probe {
    pub fn delay(&self) -> Option<f64> {
        match self {
            Self::Measured(delay) => Some(*delay),
            Self::Dropped => None,
        }
    }

    pub fn is_dropped(&self) -> bool {
        matches!(self, Self::Dropped)
    }
}

impl ActiveProbeSimulatorBuilder {
    fn new() -> Self {
        Self {
            network: None,
            path: PathConfig::default(),
            seed: None,
            evolution: Evolution::default(),
            drop_probability: DEFAULT_DROP_PROBABILITY,
            max_departure_time: DEFAULT_MAX_DEPARTURE_TIME,
            max_probes_per_second: DEFAULT_MAX_PROBES_PER_SECOND,
            extra_stages: Vec::new(),
        }
    }

    /// Topology of the network created at build time.
    ///
    /// Ignored if a network is given with [`set_network`](Self::set_network).
    pub fn set_path(mut self, path: PathConfig) -> Self {
        self.path = path;
        self
    }

    /// Seed of both the network and the drop stage.
    pub fn set_seed(mut self, seed: u64) -> Self {
        self.seed = Some(seed);
        self
    }

    /// Probe an existing network instead of creating one.
    ///
    /// Unless a seed is set, the drop stage is seeded with the network's
    /// seed.
    pub fn set_network(mut self, network: Arc<GroundTruthNetwork>) -> Self {
        self.network = Some(network);
        self
    }

    pub fn set_evolution(mut self, evolution: Evolution) -> Self {
        self.evolution = evolution;
        self
    }

    /// Loss rate of [`Evolution::V1`], 10% by default.
    pub fn set_drop_probability(mut self, drop_probability: DropProbability) -> Self {
        self.drop_probability = drop_probability;
        self
    }

    pub fn set_max_departure_time(mut self, max_departure_time: f64) -> Self {
        self.max_departure_time = max_departure_time;
        self
    }

    pub fn set_max_probes_per_second(mut self, max_probes_per_second: u32) -> Self {
        self.max_probes_per_second = max_probes_per_second;
        self
    }

    /// Append a stage after the stages of the evolution.
    pub fn add_stage(mut self, stage: impl Stage + 'static) -> Self {
        self.extra_stages.push(Box::new(stage));
        self
    }

    /// # Errors
    ///
    /// - [`BuildError::InvalidMaxDepartureTime`] if the bound is negative
    ///   or not finite.
    /// - [`BuildError::ZeroRateLimit`] if no probe could ever be admitted.
    /// - [`BuildError::Unreachable`] if the network has no edge between
    ///   the source and the destination.
    pub fn build(mut self) -> Result<ActiveProbeSimulator, BuildError> {
        if !(self.max_departure_time.is_finite() && self.max_departure_time >= 0.0) {
            return Err(BuildError::InvalidMaxDepartureTime(self.max_departure_time));
        }
        if self.max_probes_per_second == 0 {
            return Err(BuildError::ZeroRateLimit);
        }

        let network = match self.network.take() {
            Some(network) => network,
            None => Arc::new(GroundTruthNetwork::new(self.path, self.seed)),
        };
        if network
            .edges_between(NodeId::SOURCE, NodeId::DESTINATION)
            .is_empty()
        {
            return Err(BuildError::Unreachable(TopologyError::EdgeNotFound {
                edge: EdgeId::new((NodeId::SOURCE, NodeId::DESTINATION)),
            }));
        }

        Ok(self.assemble(network))
    }

    fn assemble(self, network: Arc<GroundTruthNetwork>) -> ActiveProbeSimulator {
        let mut stages: Vec<Box<dyn Stage>> = vec![
            Box::new(Bounds::new(self.max_departure_time)),
            Box::new(RateLimit::new(self.max_probes_per_second)),
        ];
        if self.evolution == Evolution::V1 {
            let rng = seeded_rng(self.seed.or(network.seed()));
            stages.push(Box::new(PacketDrop::new(self.drop_probability, rng)));
        }
        stages.extend(self.extra_stages);

        ActiveProbeSimulator {
            network,
            evolution: self.evolution,
            max_departure_time: self.max_departure_time,
            max_probes_per_second: self.max_probes_per_second,
            stages,
            cache: DelayCache::default(),
            events: Vec::new(),
        }
    }
}

impl ActiveProbeSimulator {
    pub fn builder() -> ActiveProbeSimulatorBuilder {
        ActiveProbeSimulatorBuilder::new()
    }

    /// Lossless simulator with the default bounds.
    pub fn v0(path: PathConfig, seed: Option<u64>) -> Self {
        Self::with_defaults(Evolution::V0, path, seed)
    }

    /// Lossy simulator dropping 10% of the probes, with the default bounds.
    pub fn v1(path: PathConfig, seed: Option<u64>) -> Self {
        Self::with_defaults(Evolution::V1, path, seed)
    }

    fn with_defaults(evolution: Evolution, path: PathConfig, seed: Option<u64>) -> Self {
        let builder = ActiveProbeSimulatorBuilder {
            seed,
            evolution,
            ..ActiveProbeSimulatorBuilder::new()
        };
        builder.assemble(Arc::new(GroundTruthNetwork::new(path, seed)))
    }

    /// Send a probe at `departure_time` (in seconds).
    ///
    /// # Errors
    ///
    /// - [`ProbeError::OutOfRange`] if the departure time is negative,
    ///   greater than the maximum departure time or NaN.
    /// - [`ProbeError::RateLimitExceeded`] if the second of the departure
    ///   time already admitted its maximum number of probes.
    /// - [`ProbeError::Rejected`] from a custom stage.
    ///
    /// Rejected probes leave the simulator unchanged.
    pub fn send_probe_at(&mut self, departure_time: f64) -> Result<Probe, ProbeError> {
        for stage in &self.stages {
            stage.check(departure_time)?;
        }

        for stage in &mut self.stages {
            if stage.apply(departure_time) == Outcome::Dropped {
                self.events.push(ProbeEvent::dropped(departure_time));
                return Ok(Probe::Dropped);
            }
        }

        let network = &self.network;
        let delay = self.cache.get_or_try_insert_with(departure_time, || {
            network.sample_edge_delay(NodeId::SOURCE, NodeId::DESTINATION)
        })?;

        self.events
            .push(ProbeEvent::measured(departure_time, delay));
        Ok(Probe::Measured(delay))
    }

    /// Every admitted probe, in the order they were sent.
    pub fn events(&self) -> &[ProbeEvent] {
        &self.events
    }

    /// The delay measured for probes departing at `departure_time`, if any.
    pub fn cached_delay(&self, departure_time: f64) -> Option<f64> {
        self.cache.get(departure_time)
    }

    /// Number of distinct departure times with a measured delay.
    pub fn cache_len(&self) -> usize {
        self.cache.len()
    }

    pub fn network(&self) -> &Arc<GroundTruthNetwork> {
        &self.network
    }

    pub fn evolution(&self) -> Evolution {
        self.evolution
    }

    pub fn max_departure_time(&self) -> f64 {
        self.max_departure_time
    }

    pub fn max_probes_per_second(&self) -> u32 {
        self.max_probes_per_second
    }

    /// Summary of the run so far.
    pub fn stats(&self) -> ProbeStats {
        let dropped = self.events.iter().filter(|e| e.is_dropped()).count();
        let slots: HashSet<u64> = self
            .events
            .iter()
            .map(|e| e.departure_time.floor() as u64)
            .collect();
        let (mean_delay, std_delay) =
            stats::mean_std(self.events.iter().filter_map(|e| e.delay));

        ProbeStats {
            probes: self.events.len(),
            measured: self.events.len() - dropped,
            dropped,
            cached_delays: self.cache.len(),
            active_slots: slots.len(),
            mean_delay,
            std_delay,
        }
    }
}

impl fmt::Debug for ActiveProbeSimulator {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let stages: Vec<&str> = self.stages.iter().map(|stage| stage.name()).collect();
        f.debug_struct("ActiveProbeSimulator")
            .field("evolution", &self.evolution)
            .field("stages", &stages)
            .field("events", &self.events.len())
            .field("cached_delays", &self.cache.len())
            .finish_non_exhaustive()
    }
}

impl FromStr for Evolution {
    type Err = anyhow::Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "0" | "v0" => Ok(Self::V0),
            "1" | "v1" => Ok(Self::V1),
            other => Err(anyhow!("Unknown evolution `{other}', expected `v0' or `v1'")),
        }
    }
}

impl fmt::Display for Evolution {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::V0 => f.write_str("v0"),
            Self::V1 => f.write_str("v1"),
        }
    }
}
