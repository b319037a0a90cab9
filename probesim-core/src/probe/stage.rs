//! The admission stages of a probe.
//!
//! Every probe goes through the stages of the simulator pipeline in
//! order. The pipeline first asks every stage to [`check`](Stage::check)
//! the probe, and only when all of them accept it are the stages
//! [`apply`](Stage::apply)'d. A rejected probe therefore never changes the
//! state of any stage.

use super::ProbeError;
use crate::{measure::DropProbability, rng::SimRng};
use std::collections::HashMap;

/// What happens to an admitted probe after a stage applied.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Outcome {
    /// Hand the probe to the next stage.
    Continue,
    /// The probe is lost: it is logged as dropped and no delay is
    /// measured. The following stages are not applied.
    Dropped,
}

/// One step of the probe admission pipeline.
pub trait Stage: Send {
    /// Short name used in logs and errors.
    fn name(&self) -> &'static str;

    /// Decide whether the probe is acceptable, without mutating anything.
    fn check(&self, departure_time: f64) -> Result<(), ProbeError>;

    /// Record the admitted probe.
    ///
    /// Only called after every stage of the pipeline accepted the probe.
    fn apply(&mut self, departure_time: f64) -> Outcome;
}

/// Rejects departure times outside `[0, max_departure_time]`.
#[derive(Debug, Clone, Copy)]
pub struct Bounds {
    max_departure_time: f64,
}

impl Bounds {
    pub fn new(max_departure_time: f64) -> Self {
        Self { max_departure_time }
    }
}

impl Stage for Bounds {
    fn name(&self) -> &'static str {
        "bounds"
    }

    fn check(&self, departure_time: f64) -> Result<(), ProbeError> {
        // NaN fails the range check
        if (0.0..=self.max_departure_time).contains(&departure_time) {
            Ok(())
        } else {
            Err(ProbeError::OutOfRange {
                departure_time,
                max_departure_time: self.max_departure_time,
            })
        }
    }

    fn apply(&mut self, _: f64) -> Outcome {
        Outcome::Continue
    }
}

/// Admits at most `max_probes_per_second` probes within each whole second
/// of departure time.
///
/// The per-second budget is never refilled: once a second is full, every
/// later probe departing within it is rejected.
#[derive(Debug, Clone)]
pub struct RateLimit {
    max_probes_per_second: u32,
    admitted: HashMap<u64, u32>,
}

impl RateLimit {
    pub fn new(max_probes_per_second: u32) -> Self {
        Self {
            max_probes_per_second,
            admitted: HashMap::new(),
        }
    }

    fn slot(departure_time: f64) -> u64 {
        departure_time.floor() as u64
    }

    /// Probes admitted so far in the second containing `departure_time`.
    pub fn admitted(&self, departure_time: f64) -> u32 {
        self.admitted
            .get(&Self::slot(departure_time))
            .copied()
            .unwrap_or(0)
    }
}

impl Stage for RateLimit {
    fn name(&self) -> &'static str {
        "rate-limit"
    }

    fn check(&self, departure_time: f64) -> Result<(), ProbeError> {
        if self.admitted(departure_time) >= self.max_probes_per_second {
            Err(ProbeError::RateLimitExceeded {
                slot: Self::slot(departure_time),
                max_probes_per_second: self.max_probes_per_second,
            })
        } else {
            Ok(())
        }
    }

    fn apply(&mut self, departure_time: f64) -> Outcome {
        *self
            .admitted
            .entry(Self::slot(departure_time))
            .or_default() += 1;
        Outcome::Continue
    }
}

/// Simulated packet loss: drops every admitted probe with a fixed
/// probability.
///
/// The stage owns its random generator, independent from the network's
/// one. Exactly one value is drawn per admitted probe.
#[derive(Debug, Clone)]
pub struct PacketDrop {
    probability: DropProbability,
    rng: SimRng,
}

impl PacketDrop {
    pub fn new(probability: DropProbability, rng: SimRng) -> Self {
        Self { probability, rng }
    }

    pub fn probability(&self) -> DropProbability {
        self.probability
    }
}

impl Stage for PacketDrop {
    fn name(&self) -> &'static str {
        "drop"
    }

    fn check(&self, _: f64) -> Result<(), ProbeError> {
        Ok(())
    }

    fn apply(&mut self, departure_time: f64) -> Outcome {
        if self.probability.should_drop(&mut self.rng) {
            tracing::debug!(departure_time, probability = %self.probability, "probe dropped");
            Outcome::Dropped
        } else {
            Outcome::Continue
        }
    }
}
