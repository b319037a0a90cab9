use crate::network::TopologyError;
use thiserror::Error;

/// Error returned when [`ActiveProbeSimulator::send_probe_at`] rejects a
/// probe.
///
/// A rejected probe leaves no trace: it is not logged, it does not use
/// any of the rate limit budget and no randomness is consumed.
///
/// A dropped probe is not an error, see [`Probe::Dropped`].
///
/// [`ActiveProbeSimulator::send_probe_at`]: super::ActiveProbeSimulator::send_probe_at
/// [`Probe::Dropped`]: super::Probe::Dropped
#[derive(Debug, Error)]
pub enum ProbeError {
    #[error("Departure time ({departure_time}s) must be between 0 and {max_departure_time} seconds")]
    OutOfRange {
        departure_time: f64,
        max_departure_time: f64,
    },
    #[error(
        "Rate limit exceeded for second {slot}: max {max_probes_per_second} probe(s) per second allowed"
    )]
    RateLimitExceeded {
        slot: u64,
        max_probes_per_second: u32,
    },
    #[error("Probe rejected by stage `{stage}': {reason}")]
    Rejected { stage: &'static str, reason: String },
    #[error(transparent)]
    Topology(#[from] TopologyError),
}

/// Error returned by [`ActiveProbeSimulatorBuilder::build`].
///
/// [`ActiveProbeSimulatorBuilder::build`]: super::ActiveProbeSimulatorBuilder::build
#[derive(Debug, Error)]
pub enum BuildError {
    #[error("Max departure time must be finite and >= 0, got {0}")]
    InvalidMaxDepartureTime(f64),
    #[error("Max probes per second must be at least 1")]
    ZeroRateLimit,
    #[error("Probes cannot reach the destination")]
    Unreachable(#[source] TopologyError),
}
