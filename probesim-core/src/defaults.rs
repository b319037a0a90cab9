use crate::measure::DropProbability;
use std::time::Duration;

/// Default upper bound of a probe departure time, in seconds.
///
/// Probes may be sent at any time in `[0, DEFAULT_MAX_DEPARTURE_TIME]`.
///
/// ```
/// # use probesim_core::defaults::*;
/// assert_eq!(DEFAULT_MAX_DEPARTURE_TIME, 100.0);
/// ```
pub const DEFAULT_MAX_DEPARTURE_TIME: f64 = 100.0;

/// Default number of probes admitted within one second of departure time.
///
/// The budget of a second is never refilled during a simulation run.
///
/// ```
/// # use probesim_core::defaults::*;
/// assert_eq!(DEFAULT_MAX_PROBES_PER_SECOND, 10);
/// ```
pub const DEFAULT_MAX_PROBES_PER_SECOND: u32 = 10;

/// Default drop probability of the lossy probe simulator
/// ([`Evolution::V1`]).
///
/// ```
/// # use probesim_core::defaults::*;
/// assert_eq!(DEFAULT_DROP_PROBABILITY.to_string(), "10%");
/// ```
///
/// [`Evolution::V1`]: crate::probe::Evolution::V1
pub const DEFAULT_DROP_PROBABILITY: DropProbability = DropProbability::from_rate(0.1);

/// Default wall-clock duration of a background traffic run.
pub const DEFAULT_TRAFFIC_DURATION: Duration = Duration::from_secs(10);

/// Default mean time between two background packets.
pub const DEFAULT_INTERARRIVAL: Duration = Duration::from_millis(10);
