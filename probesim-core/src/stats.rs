//! Scoring and summary statistics.
//!
//! [`kl_divergence`] scores an estimated delay distribution against the
//! ground truth and [`ProbeStats`] is a point-in-time snapshot of an
//! [`ActiveProbeSimulator`](crate::probe::ActiveProbeSimulator) run.
//! Obtain one via [`ActiveProbeSimulator::stats`](crate::probe::ActiveProbeSimulator::stats).

use crate::measure::NormalParams;

/// Snapshot of an active probing run.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ProbeStats {
    /// Events in the log, measured and dropped.
    pub probes: usize,
    /// Probes that came back with a delay.
    pub measured: usize,
    /// Probes lost in the network.
    pub dropped: usize,
    /// Distinct departure times holding a cached delay.
    pub cached_delays: usize,
    /// One-second slots that admitted at least one probe.
    pub active_slots: usize,
    /// Mean of the measured delays, in milliseconds.
    pub mean_delay: Option<f64>,
    /// Sample standard deviation of the measured delays, in milliseconds.
    pub std_delay: Option<f64>,
}

impl ProbeStats {
    /// Fraction of the logged probes that were dropped.
    pub fn drop_rate(&self) -> f64 {
        if self.probes == 0 {
            0.0
        } else {
            self.dropped as f64 / self.probes as f64
        }
    }
}

/// Kullback-Leibler divergence `KL(P || Q)` between two normal
/// distributions `P = N(mean_p, std_p)` and `Q = N(mean_q, std_q)`.
///
/// Degenerate distributions (zero standard deviation) are point masses:
/// two identical point masses score `0.0`, anything else involving a point
/// mass scores `f64::INFINITY`.
///
/// ```
/// use probesim_core::stats::kl_divergence;
///
/// assert_eq!(kl_divergence(10.0, 2.0, 10.0, 2.0), 0.0);
/// assert!(kl_divergence(10.0, 2.0, 11.0, 2.0) > 0.0);
/// assert_eq!(kl_divergence(10.0, 0.0, 10.0, 2.0), f64::INFINITY);
/// ```
pub fn kl_divergence(mean_p: f64, std_p: f64, mean_q: f64, std_q: f64) -> f64 {
    if std_p == 0.0 || std_q == 0.0 {
        return if std_p == std_q && mean_p == mean_q {
            0.0
        } else {
            f64::INFINITY
        };
    }

    let var_p = std_p * std_p;
    let var_q = std_q * std_q;
    let diff = mean_p - mean_q;

    (std_q / std_p).ln() + (var_p + diff * diff) / (2.0 * var_q) - 0.5
}

/// The normal distribution with the same mean and variance as an
/// equal-weight mixture of `components`.
///
/// Returns `None` for an empty slice.
pub fn moment_match(components: &[NormalParams]) -> Option<NormalParams> {
    match components {
        [] => None,
        [single] => Some(*single),
        _ => {
            let n = components.len() as f64;
            let mean = components.iter().map(NormalParams::mean).sum::<f64>() / n;
            let second_moment = components
                .iter()
                .map(|c| c.variance() + c.mean() * c.mean())
                .sum::<f64>()
                / n;
            let variance = (second_moment - mean * mean).max(0.0);
            NormalParams::new(mean, variance.sqrt()).ok()
        }
    }
}

/// Mean and sample standard deviation of `samples`.
///
/// The standard deviation needs at least two samples.
pub(crate) fn mean_std(samples: impl IntoIterator<Item = f64>) -> (Option<f64>, Option<f64>) {
    let samples: Vec<f64> = samples.into_iter().collect();
    if samples.is_empty() {
        return (None, None);
    }

    let n = samples.len() as f64;
    let mean = samples.iter().sum::<f64>() / n;
    let std = (samples.len() > 1).then(|| {
        let variance = samples
            .iter()
            .map(|sample| (sample - mean) * (sample - mean))
            .sum::<f64>()
            / (n - 1.0);
        variance.sqrt()
    });
    (Some(mean), std)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn params(mean: f64, std: f64) -> NormalParams {
        NormalParams::new(mean, std).unwrap()
    }

    #[test]
    fn kl_is_zero_on_identity() {
        assert_eq!(kl_divergence(10.0, 2.0, 10.0, 2.0), 0.0);
        assert_eq!(kl_divergence(0.0, 0.0, 0.0, 0.0), 0.0);
    }

    #[test]
    fn kl_known_value() {
        // KL(N(0,1) || N(1,2)) = ln 2 + (1 + 1) / 8 - 1/2
        let expected = 2f64.ln() + 0.25 - 0.5;
        assert!((kl_divergence(0.0, 1.0, 1.0, 2.0) - expected).abs() < 1e-12);
    }

    #[test]
    fn kl_is_asymmetric_and_positive() {
        let forward = kl_divergence(10.0, 2.0, 15.0, 3.0);
        let backward = kl_divergence(15.0, 3.0, 10.0, 2.0);
        assert!(forward > 0.0);
        assert!(backward > 0.0);
        assert!((forward - backward).abs() > 1e-6);
    }

    #[test]
    fn kl_point_masses() {
        assert_eq!(kl_divergence(1.0, 0.0, 2.0, 0.0), f64::INFINITY);
        assert_eq!(kl_divergence(1.0, 1.0, 1.0, 0.0), f64::INFINITY);
    }

    #[test]
    fn moment_match_single_is_identity() {
        assert_eq!(moment_match(&[params(10.0, 2.0)]), Some(params(10.0, 2.0)));
        assert_eq!(moment_match(&[]), None);
    }

    #[test]
    fn moment_match_mixture() {
        // mean 12.5, E[X^2] = ((4 + 100) + (9 + 225)) / 2 = 169
        let matched = moment_match(&[params(10.0, 2.0), params(15.0, 3.0)]).unwrap();
        assert!((matched.mean() - 12.5).abs() < 1e-12);
        assert!((matched.variance() - (169.0 - 156.25)).abs() < 1e-9);
    }

    #[test]
    fn sample_mean_std() {
        assert_eq!(mean_std(Vec::<f64>::new()), (None, None));
        assert_eq!(mean_std([4.0]), (Some(4.0), None));

        let (mean, std) = mean_std([2.0, 4.0, 4.0, 4.0, 5.0, 5.0, 7.0, 9.0]);
        assert_eq!(mean, Some(5.0));
        // sample variance 32 / 7
        assert!((std.unwrap() - (32.0f64 / 7.0).sqrt()).abs() < 1e-12);
    }

    #[test]
    fn large_delays_keep_their_spread() {
        // sample variance of offsets 0, 1, 2 is 1 whatever the base
        let (mean, std) = mean_std([1e9, 1e9 + 1.0, 1e9 + 2.0]);
        assert_eq!(mean, Some(1e9 + 1.0));
        assert!((std.unwrap() - 1.0).abs() < 1e-9);
    }

    #[test]
    fn drop_rate() {
        let stats = ProbeStats {
            probes: 10,
            dropped: 1,
            ..Default::default()
        };
        assert!((stats.drop_rate() - 0.1).abs() < 1e-12);
        assert_eq!(ProbeStats::default().drop_rate(), 0.0);
    }
}
