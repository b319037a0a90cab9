use probesim_core::{EstimatedParameters, Estimator, Packet, PacketId, Sketch};
use std::{
    sync::{Condvar, Mutex, PoisonError},
    time::{Duration, Instant},
};

/// A passive collaborator that keeps every delivered packet's true delay.
///
/// Attach it to the destination switch to get the raw samples the
/// ground truth network produced. As an [`Estimator`] it reports the
/// sample mean and standard deviation.
///
/// ```
/// use probesim::{Recorder, probesim_core::Estimator as _};
///
/// let recorder = Recorder::new();
/// assert!(recorder.is_empty());
/// assert_eq!(recorder.estimate_parameters(), None);
/// ```
#[derive(Debug, Default)]
pub struct Recorder {
    samples: Mutex<Vec<(PacketId, f64)>>,
    arrived: Condvar,
}

impl Recorder {
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of packets recorded so far.
    pub fn len(&self) -> usize {
        self.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// The recorded true delays, in milliseconds, in arrival order.
    pub fn delays(&self) -> Vec<f64> {
        self.lock().iter().map(|(_, delay)| *delay).collect()
    }

    /// The identifiers of the recorded packets, in arrival order.
    pub fn packets(&self) -> Vec<PacketId> {
        self.lock().iter().map(|(id, _)| *id).collect()
    }

    /// Block until at least `count` packets were recorded or `timeout`
    /// elapsed. Returns `true` if the count was reached.
    pub fn wait_for(&self, count: usize, timeout: Duration) -> bool {
        let deadline = Instant::now() + timeout;
        let mut samples = self.lock();

        while samples.len() < count {
            let remaining = deadline.saturating_duration_since(Instant::now());
            if remaining.is_zero() {
                return false;
            }
            samples = self
                .arrived
                .wait_timeout(samples, remaining)
                .unwrap_or_else(PoisonError::into_inner)
                .0;
        }
        true
    }

    fn lock(&self) -> std::sync::MutexGuard<'_, Vec<(PacketId, f64)>> {
        self.samples.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

impl Sketch for Recorder {
    fn receive(&self, packet: Packet) {
        let Some(delay) = packet.true_delay() else {
            tracing::warn!(packet = %packet.id(), "packet delivered without a true delay");
            return;
        };

        self.lock().push((packet.id(), delay));
        self.arrived.notify_all();
    }
}

impl Estimator for Recorder {
    fn estimate_parameters(&self) -> Option<EstimatedParameters> {
        let samples = self.lock();
        if samples.len() < 2 {
            return None;
        }

        let n = samples.len() as f64;
        let mean = samples.iter().map(|(_, delay)| delay).sum::<f64>() / n;
        let variance = samples
            .iter()
            .map(|(_, delay)| (delay - mean) * (delay - mean))
            .sum::<f64>()
            / (n - 1.0);

        Some(EstimatedParameters {
            estimated_mean: mean,
            estimated_std: variance.sqrt(),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use probesim_core::{NodeId, PacketIdGenerator};
    use std::{sync::Arc, thread};

    fn delivered(generator: &PacketIdGenerator, delay: f64) -> Packet {
        let mut packet = Packet::new(generator, NodeId::SOURCE, NodeId::DESTINATION);
        packet.set_true_delay(delay);
        packet
    }

    #[test]
    fn records_true_delays() {
        let generator = PacketIdGenerator::new();
        let recorder = Recorder::new();

        recorder.receive(delivered(&generator, 9.0));
        recorder.receive(delivered(&generator, 11.0));

        assert_eq!(recorder.delays(), vec![9.0, 11.0]);
        assert_eq!(recorder.packets().len(), 2);

        let estimate = recorder.estimate_parameters().unwrap();
        assert_eq!(estimate.estimated_mean, 10.0);
        assert!((estimate.estimated_std - 2f64.sqrt()).abs() < 1e-12);
    }

    #[test]
    fn ignores_packets_without_delay() {
        let generator = PacketIdGenerator::new();
        let recorder = Recorder::new();

        recorder.receive(Packet::new(&generator, NodeId::SOURCE, NodeId::DESTINATION));
        assert!(recorder.is_empty());
    }

    #[test]
    fn wait_for_packets() {
        let generator = PacketIdGenerator::new();
        let recorder = Arc::new(Recorder::new());

        let sender = {
            let recorder = Arc::clone(&recorder);
            thread::spawn(move || {
                for delay in [1.0, 2.0, 3.0] {
                    thread::sleep(Duration::from_millis(5));
                    recorder.receive(delivered(&generator, delay));
                }
            })
        };

        assert!(recorder.wait_for(3, Duration::from_secs(5)));
        sender.join().unwrap();
        assert!(!recorder.wait_for(4, Duration::from_millis(10)));
    }
}
