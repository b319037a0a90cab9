use crate::dispatch::{Dispatcher, Unbounded, WorkerPool};
use anyhow::{Context as _, Result, anyhow, bail};
use probesim_core::{
    DropProbability, GroundTruthNetwork, NodeId, Packet, PacketIdGenerator, PathConfig, SimRng,
    Sketch, defaults::{DEFAULT_INTERARRIVAL, DEFAULT_TRAFFIC_DURATION}, seeded_rng,
};
use rand_distr::{Distribution as _, Exp};
use std::{
    sync::{
        Arc,
        atomic::{AtomicU64, Ordering},
    },
    thread,
    time::{Duration, Instant},
};

/// ChaCha stream of the inter-arrival generator; stream `0` drives the
/// background drop decisions.
const INTERARRIVAL_STREAM: u64 = 1;

/// Runs background traffic through a [`GroundTruthNetwork`].
///
/// Every background packet crosses the network in its own flow, handed to
/// the context's [`Dispatcher`], so packets overlap in time the way they
/// would on a real link. Make sure to call [`SimContext::shutdown`] to wait
/// for the flows still in flight.
pub struct SimContext {
    network: Arc<GroundTruthNetwork>,
    dispatcher: Arc<dyn Dispatcher>,
    packet_ids: PacketIdGenerator,

    /// background loss, if any, and the generator deciding it
    drop: Option<(DropProbability, SimRng)>,
    interarrival: SimRng,

    delivered: Arc<AtomicU64>,
    failed: Arc<AtomicU64>,
}

/// Builder for a [`SimContext`].
///
/// Obtained via [`SimContext::builder`]. Call [`build`](Self::build) to
/// create the context.
pub struct SimContextBuilder {
    network: Option<Arc<GroundTruthNetwork>>,
    path: PathConfig,
    seed: Option<u64>,
    drop_probability: Option<DropProbability>,
    workers: Option<usize>,
    dispatcher: Option<Arc<dyn Dispatcher>>,
}

/// What a call to [`SimContext::simulate_traffic`] did.
///
/// Flows may still be in flight when the report is returned: see
/// [`SimContext::delivered`] for the packets that actually arrived.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct TrafficReport {
    /// Packets created by the generator.
    pub generated: u64,
    /// Packets handed to the dispatcher.
    pub dispatched: u64,
    /// Packets lost before entering the network.
    pub dropped: u64,
    /// Wall-clock duration of the run.
    pub elapsed: Duration,
}

impl SimContextBuilder {
    fn new() -> Self {
        Self {
            network: None,
            path: PathConfig::default(),
            seed: None,
            drop_probability: None,
            workers: None,
            dispatcher: None,
        }
    }

    /// Ignored if a network is given with [`set_network`](Self::set_network).
    pub fn set_path(mut self, path: PathConfig) -> Self {
        self.path = path;
        self
    }

    /// Seed of the network and of the traffic generator.
    pub fn set_seed(mut self, seed: u64) -> Self {
        self.seed = Some(seed);
        self
    }

    pub fn set_network(mut self, network: Arc<GroundTruthNetwork>) -> Self {
        self.network = Some(network);
        self
    }

    /// Lose background packets before they enter the network.
    pub fn set_drop_probability(mut self, drop_probability: DropProbability) -> Self {
        self.drop_probability = Some(drop_probability);
        self
    }

    /// Run the flows on a [`WorkerPool`] of `workers` threads instead of a
    /// thread per flow.
    pub fn set_workers(mut self, workers: usize) -> Self {
        self.workers = Some(workers);
        self
    }

    /// Run the flows on a custom dispatcher. Takes precedence over
    /// [`set_workers`](Self::set_workers).
    pub fn set_dispatcher(mut self, dispatcher: Arc<dyn Dispatcher>) -> Self {
        self.dispatcher = Some(dispatcher);
        self
    }

    pub fn build(self) -> Result<SimContext> {
        let Self {
            network,
            path,
            seed,
            drop_probability,
            workers,
            dispatcher,
        } = self;

        let network = network.unwrap_or_else(|| Arc::new(GroundTruthNetwork::new(path, seed)));
        let seed = seed.or(network.seed());

        let dispatcher: Arc<dyn Dispatcher> = match (dispatcher, workers) {
            (Some(dispatcher), _) => dispatcher,
            (None, Some(workers)) => {
                Arc::new(WorkerPool::new(workers).context("Failed to start the worker pool")?)
            }
            (None, None) => Arc::new(Unbounded::new()),
        };

        let mut interarrival = seeded_rng(seed);
        interarrival.set_stream(INTERARRIVAL_STREAM);

        Ok(SimContext {
            network,
            dispatcher,
            packet_ids: PacketIdGenerator::new(),
            drop: drop_probability.map(|p| (p, seeded_rng(seed))),
            interarrival,
            delivered: Arc::new(AtomicU64::new(0)),
            failed: Arc::new(AtomicU64::new(0)),
        })
    }
}

impl SimContext {
    pub fn builder() -> SimContextBuilder {
        SimContextBuilder::new()
    }

    /// A context over a fresh network, one thread per flow.
    pub fn new(path: PathConfig, seed: Option<u64>) -> Result<Self> {
        let builder = Self::builder().set_path(path);
        match seed {
            Some(seed) => builder.set_seed(seed),
            None => builder,
        }
        .build()
    }

    pub fn network(&self) -> &Arc<GroundTruthNetwork> {
        &self.network
    }

    /// Attach a passive collaborator to the switch of `node`.
    pub fn attach_sketch(&self, node: NodeId, sketch: Arc<dyn Sketch>) -> Result<()> {
        self.network
            .attach_sketch(node, sketch)
            .with_context(|| format!("Failed to attach sketch to node {node}"))
    }

    /// Background packets delivered to the destination so far.
    pub fn delivered(&self) -> u64 {
        self.delivered.load(Ordering::SeqCst)
    }

    /// Background flows that failed to cross the network so far.
    pub fn failed(&self) -> u64 {
        self.failed.load(Ordering::SeqCst)
    }

    /// [`simulate_traffic`](Self::simulate_traffic) with
    /// [`DEFAULT_TRAFFIC_DURATION`] and [`DEFAULT_INTERARRIVAL`].
    pub fn simulate_default_traffic(&mut self) -> Result<TrafficReport> {
        self.simulate_traffic(DEFAULT_TRAFFIC_DURATION, DEFAULT_INTERARRIVAL)
    }

    /// Send background packets from the source to the destination for
    /// `duration`.
    ///
    /// Packets depart following a Poisson process: the time between two
    /// departures is exponentially distributed with mean
    /// `avg_interarrival`. Each packet is handed to the dispatcher and
    /// crosses the network concurrently with the others; this call does
    /// not wait for them.
    ///
    /// # Errors
    ///
    /// Fails if `avg_interarrival` is zero or if a flow cannot be
    /// dispatched.
    pub fn simulate_traffic(
        &mut self,
        duration: Duration,
        avg_interarrival: Duration,
    ) -> Result<TrafficReport> {
        if avg_interarrival.is_zero() {
            bail!("Average inter-arrival time must be greater than zero")
        }
        let exp = Exp::new(1.0 / avg_interarrival.as_secs_f64())
            .map_err(|error| anyhow!("Invalid inter-arrival time {avg_interarrival:?}: {error}"))?;

        let start = Instant::now();
        let mut report = TrafficReport::default();

        while start.elapsed() < duration {
            let packet = Packet::new(&self.packet_ids, NodeId::SOURCE, NodeId::DESTINATION);
            report.generated += 1;

            if let Some((probability, rng)) = &mut self.drop
                && probability.should_drop(rng)
            {
                tracing::trace!(packet = %packet.id(), "background packet dropped");
                report.dropped += 1;
            } else {
                self.dispatch(packet)?;
                report.dispatched += 1;
            }

            // draws past `Duration::MAX` saturate, the run's end comes first
            let wait = Duration::try_from_secs_f64(exp.sample(&mut self.interarrival))
                .unwrap_or(Duration::MAX);
            thread::sleep(wait.min(duration.saturating_sub(start.elapsed())));
        }

        report.elapsed = start.elapsed();
        tracing::debug!(
            generated = report.generated,
            dispatched = report.dispatched,
            dropped = report.dropped,
            elapsed = ?report.elapsed,
            "background traffic done"
        );
        Ok(report)
    }

    fn dispatch(&self, packet: Packet) -> Result<()> {
        let id = packet.id();
        let network = Arc::clone(&self.network);
        let delivered = Arc::clone(&self.delivered);
        let failed = Arc::clone(&self.failed);

        tracing::trace!(packet = %id, "dispatching background flow");
        self.dispatcher
            .dispatch(Box::new(move || match network.transmit_packet(packet) {
                Ok(()) => {
                    delivered.fetch_add(1, Ordering::SeqCst);
                    tracing::trace!(packet = %id, "background packet delivered");
                }
                Err(error) => {
                    failed.fetch_add(1, Ordering::SeqCst);
                    tracing::error!(packet = %id, %error, "background flow failed");
                }
            }))
            .with_context(|| format!("Failed to dispatch packet {id}"))
    }

    /// Wait for the flows in flight and stop the dispatcher.
    pub fn shutdown(self) -> Result<()> {
        self.dispatcher
            .shutdown()
            .context("Background traffic failed to shut down cleanly")
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::Recorder;
    use probesim_core::{DelayDistributionTable, NormalParams};
    use rand_distr::Distribution as _;

    fn fixed_delay_network(delay_ms: f64) -> Arc<GroundTruthNetwork> {
        let table = DelayDistributionTable::new().with_edge(
            NodeId::SOURCE,
            NodeId::DESTINATION,
            NormalParams::new(delay_ms, 0.0).unwrap(),
        );
        Arc::new(GroundTruthNetwork::with_table(table, Some(42)))
    }

    #[test]
    fn traffic_reaches_the_recorder() {
        let mut context = SimContext::builder()
            .set_network(fixed_delay_network(1.0))
            .build()
            .unwrap();
        let recorder = Arc::new(Recorder::new());
        context
            .attach_sketch(NodeId::DESTINATION, recorder.clone())
            .unwrap();

        let report = context
            .simulate_traffic(Duration::from_millis(100), Duration::from_millis(5))
            .unwrap();
        assert!(report.dispatched > 0);
        assert_eq!(report.dropped, 0);
        assert_eq!(report.generated, report.dispatched);
        assert!(report.elapsed >= Duration::from_millis(100));

        let delivered = {
            let network = Arc::clone(context.network());
            context.shutdown().unwrap();
            network.destination_switch().received()
        };
        assert_eq!(delivered, report.dispatched);
        assert_eq!(recorder.len() as u64, report.dispatched);
        assert!(recorder.delays().iter().all(|delay| *delay == 1.0));
    }

    #[test]
    fn worker_pool_context() {
        let mut context = SimContext::builder()
            .set_network(fixed_delay_network(2.0))
            .set_workers(2)
            .set_seed(3)
            .build()
            .unwrap();
        let recorder = Arc::new(Recorder::new());
        context
            .attach_sketch(NodeId::DESTINATION, recorder.clone())
            .unwrap();

        let report = context
            .simulate_traffic(Duration::from_millis(50), Duration::from_millis(2))
            .unwrap();
        context.shutdown().unwrap();

        assert_eq!(recorder.len() as u64, report.dispatched);
    }

    #[test]
    fn background_loss() {
        let mut context = SimContext::builder()
            .set_network(fixed_delay_network(1.0))
            .set_drop_probability(DropProbability::new(1.0).unwrap())
            .build()
            .unwrap();

        let report = context
            .simulate_traffic(Duration::from_millis(30), Duration::from_millis(1))
            .unwrap();
        assert!(report.generated > 0);
        assert_eq!(report.dropped, report.generated);
        assert_eq!(report.dispatched, 0);

        context.shutdown().unwrap();
    }

    #[test]
    fn delivered_count_follows_flows() {
        let mut context = SimContext::builder()
            .set_network(fixed_delay_network(1.0))
            .build()
            .unwrap();
        let report = context
            .simulate_traffic(Duration::from_millis(20), Duration::from_millis(2))
            .unwrap();
        assert!(context.delivered() <= report.dispatched);

        let network = Arc::clone(context.network());
        let delivered = Arc::clone(&context.delivered);
        let failed = Arc::clone(&context.failed);
        context.shutdown().unwrap();

        // nothing attached: packets are counted by the switch and discarded
        assert_eq!(delivered.load(Ordering::SeqCst), report.dispatched);
        assert_eq!(failed.load(Ordering::SeqCst), 0);
        assert_eq!(network.destination_switch().received(), report.dispatched);
    }

    #[test]
    fn zero_interarrival_is_rejected() {
        let mut context = SimContext::new(PathConfig::Single, Some(1)).unwrap();
        assert!(
            context
                .simulate_traffic(Duration::from_millis(10), Duration::ZERO)
                .is_err()
        );
        context.shutdown().unwrap();
    }

    #[test]
    fn invalid_worker_pool() {
        assert!(SimContext::builder().set_workers(0).build().is_err());
    }

    #[test]
    fn huge_interarrival_ends_with_the_run() {
        for seed in 0..10 {
            let mut context = SimContext::builder()
                .set_network(fixed_delay_network(0.0))
                .set_seed(seed)
                .build()
                .unwrap();

            let report = context
                .simulate_traffic(Duration::from_millis(1), Duration::MAX)
                .unwrap();
            // one packet leaves right away, the next one is past the end
            assert_eq!(report.generated, 1);
            assert!(report.elapsed < Duration::from_secs(1));

            context.shutdown().unwrap();
        }
    }

    #[test]
    fn same_seed_same_draws() {
        let run = || {
            let mut context = SimContext::builder()
                .set_network(fixed_delay_network(0.0))
                .set_seed(8)
                .set_drop_probability(DropProbability::new(0.5).unwrap())
                .build()
                .unwrap();
            let exp = Exp::new(1.0).unwrap();

            let mut drops = Vec::new();
            let mut interarrivals = Vec::new();
            for _ in 0..100 {
                let (probability, rng) = context.drop.as_mut().unwrap();
                drops.push(probability.should_drop(rng));
                interarrivals.push(exp.sample(&mut context.interarrival));
            }
            context.shutdown().unwrap();
            (drops, interarrivals)
        };

        let (drops, interarrivals) = run();
        assert_eq!((drops.clone(), interarrivals.clone()), run());
        assert!(drops.contains(&true) && drops.contains(&false));
        assert!(interarrivals.iter().all(|wait| *wait > 0.0));
    }
}
