use clap::Parser;
use probesim::{Estimator as _, NodeId, PathConfig, Recorder, SimContext};
use probesim_core::{DropProbability, HumanDuration};
use std::sync::Arc;
use tracing_subscriber::EnvFilter;

#[derive(Parser)]
struct Command {
    /// wall-clock duration of the background traffic
    #[arg(long, default_value = "10s")]
    time: HumanDuration,

    /// mean time between two background packets
    #[arg(long, default_value = "10ms")]
    interarrival: HumanDuration,

    /// path configuration of the ground truth network (`1` or `2`)
    #[arg(long, default_value = "1")]
    path: PathConfig,

    #[arg(long)]
    seed: Option<u64>,

    /// lose this share of the packets before they enter the network
    #[arg(long)]
    drop: Option<DropProbability>,

    /// run the flows on a fixed number of threads instead of one thread
    /// per packet
    #[arg(long)]
    workers: Option<usize>,
}

fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .with_target(false)
        .init();

    let cmd = Command::parse();

    let mut builder = SimContext::builder().set_path(cmd.path);
    if let Some(seed) = cmd.seed {
        builder = builder.set_seed(seed);
    }
    if let Some(drop) = cmd.drop {
        builder = builder.set_drop_probability(drop);
    }
    if let Some(workers) = cmd.workers {
        builder = builder.set_workers(workers);
    }
    let mut context = builder.build()?;

    let recorder = Arc::new(Recorder::new());
    context.attach_sketch(NodeId::DESTINATION, recorder.clone())?;

    let report = context.simulate_traffic(cmd.time.into(), cmd.interarrival.into())?;
    let network = Arc::clone(context.network());
    context.shutdown()?;

    println!(
        "{generated} packets in {elapsed:?}: {dispatched} sent, {dropped} dropped, {received} received",
        generated = report.generated,
        elapsed = report.elapsed,
        dispatched = report.dispatched,
        dropped = report.dropped,
        received = recorder.len(),
    );

    for edge in network.get_distribution_parameters().edges() {
        println!("ground truth {}: {}", edge.id(), edge.params());
    }

    if let Some(estimate) = recorder.estimate_parameters() {
        let score =
            network.compare_distribution_parameters(estimate.estimated_mean, estimate.estimated_std);
        println!(
            "estimated N({:.3}ms, {:.3}ms), KL divergence {score:.6}",
            estimate.estimated_mean, estimate.estimated_std
        );
    }

    Ok(())
}
