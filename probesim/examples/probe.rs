use clap::Parser;
use probesim_core::{
    DropProbability, PathConfig,
    defaults::DEFAULT_DROP_PROBABILITY,
    probe::{ActiveProbeSimulator, Evolution, ProbeError},
};
use tracing_subscriber::EnvFilter;

#[derive(Parser)]
struct Command {
    /// number of probes to send
    #[arg(long, default_value = "1000")]
    probes: u32,

    /// seconds between two probe departures
    #[arg(long, default_value = "0.1")]
    spacing: f64,

    #[arg(long, default_value = "v1")]
    evolution: Evolution,

    /// loss rate of the `v1` prober
    #[arg(long, default_value_t = DEFAULT_DROP_PROBABILITY)]
    drop: DropProbability,

    /// path configuration of the ground truth network (`1` or `2`)
    #[arg(long, default_value = "1")]
    path: PathConfig,

    #[arg(long, default_value = "42")]
    seed: u64,
}

fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .with_target(false)
        .init();

    let cmd = Command::parse();

    let mut simulator = ActiveProbeSimulator::builder()
        .set_path(cmd.path)
        .set_seed(cmd.seed)
        .set_evolution(cmd.evolution)
        .set_drop_probability(cmd.drop)
        .build()?;

    let mut rejected = 0;
    for i in 0..cmd.probes {
        match simulator.send_probe_at(f64::from(i) * cmd.spacing) {
            Ok(_) => (),
            Err(error @ (ProbeError::OutOfRange { .. } | ProbeError::RateLimitExceeded { .. })) => {
                tracing::debug!(%error, "probe rejected");
                rejected += 1;
            }
            Err(error) => return Err(error.into()),
        }
    }

    let stats = simulator.stats();
    println!(
        "{evolution}: {probes} probes logged ({measured} measured, {dropped} dropped, {rejected} rejected), drop rate {rate:.2}%",
        evolution = simulator.evolution(),
        probes = stats.probes,
        measured = stats.measured,
        dropped = stats.dropped,
        rate = stats.drop_rate() * 100.0,
    );

    if let (Some(mean), Some(std)) = (stats.mean_delay, stats.std_delay) {
        let score = simulator
            .network()
            .compare_distribution_parameters(mean, std);
        println!("estimated N({mean:.3}ms, {std:.3}ms), KL divergence {score:.6}");
    }

    Ok(())
}
