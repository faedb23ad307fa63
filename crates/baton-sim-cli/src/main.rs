use anyhow::{Result, bail};
use baton_abstract::{ChainId, ChannelKind, SimParams};
use baton_sim_cli::{print_report, write_trace};
use baton_simulator::Simulator;
use clap::Parser;
use rand::Rng;
use std::path::PathBuf;
use tracing::info;

#[derive(Parser, Debug)]
#[command(author, version, about = "Chain overlay congestion simulator")]
struct Args {
    /// CSV topology file, one `u,v` edge per line.
    edges_csv: PathBuf,

    /// Channel model: `single` or `multi`.
    channel: ChannelKind,

    /// Nominal send interval in milliseconds.
    send_interval_ms: u64,

    /// Re-scheduling jitter in milliseconds, strictly below the interval.
    jitter_ms: u64,

    /// Total send budget across all chain pairs.
    sends: u64,

    /// The literal `true` enables direct (hub-restricted) routing.
    direct: Option<String>,

    /// Hub chain identifiers, already namespaced.
    hubs: Vec<String>,

    /// Pin the run's random seed; a fresh one is drawn otherwise.
    #[arg(long)]
    seed: Option<u64>,

    /// Write the final report as pretty JSON.
    #[arg(long)]
    trace_out: Option<PathBuf>,
}

fn main() -> Result<()> {
    tracing_subscriber::fmt::init();
    let args = Args::parse();

    if args.sends == 0 {
        bail!("number of sends must be positive");
    }

    let seed = args.seed.unwrap_or_else(|| rand::rng().random());
    info!("running with seed {seed}");

    let params = SimParams {
        channel: args.channel,
        send_interval_ms: args.send_interval_ms,
        jitter_ms: args.jitter_ms,
        sends: args.sends,
        direct: matches!(args.direct.as_deref(), Some("true")),
        hubs: args.hubs.iter().map(|h| ChainId::new(h.clone())).collect(),
        seed,
    };
    params.validate()?;

    let topology = baton_loader::load_topology(&args.edges_csv)?;
    let mut sim = Simulator::new(&topology, params);
    sim.run_until_complete()?;
    let report = sim.export_report();

    print_report(&report);
    if let Some(path) = &args.trace_out {
        write_trace(path, &report)?;
    }
    Ok(())
}
