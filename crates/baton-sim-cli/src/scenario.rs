use anyhow::Result;
use baton_sim_cli::{print_report, write_trace};
use baton_simulator::scenario_runner;
use clap::Parser;
use std::path::PathBuf;

#[derive(Parser, Debug)]
#[command(author, version, about = "Run a TOML scenario against the simulator")]
struct Args {
    /// Scenario file to execute.
    scenario: PathBuf,

    /// Write the final report as pretty JSON.
    #[arg(long)]
    trace_out: Option<PathBuf>,
}

fn main() -> Result<()> {
    tracing_subscriber::fmt::init();
    let args = Args::parse();

    let report = scenario_runner::run_scenario(&args.scenario)?;
    print_report(&report);
    if let Some(path) = &args.trace_out {
        write_trace(path, &report)?;
    }
    Ok(())
}
