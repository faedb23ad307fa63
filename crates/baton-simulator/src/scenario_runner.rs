use crate::Simulator;
use crate::trace::SimulationReport;
use anyhow::{Context, Result, bail};
use baton_abstract::{ChainId, SimParams, TestAssertion, TestScenario, Topology};
use std::fs;
use std::path::Path;
use tracing::info;

/// Run a TOML scenario file and check its assertions.
pub fn run_scenario(path: impl AsRef<Path>) -> Result<SimulationReport> {
    let path = path.as_ref();
    let content = fs::read_to_string(path)
        .with_context(|| format!("failed to read scenario file {}", path.display()))?;
    let scenario: TestScenario =
        toml::from_str(&content).context("failed to parse scenario file")?;
    run(&scenario)
}

/// Run an in-memory scenario and check its assertions.
pub fn run(scenario: &TestScenario) -> Result<SimulationReport> {
    info!("running scenario `{}`: {}", scenario.name, scenario.description);

    let mut topology = Topology::new();
    for (a, b) in &scenario.edges {
        topology.add_edge(ChainId::new(a.clone()), ChainId::new(b.clone()));
    }
    let mut params = SimParams::default();
    scenario.config.apply_to(&mut params);

    let mut sim = Simulator::new(&topology, params);
    sim.run_until_complete()
        .with_context(|| format!("scenario `{}` failed to run", scenario.name))?;
    let report = sim.export_report();

    for assertion in &scenario.assertions {
        check(&scenario.name, &report, assertion)?;
    }
    Ok(report)
}

fn chain_total(report: &SimulationReport, chain: &str) -> u64 {
    report
        .chains
        .iter()
        .find(|c| c.chain.as_str() == chain)
        .map_or(0, |c| c.total_tx)
}

fn chain_congestion(report: &SimulationReport, chain: &str) -> u64 {
    report
        .chains
        .iter()
        .find(|c| c.chain.as_str() == chain)
        .map_or(0, |c| c.max_tx_count)
}

fn check(name: &str, report: &SimulationReport, assertion: &TestAssertion) -> Result<()> {
    match assertion {
        TestAssertion::TotalTx { chain, eq } => {
            let got = chain_total(report, chain);
            if got != *eq {
                bail!("scenario `{name}`: {chain} handled {got} transactions, expected {eq}");
            }
        }
        TestAssertion::TotalTxAtLeast { chain, min } => {
            let got = chain_total(report, chain);
            if got < *min {
                bail!("scenario `{name}`: {chain} handled {got} transactions, expected at least {min}");
            }
        }
        TestAssertion::MostCongested { chain } => {
            let got = report.most_congested.as_ref().map(|c| c.chain.as_str());
            if got != Some(chain.as_str()) {
                bail!(
                    "scenario `{name}`: most congested chain is {}, expected {chain}",
                    got.unwrap_or("<none>")
                );
            }
        }
        TestAssertion::MaxCongestionAtMost { chain, max } => {
            let got = chain_congestion(report, chain);
            if got > *max {
                bail!("scenario `{name}`: congestion on {chain} is {got}, expected at most {max}");
            }
        }
        TestAssertion::GrandTotal { eq } => {
            if report.total_tx != *eq {
                bail!(
                    "scenario `{name}`: grand total is {}, expected {eq}",
                    report.total_tx
                );
            }
        }
        TestAssertion::GrandTotalAtLeast { min } => {
            if report.total_tx < *min {
                bail!(
                    "scenario `{name}`: grand total is {}, expected at least {min}",
                    report.total_tx
                );
            }
        }
        TestAssertion::MaxDuration { ms } => {
            if report.duration_ms > *ms {
                bail!(
                    "scenario `{name}`: run lasted {} ms, expected at most {ms} ms",
                    report.duration_ms
                );
            }
        }
    }
    Ok(())
}
