use anyhow::{Context, Result};
use baton_simulator::SimulationReport;
use std::fs;
use std::path::Path;

/// Render the per-chain congestion report on stdout.
pub fn print_report(report: &SimulationReport) {
    for chain in &report.chains {
        println!(
            "Congestion: {} -- {}| total {}",
            chain.chain, chain.max_tx_count, chain.total_tx
        );
    }
    if let Some(most) = &report.most_congested {
        println!("MOST congestion chain: {} -- {}", most.chain, most.max_tx_count);
    }
    println!("Total Transactions: {}", report.total_tx);
}

/// Write the report as pretty JSON.
pub fn write_trace(path: &Path, report: &SimulationReport) -> Result<()> {
    let data =
        serde_json::to_vec_pretty(report).context("failed to serialize the simulation report")?;
    fs::write(path, &data)
        .with_context(|| format!("failed to write trace file {}", path.display()))?;
    Ok(())
}
