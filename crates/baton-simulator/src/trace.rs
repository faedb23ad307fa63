use baton_abstract::{ChainId, SimParams};
use serde::Serialize;

/// Per-chain slice of the final report.
#[derive(Debug, Clone, Serialize)]
pub struct ChainReport {
    pub chain: ChainId,
    pub height: u64,
    pub max_tx_count: u64,
    pub total_tx: u64,
}

/// Serializable snapshot of a finished run.
#[derive(Debug, Clone, Serialize)]
pub struct SimulationReport {
    pub params: SimParams,
    pub duration_ms: u64,
    pub chains: Vec<ChainReport>,
    pub most_congested: Option<ChainReport>,
    pub total_tx: u64,
}
