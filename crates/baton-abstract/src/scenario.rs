use crate::chain_id::ChainId;
use crate::config::{ChannelKind, SimParams};
use serde::Deserialize;

/// A self-contained end-to-end run description: topology, parameter
/// overrides and the assertions to check against the final report.
#[derive(Deserialize, Debug, Clone)]
pub struct TestScenario {
    pub name: String,
    pub description: String,
    /// Undirected edges, chain identifiers verbatim.
    pub edges: Vec<(String, String)>,
    pub config: SimParamsOverride,
    pub assertions: Vec<TestAssertion>,
}

#[derive(Deserialize, Debug, Clone, Default)]
pub struct SimParamsOverride {
    pub channel: Option<ChannelKind>,
    pub send_interval_ms: Option<u64>,
    pub jitter_ms: Option<u64>,
    pub sends: Option<u64>,
    pub direct: Option<bool>,
    pub hubs: Option<Vec<String>>,
    pub seed: Option<u64>,
}

impl SimParamsOverride {
    pub fn apply_to(&self, params: &mut SimParams) {
        if let Some(v) = self.channel {
            params.channel = v;
        }
        if let Some(v) = self.send_interval_ms {
            params.send_interval_ms = v;
        }
        if let Some(v) = self.jitter_ms {
            params.jitter_ms = v;
        }
        if let Some(v) = self.sends {
            params.sends = v;
        }
        if let Some(v) = self.direct {
            params.direct = v;
        }
        if let Some(hubs) = &self.hubs {
            params.hubs = hubs.iter().map(|h| ChainId::new(h.clone())).collect();
        }
        if let Some(v) = self.seed {
            params.seed = v;
        }
    }
}

#[derive(Deserialize, Debug, Clone)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum TestAssertion {
    /// The chain handled exactly `eq` transactions over its lifetime.
    TotalTx { chain: String, eq: u64 },
    /// The chain handled at least `min` transactions.
    TotalTxAtLeast { chain: String, min: u64 },
    /// Peak congestion across the overlay belongs to `chain`.
    MostCongested { chain: String },
    /// Peak congestion on `chain` is at most `max`.
    MaxCongestionAtMost { chain: String, max: u64 },
    /// Sum of lifetime transactions across every chain.
    GrandTotal { eq: u64 },
    /// Lower bound on the sum of lifetime transactions.
    GrandTotalAtLeast { min: u64 },
    /// The run drains within `ms` of simulated time.
    MaxDuration { ms: u64 },
}
