use crate::ChainId;
use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;
use std::str::FromStr;
use thiserror::Error;

/// Fatal parameter errors, surfaced before a run starts.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum ConfigError {
    #[error("send interval must be a positive number of milliseconds")]
    ZeroInterval,
    #[error(
        "jitter ({jitter_ms} ms) must be strictly less than the send interval ({send_interval_ms} ms)"
    )]
    JitterNotBelowInterval { jitter_ms: u64, send_interval_ms: u64 },
}

/// How a routed message occupies the overlay.
///
/// A multi-hop channel fans the whole hop chain out when the send is
/// scheduled; a single-hop channel re-schedules itself one hop at a
/// time.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ChannelKind {
    Single,
    Multi,
}

impl FromStr for ChannelKind {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "single" => Ok(ChannelKind::Single),
            "multi" => Ok(ChannelKind::Multi),
            other => Err(format!(
                "unknown channel type `{other}` (expected `single` or `multi`)"
            )),
        }
    }
}

/// Parameters of one simulation run.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SimParams {
    pub channel: ChannelKind,
    /// Nominal spacing between two sends of the same ordered pair.
    pub send_interval_ms: u64,
    /// Random extra delay added on re-scheduling, strictly below the
    /// interval.
    pub jitter_ms: u64,
    /// Total send budget across all pairs.
    pub sends: u64,
    /// Restrict routes to source, hubs and destination.
    pub direct: bool,
    pub hubs: BTreeSet<ChainId>,
    pub seed: u64,
}

impl SimParams {
    /// Check the interval/jitter contract.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.send_interval_ms == 0 {
            return Err(ConfigError::ZeroInterval);
        }
        if self.jitter_ms >= self.send_interval_ms {
            return Err(ConfigError::JitterNotBelowInterval {
                jitter_ms: self.jitter_ms,
                send_interval_ms: self.send_interval_ms,
            });
        }
        Ok(())
    }
}

impl Default for SimParams {
    fn default() -> Self {
        Self {
            channel: ChannelKind::Multi,
            send_interval_ms: 5000,
            jitter_ms: 0,
            sends: 1,
            direct: false,
            hubs: BTreeSet::new(),
            seed: 0,
        }
    }
}
