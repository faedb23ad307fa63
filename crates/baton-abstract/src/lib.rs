pub mod chain_id;
pub mod config;
pub mod scenario;
pub mod topology;

pub use chain_id::{CHAIN_NAMESPACE, ChainId};
pub use config::{ChannelKind, ConfigError, SimParams};
pub use scenario::{SimParamsOverride, TestAssertion, TestScenario};
pub use topology::Topology;
