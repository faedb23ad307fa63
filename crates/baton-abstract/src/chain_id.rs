use serde::{Deserialize, Serialize};
use std::fmt;

/// Namespace prefixed onto every identifier read from a topology file.
pub const CHAIN_NAMESPACE: &str = "baton-";

/// Identifier of a chain in the overlay graph.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ChainId(String);

impl ChainId {
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    /// Normalize a raw identifier from a topology file into the chain
    /// namespace.
    pub fn namespaced(raw: &str) -> Self {
        Self(format!("{CHAIN_NAMESPACE}{raw}"))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for ChainId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for ChainId {
    fn from(id: &str) -> Self {
        Self(id.to_string())
    }
}

impl From<String> for ChainId {
    fn from(id: String) -> Self {
        Self(id)
    }
}
