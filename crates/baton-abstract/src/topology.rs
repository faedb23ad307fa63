use crate::ChainId;
use serde::{Deserialize, Serialize};

/// An undirected overlay graph as a plain edge list.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Topology {
    pub edges: Vec<(ChainId, ChainId)>,
}

impl Topology {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn add_edge(&mut self, a: ChainId, b: ChainId) {
        self.edges.push((a, b));
    }
}
