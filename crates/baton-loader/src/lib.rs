use anyhow::{Context, Result, bail};
use baton_abstract::{ChainId, Topology};
use std::fs::File;
use std::io::Read;
use std::path::Path;

/// Load an overlay topology from a no-header CSV edge list.
///
/// Each line is `u,v`; identifiers are normalized into the chain
/// namespace and the edge is undirected. A line with any other field
/// count aborts the load.
pub fn load_topology(path: impl AsRef<Path>) -> Result<Topology> {
    let path = path.as_ref();
    let file = File::open(path)
        .with_context(|| format!("failed to open topology file {}", path.display()))?;
    parse_topology(file).with_context(|| format!("failed to parse topology file {}", path.display()))
}

/// Parse a topology edge list from any CSV reader.
pub fn parse_topology(reader: impl Read) -> Result<Topology> {
    let mut csv_reader = csv::ReaderBuilder::new()
        .has_headers(false)
        .flexible(true)
        .trim(csv::Trim::All)
        .from_reader(reader);

    let mut topology = Topology::new();
    for (line, record) in csv_reader.records().enumerate() {
        let record = record.with_context(|| format!("edge line {}", line + 1))?;
        if record.len() != 2 {
            bail!(
                "malformed edge line {}: expected 2 fields, found {}",
                line + 1,
                record.len()
            );
        }
        topology.add_edge(
            ChainId::namespaced(&record[0]),
            ChainId::namespaced(&record[1]),
        );
    }
    Ok(topology)
}
