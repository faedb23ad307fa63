use crate::heap::{EventHeap, Timed};
use crate::state::SimState;
use baton_abstract::ChainId;
use rand::Rng;
use std::collections::{BTreeSet, HashMap};
use thiserror::Error;

/// Hop distances this high mean the node was never reached.
const UNREACHED: u64 = 100_000_000;

/// Recoverable routing failures; the send generator reacts by taking
/// the pair out of its rotation.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum RouteError {
    #[error("could not find source or destination chain ({src} -> {dst})")]
    MissingEndpoints { src: ChainId, dst: ChainId },
    #[error("no route from {src} to {dst}")]
    Unreachable { src: ChainId, dst: ChainId },
}

/// Entry of the router's work heap; hop distance stands in for time.
#[derive(Debug, Clone)]
struct DijkstraNode {
    distance: u64,
    chain: ChainId,
}

impl Timed for DijkstraNode {
    fn time(&self) -> u64 {
        self.distance
    }
}

/// Predecessor record for uniform tie-breaking: `amount` counts the
/// equally good predecessors seen so far, and the stored one survived
/// each replacement with probability 1/amount (a reservoir of one).
#[derive(Debug)]
struct PrevHop {
    pred: ChainId,
    amount: u64,
}

/// Shortest path from `src` to `dst` by hop count.
///
/// With a non-empty `hubs` set only the source, the source's direct
/// neighbours and hub members may relax their neighbours; every other
/// popped node is skipped but the search continues. Among
/// equal-length paths the returned one is uniformly random.
pub fn shortest_path<R: Rng>(
    state: &SimState,
    src: &ChainId,
    dst: &ChainId,
    hubs: &BTreeSet<ChainId>,
    rng: &mut R,
) -> Result<Vec<ChainId>, RouteError> {
    if !state.contains(src) || !state.contains(dst) {
        return Err(RouteError::MissingEndpoints {
            src: src.clone(),
            dst: dst.clone(),
        });
    }

    // The source sits at distance 1, so its direct neighbours are
    // exactly the nodes that settle at distance 2.
    let mut heap = EventHeap::new();
    for id in state.chain_ids() {
        let distance = if id == src { 1 } else { UNREACHED };
        heap.insert(DijkstraNode {
            distance,
            chain: id.clone(),
        });
    }

    let mut prev: HashMap<ChainId, PrevHop> = HashMap::new();
    loop {
        let Some(node) = heap.pop() else {
            return Err(RouteError::Unreachable {
                src: src.clone(),
                dst: dst.clone(),
            });
        };
        if node.distance >= UNREACHED {
            return Err(RouteError::Unreachable {
                src: src.clone(),
                dst: dst.clone(),
            });
        }
        if node.chain == *dst {
            break;
        }
        let may_relay =
            hubs.is_empty() || node.distance <= 2 || hubs.contains(&node.chain);
        if !may_relay {
            continue;
        }
        let Some(chain) = state.chain(&node.chain) else {
            continue;
        };
        for neighbour in chain.neighbours() {
            let candidate = node.distance + 1;
            let Some((index, entry)) = heap.find(|n: &DijkstraNode| n.chain == *neighbour) else {
                continue;
            };
            let current = entry.distance;
            if candidate < current {
                if let Some(entry) = heap.get_mut(index) {
                    entry.distance = candidate;
                }
                heap.update(index);
                prev.insert(
                    neighbour.clone(),
                    PrevHop {
                        pred: node.chain.clone(),
                        amount: 1,
                    },
                );
            } else if candidate == current {
                if let Some(record) = prev.get_mut(neighbour) {
                    record.amount += 1;
                    if rng.random_range(0..record.amount) == 0 {
                        record.pred = node.chain.clone();
                    }
                }
            }
        }
    }

    let mut path = vec![dst.clone()];
    let mut cursor = dst.clone();
    while let Some(record) = prev.get(&cursor) {
        cursor = record.pred.clone();
        path.push(cursor.clone());
    }
    path.reverse();
    Ok(path)
}
