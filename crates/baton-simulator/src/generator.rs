use crate::event::Event;
use crate::heap::{EventHeap, Timed};
use crate::router::{self, RouteError};
use crate::state::SimState;
use baton_abstract::{ChainId, ChannelKind, ConfigError, SimParams};
use rand::Rng;
use std::collections::{BTreeSet, HashMap};
use thiserror::Error;
use tracing::{debug, warn};

/// Fatal generator failures; routing failures are handled inside the
/// generator and never surface here.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum GeneratorError {
    #[error(transparent)]
    Config(#[from] ConfigError),
    #[error("no ordered chain pair can be scheduled; the topology needs at least two chains")]
    NoPairs,
    #[error("send heap drained with {remaining} sends left in the budget")]
    HeapDrained { remaining: u64 },
}

/// Scheduling token for one ordered pair. Lives only in the
/// generator's own heap, never in the main queue.
#[derive(Debug, Clone)]
struct GenSend {
    time: u64,
    src: ChainId,
    dst: ChainId,
}

impl Timed for GenSend {
    fn time(&self) -> u64 {
        self.time
    }
}

/// Produce the scheduled send events for a whole run.
///
/// One token per ordered pair starts inside the first interval; each
/// emission re-arms its pair one jittered interval after the popped
/// token's time, until the budget is spent. Routes are computed once
/// per pair and cached; pairs that cannot be routed leave the
/// rotation without consuming budget.
pub fn generate<R: Rng>(
    state: &SimState,
    params: &SimParams,
    rng: &mut R,
) -> Result<Vec<Event>, GeneratorError> {
    params.validate()?;

    let ids: Vec<ChainId> = state.chain_ids().cloned().collect();
    let mut heap = EventHeap::new();
    for src in &ids {
        for dst in &ids {
            if src != dst {
                heap.insert(GenSend {
                    time: rng.random_range(0..params.send_interval_ms),
                    src: src.clone(),
                    dst: dst.clone(),
                });
            }
        }
    }
    if heap.is_empty() {
        return Err(GeneratorError::NoPairs);
    }

    let mut routes: HashMap<(ChainId, ChainId), Vec<ChainId>> = HashMap::new();
    let mut emitted: Vec<Event> = Vec::with_capacity(params.sends as usize);
    while (emitted.len() as u64) < params.sends {
        let Some(token) = heap.pop() else {
            return Err(GeneratorError::HeapDrained {
                remaining: params.sends - emitted.len() as u64,
            });
        };
        let key = (token.src.clone(), token.dst.clone());
        let path = match routes.get(&key) {
            Some(path) => path.clone(),
            None => match route_pair(state, &token.src, &token.dst, params, rng) {
                Ok(path) => {
                    debug!("routed {} -> {} as {:?}", token.src, token.dst, path);
                    routes.insert(key, path.clone());
                    path
                }
                Err(err) => {
                    warn!("pair {} -> {} left the rotation: {err}", token.src, token.dst);
                    continue;
                }
            },
        };
        emitted.push(make_send(params.channel, token.time, &path));

        let jitter = if params.jitter_ms > 0 {
            rng.random_range(0..params.jitter_ms)
        } else {
            0
        };
        heap.insert(GenSend {
            time: token.time + params.send_interval_ms + jitter,
            src: token.src,
            dst: token.dst,
        });
    }
    Ok(emitted)
}

/// Route one ordered pair according to the routing model.
///
/// Baton mode with hubs present still runs the hub-restricted search
/// first and keeps only its reachability signal before routing
/// unconstrained.
fn route_pair<R: Rng>(
    state: &SimState,
    src: &ChainId,
    dst: &ChainId,
    params: &SimParams,
    rng: &mut R,
) -> Result<Vec<ChainId>, RouteError> {
    if params.direct {
        return router::shortest_path(state, src, dst, &params.hubs, rng);
    }
    if !params.hubs.is_empty() {
        router::shortest_path(state, src, dst, &params.hubs, rng)?;
    }
    let no_hubs = BTreeSet::new();
    router::shortest_path(state, src, dst, &no_hubs, rng)
}

fn make_send(channel: ChannelKind, time: u64, path: &[ChainId]) -> Event {
    let src = path[0].clone();
    let hops = path[1..].to_vec();
    match channel {
        ChannelKind::Multi => Event::send(time, src, hops),
        ChannelKind::Single => Event::send_single(time, src, hops, 1),
    }
}
