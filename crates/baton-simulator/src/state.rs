use crate::IMPLICIT_HEIGHT_INTERVAL_MS;
use crate::chain::Chain;
use crate::event::Event;
use baton_abstract::ChainId;
use rand::Rng;
use std::collections::BTreeMap;
use tracing::debug;

/// A pending implicit event: the countdown until its next firing and
/// the template that gets stamped and copied into the queue.
#[derive(Debug, Clone)]
struct ImplicitSlot {
    remaining_ms: u64,
    template: Event,
}

/// The shared simulation state: every chain, the time cursor, and the
/// tracker for the implicit per-chain Height events.
///
/// Chains live in an ordered map so that runs with the same seed walk
/// the graph in the same order.
#[derive(Debug, Default)]
pub struct SimState {
    chains: BTreeMap<ChainId, Chain>,
    now: u64,
    implicit: Vec<ImplicitSlot>,
}

impl SimState {
    pub fn new() -> Self {
        Self::default()
    }

    /// Current simulated time in milliseconds.
    pub fn now(&self) -> u64 {
        self.now
    }

    pub fn set_now(&mut self, now: u64) {
        self.now = now;
    }

    pub fn chain(&self, id: &ChainId) -> Option<&Chain> {
        self.chains.get(id)
    }

    pub fn chain_mut(&mut self, id: &ChainId) -> Option<&mut Chain> {
        self.chains.get_mut(id)
    }

    pub fn chains(&self) -> impl Iterator<Item = &Chain> {
        self.chains.values()
    }

    pub fn chain_ids(&self) -> impl Iterator<Item = &ChainId> {
        self.chains.keys()
    }

    pub fn chain_count(&self) -> usize {
        self.chains.len()
    }

    pub fn contains(&self, id: &ChainId) -> bool {
        self.chains.contains_key(id)
    }

    pub fn add_chain(&mut self, id: ChainId) {
        self.chains
            .entry(id.clone())
            .or_insert_with(|| Chain::new(id));
    }

    /// Install the undirected edge a–b, creating the chains as needed
    /// and seeding both views with the current heights. A self edge
    /// creates the chain but no link.
    pub fn add_edge(&mut self, a: &ChainId, b: &ChainId) {
        self.add_chain(a.clone());
        self.add_chain(b.clone());
        if a == b {
            debug!("self edge on {a} keeps the chain isolated");
            return;
        }
        let height_a = self.chains.get(a).map_or(0, Chain::height);
        let height_b = self.chains.get(b).map_or(0, Chain::height);
        if let Some(chain) = self.chains.get_mut(a) {
            chain.add_neighbour(b.clone(), height_b);
        }
        if let Some(chain) = self.chains.get_mut(b) {
            chain.add_neighbour(a.clone(), height_a);
        }
    }

    /// Arm one implicit Height slot per chain, phased uniformly within
    /// the first interval.
    pub fn seed_implicit<R: Rng>(&mut self, rng: &mut R) {
        self.implicit = self
            .chains
            .keys()
            .map(|id| ImplicitSlot {
                remaining_ms: rng.random_range(0..IMPLICIT_HEIGHT_INTERVAL_MS),
                template: Event::height(0, id.clone()),
            })
            .collect();
    }

    /// The next implicit event measured from `curr`, if it fits at or
    /// before `max`.
    ///
    /// Picks the slot with the smallest countdown Δ. When `curr + Δ`
    /// lands beyond `max` nothing fits and None is returned. Otherwise
    /// the winner is re-armed for a full interval, every other slot's
    /// countdown shrinks by Δ, and a copy of the winner's template
    /// stamped to `curr + Δ` is handed back.
    pub fn next_implicit(&mut self, curr: u64, max: u64) -> Option<Event> {
        let (winner, slot) = self
            .implicit
            .iter()
            .enumerate()
            .min_by_key(|(_, slot)| slot.remaining_ms)?;
        let delta = slot.remaining_ms;
        if curr + delta > max {
            return None;
        }
        for (index, slot) in self.implicit.iter_mut().enumerate() {
            if index == winner {
                slot.remaining_ms = IMPLICIT_HEIGHT_INTERVAL_MS;
                slot.template.set_time(curr + delta);
            } else {
                slot.remaining_ms -= delta;
            }
        }
        Some(self.implicit[winner].template.clone())
    }
}
