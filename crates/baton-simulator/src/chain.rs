use baton_abstract::ChainId;
use std::collections::{BTreeMap, BTreeSet};
use tracing::debug;

/// A node in the overlay graph: its block height, its view of each
/// neighbour's height, and the congestion counters the final report
/// is built from.
#[derive(Debug, Clone)]
pub struct Chain {
    id: ChainId,
    height: u64,
    view: BTreeMap<ChainId, u64>,
    neighbours: BTreeSet<ChainId>,
    tx_count: u64,
    max_tx_count: u64,
    total_tx: u64,
}

impl Chain {
    pub fn new(id: ChainId) -> Self {
        Self {
            id,
            height: 0,
            view: BTreeMap::new(),
            neighbours: BTreeSet::new(),
            tx_count: 0,
            max_tx_count: 0,
            total_tx: 0,
        }
    }

    pub fn id(&self) -> &ChainId {
        &self.id
    }

    pub fn height(&self) -> u64 {
        self.height
    }

    /// Transactions that arrived in the current height interval.
    pub fn tx_count(&self) -> u64 {
        self.tx_count
    }

    /// Peak transactions seen in any completed height interval.
    pub fn max_tx_count(&self) -> u64 {
        self.max_tx_count
    }

    /// Lifetime transaction count.
    pub fn total_tx(&self) -> u64 {
        self.total_tx
    }

    pub fn neighbours(&self) -> impl Iterator<Item = &ChainId> {
        self.neighbours.iter()
    }

    pub fn is_neighbour(&self, id: &ChainId) -> bool {
        self.neighbours.contains(id)
    }

    /// Last known height of `id`, 0 when never seen.
    pub fn view_of(&self, id: &ChainId) -> u64 {
        self.view.get(id).copied().unwrap_or(0)
    }

    /// Install one endpoint of an undirected edge, seeding the view
    /// with the neighbour's current height.
    pub fn add_neighbour(&mut self, id: ChainId, height: u64) {
        self.view.insert(id.clone(), height);
        self.neighbours.insert(id);
    }

    /// Record `height` as the last known height of `id`. Returns true
    /// iff the stored view actually changed; ids outside the neighbour
    /// set leave the view untouched.
    pub fn update_view(&mut self, id: &ChainId, height: u64) -> bool {
        match self.view.get_mut(id) {
            Some(known) if *known == height => false,
            Some(known) => {
                *known = height;
                true
            }
            None => {
                debug!("{} has no view of {id} to update", self.id);
                false
            }
        }
    }

    /// Count one arriving transaction in the current interval.
    pub fn record_tx(&mut self) {
        self.tx_count += 1;
        self.total_tx += 1;
    }

    /// Close the current congestion interval and start the next block.
    pub fn advance_height(&mut self) {
        if self.tx_count > self.max_tx_count {
            self.max_tx_count = self.tx_count;
        }
        self.tx_count = 0;
        self.height += 1;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn linked() -> (Chain, ChainId) {
        let neighbour = ChainId::new("baton-b");
        let mut chain = Chain::new(ChainId::new("baton-a"));
        chain.add_neighbour(neighbour.clone(), 0);
        (chain, neighbour)
    }

    #[test]
    fn update_view_reports_real_changes_only() {
        let (mut chain, neighbour) = linked();
        assert!(!chain.update_view(&neighbour, 0));
        assert!(chain.update_view(&neighbour, 3));
        assert_eq!(chain.view_of(&neighbour), 3);
        assert!(!chain.update_view(&neighbour, 3));
    }

    #[test]
    fn update_view_ignores_strangers() {
        let (mut chain, _) = linked();
        assert!(!chain.update_view(&ChainId::new("baton-z"), 5));
        assert_eq!(chain.view_of(&ChainId::new("baton-z")), 0);
    }

    #[test]
    fn advance_height_rolls_the_interval() {
        let (mut chain, _) = linked();
        chain.record_tx();
        chain.record_tx();
        chain.advance_height();
        assert_eq!(chain.height(), 1);
        assert_eq!(chain.tx_count(), 0);
        assert_eq!(chain.max_tx_count(), 2);
        assert_eq!(chain.total_tx(), 2);

        chain.record_tx();
        chain.advance_height();
        assert_eq!(chain.max_tx_count(), 2);
        assert_eq!(chain.total_tx(), 3);
        assert!(chain.total_tx() >= chain.max_tx_count());
    }
}
