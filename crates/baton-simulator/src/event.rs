use crate::IMPLICIT_HEIGHT_INTERVAL_MS;
use crate::heap::{EventHeap, Timed};
use crate::state::SimState;
use baton_abstract::ChainId;
use tracing::warn;

/// Transit factor applied per hop when a routed send fans out.
const HOP_TRANSIT_FACTOR: f64 = 1.233;

/// Offset of the `hop`-th hop relative to the producing event.
pub fn hop_offset_ms(hop: u64) -> u64 {
    (hop as f64 * HOP_TRANSIT_FACTOR * IMPLICIT_HEIGHT_INTERVAL_MS as f64).round() as u64
}

/// The closed set of event kinds the main queue can carry.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum EventKind {
    /// Fan an entire routed message out as a chain of view updates
    /// ending in a delivery.
    Send { src: ChainId, hops: Vec<ChainId> },
    /// One hop of a routed message; the remaining hops re-schedule
    /// through the hop's delivery.
    SendSingle {
        src: ChainId,
        hops: Vec<ChainId>,
        iteration: u64,
    },
    /// Propagate `chain`'s current height into `neighbour`'s view.
    Update { chain: ChainId, neighbour: ChainId },
    /// Final arrival of a message on `chain`.
    Deliver { chain: ChainId },
    /// Close the congestion interval on `chain` and bump its height.
    Height { chain: ChainId },
}

/// A scheduled event plus its causal successors, enqueued when the
/// event executes.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Event {
    time: u64,
    kind: EventKind,
    following: Vec<Event>,
}

impl Timed for Event {
    fn time(&self) -> u64 {
        self.time
    }
}

impl Event {
    pub fn new(time: u64, kind: EventKind) -> Self {
        Self {
            time,
            kind,
            following: Vec::new(),
        }
    }

    pub fn send(time: u64, src: ChainId, hops: Vec<ChainId>) -> Self {
        Self::new(time, EventKind::Send { src, hops })
    }

    pub fn send_single(time: u64, src: ChainId, hops: Vec<ChainId>, iteration: u64) -> Self {
        Self::new(
            time,
            EventKind::SendSingle {
                src,
                hops,
                iteration,
            },
        )
    }

    pub fn update(time: u64, chain: ChainId, neighbour: ChainId) -> Self {
        Self::new(time, EventKind::Update { chain, neighbour })
    }

    pub fn deliver(time: u64, chain: ChainId) -> Self {
        Self::new(time, EventKind::Deliver { chain })
    }

    pub fn height(time: u64, chain: ChainId) -> Self {
        Self::new(time, EventKind::Height { chain })
    }

    pub fn time(&self) -> u64 {
        self.time
    }

    pub fn set_time(&mut self, time: u64) {
        self.time = time;
    }

    pub fn kind(&self) -> &EventKind {
        &self.kind
    }

    /// Append a causal successor.
    pub fn follow(&mut self, event: Event) {
        self.following.push(event);
    }

    pub fn following(&self) -> &[Event] {
        &self.following
    }

    /// Run this event against the simulation, enqueuing whatever it
    /// produces onto the main queue.
    pub fn execute(self, state: &mut SimState, queue: &mut EventHeap<Event>) {
        let Event {
            time,
            kind,
            following,
        } = self;
        match kind {
            EventKind::Send { src, hops } => execute_send(time, src, hops, queue),
            EventKind::SendSingle {
                src,
                hops,
                iteration,
            } => execute_send_single(time, src, hops, iteration, queue),
            EventKind::Update { chain, neighbour } => {
                execute_update(time, chain, neighbour, following, state, queue)
            }
            EventKind::Deliver { chain } => execute_deliver(chain, following, state, queue),
            EventKind::Height { chain } => execute_height(chain, following, state, queue),
        }
    }
}

/// Expand a multi-hop send into its update chain.
///
/// The i-th hop's update fires `hop_offset_ms(i)` after the send; the
/// delivery shares the last update's time. Only the first update is
/// enqueued here, the rest ride the `following` lists.
fn execute_send(time: u64, src: ChainId, hops: Vec<ChainId>, queue: &mut EventHeap<Event>) {
    let Some(last) = hops.last() else {
        warn!("send from {src} with an empty route dropped");
        return;
    };
    let mut next = Event::deliver(time + hop_offset_ms(hops.len() as u64), last.clone());
    for i in (1..=hops.len()).rev() {
        let from = if i == 1 {
            src.clone()
        } else {
            hops[i - 2].clone()
        };
        let mut update = Event::update(time + hop_offset_ms(i as u64), from, hops[i - 1].clone());
        update.follow(next);
        next = update;
    }
    queue.insert(next);
}

/// Emit one hop as its own update/deliver pair; when hops remain, the
/// continuation rides the delivery's following list, stamped with the
/// emitted update's time.
fn execute_send_single(
    time: u64,
    src: ChainId,
    hops: Vec<ChainId>,
    iteration: u64,
    queue: &mut EventHeap<Event>,
) {
    let Some(first) = hops.first() else {
        warn!("send from {src} with an empty route dropped");
        return;
    };
    let hop_time = time + hop_offset_ms(iteration);
    let mut deliver = Event::deliver(hop_time, first.clone());
    if hops.len() > 1 {
        deliver.follow(Event::send_single(
            hop_time,
            first.clone(),
            hops[1..].to_vec(),
            iteration + 1,
        ));
    }
    let mut update = Event::update(hop_time, src, first.clone());
    update.follow(deliver);
    queue.insert(update);
}

fn execute_update(
    time: u64,
    chain: ChainId,
    neighbour: ChainId,
    following: Vec<Event>,
    state: &mut SimState,
    queue: &mut EventHeap<Event>,
) {
    let Some(height) = state.chain(&chain).map(|c| c.height()) else {
        warn!("update from unknown chain {chain} dropped");
        return;
    };
    let Some(target) = state.chain_mut(&neighbour) else {
        warn!("update towards unknown chain {neighbour} dropped");
        return;
    };
    let updated = target.update_view(&chain, height);
    if updated {
        target.record_tx();
    }
    for mut event in following {
        match event.kind() {
            // A no-op update collapses its successors into the present.
            EventKind::Update { .. } if !updated => event.set_time(time),
            // The update chain defined when the delivery lands.
            EventKind::Deliver { .. } => event.set_time(time),
            _ => {}
        }
        queue.insert(event);
    }
}

fn execute_deliver(
    chain: ChainId,
    following: Vec<Event>,
    state: &mut SimState,
    queue: &mut EventHeap<Event>,
) {
    let Some(target) = state.chain_mut(&chain) else {
        warn!("delivery to unknown chain {chain} dropped");
        return;
    };
    target.record_tx();
    for event in following {
        queue.insert(event);
    }
}

fn execute_height(
    chain: ChainId,
    following: Vec<Event>,
    state: &mut SimState,
    queue: &mut EventHeap<Event>,
) {
    let Some(target) = state.chain_mut(&chain) else {
        warn!("height tick for unknown chain {chain} dropped");
        return;
    };
    target.advance_height();
    for event in following {
        queue.insert(event);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::router;
    use rand::SeedableRng;
    use rand::rngs::StdRng;
    use std::collections::BTreeSet;

    fn line_state() -> (SimState, ChainId, ChainId, ChainId) {
        let a = ChainId::new("baton-a");
        let b = ChainId::new("baton-b");
        let c = ChainId::new("baton-c");
        let mut state = SimState::new();
        state.add_edge(&a, &b);
        state.add_edge(&b, &c);
        (state, a, b, c)
    }

    fn drain(state: &mut SimState, queue: &mut EventHeap<Event>) {
        let mut steps = 0;
        while let Some(event) = queue.pop() {
            state.set_now(event.time());
            event.execute(state, queue);
            steps += 1;
            assert!(steps < 1000, "queue failed to drain");
        }
    }

    #[test]
    fn update_counts_only_real_view_changes() {
        let (mut state, a, b, _) = line_state();
        let mut queue = EventHeap::new();

        Event::update(10, a.clone(), b.clone()).execute(&mut state, &mut queue);
        assert_eq!(state.chain(&b).map(|c| c.total_tx()), Some(0));

        state.chain_mut(&a).expect("chain a").advance_height();
        Event::update(20, a.clone(), b.clone()).execute(&mut state, &mut queue);
        let chain_b = state.chain(&b).expect("chain b");
        assert_eq!(chain_b.total_tx(), 1);
        assert_eq!(chain_b.tx_count(), 1);
        assert_eq!(chain_b.view_of(&a), 1);
    }

    #[test]
    fn noop_update_restamps_followers_to_the_present() {
        let (mut state, a, b, _) = line_state();
        let mut queue = EventHeap::new();

        let mut update = Event::update(10, a.clone(), b.clone());
        update.follow(Event::update(9999, b.clone(), a.clone()));
        update.follow(Event::deliver(9999, b.clone()));
        update.execute(&mut state, &mut queue);

        assert_eq!(queue.pop().map(|e| e.time()), Some(10));
        assert_eq!(queue.pop().map(|e| e.time()), Some(10));
    }

    #[test]
    fn effective_update_keeps_follower_update_times() {
        let (mut state, a, b, _) = line_state();
        let mut queue = EventHeap::new();

        state.chain_mut(&a).expect("chain a").advance_height();
        let mut update = Event::update(10, a.clone(), b.clone());
        update.follow(Event::update(9999, b.clone(), a.clone()));
        update.follow(Event::deliver(9999, b.clone()));
        update.execute(&mut state, &mut queue);

        // the delivery is always pulled to the present, the follow-up
        // update keeps its schedule
        assert_eq!(queue.pop().map(|e| e.time()), Some(10));
        assert_eq!(queue.pop().map(|e| e.time()), Some(9999));
    }

    #[test]
    fn deliver_counts_and_releases_followers() {
        let (mut state, a, b, _) = line_state();
        let mut queue = EventHeap::new();

        let mut deliver = Event::deliver(5, b.clone());
        deliver.follow(Event::height(42, a.clone()));
        deliver.execute(&mut state, &mut queue);

        assert_eq!(state.chain(&b).map(|c| c.total_tx()), Some(1));
        let follower = queue.pop().expect("follower enqueued");
        assert_eq!(follower.time(), 42);
        assert!(matches!(follower.kind(), EventKind::Height { .. }));
    }

    #[test]
    fn height_rolls_the_congestion_interval() {
        let (mut state, a, _, _) = line_state();
        let mut queue = EventHeap::new();

        let chain = state.chain_mut(&a).expect("chain a");
        chain.record_tx();
        chain.record_tx();
        Event::height(5, a.clone()).execute(&mut state, &mut queue);

        let chain = state.chain(&a).expect("chain a");
        assert_eq!(chain.height(), 1);
        assert_eq!(chain.tx_count(), 0);
        assert_eq!(chain.max_tx_count(), 2);
    }

    #[test]
    fn events_on_unknown_chains_drop_their_followers() {
        let mut state = SimState::new();
        let mut queue = EventHeap::new();

        let mut update = Event::update(5, ChainId::new("baton-x"), ChainId::new("baton-y"));
        update.follow(Event::deliver(5, ChainId::new("baton-y")));
        update.execute(&mut state, &mut queue);
        assert!(queue.is_empty());

        Event::deliver(5, ChainId::new("baton-y")).execute(&mut state, &mut queue);
        Event::height(5, ChainId::new("baton-y")).execute(&mut state, &mut queue);
        assert!(queue.is_empty());
    }

    #[test]
    fn multi_hop_send_expands_lazily() {
        let (mut state, a, b, c) = line_state();
        let mut queue = EventHeap::new();

        Event::send(0, a.clone(), vec![b.clone(), c.clone()]).execute(&mut state, &mut queue);
        assert_eq!(queue.len(), 1);

        let first = queue.pop().expect("first update");
        assert_eq!(first.time(), hop_offset_ms(1));
        assert_eq!(
            first.kind(),
            &EventKind::Update {
                chain: a.clone(),
                neighbour: b.clone()
            }
        );

        let second = &first.following()[0];
        assert_eq!(second.time(), hop_offset_ms(2));
        assert_eq!(
            second.kind(),
            &EventKind::Update {
                chain: b.clone(),
                neighbour: c.clone()
            }
        );

        let last = &second.following()[0];
        assert_eq!(last.time(), hop_offset_ms(2));
        assert_eq!(last.kind(), &EventKind::Deliver { chain: c.clone() });
    }

    #[test]
    fn multi_hop_send_delivers_exactly_once() {
        let (mut state, a, b, c) = line_state();
        let mut queue = EventHeap::new();

        queue.insert(Event::send(0, a.clone(), vec![b.clone(), c.clone()]));
        drain(&mut state, &mut queue);

        // heights never move without Height events, so the view
        // updates are no-ops and the delivery is the only transaction
        assert_eq!(state.chain(&b).map(|ch| ch.total_tx()), Some(0));
        assert_eq!(state.chain(&c).map(|ch| ch.total_tx()), Some(1));
    }

    #[test]
    fn single_hop_send_reschedules_through_the_delivery() {
        let (mut state, a, b, c) = line_state();
        let mut queue = EventHeap::new();

        Event::send_single(0, a.clone(), vec![b.clone(), c.clone()], 1)
            .execute(&mut state, &mut queue);
        assert_eq!(queue.len(), 1);

        let update = queue.pop().expect("hop update");
        assert_eq!(update.time(), hop_offset_ms(1));
        let deliver = &update.following()[0];
        assert_eq!(deliver.kind(), &EventKind::Deliver { chain: b.clone() });
        let next = &deliver.following()[0];
        assert_eq!(next.time(), hop_offset_ms(1));
        assert_eq!(
            next.kind(),
            &EventKind::SendSingle {
                src: b.clone(),
                hops: vec![c.clone()],
                iteration: 2
            }
        );
    }

    #[test]
    fn single_hop_send_walks_the_whole_route() {
        let (mut state, a, b, c) = line_state();
        let mut queue = EventHeap::new();

        queue.insert(Event::send_single(0, a.clone(), vec![b.clone(), c.clone()], 1));
        drain(&mut state, &mut queue);

        // every hop carries its own delivery
        assert_eq!(state.chain(&b).map(|ch| ch.total_tx()), Some(1));
        assert_eq!(state.chain(&c).map(|ch| ch.total_tx()), Some(1));
        assert_eq!(state.now(), hop_offset_ms(1) + hop_offset_ms(2));
    }

    fn hub_path_state() -> (SimState, ChainId, ChainId, ChainId) {
        let one = ChainId::new("baton-1");
        let two = ChainId::new("baton-2");
        let three = ChainId::new("baton-3");
        let mut state = SimState::new();
        state.add_edge(&one, &two);
        state.add_edge(&two, &three);
        (state, one, two, three)
    }

    #[test]
    fn hub_path_sends_pin_exact_totals() {
        let (mut state, one, two, three) = hub_path_state();
        let hubs = BTreeSet::from([two.clone()]);
        let mut rng = StdRng::seed_from_u64(2);
        let path = router::shortest_path(&state, &one, &three, &hubs, &mut rng).expect("routed");
        assert_eq!(path, vec![one.clone(), two.clone(), three.clone()]);

        // a height bump on the source ahead of each send, so the
        // first hop's view update carries a real change
        let mut queue = EventHeap::new();
        for i in 0..3u64 {
            queue.insert(Event::height(i * 5000, one.clone()));
            queue.insert(Event::send(i * 5000 + 1, path[0].clone(), path[1..].to_vec()));
        }
        drain(&mut state, &mut queue);

        // per send: the 1→2 update counts on 2, the 2→3 update is a
        // no-op (2's height never moved), the delivery counts on 3
        assert_eq!(state.chain(&two).map(|ch| ch.total_tx()), Some(3));
        assert_eq!(state.chain(&three).map(|ch| ch.total_tx()), Some(3));
        assert_eq!(state.chain(&one).map(|ch| ch.height()), Some(3));
    }

    #[test]
    fn single_channel_hub_path_pins_exact_totals() {
        let (mut state, one, two, three) = hub_path_state();
        let hubs = BTreeSet::from([two.clone()]);
        let mut rng = StdRng::seed_from_u64(2);
        let path = router::shortest_path(&state, &one, &three, &hubs, &mut rng).expect("routed");

        let mut queue = EventHeap::new();
        for i in 0..3u64 {
            queue.insert(Event::height(i * 5000, one.clone()));
            queue.insert(Event::send_single(
                i * 5000 + 1,
                path[0].clone(),
                path[1..].to_vec(),
                1,
            ));
        }
        drain(&mut state, &mut queue);

        // each hop carries its own delivery here: 2 collects three
        // view updates plus three hop deliveries, 3 exactly one
        // delivery per send
        assert_eq!(state.chain(&two).map(|ch| ch.total_tx()), Some(6));
        assert_eq!(state.chain(&three).map(|ch| ch.total_tx()), Some(3));
    }

    #[test]
    fn star_funnels_every_transaction_through_the_hub() {
        let hub = ChainId::new("baton-hub");
        let leaves = [
            ChainId::new("baton-1"),
            ChainId::new("baton-2"),
            ChainId::new("baton-3"),
        ];
        let mut state = SimState::new();
        for leaf in &leaves {
            state.add_edge(leaf, &hub);
        }

        let hubs = BTreeSet::from([hub.clone()]);
        let mut rng = StdRng::seed_from_u64(4);
        let mut queue = EventHeap::new();
        for (i, (s, d)) in [(0usize, 1usize), (1, 2), (2, 0)].into_iter().enumerate() {
            let src = &leaves[s];
            let dst = &leaves[d];
            let path = router::shortest_path(&state, src, dst, &hubs, &mut rng).expect("routed");
            assert_eq!(path, vec![src.clone(), hub.clone(), dst.clone()]);

            let t = i as u64 * 5000;
            queue.insert(Event::height(t, src.clone()));
            queue.insert(Event::send(t + 1, path[0].clone(), path[1..].to_vec()));
        }
        // close every chain's interval after the last delivery
        for chain in leaves.iter().chain([&hub]) {
            queue.insert(Event::height(30000, chain.clone()));
        }
        drain(&mut state, &mut queue);

        // the hub counts one view update per send, each leaf exactly
        // its own delivery
        let hub_chain = state.chain(&hub).expect("hub");
        let leaf_total: u64 = leaves
            .iter()
            .map(|leaf| state.chain(leaf).map_or(0, |ch| ch.total_tx()))
            .sum();
        assert_eq!(hub_chain.total_tx(), 3);
        assert_eq!(hub_chain.total_tx(), leaf_total);
        assert_eq!(hub_chain.max_tx_count(), 3);
        for leaf in &leaves {
            assert_eq!(state.chain(leaf).map(|ch| ch.max_tx_count()), Some(1));
        }
    }
}
