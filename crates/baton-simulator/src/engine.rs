use crate::event::Event;
use crate::generator::{self, GeneratorError};
use crate::heap::EventHeap;
use crate::state::SimState;
use crate::trace::{ChainReport, SimulationReport};
use baton_abstract::{SimParams, Topology};
use rand::SeedableRng;
use rand::rngs::StdRng;
use tracing::{debug, info};

/// The simulation engine: owns the state, the main event queue and
/// the run's RNG, and drives the scheduler loop.
pub struct Simulator {
    state: SimState,
    queue: EventHeap<Event>,
    params: SimParams,
    rng: StdRng,
    loaded: bool,
}

impl Simulator {
    pub fn new(topology: &Topology, params: SimParams) -> Self {
        let mut state = SimState::new();
        for (a, b) in &topology.edges {
            state.add_edge(a, b);
        }
        let rng = StdRng::seed_from_u64(params.seed);
        Self {
            state,
            queue: EventHeap::new(),
            params,
            rng,
            loaded: false,
        }
    }

    /// Generate the run's sends and bulk-load the main queue,
    /// interleaving the implicit per-chain Height events.
    pub fn load(&mut self) -> Result<(), GeneratorError> {
        self.params.validate()?;
        self.state.seed_implicit(&mut self.rng);
        let staged = generator::generate(&self.state, &self.params, &mut self.rng)?;
        info!(
            "loading {} sends across {} chains",
            staged.len(),
            self.state.chain_count()
        );
        self.load_staged(staged);
        self.loaded = true;
        Ok(())
    }

    /// Phase two of the load: transfer staged events to the main
    /// queue, asking the state after each transfer for every implicit
    /// event that fits before the next staged one.
    fn load_staged(&mut self, staged: Vec<Event>) {
        let mut staging = EventHeap::new();
        for event in staged {
            staging.insert(event);
        }
        let mut implicit_timer = match staging.peek() {
            Some(event) => event.time(),
            None => 0,
        };
        while let Some(event) = staging.pop() {
            self.queue.insert(event);
            if let Some(next) = staging.peek() {
                let window_end = next.time();
                while let Some(implicit) = self.state.next_implicit(implicit_timer, window_end) {
                    implicit_timer = implicit.time();
                    self.queue.insert(implicit);
                }
            }
        }
    }

    /// Process the next event. False when the queue has drained.
    pub fn step(&mut self) -> bool {
        let Some(event) = self.queue.pop() else {
            return false;
        };
        self.state.set_now(event.time());
        debug!("executing {:?} at {}", event.kind(), event.time());
        event.execute(&mut self.state, &mut self.queue);
        true
    }

    pub fn run_until_complete(&mut self) -> Result<(), GeneratorError> {
        if !self.loaded {
            self.load()?;
        }
        while self.step() {}
        Ok(())
    }

    /// Current simulated time in milliseconds.
    pub fn current_time(&self) -> u64 {
        self.state.now()
    }

    pub fn peek_next_event_time(&self) -> Option<u64> {
        self.queue.peek().map(Event::time)
    }

    pub fn remaining_events(&self) -> usize {
        self.queue.len()
    }

    pub fn state(&self) -> &SimState {
        &self.state
    }

    /// Snapshot of the per-chain congestion statistics.
    pub fn export_report(&self) -> SimulationReport {
        let chains: Vec<ChainReport> = self
            .state
            .chains()
            .map(|chain| ChainReport {
                chain: chain.id().clone(),
                height: chain.height(),
                max_tx_count: chain.max_tx_count(),
                total_tx: chain.total_tx(),
            })
            .collect();

        let mut most_congested: Option<&ChainReport> = None;
        for report in &chains {
            if most_congested.is_none_or(|m| report.max_tx_count > m.max_tx_count) {
                most_congested = Some(report);
            }
        }

        SimulationReport {
            params: self.params.clone(),
            duration_ms: self.state.now(),
            total_tx: chains.iter().map(|c| c.total_tx).sum(),
            most_congested: most_congested.cloned(),
            chains,
        }
    }
}
