//! Round-scoped exchange state.
//!
//! Everything here is private to one in-flight optimization round and is
//! cleared when the next round starts. Recording a received sub-graph sets
//! the receipt flag, the graph, and the declaration together, so a set flag
//! always implies the other two are present.

use crate::graph::ReceivedGraph;
use std::collections::BTreeMap;

/// Exchange bookkeeping for one optimization round.
#[derive(Debug, Default)]
pub struct ExchangeState {
    nb_robots: u32,
    current_neighbors: Vec<u32>,
    received_flags: BTreeMap<u32, bool>,
    received: BTreeMap<u32, ReceivedGraph>,
}

impl ExchangeState {
    /// Create exchange state for a fleet of `nb_robots`.
    pub fn new(nb_robots: u32) -> Self {
        let mut state = Self {
            nb_robots,
            ..Self::default()
        };
        state.reset();
        state
    }

    /// Clear all per-round state. Neighbor ids persist until the next
    /// discovery response replaces them.
    pub fn reset(&mut self) {
        for id in 0..self.nb_robots {
            self.received_flags.insert(id, false);
        }
        self.received.clear();
    }

    /// Replace the current neighbor set.
    pub fn set_neighbors(&mut self, ids: Vec<u32>) {
        self.current_neighbors = ids;
    }

    /// Robots currently reachable.
    pub fn neighbors(&self) -> &[u32] {
        &self.current_neighbors
    }

    /// Record a received sub-graph and mark its sender.
    pub fn record(&mut self, robot_id: u32, graph: ReceivedGraph) {
        self.received.insert(robot_id, graph);
        self.received_flags.insert(robot_id, true);
    }

    /// Whether every current neighbor's sub-graph has arrived.
    pub fn all_received(&self) -> bool {
        self.current_neighbors
            .iter()
            .all(|id| self.received_flags.get(id).copied().unwrap_or(false))
    }

    /// Received sub-graphs by sender.
    pub fn received(&self) -> &BTreeMap<u32, ReceivedGraph> {
        &self.received
    }

    /// Connectivity declarations extracted from received sub-graphs.
    pub fn declarations(&self) -> BTreeMap<u32, Vec<u32>> {
        self.received
            .iter()
            .map(|(id, graph)| (*id, graph.declared.clone()))
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_all_received_empty_neighbors() {
        let state = ExchangeState::new(3);
        assert!(state.all_received());
    }

    #[test]
    fn test_all_received_tracks_neighbors() {
        let mut state = ExchangeState::new(3);
        state.set_neighbors(vec![1, 2]);
        assert!(!state.all_received());
        state.record(1, ReceivedGraph::default());
        assert!(!state.all_received());
        state.record(2, ReceivedGraph::default());
        assert!(state.all_received());
    }

    #[test]
    fn test_reset_clears_receipts_keeps_neighbors() {
        let mut state = ExchangeState::new(2);
        state.set_neighbors(vec![1]);
        state.record(1, ReceivedGraph::default());
        state.reset();
        assert!(!state.all_received());
        assert!(state.received().is_empty());
        assert_eq!(state.neighbors(), &[1]);
    }

    #[test]
    fn test_flag_implies_graph_present() {
        let mut state = ExchangeState::new(2);
        state.set_neighbors(vec![1]);
        state.record(1, ReceivedGraph::default());
        assert!(state.all_received());
        assert!(state.received().contains_key(&1));
        assert!(state.declarations().contains_key(&1));
    }
}
