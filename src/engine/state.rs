//! Optimizer state machine states.

use serde::{Deserialize, Serialize};
use std::fmt;

/// State of the per-robot optimization round.
///
/// `Idle` is the only state a new round starts from. A round moves through
/// `Waiting` (discovery), `Collecting` (graph requests sent), `Waiting`
/// again (responses pending), and `Optimizing`, then returns to `Idle`.
/// Timeouts abort any wait straight back to `Idle`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum OptimizerState {
    /// No round in progress.
    #[default]
    Idle,
    /// Waiting on an external response, subject to the round deadline.
    Waiting,
    /// Neighbors known; sub-graph requests go out on the next loop tick.
    Collecting,
    /// All sub-graphs received; optimization runs on the next loop tick.
    Optimizing,
}

impl fmt::Display for OptimizerState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            OptimizerState::Idle => "idle",
            OptimizerState::Waiting => "waiting",
            OptimizerState::Collecting => "collecting",
            OptimizerState::Optimizing => "optimizing",
        };
        f.write_str(name)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_is_idle() {
        assert_eq!(OptimizerState::default(), OptimizerState::Idle);
    }

    #[test]
    fn test_display() {
        assert_eq!(OptimizerState::Optimizing.to_string(), "optimizing");
    }
}
