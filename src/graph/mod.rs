//! Factor-graph layer: factors, estimates, trajectory accumulation,
//! loop-closure storage, connectivity, aggregation, and optimization.

pub mod aggregator;
pub mod connectivity;
pub mod factor;
pub mod loop_store;
pub mod optimizer;
pub mod trajectory;
pub mod values;

use crate::core::types::PoseKey;
use thiserror::Error;

/// Errors from graph and estimate manipulation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
pub enum GraphError {
    /// An estimate for the key is already present.
    #[error("estimate for {0} already present")]
    DuplicateKey(PoseKey),
}

pub use aggregator::{aggregate, ReceivedGraph};
pub use connectivity::connected_robots;
pub use factor::{BetweenFactor, Factor, NoiseModel, PriorFactor};
pub use loop_store::InterRobotLoopStore;
pub use optimizer::{
    GraphOptimizer, OptimizationOutcome, OptimizerConfig, TerminationReason,
};
pub use trajectory::LocalTrajectory;
pub use values::PoseEstimates;
