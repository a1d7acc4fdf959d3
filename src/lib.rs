//! SanghaSLAM - Distributed pose-graph back-end for collaborative SLAM fleets
//!
//! Each robot runs one back-end that ingests keyframe odometry, stores
//! inter-robot loop closures, and periodically cooperates with its current
//! neighbors to produce a jointly optimized estimate of all involved
//! trajectories. Rounds tolerate message loss by timeout, not consensus.
//!
//! # Architecture
//!
//! The crate is organized into 5 logical layers:
//!
//! ```text
//! ┌─────────────────────────────────────────────────────┐
//! │                    threads/                         │  ← Dispatch
//! │              (backend select! loop)                 │
//! └─────────────────────────────────────────────────────┘
//!                          │
//! ┌─────────────────────────────────────────────────────┐
//! │                      io/                            │  ← Infrastructure
//! │          (messages, topics, bus, udp)               │
//! └─────────────────────────────────────────────────────┘
//!                          │
//! ┌─────────────────────────────────────────────────────┐
//! │                    engine/                          │  ← Orchestration
//! │        (state machine, exchange, manager)           │
//! └─────────────────────────────────────────────────────┘
//!                          │
//! ┌─────────────────────────────────────────────────────┐
//! │                    graph/                           │  ← Core algorithms
//! │   (factors, trajectory, connectivity, optimizer)    │
//! └─────────────────────────────────────────────────────┘
//!                          │
//! ┌─────────────────────────────────────────────────────┐
//! │                     core/                           │  ← Foundation
//! │                (types, math)                        │
//! └─────────────────────────────────────────────────────┘
//! ```
//!
//! # A round
//!
//! From `Idle`, the trigger tick requests the current neighbor set and
//! waits. The discovery response moves the round to collection; the next
//! loop tick sends each neighbor a sub-graph request scoped to
//! `neighbors ∪ {self}` and waits again. When every neighbor has answered,
//! the manager resolves which robots are transitively connected to itself
//! through loop-closure declarations, aggregates the connected sub-graphs
//! into one joint factor graph, anchors it, and solves with graduated
//! non-convexity wrapping Levenberg-Marquardt. The result is published for
//! monitoring and the round returns to `Idle`. Any wait that exceeds the
//! configured deadline aborts the round.

// Layer 1: Core foundation (no internal deps)
pub mod core;

// Layer 2: Graph algorithms (depends on core)
pub mod graph;

// Layer 3: Orchestration (depends on core, graph, io)
pub mod engine;

// Layer 4: I/O infrastructure
pub mod io;

// Layer 5: Thread dispatch
pub mod threads;

// Configuration
pub mod config;

// ============================================================================
// Convenience re-exports (flat namespace for common use)
// ============================================================================

pub use crate::config::{Config, ConfigError};
pub use crate::core::types::{Pose3D, PoseKey};
pub use crate::engine::{OptimizerState, PoseGraphManager};
pub use crate::graph::{
    BetweenFactor, Factor, GraphOptimizer, InterRobotLoopStore, LocalTrajectory,
    NoiseModel, OptimizationOutcome, OptimizerConfig, PoseEstimates, PriorFactor,
};
pub use crate::io::{Envelope, LocalBus, MessageBus, UdpTransport};
pub use crate::threads::BackendThread;
