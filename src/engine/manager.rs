//! The per-robot pose-graph manager.
//!
//! A distributed state machine that accumulates the local trajectory and the
//! fleet's loop closures, and periodically runs an exchange round with its
//! current neighbors: request neighbors, request sub-graphs, resolve
//! connectivity, aggregate, optimize, publish. Rounds tolerate message loss
//! by a hard wait deadline; nothing here is fatal to the process.
//!
//! All handlers and both tick handlers must be called from a single thread
//! (the backend thread); no handler suspends internally.

use super::exchange::ExchangeState;
use super::state::OptimizerState;
use crate::config::Config;
use crate::core::types::{Pose3D, PoseKey};
use crate::graph::{
    aggregate, connected_robots, Factor, GraphError, GraphOptimizer, InterRobotLoopStore,
    LocalTrajectory, NoiseModel, OptimizerConfig, PriorFactor, ReceivedGraph,
};
use crate::io::messages::{
    InterRobotLoopClosure, KeyframeOdom, NeighborsQuery, OptimizationResultMsg,
    OptimizerStateMsg, PoseGraphMsg, RobotIds,
};
use crate::io::{encode, topics, Envelope, MessageBus};
use serde::Serialize;
use std::sync::Arc;
use std::time::{Duration, Instant};

/// Per-robot pose-graph back-end.
pub struct PoseGraphManager {
    robot_id: u32,
    max_waiting: Duration,
    noise: NoiseModel,
    trajectory: LocalTrajectory,
    loop_store: InterRobotLoopStore,
    exchange: ExchangeState,
    state: OptimizerState,
    wait_started: Option<Instant>,
    optimizer: GraphOptimizer,
    bus: Arc<dyn MessageBus>,
}

impl PoseGraphManager {
    /// Create a manager from configuration and a bus handle.
    pub fn new(config: &Config, bus: Arc<dyn MessageBus>) -> Self {
        let noise = NoiseModel::from_stddev(
            config.noise.rotation_std,
            config.noise.translation_std,
        );
        Self {
            robot_id: config.fleet.robot_id,
            max_waiting: Duration::from_secs(config.backend.max_waiting_time_sec),
            noise,
            trajectory: LocalTrajectory::new(config.fleet.robot_id, noise),
            loop_store: InterRobotLoopStore::new(config.fleet.nb_robots),
            exchange: ExchangeState::new(config.fleet.nb_robots),
            state: OptimizerState::Idle,
            wait_started: None,
            optimizer: GraphOptimizer::new(OptimizerConfig::default()),
            bus,
        }
    }

    /// Current state-machine state.
    pub fn state(&self) -> OptimizerState {
        self.state
    }

    /// The local trajectory.
    pub fn trajectory(&self) -> &LocalTrajectory {
        &self.trajectory
    }

    /// Ingest one keyframe odometry event.
    pub fn handle_keyframe_odom(&mut self, msg: &KeyframeOdom) -> Result<(), GraphError> {
        let key = self.trajectory.insert_keyframe(msg.id, msg.odom)?;
        log::trace!("keyframe {key} ingested");
        Ok(())
    }

    /// Ingest an inter-robot loop-closure detection.
    ///
    /// Unsuccessful detections are dropped, keeping only a counter.
    pub fn handle_loop_closure(&mut self, msg: &InterRobotLoopClosure) {
        if !msg.success {
            self.loop_store.note_rejected();
            return;
        }
        self.loop_store.record(
            msg.robot0_id,
            msg.robot0_keyframe_id,
            msg.robot1_id,
            msg.robot1_keyframe_id,
            msg.transform,
            self.noise,
        );
        log::debug!(
            "loop closure stored for pair {{{}, {}}} ({} total)",
            msg.robot0_id.min(msg.robot1_id),
            msg.robot0_id.max(msg.robot1_id),
            self.loop_store.accepted()
        );
    }

    /// Neighbor-discovery response: the round moves to collection.
    pub fn handle_current_neighbors(&mut self, msg: &RobotIds) {
        self.exchange.set_neighbors(msg.ids.clone());
        self.state = OptimizerState::Collecting;
        self.end_waiting();
    }

    /// Serve a sub-graph request scoped to `msg.ids`.
    ///
    /// The response carries the full estimate snapshot, the odometry edges
    /// plus the loop-closure pairs this robot owns within the scope, and the
    /// connectivity declaration computed from the local store.
    pub fn handle_graph_request(&mut self, msg: &RobotIds) {
        let mut edges: Vec<Factor> = self
            .trajectory
            .factors()
            .iter()
            .map(|f| Factor::Between(*f))
            .collect();
        edges.extend(
            self.loop_store
                .edges_owned_by(self.robot_id, &msg.ids)
                .into_iter()
                .map(Factor::Between),
        );

        let response = PoseGraphMsg {
            robot_id: self.robot_id,
            values: self.trajectory.estimates().clone(),
            edges,
            connected_robots: self.loop_store.connected_within(&msg.ids),
        };
        self.publish(topics::POSE_GRAPH.to_string(), &response);
    }

    /// Record a received sub-graph; once every neighbor has answered, the
    /// round moves to optimization.
    pub fn handle_pose_graph(&mut self, msg: PoseGraphMsg) {
        self.exchange.record(
            msg.robot_id,
            ReceivedGraph {
                edges: msg.edges,
                values: msg.values,
                declared: msg.connected_robots,
            },
        );
        if self.exchange.all_received() {
            self.end_waiting();
            self.state = OptimizerState::Optimizing;
        }
    }

    /// Trigger tick: start a new round if idle.
    pub fn handle_trigger_tick(&mut self, now: Instant) {
        if self.state == OptimizerState::Idle {
            self.exchange.reset();
            self.publish(
                topics::get_current_neighbors(self.robot_id),
                &NeighborsQuery,
            );
            self.start_waiting(now);
        }
    }

    /// Loop tick: advance an in-progress round and publish the state.
    pub fn handle_loop_tick(&mut self, now: Instant) {
        if !self.trajectory.estimates().is_empty() {
            match self.state {
                OptimizerState::Collecting => {
                    if self.exchange.neighbors().is_empty() {
                        // Nothing to co-optimize.
                        self.state = OptimizerState::Idle;
                    } else {
                        self.request_neighbor_graphs();
                        self.start_waiting(now);
                    }
                }
                OptimizerState::Optimizing => {
                    self.perform_optimization();
                    self.state = OptimizerState::Idle;
                }
                OptimizerState::Waiting => {
                    self.check_waiting_timeout(now);
                }
                OptimizerState::Idle => {}
            }
        }
        self.publish(
            topics::optimizer_state(self.robot_id),
            &OptimizerStateMsg {
                robot_id: self.robot_id,
                state: self.state,
            },
        );
    }

    fn request_neighbor_graphs(&mut self) {
        let mut scope = self.exchange.neighbors().to_vec();
        scope.push(self.robot_id);
        let request = RobotIds { ids: scope };
        for &neighbor in self.exchange.neighbors() {
            self.publish(topics::get_pose_graph(neighbor), &request);
        }
        log::debug!(
            "requested sub-graphs from {} neighbors",
            self.exchange.neighbors().len()
        );
    }

    fn perform_optimization(&mut self) {
        let neighbors = self.exchange.neighbors().to_vec();
        let mut scope = neighbors.clone();
        scope.push(self.robot_id);

        // Self's connectivity declaration joins the received ones.
        let mut declarations = self.exchange.declarations();
        declarations.insert(self.robot_id, self.loop_store.connected_within(&scope));
        let is_connected = connected_robots(self.robot_id, &neighbors, &declarations);

        let (mut factors, estimates) = match aggregate(
            self.robot_id,
            &self.trajectory,
            &self.loop_store,
            &neighbors,
            self.exchange.received(),
            &is_connected,
        ) {
            Ok(joint) => joint,
            Err(e) => {
                log::warn!("aggregation failed, aborting round: {e}");
                return;
            }
        };

        // Anchor gauge freedom at this robot's first keyframe.
        factors.push(Factor::Prior(PriorFactor {
            key: PoseKey::new(self.robot_id, 0),
            pose: Pose3D::identity(),
            noise: self.noise,
        }));

        let outcome = self.optimizer.optimize(&factors, &estimates);
        log::info!(
            "optimization finished: {:?} after {} iterations, error {:.3e} -> {:.3e}",
            outcome.termination,
            outcome.iterations,
            outcome.initial_error,
            outcome.final_error
        );

        self.publish(
            topics::optimization_result(self.robot_id),
            &OptimizationResultMsg {
                robot_id: self.robot_id,
                success: outcome.converged,
                factors,
                estimates: outcome.estimates,
            },
        );
    }

    fn start_waiting(&mut self, now: Instant) {
        self.state = OptimizerState::Waiting;
        self.wait_started = Some(now);
    }

    fn end_waiting(&mut self) {
        self.wait_started = None;
    }

    fn check_waiting_timeout(&mut self, now: Instant) {
        let expired = self
            .wait_started
            .map_or(true, |started| now.duration_since(started) > self.max_waiting);
        if expired {
            log::warn!("round timed out after {:?}", self.max_waiting);
            self.end_waiting();
            self.state = OptimizerState::Idle;
        }
    }

    fn publish<T: Serialize>(&self, topic: String, msg: &T) {
        match encode(msg) {
            Ok(payload) => self.bus.publish(Envelope::new(topic, payload)),
            Err(e) => log::error!("failed to encode message for {topic}: {e}"),
        }
    }
}
