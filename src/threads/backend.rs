//! Backend thread: serialized dispatch of messages and timers.
//!
//! All manager callbacks and both periodic ticks run on this one thread, so
//! every state transition observes a consistent snapshot. Incoming topics
//! arrive on crossbeam channels; the two tickers drive round progress.

use crate::config::Config;
use crate::engine::PoseGraphManager;
use crate::io::messages::{
    decode, InterRobotLoopClosure, KeyframeOdom, PoseGraphMsg, RobotIds,
};
use crate::io::{topics, MessageBus};
use crossbeam_channel::{select, tick};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::thread::{self, JoinHandle};
use std::time::Duration;

/// Handle to the spawned backend thread.
pub struct BackendThread {
    handle: JoinHandle<()>,
}

impl BackendThread {
    /// Spawn the backend thread.
    pub fn spawn(
        config: Config,
        bus: Arc<dyn MessageBus>,
        running: Arc<AtomicBool>,
    ) -> Self {
        let handle = thread::Builder::new()
            .name("pose-graph-backend".into())
            .spawn(move || run(config, bus, running))
            .expect("Failed to spawn backend thread");
        Self { handle }
    }

    /// Wait for the thread to finish.
    pub fn join(self) -> thread::Result<()> {
        self.handle.join()
    }
}

fn run(config: Config, bus: Arc<dyn MessageBus>, running: Arc<AtomicBool>) {
    let robot = config.fleet.robot_id;
    let odom_rx = bus.subscribe(&topics::keyframe_odom(robot));
    let closure_rx = bus.subscribe(topics::INTER_ROBOT_LOOP_CLOSURE);
    let neighbors_rx = bus.subscribe(&topics::current_neighbors(robot));
    let request_rx = bus.subscribe(&topics::get_pose_graph(robot));
    let graph_rx = bus.subscribe(topics::POSE_GRAPH);

    let trigger = tick(Duration::from_millis(config.backend.process_period_ms));
    let loop_tick = tick(Duration::from_millis(
        config.backend.optimization_loop_period_ms,
    ));

    let mut manager = PoseGraphManager::new(&config, bus);
    log::info!("pose-graph backend ready (robot {robot})");

    while running.load(Ordering::Relaxed) {
        select! {
            recv(odom_rx) -> env => {
                let Ok(env) = env else { break };
                match decode::<KeyframeOdom>(&env.payload) {
                    Ok(msg) => {
                        if let Err(e) = manager.handle_keyframe_odom(&msg) {
                            log::warn!("keyframe {} dropped: {e}", msg.id);
                        }
                    }
                    Err(e) => log::warn!("bad keyframe_odom payload: {e}"),
                }
            }
            recv(closure_rx) -> env => {
                let Ok(env) = env else { break };
                match decode::<InterRobotLoopClosure>(&env.payload) {
                    Ok(msg) => manager.handle_loop_closure(&msg),
                    Err(e) => log::warn!("bad loop closure payload: {e}"),
                }
            }
            recv(neighbors_rx) -> env => {
                let Ok(env) = env else { break };
                match decode::<RobotIds>(&env.payload) {
                    Ok(msg) => manager.handle_current_neighbors(&msg),
                    Err(e) => log::warn!("bad current_neighbors payload: {e}"),
                }
            }
            recv(request_rx) -> env => {
                let Ok(env) = env else { break };
                match decode::<RobotIds>(&env.payload) {
                    Ok(msg) => manager.handle_graph_request(&msg),
                    Err(e) => log::warn!("bad get_pose_graph payload: {e}"),
                }
            }
            recv(graph_rx) -> env => {
                let Ok(env) = env else { break };
                match decode::<PoseGraphMsg>(&env.payload) {
                    Ok(msg) => manager.handle_pose_graph(msg),
                    Err(e) => log::warn!("bad pose_graph payload: {e}"),
                }
            }
            recv(trigger) -> at => {
                if let Ok(at) = at {
                    manager.handle_trigger_tick(at);
                }
            }
            recv(loop_tick) -> at => {
                if let Ok(at) = at {
                    manager.handle_loop_tick(at);
                }
            }
            default(Duration::from_millis(100)) => {}
        }
    }

    log::info!("backend thread stopping");
}
