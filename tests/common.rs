//! Test harness for multi-robot exchange rounds.
//!
//! Robots share one in-process bus; the harness plays the transport and the
//! discovery service, pumping served sub-graphs between managers.

#![allow(dead_code)]

use crossbeam_channel::Receiver;
use sangha_slam::io::messages::{decode, InterRobotLoopClosure, KeyframeOdom, RobotIds};
use sangha_slam::io::topics;
use sangha_slam::{Config, Envelope, LocalBus, MessageBus, Pose3D, PoseGraphManager};
use std::sync::Arc;

/// One robot under test.
pub struct TestRobot {
    pub id: u32,
    pub mgr: PoseGraphManager,
    request_rx: Receiver<Envelope>,
    graph_rx: Receiver<Envelope>,
}

/// A fleet of managers wired to a shared bus.
pub struct Fleet {
    pub bus: Arc<LocalBus>,
    pub robots: Vec<TestRobot>,
}

impl Fleet {
    /// Create `nb_robots` managers sharing one bus.
    pub fn new(nb_robots: u32) -> Self {
        let bus = Arc::new(LocalBus::new());
        let robots = (0..nb_robots)
            .map(|id| {
                let mut config = Config::default();
                config.fleet.nb_robots = nb_robots;
                config.fleet.robot_id = id;
                config.backend.max_waiting_time_sec = 5;
                TestRobot {
                    id,
                    mgr: PoseGraphManager::new(&config, bus.clone()),
                    request_rx: bus.subscribe(&topics::get_pose_graph(id)),
                    graph_rx: bus.subscribe(topics::POSE_GRAPH),
                }
            })
            .collect();
        Self { bus, robots }
    }

    /// Feed a straight-line trajectory of `keyframes` poses to one robot.
    pub fn feed_trajectory(&mut self, robot: u32, keyframes: u32) {
        for i in 0..keyframes {
            self.robots[robot as usize]
                .mgr
                .handle_keyframe_odom(&KeyframeOdom {
                    id: i,
                    odom: Pose3D::from_translation(i as f64, 0.0, 0.0),
                })
                .unwrap();
        }
    }

    /// Deliver a successful identity loop closure to a subset of robots.
    pub fn deliver_closure(
        &mut self,
        from: (u32, u32),
        to: (u32, u32),
        recipients: &[u32],
    ) {
        let msg = InterRobotLoopClosure {
            success: true,
            robot0_id: from.0,
            robot0_keyframe_id: from.1,
            robot1_id: to.0,
            robot1_keyframe_id: to.1,
            transform: Pose3D::identity(),
        };
        for &id in recipients {
            self.robots[id as usize].mgr.handle_loop_closure(&msg);
        }
    }

    /// Shuttle served sub-graphs between managers until the bus is quiet.
    pub fn pump(&mut self) {
        loop {
            let mut activity = false;
            for robot in &mut self.robots {
                while let Ok(env) = robot.request_rx.try_recv() {
                    let msg: RobotIds = decode(&env.payload).unwrap();
                    robot.mgr.handle_graph_request(&msg);
                    activity = true;
                }
                while let Ok(env) = robot.graph_rx.try_recv() {
                    robot.mgr.handle_pose_graph(decode(&env.payload).unwrap());
                    activity = true;
                }
            }
            if !activity {
                break;
            }
        }
    }
}
