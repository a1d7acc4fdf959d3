//! Topic names for the fleet's publish/subscribe fabric.
//!
//! Per-robot topics live under a `/r<id>/` namespace; fleet-wide topics are
//! shared by every robot.

/// Fleet-wide loop-closure detections.
pub const INTER_ROBOT_LOOP_CLOSURE: &str = "/inter_robot_loop_closure";

/// Fleet-wide sub-graph responses.
pub const POSE_GRAPH: &str = "/pose_graph";

/// Keyframe odometry stream for one robot.
pub fn keyframe_odom(robot: u32) -> String {
    format!("/r{robot}/keyframe_odom")
}

/// Neighbor-discovery responses for one robot.
pub fn current_neighbors(robot: u32) -> String {
    format!("/r{robot}/current_neighbors")
}

/// Trigger for the external discovery service.
pub fn get_current_neighbors(robot: u32) -> String {
    format!("/r{robot}/get_current_neighbors")
}

/// Sub-graph requests addressed to one robot.
pub fn get_pose_graph(robot: u32) -> String {
    format!("/r{robot}/get_pose_graph")
}

/// Optimization results published by one robot (monitoring).
pub fn optimization_result(robot: u32) -> String {
    format!("/r{robot}/optimization_result")
}

/// State-machine state published by one robot (monitoring).
pub fn optimizer_state(robot: u32) -> String {
    format!("/r{robot}/optimizer_state")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_per_robot_namespacing() {
        assert_eq!(keyframe_odom(0), "/r0/keyframe_odom");
        assert_eq!(get_pose_graph(3), "/r3/get_pose_graph");
        assert_ne!(current_neighbors(0), current_neighbors(1));
    }
}
