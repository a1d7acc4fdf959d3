//! Wire message types and their encoding.
//!
//! Messages are postcard-encoded. A pose crosses the wire as the 7-tuple
//! `[tx, ty, tz, qx, qy, qz, qw]` and a between-factor as
//! `(from_key, to_key, measured_pose, 6-sigma vector)`, byte-compatible
//! with the fleet's common interfaces.

use crate::core::types::Pose3D;
use crate::engine::state::OptimizerState;
use crate::graph::{Factor, PoseEstimates};
use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Wire encode/decode errors.
#[derive(Debug, Error)]
pub enum WireError {
    /// Message could not be encoded.
    #[error("encode failed: {0}")]
    Encode(String),
    /// Payload could not be decoded.
    #[error("decode failed: {0}")]
    Decode(String),
}

/// Encode a message for the wire.
pub fn encode<T: Serialize>(msg: &T) -> Result<Vec<u8>, WireError> {
    postcard::to_allocvec(msg).map_err(|e| WireError::Encode(e.to_string()))
}

/// Decode a message from a wire payload.
pub fn decode<T: for<'de> Deserialize<'de>>(bytes: &[u8]) -> Result<T, WireError> {
    postcard::from_bytes(bytes).map_err(|e| WireError::Decode(e.to_string()))
}

/// One keyframe from the odometry front-end.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct KeyframeOdom {
    /// Monotonically increasing keyframe id.
    pub id: u32,
    /// Pose in the odometry frame.
    pub odom: Pose3D,
}

/// An inter-robot loop-closure detection.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct InterRobotLoopClosure {
    /// Whether geometric verification succeeded.
    pub success: bool,
    /// First robot id.
    pub robot0_id: u32,
    /// Keyframe of the first robot.
    pub robot0_keyframe_id: u32,
    /// Second robot id.
    pub robot1_id: u32,
    /// Keyframe of the second robot.
    pub robot1_keyframe_id: u32,
    /// Measured transform from the first frame to the second.
    pub transform: Pose3D,
}

/// A list of robot ids.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct RobotIds {
    /// The ids.
    pub ids: Vec<u32>,
}

/// Empty trigger for the neighbor-discovery service.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct NeighborsQuery;

/// A robot's sub-graph, served in response to a graph request.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PoseGraphMsg {
    /// The serving robot.
    pub robot_id: u32,
    /// Snapshot of the serving robot's pose estimates.
    pub values: PoseEstimates,
    /// Odometry edges plus the loop-closure pairs this robot owns.
    pub edges: Vec<Factor>,
    /// Robots the server declares loop-closure incidence with.
    pub connected_robots: Vec<u32>,
}

/// Outcome of one optimization round (monitoring only).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct OptimizationResultMsg {
    /// The optimizing robot.
    pub robot_id: u32,
    /// Whether the solve converged.
    pub success: bool,
    /// The aggregated factors that were solved.
    pub factors: Vec<Factor>,
    /// The optimized estimates.
    pub estimates: PoseEstimates,
}

/// Current state-machine state (monitoring only).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct OptimizerStateMsg {
    /// The reporting robot.
    pub robot_id: u32,
    /// Its current state.
    pub state: OptimizerState,
}
