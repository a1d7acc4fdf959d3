//! Foundation types shared across the crate.

mod key;
mod pose;

pub use key::{label_to_robot, robot_label, PoseKey, POSE_TAG};
pub use pose::Pose3D;
