//! Local trajectory accumulation from keyframe odometry.

use super::factor::{BetweenFactor, NoiseModel};
use super::values::PoseEstimates;
use super::GraphError;
use crate::core::types::{Pose3D, PoseKey};

/// A single robot's own trajectory: odometry edges plus absolute estimates.
///
/// The edge list stores relative measurements between consecutive keyframes;
/// the estimate map holds the absolute poses used as the optimizer's initial
/// guess. Both grow monotonically for the robot's lifetime.
#[derive(Debug)]
pub struct LocalTrajectory {
    robot: u32,
    noise: NoiseModel,
    odometry: Vec<BetweenFactor>,
    estimates: PoseEstimates,
    latest: Option<(PoseKey, Pose3D)>,
}

impl LocalTrajectory {
    /// Create an empty trajectory for `robot`.
    pub fn new(robot: u32, noise: NoiseModel) -> Self {
        Self {
            robot,
            noise,
            odometry: Vec::new(),
            estimates: PoseEstimates::new(),
            latest: None,
        }
    }

    /// Ingest one keyframe odometry event.
    ///
    /// Stores the absolute pose under the keyframe's key and, from the second
    /// keyframe on, appends the relative measurement
    /// `pose ∘ latest⁻¹` as an odometry edge. A keyframe index that was
    /// already ingested is rejected without mutating any state.
    pub fn insert_keyframe(&mut self, index: u32, pose: Pose3D) -> Result<PoseKey, GraphError> {
        let key = PoseKey::new(self.robot, index);
        self.estimates.insert(key, pose)?;

        if let Some((prev_key, prev_pose)) = self.latest {
            let odom_diff = pose.compose(&prev_pose.inverse());
            self.odometry
                .push(BetweenFactor::new(prev_key, key, odom_diff, self.noise));
        }

        self.latest = Some((key, pose));
        Ok(key)
    }

    /// Odometry edges in insertion order.
    pub fn factors(&self) -> &[BetweenFactor] {
        &self.odometry
    }

    /// Absolute pose estimates.
    pub fn estimates(&self) -> &PoseEstimates {
        &self.estimates
    }

    /// Key and pose of the most recent keyframe.
    pub fn latest(&self) -> Option<&(PoseKey, Pose3D)> {
        self.latest.as_ref()
    }
}
