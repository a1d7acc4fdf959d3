//! Pose estimate storage keyed by variable identifiers.

use super::GraphError;
use crate::core::types::{Pose3D, PoseKey};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// Map of pose variables to their current absolute estimates.
///
/// Keys are unique; a duplicate insert is an invariant violation and is
/// rejected without mutating the map.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct PoseEstimates {
    poses: BTreeMap<PoseKey, Pose3D>,
}

impl PoseEstimates {
    /// Create an empty estimate map.
    pub fn new() -> Self {
        Self::default()
    }

    /// Insert an estimate. Rejects keys that are already present.
    pub fn insert(&mut self, key: PoseKey, pose: Pose3D) -> Result<(), GraphError> {
        if self.poses.contains_key(&key) {
            return Err(GraphError::DuplicateKey(key));
        }
        self.poses.insert(key, pose);
        Ok(())
    }

    /// Overwrite or insert an estimate.
    pub fn update(&mut self, key: PoseKey, pose: Pose3D) {
        self.poses.insert(key, pose);
    }

    /// Estimate for `key`, if present.
    pub fn get(&self, key: &PoseKey) -> Option<&Pose3D> {
        self.poses.get(key)
    }

    /// Whether `key` has an estimate.
    pub fn contains(&self, key: &PoseKey) -> bool {
        self.poses.contains_key(key)
    }

    /// Number of estimates.
    pub fn len(&self) -> usize {
        self.poses.len()
    }

    /// Whether the map is empty.
    pub fn is_empty(&self) -> bool {
        self.poses.is_empty()
    }

    /// Iterate estimates in key order.
    pub fn iter(&self) -> impl Iterator<Item = (&PoseKey, &Pose3D)> {
        self.poses.iter()
    }

    /// Iterate keys in order.
    pub fn keys(&self) -> impl Iterator<Item = &PoseKey> {
        self.poses.keys()
    }
}
