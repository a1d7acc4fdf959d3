//! Store of accepted inter-robot loop closures, keyed by robot pair.

use super::factor::{BetweenFactor, NoiseModel};
use crate::core::math::sorted_pair;
use crate::core::types::{Pose3D, PoseKey};
use std::collections::{BTreeMap, BTreeSet};

/// Accepted inter-robot loop-closure factors grouped by unordered robot pair.
///
/// Every pair `{i, j}` with `i < j < nb_robots` starts with an empty list.
/// The store grows monotonically; closures are never pruned.
#[derive(Debug)]
pub struct InterRobotLoopStore {
    closures: BTreeMap<(u32, u32), Vec<BetweenFactor>>,
    accepted: u64,
    rejected: u64,
}

impl InterRobotLoopStore {
    /// Create a store pre-initialized for a fleet of `nb_robots`.
    pub fn new(nb_robots: u32) -> Self {
        let mut closures = BTreeMap::new();
        for i in 0..nb_robots {
            for j in (i + 1)..nb_robots {
                closures.insert((i, j), Vec::new());
            }
        }
        Self {
            closures,
            accepted: 0,
            rejected: 0,
        }
    }

    /// Record an accepted loop closure between two robots' keyframes.
    ///
    /// The factor keeps the detector's direction (`robot0 → robot1`); the
    /// store key is the sorted pair.
    pub fn record(
        &mut self,
        robot0: u32,
        keyframe0: u32,
        robot1: u32,
        keyframe1: u32,
        transform: Pose3D,
        noise: NoiseModel,
    ) {
        let factor = BetweenFactor::new(
            PoseKey::new(robot0, keyframe0),
            PoseKey::new(robot1, keyframe1),
            transform,
            noise,
        );
        self.closures
            .entry(sorted_pair(robot0, robot1))
            .or_default()
            .push(factor);
        self.accepted += 1;
    }

    /// Count a rejected (unsuccessful) closure for observability.
    pub fn note_rejected(&mut self) {
        self.rejected += 1;
    }

    /// Closures stored for the unordered pair `{a, b}`.
    pub fn pair(&self, a: u32, b: u32) -> &[BetweenFactor] {
        self.closures
            .get(&sorted_pair(a, b))
            .map(Vec::as_slice)
            .unwrap_or(&[])
    }

    /// Connectivity declaration over a set of robot ids.
    ///
    /// For every pair `{i, j}` drawn from `ids`, if this store holds a
    /// closure for the pair, the larger id is included. This is the list a
    /// robot publishes with its sub-graph, and the list the resolver seeds
    /// for the local robot.
    pub fn connected_within(&self, ids: &[u32]) -> Vec<u32> {
        let mut connected = BTreeSet::new();
        for (n, &a) in ids.iter().enumerate() {
            for &b in &ids[n + 1..] {
                let (min_id, max_id) = sorted_pair(a, b);
                if !self.pair(min_id, max_id).is_empty() {
                    connected.insert(max_id);
                }
            }
        }
        connected.into_iter().collect()
    }

    /// Closures this robot ships when serving a sub-graph request.
    ///
    /// Only pairs where `self_id` is the smaller id are included, so each
    /// pair is served by exactly one robot and the joint union carries no
    /// duplicates.
    pub fn edges_owned_by(&self, self_id: u32, ids: &[u32]) -> Vec<BetweenFactor> {
        let mut edges = Vec::new();
        for (n, &a) in ids.iter().enumerate() {
            for &b in &ids[n + 1..] {
                let (min_id, max_id) = sorted_pair(a, b);
                if min_id == self_id {
                    edges.extend_from_slice(self.pair(min_id, max_id));
                }
            }
        }
        edges
    }

    /// Number of accepted closures.
    pub fn accepted(&self) -> u64 {
        self.accepted
    }

    /// Number of rejected closures.
    pub fn rejected(&self) -> u64 {
        self.rejected
    }
}
