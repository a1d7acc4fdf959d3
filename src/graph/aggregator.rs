//! Joint graph assembly from local and received sub-graphs.

use super::factor::Factor;
use super::loop_store::InterRobotLoopStore;
use super::trajectory::LocalTrajectory;
use super::values::PoseEstimates;
use super::GraphError;
use crate::core::math::sorted_pair;
use std::collections::BTreeMap;

/// One neighbor's sub-graph snapshot as received over the wire.
#[derive(Debug, Clone, Default)]
pub struct ReceivedGraph {
    /// The neighbor's serialized factors.
    pub edges: Vec<Factor>,
    /// The neighbor's pose estimates.
    pub values: PoseEstimates,
    /// Robots the neighbor declares loop-closure incidence with.
    pub declared: Vec<u32>,
}

/// Merge the local graph with received neighbor graphs under a connectivity
/// mask, producing an owned joint graph and estimate set.
///
/// Factors whose endpoints cross into a robot not marked connected are
/// dropped, as are received factors that are not between-factors. A key
/// collision is tolerated only when a neighbor echoes one of self's own
/// symbols (self's estimate wins); any other collision is a malformed
/// exchange and fails the merge.
pub fn aggregate(
    self_id: u32,
    trajectory: &LocalTrajectory,
    loop_store: &InterRobotLoopStore,
    neighbors: &[u32],
    received: &BTreeMap<u32, ReceivedGraph>,
    is_connected: &BTreeMap<u32, bool>,
) -> Result<(Vec<Factor>, PoseEstimates), GraphError> {
    let connected = |id: u32| is_connected.get(&id).copied().unwrap_or(false);

    // Local odometry edges.
    let mut graph: Vec<Factor> = trajectory
        .factors()
        .iter()
        .map(|f| Factor::Between(*f))
        .collect();

    // Loop closures from the local store, for every connected pair.
    let mut included: Vec<u32> = neighbors.to_vec();
    included.push(self_id);
    for (n, &a) in included.iter().enumerate() {
        for &b in &included[n + 1..] {
            if connected(a) && connected(b) {
                let (min_id, max_id) = sorted_pair(a, b);
                for factor in loop_store.pair(min_id, max_id) {
                    graph.push(Factor::Between(*factor));
                }
            }
        }
    }

    // Local estimates first so they take precedence over echoes.
    let mut estimates = trajectory.estimates().clone();
    for &id in neighbors {
        if !connected(id) {
            continue;
        }
        let Some(graph_and_values) = received.get(&id) else {
            continue;
        };
        for (key, pose) in graph_and_values.values.iter() {
            if key.robot == self_id && estimates.contains(key) {
                continue;
            }
            estimates.insert(*key, *pose)?;
        }
    }

    // Received edges, connected or not, filtered by endpoint connectivity.
    for &id in neighbors {
        let Some(graph_and_values) = received.get(&id) else {
            continue;
        };
        for factor in &graph_and_values.edges {
            let Some(between) = factor.as_between() else {
                log::debug!("dropping non-between factor received from robot {id}");
                continue;
            };
            if connected(between.from.robot) && connected(between.to.robot) {
                graph.push(Factor::Between(*between));
            }
        }
    }

    Ok((graph, estimates))
}
