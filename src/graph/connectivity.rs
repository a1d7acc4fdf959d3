//! Transitive connectivity over loop-closure declarations.

use std::collections::{BTreeMap, BTreeSet, VecDeque};

/// Decide which robots form one component with `self_id`.
///
/// Breadth-first search over the vertex set `{self_id} ∪ neighbors`, with
/// adjacency given by the connectivity declarations (robot id → ids it
/// shares loop closures with). The caller seeds the map with self's own
/// declaration in addition to the received ones.
///
/// Returns an inclusion flag for every vertex. `self_id` is always included;
/// ids outside the vertex set are ignored, so a robot absent from
/// `neighbors` can never be marked connected.
pub fn connected_robots(
    self_id: u32,
    neighbors: &[u32],
    declarations: &BTreeMap<u32, Vec<u32>>,
) -> BTreeMap<u32, bool> {
    let mut is_connected: BTreeMap<u32, bool> = BTreeMap::new();
    is_connected.insert(self_id, true);
    for &id in neighbors {
        is_connected.entry(id).or_insert(false);
    }

    let members: BTreeSet<u32> = is_connected.keys().copied().collect();
    let mut visited: BTreeSet<u32> = BTreeSet::new();
    let mut queue: VecDeque<u32> = VecDeque::new();

    visited.insert(self_id);
    queue.push_back(self_id);

    while let Some(current) = queue.pop_front() {
        let Some(declared) = declarations.get(&current) else {
            continue;
        };
        for &id in declared {
            if !members.contains(&id) {
                continue;
            }
            is_connected.insert(id, true);
            if visited.insert(id) {
                queue.push_back(id);
            }
        }
    }

    is_connected
}

#[cfg(test)]
mod tests {
    use super::*;

    fn declarations(entries: &[(u32, &[u32])]) -> BTreeMap<u32, Vec<u32>> {
        entries
            .iter()
            .map(|&(id, declared)| (id, declared.to_vec()))
            .collect()
    }

    #[test]
    fn test_self_always_connected() {
        let result = connected_robots(0, &[1, 2], &BTreeMap::new());
        assert_eq!(result[&0], true);
        assert_eq!(result[&1], false);
        assert_eq!(result[&2], false);
    }

    #[test]
    fn test_direct_connection() {
        let decls = declarations(&[(0, &[1]), (1, &[1])]);
        let result = connected_robots(0, &[1], &decls);
        assert_eq!(result[&1], true);
    }

    #[test]
    fn test_transitive_connection() {
        // 0 reaches 2 only through 1's declaration.
        let decls = declarations(&[(0, &[1]), (1, &[2])]);
        let result = connected_robots(0, &[1, 2], &decls);
        assert_eq!(result[&1], true);
        assert_eq!(result[&2], true);
    }

    #[test]
    fn test_island_excluded() {
        let decls = declarations(&[(0, &[1]), (1, &[1]), (2, &[])]);
        let result = connected_robots(0, &[1, 2], &decls);
        assert_eq!(result[&1], true);
        assert_eq!(result[&2], false);
    }

    #[test]
    fn test_non_neighbor_never_included() {
        // Declarations mention robot 7, which is not a current neighbor.
        let decls = declarations(&[(0, &[1, 7]), (1, &[7])]);
        let result = connected_robots(0, &[1], &decls);
        assert!(!result.contains_key(&7));
    }

    #[test]
    fn test_large_robot_ids() {
        // Ids far beyond the neighbor count must be handled.
        let decls = declarations(&[(5, &[900])]);
        let result = connected_robots(5, &[900], &decls);
        assert_eq!(result[&900], true);
    }

    #[test]
    fn test_cycle_terminates() {
        let decls = declarations(&[(0, &[1]), (1, &[2]), (2, &[1])]);
        let result = connected_robots(0, &[1, 2], &decls);
        assert_eq!(result[&1], true);
        assert_eq!(result[&2], true);
    }
}
