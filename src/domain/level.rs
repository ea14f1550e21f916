//! Level Assignor
//!
//! A trace model's level is the length of the longest dependency path
//! reaching it from any source (a trace model with no incoming edge).
//! Levels are computed with Kahn's topological sort, relaxing each edge to
//! the longer path; anything left unordered sits on or behind a cycle and
//! keeps the longest level its acyclic predecessors gave it (0 if none).

use std::collections::{BTreeMap, BTreeSet, VecDeque};

use tracing::debug;

use crate::domain::entity::TraceModelId;
use crate::domain::error::TraceGraphError;

/// Level per trace model.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Levels {
    levels: BTreeMap<TraceModelId, usize>,
    unordered: Vec<TraceModelId>,
}

impl Levels {
    /// Level of a trace model; anything not ranked reads as level 0.
    pub fn get(&self, trace: TraceModelId) -> usize {
        self.levels.get(&trace).copied().unwrap_or(0)
    }

    pub fn max_level(&self) -> usize {
        self.levels.values().copied().max().unwrap_or(0)
    }

    pub fn iter(&self) -> impl Iterator<Item = (TraceModelId, usize)> + '_ {
        self.levels.iter().map(|(t, l)| (*t, *l))
    }

    pub fn as_map(&self) -> &BTreeMap<TraceModelId, usize> {
        &self.levels
    }

    /// Trace models the topological sort could not order, ascending.
    pub fn unordered(&self) -> &[TraceModelId] {
        &self.unordered
    }

    pub fn cycle_error(&self) -> Option<TraceGraphError> {
        if self.unordered.is_empty() {
            None
        } else {
            Some(TraceGraphError::CyclicDependency {
                nodes: self.unordered.clone(),
            })
        }
    }

    /// Trace models grouped by level, for layered rendering.
    pub fn levels_by_rank(&self) -> Vec<Vec<TraceModelId>> {
        if self.levels.is_empty() {
            return Vec::new();
        }
        let mut ranks = vec![Vec::new(); self.max_level() + 1];
        for (trace, level) in &self.levels {
            ranks[*level].push(*trace);
        }
        ranks
    }
}

/// Assign a level to every trace model.
///
/// Nodes named only in `dependencies` are ranked too. Nodes that cannot be
/// ordered are still ranked and listed in [`Levels::unordered`].
pub fn assign_levels(
    traces: impl IntoIterator<Item = TraceModelId>,
    dependencies: &BTreeMap<TraceModelId, Vec<TraceModelId>>,
) -> Levels {
    let mut nodes: BTreeSet<TraceModelId> = traces.into_iter().collect();
    for (source, targets) in dependencies {
        nodes.insert(*source);
        nodes.extend(targets.iter().copied());
    }

    let mut in_degree: BTreeMap<TraceModelId, usize> = nodes.iter().map(|n| (*n, 0)).collect();
    for target in dependencies.values().flatten() {
        *in_degree.entry(*target).or_default() += 1;
    }

    let mut levels: BTreeMap<TraceModelId, usize> = BTreeMap::new();
    let mut queue: VecDeque<TraceModelId> = VecDeque::new();
    for (node, degree) in &in_degree {
        if *degree == 0 {
            levels.insert(*node, 0);
            queue.push_back(*node);
        }
    }
    debug!("{} source trace models", queue.len());

    let mut ordered = 0usize;
    while let Some(node) = queue.pop_front() {
        ordered += 1;
        let level = levels.get(&node).copied().unwrap_or(0);

        for child in dependencies.get(&node).into_iter().flatten() {
            let entry = levels.entry(*child).or_insert(0);
            *entry = (*entry).max(level + 1);

            if let Some(degree) = in_degree.get_mut(child) {
                *degree -= 1;
                if *degree == 0 {
                    queue.push_back(*child);
                }
            }
        }
    }

    let mut unordered = Vec::new();
    if ordered < nodes.len() {
        for (node, degree) in in_degree {
            if degree > 0 {
                levels.entry(node).or_insert(0);
                unordered.push(node);
            }
        }
        debug!("{} trace models left unordered", unordered.len());
    }

    Levels { levels, unordered }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn t(i: usize) -> TraceModelId {
        TraceModelId::new(i)
    }

    fn deps(edges: &[(usize, usize)]) -> BTreeMap<TraceModelId, Vec<TraceModelId>> {
        let mut map: BTreeMap<TraceModelId, Vec<TraceModelId>> = BTreeMap::new();
        for (from, to) in edges {
            map.entry(t(*from)).or_default().push(t(*to));
        }
        map
    }

    #[test]
    fn test_longest_path_wins() {
        let levels = assign_levels([t(0), t(1), t(2)], &deps(&[(0, 1), (0, 2), (2, 1)]));
        assert_eq!(levels.get(t(0)), 0);
        assert_eq!(levels.get(t(2)), 1);
        assert_eq!(levels.get(t(1)), 2);
        assert_eq!(levels.max_level(), 2);
    }

    #[test]
    fn test_no_edges_all_level_zero() {
        let levels = assign_levels([t(3), t(8), t(5)], &BTreeMap::new());
        assert_eq!(levels.iter().count(), 3);
        assert!(levels.iter().all(|(_, level)| level == 0));
        assert_eq!(levels.levels_by_rank(), vec![vec![t(3), t(5), t(8)]]);
    }

    #[test]
    fn test_multiple_sources() {
        // 0 -> 2, 1 -> 3 -> 2
        let levels = assign_levels(
            [t(0), t(1), t(2), t(3)],
            &deps(&[(0, 2), (1, 3), (3, 2)]),
        );
        assert_eq!(levels.get(t(0)), 0);
        assert_eq!(levels.get(t(1)), 0);
        assert_eq!(levels.get(t(3)), 1);
        assert_eq!(levels.get(t(2)), 2);
        assert_eq!(
            levels.levels_by_rank(),
            vec![vec![t(0), t(1)], vec![t(3)], vec![t(2)]]
        );
    }

    #[test]
    fn test_cycle_is_reported_and_ranked() {
        // 0 -> 1 <-> 2, 3 -> 4
        let levels = assign_levels(
            [t(0), t(1), t(2), t(3), t(4)],
            &deps(&[(0, 1), (1, 2), (2, 1), (3, 4)]),
        );
        assert_eq!(levels.unordered(), &[t(1), t(2)]);
        assert_eq!(
            levels.cycle_error(),
            Some(TraceGraphError::CyclicDependency {
                nodes: vec![t(1), t(2)]
            })
        );
        assert_eq!(levels.iter().count(), 5);
        assert_eq!(levels.get(t(1)), 1);
        assert_eq!(levels.get(t(2)), 0);
        assert_eq!(levels.get(t(4)), 1);
    }

    #[test]
    fn test_cycle_without_source_defaults_to_zero() {
        let levels = assign_levels([t(6), t(7)], &deps(&[(6, 7), (7, 6)]));
        assert_eq!(levels.get(t(6)), 0);
        assert_eq!(levels.get(t(7)), 0);
        assert_eq!(levels.levels_by_rank(), vec![vec![t(6), t(7)]]);
        assert!(levels.cycle_error().is_some());
    }

    #[test]
    fn test_acyclic_has_no_cycle_error() {
        let levels = assign_levels([t(0), t(1)], &deps(&[(0, 1)]));
        assert!(levels.unordered().is_empty());
        assert_eq!(levels.cycle_error(), None);
    }

    #[test]
    fn test_duplicate_edges_are_counted() {
        let levels = assign_levels([t(0), t(1)], &deps(&[(0, 1), (0, 1)]));
        assert_eq!(levels.get(t(1)), 1);
    }

    #[test]
    fn test_empty_input() {
        let levels = assign_levels(Vec::new(), &BTreeMap::new());
        assert_eq!(levels.max_level(), 0);
        assert!(levels.levels_by_rank().is_empty());
    }
}
