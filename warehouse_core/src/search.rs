//! Shortest-path search and policy derivation.
//!
//! [`shortest_paths`] runs Dijkstra from every initial state of a
//! [`SearchProblem`] at once and records, for each settled state, how it was
//! reached. [`policy_toward`] roots that search at a single target cell and
//! reverses the resulting predecessor tree into a [`NavigationPolicy`].

use std::{collections::HashMap, hash::Hash};

use log::trace;

use crate::{
    CellType, Grid, Location,
    grid_world::{Action, GridWorld, SearchProblem},
    policy::NavigationPolicy,
    queue::PriorityQueue,
};

/// How a state was reached from the nearest seed.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Successor<S, A> {
    /// `None` for seeds.
    pub predecessor: Option<S>,
    /// Action taken at `predecessor` to get here; `None` for seeds.
    pub action: Option<A>,
    pub cost: f64,
}

/// Result of looking a state up in a [`SearchTree`].
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Reach<'a, S, A> {
    Reached(&'a Successor<S, A>),
    Unreached,
}

impl<S: Copy, A: Copy> Reach<'_, S, A> {
    /// Path cost from the nearest seed; infinite when unreached.
    pub fn cost(&self) -> f64 {
        match self {
            Reach::Reached(successor) => successor.cost,
            Reach::Unreached => f64::INFINITY,
        }
    }

    pub fn predecessor(&self) -> Option<S> {
        match self {
            Reach::Reached(successor) => successor.predecessor,
            Reach::Unreached => None,
        }
    }

    pub fn action(&self) -> Option<A> {
        match self {
            Reach::Reached(successor) => successor.action,
            Reach::Unreached => None,
        }
    }

    pub fn is_reached(&self) -> bool {
        matches!(self, Reach::Reached(_))
    }
}

/// Predecessor tree produced by [`shortest_paths`].
#[derive(Debug, Clone)]
pub struct SearchTree<S, A> {
    entries: HashMap<S, Successor<S, A>>,
}

impl<S: Eq + Hash, A> SearchTree<S, A> {
    pub fn lookup(&self, state: &S) -> Reach<'_, S, A> {
        match self.entries.get(state) {
            Some(successor) => Reach::Reached(successor),
            None => Reach::Unreached,
        }
    }

    pub fn iter(&self) -> impl Iterator<Item = (&S, &Successor<S, A>)> {
        self.entries.iter()
    }

    /// Number of reached states, seeds included.
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

/// Multi-source Dijkstra over `problem`.
///
/// Every initial state starts at cost zero. A record is only replaced by a
/// strictly cheaper one, so among equal-cost paths the first one found wins.
pub fn shortest_paths<P>(problem: &P) -> SearchTree<P::State, P::Action>
where
    P: SearchProblem,
    P::State: Copy + Eq + Hash,
    P::Action: Copy,
{
    let mut entries: HashMap<P::State, Successor<P::State, P::Action>> = HashMap::new();
    let mut frontier = PriorityQueue::new();

    for &seed in problem.initial_states() {
        entries.insert(
            seed,
            Successor {
                predecessor: None,
                action: None,
                cost: 0.0,
            },
        );
        frontier.update(seed, 0.0);
    }

    while let Some((state, cost)) = frontier.pop() {
        for transition in problem.successors(&state) {
            let total = cost + transition.cost;
            let known = entries
                .get(&transition.state)
                .map_or(f64::INFINITY, |s| s.cost);
            if total < known {
                entries.insert(
                    transition.state,
                    Successor {
                        predecessor: Some(state),
                        action: Some(transition.action),
                        cost: total,
                    },
                );
                frontier.update(transition.state, total);
            }
        }
    }

    SearchTree { entries }
}

/// Policy leading every cell that can reach `target` one step closer to it.
///
/// `target` may be a rack or belt cell; it is the root of the search and is
/// never entered by the policy's moves except as the final approach.
pub fn policy_toward(target: Location, grid: &Grid<CellType>) -> NavigationPolicy {
    let world = GridWorld::new(grid, vec![target]);
    let tree = shortest_paths(&world);
    trace!("policy toward {target}: {} cells reachable", tree.len());
    NavigationPolicy::from_tree(target, &tree)
}

/// One independent policy per target.
pub fn policies_toward(
    targets: &[Location],
    grid: &Grid<CellType>,
) -> HashMap<Location, NavigationPolicy> {
    targets
        .iter()
        .map(|&target| (target, policy_toward(target, grid)))
        .collect()
}

/// Convenience alias for searches over warehouse cells.
pub type GridTree = SearchTree<Location, Action>;

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::{grid, open_grid};

    #[test]
    fn open_grid_costs_equal_manhattan_distance() {
        let grid = open_grid(6, 4);
        for (source, _) in grid.enumerate() {
            let tree = shortest_paths(&GridWorld::new(&grid, vec![source]));
            for (target, _) in grid.enumerate() {
                assert_eq!(
                    tree.lookup(&target).cost(),
                    source.manhattan(&target) as f64,
                    "{source} -> {target}"
                );
            }
        }
    }

    #[test]
    fn seeds_have_no_predecessor() {
        let grid = open_grid(3, 3);
        let a = Location::new(0, 0);
        let b = Location::new(2, 2);
        let tree = shortest_paths(&GridWorld::new(&grid, vec![a, b]));
        for seed in [a, b] {
            let reach = tree.lookup(&seed);
            assert_eq!(reach.cost(), 0.0);
            assert_eq!(reach.predecessor(), None);
            assert_eq!(reach.action(), None);
        }
    }

    #[test]
    fn multi_source_takes_nearest_seed() {
        let grid = open_grid(7, 1);
        let tree = shortest_paths(&GridWorld::new(
            &grid,
            vec![Location::new(0, 0), Location::new(6, 0)],
        ));
        assert_eq!(tree.lookup(&Location::new(2, 0)).cost(), 2.0);
        assert_eq!(tree.lookup(&Location::new(5, 0)).cost(), 1.0);
        assert_eq!(
            tree.lookup(&Location::new(5, 0)).predecessor(),
            Some(Location::new(6, 0))
        );
    }

    #[test]
    fn walls_force_detour_and_cut_regions() {
        let grid = grid(&[
            "   #  ", //
            " # #  ", //
            " #    ", //
            "####  ", //
            "  #   ",
        ]);
        let tree = shortest_paths(&GridWorld::new(&grid, vec![Location::new(0, 0)]));
        // Around the inner wall: down the left column is a dead end.
        assert_eq!(tree.lookup(&Location::new(2, 1)).cost(), 3.0);
        assert_eq!(tree.lookup(&Location::new(4, 0)).cost(), 8.0);
        let cut_off = tree.lookup(&Location::new(0, 4));
        assert!(!cut_off.is_reached());
        assert_eq!(cut_off.cost(), f64::INFINITY);
        assert_eq!(cut_off.predecessor(), None);
        assert!(tree.lookup(&Location::new(3, 0)).cost().is_infinite());
    }

    #[test]
    fn rack_root_reaches_neighbors_but_not_other_racks() {
        let grid = grid(&[
            " * ", //
            "   ", //
            " * ",
        ]);
        let tree = shortest_paths(&GridWorld::new(&grid, vec![Location::new(1, 0)]));
        assert_eq!(tree.lookup(&Location::new(1, 0)).cost(), 0.0);
        assert_eq!(tree.lookup(&Location::new(1, 1)).cost(), 1.0);
        assert!(!tree.lookup(&Location::new(1, 2)).is_reached());
    }

    #[test]
    fn policies_toward_builds_one_per_target() {
        let grid = grid(&["B   B"]);
        let targets = [Location::new(0, 0), Location::new(4, 0)];
        let policies = policies_toward(&targets, &grid);
        assert_eq!(policies.len(), 2);
        assert_eq!(
            policies[&targets[0]].action_at(Location::new(2, 0)),
            Some(Action::West)
        );
        assert_eq!(
            policies[&targets[1]].action_at(Location::new(2, 0)),
            Some(Action::East)
        );
    }
}
