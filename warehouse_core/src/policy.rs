use std::collections::HashMap;

use crate::{Location, grid_world::Action, search::GridTree};

/// Single next move per cell toward a fixed target.
///
/// A cell maps to `None` when it is the target itself; cells that cannot reach
/// the target have no entry at all, which [`NavigationPolicy::reaches`]
/// reports.
#[derive(Debug, Clone, PartialEq)]
pub struct NavigationPolicy {
    target: Location,
    moves: HashMap<Location, Option<Action>>,
}

impl NavigationPolicy {
    /// Reverses a predecessor tree rooted at `target`.
    ///
    /// Each reached cell records the action its predecessor took to get
    /// there; the opposite action steps back toward the predecessor, and so
    /// toward the root.
    pub fn from_tree(target: Location, tree: &GridTree) -> Self {
        let moves = tree
            .iter()
            .map(|(&location, successor)| (location, successor.action.map(Action::reverse)))
            .collect();
        NavigationPolicy { target, moves }
    }

    pub fn target(&self) -> Location {
        self.target
    }

    /// Move to take at `location`; `None` at the target and off the tree.
    pub fn action_at(&self, location: Location) -> Option<Action> {
        self.moves.get(&location).copied().flatten()
    }

    /// `true` if `location` is connected to the target.
    pub fn reaches(&self, location: Location) -> bool {
        self.moves.contains_key(&location)
    }

    /// The same table with every move flipped. Applying it twice gives back
    /// the original policy.
    pub fn reversed(&self) -> Self {
        NavigationPolicy {
            target: self.target,
            moves: self
                .moves
                .iter()
                .map(|(&location, action)| (location, action.map(Action::reverse)))
                .collect(),
        }
    }

    /// Cells visited when following the policy from `start`, ending with the
    /// last cell before the target. Empty when `start` cannot reach it.
    pub fn route_from(&self, start: Location) -> Vec<Location> {
        let mut route = Vec::new();
        if !self.reaches(start) || start == self.target {
            return route;
        }
        let mut current = start;
        route.push(current);
        // A well-formed tree never revisits a cell, so the walk is bounded
        // by the table size.
        for _ in 0..self.moves.len() {
            match self.action_at(current).and_then(|action| action.apply(current)) {
                Some(next) if next != self.target => {
                    current = next;
                    route.push(current);
                }
                _ => break,
            }
        }
        route
    }
}
