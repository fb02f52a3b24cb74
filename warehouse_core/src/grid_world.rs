use serde::{Deserialize, Serialize};

use crate::{Location, map::Grid};

/// Static type of a warehouse cell.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum CellType {
    #[default]
    Free,
    /// Where packages wait to be picked up. Approached, never entered.
    Rack,
    Wall,
    /// Conveyor belt where packages are delivered. Approached, never entered.
    Belt,
}

impl CellType {
    pub fn is_free(self) -> bool {
        self == CellType::Free
    }
}

/// A unit move in one of the four cardinal directions.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Action {
    North,
    East,
    South,
    West,
}

impl Action {
    /// All actions in clockwise order, starting north.
    pub const ALL: [Action; 4] = [Action::North, Action::East, Action::South, Action::West];

    /// Coordinate change `(dx, dy)`; `y` grows southward.
    pub fn delta(self) -> (isize, isize) {
        match self {
            Action::North => (0, -1),
            Action::East => (1, 0),
            Action::South => (0, 1),
            Action::West => (-1, 0),
        }
    }

    /// The opposite direction.
    pub fn reverse(self) -> Action {
        match self {
            Action::North => Action::South,
            Action::East => Action::West,
            Action::South => Action::North,
            Action::West => Action::East,
        }
    }

    /// Location reached by taking this action from `location`, or `None` if
    /// the move leaves the non-negative quadrant.
    pub fn apply(self, location: Location) -> Option<Location> {
        let (dx, dy) = self.delta();
        Some(Location {
            x: location.x.checked_add_signed(dx)?,
            y: location.y.checked_add_signed(dy)?,
        })
    }

    pub fn arrow(self) -> char {
        match self {
            Action::North => '↑',
            Action::East => '→',
            Action::South => '↓',
            Action::West => '←',
        }
    }
}

/// One outgoing edge of a search state.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Transition<S, A> {
    pub state: S,
    pub action: A,
    pub cost: f64,
}

/// A graph-search problem with one or more start states.
pub trait SearchProblem {
    type State;
    type Action;

    /// States the search starts from, each at cost zero.
    fn initial_states(&self) -> &[Self::State];

    /// Valid moves out of `state`, with the action taken and its cost.
    fn successors(&self, state: &Self::State) -> Vec<Transition<Self::State, Self::Action>>;
}

/// Navigation over the free cells of a warehouse grid.
///
/// Seeds may be any in-bounds cell, including racks and belts: the search
/// leaves a non-free seed but never steps onto a non-free cell.
#[derive(Debug, Clone)]
pub struct GridWorld<'a> {
    grid: &'a Grid<CellType>,
    seeds: Vec<Location>,
}

impl<'a> GridWorld<'a> {
    pub fn new(grid: &'a Grid<CellType>, seeds: Vec<Location>) -> Self {
        GridWorld { grid, seeds }
    }

    fn is_free(&self, location: Location) -> bool {
        self.grid.get(location).is_some_and(|cell| cell.is_free())
    }
}

impl SearchProblem for GridWorld<'_> {
    type State = Location;
    type Action = Action;

    fn initial_states(&self) -> &[Location] {
        &self.seeds
    }

    fn successors(&self, state: &Location) -> Vec<Transition<Location, Action>> {
        Action::ALL
            .iter()
            .filter_map(|&action| {
                let next = action.apply(*state)?;
                self.is_free(next).then(|| Transition {
                    state: next,
                    action,
                    cost: state.distance(&next),
                })
            })
            .collect()
    }
}
