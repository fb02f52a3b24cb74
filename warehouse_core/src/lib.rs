use std::fmt;

use serde::{Deserialize, Serialize};

pub mod error;
pub mod grid_world;
pub mod map;
pub mod policy;
pub mod queue;
pub mod robot;
pub mod scheduler;
pub mod search;

#[cfg(test)]
mod testing;

pub use error::WarehouseError;
pub use grid_world::{Action, CellType, GridWorld};
pub use map::Grid;
pub use policy::NavigationPolicy;
pub use robot::{Package, Robot, RobotMode};
pub use scheduler::{Scheduler, SchedulerConfig, Snapshot, TickReport};

/// Identifier of a robot; robots are numbered from zero in creation order.
pub type RobotId = usize;

/// Identifier of a package, unique for the lifetime of a scheduler.
pub type PackageId = usize;

/// A cell coordinate in the warehouse grid.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct Location {
    pub x: usize,
    pub y: usize,
}

impl Location {
    pub const fn new(x: usize, y: usize) -> Self {
        Location { x, y }
    }

    /// Euclidean distance between the two cells.
    pub fn distance(&self, other: &Location) -> f64 {
        let dx = self.x as f64 - other.x as f64;
        let dy = self.y as f64 - other.y as f64;
        (dx * dx + dy * dy).sqrt()
    }

    pub fn manhattan(&self, other: &Location) -> usize {
        self.x.abs_diff(other.x) + self.y.abs_diff(other.y)
    }
}

impl fmt::Display for Location {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "({}, {})", self.x, self.y)
    }
}

impl From<(usize, usize)> for Location {
    fn from((x, y): (usize, usize)) -> Self {
        Location { x, y }
    }
}
