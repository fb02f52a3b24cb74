use crate::{Location, map::GridError};

/// Errors raised while setting up a warehouse or injecting packages.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum WarehouseError {
    #[error(transparent)]
    Grid(#[from] GridError),
    #[error("Location {0} is not a conveyor belt")]
    NotABelt(Location),
    #[error("Location {0} is not a belt known to the scheduler")]
    UnknownBelt(Location),
    #[error("Location {0} is not a rack")]
    NotARack(Location),
    #[error("Rest location {0} is not a free cell")]
    RestNotFree(Location),
    #[error("Robot cannot be placed at {0}: not a free cell")]
    RobotNotFree(Location),
    #[error("More than one robot placed at {0}")]
    RobotCollision(Location),
    #[error("Cannot place {requested} robots on {available} free cells")]
    NotEnoughFreeCells { requested: usize, available: usize },
}

pub type WarehouseResult<T> = Result<T, WarehouseError>;
