//! Packages, robots and the robot's per-tick state machine.

use std::sync::Arc;

use serde::{Deserialize, Serialize};

use crate::{Location, PackageId, RobotId, policy::NavigationPolicy};

/// A package waiting on a rack, bound for a conveyor belt.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Package {
    pub id: PackageId,
    /// Rack cell the package is picked from.
    pub source: Location,
    /// Belt cell the package is delivered to.
    pub destination: Location,
}

/// What a robot is currently doing.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum RobotMode {
    #[default]
    Idle,
    PickingUp,
    Delivering,
    Resting,
}

/// When a navigating robot considers its leg finished.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum StopRule {
    /// Stop in front of the cell: fires when the next move would enter it.
    Approach(Location),
    /// Stop on the cell: fires once the robot stands on it.
    Arrive(Location),
}

#[derive(Debug, Clone, Default)]
enum Assignment {
    #[default]
    Unassigned,
    Package {
        package: Package,
        pickup: Arc<NavigationPolicy>,
        delivery: Arc<NavigationPolicy>,
    },
    Rest {
        cell: Location,
        policy: Arc<NavigationPolicy>,
    },
}

/// Result of a single [`Robot::step`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StepOutcome {
    /// Moved one cell to the given location.
    Moved(Location),
    /// Reached the rack; now heading for the belt.
    PickedUp(PackageId),
    /// Reached the belt; the package is handed back to the scheduler.
    Delivered(Package),
    /// Parked on the rest cell.
    Rested(Location),
    /// Has a task but no move from the current cell.
    Stalled,
    /// Nothing to do.
    Idle,
}

/// A warehouse robot.
#[derive(Debug, Clone)]
pub struct Robot {
    id: RobotId,
    location: Location,
    mode: RobotMode,
    assignment: Assignment,
}

impl Robot {
    pub fn new(id: RobotId, location: Location) -> Self {
        Robot {
            id,
            location,
            mode: RobotMode::Idle,
            assignment: Assignment::Unassigned,
        }
    }

    pub fn id(&self) -> RobotId {
        self.id
    }

    pub fn location(&self) -> Location {
        self.location
    }

    pub fn mode(&self) -> RobotMode {
        self.mode
    }

    /// Package being fetched or carried, if any.
    pub fn package(&self) -> Option<&Package> {
        match &self.assignment {
            Assignment::Package { package, .. } => Some(package),
            _ => None,
        }
    }

    /// Rest cell the robot is heading to, if any.
    pub fn rest(&self) -> Option<Location> {
        match &self.assignment {
            Assignment::Rest { cell, .. } => Some(*cell),
            _ => None,
        }
    }

    /// `true` while the robot carries no package. Resting robots are free and
    /// may be handed a package.
    pub fn is_free(&self) -> bool {
        self.package().is_none()
    }

    /// Hands the robot a package. Any rest assignment is dropped.
    pub fn assign_package(
        &mut self,
        package: Package,
        pickup: Arc<NavigationPolicy>,
        delivery: Arc<NavigationPolicy>,
    ) {
        self.assignment = Assignment::Package {
            package,
            pickup,
            delivery,
        };
        self.mode = RobotMode::PickingUp;
    }

    /// Sends the robot to park on `cell`.
    pub fn assign_rest(&mut self, cell: Location, policy: Arc<NavigationPolicy>) {
        self.assignment = Assignment::Rest { cell, policy };
        self.mode = RobotMode::Resting;
    }

    fn stop_rule(&self) -> Option<StopRule> {
        match (&self.mode, &self.assignment) {
            (RobotMode::PickingUp, Assignment::Package { package, .. }) => {
                Some(StopRule::Approach(package.source))
            }
            (RobotMode::Delivering, Assignment::Package { package, .. }) => {
                Some(StopRule::Approach(package.destination))
            }
            (RobotMode::Resting, Assignment::Rest { cell, .. }) => Some(StopRule::Arrive(*cell)),
            _ => None,
        }
    }

    fn active_policy(&self) -> Option<&NavigationPolicy> {
        match (&self.mode, &self.assignment) {
            (RobotMode::PickingUp, Assignment::Package { pickup, .. }) => Some(pickup),
            (RobotMode::Delivering, Assignment::Package { delivery, .. }) => Some(delivery),
            (RobotMode::Resting, Assignment::Rest { policy, .. }) => Some(policy),
            _ => None,
        }
    }

    /// Fires the stop transition of the current mode.
    fn finish_leg(&mut self) -> StepOutcome {
        match self.mode {
            RobotMode::PickingUp => {
                self.mode = RobotMode::Delivering;
                match self.package() {
                    Some(package) => StepOutcome::PickedUp(package.id),
                    None => StepOutcome::Stalled,
                }
            }
            RobotMode::Delivering => {
                self.mode = RobotMode::Idle;
                match std::mem::take(&mut self.assignment) {
                    Assignment::Package { package, .. } => StepOutcome::Delivered(package),
                    _ => StepOutcome::Idle,
                }
            }
            RobotMode::Resting => {
                self.mode = RobotMode::Idle;
                self.assignment = Assignment::Unassigned;
                StepOutcome::Rested(self.location)
            }
            RobotMode::Idle => StepOutcome::Idle,
        }
    }

    /// Advances the robot by one tick.
    ///
    /// Exactly one of these happens: the robot moves a cell along its active
    /// policy, it fires its mode's stop transition, or nothing.
    pub fn step(&mut self) -> StepOutcome {
        let Some(rule) = self.stop_rule() else {
            return StepOutcome::Idle;
        };
        if rule == StopRule::Arrive(self.location) {
            return self.finish_leg();
        }
        let next = self
            .active_policy()
            .and_then(|policy| policy.action_at(self.location))
            .and_then(|action| action.apply(self.location));
        let Some(next) = next else {
            return StepOutcome::Stalled;
        };
        if rule == StopRule::Approach(next) {
            return self.finish_leg();
        }
        self.location = next;
        StepOutcome::Moved(next)
    }
}
