//! Tick loop: batch creation, greedy assignment and robot advancement.

use std::{
    collections::{HashMap, HashSet},
    sync::Arc,
};

use log::{debug, warn};
use rand::{Rng, seq::IndexedRandom};
use serde::{Deserialize, Serialize};

use crate::{
    CellType, Grid, Location, PackageId, RobotId,
    error::{WarehouseError, WarehouseResult},
    policy::NavigationPolicy,
    robot::{Package, Robot, RobotMode, StepOutcome},
    search::policy_toward,
};

/// Tunables of the scheduler.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct SchedulerConfig {
    /// Packages per batch; defaults to the number of robots.
    pub batch_size: Option<usize>,
}

/// Work handed to a robot during a tick.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Task {
    Package(PackageId),
    Rest(Location),
}

/// A package reaching its belt.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct DeliveryEvent {
    pub package: PackageId,
    pub robot: RobotId,
    pub tick: u64,
}

/// What happened during one call to [`Scheduler::tick`].
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct TickReport {
    pub tick: u64,
    /// Packages created by this tick's batch, if one was due.
    pub created: Vec<PackageId>,
    pub assigned: Vec<(RobotId, Task)>,
    pub delivered: Vec<DeliveryEvent>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct RobotView {
    pub id: RobotId,
    pub location: Location,
    pub mode: RobotMode,
    pub package: Option<PackageId>,
    pub rest: Option<Location>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct PackageView {
    pub id: PackageId,
    /// Packages are drawn on their rack until delivered.
    pub location: Location,
    pub destination: Location,
    pub claimed: bool,
}

/// Externally visible state between ticks.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Snapshot {
    pub tick: u64,
    pub robots: Vec<RobotView>,
    pub packages: Vec<PackageView>,
}

#[derive(Debug, Clone)]
struct Outstanding {
    package: Package,
    pickup: Arc<NavigationPolicy>,
    claimed: bool,
}

/// Drives a fleet of robots over a fixed warehouse layout.
///
/// Belt and rest policies are computed once at construction; each package gets
/// its own pickup policy when it is created. All randomness goes through `rng`.
pub struct Scheduler<R> {
    grid: Grid<CellType>,
    racks: Vec<Location>,
    belts: Vec<Location>,
    rests: Vec<Location>,
    belt_policies: HashMap<Location, Arc<NavigationPolicy>>,
    rest_policies: HashMap<Location, Arc<NavigationPolicy>>,
    robots: Vec<Robot>,
    packages: Vec<Outstanding>,
    next_package_id: PackageId,
    tick: u64,
    config: SchedulerConfig,
    rng: R,
}

impl<R: Rng> Scheduler<R> {
    /// Places `robot_count` robots on distinct random free cells, avoiding
    /// rest cells while there is room elsewhere.
    pub fn new(
        grid: Grid<CellType>,
        belts: Vec<Location>,
        rests: Vec<Location>,
        robot_count: usize,
        config: SchedulerConfig,
        mut rng: R,
    ) -> WarehouseResult<Self> {
        let free = grid.locations_of(&CellType::Free);
        if robot_count > free.len() {
            return Err(WarehouseError::NotEnoughFreeCells {
                requested: robot_count,
                available: free.len(),
            });
        }
        let away_from_rests: Vec<Location> = free
            .iter()
            .copied()
            .filter(|cell| !rests.contains(cell))
            .collect();
        let pool = if away_from_rests.len() >= robot_count {
            &away_from_rests
        } else {
            &free
        };
        let locations = pool.choose_multiple(&mut rng, robot_count).copied().collect();
        Self::with_robots(grid, belts, rests, locations, config, rng)
    }

    /// Uses the given robot start cells; robot ids follow their order.
    pub fn with_robots(
        grid: Grid<CellType>,
        belts: Vec<Location>,
        rests: Vec<Location>,
        robot_locations: Vec<Location>,
        config: SchedulerConfig,
        rng: R,
    ) -> WarehouseResult<Self> {
        for &belt in &belts {
            if *grid.try_get(belt)? != CellType::Belt {
                return Err(WarehouseError::NotABelt(belt));
            }
        }
        for &rest in &rests {
            if !grid.try_get(rest)?.is_free() {
                return Err(WarehouseError::RestNotFree(rest));
            }
        }
        let mut occupied = HashSet::new();
        for &location in &robot_locations {
            if !grid.try_get(location)?.is_free() {
                return Err(WarehouseError::RobotNotFree(location));
            }
            if !occupied.insert(location) {
                return Err(WarehouseError::RobotCollision(location));
            }
        }

        let racks = grid.locations_of(&CellType::Rack);
        if racks.is_empty() {
            warn!("warehouse has no racks; no packages will be created");
        }
        if belts.is_empty() {
            warn!("warehouse has no belts; no packages will be created");
        }

        let belt_policies = Self::policies_for(&belts, &grid);
        let rest_policies = Self::policies_for(&rests, &grid);
        let robots = robot_locations
            .into_iter()
            .enumerate()
            .map(|(id, location)| Robot::new(id, location))
            .collect::<Vec<_>>();
        debug!(
            "scheduler ready: {} robots, {} racks, {} belts, {} rest cells",
            robots.len(),
            racks.len(),
            belts.len(),
            rests.len()
        );

        Ok(Scheduler {
            grid,
            racks,
            belts,
            rests,
            belt_policies,
            rest_policies,
            robots,
            packages: Vec::new(),
            next_package_id: 0,
            tick: 0,
            config,
            rng,
        })
    }

    fn policies_for(
        targets: &[Location],
        grid: &Grid<CellType>,
    ) -> HashMap<Location, Arc<NavigationPolicy>> {
        targets
            .iter()
            .map(|&target| (target, Arc::new(policy_toward(target, grid))))
            .collect()
    }

    /// Adds a package outside of the batch cycle.
    pub fn add_package(
        &mut self,
        source: Location,
        destination: Location,
    ) -> WarehouseResult<PackageId> {
        if *self.grid.try_get(source)? != CellType::Rack {
            return Err(WarehouseError::NotARack(source));
        }
        if !self.belt_policies.contains_key(&destination) {
            return Err(WarehouseError::UnknownBelt(destination));
        }
        Ok(self.push_package(source, destination))
    }

    fn push_package(&mut self, source: Location, destination: Location) -> PackageId {
        let id = self.next_package_id;
        self.next_package_id += 1;
        let pickup = Arc::new(policy_toward(source, &self.grid));
        self.packages.push(Outstanding {
            package: Package {
                id,
                source,
                destination,
            },
            pickup,
            claimed: false,
        });
        id
    }

    /// Creates packages at distinct random racks, each bound for a random belt.
    fn create_batch(&mut self) -> Vec<PackageId> {
        if self.belts.is_empty() {
            return Vec::new();
        }
        let size = self.config.batch_size.unwrap_or(self.robots.len());
        let sources: Vec<Location> = self
            .racks
            .choose_multiple(&mut self.rng, size)
            .copied()
            .collect();
        let mut created = Vec::with_capacity(sources.len());
        for source in sources {
            if let Some(&destination) = self.belts.choose(&mut self.rng) {
                created.push(self.push_package(source, destination));
            }
        }
        if !created.is_empty() {
            debug!("tick {}: new batch of {} packages", self.tick, created.len());
        }
        created
    }

    /// Cheapest unclaimed package the robot can both fetch and deliver.
    fn best_package(&self, robot: &Robot) -> Option<usize> {
        let here = robot.location();
        let transport_cost = |package: &Package| {
            here.distance(&package.source) + package.source.distance(&package.destination)
        };
        self.packages
            .iter()
            .enumerate()
            .filter(|(_, entry)| !entry.claimed && entry.pickup.reaches(here))
            .filter(|(_, entry)| {
                self.belt_policies
                    .get(&entry.package.destination)
                    .is_some_and(|policy| policy.reaches(here))
            })
            .min_by(|(_, a), (_, b)| {
                transport_cost(&a.package).total_cmp(&transport_cost(&b.package))
            })
            .map(|(index, _)| index)
    }

    /// Nearest rest cell nobody else holds or stands on, unless the robot
    /// already has one or is standing on one.
    fn best_rest(&self, robot: &Robot) -> Option<Location> {
        let here = robot.location();
        if robot.rest().is_some() || self.rests.contains(&here) {
            return None;
        }
        let held: HashSet<Location> = self
            .robots
            .iter()
            .filter(|other| other.id() != robot.id())
            .flat_map(|other| [other.rest(), Some(other.location())])
            .flatten()
            .collect();
        self.rests
            .iter()
            .copied()
            .filter(|rest| !held.contains(rest))
            .filter(|rest| self.rest_policies[rest].reaches(here))
            .min_by(|a, b| here.distance(a).total_cmp(&here.distance(b)))
    }

    fn assign(&mut self, report: &mut TickReport) {
        for index in 0..self.robots.len() {
            let robot = &self.robots[index];
            if !robot.is_free() {
                continue;
            }
            if let Some(slot) = self.best_package(robot) {
                let entry = &mut self.packages[slot];
                entry.claimed = true;
                let package = entry.package;
                let pickup = Arc::clone(&entry.pickup);
                let delivery = Arc::clone(&self.belt_policies[&package.destination]);
                let robot = &mut self.robots[index];
                debug!(
                    "tick {}: robot {} takes package {} at {}",
                    self.tick,
                    robot.id(),
                    package.id,
                    package.source
                );
                robot.assign_package(package, pickup, delivery);
                report.assigned.push((robot.id(), Task::Package(package.id)));
            } else if let Some(rest) = self.best_rest(robot) {
                let policy = Arc::clone(&self.rest_policies[&rest]);
                let robot = &mut self.robots[index];
                debug!("tick {}: robot {} heads to rest {}", self.tick, robot.id(), rest);
                robot.assign_rest(rest, policy);
                report.assigned.push((robot.id(), Task::Rest(rest)));
            }
        }
    }

    fn advance(&mut self, report: &mut TickReport) {
        for robot in &mut self.robots {
            match robot.step() {
                StepOutcome::Delivered(package) => {
                    self.packages.retain(|entry| entry.package.id != package.id);
                    debug!(
                        "tick {}: robot {} delivered package {} to {}",
                        self.tick,
                        robot.id(),
                        package.id,
                        package.destination
                    );
                    report.delivered.push(DeliveryEvent {
                        package: package.id,
                        robot: robot.id(),
                        tick: self.tick,
                    });
                }
                StepOutcome::PickedUp(package) => {
                    debug!("tick {}: robot {} picked up package {package}", self.tick, robot.id());
                }
                _ => {}
            }
        }
    }

    /// Runs one simulation step.
    pub fn tick(&mut self) -> TickReport {
        self.tick += 1;
        let mut report = TickReport {
            tick: self.tick,
            ..TickReport::default()
        };
        if self.packages.is_empty() && self.robots.iter().all(Robot::is_free) {
            report.created = self.create_batch();
        }
        self.assign(&mut report);
        self.advance(&mut report);
        report
    }

    pub fn snapshot(&self) -> Snapshot {
        Snapshot {
            tick: self.tick,
            robots: self
                .robots
                .iter()
                .map(|robot| RobotView {
                    id: robot.id(),
                    location: robot.location(),
                    mode: robot.mode(),
                    package: robot.package().map(|package| package.id),
                    rest: robot.rest(),
                })
                .collect(),
            packages: self
                .packages
                .iter()
                .map(|entry| PackageView {
                    id: entry.package.id,
                    location: entry.package.source,
                    destination: entry.package.destination,
                    claimed: entry.claimed,
                })
                .collect(),
        }
    }

    pub fn grid(&self) -> &Grid<CellType> {
        &self.grid
    }

    pub fn belts(&self) -> &[Location] {
        &self.belts
    }

    pub fn rests(&self) -> &[Location] {
        &self.rests
    }

    pub fn robots(&self) -> &[Robot] {
        &self.robots
    }

    /// Outstanding packages, claimed or not, in creation order.
    pub fn packages(&self) -> impl Iterator<Item = &Package> {
        self.packages.iter().map(|entry| &entry.package)
    }

    pub fn belt_policy(&self, belt: Location) -> Option<&NavigationPolicy> {
        self.belt_policies.get(&belt).map(Arc::as_ref)
    }

    /// Number of ticks run so far.
    pub fn current_tick(&self) -> u64 {
        self.tick
    }
}
