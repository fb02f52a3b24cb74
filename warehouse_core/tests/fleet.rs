use rand::{SeedableRng, rngs::StdRng};
use warehouse_core::{
    CellType, Grid, Location, RobotMode, Scheduler, SchedulerConfig,
    scheduler::Task,
};

/// Open `width` x `height` floor with the given special cells.
fn layout(width: usize, height: usize, racks: &[Location], belts: &[Location]) -> Grid<CellType> {
    Grid::from_generator(width, height, |cell| {
        if racks.contains(&cell) {
            CellType::Rack
        } else if belts.contains(&cell) {
            CellType::Belt
        } else {
            CellType::Free
        }
    })
}

#[test]
fn single_robot_picks_and_delivers() {
    let rack = Location::new(0, 0);
    let belt = Location::new(4, 4);
    let mut scheduler = Scheduler::with_robots(
        layout(5, 5, &[rack], &[belt]),
        vec![belt],
        vec![],
        vec![Location::new(0, 1)],
        SchedulerConfig {
            batch_size: Some(0),
        },
        StdRng::seed_from_u64(11),
    )
    .unwrap();
    let package = scheduler.add_package(rack, belt).unwrap();

    let mut modes = vec![scheduler.robots()[0].mode()];
    let mut deliveries = Vec::new();
    for _ in 0..20 {
        let report = scheduler.tick();
        deliveries.extend(report.delivered);
        let mode = scheduler.robots()[0].mode();
        if modes.last() != Some(&mode) {
            modes.push(mode);
        }
    }

    // The robot starts next to the rack, so pickup fires on the first tick.
    assert_eq!(
        modes,
        vec![RobotMode::Idle, RobotMode::Delivering, RobotMode::Idle]
    );
    assert_eq!(deliveries.len(), 1);
    assert_eq!(deliveries[0].package, package);
    assert_eq!(deliveries[0].robot, 0);
    // Six moves to reach a belt neighbour, then the drop-off tick.
    assert_eq!(deliveries[0].tick, 8);
    assert_eq!(scheduler.packages().count(), 0);
    let robot = &scheduler.robots()[0];
    assert_eq!(robot.mode(), RobotMode::Idle);
    assert!(robot.package().is_none());
    assert_eq!(robot.location().manhattan(&belt), 1);
}

#[test]
fn pickup_mode_is_observable_when_starting_away_from_the_rack() {
    let rack = Location::new(0, 0);
    let belt = Location::new(4, 4);
    let mut scheduler = Scheduler::with_robots(
        layout(5, 5, &[rack], &[belt]),
        vec![belt],
        vec![],
        vec![Location::new(2, 2)],
        SchedulerConfig {
            batch_size: Some(0),
        },
        StdRng::seed_from_u64(12),
    )
    .unwrap();
    scheduler.add_package(rack, belt).unwrap();

    let report = scheduler.tick();
    assert_eq!(report.assigned, vec![(0, Task::Package(0))]);
    assert_eq!(scheduler.robots()[0].mode(), RobotMode::PickingUp);
    let snapshot = scheduler.snapshot();
    assert_eq!(snapshot.tick, 1);
    assert_eq!(snapshot.packages.len(), 1);
    assert!(snapshot.packages[0].claimed);
    assert_eq!(snapshot.robots[0].package, Some(0));
}

#[test]
fn surplus_packages_wait_for_a_free_robot() {
    let racks = [Location::new(0, 0), Location::new(2, 0), Location::new(4, 0)];
    let belt = Location::new(2, 4);
    let mut scheduler = Scheduler::with_robots(
        layout(5, 5, &racks, &[belt]),
        vec![belt],
        vec![],
        vec![Location::new(2, 2)],
        SchedulerConfig {
            batch_size: Some(3),
        },
        StdRng::seed_from_u64(13),
    )
    .unwrap();

    let report = scheduler.tick();
    assert_eq!(report.created.len(), 3);
    assert_eq!(report.assigned.len(), 1);
    let snapshot = scheduler.snapshot();
    assert_eq!(snapshot.packages.iter().filter(|p| p.claimed).count(), 1);

    let mut delivered = 0;
    for _ in 0..200 {
        let report = scheduler.tick();
        delivered += report.delivered.len();
        if delivered == 3 {
            break;
        }
        // No new batch while any package of the first one is outstanding.
        assert!(report.created.is_empty());
    }
    assert_eq!(delivered, 3);
    assert_eq!(scheduler.packages().count(), 0);
}

#[test]
fn rest_shortage_leaves_extra_robots_unassigned() {
    let rest = Location::new(3, 3);
    let mut scheduler = Scheduler::with_robots(
        layout(6, 6, &[], &[]),
        vec![],
        vec![rest],
        vec![Location::new(0, 0), Location::new(5, 5), Location::new(5, 0)],
        SchedulerConfig::default(),
        StdRng::seed_from_u64(14),
    )
    .unwrap();
    let report = scheduler.tick();
    assert!(report.created.is_empty());
    // Robot 0 asks first and gets the only rest cell.
    assert_eq!(report.assigned, vec![(0, Task::Rest(rest))]);
    for _ in 0..20 {
        scheduler.tick();
    }
    let robots = scheduler.robots();
    assert_eq!(robots[0].location(), rest);
    assert_eq!(robots[1].location(), Location::new(5, 5));
    assert_eq!(robots[2].location(), Location::new(5, 0));
    assert!(robots.iter().all(|r| r.mode() == RobotMode::Idle));
}

#[test]
fn same_seed_same_run() {
    let racks: Vec<Location> = (0..8).map(|x| Location::new(x, 0)).collect();
    let belts = vec![Location::new(0, 7), Location::new(7, 7)];
    let run = |seed: u64| {
        let mut scheduler = Scheduler::new(
            layout(8, 8, &racks, &belts),
            belts.clone(),
            vec![Location::new(3, 4)],
            3,
            SchedulerConfig::default(),
            StdRng::seed_from_u64(seed),
        )
        .unwrap();
        (0..60)
            .map(|_| {
                scheduler.tick();
                scheduler.snapshot()
            })
            .collect::<Vec<_>>()
    };
    assert_eq!(run(42), run(42));
}

#[test]
fn fleet_keeps_delivering_across_batches() {
    let racks: Vec<Location> = (1..7).map(|x| Location::new(x, 0)).collect();
    let belts = vec![Location::new(0, 5), Location::new(7, 5)];
    let mut scheduler = Scheduler::new(
        layout(8, 6, &racks, &belts),
        belts.clone(),
        vec![Location::new(1, 3), Location::new(6, 3)],
        2,
        SchedulerConfig::default(),
        StdRng::seed_from_u64(15),
    )
    .unwrap();
    let mut batches = 0;
    let mut delivered = 0;
    for _ in 0..300 {
        let report = scheduler.tick();
        if !report.created.is_empty() {
            batches += 1;
        }
        delivered += report.delivered.len();
        for robot in scheduler.robots() {
            assert!(robot.package().is_none() || robot.rest().is_none());
            assert_eq!(scheduler.grid()[robot.location()], CellType::Free);
        }
    }
    assert!(batches >= 3, "only {batches} batches");
    assert!(delivered >= 2 * (batches - 1));
}
