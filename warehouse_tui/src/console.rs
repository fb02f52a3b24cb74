use std::{collections::HashSet, io::Write};

use anyhow::Result;
use log::info;
use rand::Rng;
use warehouse_core::{CellType, Location, Scheduler};

/// How the headless runner reports each tick.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Output {
    Map,
    Json,
    Summary,
}

/// Totals of a headless run.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct Summary {
    pub ticks: u64,
    pub batches: usize,
    pub delivered: usize,
}

/// Glyph for a map cell: packages over robots over rests over terrain.
pub fn cell_symbol(
    cell: CellType,
    location: Location,
    packages: &HashSet<Location>,
    robots: &HashSet<Location>,
    rests: &[Location],
) -> char {
    if packages.contains(&location) {
        'p'
    } else if robots.contains(&location) {
        '@'
    } else if rests.contains(&location) {
        'R'
    } else {
        match cell {
            CellType::Free => ' ',
            CellType::Rack => '*',
            CellType::Wall => '#',
            CellType::Belt => 'B',
        }
    }
}

/// Draws the warehouse as plain text, one line per row.
pub fn render_text<R: Rng>(scheduler: &Scheduler<R>) -> String {
    let grid = scheduler.grid();
    let packages: HashSet<Location> = scheduler.packages().map(|p| p.source).collect();
    let robots: HashSet<Location> = scheduler.robots().iter().map(|r| r.location()).collect();
    let mut text = String::with_capacity((grid.width() + 1) * grid.height());
    for (location, cell) in grid.enumerate() {
        text.push(cell_symbol(*cell, location, &packages, &robots, scheduler.rests()));
        if location.x + 1 == grid.width() {
            text.push('\n');
        }
    }
    text
}

/// Runs `ticks` ticks without a terminal UI.
pub fn run_headless<R: Rng, W: Write>(
    scheduler: &mut Scheduler<R>,
    ticks: u64,
    output: Output,
    out: &mut W,
) -> Result<Summary> {
    let mut summary = Summary::default();
    for _ in 0..ticks {
        let report = scheduler.tick();
        summary.ticks = report.tick;
        if !report.created.is_empty() {
            summary.batches += 1;
        }
        summary.delivered += report.delivered.len();
        match output {
            Output::Map => {
                writeln!(out, "tick {}", report.tick)?;
                write!(out, "{}", render_text(scheduler))?;
                for event in &report.delivered {
                    writeln!(out, "robot {} delivered package {}", event.robot, event.package)?;
                }
            }
            Output::Json => {
                serde_json::to_writer(&mut *out, &scheduler.snapshot())?;
                writeln!(out)?;
            }
            Output::Summary => {}
        }
    }
    writeln!(
        out,
        "{} ticks, {} batches, {} packages delivered",
        summary.ticks, summary.batches, summary.delivered
    )?;
    info!("headless run finished: {summary:?}");
    Ok(summary)
}

#[cfg(test)]
mod tests {
    use rand::{SeedableRng, rngs::StdRng};
    use warehouse_core::{SchedulerConfig, scheduler::Snapshot};

    use super::*;
    use crate::map_loader::parse_map;

    fn scheduler(text: &str, robots: Vec<Location>) -> Scheduler<StdRng> {
        let map = parse_map(text).unwrap();
        Scheduler::with_robots(
            map.grid,
            map.belts,
            map.rests,
            robots,
            SchedulerConfig::default(),
            StdRng::seed_from_u64(1),
        )
        .unwrap()
    }

    #[test]
    fn renders_robots_and_rest_cells() {
        let scheduler = scheduler("#####\n#R  B\n#####", vec![Location::new(2, 1)]);
        assert_eq!(render_text(&scheduler), "#####\n#R@ B\n#####\n");
    }

    #[test]
    fn json_output_has_one_snapshot_per_tick() {
        let mut scheduler = scheduler("*   B\n     ", vec![Location::new(2, 1)]);
        let mut buffer = Vec::new();
        let summary = run_headless(&mut scheduler, 12, Output::Json, &mut buffer).unwrap();
        let text = String::from_utf8(buffer).unwrap();
        let lines: Vec<&str> = text.lines().collect();
        assert_eq!(lines.len(), 13);
        let last: Snapshot = serde_json::from_str(lines[11]).unwrap();
        assert_eq!(last.tick, 12);
        assert_eq!(summary.ticks, 12);
        assert!(summary.batches >= 1);
        assert!(summary.delivered >= 1);
    }

    #[test]
    fn summary_output_prints_only_totals() {
        let mut scheduler = scheduler("*  B", vec![Location::new(1, 0)]);
        let mut buffer = Vec::new();
        let summary = run_headless(&mut scheduler, 3, Output::Summary, &mut buffer).unwrap();
        assert_eq!(summary.ticks, 3);
        let text = String::from_utf8(buffer).unwrap();
        assert_eq!(text.lines().count(), 1);
    }
}
