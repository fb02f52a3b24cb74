use std::{
    path::{Path, PathBuf},
    time::Duration,
};

use anyhow::{Context, Result};
use clap::Parser;
use serde::Deserialize;
use warehouse_core::{Location, SchedulerConfig};

const DEFAULT_MAP: &str = "maps/warehouse_small.txt";
const DEFAULT_TICK_MS: u64 = 200;
const DEFAULT_HEADLESS_TICKS: u64 = 500;

#[derive(Parser, Debug, Default)]
#[command(version, about = "Warehouse robot fleet simulator", long_about = None)]
pub struct Args {
    /// Map file to load
    #[arg(short, long, value_name = "MAP_FILE")]
    pub map: Option<PathBuf>,

    /// TOML configuration file
    #[arg(short, long, value_name = "CONFIG_FILE")]
    pub config: Option<PathBuf>,

    /// Number of robots (defaults to the number of rest cells)
    #[arg(short, long)]
    pub robots: Option<usize>,

    /// Packages per batch (defaults to the number of robots)
    #[arg(short, long)]
    pub packages: Option<usize>,

    /// Seed for robot placement and package batches
    #[arg(short, long)]
    pub seed: Option<u64>,

    /// Milliseconds between ticks
    #[arg(long)]
    pub tick_ms: Option<u64>,

    /// Stop after this many ticks
    #[arg(long)]
    pub ticks: Option<u64>,

    /// Print to stdout instead of opening the terminal UI
    #[arg(long)]
    pub headless: bool,

    /// Headless: only print the final summary
    #[arg(short, long, requires = "headless")]
    pub quiet: bool,

    /// Headless: emit one JSON snapshot per tick instead of the map
    #[arg(long, requires = "headless")]
    pub json: bool,

    /// Write log output to this file
    #[arg(long, value_name = "LOG_FILE")]
    pub log_file: Option<PathBuf>,
}

/// Contents of the optional TOML configuration file.
#[derive(Debug, Default, Deserialize, PartialEq, Eq)]
#[serde(default, deny_unknown_fields)]
pub struct FileConfig {
    pub map: Option<PathBuf>,
    pub robots: Option<usize>,
    pub packages_per_batch: Option<usize>,
    pub seed: Option<u64>,
    pub tick_ms: Option<u64>,
    pub ticks: Option<u64>,
    /// Rest cells as `[x, y]` pairs, added to those marked in the map.
    pub rests: Vec<[usize; 2]>,
}

impl FileConfig {
    pub fn load(path: &Path) -> Result<Self> {
        let text = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read config file {}", path.display()))?;
        toml::from_str(&text).with_context(|| format!("Invalid config file {}", path.display()))
    }
}

/// Run settings after merging the config file with command-line flags.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Settings {
    pub map: PathBuf,
    /// `None` means one robot per rest cell.
    pub robots: Option<usize>,
    pub scheduler: SchedulerConfig,
    pub seed: Option<u64>,
    pub tick: Duration,
    pub ticks: Option<u64>,
    pub extra_rests: Vec<Location>,
}

impl Settings {
    /// Command-line values win over file values.
    pub fn resolve(args: &Args, file: FileConfig) -> Self {
        Settings {
            map: args
                .map
                .clone()
                .or(file.map)
                .unwrap_or_else(|| PathBuf::from(DEFAULT_MAP)),
            robots: args.robots.or(file.robots),
            scheduler: SchedulerConfig {
                batch_size: args.packages.or(file.packages_per_batch),
            },
            seed: args.seed.or(file.seed),
            tick: Duration::from_millis(args.tick_ms.or(file.tick_ms).unwrap_or(DEFAULT_TICK_MS)),
            ticks: args.ticks.or(file.ticks),
            extra_rests: file
                .rests
                .into_iter()
                .map(|[x, y]| Location::new(x, y))
                .collect(),
        }
    }

    pub fn from_args(args: &Args) -> Result<Self> {
        let file = match &args.config {
            Some(path) => FileConfig::load(path)?,
            None => FileConfig::default(),
        };
        Ok(Self::resolve(args, file))
    }

    /// Tick limit for headless runs, which always terminate.
    pub fn headless_ticks(&self) -> u64 {
        self.ticks.unwrap_or(DEFAULT_HEADLESS_TICKS)
    }
}
