mod config;
mod console;
mod map_loader;

use std::{
    collections::{HashSet, VecDeque},
    fs::File,
    io::{self, Stdout},
    path::Path,
    time::{Duration, Instant},
};

use anyhow::{Context, Result, bail};
use clap::Parser;
use log::info;
use rand::{SeedableRng, rngs::StdRng};
use ratatui::{
    crossterm::{
        self,
        event::{self, DisableMouseCapture, EnableMouseCapture, Event, KeyCode},
        execute,
        terminal::{EnterAlternateScreen, LeaveAlternateScreen, disable_raw_mode, enable_raw_mode},
    },
    prelude::*,
    widgets::*,
};
use warehouse_core::{CellType, Location, RobotMode, Scheduler};

use crate::{
    config::{Args, Settings},
    console::{Output, cell_symbol, run_headless},
    map_loader::load_map,
};

/// Number of delivery lines kept in the event log pane.
const EVENT_LOG_LEN: usize = 8;

struct App {
    /// The warehouse simulation.
    scheduler: Scheduler<StdRng>,
    tick_rate: Duration,
    tick_limit: Option<u64>,
    /// Flag to control the main loop.
    should_quit: bool,
    paused: bool,
    delivered: usize,
    events: VecDeque<String>,
    /// Index into the belts whose policy is drawn as arrows, if any.
    policy_overlay: Option<usize>,
}

impl App {
    fn new(scheduler: Scheduler<StdRng>, settings: &Settings) -> Self {
        App {
            scheduler,
            tick_rate: settings.tick,
            tick_limit: settings.ticks,
            should_quit: false,
            paused: false,
            delivered: 0,
            events: VecDeque::with_capacity(EVENT_LOG_LEN),
            policy_overlay: None,
        }
    }

    fn finished(&self) -> bool {
        self.tick_limit
            .is_some_and(|limit| self.scheduler.current_tick() >= limit)
    }

    /// Handles one step of the simulation.
    fn tick(&mut self) {
        if self.finished() {
            return;
        }
        let report = self.scheduler.tick();
        for event in report.delivered {
            self.delivered += 1;
            if self.events.len() == EVENT_LOG_LEN {
                self.events.pop_front();
            }
            self.events.push_back(format!(
                "tick {}: robot {} delivered package {}",
                event.tick, event.robot, event.package
            ));
        }
    }

    fn cycle_overlay(&mut self) {
        let belts = self.scheduler.belts().len();
        self.policy_overlay = match self.policy_overlay {
            None if belts > 0 => Some(0),
            Some(index) if index + 1 < belts => Some(index + 1),
            _ => None,
        };
    }

    /// Sets the quit flag.
    fn quit(&mut self) {
        self.should_quit = true;
    }
}

fn main() -> Result<()> {
    // Parse command line arguments
    let args = Args::parse();
    init_logging(args.log_file.as_deref())?;
    let settings = Settings::from_args(&args)?;
    if !settings.map.exists() {
        bail!("Map file does not exist: {}", settings.map.display());
    }
    let mut scheduler = build_scheduler(&settings)?;

    if args.headless {
        let output = if args.quiet {
            Output::Summary
        } else if args.json {
            Output::Json
        } else {
            Output::Map
        };
        let mut stdout = io::stdout().lock();
        run_headless(&mut scheduler, settings.headless_ticks(), output, &mut stdout)?;
        return Ok(());
    }

    // Set up the terminal
    let mut terminal = setup_terminal()?;

    // Create the application state
    let mut app = App::new(scheduler, &settings);

    // Run the main application loop
    let result = run_app(&mut terminal, &mut app);

    // Restore the terminal state
    restore_terminal(&mut terminal)?;

    result
}

/// Sends `log` output to `log_file`, or stderr. `RUST_LOG` sets the level.
fn init_logging(log_file: Option<&Path>) -> Result<()> {
    let mut builder =
        env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("warn"));
    if let Some(path) = log_file {
        let file = File::create(path)
            .with_context(|| format!("Failed to create log file {}", path.display()))?;
        builder.target(env_logger::Target::Pipe(Box::new(file)));
    }
    builder.init();
    Ok(())
}

fn build_scheduler(settings: &Settings) -> Result<Scheduler<StdRng>> {
    let map = load_map(&settings.map)?;
    let mut rests = map.rests;
    for rest in &settings.extra_rests {
        if !rests.contains(rest) {
            rests.push(*rest);
        }
    }
    let robots = settings.robots.unwrap_or(rests.len().max(1));
    let seed = settings.seed.unwrap_or_else(rand::random);
    info!(
        "map {}: {} robots, seed {seed}",
        settings.map.display(),
        robots
    );
    Scheduler::new(
        map.grid,
        map.belts,
        rests,
        robots,
        settings.scheduler.clone(),
        StdRng::seed_from_u64(seed),
    )
    .context("Failed to set up the warehouse")
}

/// Configures the terminal for TUI interaction.
fn setup_terminal() -> Result<Terminal<CrosstermBackend<Stdout>>> {
    let mut stdout = io::stdout();
    enable_raw_mode()?;
    execute!(stdout, EnterAlternateScreen, EnableMouseCapture)?;
    let backend = CrosstermBackend::new(stdout);
    Terminal::new(backend).map_err(Into::into)
}

/// Restores the terminal to its original state.
fn restore_terminal(terminal: &mut Terminal<CrosstermBackend<Stdout>>) -> Result<()> {
    disable_raw_mode()?;
    execute!(
        terminal.backend_mut(),
        LeaveAlternateScreen,
        DisableMouseCapture
    )?;
    terminal.show_cursor()?;
    Ok(())
}

/// Runs the main loop of the TUI application.
fn run_app(terminal: &mut Terminal<CrosstermBackend<Stdout>>, app: &mut App) -> Result<()> {
    let mut last_tick = Instant::now();

    loop {
        terminal.draw(|f| ui(f, app))?;

        let timeout = app
            .tick_rate
            .checked_sub(last_tick.elapsed())
            .unwrap_or_else(|| Duration::from_secs(0));

        if crossterm::event::poll(timeout)? {
            if let Event::Key(key) = event::read()? {
                match key.code {
                    KeyCode::Char('q') | KeyCode::Esc => app.quit(),
                    KeyCode::Char(' ') => app.paused = !app.paused,
                    KeyCode::Char('n') if app.paused => app.tick(),
                    KeyCode::Char('p') => app.cycle_overlay(),
                    _ => {}
                }
            }
        }

        if last_tick.elapsed() >= app.tick_rate {
            if !app.paused {
                app.tick();
            }
            last_tick = Instant::now();
        }

        if app.should_quit {
            break;
        }
    }
    Ok(())
}

/// Renders the user interface.
fn ui(frame: &mut Frame, app: &App) {
    let main_layout = Layout::default()
        .direction(Direction::Vertical)
        .constraints([
            Constraint::Min(5),     // Map
            Constraint::Length(10), // Fleet and events
            Constraint::Length(2),  // Status/help
        ])
        .split(frame.area());
    let lower = Layout::default()
        .direction(Direction::Horizontal)
        .constraints([Constraint::Percentage(50), Constraint::Percentage(50)])
        .split(main_layout[1]);

    render_map(frame, main_layout[0], app);
    render_fleet(frame, lower[0], &app.scheduler);

    let events: Vec<ListItem> = app.events.iter().map(|e| ListItem::new(e.as_str())).collect();
    let events = List::new(events).block(Block::default().borders(Borders::ALL).title("Deliveries"));
    frame.render_widget(events, lower[1]);

    let overlay = match app.policy_overlay {
        Some(index) => format!(" | policy: belt {}", app.scheduler.belts()[index]),
        None => String::new(),
    };
    let state = if app.finished() {
        "finished"
    } else if app.paused {
        "paused"
    } else {
        "running"
    };
    let help_text = Paragraph::new(format!(
        "Tick {} ({state}) | delivered {} | outstanding {}{overlay} | q quit, space pause, n step, p policy",
        app.scheduler.current_tick(),
        app.delivered,
        app.scheduler.packages().count(),
    ))
    .alignment(Alignment::Center)
    .block(Block::default().borders(Borders::TOP));
    frame.render_widget(help_text, main_layout[2]);
}

fn mode_style(mode: RobotMode) -> Style {
    match mode {
        RobotMode::Idle => Style::default().fg(Color::White),
        RobotMode::PickingUp => Style::default().fg(Color::Yellow),
        RobotMode::Delivering => Style::default().fg(Color::Green),
        RobotMode::Resting => Style::default().fg(Color::Cyan),
    }
}

/// Lists every robot with its position and task.
fn render_fleet(frame: &mut Frame, area: Rect, scheduler: &Scheduler<StdRng>) {
    let items: Vec<ListItem> = scheduler
        .robots()
        .iter()
        .map(|robot| {
            let task = match (robot.package(), robot.rest()) {
                (Some(package), _) => format!(
                    "package {} {} -> {}",
                    package.id, package.source, package.destination
                ),
                (None, Some(rest)) => format!("rest {rest}"),
                (None, None) => String::new(),
            };
            ListItem::from(Line::from(vec![
                Span::styled(
                    format!("Robot {} {:?}", robot.id(), robot.mode()),
                    mode_style(robot.mode()),
                ),
                Span::raw(format!(" at {} {task}", robot.location())),
            ]))
        })
        .collect();
    let fleet = List::new(items).block(Block::default().borders(Borders::ALL).title("Fleet"));
    frame.render_widget(fleet, area);
}

/// Renders the warehouse map onto the frame.
fn render_map(frame: &mut Frame, area: Rect, app: &App) {
    let scheduler = &app.scheduler;
    let grid = scheduler.grid();
    let packages: HashSet<Location> = scheduler.packages().map(|p| p.source).collect();
    let robot_cells: HashSet<Location> = scheduler.robots().iter().map(|r| r.location()).collect();
    let overlay = app
        .policy_overlay
        .and_then(|index| scheduler.belts().get(index))
        .and_then(|&belt| scheduler.belt_policy(belt));
    // Cells still ahead of robots delivering to the overlaid belt.
    let routes: HashSet<Location> = overlay
        .map(|policy| {
            scheduler
                .robots()
                .iter()
                .filter(|r| r.package().is_some_and(|p| p.destination == policy.target()))
                .filter(|r| r.mode() == RobotMode::Delivering)
                .flat_map(|r| policy.route_from(r.location()))
                .collect()
        })
        .unwrap_or_default();

    let mut lines: Vec<Line> = Vec::with_capacity(grid.height());
    for y in 0..grid.height() {
        let mut spans: Vec<Span> = Vec::with_capacity(grid.width());
        for x in 0..grid.width() {
            let location = Location::new(x, y);
            let cell = grid[location];
            let symbol = cell_symbol(cell, location, &packages, &robot_cells, scheduler.rests());
            let span = match symbol {
                'p' => Span::styled("p", Style::default().fg(Color::Yellow).bold()),
                '@' => {
                    let mode = scheduler
                        .robots()
                        .iter()
                        .find(|r| r.location() == location)
                        .map_or(RobotMode::Idle, |r| r.mode());
                    Span::styled("@", mode_style(mode).bold())
                }
                'R' => Span::styled("R", Style::default().fg(Color::Cyan)),
                ' ' => match overlay.and_then(|policy| policy.action_at(location)) {
                    Some(action) => {
                        let color = if routes.contains(&location) {
                            Color::Green
                        } else {
                            Color::DarkGray
                        };
                        Span::styled(action.arrow().to_string(), Style::default().fg(color))
                    }
                    None => Span::raw(" "),
                },
                other => {
                    let style = match cell {
                        CellType::Wall => Style::default().fg(Color::DarkGray),
                        CellType::Rack => Style::default().fg(Color::Magenta),
                        CellType::Belt => Style::default().fg(Color::Blue).bold(),
                        CellType::Free => Style::default(),
                    };
                    Span::styled(other.to_string(), style)
                }
            };
            spans.push(span);
        }
        lines.push(Line::from(spans));
    }

    let map_paragraph = Paragraph::new(lines)
        .block(Block::default().title("Warehouse").borders(Borders::ALL))
        .alignment(Alignment::Center);

    frame.render_widget(map_paragraph, area);
}
