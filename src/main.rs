//! # Automata
//!
//! A terminal front end for the automata engine, using `ratatui` for the
//! interface and `crossterm` for terminal manipulation.
//!
//! ## Features
//!
//! * Background simulation driven by the engine's scheduler
//! * Any built-in rule set, or `B/S` notation from the command line
//! * Cell editing and shape stamping with the mouse
//! * Cell age shading
//! * Real-time statistics and memory usage
//! * Toroidal grid

use std::{
    fs::File,
    io::{self, Stdout},
    process,
    sync::{
        atomic::{AtomicBool, Ordering},
        Arc, Mutex as StdMutex, Weak,
    },
    time::{Duration, Instant},
};

use anyhow::{Context, Result};
use automata::{
    config::{SPEEDS, USAGE},
    Config, Grid, RuleSet, Session, Shape,
};
use crossterm::{
    event::{
        self, DisableMouseCapture, EnableMouseCapture, Event, KeyCode, KeyEventKind,
        KeyModifiers, MouseButton, MouseEvent, MouseEventKind,
    },
    execute,
    terminal::{disable_raw_mode, enable_raw_mode, EnterAlternateScreen, LeaveAlternateScreen},
};
use parking_lot::Mutex;
use ratatui::{
    backend::CrosstermBackend,
    layout::{Constraint, Direction, Layout, Rect},
    style::{Color, Style},
    text::{Line, Span},
    widgets::{Block, Borders, Paragraph, Wrap},
    Frame, Terminal,
};
use sysinfo::{System, SystemExt};
use tracing::{error, info, warn};
use tracing_subscriber::EnvFilter;

const UI_TICK: Duration = Duration::from_millis(33);
const MEMORY_REFRESH: Duration = Duration::from_secs(1);
const LIVE_GLYPH: char = '•';

/// Running totals for the statistics panel.
#[derive(Debug, Default)]
struct Stats {
    /// Last generation folded into the totals
    generation: u64,
    /// Total number of cells born since the last reset
    cells_created: u64,
    /// Total number of cells that died since the last reset
    cells_destroyed: u64,
}

impl Stats {
    /// Folds in the grid's latest step, or starts over after a reset.
    fn observe(&mut self, grid: &Grid) {
        let generation = grid.generation();
        if generation < self.generation {
            *self = Stats::default();
        } else if generation > self.generation {
            let step = grid.last_step();
            self.cells_created += step.births;
            self.cells_destroyed += step.deaths;
        }
        self.generation = generation;
    }
}

/// Front-end state around one simulation session.
struct App {
    session: Session,
    /// Set by the grid subscription, cleared when a frame is drawn
    dirty: Arc<AtomicBool>,
    stats: Arc<Mutex<Stats>>,
    rules: Vec<Arc<RuleSet>>,
    shapes: Vec<Arc<Shape>>,
    /// Shape stamped on click; `None` flips single cells
    shape: Option<usize>,
    speed: usize,
    density: f64,
    show_aging: bool,
    /// Inner area of the grid panel from the last frame, for mouse mapping
    grid_area: Rect,
    last_drag: Option<(i32, i32)>,
    sys: System,
    memory_refreshed: Instant,
}

impl App {
    fn new(session: Session, config: &Config) -> App {
        let rules = session.catalog().rules().cloned().collect();
        let shapes = session.catalog().shapes().cloned().collect();
        let speed = SPEEDS
            .iter()
            .position(|&s| s >= config.speed)
            .unwrap_or(SPEEDS.len() - 1);

        let mut app = App {
            session,
            dirty: Arc::new(AtomicBool::new(true)),
            stats: Arc::new(Mutex::new(Stats::default())),
            rules,
            shapes,
            shape: None,
            speed,
            density: if config.density > 0.0 { config.density } else { 0.3 },
            show_aging: false,
            grid_area: Rect::default(),
            last_drag: None,
            sys: System::new_all(),
            memory_refreshed: Instant::now(),
        };
        app.watch_grid();
        app
    }

    /// Subscribes the redraw flag and the statistics to the current grid.
    fn watch_grid(&mut self) {
        let grid = self.session.grid();
        let weak: Weak<Grid> = Arc::downgrade(grid);
        let dirty = Arc::clone(&self.dirty);
        let stats = Arc::clone(&self.stats);
        *stats.lock() = Stats::default();
        grid.subscribe(move || {
            if let Some(grid) = weak.upgrade() {
                stats.lock().observe(&grid);
            }
            dirty.store(true, Ordering::Release);
        });
        self.dirty.store(true, Ordering::Release);
    }

    fn rule_index(&self) -> usize {
        let current = self.session.grid().rule_set();
        self.rules
            .iter()
            .position(|r| Some(r) == current.as_ref())
            .unwrap_or(0)
    }

    fn cycle_rule(&mut self, forward: bool) {
        if self.rules.is_empty() {
            return;
        }
        let n = self.rules.len();
        let next = if forward {
            (self.rule_index() + 1) % n
        } else {
            (self.rule_index() + n - 1) % n
        };
        let rule = Arc::clone(&self.rules[next]);
        info!(rule = %rule.display_name(), "rule selected");
        self.session.grid().set_rule_set(Some(rule));
    }

    fn cycle_shape(&mut self) {
        self.shape = match self.shape {
            None if !self.shapes.is_empty() => Some(0),
            Some(i) if i + 1 < self.shapes.len() => Some(i + 1),
            _ => None,
        };
        self.dirty.store(true, Ordering::Release);
    }

    fn change_speed(&mut self, faster: bool) {
        self.speed = if faster {
            (self.speed + 1).min(SPEEDS.len() - 1)
        } else {
            self.speed.saturating_sub(1)
        };
        self.session.set_speed(SPEEDS[self.speed]);
        self.dirty.store(true, Ordering::Release);
    }

    /// Replaces the grid with an empty one filling the visible panel.
    fn fit_grid(&mut self) -> Result<()> {
        let cols = usize::from(self.grid_area.width.max(1));
        let rows = usize::from(self.grid_area.height.max(1));
        self.session
            .new_grid(cols, rows)
            .context("failed to create a new grid")?;
        self.watch_grid();
        Ok(())
    }

    /// Grid coordinates under a terminal position, if inside the panel.
    fn cell_at(&self, column: u16, row: u16) -> Option<(i32, i32)> {
        let area = self.grid_area;
        let inside = column >= area.x
            && column < area.x + area.width
            && row >= area.y
            && row < area.y + area.height;
        inside.then(|| (i32::from(column - area.x), i32::from(row - area.y)))
    }

    fn on_mouse(&mut self, mouse: MouseEvent) {
        let Some((x, y)) = self.cell_at(mouse.column, mouse.row) else {
            return;
        };
        let grid = self.session.grid();
        match mouse.kind {
            MouseEventKind::Down(MouseButton::Left) => {
                match self.shape.and_then(|i| self.shapes.get(i)) {
                    Some(shape) => grid.draw_shape(x, y, shape),
                    None => grid.flip_cell(x, y),
                }
                self.last_drag = Some((x, y));
            }
            MouseEventKind::Drag(MouseButton::Left) => {
                // hold shift to erase
                let alive = !mouse.modifiers.contains(KeyModifiers::SHIFT);
                if self.last_drag != Some((x, y)) {
                    grid.set_cell(x, y, alive);
                    self.last_drag = Some((x, y));
                }
            }
            MouseEventKind::Up(MouseButton::Left) => self.last_drag = None,
            _ => {}
        }
    }

    /// Handles one key press. Returns `false` when the user asked to quit.
    fn on_key(&mut self, code: KeyCode) -> Result<bool> {
        match code {
            KeyCode::Char('q') => return Ok(false),
            KeyCode::Char(' ') => {
                self.session.toggle_running();
                self.dirty.store(true, Ordering::Release);
            }
            KeyCode::Enter | KeyCode::Char('n') => {
                self.session.step();
            }
            KeyCode::Char('c') => self.session.clear(),
            KeyCode::Char('r') => self.cycle_rule(true),
            KeyCode::Char('R') => self.cycle_rule(false),
            KeyCode::Char('s') => self.cycle_shape(),
            KeyCode::Char('a') => {
                self.show_aging = !self.show_aging;
                self.dirty.store(true, Ordering::Release);
            }
            KeyCode::Char('+') | KeyCode::Char('=') => self.change_speed(true),
            KeyCode::Char('-') => self.change_speed(false),
            KeyCode::Char('x') => self.session.grid().randomize(self.density)?,
            KeyCode::Char('g') => self.fit_grid()?,
            _ => {}
        }
        Ok(true)
    }

    fn refresh_memory(&mut self) {
        if self.memory_refreshed.elapsed() >= MEMORY_REFRESH {
            self.sys.refresh_memory();
            self.memory_refreshed = Instant::now();
            self.dirty.store(true, Ordering::Release);
        }
    }
}

/// Shade for a live cell of the given age; older cells fade.
fn age_color(age: u32) -> Color {
    let fade = (1.0 - 0.05 * age as f64).max(0.2);
    Color::Rgb(0, (255.0 * fade) as u8, (80.0 * fade) as u8)
}

/// Draws the game grid to the terminal interface.
///
/// Only the part of the grid that fits the panel is shown.
fn draw_grid(f: &mut Frame, app: &mut App, area: Rect) {
    let shape = app
        .shape
        .and_then(|i| app.shapes.get(i))
        .map(|s| s.name().to_owned())
        .unwrap_or_else(|| "none".to_owned());
    let block = Block::default().borders(Borders::ALL).title(format!(
        "Automata [Space: Run/Pause | Enter: Step | c: Clear | r/R: Rule | s: Shape ({shape}) | a: Aging | +/-: Speed | x: Random | g: Fit | q: Quit]"
    ));
    app.grid_area = block.inner(area);

    let snapshot = app.session.grid().snapshot();
    let width = snapshot.cols().min(usize::from(app.grid_area.width));
    let height = snapshot.rows().min(usize::from(app.grid_area.height));
    let live = Style::default().fg(Color::White);

    let lines: Vec<Line> = (0..height)
        .map(|y| {
            let spans: Vec<Span> = (0..width)
                .map(|x| {
                    if !snapshot.alive(x, y) {
                        Span::raw(" ")
                    } else if app.show_aging {
                        Span::styled(
                            LIVE_GLYPH.to_string(),
                            Style::default().fg(age_color(snapshot.age(x, y))),
                        )
                    } else {
                        Span::styled(LIVE_GLYPH.to_string(), live)
                    }
                })
                .collect();
            Line::from(spans)
        })
        .collect();

    f.render_widget(Paragraph::new(lines).block(block), area);
}

/// Draws the statistics panel to the terminal interface.
fn draw_stats(f: &mut Frame, app: &App, area: Rect) {
    let memory_used = app.sys.used_memory() / 1024; // Convert to KB
    let memory_total = app.sys.total_memory() / 1024;

    let grid = app.session.grid();
    let stats = app.stats.lock();
    let generation = grid.generation();
    let rule = grid
        .rule_set()
        .map(|r| r.display_name())
        .unwrap_or_else(|| "none".to_owned());
    let status = if app.session.scheduler().is_running() {
        "Running"
    } else {
        "Paused"
    };

    let stats_text = format!(
        "Statistics:\n\
        Generation: {}\n\
        Population: {}\n\
        Grid: {}x{}\n\
        Cells Created: {}\n\
        Cells Destroyed: {}\n\
        Birth Rate: {:.2}/gen\n\
        Death Rate: {:.2}/gen\n\
        Rule: {}\n\
        Speed: {} gen/s\n\
        Memory Usage: {}KB/{:.2}MB\n\
        Status: {}\n",
        generation,
        grid.population(),
        grid.cols(),
        grid.rows(),
        stats.cells_created,
        stats.cells_destroyed,
        stats.cells_created as f64 / generation.max(1) as f64,
        stats.cells_destroyed as f64 / generation.max(1) as f64,
        rule,
        SPEEDS[app.speed],
        memory_used,
        memory_total as f64 / 1024.0,
        status,
    );

    let stats_widget = Paragraph::new(stats_text)
        .block(Block::default().borders(Borders::ALL).title("Statistics"))
        .wrap(Wrap { trim: true });

    f.render_widget(stats_widget, area);
}

fn draw(f: &mut Frame, app: &mut App) {
    let chunks = Layout::default()
        .direction(Direction::Horizontal)
        .constraints([Constraint::Percentage(75), Constraint::Percentage(25)].as_ref())
        .split(f.size());

    draw_grid(f, app, chunks[0]);
    draw_stats(f, app, chunks[1]);
}

/// Redraws on grid changes and dispatches input until the user quits.
fn run_event_loop(terminal: &mut Terminal<CrosstermBackend<Stdout>>, app: &mut App) -> Result<()> {
    loop {
        app.refresh_memory();
        if app.dirty.swap(false, Ordering::AcqRel) {
            terminal.draw(|f| draw(f, app))?;
        }

        if !event::poll(UI_TICK)? {
            continue;
        }
        match event::read()? {
            Event::Key(key) if key.kind == KeyEventKind::Press => {
                if !app.on_key(key.code)? {
                    return Ok(());
                }
            }
            Event::Mouse(mouse) => app.on_mouse(mouse),
            Event::Resize(..) => app.dirty.store(true, Ordering::Release),
            _ => {}
        }
    }
}

/// Sends logs to `--log-file` when given; otherwise logging stays off so it
/// cannot scribble over the interface.
fn init_logging(config: &Config) -> Result<()> {
    let Some(path) = &config.log_file else {
        return Ok(());
    };
    let file = File::create(path)
        .with_context(|| format!("failed to create log file {}", path.display()))?;
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .with_writer(StdMutex::new(file))
        .with_ansi(false)
        .init();
    Ok(())
}

/// Main entry point.
///
/// Parses the command line, starts a paused simulation session, sets up the
/// terminal interface and runs the event loop. On exit the scheduler is
/// stopped before the terminal is restored.
fn main() -> Result<()> {
    let config = match Config::from_args(std::env::args().skip(1)) {
        Ok(config) => config,
        Err(automata::Error::Usage(text)) if text == USAGE => {
            println!("{USAGE}");
            return Ok(());
        }
        Err(err) => {
            eprintln!("error: {err}\n\n{USAGE}");
            process::exit(2);
        }
    };
    init_logging(&config)?;

    let session = Session::new(&config).context("failed to start the simulation")?;
    let mut app = App::new(session, &config);

    enable_raw_mode().context("failed to enable raw mode")?;
    let mut stdout = io::stdout();
    execute!(stdout, EnterAlternateScreen, EnableMouseCapture)
        .context("failed to enter alternate screen")?;
    let backend = CrosstermBackend::new(stdout);
    let mut terminal = Terminal::new(backend).context("failed to build terminal backend")?;

    let result = run_event_loop(&mut terminal, &mut app);

    if !app.session.shutdown() {
        warn!("scheduler did not stop in time");
    }
    if let Err(err) = disable_raw_mode() {
        error!(?err, "failed to disable raw mode");
    }
    if let Err(err) = execute!(terminal.backend_mut(), LeaveAlternateScreen, DisableMouseCapture) {
        error!(?err, "failed to leave alternate screen");
    }
    terminal.show_cursor().ok();

    result
}
