//! The shared cell field.
//!
//! A [`Grid`] owns the live/dead matrix, the per-cell age matrix, the
//! generation counter, the active [`RuleSet`] and the random source the
//! probabilistic rules draw from. Everything mutable sits behind one mutex so
//! a generation step can never interleave with a user edit; subscriber
//! callbacks run after that mutex is released, on whichever thread made the
//! change, so they are free to read the grid back.

use std::fmt;
use std::mem;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

use parking_lot::{Mutex, MutexGuard};
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use tracing::{debug, trace};

use crate::cells::Cells;
use crate::error::{Error, Result};
use crate::rules::RuleSet;
use crate::shapes::Shape;

/// Handle returned by [`Grid::subscribe`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct SubscriptionId(u64);

type Callback = Arc<dyn Fn() + Send + Sync>;

/// Births and deaths produced by one generation step.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct StepStats {
    pub births: u64,
    pub deaths: u64,
}

/// A consistent copy of the grid for rendering.
#[derive(Debug, Clone)]
pub struct Snapshot {
    pub generation: u64,
    pub population: usize,
    cells: Cells,
    ages: Vec<u32>,
}

impl Snapshot {
    pub fn cols(&self) -> usize {
        self.cells.cols()
    }

    pub fn rows(&self) -> usize {
        self.cells.rows()
    }

    /// Whether `(x, y)` is alive; `false` out of range.
    pub fn alive(&self, x: usize, y: usize) -> bool {
        x < self.cols() && y < self.rows() && self.cells.get(x, y)
    }

    /// Consecutive generations `(x, y)` has survived; 0 out of range.
    pub fn age(&self, x: usize, y: usize) -> u32 {
        if x < self.cols() && y < self.rows() {
            self.ages[x * self.rows() + y]
        } else {
            0
        }
    }
}

/// Everything the grid mutex protects.
pub(crate) struct GridState {
    cells: Cells,
    scratch: Cells,
    ages: Vec<u32>,
    generation: u64,
    rule_set: Option<Arc<RuleSet>>,
    rng: StdRng,
    last_step: StepStats,
}

impl GridState {
    fn index(&self, x: i32, y: i32) -> Option<usize> {
        let (x, y) = (usize::try_from(x).ok()?, usize::try_from(y).ok()?);
        (x < self.cells.cols() && y < self.cells.rows()).then(|| x * self.cells.rows() + y)
    }

    fn position(&self, x: i32, y: i32) -> Option<(usize, usize)> {
        self.index(x, y).map(|_| (x as usize, y as usize))
    }

    /// Advances one generation. Returns `false` when no rule set is active.
    pub(crate) fn transform(&mut self) -> bool {
        let Some(rule) = self.rule_set.as_deref() else {
            return false;
        };
        rule.transform(&self.cells, &mut self.scratch, &mut self.rng);

        let mut stats = StepStats::default();
        let before = self.cells.as_slice();
        let after = self.scratch.as_slice();
        for ((age, &was), &now) in self.ages.iter_mut().zip(before).zip(after) {
            match (was, now) {
                (true, true) => *age = age.saturating_add(1),
                (false, true) => {
                    stats.births += 1;
                    *age = 0;
                }
                (true, false) => {
                    stats.deaths += 1;
                    *age = 0;
                }
                (false, false) => *age = 0,
            }
        }

        mem::swap(&mut self.cells, &mut self.scratch);
        self.generation += 1;
        self.last_step = stats;
        trace!(
            generation = self.generation,
            births = stats.births,
            deaths = stats.deaths,
            "generation advanced"
        );
        true
    }
}

/// A fixed-size toroidal field of cells, safe to share between threads.
pub struct Grid {
    cols: usize,
    rows: usize,
    state: Mutex<GridState>,
    subscribers: Mutex<Vec<(SubscriptionId, Callback)>>,
    next_subscription: AtomicU64,
}

impl Grid {
    /// Creates an empty grid with an entropy-seeded random source.
    pub fn new(cols: usize, rows: usize, rule_set: Option<Arc<RuleSet>>) -> Result<Self> {
        Self::with_rng(cols, rows, rule_set, StdRng::from_entropy())
    }

    /// Creates an empty grid whose probabilistic steps and random fills are
    /// reproducible from `seed`.
    pub fn with_seed(
        cols: usize,
        rows: usize,
        rule_set: Option<Arc<RuleSet>>,
        seed: u64,
    ) -> Result<Self> {
        Self::with_rng(cols, rows, rule_set, StdRng::seed_from_u64(seed))
    }

    fn with_rng(
        cols: usize,
        rows: usize,
        rule_set: Option<Arc<RuleSet>>,
        rng: StdRng,
    ) -> Result<Self> {
        if cols == 0 || rows == 0 {
            return Err(Error::EmptyGrid { cols, rows });
        }
        Ok(Self {
            cols,
            rows,
            state: Mutex::new(GridState {
                cells: Cells::new(cols, rows),
                scratch: Cells::new(cols, rows),
                ages: vec![0; cols * rows],
                generation: 0,
                rule_set,
                rng,
                last_step: StepStats::default(),
            }),
            subscribers: Mutex::new(Vec::new()),
            next_subscription: AtomicU64::new(0),
        })
    }

    pub fn cols(&self) -> usize {
        self.cols
    }

    pub fn rows(&self) -> usize {
        self.rows
    }

    pub fn generation(&self) -> u64 {
        self.state.lock().generation
    }

    /// Whether `(x, y)` is alive. Out-of-range coordinates read as dead.
    pub fn cell(&self, x: i32, y: i32) -> bool {
        let state = self.state.lock();
        state
            .position(x, y)
            .is_some_and(|(x, y)| state.cells.get(x, y))
    }

    /// Consecutive generations `(x, y)` has stayed alive. Out-of-range
    /// coordinates read as 0.
    pub fn cell_age(&self, x: i32, y: i32) -> u32 {
        let state = self.state.lock();
        state.index(x, y).map_or(0, |i| state.ages[i])
    }

    pub fn population(&self) -> usize {
        self.state.lock().cells.population()
    }

    /// Births and deaths of the most recent generation step.
    pub fn last_step(&self) -> StepStats {
        self.state.lock().last_step
    }

    pub fn rule_set(&self) -> Option<Arc<RuleSet>> {
        self.state.lock().rule_set.clone()
    }

    pub fn snapshot(&self) -> Snapshot {
        let state = self.state.lock();
        Snapshot {
            generation: state.generation,
            population: state.cells.population(),
            cells: state.cells.clone(),
            ages: state.ages.clone(),
        }
    }

    /// Sets `(x, y)`. Out-of-range coordinates are ignored.
    pub fn set_cell(&self, x: i32, y: i32, alive: bool) {
        self.mutate(|state| match state.position(x, y) {
            Some((x, y)) => {
                state.cells.set(x, y, alive);
                true
            }
            None => false,
        });
    }

    /// Toggles `(x, y)`. Out-of-range coordinates are ignored.
    pub fn flip_cell(&self, x: i32, y: i32) {
        self.mutate(|state| match state.position(x, y) {
            Some((x, y)) => {
                let alive = state.cells.get(x, y);
                state.cells.set(x, y, !alive);
                true
            }
            None => false,
        });
    }

    /// Kills every cell and zeroes ages, the generation counter and the step
    /// statistics.
    pub fn reset(&self) {
        self.mutate(|state| {
            state.cells.clear();
            state.ages.fill(0);
            state.generation = 0;
            state.last_step = StepStats::default();
            true
        });
    }

    /// Advances one generation under the active rule set.
    ///
    /// Without a rule set this does nothing and notifies nobody. Returns
    /// whether a generation was computed.
    pub fn transform(&self) -> bool {
        self.mutate(GridState::transform)
    }

    /// Replaces the active rule set; the next [`transform`](Self::transform)
    /// uses it.
    pub fn set_rule_set(&self, rule_set: Option<Arc<RuleSet>>) {
        let name = rule_set.as_ref().map(|rs| rs.display_name()).unwrap_or_default();
        debug!(rule = %name, "rule set changed");
        self.mutate(|state| {
            state.rule_set = rule_set;
            true
        });
    }

    /// Stamps `shape` centered on `(x, y)`.
    ///
    /// The pattern's top-left corner lands on `(x - width / 2, y - height / 2)`.
    /// Live pattern cells switch grid cells on; dead pattern cells leave the
    /// grid alone. Pattern cells falling outside the grid are dropped rather
    /// than wrapped.
    pub fn draw_shape(&self, x: i32, y: i32, shape: &Shape) {
        let origin_x = i64::from(x) - (shape.width() / 2) as i64;
        let origin_y = i64::from(y) - (shape.height() / 2) as i64;
        let (cols, rows) = (self.cols as i64, self.rows as i64);

        self.mutate(|state| {
            for (px, py) in shape.live_cells() {
                let gx = origin_x + px as i64;
                let gy = origin_y + py as i64;
                if (0..cols).contains(&gx) && (0..rows).contains(&gy) {
                    state.cells.set(gx as usize, gy as usize, true);
                }
            }
            true
        });
    }

    /// Fills the grid at random, each cell alive with probability `density`.
    ///
    /// Ages restart at 0; the generation counter is left alone.
    pub fn randomize(&self, density: f64) -> Result<()> {
        if !(0.0..=1.0).contains(&density) {
            return Err(Error::InvalidDensity(density));
        }
        self.mutate(|state| {
            let GridState { cells, rng, ages, .. } = state;
            for cell in cells.as_mut_slice() {
                *cell = rng.gen_bool(density);
            }
            ages.fill(0);
            true
        });
        Ok(())
    }

    /// Replaces the random source with one seeded from `seed`.
    pub fn reseed(&self, seed: u64) {
        self.state.lock().rng = StdRng::seed_from_u64(seed);
    }

    /// Registers `callback` to run after every completed mutation.
    ///
    /// The callback runs synchronously on the mutating thread with no grid
    /// lock held. Moving work onto a UI thread is up to the subscriber.
    pub fn subscribe<F>(&self, callback: F) -> SubscriptionId
    where
        F: Fn() + Send + Sync + 'static,
    {
        let id = SubscriptionId(self.next_subscription.fetch_add(1, Ordering::Relaxed));
        self.subscribers.lock().push((id, Arc::new(callback)));
        id
    }

    /// Removes a subscription. Returns `false` if it was already gone.
    pub fn unsubscribe(&self, id: SubscriptionId) -> bool {
        let mut subscribers = self.subscribers.lock();
        let before = subscribers.len();
        subscribers.retain(|(sid, _)| *sid != id);
        subscribers.len() != before
    }

    /// Runs `f` under the grid lock and notifies subscribers if it reports a
    /// change.
    fn mutate<F>(&self, f: F) -> bool
    where
        F: FnOnce(&mut GridState) -> bool,
    {
        let changed = f(&mut self.state.lock());
        if changed {
            self.notify();
        }
        changed
    }

    pub(crate) fn lock_state(&self) -> MutexGuard<'_, GridState> {
        self.state.lock()
    }

    pub(crate) fn notify(&self) {
        let callbacks: Vec<Callback> = self
            .subscribers
            .lock()
            .iter()
            .map(|(_, cb)| Arc::clone(cb))
            .collect();
        for callback in callbacks {
            callback();
        }
    }
}

impl fmt::Debug for Grid {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Grid")
            .field("cols", &self.cols)
            .field("rows", &self.rows)
            .field("generation", &self.generation())
            .finish_non_exhaustive()
    }
}
