//! Background generation driver.
//!
//! The [`Scheduler`] owns one thread that keeps calling
//! [`Grid::transform`] while running, sleeping for the configured interval
//! between generations. Run state and interval live behind one mutex with a
//! condition variable, so a resume that arrives before the loop starts
//! waiting is still seen, and a stop cuts any sleep short.
//!
//! Lock order is always control, then grid. The loop takes the grid lock
//! before letting go of the control lock, so once [`Scheduler::pause`] or
//! [`Scheduler::stop`] returns at most the generation already in flight
//! completes.

use std::sync::Arc;
use std::thread::{self, JoinHandle};
use std::time::{Duration, Instant};

use parking_lot::{Condvar, Mutex};
use tracing::{debug, info, warn};

use crate::error::{Error, Result};
use crate::grid::Grid;

/// How long [`Scheduler::stop`] waits for the loop to acknowledge.
pub const STOP_TIMEOUT: Duration = Duration::from_millis(500);

/// Scheduler run state. `Stopped` is terminal.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RunState {
    Paused,
    Running,
    Stopped,
}

struct Control {
    state: RunState,
    interval: Duration,
    spawned: bool,
    exited: bool,
}

struct Shared {
    grid: Arc<Grid>,
    control: Mutex<Control>,
    wake: Condvar,
}

impl Shared {
    /// Blocks while paused, then computes one generation. Returns the sleep
    /// interval to apply afterwards, or `None` once stopped.
    fn next_generation(&self) -> Option<Duration> {
        let (mut state, interval) = {
            let mut control = self.control.lock();
            loop {
                match control.state {
                    RunState::Running => break,
                    RunState::Paused => self.wake.wait(&mut control),
                    RunState::Stopped => return None,
                }
            }
            (self.grid.lock_state(), control.interval)
        };

        let changed = state.transform();
        drop(state);
        if changed {
            self.grid.notify();
        }
        Some(interval)
    }

    /// Sleeps for `interval` unless stopped first.
    fn sleep(&self, interval: Duration) {
        let deadline = Instant::now() + interval;
        let mut control = self.control.lock();
        while control.state != RunState::Stopped {
            if self.wake.wait_until(&mut control, deadline).timed_out() {
                break;
            }
        }
    }

    fn run(&self) {
        while let Some(interval) = self.next_generation() {
            self.sleep(interval);
        }
        let mut control = self.control.lock();
        control.exited = true;
        self.wake.notify_all();
        debug!("scheduler loop exited");
    }
}

/// Drives a [`Grid`] from a background thread.
pub struct Scheduler {
    shared: Arc<Shared>,
    handle: Mutex<Option<JoinHandle<()>>>,
}

impl Scheduler {
    /// Creates a paused scheduler. No thread runs until [`start`](Self::start).
    pub fn new(grid: Arc<Grid>, interval: Duration) -> Self {
        Self {
            shared: Arc::new(Shared {
                grid,
                control: Mutex::new(Control {
                    state: RunState::Paused,
                    interval,
                    spawned: false,
                    exited: false,
                }),
                wake: Condvar::new(),
            }),
            handle: Mutex::new(None),
        }
    }

    pub fn grid(&self) -> &Arc<Grid> {
        &self.shared.grid
    }

    /// Spawns the loop thread. Starting twice is a no-op; a stopped
    /// scheduler cannot be started again.
    pub fn start(&self) -> Result<()> {
        let mut handle = self.handle.lock();
        let mut control = self.shared.control.lock();
        if control.state == RunState::Stopped {
            return Err(Error::SchedulerStopped);
        }
        if control.spawned {
            return Ok(());
        }

        let shared = Arc::clone(&self.shared);
        *handle = Some(
            thread::Builder::new()
                .name("automata-scheduler".into())
                .spawn(move || shared.run())?,
        );
        control.spawned = true;
        info!(
            interval_ms = control.interval.as_millis() as u64,
            "scheduler started"
        );
        Ok(())
    }

    /// Delay between automatic generations, applied from the next sleep.
    pub fn set_interval(&self, interval: Duration) {
        self.shared.control.lock().interval = interval;
        debug!(interval_ms = interval.as_millis() as u64, "scheduler interval changed");
    }

    pub fn interval(&self) -> Duration {
        self.shared.control.lock().interval
    }

    /// Stops issuing automatic generations until resumed.
    pub fn pause(&self) {
        let mut control = self.shared.control.lock();
        if control.state == RunState::Running {
            control.state = RunState::Paused;
            debug!("scheduler paused");
        }
    }

    /// Resumes automatic generations. Ignored once stopped.
    pub fn resume(&self) {
        let mut control = self.shared.control.lock();
        if control.state == RunState::Paused {
            control.state = RunState::Running;
            self.shared.wake.notify_all();
            debug!("scheduler resumed");
        }
    }

    /// Stops the loop for good and waits up to [`STOP_TIMEOUT`] for it to
    /// exit. Returns whether the loop acknowledged in time.
    pub fn stop(&self) -> bool {
        {
            let mut control = self.shared.control.lock();
            if control.state != RunState::Stopped {
                control.state = RunState::Stopped;
                info!("scheduler stopping");
            }
            self.shared.wake.notify_all();
        }

        let Some(handle) = self.handle.lock().take() else {
            let control = self.shared.control.lock();
            return !control.spawned || control.exited;
        };

        let deadline = Instant::now() + STOP_TIMEOUT;
        let acknowledged = {
            let mut control = self.shared.control.lock();
            while !control.exited {
                if self.shared.wake.wait_until(&mut control, deadline).timed_out() {
                    break;
                }
            }
            control.exited
        };

        if acknowledged {
            if handle.join().is_err() {
                warn!("scheduler thread panicked");
            }
        } else {
            warn!(
                timeout_ms = STOP_TIMEOUT.as_millis() as u64,
                "scheduler did not acknowledge stop, detaching"
            );
        }
        acknowledged
    }

    /// Computes one generation by hand. Only allowed while paused; returns
    /// whether a generation ran.
    pub fn step(&self) -> bool {
        let mut state = {
            let control = self.shared.control.lock();
            if control.state != RunState::Paused {
                return false;
            }
            self.shared.grid.lock_state()
        };
        let changed = state.transform();
        drop(state);
        if changed {
            self.shared.grid.notify();
        }
        changed
    }

    pub fn state(&self) -> RunState {
        self.shared.control.lock().state
    }

    pub fn is_paused(&self) -> bool {
        self.state() == RunState::Paused
    }

    pub fn is_running(&self) -> bool {
        self.state() == RunState::Running
    }

    pub fn is_stopped(&self) -> bool {
        self.state() == RunState::Stopped
    }
}

impl Drop for Scheduler {
    fn drop(&mut self) {
        self.stop();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::rules::RuleSet;

    const FAST: Duration = Duration::from_millis(1);

    fn blinker_grid() -> Arc<Grid> {
        let grid = Grid::new(8, 8, Some(Arc::new(RuleSet::life()))).unwrap();
        for x in 2..=4 {
            grid.set_cell(x, 3, true);
        }
        Arc::new(grid)
    }

    fn wait_until(timeout: Duration, mut cond: impl FnMut() -> bool) -> bool {
        let deadline = Instant::now() + timeout;
        while Instant::now() < deadline {
            if cond() {
                return true;
            }
            thread::sleep(Duration::from_millis(2));
        }
        cond()
    }

    #[test]
    fn test_starts_paused() {
        let grid = blinker_grid();
        let scheduler = Scheduler::new(Arc::clone(&grid), FAST);
        scheduler.start().unwrap();
        assert!(scheduler.is_paused());
        thread::sleep(Duration::from_millis(30));
        assert_eq!(grid.generation(), 0);
    }

    #[test]
    fn test_runs_when_resumed() {
        let grid = blinker_grid();
        let scheduler = Scheduler::new(Arc::clone(&grid), FAST);
        scheduler.start().unwrap();
        scheduler.resume();
        assert!(scheduler.is_running());
        assert!(wait_until(Duration::from_secs(5), || grid.generation() >= 3));
    }

    #[test]
    fn test_start_twice_is_noop() {
        let scheduler = Scheduler::new(blinker_grid(), FAST);
        scheduler.start().unwrap();
        scheduler.start().unwrap();
        assert!(scheduler.stop());
    }

    #[test]
    fn test_resume_before_start_is_not_lost() {
        let grid = blinker_grid();
        let scheduler = Scheduler::new(Arc::clone(&grid), FAST);
        scheduler.resume();
        scheduler.start().unwrap();
        assert!(wait_until(Duration::from_secs(5), || grid.generation() >= 1));
    }

    #[test]
    fn test_pause_halts_generations() {
        let grid = blinker_grid();
        let scheduler = Scheduler::new(Arc::clone(&grid), FAST);
        scheduler.start().unwrap();
        scheduler.resume();
        assert!(wait_until(Duration::from_secs(5), || grid.generation() >= 2));

        scheduler.pause();
        assert!(scheduler.is_paused());
        let paused_at = grid.generation();
        thread::sleep(Duration::from_millis(100));
        assert_eq!(grid.generation(), paused_at);

        scheduler.resume();
        assert!(wait_until(Duration::from_secs(5), || grid.generation() > paused_at));
    }

    #[test]
    fn test_stop_is_terminal() {
        let grid = blinker_grid();
        let scheduler = Scheduler::new(Arc::clone(&grid), FAST);
        scheduler.start().unwrap();
        scheduler.resume();
        assert!(wait_until(Duration::from_secs(5), || grid.generation() >= 1));

        assert!(scheduler.stop());
        assert!(scheduler.is_stopped());
        let stopped_at = grid.generation();

        scheduler.resume();
        assert!(scheduler.is_stopped());
        thread::sleep(Duration::from_millis(50));
        assert_eq!(grid.generation(), stopped_at);
        assert!(matches!(scheduler.start(), Err(Error::SchedulerStopped)));
        assert!(!scheduler.step());
    }

    #[test]
    fn test_stop_interrupts_long_sleep() {
        let grid = blinker_grid();
        let scheduler = Scheduler::new(Arc::clone(&grid), Duration::from_secs(30));
        scheduler.start().unwrap();
        scheduler.resume();
        assert!(wait_until(Duration::from_secs(5), || grid.generation() >= 1));

        let began = Instant::now();
        assert!(scheduler.stop());
        assert!(began.elapsed() < STOP_TIMEOUT);
        assert_eq!(grid.generation(), 1);
    }

    #[test]
    fn test_stop_while_paused() {
        let scheduler = Scheduler::new(blinker_grid(), FAST);
        scheduler.start().unwrap();
        assert!(scheduler.stop());
    }

    #[test]
    fn test_stop_without_start() {
        let scheduler = Scheduler::new(blinker_grid(), FAST);
        assert!(scheduler.stop());
        assert!(matches!(scheduler.start(), Err(Error::SchedulerStopped)));
    }

    #[test]
    fn test_manual_step_only_when_paused() {
        let grid = blinker_grid();
        let scheduler = Scheduler::new(Arc::clone(&grid), Duration::from_secs(30));
        scheduler.start().unwrap();
        assert!(scheduler.step());
        assert_eq!(grid.generation(), 1);

        scheduler.resume();
        assert!(!scheduler.step());
    }

    #[test]
    fn test_set_interval() {
        let scheduler = Scheduler::new(blinker_grid(), FAST);
        scheduler.set_interval(Duration::from_millis(250));
        assert_eq!(scheduler.interval(), Duration::from_millis(250));
    }

    #[test]
    fn test_edits_while_running() {
        let grid = blinker_grid();
        let scheduler = Scheduler::new(Arc::clone(&grid), FAST);
        scheduler.start().unwrap();
        scheduler.resume();
        for i in 0..200 {
            grid.flip_cell(i % 8, (i / 8) % 8);
            grid.cell_age(i % 8, 0);
        }
        assert!(scheduler.stop());
        let stopped_at = grid.generation();
        thread::sleep(Duration::from_millis(20));
        assert_eq!(grid.generation(), stopped_at);
    }

    #[test]
    fn test_drop_stops_loop() {
        let grid = blinker_grid();
        {
            let scheduler = Scheduler::new(Arc::clone(&grid), FAST);
            scheduler.start().unwrap();
            scheduler.resume();
            assert!(wait_until(Duration::from_secs(5), || grid.generation() >= 1));
        }
        let dropped_at = grid.generation();
        thread::sleep(Duration::from_millis(30));
        assert_eq!(grid.generation(), dropped_at);
    }
}
