//! One simulation session: a grid, its scheduler and the built-in catalog.

use std::sync::Arc;
use std::time::Duration;

use tracing::info;

use crate::catalog::Catalog;
use crate::config::{interval_for, Config};
use crate::error::Result;
use crate::grid::Grid;
use crate::rules::RuleSet;
use crate::scheduler::Scheduler;

/// Application context handed to the front end.
///
/// Replacing the grid stops the old scheduler before the new one starts, so
/// two loops never drive the simulation at once.
pub struct Session {
    catalog: Catalog,
    grid: Arc<Grid>,
    scheduler: Scheduler,
    seed: Option<u64>,
}

impl Session {
    pub fn new(config: &Config) -> Result<Self> {
        config.validate()?;
        let catalog = Catalog::builtin()?;

        let mut rule = catalog.resolve_rule(&config.rule)?;
        if let Some((birth, survival)) = config.chance {
            rule = Arc::new(rule.with_chance(birth, survival)?);
        }

        let grid = new_grid(config.cols, config.rows, Some(rule), config.seed)?;
        if config.density > 0.0 {
            grid.randomize(config.density)?;
        }

        let scheduler = Scheduler::new(Arc::clone(&grid), config.interval());
        scheduler.start()?;
        let rule_name = grid.rule_set().map(|rs| rs.display_name()).unwrap_or_default();
        info!(
            cols = config.cols,
            rows = config.rows,
            rule = %rule_name,
            "session created"
        );

        Ok(Self {
            catalog,
            grid,
            scheduler,
            seed: config.seed,
        })
    }

    pub fn catalog(&self) -> &Catalog {
        &self.catalog
    }

    pub fn grid(&self) -> &Arc<Grid> {
        &self.grid
    }

    pub fn scheduler(&self) -> &Scheduler {
        &self.scheduler
    }

    /// Swaps in an empty `cols × rows` grid, keeping the rule and speed.
    ///
    /// The old scheduler is stopped (waiting a bounded time) before the new
    /// one starts paused. Subscribers of the old grid are not carried over.
    pub fn new_grid(&mut self, cols: usize, rows: usize) -> Result<()> {
        let grid = new_grid(cols, rows, self.grid.rule_set(), self.seed)?;
        let interval = self.scheduler.interval();

        self.scheduler.stop();
        let scheduler = Scheduler::new(Arc::clone(&grid), interval);
        scheduler.start()?;

        self.grid = grid;
        self.scheduler = scheduler;
        info!(cols, rows, "session grid replaced");
        Ok(())
    }

    /// Starts a paused simulation or pauses a running one. Returns whether it
    /// is now running.
    pub fn toggle_running(&self) -> bool {
        if self.scheduler.is_running() {
            self.scheduler.pause();
        } else {
            self.scheduler.resume();
        }
        self.scheduler.is_running()
    }

    /// Single generation step; only while paused.
    pub fn step(&self) -> bool {
        self.scheduler.step()
    }

    /// Pauses and empties the grid.
    pub fn clear(&self) {
        self.scheduler.pause();
        self.grid.reset();
    }

    /// Activates a catalog rule, or one given in `B/S` notation.
    pub fn select_rule(&self, name: &str) -> Result<Arc<RuleSet>> {
        let rule = self.catalog.resolve_rule(name)?;
        self.grid.set_rule_set(Some(Arc::clone(&rule)));
        Ok(rule)
    }

    /// Generations per second while running.
    pub fn set_speed(&self, speed: u32) {
        self.scheduler.set_interval(interval_for(speed));
    }

    pub fn interval(&self) -> Duration {
        self.scheduler.interval()
    }

    /// Stops the scheduler. Returns whether it acknowledged in time.
    pub fn shutdown(&self) -> bool {
        self.scheduler.stop()
    }
}

fn new_grid(
    cols: usize,
    rows: usize,
    rule: Option<Arc<RuleSet>>,
    seed: Option<u64>,
) -> Result<Arc<Grid>> {
    let grid = match seed {
        Some(seed) => Grid::with_seed(cols, rows, rule, seed)?,
        None => Grid::new(cols, rows, rule)?,
    };
    Ok(Arc::new(grid))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::Error;

    fn quiet_config() -> Config {
        Config {
            cols: 12,
            rows: 10,
            density: 0.0,
            seed: Some(5),
            ..Config::default()
        }
    }

    #[test]
    fn test_new_session_is_paused_and_empty() {
        let session = Session::new(&quiet_config()).unwrap();
        assert!(session.scheduler().is_paused());
        assert_eq!(session.grid().population(), 0);
        assert_eq!(session.grid().cols(), 12);
        assert_eq!(session.grid().rows(), 10);
        assert_eq!(
            session.grid().rule_set().unwrap().display_name(),
            "Life (B3/S23)"
        );
        assert_eq!(session.interval(), Duration::from_millis(100));
    }

    #[test]
    fn test_density_fills_grid() {
        let config = Config {
            density: 1.0,
            ..quiet_config()
        };
        let session = Session::new(&config).unwrap();
        assert_eq!(session.grid().population(), 120);
    }

    #[test]
    fn test_rule_notation_and_chance() {
        let config = Config {
            rule: "B36/S23".into(),
            chance: Some((90.0, 95.0)),
            ..quiet_config()
        };
        let session = Session::new(&config).unwrap();
        let rule = session.grid().rule_set().unwrap();
        assert!(rule.is_probabilistic());
        assert_eq!(rule.notation(), "B36/S23");
    }

    #[test]
    fn test_bad_rule_and_chance_rejected() {
        let unknown = Config {
            rule: "Nope".into(),
            ..quiet_config()
        };
        assert!(matches!(Session::new(&unknown), Err(Error::UnknownRuleSet(_))));

        let bad_chance = Config {
            chance: Some((150.0, 50.0)),
            ..quiet_config()
        };
        assert!(matches!(
            Session::new(&bad_chance),
            Err(Error::InvalidProbability { .. })
        ));
    }

    #[test]
    fn test_step_toggle_and_clear() {
        let session = Session::new(&quiet_config()).unwrap();
        session.grid().set_cell(1, 1, true);
        assert!(session.step());
        assert_eq!(session.grid().generation(), 1);

        assert!(session.toggle_running());
        assert!(!session.step());
        assert!(!session.toggle_running());

        session.grid().set_cell(2, 2, true);
        session.clear();
        assert!(session.scheduler().is_paused());
        assert_eq!(session.grid().generation(), 0);
        assert_eq!(session.grid().population(), 0);
    }

    #[test]
    fn test_select_rule_and_speed() {
        let session = Session::new(&quiet_config()).unwrap();
        let seeds = session.select_rule("seeds").unwrap();
        assert_eq!(session.grid().rule_set(), Some(seeds));
        assert!(session.select_rule("B9/S1").is_err());

        session.set_speed(20);
        assert_eq!(session.interval(), Duration::from_millis(50));
    }

    #[test]
    fn test_new_grid_replaces_and_stops_old_scheduler() {
        let mut session = Session::new(&quiet_config()).unwrap();
        session.select_rule("HighLife").unwrap();
        session.set_speed(5);
        let old = Arc::clone(session.grid());

        session.new_grid(20, 15).unwrap();
        assert_eq!((session.grid().cols(), session.grid().rows()), (20, 15));
        assert!(!Arc::ptr_eq(&old, session.grid()));
        assert_eq!(
            session.grid().rule_set().unwrap().short_name(),
            Some("HighLife")
        );
        assert_eq!(session.interval(), Duration::from_millis(200));
        assert!(session.scheduler().is_paused());
        assert!(session.new_grid(0, 3).is_err());
    }

    #[test]
    fn test_shutdown() {
        let session = Session::new(&quiet_config()).unwrap();
        session.toggle_running();
        assert!(session.shutdown());
        assert!(session.scheduler().is_stopped());
    }
}
