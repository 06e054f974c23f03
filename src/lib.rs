//! # Automata
//!
//! A Life-like cellular automaton engine: a toroidal grid of cells evolving
//! under configurable `B/S` birth/survival rules, optionally probabilistic,
//! with per-cell age tracking, live edits, shape stamping and a background
//! scheduler with pause/resume/stop control.
//!
//! ## Example
//!
//! ```
//! use std::sync::Arc;
//! use automata::{Grid, RuleSet};
//!
//! let grid = Grid::new(6, 6, Some(Arc::new(RuleSet::life()))).unwrap();
//! for (x, y) in [(2, 2), (3, 2), (2, 3), (3, 3)] {
//!     grid.set_cell(x, y, true);
//! }
//! grid.transform();
//!
//! // A block is a still life; every cell has now survived one generation.
//! assert_eq!(grid.population(), 4);
//! assert_eq!(grid.cell_age(2, 2), 1);
//! assert_eq!(grid.generation(), 1);
//! ```

pub mod catalog;
pub mod cells;
pub mod config;
pub mod error;
pub mod grid;
pub mod neighbors;
pub mod rules;
pub mod scheduler;
pub mod session;
pub mod shapes;

pub use catalog::Catalog;
pub use cells::Cells;
pub use config::Config;
pub use error::{Error, Result};
pub use grid::{Grid, Snapshot, StepStats, SubscriptionId};
pub use neighbors::count_neighbors;
pub use rules::{NeighborSet, RuleSet};
pub use scheduler::{RunState, Scheduler};
pub use session::Session;
pub use shapes::Shape;
