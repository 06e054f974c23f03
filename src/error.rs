//! Error types for the automata engine.

use thiserror::Error;

/// Errors raised while configuring a simulation.
///
/// Nothing in the running simulation produces errors: out-of-range
/// coordinates and a missing rule set degrade to no-ops. These variants cover
/// construction and configuration only.
#[derive(Debug, Error)]
pub enum Error {
    /// A birth or survival probability outside `0..=100`.
    #[error("{event} probability {value} is outside 0..=100")]
    InvalidProbability {
        /// Which event the probability gates ("birth" or "survival").
        event: &'static str,
        /// The rejected value.
        value: f64,
    },

    /// A neighbor count that a Moore neighborhood can never produce.
    #[error("neighbor count {0} is outside 0..=8")]
    NeighborCount(u8),

    /// Malformed `B<born>/S<survive>` notation.
    #[error("invalid rule notation {0:?}")]
    Notation(String),

    /// A grid with no columns or no rows.
    #[error("grid dimensions {cols}x{rows} must both be at least 1")]
    EmptyGrid {
        /// Requested column count.
        cols: usize,
        /// Requested row count.
        rows: usize,
    },

    /// A random fill density outside `0..=1`.
    #[error("density {0} is outside 0..=1")]
    InvalidDensity(f64),

    /// No built-in rule set with this name.
    #[error("unknown rule set {0:?}")]
    UnknownRuleSet(String),

    /// No built-in shape with this name.
    #[error("unknown shape {0:?}")]
    UnknownShape(String),

    /// A shape that could not be built from its text rows.
    #[error("invalid shape: {0}")]
    Shape(String),

    /// The scheduler was stopped and cannot be started again.
    #[error("scheduler has been stopped")]
    SchedulerStopped,

    /// The scheduler thread could not be spawned.
    #[error("failed to spawn scheduler thread: {0}")]
    Spawn(#[from] std::io::Error),

    /// Bad command-line usage.
    #[error("{0}")]
    Usage(String),
}

/// Result alias for fallible configuration calls.
pub type Result<T> = std::result::Result<T, Error>;
