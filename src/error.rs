//! Error types for `pulsr`.
//!
//! The phase clock and display projections are infallible; errors only come
//! from configuration validation, profile rules and the persistence layer.

use chrono::NaiveDate;
use thiserror::Error;

/// Rejected session configuration.
#[derive(Debug, Error, PartialEq)]
pub enum ConfigError {
    #[error("target pulses must be greater than zero")]
    ZeroTargetPulses,

    #[error("pulse interval must be a positive number of seconds, got {0}")]
    InvalidPulseInterval(f64),

    #[error("{name} must be a positive number of seconds, got {value}")]
    InvalidDuration { name: &'static str, value: f64 },

    #[error("{0} must be greater than zero")]
    ZeroCount(&'static str),

    #[error("tick of {tick_secs}s is longer than the shortest phase ({shortest_secs}s)")]
    TickTooCoarse { tick_secs: f64, shortest_secs: f64 },

    #[error("block weights must be non-negative and sum to 100, got {0}")]
    InvalidWeights(f64),
}

/// A profile change the progression rules do not allow.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum ProgressError {
    #[error("a shield costs {cost} points, you have {have}")]
    NotEnoughPoints { have: u64, cost: u64 },

    #[error("you already own the maximum of {0} shields")]
    ShieldLimit(u32),

    #[error("no shields left")]
    NoShields,

    #[error("{0} is already covered")]
    DayCovered(NaiveDate),

    #[error("{0} has not happened yet")]
    FutureDay(NaiveDate),

    #[error("the week is not over yet ({0} days to go)")]
    WeekNotOver(i64),

    #[error("target is already at the maximum of {0} pulses")]
    TargetAtMaximum(u32),
}

/// Failure inside the persistence collaborator.
#[derive(Debug, Error)]
pub enum StoreError {
    #[error("database error: {0}")]
    Sqlite(#[from] rusqlite::Error),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("CSV error: {0}")]
    Csv(#[from] csv::Error),

    #[error("session has not completed yet")]
    NotCompleted,

    #[error(transparent)]
    Rejected(#[from] ProgressError),
}

/// Top-level error for the command-line front-end.
#[derive(Debug, Error)]
pub enum PulsrError {
    #[error(transparent)]
    Config(#[from] ConfigError),

    #[error(transparent)]
    Store(#[from] StoreError),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}
