//! Error types for the game engine and value-table storage

use std::fmt;
use std::path::PathBuf;

use thiserror::Error;

use crate::board::COLS;

/// Why a move was refused
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum MoveRejection {
    OutOfRange,
    ColumnFull,
    GameOver,
}

impl fmt::Display for MoveRejection {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            MoveRejection::OutOfRange => write!(f, "out of range (0..{COLS})"),
            MoveRejection::ColumnFull => write!(f, "column is full"),
            MoveRejection::GameOver => write!(f, "game is already over"),
        }
    }
}

/// Errors raised by board construction and state transitions
#[derive(Error, Clone, Debug, PartialEq, Eq)]
pub enum GameError {
    #[error("invalid move in column {column}: {reason}")]
    InvalidMove { column: usize, reason: MoveRejection },

    #[error("invalid cell value {value} at row {row}, column {column}")]
    InvalidCell { row: usize, column: usize, value: i8 },

    #[error("floating piece at row {row}, column {column}")]
    FloatingPiece { row: usize, column: usize },
}

impl GameError {
    pub fn is_invalid_move(&self) -> bool {
        matches!(self, GameError::InvalidMove { .. })
    }
}

/// Out-of-range agent hyperparameter
#[derive(Error, Clone, Debug, PartialEq)]
pub enum ConfigError {
    #[error("{field} must be a probability in [0, 1], got {value}")]
    Probability { field: &'static str, value: f64 },

    #[error("{field} must be in (0, 1], got {value}")]
    StepSize { field: &'static str, value: f64 },

    #[error("{field} must be finite and non-negative, got {value}")]
    NonNegative { field: &'static str, value: f64 },
}

impl ConfigError {
    pub(crate) fn check_probability(field: &'static str, value: f64) -> Result<(), Self> {
        if (0.0..=1.0).contains(&value) {
            Ok(())
        } else {
            Err(ConfigError::Probability { field, value })
        }
    }

    pub(crate) fn check_step_size(field: &'static str, value: f64) -> Result<(), Self> {
        if value > 0.0 && value <= 1.0 {
            Ok(())
        } else {
            Err(ConfigError::StepSize { field, value })
        }
    }

    pub(crate) fn check_non_negative(field: &'static str, value: f64) -> Result<(), Self> {
        if value.is_finite() && value >= 0.0 {
            Ok(())
        } else {
            Err(ConfigError::NonNegative { field, value })
        }
    }
}

/// Errors raised while reading or writing a persisted value table
#[derive(Error, Debug)]
pub enum TableError {
    #[error("value table {path:?} is corrupt: {reason}")]
    Corrupt { path: PathBuf, reason: String },

    #[error("failed to {operation} {path:?}: {source}")]
    Io {
        operation: &'static str,
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("could not replace {path:?} after {attempts} attempts: {source}")]
    PersistenceRace {
        path: PathBuf,
        attempts: u32,
        #[source]
        source: std::io::Error,
    },

    #[error("serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
}
