//! Error types for training runs

use std::io;
use std::path::PathBuf;

use dropfour_core::{ConfigError, TableError};
use dropfour_tournament::{MatchError, TournamentError};
use thiserror::Error;

/// Failures that stop a whole training run
#[derive(Error, Debug)]
pub enum TrainError {
    #[error("no participants to train")]
    NoParticipants,

    #[error("participant name {name:?} appears more than once")]
    DuplicateParticipant { name: String },

    #[error("participant {name:?} is misconfigured: {source}")]
    InvalidPolicy {
        name: String,
        #[source]
        source: ConfigError,
    },

    #[error("failed to read roster {path}: {source}")]
    RosterIo {
        path: PathBuf,
        #[source]
        source: io::Error,
    },

    #[error("roster {path} is not valid: {source}")]
    RosterFormat {
        path: PathBuf,
        #[source]
        source: serde_json::Error,
    },

    #[error("failed to build worker pool: {0}")]
    Pool(#[from] rayon::ThreadPoolBuildError),

    #[error("all {failed} jobs failed")]
    AllJobsFailed { failed: usize },

    #[error(transparent)]
    Table(#[from] TableError),
}

/// Failure of a single job. Logged and left out of the merge.
#[derive(Error, Debug)]
pub enum JobError {
    #[error(transparent)]
    Match(#[from] MatchError),

    #[error(transparent)]
    Tournament(#[from] TournamentError),

    #[error("job panicked: {0}")]
    Panicked(String),
}

/// Why a roster document was rejected
#[derive(Error, Debug)]
pub enum RosterParse {
    #[error(transparent)]
    Format(#[from] serde_json::Error),

    #[error(transparent)]
    Invalid(#[from] TrainError),
}
