//! Error types for bracket and match play

use dropfour_core::GameError;
use thiserror::Error;

/// Violations of the single-elimination pairing invariants
#[derive(Error, Clone, Debug, PartialEq, Eq)]
pub enum BracketError {
    #[error("bracket has no participants")]
    Empty,

    #[error("pairing {pair} holds two BYEs")]
    DoubleBye { pair: usize },

    #[error("cannot pair an odd number of winners ({count})")]
    OddWinners { count: usize },

    #[error("entries {first} and {second} cannot meet each other")]
    InvalidPairing { first: usize, second: usize },
}

/// A game aborted because a policy asked for an illegal column
#[derive(Error, Debug)]
pub enum MatchError {
    #[error("{player} made an illegal move: {source}")]
    InvalidMove {
        player: String,
        #[source]
        source: GameError,
    },
}

#[derive(Error, Debug)]
pub enum TournamentError {
    #[error(transparent)]
    Bracket(#[from] BracketError),

    #[error(transparent)]
    Match(#[from] MatchError),

    #[error("tournament interrupted before a champion was decided")]
    Interrupted,
}
