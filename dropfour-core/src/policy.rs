//! Policy capability: the mount / act / finalize contract every agent implements
//!
//! Lifecycle per participant instance:
//! `new` (defensive init) -> `mount` -> `act`* -> `finalize` -> `mount` again or drop.
//! `mount` may be skipped entirely; a freshly constructed policy must already
//! be ready to act.

use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::board::{Board, Player};
use crate::value_table::ValueTable;

/// Column index in `0..COLS`
pub type Column = usize;

// ============================================================================
// OUTCOME
// ============================================================================

/// Result of a finished game from one participant's point of view
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Outcome {
    Loss,
    Draw,
    Win,
}

impl Outcome {
    /// Outcome for `seat` given the winner sign of the game (+1, -1, 0)
    pub fn for_seat(winner: i8, seat: Player) -> Self {
        match winner * seat.sign() {
            1 => Outcome::Win,
            -1 => Outcome::Loss,
            _ => Outcome::Draw,
        }
    }

    /// -1, 0 or +1
    pub fn value(self) -> i8 {
        match self {
            Outcome::Loss => -1,
            Outcome::Draw => 0,
            Outcome::Win => 1,
        }
    }

    /// The paired outcome handed to the opponent
    pub fn inverse(self) -> Self {
        match self {
            Outcome::Loss => Outcome::Win,
            Outcome::Draw => Outcome::Draw,
            Outcome::Win => Outcome::Loss,
        }
    }
}

// ============================================================================
// POLICY TRAIT
// ============================================================================

/// Decision-making agent.
///
/// `act` receives a shared borrow of the board, so a policy can never mutate
/// the caller's snapshot. Any internal copy used for keys must be derived from
/// that snapshot on every call.
pub trait Policy: Send {
    /// Reset per-game transient memory. Learned state is kept.
    fn mount(&mut self, time_budget: Option<Duration>);

    /// Choose a column with space in row 0 of `board`
    fn act(&mut self, board: &Board) -> Column;

    /// Learn from the finished game, then clear episodic memory.
    /// A no-op when nothing was recorded since the last `mount`.
    fn finalize(&mut self, outcome: Outcome);

    /// Announces which side this instance plays in the coming game.
    /// Only policies configured with [`Perspective::Seat`] care.
    fn seat(&mut self, _side: Player) {}

    /// Learned value table, for policies that keep one
    fn value_table(&self) -> Option<&ValueTable> {
        None
    }

    /// Hand the learned table over when the owning job ends
    fn take_value_table(&mut self) -> Option<ValueTable> {
        None
    }
}

// ============================================================================
// CANONICALIZATION
// ============================================================================

/// How a learning policy decides which literal side it is playing
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Perspective {
    /// Infer from piece counts: the side with fewer pieces is to move
    #[default]
    PieceCount,
    /// Trust the side announced through [`Policy::seat`]
    Seat,
}

/// Canonical board as seen by the acting agent, who always appears as +1.
///
/// Never mutates `board`. With [`Perspective::PieceCount`] the board is
/// inverted when +1 has strictly more pieces than -1, i.e. when the agent to
/// move holds fewer pieces than its opponent.
pub fn canonicalize(board: &Board, perspective: Perspective, seat: Option<Player>) -> Board {
    let invert = match (perspective, seat) {
        (Perspective::Seat, Some(side)) => side == Player::Minus,
        _ => board.count(1) > board.count(-1),
    };
    if invert {
        board.inverted()
    } else {
        *board
    }
}

/// Table key for a canonical state and an action: `"<fingerprint>|<column>"`
pub fn action_key(state_key: &str, column: Column) -> String {
    format!("{state_key}|{column}")
}

/// `p` clamped to `[0, 1]`, or None for NaN. Safe to hand to `Rng::gen_bool`.
pub fn unit_probability(p: f64) -> Option<f64> {
    (!p.is_nan()).then(|| p.clamp(0.0, 1.0))
}

// ============================================================================
// EPISODIC MEMORY
// ============================================================================

/// (state-key, action) pairs recorded since the last mount
#[derive(Clone, Debug, Default)]
pub struct EpisodeMemory {
    steps: Vec<(String, Column)>,
}

impl EpisodeMemory {
    pub fn record(&mut self, state_key: String, column: Column) {
        self.steps.push((state_key, column));
    }

    pub fn clear(&mut self) {
        self.steps.clear();
    }

    pub fn len(&self) -> usize {
        self.steps.len()
    }

    pub fn is_empty(&self) -> bool {
        self.steps.is_empty()
    }

    /// Empty the memory, yielding table keys in recording order
    pub fn drain_keys(&mut self) -> impl Iterator<Item = String> + '_ {
        self.steps.drain(..).map(|(state, col)| action_key(&state, col))
    }
}
