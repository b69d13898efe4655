//! Stateless baseline agents

use std::time::Duration;

use rand::prelude::*;
use rand_chacha::ChaCha8Rng;

use crate::board::{Board, COLS};
use crate::policy::{Column, Outcome, Policy};

/// First open column, or 0 on a full board.
///
/// Runners never ask a policy to act on a full board; this keeps `act`
/// total without panicking.
pub fn fallback_column(board: &Board) -> Column {
    (0..COLS).find(|&c| board.is_column_open(c)).unwrap_or(0)
}

// ============================================================================
// RANDOM
// ============================================================================

/// Uniformly random open column
pub struct RandomPolicy {
    rng: ChaCha8Rng,
}

impl RandomPolicy {
    pub fn new(seed: u64) -> Self {
        Self { rng: ChaCha8Rng::seed_from_u64(seed) }
    }
}

impl Policy for RandomPolicy {
    fn mount(&mut self, _time_budget: Option<Duration>) {}

    fn act(&mut self, board: &Board) -> Column {
        board
            .open_columns()
            .choose(&mut self.rng)
            .copied()
            .unwrap_or_else(|| fallback_column(board))
    }

    fn finalize(&mut self, _outcome: Outcome) {}
}

// ============================================================================
// STICKY COLUMN
// ============================================================================

/// Picks a random column each game and keeps dropping there until it fills
pub struct StickyColumnPolicy {
    rng: ChaCha8Rng,
    column: Column,
}

impl StickyColumnPolicy {
    pub fn new(seed: u64) -> Self {
        let mut rng = ChaCha8Rng::seed_from_u64(seed);
        let column = rng.gen_range(0..COLS);
        Self { rng, column }
    }
}

impl Policy for StickyColumnPolicy {
    fn mount(&mut self, _time_budget: Option<Duration>) {
        self.column = self.rng.gen_range(0..COLS);
    }

    fn act(&mut self, board: &Board) -> Column {
        if !board.is_column_open(self.column) {
            if let Some(&c) = board.open_columns().choose(&mut self.rng) {
                self.column = c;
            } else {
                return fallback_column(board);
            }
        }
        self.column
    }

    fn finalize(&mut self, _outcome: Outcome) {}
}

// ============================================================================
// PREFERRED COLUMN
// ============================================================================

/// Fixed preference, else the lowest open column. Fully deterministic.
pub struct PreferredColumnPolicy {
    preferred: Column,
}

impl PreferredColumnPolicy {
    pub fn new(preferred: Column) -> Self {
        Self { preferred }
    }
}

impl Default for PreferredColumnPolicy {
    fn default() -> Self {
        Self::new(3)
    }
}

impl Policy for PreferredColumnPolicy {
    fn mount(&mut self, _time_budget: Option<Duration>) {}

    fn act(&mut self, board: &Board) -> Column {
        if board.is_column_open(self.preferred) {
            self.preferred
        } else {
            fallback_column(board)
        }
    }

    fn finalize(&mut self, _outcome: Outcome) {}
}
