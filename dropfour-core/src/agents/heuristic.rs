//! Hand-written tactical agents: positional weights, blocking, hybrids

use std::time::Duration;

use rand::prelude::*;
use rand_chacha::ChaCha8Rng;
use serde::{Deserialize, Serialize};

use crate::agents::simple::fallback_column;
use crate::board::{Board, COLS, ROWS};
use crate::policy::{canonicalize, Column, Outcome, Perspective, Policy};

/// Number of four-in-a-row lines through each cell
pub const CELL_WEIGHTS: [[i32; COLS]; ROWS] = [
    [3, 4, 5, 7, 5, 4, 3],
    [4, 6, 8, 10, 8, 6, 4],
    [5, 8, 11, 13, 11, 8, 5],
    [5, 8, 11, 13, 11, 8, 5],
    [4, 6, 8, 10, 8, 6, 4],
    [3, 4, 5, 7, 5, 4, 3],
];

/// Column preference from the centre outward
pub const CENTER_ORDER: [Column; COLS] = [3, 2, 4, 1, 5, 0, 6];

const WIN_BONUS: i32 = 1000;
const BLOCK_BONUS: i32 = 500;

/// Columns where dropping a `sign` piece completes four in a row
pub fn winning_columns(board: &Board, sign: i8) -> Vec<Column> {
    (0..COLS)
        .filter(|&col| {
            board.drop_row(col).is_some_and(|row| {
                let mut trial = *board;
                trial.set(row, col, sign);
                trial.connects_at(row, col)
            })
        })
        .collect()
}

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum HeuristicMode {
    /// Highest cell weight at the landing square
    #[default]
    Positional,
    /// Block, then win, then centre order
    Defensive,
    /// Cell weight plus large bonuses for wins and blocks
    Hybrid,
}

/// Rule-based agent. Works on the canonical board, so it is always +1.
pub struct HeuristicPolicy {
    mode: HeuristicMode,
    rng: ChaCha8Rng,
}

impl HeuristicPolicy {
    pub fn new(mode: HeuristicMode, seed: u64) -> Self {
        Self { mode, rng: ChaCha8Rng::seed_from_u64(seed) }
    }

    pub fn mode(&self) -> HeuristicMode {
        self.mode
    }

    fn defensive(&mut self, board: &Board) -> Option<Column> {
        // Blocking first: a missed block loses, a missed win can wait a turn
        let threats = winning_columns(board, -1);
        if let Some(&c) = threats.choose(&mut self.rng) {
            return Some(c);
        }
        let wins = winning_columns(board, 1);
        if let Some(&c) = wins.choose(&mut self.rng) {
            return Some(c);
        }
        CENTER_ORDER.iter().copied().find(|&c| board.is_column_open(c))
    }

    fn scored(&self, board: &Board, bonuses: bool) -> Option<Column> {
        let wins = if bonuses { winning_columns(board, 1) } else { Vec::new() };
        let blocks = if bonuses { winning_columns(board, -1) } else { Vec::new() };

        let mut best: Option<(i32, Column)> = None;
        for col in CENTER_ORDER {
            let Some(row) = board.drop_row(col) else { continue };
            let mut score = CELL_WEIGHTS[row][col];
            if wins.contains(&col) {
                score += WIN_BONUS;
            }
            if blocks.contains(&col) {
                score += BLOCK_BONUS;
            }
            // Strict comparison keeps the more central column on ties
            if best.map_or(true, |(s, _)| score > s) {
                best = Some((score, col));
            }
        }
        best.map(|(_, col)| col)
    }
}

impl Policy for HeuristicPolicy {
    fn mount(&mut self, _time_budget: Option<Duration>) {}

    fn act(&mut self, board: &Board) -> Column {
        let canon = canonicalize(board, Perspective::PieceCount, None);
        let choice = match self.mode {
            HeuristicMode::Positional => self.scored(&canon, false),
            HeuristicMode::Defensive => self.defensive(&canon),
            HeuristicMode::Hybrid => self.scored(&canon, true),
        };
        choice
            .filter(|&c| board.is_column_open(c))
            .unwrap_or_else(|| fallback_column(board))
    }

    fn finalize(&mut self, _outcome: Outcome) {}
}
