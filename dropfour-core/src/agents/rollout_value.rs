//! On-policy rollout agent
//!
//! Each open column is scored by one short random rollout from the canonical
//! board. The chosen action's table entry moves toward that estimate right
//! away; the terminal outcome is ignored.

use std::time::Duration;

use rand::prelude::*;
use rand_chacha::ChaCha8Rng;
use serde::{Deserialize, Serialize};

use crate::agents::simple::fallback_column;
use crate::board::{Board, Player};
use crate::error::ConfigError;
use crate::game::GameState;
use crate::policy::{action_key, canonicalize, Column, EpisodeMemory, Outcome, Perspective, Policy};
use crate::value_table::ValueTable;

#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct RolloutValueConfig {
    pub alpha: f64,
    /// Random plies simulated after the candidate move
    pub rollout_depth: u32,
    pub perspective: Perspective,
}

impl Default for RolloutValueConfig {
    fn default() -> Self {
        Self { alpha: 0.15, rollout_depth: 3, perspective: Perspective::PieceCount }
    }
}

impl RolloutValueConfig {
    pub fn validate(&self) -> Result<(), ConfigError> {
        ConfigError::check_step_size("alpha", self.alpha)
    }
}

pub struct RolloutValuePolicy {
    config: RolloutValueConfig,
    table: ValueTable,
    memory: EpisodeMemory,
    seat: Option<Player>,
    rng: ChaCha8Rng,
}

impl RolloutValuePolicy {
    pub fn new(config: RolloutValueConfig, table: ValueTable, seed: u64) -> Self {
        Self {
            config,
            table,
            memory: EpisodeMemory::default(),
            seat: None,
            rng: ChaCha8Rng::seed_from_u64(seed),
        }
    }

    /// Value of dropping in `col` for the canonical +1 side.
    /// Bounded loop; an unfinished rollout scores 0.
    fn estimate(&mut self, root: &GameState, col: Column) -> f64 {
        let mut state = root.clone();
        if state.apply_in_place(col).is_err() {
            return f64::NEG_INFINITY;
        }
        for _ in 0..self.config.rollout_depth {
            if state.is_terminal() {
                break;
            }
            let moves = state.legal_moves();
            let Some(&next) = moves.choose(&mut self.rng) else { break };
            if state.apply_in_place(next).is_err() {
                break;
            }
        }
        state.winner() as f64
    }
}

impl Policy for RolloutValuePolicy {
    fn mount(&mut self, _time_budget: Option<Duration>) {
        self.memory.clear();
    }

    fn act(&mut self, board: &Board) -> Column {
        let canon = canonicalize(board, self.config.perspective, self.seat);
        let root = match GameState::from_board(canon, Player::Plus) {
            Ok(state) if !state.is_terminal() => state,
            _ => return fallback_column(board),
        };

        let mut best: Option<(f64, Column)> = None;
        for col in board.open_columns() {
            let value = self.estimate(&root, col);
            if best.map_or(true, |(v, _)| value > v) {
                best = Some((value, col));
            }
        }
        let Some((value, col)) = best else {
            return fallback_column(board);
        };

        let state_key = canon.fingerprint();
        self.table.nudge(action_key(&state_key, col), value, self.config.alpha);
        self.memory.record(state_key, col);
        col
    }

    fn finalize(&mut self, _outcome: Outcome) {
        self.memory.clear();
    }

    fn seat(&mut self, side: Player) {
        self.seat = Some(side);
    }

    fn value_table(&self) -> Option<&ValueTable> {
        Some(&self.table)
    }

    fn take_value_table(&mut self) -> Option<ValueTable> {
        Some(std::mem::take(&mut self.table))
    }
}
