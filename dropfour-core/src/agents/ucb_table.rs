//! Learning agent: UCB1 over a persisted value table, Monte-Carlo updates
//!
//! Selection per state `s` over open columns `a`:
//!   `Q(s,a) + c * sqrt(ln N(s) / N(s,a))`, unvisited actions first.
//! On `finalize(r)` every recorded pair moves toward the outcome:
//!   `Q(s,a) <- Q(s,a) + alpha * (r - Q(s,a))`.

use std::time::Duration;

use rand::prelude::*;
use rand_chacha::ChaCha8Rng;
use rustc_hash::FxHashMap;
use serde::{Deserialize, Serialize};

use crate::agents::simple::fallback_column;
use crate::board::{Board, Player};
use crate::error::ConfigError;
use crate::policy::{
    action_key, canonicalize, unit_probability, Column, EpisodeMemory, Outcome, Perspective, Policy,
};
use crate::value_table::ValueTable;

/// Hyperparameters for [`UcbTablePolicy`]
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct UcbTableConfig {
    /// Step size of the Monte-Carlo update
    pub alpha: f64,
    /// Exploration constant of UCB1
    pub exploration_constant: f64,
    /// Probability of a uniformly random column instead of the UCB pick
    pub exploration_rate: f64,
    pub perspective: Perspective,
}

impl Default for UcbTableConfig {
    fn default() -> Self {
        Self {
            alpha: 0.2,
            exploration_constant: 2.0,
            exploration_rate: 0.0,
            perspective: Perspective::PieceCount,
        }
    }
}

impl UcbTableConfig {
    pub fn with_alpha(mut self, alpha: f64) -> Self {
        self.alpha = alpha;
        self
    }

    pub fn with_exploration_rate(mut self, rate: f64) -> Self {
        self.exploration_rate = unit_probability(rate).unwrap_or(0.0);
        self
    }

    /// Reject hyperparameters the update or exploration step cannot use
    pub fn validate(&self) -> Result<(), ConfigError> {
        ConfigError::check_step_size("alpha", self.alpha)?;
        ConfigError::check_non_negative("exploration_constant", self.exploration_constant)?;
        ConfigError::check_probability("exploration_rate", self.exploration_rate)
    }

    pub fn with_perspective(mut self, perspective: Perspective) -> Self {
        self.perspective = perspective;
        self
    }
}

/// Visit counts live only in memory: a policy built over a reloaded table
/// treats every action as unvisited until it has tried it again, so stored
/// Q-values steer selection only once each open column at a state has been
/// played in this instance's lifetime.
pub struct UcbTablePolicy {
    config: UcbTableConfig,
    table: ValueTable,
    /// Visits per canonical state
    state_visits: FxHashMap<String, u32>,
    /// Visits per action key
    action_visits: FxHashMap<String, u32>,
    memory: EpisodeMemory,
    seat: Option<Player>,
    rng: ChaCha8Rng,
}

impl UcbTablePolicy {
    /// An exploration rate outside `[0, 1]` is clamped; NaN disables exploration.
    pub fn new(mut config: UcbTableConfig, table: ValueTable, seed: u64) -> Self {
        config.exploration_rate = unit_probability(config.exploration_rate).unwrap_or(0.0);
        Self {
            config,
            table,
            state_visits: FxHashMap::default(),
            action_visits: FxHashMap::default(),
            memory: EpisodeMemory::default(),
            seat: None,
            rng: ChaCha8Rng::seed_from_u64(seed),
        }
    }

    pub fn config(&self) -> &UcbTableConfig {
        &self.config
    }

    /// Pairs recorded since the last mount
    pub fn pending(&self) -> usize {
        self.memory.len()
    }

    fn ucb(&self, key: &str, total: u32) -> f64 {
        let n = self.action_visits.get(key).copied().unwrap_or(0);
        if n == 0 {
            return f64::INFINITY;
        }
        let q = self.table.value_or(key, 0.0);
        q + self.config.exploration_constant * ((total as f64).ln() / n as f64).sqrt()
    }
}

impl Policy for UcbTablePolicy {
    fn mount(&mut self, _time_budget: Option<Duration>) {
        self.memory.clear();
    }

    fn act(&mut self, board: &Board) -> Column {
        // Legality always comes from the caller's snapshot
        let open = board.open_columns();
        if open.is_empty() {
            return fallback_column(board);
        }

        let canon = canonicalize(board, self.config.perspective, self.seat);
        let state_key = canon.fingerprint();

        let total = {
            let visits = self.state_visits.entry(state_key.clone()).or_insert(0);
            *visits += 1;
            *visits
        };

        let choice = if self.config.exploration_rate > 0.0
            && self.rng.gen_bool(self.config.exploration_rate)
        {
            *open.choose(&mut self.rng).unwrap_or(&open[0])
        } else {
            let mut best = (f64::NEG_INFINITY, open[0]);
            for &col in &open {
                let score = self.ucb(&action_key(&state_key, col), total);
                if score > best.0 {
                    best = (score, col);
                }
            }
            best.1
        };

        *self.action_visits.entry(action_key(&state_key, choice)).or_insert(0) += 1;
        self.memory.record(state_key, choice);
        choice
    }

    fn finalize(&mut self, outcome: Outcome) {
        let target = outcome.value() as f64;
        let alpha = self.config.alpha;
        for key in self.memory.drain_keys() {
            self.table.nudge(key, target, alpha);
        }
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
