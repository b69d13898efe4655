//! Configuration types for match and bracket play
//!
//! Level 4 - Utilities and configuration

use std::time::Duration;

use dropfour_core::unit_probability;
use serde::{Deserialize, Serialize};

/// Extra draws tolerated beyond the games-to-win threshold before a
/// best-of-N match is stopped without a winner
pub const DRAW_SLACK: u32 = 2;

/// Best-of-N match configuration
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct MatchConfig {
    /// Games in a full series; the first side to a majority wins
    pub best_of: u32,
    /// Probability that the first-listed participant plays +1 in a game
    pub first_player_probability: f64,
    /// Advisory per-move budget handed to `mount`, in milliseconds
    pub time_budget_ms: Option<u64>,
    pub draw_slack: u32,
    /// Keep per-game board/action history in the result
    pub record_history: bool,
}

impl Default for MatchConfig {
    fn default() -> Self {
        Self {
            best_of: 3,
            first_player_probability: 0.5,
            time_budget_ms: None,
            draw_slack: DRAW_SLACK,
            record_history: true,
        }
    }
}

impl MatchConfig {
    /// Single decisive-or-drawn game
    pub fn single_game() -> Self {
        Self { best_of: 1, ..Default::default() }
    }

    pub fn with_best_of(mut self, best_of: u32) -> Self {
        self.best_of = best_of.max(1);
        self
    }

    pub fn with_first_player_probability(mut self, p: f64) -> Self {
        self.first_player_probability = unit_probability(p).unwrap_or(0.5);
        self
    }

    pub fn with_time_budget(mut self, budget: Duration) -> Self {
        self.time_budget_ms = Some(budget.as_millis() as u64);
        self
    }

    pub fn with_history(mut self, record: bool) -> Self {
        self.record_history = record;
        self
    }

    /// Wins needed to take the series
    pub fn games_to_win(&self) -> u32 {
        self.best_of.max(1) / 2 + 1
    }

    pub fn time_budget(&self) -> Option<Duration> {
        self.time_budget_ms.map(Duration::from_millis)
    }
}

/// Single-elimination bracket configuration
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct BracketConfig {
    /// Shuffle the roster before seeding the first round
    pub shuffle: bool,
    /// Seed for shuffling, side assignment and coin flips
    pub seed: u64,
    pub match_config: MatchConfig,
    /// Single games played to settle an undecided match before a coin flip
    pub max_tiebreak_games: u32,
}

impl Default for BracketConfig {
    fn default() -> Self {
        Self {
            shuffle: true,
            seed: 0,
            match_config: MatchConfig::default(),
            max_tiebreak_games: 3,
        }
    }
}

impl BracketConfig {
    pub fn with_seed(mut self, seed: u64) -> Self {
        self.seed = seed;
        self
    }

    pub fn with_shuffle(mut self, shuffle: bool) -> Self {
        self.shuffle = shuffle;
        self
    }

    pub fn with_match_config(mut self, match_config: MatchConfig) -> Self {
        self.match_config = match_config;
        self
    }
}
