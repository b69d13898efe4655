//! Game runner - executes single games between two policies
//!
//! Level 3 - Step-level implementation

use std::time::Duration;

use dropfour_core::{Board, Column, GameResult, GameState, Outcome, Player, Policy};
use serde::Serialize;
use tracing::trace;

use crate::error::MatchError;

/// A named policy taking part in a game
pub struct Contestant<'a> {
    pub name: &'a str,
    pub policy: &'a mut dyn Policy,
}

impl<'a> Contestant<'a> {
    pub fn new(name: &'a str, policy: &'a mut dyn Policy) -> Self {
        Self { name, policy }
    }

    /// Shorter-lived reborrow, so one contestant can play several games
    pub fn reborrow(&mut self) -> Contestant<'_> {
        Contestant { name: self.name, policy: &mut *self.policy }
    }
}

/// Transcript of one finished game. Immutable once returned.
#[derive(Clone, Debug, Serialize)]
pub struct GameRecord {
    /// Participant that played +1 (moved first)
    pub plus: String,
    /// Participant that played -1
    pub minus: String,
    /// (board before the move, column played), in order
    pub history: Vec<(Board, Column)>,
    /// +1, -1, or 0 for a draw
    pub winner: i8,
    pub moves: u32,
}

impl GameRecord {
    pub fn result(&self) -> GameResult {
        match self.winner {
            1 => GameResult::PlusWins,
            -1 => GameResult::MinusWins,
            _ => GameResult::Draw,
        }
    }

    /// Name of the winner, None for a draw
    pub fn winner_name(&self) -> Option<&str> {
        match self.winner {
            1 => Some(&self.plus),
            -1 => Some(&self.minus),
            _ => None,
        }
    }
}

/// Plays one game to completion.
///
/// Turns alternate strictly by the state's current player. Each side is told
/// its seat and mounted before the first move; once the game ends both sides
/// get `finalize` exactly once with opposite outcomes. An illegal column
/// aborts the game without finalizing either side.
pub struct GameRunner {
    time_budget: Option<Duration>,
    record_history: bool,
}

impl Default for GameRunner {
    fn default() -> Self {
        Self::new(None, true)
    }
}

impl GameRunner {
    pub fn new(time_budget: Option<Duration>, record_history: bool) -> Self {
        Self { time_budget, record_history }
    }

    pub fn play_game(
        &self,
        plus: Contestant<'_>,
        minus: Contestant<'_>,
    ) -> Result<GameRecord, MatchError> {
        plus.policy.seat(Player::Plus);
        minus.policy.seat(Player::Minus);
        plus.policy.mount(self.time_budget);
        minus.policy.mount(self.time_budget);

        let mut state = GameState::new_empty();
        let mut history = Vec::new();
        let mut moves = 0;

        while !state.is_terminal() {
            let (name, policy): (&str, &mut dyn Policy) = match state.current_player() {
                Player::Plus => (plus.name, &mut *plus.policy),
                Player::Minus => (minus.name, &mut *minus.policy),
            };

            // The policy sees a copy; the live state is never lent out
            let snapshot = *state.board();
            let col = policy.act(&snapshot);

            state
                .apply_in_place(col)
                .map_err(|source| MatchError::InvalidMove { player: name.to_string(), source })?;

            if self.record_history {
                history.push((snapshot, col));
            }
            moves += 1;
        }

        let winner = state.winner();
        plus.policy.finalize(Outcome::for_seat(winner, Player::Plus));
        minus.policy.finalize(Outcome::for_seat(winner, Player::Minus));

        trace!(plus = plus.name, minus = minus.name, winner, moves, "game finished");

        Ok(GameRecord {
            plus: plus.name.to_string(),
            minus: minus.name.to_string(),
            history,
            winner,
            moves,
        })
    }
}
