//! Match play - best-of-N series between two policies
//!
//! Level 2 - Phase-level implementation

use dropfour_core::unit_probability;
use rand::Rng;
use serde::Serialize;
use tracing::debug;

use crate::config::MatchConfig;
use crate::error::MatchError;
use crate::game_runner::{Contestant, GameRecord, GameRunner};

/// Which of the two listed participants
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize)]
pub enum MatchSide {
    First,
    Second,
}

/// Result of a match (one or more games)
#[derive(Clone, Debug, Serialize)]
pub struct MatchResult {
    pub first: String,
    pub second: String,
    pub first_wins: u32,
    pub second_wins: u32,
    pub draws: u32,
    pub games_played: u32,
    /// Games in which the first participant moved first
    pub first_as_plus: u32,
    /// Stopped by the draw limit before either side reached a majority
    pub forced_stop: bool,
    pub games: Vec<GameRecord>,
}

impl MatchResult {
    fn empty(first: &str, second: &str) -> Self {
        Self {
            first: first.to_string(),
            second: second.to_string(),
            first_wins: 0,
            second_wins: 0,
            draws: 0,
            games_played: 0,
            first_as_plus: 0,
            forced_stop: false,
            games: Vec::new(),
        }
    }

    /// Side that reached `games_to_win`, if any
    pub fn winner(&self, games_to_win: u32) -> Option<MatchSide> {
        if self.first_wins >= games_to_win {
            Some(MatchSide::First)
        } else if self.second_wins >= games_to_win {
            Some(MatchSide::Second)
        } else {
            None
        }
    }

    /// Side with more game wins, None when level
    pub fn leader(&self) -> Option<MatchSide> {
        match self.first_wins.cmp(&self.second_wins) {
            std::cmp::Ordering::Greater => Some(MatchSide::First),
            std::cmp::Ordering::Less => Some(MatchSide::Second),
            std::cmp::Ordering::Equal => None,
        }
    }

    pub fn name_of(&self, side: MatchSide) -> &str {
        match side {
            MatchSide::First => &self.first,
            MatchSide::Second => &self.second,
        }
    }

    pub fn draw_rate(&self) -> f32 {
        if self.games_played == 0 {
            0.0
        } else {
            self.draws as f32 / self.games_played as f32
        }
    }

    fn record(&mut self, game: GameRecord, first_is_plus: bool) {
        self.games_played += 1;
        if first_is_plus {
            self.first_as_plus += 1;
        }
        match (game.winner, first_is_plus) {
            (0, _) => self.draws += 1,
            (1, true) | (-1, false) => self.first_wins += 1,
            _ => self.second_wins += 1,
        }
        self.games.push(game);
    }
}

/// Play a best-of-N match (Level 2 phase)
///
/// Each game the first participant plays +1 with probability
/// `first_player_probability`. Play continues until one side reaches
/// `games_to_win`, or draws exceed `games_to_win + draw_slack`.
pub fn play_match<R: Rng>(
    mut first: Contestant<'_>,
    mut second: Contestant<'_>,
    config: &MatchConfig,
    rng: &mut R,
) -> Result<MatchResult, MatchError> {
    let runner = GameRunner::new(config.time_budget(), config.record_history);
    let needed = config.games_to_win();
    let draw_limit = needed + config.draw_slack;

    let mut result = MatchResult::empty(first.name, second.name);

    while result.winner(needed).is_none() {
        if result.draws > draw_limit {
            result.forced_stop = true;
            debug!(first = first.name, second = second.name, draws = result.draws, "draw limit reached");
            break;
        }
        play_next_game(&runner, &mut first, &mut second, config, rng, &mut result)?;
    }

    Ok(result)
}

/// Exactly one game, sides drawn as in [`play_match`]. Used for tie-breaks.
pub fn play_single_game<R: Rng>(
    mut first: Contestant<'_>,
    mut second: Contestant<'_>,
    config: &MatchConfig,
    rng: &mut R,
) -> Result<MatchResult, MatchError> {
    let runner = GameRunner::new(config.time_budget(), config.record_history);
    let mut result = MatchResult::empty(first.name, second.name);
    play_next_game(&runner, &mut first, &mut second, config, rng, &mut result)?;
    Ok(result)
}

// ============================================================================
// Level 3 - Steps
// ============================================================================

fn play_next_game<R: Rng>(
    runner: &GameRunner,
    first: &mut Contestant<'_>,
    second: &mut Contestant<'_>,
    config: &MatchConfig,
    rng: &mut R,
    result: &mut MatchResult,
) -> Result<(), MatchError> {
    // NaN can still arrive through a deserialized config
    let p = unit_probability(config.first_player_probability).unwrap_or(0.5);
    let first_is_plus = rng.gen_bool(p);
    let game = if first_is_plus {
        runner.play_game(first.reborrow(), second.reborrow())?
    } else {
        runner.play_game(second.reborrow(), first.reborrow())?
    };
    result.record(game, first_is_plus);
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::game_runner::tests::{CallLog, DrawScript};
    use dropfour_core::agents::{PreferredColumnPolicy, RandomPolicy};
    use rand::SeedableRng;
    use rand_chacha::ChaCha8Rng;

    #[test]
    fn test_best_of_three_stops_at_majority() {
        let mut a = PreferredColumnPolicy::default();
        let mut b = PreferredColumnPolicy::default();
        let config = MatchConfig::default().with_first_player_probability(1.0);
        let mut rng = ChaCha8Rng::seed_from_u64(0);

        let result =
            play_match(Contestant::new("a", &mut a), Contestant::new("b", &mut b), &config, &mut rng)
                .unwrap();

        // Plus always wins this pairing, and "a" is always Plus
        assert_eq!(result.first_wins, 2);
        assert_eq!(result.games_played, 2);
        assert_eq!(result.winner(2), Some(MatchSide::First));
        assert_eq!(result.first_as_plus, 2);
        assert!(!result.forced_stop);
    }

    #[test]
    fn test_nan_first_player_probability_still_plays() {
        let mut a = RandomPolicy::new(1);
        let mut b = RandomPolicy::new(2);
        let mut config = MatchConfig::default();
        config.first_player_probability = f64::NAN;
        let mut rng = ChaCha8Rng::seed_from_u64(9);

        let result =
            play_match(Contestant::new("a", &mut a), Contestant::new("b", &mut b), &config, &mut rng)
                .unwrap();
        assert!(result.games_played >= 2);
    }

    #[test]
    fn test_side_assignment_follows_probability() {
        let mut a = PreferredColumnPolicy::default();
        let mut b = PreferredColumnPolicy::default();
        let config = MatchConfig::default().with_first_player_probability(0.0);
        let mut rng = ChaCha8Rng::seed_from_u64(0);

        let result =
            play_match(Contestant::new("a", &mut a), Contestant::new("b", &mut b), &config, &mut rng)
                .unwrap();
        assert_eq!(result.first_as_plus, 0);
        assert_eq!(result.winner(2), Some(MatchSide::Second));
        assert_eq!(result.name_of(MatchSide::Second), "b");
    }

    #[test]
    fn test_draw_streak_forces_stop() {
        let mut plus = DrawScript;
        let mut minus = DrawScript;
        let config = MatchConfig::default().with_first_player_probability(1.0);
        let mut rng = ChaCha8Rng::seed_from_u64(0);

        let result = play_match(
            Contestant::new("plus", &mut plus),
            Contestant::new("minus", &mut minus),
            &config,
            &mut rng,
        )
        .unwrap();

        // games_to_win 2 + slack 2: stop once draws exceed 4
        assert!(result.forced_stop);
        assert_eq!(result.draws, 5);
        assert_eq!(result.games_played, 5);
        assert_eq!(result.winner(config.games_to_win()), None);
        assert_eq!(result.leader(), None);
        assert_eq!(result.draw_rate(), 1.0);
    }

    #[test]
    fn test_single_game_plays_once_even_on_draw() {
        let mut plus = DrawScript;
        let mut minus = DrawScript;
        let config = MatchConfig::default().with_first_player_probability(1.0);
        let mut rng = ChaCha8Rng::seed_from_u64(0);

        let result = play_single_game(
            Contestant::new("plus", &mut plus),
            Contestant::new("minus", &mut minus),
            &config,
            &mut rng,
        )
        .unwrap();
        assert_eq!(result.games_played, 1);
        assert_eq!(result.draws, 1);
        assert_eq!(result.winner(1), None);
    }

    #[test]
    fn test_every_game_finalizes_both_sides() {
        let mut a = CallLog::default();
        let mut b = CallLog::default();
        let config = MatchConfig::default().with_best_of(5);
        let mut rng = ChaCha8Rng::seed_from_u64(3);

        let result =
            play_match(Contestant::new("a", &mut a), Contestant::new("b", &mut b), &config, &mut rng)
                .unwrap();

        assert_eq!(a.outcomes.len() as u32, result.games_played);
        assert_eq!(b.outcomes.len() as u32, result.games_played);
        for (x, y) in a.outcomes.iter().zip(&b.outcomes) {
            assert_eq!(x.value() + y.value(), 0);
        }
        assert_eq!(a.mounts, result.games_played);
    }

    #[test]
    fn test_match_is_reproducible_with_seed() {
        let run = |seed| {
            let mut a = RandomPolicy::new(10);
            let mut b = RandomPolicy::new(20);
            let mut rng = ChaCha8Rng::seed_from_u64(seed);
            let r = play_match(
                Contestant::new("a", &mut a),
                Contestant::new("b", &mut b),
                &MatchConfig::default().with_best_of(5),
                &mut rng,
            )
            .unwrap();
            (r.first_wins, r.second_wins, r.draws, r.first_as_plus)
        };
        assert_eq!(run(77), run(77));
    }
}
