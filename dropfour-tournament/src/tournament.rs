//! Tournament execution - single elimination with BYEs
//!
//! Level 1 - Orchestration and Level 2 - Phases

use dropfour_core::Policy;
use rand::{Rng, SeedableRng};
use rand_chacha::ChaCha8Rng;
use serde::Serialize;
use tracing::{debug, info};

use crate::bracket::{advance_round, initial_pairing, Advance, Pairing};
use crate::config::BracketConfig;
use crate::error::{BracketError, TournamentError};
use crate::game_runner::Contestant;
use crate::match_play::{play_match, play_single_game, MatchResult, MatchSide};

/// Stream offset so match-side draws never replay the shuffle sequence
const PLAY_STREAM: u64 = 0x9e37_79b9_7f4a_7c15;

/// A bracket participant: its name and the one policy instance it plays with
pub struct Competitor {
    pub name: String,
    pub policy: Box<dyn Policy>,
}

impl Competitor {
    pub fn new(name: impl Into<String>, policy: Box<dyn Policy>) -> Self {
        Self { name: name.into(), policy }
    }

    fn contestant(&mut self) -> Contestant<'_> {
        Contestant::new(&self.name, self.policy.as_mut())
    }
}

/// How a bracket match was settled
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Decision {
    /// Opponent was a BYE
    Walkover,
    /// A side reached the games-to-win threshold
    Series,
    /// Series undecided; extra single games produced a winner
    Tiebreak,
    /// Still undecided after the tie-break games
    CoinFlip,
}

/// One settled pairing
#[derive(Clone, Debug, Serialize)]
pub struct BracketMatch {
    pub first: String,
    /// None for a walkover
    pub second: Option<String>,
    pub winner: String,
    pub decision: Decision,
    /// Series plus tie-break games, in order
    pub results: Vec<MatchResult>,
}

impl BracketMatch {
    pub fn games_played(&self) -> u32 {
        self.results.iter().map(|r| r.games_played).sum()
    }
}

#[derive(Clone, Debug, Serialize)]
pub struct RoundSummary {
    pub round: u32,
    pub matches: Vec<BracketMatch>,
}

/// Result of a complete bracket
#[derive(Clone, Debug, Serialize)]
pub struct BracketResult {
    pub champion: String,
    /// Index of the champion in the competitor slice
    pub champion_index: usize,
    pub rounds: Vec<RoundSummary>,
}

impl BracketResult {
    pub fn games_played(&self) -> u32 {
        self.rounds
            .iter()
            .flat_map(|r| r.matches.iter())
            .map(BracketMatch::games_played)
            .sum()
    }

    /// Every match result played, in bracket order
    pub fn match_results(&self) -> impl Iterator<Item = &MatchResult> {
        self.rounds
            .iter()
            .flat_map(|r| r.matches.iter())
            .flat_map(|m| m.results.iter())
    }
}

// ============================================================================
// Level 1 - Orchestration
// ============================================================================

/// Run a single-elimination bracket to a champion (Level 1 orchestration)
pub fn run_bracket(
    competitors: &mut [Competitor],
    config: &BracketConfig,
) -> Result<BracketResult, TournamentError> {
    run_bracket_until(competitors, config, || false)
}

/// Like [`run_bracket`], but checks `should_stop` before every match and
/// returns [`TournamentError::Interrupted`] once it reports true. A match
/// that has started always runs to completion.
pub fn run_bracket_until(
    competitors: &mut [Competitor],
    config: &BracketConfig,
    should_stop: impl Fn() -> bool,
) -> Result<BracketResult, TournamentError> {
    if competitors.len() == 1 {
        // A lone entrant is champion without playing a round
        let champion = competitors[0].name.clone();
        return Ok(BracketResult { champion, champion_index: 0, rounds: Vec::new() });
    }

    let indices: Vec<usize> = (0..competitors.len()).collect();
    let mut pairings = initial_pairing(indices, config.shuffle, config.seed)?;
    let mut rng = ChaCha8Rng::seed_from_u64(config.seed ^ PLAY_STREAM);
    let mut rounds = Vec::new();

    loop {
        let round = rounds.len() as u32 + 1;
        let (winners, matches) = play_round(competitors, pairings, config, &mut rng, &should_stop)?;
        debug!(round, matches = matches.len(), "bracket round complete");
        rounds.push(RoundSummary { round, matches });

        match advance_round(winners)? {
            Advance::Champion(index) => {
                let champion = competitors[index].name.clone();
                info!(champion = %champion, rounds = rounds.len(), "bracket finished");
                return Ok(BracketResult { champion, champion_index: index, rounds });
            }
            Advance::Next(next) => pairings = next,
        }
    }
}

// ============================================================================
// Level 2 - Phases
// ============================================================================

fn play_round<R: Rng>(
    competitors: &mut [Competitor],
    pairings: Vec<Pairing<usize>>,
    config: &BracketConfig,
    rng: &mut R,
    should_stop: &impl Fn() -> bool,
) -> Result<(Vec<usize>, Vec<BracketMatch>), TournamentError> {
    let mut winners = Vec::with_capacity(pairings.len());
    let mut matches = Vec::with_capacity(pairings.len());

    for pairing in pairings {
        let (winner, summary) = match pairing {
            Pairing::Walkover(a) => (
                a,
                BracketMatch {
                    first: competitors[a].name.clone(),
                    second: None,
                    winner: competitors[a].name.clone(),
                    decision: Decision::Walkover,
                    results: Vec::new(),
                },
            ),
            Pairing::Match(a, b) => {
                if should_stop() {
                    return Err(TournamentError::Interrupted);
                }
                settle_match(competitors, a, b, config, rng)?
            }
        };
        winners.push(winner);
        matches.push(summary);
    }

    Ok((winners, matches))
}

// ============================================================================
// Level 3 - Steps
// ============================================================================

/// Series, then tie-break games, then a coin flip
fn settle_match<R: Rng>(
    competitors: &mut [Competitor],
    a: usize,
    b: usize,
    config: &BracketConfig,
    rng: &mut R,
) -> Result<(usize, BracketMatch), TournamentError> {
    let (first, second) = pair_mut(competitors, a, b)?;
    let mut results = Vec::new();

    let series = play_match(first.contestant(), second.contestant(), &config.match_config, rng)?;
    let mut outcome = series
        .winner(config.match_config.games_to_win())
        .map(|side| (side, Decision::Series));
    results.push(series);

    let mut tiebreaks = 0;
    while outcome.is_none() && tiebreaks < config.max_tiebreak_games {
        tiebreaks += 1;
        let game =
            play_single_game(first.contestant(), second.contestant(), &config.match_config, rng)?;
        outcome = game.winner(1).map(|side| (side, Decision::Tiebreak));
        results.push(game);
    }

    let (side, decision) = outcome.unwrap_or_else(|| {
        let side = if rng.gen_bool(0.5) { MatchSide::First } else { MatchSide::Second };
        (side, Decision::CoinFlip)
    });

    let (winner, winner_name) = match side {
        MatchSide::First => (a, first.name.clone()),
        MatchSide::Second => (b, second.name.clone()),
    };
    debug!(first = %first.name, second = %second.name, ?decision, "match settled");

    Ok((
        winner,
        BracketMatch {
            first: first.name.clone(),
            second: Some(second.name.clone()),
            winner: winner_name,
            decision,
            results,
        },
    ))
}

/// Two distinct mutable elements of a slice
fn pair_mut<T>(items: &mut [T], a: usize, b: usize) -> Result<(&mut T, &mut T), BracketError> {
    if a == b || a >= items.len() || b >= items.len() {
        return Err(BracketError::InvalidPairing { first: a, second: b });
    }
    if a < b {
        let (left, right) = items.split_at_mut(b);
        Ok((&mut left[a], &mut right[0]))
    } else {
        let (left, right) = items.split_at_mut(a);
        Ok((&mut right[0], &mut left[b]))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::game_runner::tests::DrawScript;
    use dropfour_core::agents::{PreferredColumnPolicy, RandomPolicy};

    fn roster(n: usize) -> Vec<Competitor> {
        (0..n)
            .map(|i| Competitor::new(format!("p{i}"), Box::new(RandomPolicy::new(i as u64)) as Box<dyn Policy>))
            .collect()
    }

    #[test]
    fn test_single_competitor_is_champion() {
        let mut players = roster(1);
        let result = run_bracket(&mut players, &BracketConfig::default()).unwrap();
        assert_eq!(result.champion, "p0");
        assert_eq!(result.games_played(), 0);
        assert!(result.rounds.is_empty());
    }

    #[test]
    fn test_empty_bracket_fails() {
        let mut players: Vec<Competitor> = Vec::new();
        assert!(matches!(
            run_bracket(&mut players, &BracketConfig::default()),
            Err(TournamentError::Bracket(BracketError::Empty))
        ));
    }

    #[test]
    fn test_five_competitors_take_three_rounds() {
        let mut players = roster(5);
        let result = run_bracket(&mut players, &BracketConfig::default().with_seed(8)).unwrap();
        assert_eq!(result.rounds.len(), 3);

        let walkovers = result.rounds[0]
            .matches
            .iter()
            .filter(|m| m.decision == Decision::Walkover)
            .count();
        assert_eq!(walkovers, 3);
        assert_eq!(result.rounds[2].matches.len(), 1);
        assert_eq!(result.rounds[2].matches[0].winner, result.champion);
    }

    #[test]
    fn test_bracket_is_reproducible() {
        let run = || {
            let mut players = roster(6);
            let result = run_bracket(&mut players, &BracketConfig::default().with_seed(21)).unwrap();
            let games = result.games_played();
            (result.champion, games)
        };
        assert_eq!(run(), run());
    }

    #[test]
    fn test_every_match_has_a_winner_from_the_pair() {
        let mut players = roster(7);
        let result = run_bracket(&mut players, &BracketConfig::default().with_seed(2)).unwrap();
        for m in result.rounds.iter().flat_map(|r| r.matches.iter()) {
            assert!(m.winner == m.first || Some(&m.winner) == m.second.as_ref());
        }
    }

    #[test]
    fn test_deterministic_players_decide_by_side() {
        // Plus always wins between two preferred-column players, so each
        // series is decided and never reaches a coin flip
        let mut players = vec![
            Competitor::new("a", Box::new(PreferredColumnPolicy::default()) as Box<dyn Policy>),
            Competitor::new("b", Box::new(PreferredColumnPolicy::default()) as Box<dyn Policy>),
        ];
        let config = BracketConfig::default().with_shuffle(false).with_seed(4);
        let result = run_bracket(&mut players, &config).unwrap();
        let only = &result.rounds[0].matches[0];
        assert_ne!(only.decision, Decision::CoinFlip);
        assert!(result.champion == "a" || result.champion == "b");
    }

    #[test]
    fn test_endless_draws_fall_back_to_coin_flip() {
        let mut players = vec![
            Competitor::new("x", Box::new(DrawScript) as Box<dyn Policy>),
            Competitor::new("y", Box::new(DrawScript) as Box<dyn Policy>),
        ];
        let config = BracketConfig::default().with_seed(17);
        let result = run_bracket(&mut players, &config).unwrap();
        let only = &result.rounds[0].matches[0];

        assert_eq!(only.decision, Decision::CoinFlip);
        // forced stop after 5 draws, then 3 single tie-break games
        assert_eq!(only.results.len(), 4);
        assert_eq!(only.games_played(), 8);
        assert!(result.champion == "x" || result.champion == "y");

        let again = run_bracket(&mut players, &config).unwrap();
        assert_eq!(again.champion, result.champion);
    }

    #[test]
    fn test_stop_signal_interrupts_before_first_match() {
        let mut players = roster(4);
        let result = run_bracket_until(&mut players, &BracketConfig::default(), || true);
        assert!(matches!(result, Err(TournamentError::Interrupted)));
    }

    #[test]
    fn test_pair_mut_rejects_same_index() {
        let mut items = [1, 2, 3];
        assert!(pair_mut(&mut items, 1, 1).is_err());
        let (x, y) = pair_mut(&mut items, 2, 0).unwrap();
        std::mem::swap(x, y);
        assert_eq!(items, [3, 2, 1]);
    }
}
