//! Training job - one isolated unit of self-play and bracket play
//!
//! Level 2 - Phase-level implementation
//!
//! A job builds private policy instances for every participant, plays
//! self-play games between random distinct pairs, then one bracket, and
//! hands back the learned tables. It never touches another job's state and
//! never writes to disk.

use std::collections::BTreeMap;

use dropfour_core::ValueTable;
use dropfour_tournament::{
    run_bracket_until, BracketConfig, Competitor, Contestant, GameRecord, GameRunner, MatchConfig,
    TournamentError,
};
use rand::Rng;
use rand::SeedableRng;
use rand_chacha::ChaCha8Rng;
use serde::Serialize;
use tracing::{debug, info};

use crate::error::JobError;
use crate::roster::Roster;
use crate::shutdown::ShutdownFlag;

/// Work order for one job
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize)]
pub struct Job {
    pub id: usize,
    pub seed: u64,
}

/// What every job of a run plays
#[derive(Clone, Debug, PartialEq)]
pub struct JobConfig {
    /// Self-play games before the bracket
    pub self_play_games: u32,
    /// Finish with a bracket to crown a local champion
    pub run_bracket: bool,
    /// Bracket settings; the seed is replaced by the job seed
    pub bracket: BracketConfig,
}

impl Default for JobConfig {
    fn default() -> Self {
        Self {
            self_play_games: 50,
            run_bracket: true,
            bracket: BracketConfig::default()
                .with_match_config(MatchConfig::default().with_history(false)),
        }
    }
}

impl JobConfig {
    pub fn with_self_play_games(mut self, games: u32) -> Self {
        self.self_play_games = games;
        self
    }

    pub fn with_bracket(mut self, run: bool) -> Self {
        self.run_bracket = run;
        self
    }

    pub fn with_bracket_config(mut self, bracket: BracketConfig) -> Self {
        self.bracket = bracket;
        self
    }
}

/// Game counts for one job
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize)]
pub struct JobStats {
    pub self_play_games: u32,
    pub bracket_games: u32,
    pub draws: u32,
    /// Wins per participant over every game of the job
    pub wins: BTreeMap<String, u32>,
    /// Stopped early by a shutdown request
    pub interrupted: bool,
}

impl JobStats {
    pub fn games_played(&self) -> u32 {
        self.self_play_games + self.bracket_games
    }

    fn record(&mut self, game: &GameRecord) {
        match game.winner_name() {
            Some(name) => *self.wins.entry(name.to_string()).or_insert(0) += 1,
            None => self.draws += 1,
        }
    }
}

/// Everything a job hands back. Consumed once by the merge.
#[derive(Debug)]
pub struct PartialResult {
    pub job: Job,
    /// None when the bracket was skipped or interrupted
    pub champion: Option<String>,
    /// Learned table per participant, for learning participants only
    pub tables: BTreeMap<String, ValueTable>,
    pub stats: JobStats,
}

// ============================================================================
// Level 2 - Phases
// ============================================================================

/// Run one job (Level 2 phase)
///
/// `initial` holds one starting table per roster entry, in roster order.
pub fn run_job(
    job: Job,
    roster: &Roster,
    initial: &[ValueTable],
    config: &JobConfig,
    shutdown: &ShutdownFlag,
) -> Result<PartialResult, JobError> {
    let mut rng = ChaCha8Rng::seed_from_u64(job.seed);
    let mut competitors: Vec<Competitor> = roster
        .iter()
        .enumerate()
        .map(|(i, p)| {
            let table = initial.get(i).cloned().unwrap_or_default();
            Competitor::new(p.name.clone(), p.policy.build(mix_seed(job.seed, i as u64), table))
        })
        .collect();

    let mut stats = JobStats::default();
    self_play(&mut competitors, config, &mut rng, shutdown, &mut stats)?;

    let mut champion = None;
    if config.run_bracket && !stats.interrupted {
        let bracket = config.bracket.clone().with_seed(job.seed);
        match run_bracket_until(&mut competitors, &bracket, || shutdown.is_requested()) {
            Ok(result) => {
                for game in result.match_results().flat_map(|m| m.games.iter()) {
                    stats.bracket_games += 1;
                    stats.record(game);
                }
                champion = Some(result.champion);
            }
            Err(TournamentError::Interrupted) => stats.interrupted = true,
            Err(e) => return Err(e.into()),
        }
    }

    let tables = competitors
        .iter_mut()
        .filter_map(|c| c.policy.take_value_table().map(|t| (c.name.clone(), t)))
        .collect();

    info!(
        job = job.id,
        seed = job.seed,
        games = stats.games_played(),
        champion = champion.as_deref().unwrap_or("-"),
        "job finished"
    );

    Ok(PartialResult { job, champion, tables, stats })
}

// ============================================================================
// Level 3 - Steps
// ============================================================================

/// Games between random distinct pairs; the first drawn moves first
fn self_play<R: Rng>(
    competitors: &mut [Competitor],
    config: &JobConfig,
    rng: &mut R,
    shutdown: &ShutdownFlag,
    stats: &mut JobStats,
) -> Result<(), JobError> {
    if competitors.len() < 2 {
        return Ok(());
    }
    let match_config = &config.bracket.match_config;
    let runner = GameRunner::new(match_config.time_budget(), match_config.record_history);

    for _ in 0..config.self_play_games {
        if shutdown.is_requested() {
            debug!(played = stats.self_play_games, "self-play stopped by shutdown");
            stats.interrupted = true;
            break;
        }
        let a = rng.gen_range(0..competitors.len());
        let mut b = rng.gen_range(0..competitors.len() - 1);
        if b >= a {
            b += 1;
        }
        let (plus, minus) = two_mut(competitors, a, b);
        let game = runner.play_game(
            Contestant::new(&plus.name, plus.policy.as_mut()),
            Contestant::new(&minus.name, minus.policy.as_mut()),
        )?;
        stats.self_play_games += 1;
        stats.record(&game);
    }
    Ok(())
}

// ============================================================================
// Level 4 - Utilities
// ============================================================================

/// Splitmix64 mix of a base seed and an index
pub fn mix_seed(base: u64, i: u64) -> u64 {
    let mut x = base ^ i.wrapping_mul(0x9E37_79B9_7F4A_7C15);
    x = x.wrapping_add(0xD1B5_4A32_D192_ED03);
    x ^= x >> 30;
    x = x.wrapping_mul(0xBF58_476D_1CE4_E5B9);
    x ^= x >> 27;
    x = x.wrapping_mul(0x94D0_49BB_1331_11EB);
    x ^ (x >> 31)
}

/// Two distinct elements; callers guarantee `a != b` and both in range
fn two_mut<T>(items: &mut [T], a: usize, b: usize) -> (&mut T, &mut T) {
    if a < b {
        let (left, right) = items.split_at_mut(b);
        (&mut left[a], &mut right[0])
    } else {
        let (left, right) = items.split_at_mut(a);
        (&mut right[0], &mut left[b])
    }
}
