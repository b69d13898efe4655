//! Match command - best-of-N series between two roster participants
//!
//! ## Architecture (4-layer granularity)
//!
//! - Level 1: run() - orchestration
//! - Level 2: load_competitors(), report_results()
//! - Level 3: build_match_config(), write_transcript()
//! - Level 4: formatting utilities

use std::path::{Path, PathBuf};
use std::time::Duration;

use anyhow::{bail, Context, Result};
use clap::Args;
use rand::SeedableRng;
use rand_chacha::ChaCha8Rng;

use dropfour_tournament::{play_match, Competitor, Contestant, MatchConfig, MatchResult};

use crate::{build_competitor, resolve_seed, save_tables, RosterArgs};

// ============================================================================
// COMMAND ARGUMENTS (Level 4 - Configuration)
// ============================================================================

#[derive(Args)]
pub struct MatchArgs {
    /// First participant (roster name)
    #[arg(long)]
    pub first: String,

    /// Second participant (roster name)
    #[arg(long)]
    pub second: String,

    /// Games in the series; the first side to a majority wins
    #[arg(long, default_value = "3")]
    pub best_of: u32,

    /// Probability that the first participant moves first in each game
    #[arg(long, default_value = "0.5", value_parser = parse_probability)]
    pub first_player_probability: f64,

    /// Advisory per-move time budget in milliseconds
    #[arg(long, value_name = "MS")]
    pub time_budget: Option<u64>,

    /// Write the match with every game's move history as JSON
    #[arg(long, value_name = "FILE")]
    pub transcript: Option<PathBuf>,

    /// Save learned tables after the match
    #[arg(long)]
    pub save_tables: bool,

    /// Output results as JSON
    #[arg(long)]
    pub json: bool,

    #[command(flatten)]
    pub roster: RosterArgs,
}

// ============================================================================
// LEVEL 1 - ORCHESTRATION
// ============================================================================

/// Run match command
///
/// This function reads like a table of contents:
/// 1. Build both competitors with their stored tables
/// 2. Play the series
/// 3. Write transcript and tables if asked
/// 4. Report results
pub fn run(args: MatchArgs, seed: Option<u64>) -> Result<()> {
    let seed = resolve_seed(seed);
    let mut competitors = load_competitors(&args, seed)?;
    let config = build_match_config(&args);

    tracing::info!(
        "Starting match: {} vs {} (best of {}, seed={})",
        args.first,
        args.second,
        config.best_of,
        seed
    );

    let mut rng = ChaCha8Rng::seed_from_u64(seed);
    let result = {
        let (first, second) = competitors.split_at_mut(1);
        let (a, b) = (&mut first[0].0, &mut second[0].0);
        play_match(
            Contestant::new(&a.name, a.policy.as_mut()),
            Contestant::new(&b.name, b.policy.as_mut()),
            &config,
            &mut rng,
        )?
    };

    if let Some(path) = &args.transcript {
        write_transcript(&result, path)?;
    }
    if args.save_tables {
        save_tables(&competitors)?;
    }

    report_results(&result, &config, &args)
}

// ============================================================================
// LEVEL 2 - PHASES
// ============================================================================

/// Both competitors, in argument order, with their table paths
fn load_competitors(args: &MatchArgs, seed: u64) -> Result<Vec<(Competitor, Option<PathBuf>)>> {
    if args.first == args.second {
        bail!("A participant cannot play itself: {}", args.first);
    }
    let roster = args.roster.load()?;

    [&args.first, &args.second]
        .into_iter()
        .enumerate()
        .map(|(i, name)| {
            let participant = roster
                .get(name)
                .with_context(|| format!("Unknown participant {:?}; roster has {:?}", name, roster.names()))?;
            let path = args.roster.table_path(participant);
            Ok((build_competitor(participant, path.as_ref(), seed, i), path))
        })
        .collect()
}

fn report_results(result: &MatchResult, config: &MatchConfig, args: &MatchArgs) -> Result<()> {
    if args.json {
        let json = serde_json::to_string_pretty(result)?;
        println!("{}", json);
    } else {
        print_summary(result, config);
    }
    Ok(())
}

// ============================================================================
// LEVEL 3 - STEPS
// ============================================================================

fn build_match_config(args: &MatchArgs) -> MatchConfig {
    let mut config = MatchConfig::default()
        .with_best_of(args.best_of)
        .with_first_player_probability(args.first_player_probability)
        .with_history(args.transcript.is_some());
    if let Some(ms) = args.time_budget {
        config = config.with_time_budget(Duration::from_millis(ms));
    }
    config
}

fn write_transcript(result: &MatchResult, path: &Path) -> Result<()> {
    let json = serde_json::to_string_pretty(result)?;
    std::fs::write(path, json)
        .with_context(|| format!("Failed to write transcript: {}", path.display()))?;
    tracing::info!("Saved transcript of {} games to {}", result.games_played, path.display());
    Ok(())
}

// ============================================================================
// LEVEL 4 - UTILITIES
// ============================================================================

fn print_summary(result: &MatchResult, config: &MatchConfig) {
    println!("\n=== Match Results ===");
    println!("{} vs {}", result.first, result.second);
    println!("Games played: {}", result.games_played);
    println!("{} wins: {} ({} games as first mover)", result.first, result.first_wins, result.first_as_plus);
    println!("{} wins: {}", result.second, result.second_wins);
    println!("Draws: {} ({:.1}%)", result.draws, result.draw_rate() * 100.0);
    println!("Winner: {}", winner_line(result, config.games_to_win()));
}

fn parse_probability(s: &str) -> std::result::Result<f64, String> {
    let p: f64 = s.parse().map_err(|e| format!("{e}"))?;
    if (0.0..=1.0).contains(&p) {
        Ok(p)
    } else {
        Err(format!("{s} is not a probability in [0, 1]"))
    }
}

fn winner_line(result: &MatchResult, games_to_win: u32) -> String {
    match result.winner(games_to_win) {
        Some(side) => result.name_of(side).to_string(),
        None if result.forced_stop => match result.leader() {
            Some(side) => format!("none (draw limit, {} leads)", result.name_of(side)),
            None => "none (draw limit, level)".to_string(),
        },
        None => "none".to_string(),
    }
}

// ============================================================================
// TESTS
// ============================================================================
