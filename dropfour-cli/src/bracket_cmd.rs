//! Bracket command - one single-elimination tournament over the roster
//!
//! ## Architecture (4-layer granularity)
//!
//! - Level 1: run() - orchestration
//! - Level 2: load_competitors(), report_results()
//! - Level 3: build_bracket_config()
//! - Level 4: formatting utilities

use std::path::PathBuf;
use std::time::Duration;

use anyhow::{Context, Result};
use clap::{ArgAction, Args};

use dropfour_tournament::{
    rounds_needed, run_bracket, BracketConfig, BracketMatch, BracketResult, Competitor, Decision,
    MatchConfig,
};

use crate::{build_competitor, resolve_seed, save_tables, RosterArgs};

// ============================================================================
// COMMAND ARGUMENTS (Level 4 - Configuration)
// ============================================================================

#[derive(Args)]
pub struct BracketArgs {
    /// Games per match
    #[arg(long, default_value = "3")]
    pub best_of: u32,

    /// Shuffle the roster before seeding the first round
    #[arg(long, default_value_t = true, action = ArgAction::Set)]
    pub shuffle: bool,

    /// Single games played to settle an undecided match before a coin flip
    #[arg(long, default_value = "3")]
    pub tiebreak_games: u32,

    /// Advisory per-move time budget in milliseconds
    #[arg(long, value_name = "MS")]
    pub time_budget: Option<u64>,

    /// Only these participants (comma separated)
    #[arg(long, value_delimiter = ',')]
    pub only: Vec<String>,

    /// Save learned tables after the tournament
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

/// Run bracket command
///
/// This function reads like a table of contents:
/// 1. Build competitors from the roster
/// 2. Run the bracket
/// 3. Save tables if asked
/// 4. Report rounds and champion
pub fn run(args: BracketArgs, seed: Option<u64>) -> Result<()> {
    let seed = resolve_seed(seed);
    let entries = load_competitors(&args, seed)?;
    let config = build_bracket_config(&args, seed);

    tracing::info!(
        "Starting bracket: {} participants, {} rounds, seed={}",
        entries.len(),
        rounds_needed(entries.len()),
        seed
    );

    let (mut competitors, paths): (Vec<Competitor>, Vec<Option<PathBuf>>) = entries.into_iter().unzip();
    let result = run_bracket(&mut competitors, &config).context("Bracket failed")?;

    if args.save_tables {
        let entries: Vec<_> = competitors.into_iter().zip(paths).collect();
        save_tables(&entries)?;
    }

    report_results(&result, &args)
}

// ============================================================================
// LEVEL 2 - PHASES
// ============================================================================

fn load_competitors(args: &BracketArgs, seed: u64) -> Result<Vec<(Competitor, Option<PathBuf>)>> {
    let mut roster = args.roster.load()?;
    if !args.only.is_empty() {
        roster = roster
            .select(&args.only)
            .with_context(|| format!("None of {:?} are in the roster", args.only))?;
    }

    Ok(roster
        .iter()
        .enumerate()
        .map(|(i, participant)| {
            let path = args.roster.table_path(participant);
            (build_competitor(participant, path.as_ref(), seed, i), path)
        })
        .collect())
}

fn report_results(result: &BracketResult, args: &BracketArgs) -> Result<()> {
    if args.json {
        let json = serde_json::to_string_pretty(result)?;
        println!("{}", json);
    } else {
        print_summary(result);
    }
    Ok(())
}

// ============================================================================
// LEVEL 3 - STEPS
// ============================================================================

fn build_bracket_config(args: &BracketArgs, seed: u64) -> BracketConfig {
    let mut match_config = MatchConfig::default().with_best_of(args.best_of).with_history(false);
    if let Some(ms) = args.time_budget {
        match_config = match_config.with_time_budget(Duration::from_millis(ms));
    }
    let mut config = BracketConfig::default()
        .with_seed(seed)
        .with_shuffle(args.shuffle)
        .with_match_config(match_config);
    config.max_tiebreak_games = args.tiebreak_games;
    config
}

// ============================================================================
// LEVEL 4 - UTILITIES
// ============================================================================

fn print_summary(result: &BracketResult) {
    println!("\n=== Bracket Results ===");
    for round in &result.rounds {
        println!("Round {}:", round.round);
        for m in &round.matches {
            println!("  {}", match_line(m));
        }
    }
    println!("\nGames played: {}", result.games_played());
    println!("Champion: {}", result.champion);
}

fn match_line(m: &BracketMatch) -> String {
    let Some(second) = &m.second else {
        return format!("{} advances (bye)", m.first);
    };
    let detail = match (m.decision, m.results.first()) {
        (Decision::Series, Some(series)) => {
            format!("{}-{}, {} draws", series.first_wins, series.second_wins, series.draws)
        }
        (Decision::Tiebreak, _) => format!("tie-break after {} games", m.games_played()),
        (Decision::CoinFlip, _) => format!("coin flip after {} games", m.games_played()),
        _ => String::new(),
    };
    format!("{} vs {} -> {} ({})", m.first, second, m.winner, detail)
}

// ============================================================================
// TESTS
// ============================================================================
