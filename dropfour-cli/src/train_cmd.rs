//! Train command - parallel self-play training with merged value tables
//!
//! ## Architecture (4-layer granularity)
//!
//! - Level 1: run() - orchestration
//! - Level 2: run_cycles(), report_results()
//! - Level 3: build_train_config(), install_ctrl_c()
//! - Level 4: formatting utilities

use std::thread;
use std::time::Duration;

use anyhow::{Context, Result};
use chrono::{DateTime, Local};
use clap::{ArgAction, Args};
use indicatif::{ProgressBar, ProgressStyle};

use dropfour_tournament::MatchConfig;
use dropfour_train::{train, JobReport, JobStatus, Roster, RunSummary, ShutdownFlag, TrainConfig};

use crate::RosterArgs;

/// Base seed when none is given on the command line
const DEFAULT_SEED: u64 = 911;

// ============================================================================
// COMMAND ARGUMENTS (Level 4 - Configuration)
// ============================================================================

#[derive(Args)]
pub struct TrainArgs {
    /// Independent jobs per cycle
    #[arg(long, default_value = "20")]
    pub jobs: usize,

    /// Self-play games each job plays before its bracket
    #[arg(long, default_value = "50")]
    pub games_per_job: u32,

    /// Shuffle the roster before each job's bracket
    #[arg(long, default_value_t = true, action = ArgAction::Set)]
    pub shuffle: bool,

    /// Cap on worker threads (defaults to every available core)
    #[arg(long, value_name = "N")]
    pub workers: Option<usize>,

    /// Games per bracket match
    #[arg(long, default_value = "3")]
    pub best_of: u32,

    /// Skip the bracket at the end of each job
    #[arg(long)]
    pub no_bracket: bool,

    /// Training cycles, each starting from the tables saved by the last; 0 runs until Ctrl-C
    #[arg(long, default_value = "1")]
    pub cycles: u32,

    /// Output results as JSON
    #[arg(long)]
    pub json: bool,

    #[command(flatten)]
    pub roster: RosterArgs,
}

// ============================================================================
// LEVEL 1 - ORCHESTRATION
// ============================================================================

/// Run train command
///
/// This function reads like a table of contents:
/// 1. Load the roster
/// 2. Wire Ctrl-C to the shutdown flag
/// 3. Run training cycles
/// 4. Report results
pub fn run(args: TrainArgs, seed: Option<u64>) -> Result<()> {
    let roster = args.roster.load()?;
    let base_seed = seed.unwrap_or(DEFAULT_SEED);

    tracing::info!(
        "Starting training: {} participants, {} jobs x {} games, seed={}",
        roster.len(),
        args.jobs,
        args.games_per_job,
        base_seed
    );

    let shutdown = ShutdownFlag::new();
    install_ctrl_c(shutdown.clone())?;

    let started_at = Local::now();
    let summaries = run_cycles(&roster, &args, base_seed, &shutdown)?;
    let finished_at = Local::now();

    report_results(&summaries, started_at, finished_at, &args)
}

// ============================================================================
// LEVEL 2 - PHASES
// ============================================================================

/// Run cycles until the requested count or a shutdown request
fn run_cycles(
    roster: &Roster,
    args: &TrainArgs,
    base_seed: u64,
    shutdown: &ShutdownFlag,
) -> Result<Vec<RunSummary>> {
    let mut summaries = Vec::new();
    let mut cycle = 0u32;

    loop {
        let config = build_train_config(args, cycle_seed(base_seed, cycle, args.jobs));
        let progress = create_progress_bar(args.jobs, args.json)?;

        let summary = train(roster, &config, shutdown, |report| on_job_report(&progress, report))
            .with_context(|| format!("Training cycle {} failed", cycle + 1))?;
        progress.finish_and_clear();

        tracing::info!(
            "Cycle {} done: {}/{} jobs, {} games in {}",
            cycle + 1,
            summary.completed(),
            args.jobs,
            summary.games_played(),
            format_duration(Duration::from_millis(summary.elapsed_ms))
        );
        summaries.push(summary);
        cycle += 1;

        if shutdown.is_requested() {
            tracing::warn!("Stopping after cycle {} on request", cycle);
            break;
        }
        if args.cycles != 0 && cycle >= args.cycles {
            break;
        }
    }

    Ok(summaries)
}

/// Print the run as text or JSON
fn report_results(
    summaries: &[RunSummary],
    started_at: DateTime<Local>,
    finished_at: DateTime<Local>,
    args: &TrainArgs,
) -> Result<()> {
    if args.json {
        print_json_results(summaries, started_at, finished_at)
    } else {
        print_summary(summaries, started_at, finished_at);
        Ok(())
    }
}

// ============================================================================
// LEVEL 3 - STEPS
// ============================================================================

fn build_train_config(args: &TrainArgs, seed: u64) -> TrainConfig {
    TrainConfig::default()
        .with_jobs(args.jobs)
        .with_games_per_job(args.games_per_job)
        .with_seed(seed)
        .with_shuffle(args.shuffle)
        .with_max_workers(args.workers)
        .with_bracket(!args.no_bracket)
        .with_match_config(MatchConfig::default().with_best_of(args.best_of).with_history(false))
        .with_tables_dir(&args.roster.tables_dir)
}

/// Job seeds of consecutive cycles never overlap
fn cycle_seed(base: u64, cycle: u32, jobs: usize) -> u64 {
    base.wrapping_add(cycle as u64 * jobs as u64)
}

/// Watch for Ctrl-C on a dedicated runtime thread. Jobs in flight finish
/// their current game; jobs not yet started are skipped.
fn install_ctrl_c(shutdown: ShutdownFlag) -> Result<()> {
    let runtime = tokio::runtime::Builder::new_current_thread()
        .enable_all()
        .build()
        .context("Failed to build signal runtime")?;

    thread::Builder::new()
        .name("ctrl-c".to_string())
        .spawn(move || {
            runtime.block_on(async {
                if tokio::signal::ctrl_c().await.is_ok() {
                    tracing::warn!("Shutdown requested, letting running jobs finish their game");
                    shutdown.request();
                }
            })
        })
        .context("Failed to spawn signal thread")?;

    Ok(())
}

fn create_progress_bar(jobs: usize, hidden: bool) -> Result<ProgressBar> {
    if hidden {
        return Ok(ProgressBar::hidden());
    }
    let pb = ProgressBar::new(jobs as u64);
    pb.set_style(
        ProgressStyle::default_bar()
            .template("[{elapsed_precise}] {bar:40.cyan/blue} {pos}/{len} jobs {msg}")?
            .progress_chars("=>-"),
    );
    Ok(pb)
}

fn on_job_report(progress: &ProgressBar, report: &JobReport) {
    progress.inc(1);
    match &report.status {
        JobStatus::Completed { champion: Some(name), .. } => {
            progress.set_message(format!("(last champion: {})", name));
        }
        JobStatus::Failed { error } => {
            progress.println(format!("job {} (seed {}) failed: {}", report.job.id, report.job.seed, error));
        }
        _ => {}
    }
}

// ============================================================================
// LEVEL 4 - UTILITIES
// ============================================================================

/// Print JSON results to stdout
fn print_json_results(
    summaries: &[RunSummary],
    started_at: DateTime<Local>,
    finished_at: DateTime<Local>,
) -> Result<()> {
    #[derive(serde::Serialize)]
    struct JsonOutput<'a> {
        started_at: DateTime<Local>,
        finished_at: DateTime<Local>,
        interrupted: bool,
        cycles: &'a [RunSummary],
    }

    let output = JsonOutput {
        started_at,
        finished_at,
        interrupted: summaries.iter().any(|s| s.interrupted),
        cycles: summaries,
    };

    let json = serde_json::to_string_pretty(&output)?;
    println!("{}", json);

    Ok(())
}

/// Print summary to console
fn print_summary(summaries: &[RunSummary], started_at: DateTime<Local>, finished_at: DateTime<Local>) {
    println!("\n=== DROPFOUR Training Complete ===");
    println!("Started:  {}", started_at.format("%Y-%m-%d %H:%M:%S"));
    println!("Finished: {}", finished_at.format("%Y-%m-%d %H:%M:%S"));

    for (i, summary) in summaries.iter().enumerate() {
        println!(
            "\nCycle {}: {} completed, {} failed, {} games, {} workers, {}{}",
            i + 1,
            summary.completed(),
            summary.failed(),
            summary.games_played(),
            summary.workers,
            format_duration(Duration::from_millis(summary.elapsed_ms)),
            if summary.interrupted { " (interrupted)" } else { "" }
        );

        if let Some((name, titles)) = summary.top_champion() {
            println!("  Most titles: {} ({})", name, titles);
        }

        if !summary.tables.is_empty() {
            println!(
                "  {:<20} {:>10} {:>10} {:>6}  {}",
                "Table", "Keys", "Shared", "Jobs", "Path"
            );
            for table in &summary.tables {
                println!(
                    "  {:<20} {:>10} {:>10} {:>6}  {}",
                    table.merge.participant,
                    table.merge.keys,
                    table.merge.shared_keys,
                    table.merge.contributors,
                    table.path.as_ref().map_or("-".to_string(), |p| p.display().to_string())
                );
            }
        }
    }
}

/// Format duration for display
fn format_duration(d: Duration) -> String {
    if d.as_secs() >= 60 {
        format!("{}m {}s", d.as_secs() / 60, d.as_secs() % 60)
    } else if d.as_secs() >= 1 {
        format!("{:.2}s", d.as_secs_f64())
    } else {
        format!("{}ms", d.as_millis())
    }
}

// ============================================================================
// TESTS
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use std::path::PathBuf;

    fn args() -> TrainArgs {
        TrainArgs {
            jobs: 4,
            games_per_job: 6,
            shuffle: false,
            workers: Some(2),
            best_of: 5,
            no_bracket: false,
            cycles: 1,
            json: true,
            roster: RosterArgs { roster: None, tables_dir: PathBuf::from("out") },
        }
    }

    #[test]
    fn test_build_train_config() {
        let config = build_train_config(&args(), 100);
        assert_eq!(config.jobs, 4);
        assert_eq!(config.games_per_job, 6);
        assert_eq!(config.seed, 100);
        assert!(!config.shuffle);
        assert_eq!(config.max_workers, Some(2));
        assert_eq!(config.match_config.best_of, 5);
        assert!(!config.match_config.record_history);
        assert_eq!(config.tables_dir, Some(PathBuf::from("out")));
    }

    #[test]
    fn test_cycle_seeds_do_not_overlap() {
        assert_eq!(cycle_seed(911, 0, 20), 911);
        assert_eq!(cycle_seed(911, 1, 20), 931);
        assert_eq!(cycle_seed(u64::MAX, 1, 1), 0);
    }

    #[test]
    fn test_format_duration() {
        assert_eq!(format_duration(Duration::from_millis(250)), "250ms");
        assert_eq!(format_duration(Duration::from_millis(1500)), "1.50s");
        assert_eq!(format_duration(Duration::from_secs(125)), "2m 5s");
    }

    #[test]
    fn test_hidden_progress_bar_for_json() {
        assert!(create_progress_bar(3, true).unwrap().is_hidden());
    }
}
