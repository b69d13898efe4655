//! DROPFOUR CLI - Command-line interface
//!
//! Commands:
//! - train: Run parallel self-play training and merge value tables
//! - match: Play a best-of-N match between two participants
//! - bracket: Run one single-elimination tournament

mod bracket_cmd;
mod match_cmd;
mod train_cmd;

use std::path::PathBuf;

use anyhow::{Context, Result};
use clap::{Args, Parser, Subcommand};
use tracing_subscriber::EnvFilter;

use dropfour_core::ValueTable;
use dropfour_tournament::Competitor;
use dropfour_train::{mix_seed, Participant, Roster};

#[derive(Parser)]
#[command(name = "dropfour")]
#[command(about = "DROPFOUR self-play tournaments and value-table training")]
struct Cli {
    /// Random seed (commands pick their own default when omitted)
    #[arg(long, global = true)]
    seed: Option<u64>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Run parallel training jobs and merge their value tables
    Train(train_cmd::TrainArgs),
    /// Play a best-of-N match between two participants
    Match(match_cmd::MatchArgs),
    /// Run one single-elimination tournament over the roster
    Bracket(bracket_cmd::BracketArgs),
}

fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();

    match cli.command {
        Commands::Train(args) => train_cmd::run(args, cli.seed),
        Commands::Match(args) => match_cmd::run(args, cli.seed),
        Commands::Bracket(args) => bracket_cmd::run(args, cli.seed),
    }
}

// ============================================================================
// SHARED ARGUMENTS (Level 4 - Configuration)
// ============================================================================

/// Where participants and their tables come from
#[derive(Args, Clone, Debug)]
pub struct RosterArgs {
    /// Roster JSON file (list of {name, policy, table?}); built-in roster when omitted
    #[arg(long, value_name = "FILE")]
    pub roster: Option<PathBuf>,

    /// Directory holding value tables of learning participants
    #[arg(long, value_name = "DIR", default_value = "tables")]
    pub tables_dir: PathBuf,
}

impl RosterArgs {
    pub fn load(&self) -> Result<Roster> {
        match &self.roster {
            Some(path) => Roster::from_file(path)
                .with_context(|| format!("Failed to load roster: {}", path.display())),
            None => Ok(Roster::builtin()),
        }
    }

    pub fn table_path(&self, participant: &Participant) -> Option<PathBuf> {
        participant.table_path(Some(&self.tables_dir))
    }
}

/// Fresh competitor with its persisted table, if it has one
pub fn build_competitor(participant: &Participant, table: Option<&PathBuf>, seed: u64, index: usize) -> Competitor {
    let initial = table.map(|p| ValueTable::load(p)).unwrap_or_default();
    Competitor::new(
        participant.name.clone(),
        participant.policy.build(mix_seed(seed, index as u64), initial),
    )
}

/// Save every learned table back to its file
pub fn save_tables(competitors: &[(Competitor, Option<PathBuf>)]) -> Result<()> {
    for (competitor, path) in competitors {
        if let (Some(table), Some(path)) = (competitor.policy.value_table(), path) {
            table
                .save(path)
                .with_context(|| format!("Failed to save table for {}", competitor.name))?;
            tracing::info!("Saved {} entries for {} to {}", table.len(), competitor.name, path.display());
        }
    }
    Ok(())
}

/// Seed from the command line or from entropy
pub fn resolve_seed(seed: Option<u64>) -> u64 {
    seed.unwrap_or_else(rand::random)
}
