//! Training orchestrator - parallel jobs, merge, persistence
//!
//! Level 1 - Orchestration
//!
//! Jobs run on a fixed-size rayon pool and report back over a channel in
//! completion order. Workers share only read-only inputs (roster, starting
//! tables). After the last report the orchestrator merges in job-id order and
//! writes every merged table itself, one file at a time.

use std::any::Any;
use std::collections::BTreeMap;
use std::panic::{self, AssertUnwindSafe};
use std::path::PathBuf;
use std::sync::{mpsc, Arc};
use std::thread;
use std::time::Instant;

use dropfour_core::ValueTable;
use dropfour_tournament::{BracketConfig, MatchConfig};
use serde::Serialize;
use tracing::{debug, info, warn};

use crate::error::{JobError, TrainError};
use crate::job::{run_job, Job, JobConfig, JobStats, PartialResult};
use crate::merge::{MergeStats, RunMerge};
use crate::roster::Roster;
use crate::shutdown::ShutdownFlag;

/// Training run configuration
#[derive(Clone, Debug, PartialEq)]
pub struct TrainConfig {
    pub jobs: usize,
    pub games_per_job: u32,
    /// Job `i` runs with seed `seed + i`
    pub seed: u64,
    pub shuffle: bool,
    /// Upper bound on worker threads; None uses every available core
    pub max_workers: Option<usize>,
    pub match_config: MatchConfig,
    pub run_bracket: bool,
    /// Default home of learning participants' tables
    pub tables_dir: Option<PathBuf>,
}

impl Default for TrainConfig {
    fn default() -> Self {
        Self {
            jobs: 20,
            games_per_job: 50,
            seed: 911,
            shuffle: true,
            max_workers: None,
            match_config: MatchConfig::default().with_history(false),
            run_bracket: true,
            tables_dir: None,
        }
    }
}

impl TrainConfig {
    pub fn with_jobs(mut self, jobs: usize) -> Self {
        self.jobs = jobs;
        self
    }

    pub fn with_games_per_job(mut self, games: u32) -> Self {
        self.games_per_job = games;
        self
    }

    pub fn with_seed(mut self, seed: u64) -> Self {
        self.seed = seed;
        self
    }

    pub fn with_shuffle(mut self, shuffle: bool) -> Self {
        self.shuffle = shuffle;
        self
    }

    pub fn with_max_workers(mut self, workers: Option<usize>) -> Self {
        self.max_workers = workers;
        self
    }

    pub fn with_match_config(mut self, match_config: MatchConfig) -> Self {
        self.match_config = match_config;
        self
    }

    pub fn with_bracket(mut self, run: bool) -> Self {
        self.run_bracket = run;
        self
    }

    pub fn with_tables_dir(mut self, dir: impl Into<PathBuf>) -> Self {
        self.tables_dir = Some(dir.into());
        self
    }

    /// Worker threads: available cores, capped, never more than jobs, at least 1
    pub fn worker_count(&self) -> usize {
        let cores = thread::available_parallelism().map(|n| n.get()).unwrap_or(1);
        let capped = self.max_workers.map_or(cores, |cap| cap.min(cores));
        capped.min(self.jobs).max(1)
    }

    pub fn job_config(&self) -> JobConfig {
        JobConfig::default()
            .with_self_play_games(self.games_per_job)
            .with_bracket(self.run_bracket)
            .with_bracket_config(
                BracketConfig::default()
                    .with_shuffle(self.shuffle)
                    .with_match_config(self.match_config.clone()),
            )
    }

    pub fn jobs(&self) -> Vec<Job> {
        (0..self.jobs)
            .map(|id| Job { id, seed: self.seed.wrapping_add(id as u64) })
            .collect()
    }
}

// ============================================================================
// Run summary
// ============================================================================

#[derive(Clone, Debug, Serialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum JobStatus {
    Completed { champion: Option<String>, stats: JobStats },
    Failed { error: String },
    /// Never started because shutdown was requested first
    Skipped,
}

/// One line of the run summary per job
#[derive(Clone, Debug, Serialize)]
pub struct JobReport {
    pub job: Job,
    #[serde(flatten)]
    pub status: JobStatus,
}

impl JobReport {
    pub fn is_completed(&self) -> bool {
        matches!(self.status, JobStatus::Completed { .. })
    }
}

/// Merged table of one participant and where it went
#[derive(Clone, Debug, Serialize)]
pub struct PersistedTable {
    #[serde(flatten)]
    pub merge: MergeStats,
    /// None when the participant has no table path
    pub path: Option<PathBuf>,
}

/// Outcome of a training run
#[derive(Clone, Debug, Serialize)]
pub struct RunSummary {
    pub workers: usize,
    /// Reports sorted by job id
    pub jobs: Vec<JobReport>,
    /// Local bracket titles per participant
    pub champions: BTreeMap<String, u32>,
    pub tables: Vec<PersistedTable>,
    pub interrupted: bool,
    pub elapsed_ms: u64,
}

impl RunSummary {
    pub fn completed(&self) -> usize {
        self.jobs.iter().filter(|r| r.is_completed()).count()
    }

    pub fn failed(&self) -> usize {
        self.jobs.iter().filter(|r| matches!(r.status, JobStatus::Failed { .. })).count()
    }

    pub fn games_played(&self) -> u32 {
        self.jobs
            .iter()
            .map(|r| match &r.status {
                JobStatus::Completed { stats, .. } => stats.games_played(),
                _ => 0,
            })
            .sum()
    }

    /// Participant with the most local titles, ties to the first name
    pub fn top_champion(&self) -> Option<(&str, u32)> {
        self.champions
            .iter()
            .fold(None, |best: Option<(&str, u32)>, (name, &n)| match best {
                Some((_, m)) if m >= n => best,
                _ => Some((name.as_str(), n)),
            })
    }
}

// ============================================================================
// Level 1 - Orchestration
// ============================================================================

/// Run every job, merge their tables and persist the result.
///
/// `on_report` is called on the calling thread as each job reports, in
/// completion order.
pub fn train(
    roster: &Roster,
    config: &TrainConfig,
    shutdown: &ShutdownFlag,
    on_report: impl FnMut(&JobReport),
) -> Result<RunSummary, TrainError> {
    run_jobs(roster, config, shutdown, on_report, run_job)
}

/// [`train`] with the per-job work supplied by the caller
fn run_jobs<F>(
    roster: &Roster,
    config: &TrainConfig,
    shutdown: &ShutdownFlag,
    mut on_report: impl FnMut(&JobReport),
    job_fn: F,
) -> Result<RunSummary, TrainError>
where
    F: Fn(Job, &Roster, &[ValueTable], &JobConfig, &ShutdownFlag) -> Result<PartialResult, JobError>
        + Send
        + Sync
        + 'static,
{
    if roster.is_empty() {
        return Err(TrainError::NoParticipants);
    }
    let started = Instant::now();

    let paths: Vec<Option<PathBuf>> =
        roster.iter().map(|p| p.table_path(config.tables_dir.as_deref())).collect();
    let initial: Arc<Vec<ValueTable>> = Arc::new(
        paths
            .iter()
            .map(|path| path.as_deref().map(ValueTable::load).unwrap_or_default())
            .collect(),
    );
    let roster = Arc::new(roster.clone());
    let job_config = Arc::new(config.job_config());
    let job_fn = Arc::new(job_fn);

    let workers = config.worker_count();
    let pool = rayon::ThreadPoolBuilder::new()
        .num_threads(workers)
        .thread_name(|i| format!("dropfour-worker-{i}"))
        .build()?;
    info!(jobs = config.jobs, workers, participants = roster.len(), "starting training run");

    let (tx, rx) = mpsc::channel::<(Job, Option<Result<PartialResult, JobError>>)>();
    for job in config.jobs() {
        let tx = tx.clone();
        let roster = Arc::clone(&roster);
        let initial = Arc::clone(&initial);
        let job_config = Arc::clone(&job_config);
        let shutdown = shutdown.clone();
        let job_fn = Arc::clone(&job_fn);

        pool.spawn(move || {
            if shutdown.is_requested() {
                let _ = tx.send((job, None));
                return;
            }
            debug!(job = job.id, seed = job.seed, "job started");
            let outcome = panic::catch_unwind(AssertUnwindSafe(|| {
                job_fn(job, &roster, &initial, &job_config, &shutdown)
            }))
            .unwrap_or_else(|payload| Err(JobError::Panicked(panic_message(payload))));
            let _ = tx.send((job, Some(outcome)));
        });
    }
    drop(tx);

    let mut partials = Vec::new();
    let mut reports = Vec::with_capacity(config.jobs);
    for (job, outcome) in rx {
        let status = match outcome {
            None => JobStatus::Skipped,
            Some(Ok(partial)) => {
                let status = JobStatus::Completed {
                    champion: partial.champion.clone(),
                    stats: partial.stats.clone(),
                };
                partials.push(partial);
                status
            }
            Some(Err(e)) => {
                warn!(job = job.id, seed = job.seed, error = %e, "job failed, leaving it out of the merge");
                JobStatus::Failed { error: e.to_string() }
            }
        };
        let report = JobReport { job, status };
        on_report(&report);
        reports.push(report);
    }

    reports.sort_by_key(|r| r.job.id);
    let failed = reports.iter().filter(|r| matches!(r.status, JobStatus::Failed { .. })).count();
    if partials.is_empty() && failed > 0 {
        return Err(TrainError::AllJobsFailed { failed });
    }

    partials.sort_by_key(|p| p.job.id);
    let mut merge = RunMerge::new();
    let mut champions = BTreeMap::new();
    for partial in &partials {
        merge.add(partial);
        if let Some(name) = &partial.champion {
            *champions.entry(name.clone()).or_insert(0) += 1;
        }
    }

    let mut tables = Vec::new();
    for (stats, table) in merge.finish() {
        let path = roster
            .iter()
            .position(|p| p.name == stats.participant)
            .and_then(|i| paths[i].clone());
        if let Some(path) = &path {
            table.save(path)?;
            info!(participant = %stats.participant, keys = stats.keys, path = %path.display(), "saved value table");
        }
        tables.push(PersistedTable { merge: stats, path });
    }

    let interrupted = shutdown.is_requested()
        || reports.iter().any(|r| match &r.status {
            JobStatus::Completed { stats, .. } => stats.interrupted,
            JobStatus::Skipped => true,
            JobStatus::Failed { .. } => false,
        });

    let summary = RunSummary {
        workers,
        jobs: reports,
        champions,
        tables,
        interrupted,
        elapsed_ms: started.elapsed().as_millis() as u64,
    };
    info!(
        completed = summary.completed(),
        failed = summary.failed(),
        games = summary.games_played(),
        interrupted,
        "training run finished"
    );
    Ok(summary)
}

fn panic_message(payload: Box<dyn Any + Send>) -> String {
    if let Some(s) = payload.downcast_ref::<&str>() {
        s.to_string()
    } else if let Some(s) = payload.downcast_ref::<String>() {
        s.clone()
    } else {
        "unknown panic".to_string()
    }
}
