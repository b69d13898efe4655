//! DROPFOUR Train - Parallel self-play training with value-table merging
//!
//! This crate provides the training pipeline:
//! - Participant rosters and policy factories
//! - Isolated training jobs (self-play, then a bracket)
//! - A worker pool that runs jobs and collects their partial tables
//! - Mean merge of partial tables and atomic persistence
//!
//! ## Architecture (4-layer granularity)
//!
//! - Level 1: train (orchestration)
//! - Level 2: run_job (phases)
//! - Level 3: self-play games, merge accumulation (steps)
//! - Level 4: seeds, configuration, shutdown flag

mod error;
pub mod job;
pub mod merge;
mod orchestrator;
pub mod roster;
mod shutdown;

pub use error::{JobError, RosterParse, TrainError};
pub use job::{mix_seed, run_job, Job, JobConfig, JobStats, PartialResult};
pub use merge::{merge_tables, MergeAccumulator, MergeStats, RunMerge};
pub use orchestrator::{train, JobReport, JobStatus, PersistedTable, RunSummary, TrainConfig};
pub use roster::{Participant, PolicySpec, Roster};
pub use shutdown::ShutdownFlag;
