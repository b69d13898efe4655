//! Merge of partial value tables
//!
//! Every key becomes the arithmetic mean over the jobs that reported it.
//! Sums and counts are accumulated separately and divided once at the end,
//! so the result does not depend on the order partial tables arrive in
//! beyond floating-point summation order. The orchestrator folds results
//! in job-id order, which makes a run reproducible bit for bit.

use std::collections::BTreeMap;

use dropfour_core::ValueTable;
use rustc_hash::FxHashMap;
use serde::Serialize;
use tracing::debug;

use crate::job::PartialResult;

/// Running sum and contributor count per key for one participant
#[derive(Clone, Debug, Default)]
pub struct MergeAccumulator {
    entries: FxHashMap<String, (f64, u32)>,
    contributors: u32,
}

impl MergeAccumulator {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn add(&mut self, table: &ValueTable) {
        for (key, value) in table.iter() {
            let entry = self.entries.entry(key.to_string()).or_insert((0.0, 0));
            entry.0 += value;
            entry.1 += 1;
        }
        self.contributors += 1;
    }

    /// Tables folded in so far
    pub fn contributors(&self) -> u32 {
        self.contributors
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Keys reported by more than one table
    pub fn shared_keys(&self) -> usize {
        self.entries.values().filter(|(_, n)| *n > 1).count()
    }

    pub fn finish(self) -> ValueTable {
        self.entries
            .into_iter()
            .map(|(key, (sum, n))| (key, sum / n as f64))
            .collect()
    }
}

/// Mean-merge of any number of tables
pub fn merge_tables<'a>(tables: impl IntoIterator<Item = &'a ValueTable>) -> ValueTable {
    let mut acc = MergeAccumulator::new();
    for table in tables {
        acc.add(table);
    }
    acc.finish()
}

/// Per-participant merge statistics
#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
pub struct MergeStats {
    pub participant: String,
    pub keys: usize,
    pub shared_keys: usize,
    pub contributors: u32,
}

/// Merge state for a whole run, keyed by participant name
#[derive(Debug, Default)]
pub struct RunMerge {
    participants: BTreeMap<String, MergeAccumulator>,
}

impl RunMerge {
    pub fn new() -> Self {
        Self::default()
    }

    /// Fold in every table of one job
    pub fn add(&mut self, partial: &PartialResult) {
        for (name, table) in &partial.tables {
            self.participants.entry(name.clone()).or_default().add(table);
        }
    }

    /// Merged table and statistics per participant, sorted by name
    pub fn finish(self) -> Vec<(MergeStats, ValueTable)> {
        self.participants
            .into_iter()
            .map(|(participant, acc)| {
                let stats = MergeStats {
                    participant,
                    keys: acc.len(),
                    shared_keys: acc.shared_keys(),
                    contributors: acc.contributors(),
                };
                debug!(
                    participant = %stats.participant,
                    keys = stats.keys,
                    shared = stats.shared_keys,
                    contributors = stats.contributors,
                    "merged value table"
                );
                (stats, acc.finish())
            })
            .collect()
    }
}
