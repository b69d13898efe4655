//! Learned value table and its on-disk JSON form
//!
//! File format: one UTF-8 JSON object mapping `"<fingerprint>|<column>"` to a
//! float. Keys are written sorted so identical tables produce identical files.
//!
//! Writes go through a temporary file in the target directory followed by an
//! atomic rename, so a concurrent reader sees either the old table or the new
//! one, never a torn write.

use std::collections::BTreeMap;
use std::fs;
use std::io::{ErrorKind, Write};
use std::path::Path;
use std::thread;
use std::time::Duration;

use rustc_hash::FxHashMap;
use tempfile::NamedTempFile;
use tracing::{debug, warn};

use crate::error::TableError;

/// Attempts made to replace the target file before giving up
pub const PERSIST_ATTEMPTS: u32 = 5;

/// Base backoff between replace attempts; attempt `n` waits `n` times this
pub const PERSIST_BACKOFF: Duration = Duration::from_millis(50);

/// Mapping from action key to scalar estimate
#[derive(Clone, Debug, Default, PartialEq)]
pub struct ValueTable {
    values: FxHashMap<String, f64>,
}

impl ValueTable {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn len(&self) -> usize {
        self.values.len()
    }

    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }

    pub fn get(&self, key: &str) -> Option<f64> {
        self.values.get(key).copied()
    }

    /// Estimate for `key`, or `default` when unseen
    pub fn value_or(&self, key: &str, default: f64) -> f64 {
        self.get(key).unwrap_or(default)
    }

    pub fn insert(&mut self, key: String, value: f64) {
        self.values.insert(key, value);
    }

    pub fn contains_key(&self, key: &str) -> bool {
        self.values.contains_key(key)
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, f64)> {
        self.values.iter().map(|(k, &v)| (k.as_str(), v))
    }

    /// Move the entry for `key` toward `target` by step size `alpha`
    /// (unseen keys start from 0)
    pub fn nudge(&mut self, key: String, target: f64, alpha: f64) -> f64 {
        let q = self.values.entry(key).or_insert(0.0);
        *q += alpha * (target - *q);
        *q
    }

    // ========================================================================
    // SERIALIZATION
    // ========================================================================

    pub fn to_json(&self) -> Result<String, TableError> {
        let sorted: BTreeMap<&str, f64> = self.iter().collect();
        Ok(serde_json::to_string_pretty(&sorted)?)
    }

    pub fn from_json(text: &str) -> Result<Self, serde_json::Error> {
        let values: FxHashMap<String, f64> = serde_json::from_str(text)?;
        Ok(Self { values })
    }

    // ========================================================================
    // PERSISTENCE
    // ========================================================================

    /// Strict read: a missing or blank file is an empty table, anything that
    /// does not parse is [`TableError::Corrupt`]
    pub fn read(path: &Path) -> Result<Self, TableError> {
        let text = match fs::read_to_string(path) {
            Ok(text) => text,
            Err(e) if e.kind() == ErrorKind::NotFound => return Ok(Self::new()),
            Err(e) => {
                return Err(TableError::Io { operation: "read", path: path.to_path_buf(), source: e })
            }
        };
        if text.trim().is_empty() {
            return Ok(Self::new());
        }
        Self::from_json(&text).map_err(|e| TableError::Corrupt {
            path: path.to_path_buf(),
            reason: e.to_string(),
        })
    }

    /// Recovering read used at startup. Any failure yields an empty table;
    /// the offending file is left in place until a successful save replaces it.
    pub fn load(path: &Path) -> Self {
        match Self::read(path) {
            Ok(table) => {
                debug!(path = %path.display(), entries = table.len(), "loaded value table");
                table
            }
            Err(e) => {
                warn!(path = %path.display(), error = %e, "resetting value table to empty");
                Self::new()
            }
        }
    }

    /// Atomically replace `path` with this table
    pub fn save(&self, path: &Path) -> Result<(), TableError> {
        let json = self.to_json()?;
        let dir = match path.parent() {
            Some(p) if !p.as_os_str().is_empty() => p,
            _ => Path::new("."),
        };
        fs::create_dir_all(dir).map_err(|e| TableError::Io {
            operation: "create directory",
            path: dir.to_path_buf(),
            source: e,
        })?;

        let io_err = |operation, source| TableError::Io { operation, path: path.to_path_buf(), source };

        let mut tmp = NamedTempFile::new_in(dir).map_err(|e| io_err("create temp file for", e))?;
        tmp.write_all(json.as_bytes()).map_err(|e| io_err("write", e))?;
        tmp.as_file().sync_all().map_err(|e| io_err("sync", e))?;

        let mut attempt = 1;
        loop {
            match tmp.persist(path) {
                Ok(_) => return Ok(()),
                Err(e) if e.error.kind() == ErrorKind::PermissionDenied => {
                    if attempt >= PERSIST_ATTEMPTS {
                        return Err(TableError::PersistenceRace {
                            path: path.to_path_buf(),
                            attempts: attempt,
                            source: e.error,
                        });
                    }
                    warn!(path = %path.display(), attempt, "replace refused, retrying");
                    thread::sleep(PERSIST_BACKOFF * attempt);
                    tmp = e.file;
                    attempt += 1;
                }
                Err(e) => return Err(io_err("replace", e.error)),
            }
        }
    }
}

impl FromIterator<(String, f64)> for ValueTable {
    fn from_iter<I: IntoIterator<Item = (String, f64)>>(iter: I) -> Self {
        Self { values: iter.into_iter().collect() }
    }
}
