//! JSON-lines run journal.
//!
//! Each precomputation run appends one entry per attempted condition so that
//! runs over long recordings can be compared after the fact.

use std::fs::{self, OpenOptions};
use std::io::{self, Write};
use std::path::{Path, PathBuf};
use std::time::{SystemTime, UNIX_EPOCH};

use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Outcome of one condition within a run.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ConditionStatus {
    Completed,
    /// Sampling or detection failed part way through.
    Failed,
    /// No phase series was supplied for the condition.
    Missing,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ConditionLogEntry {
    /// Identifier shared by every entry of one precompute run.
    pub run_id: Uuid,
    /// Condition key in its display form, e.g. `filtered:Theta (θ)`.
    pub condition: String,
    pub status: ConditionStatus,
    /// Spiral tracks produced, zero unless completed.
    pub spiral_tracks: usize,
    /// Anti-spiral tracks produced, zero unless completed.
    pub anti_spiral_tracks: usize,
    /// Frames processed, zero unless completed.
    pub frames: usize,
    /// Wall time in milliseconds.
    pub elapsed_ms: u128,
    /// Error message for failed or missing conditions.
    pub error: Option<String>,
    /// Milliseconds since the Unix epoch when the entry was written.
    pub timestamp_ms: u128,
}

pub fn timestamp_now() -> u128 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .unwrap_or_default()
        .as_millis()
}

fn append_json_line<P: AsRef<Path>, T: Serialize>(path: P, value: &T) -> io::Result<()> {
    let mut file = OpenOptions::new().create(true).append(true).open(path)?;
    serde_json::to_writer(&mut file, value)
        .map_err(|err| io::Error::new(io::ErrorKind::Other, err))?;
    file.write_all(b"\n")
}

/// Append-only journal file.
#[derive(Debug, Clone)]
pub struct RunJournal {
    path: PathBuf,
}

impl RunJournal {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Append one entry, creating parent directories on first use.
    pub fn record(&self, entry: &ConditionLogEntry) -> io::Result<()> {
        if let Some(parent) = self.path.parent().filter(|p| !p.as_os_str().is_empty()) {
            fs::create_dir_all(parent)?;
        }
        append_json_line(&self.path, entry)
    }

    /// Read every entry back, oldest first.
    pub fn read_all(&self) -> io::Result<Vec<ConditionLogEntry>> {
        let contents = fs::read_to_string(&self.path)?;
        contents
            .lines()
            .filter(|line| !line.trim().is_empty())
            .map(|line| {
                serde_json::from_str(line)
                    .map_err(|err| io::Error::new(io::ErrorKind::InvalidData, err))
            })
            .collect()
    }
}
