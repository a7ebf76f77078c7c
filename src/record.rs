//! Append-only CSV record log and reliability statistics.
//!
//! One row per `run_test` invocation, columns `count,success,fail`:
//! how many attempts were requested, how many passed before the run
//! stopped, and whether the run ended in failure (always 0 or 1). The row
//! count of the file doubles as the run numbering, so re-running against an
//! existing log continues where the last session left off.

use crate::error::Result;
use serde::{Deserialize, Serialize};
use std::fs::OpenOptions;
use std::path::{Path, PathBuf};

/// One row of the record file: the outcome of a single run.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct RunRow {
    /// Attempts requested for the run.
    pub count: u64,
    /// Attempts that passed before the run stopped.
    pub success: u64,
    /// 1 if the run ended in a failure or interrupt, else 0.
    pub fail: u8,
}

/// Handle on the CSV record file.
///
/// The file is opened, appended, and closed per operation — it is never held
/// open across attempts and never rewritten.
#[derive(Debug, Clone)]
pub struct RecordLog {
    path: PathBuf,
}

impl RecordLog {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    /// Path of the record file. Movie directories live next to it.
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Seed the record file with its header if it is missing or empty.
    fn ensure_seeded(&self) -> Result<()> {
        let needs_header = match std::fs::metadata(&self.path) {
            Ok(meta) => meta.len() == 0,
            Err(_) => true,
        };
        if needs_header {
            let mut writer = csv::Writer::from_path(&self.path)?;
            writer.write_record(["count", "success", "fail"])?;
            writer.flush()?;
            tracing::info!(path = %self.path.display(), "seeded new record file");
        }
        Ok(())
    }

    /// Run number for the next run: the number of data rows already logged.
    ///
    /// A missing record file is created with its header and yields run 0.
    pub fn next_run_number(&self) -> Result<u64> {
        self.ensure_seeded()?;
        let mut reader = csv::Reader::from_path(&self.path)?;
        let mut rows = 0u64;
        for record in reader.records() {
            record?;
            rows += 1;
        }
        Ok(rows)
    }

    /// Append one run's outcome. The file is never rewritten.
    pub fn append(&self, row: RunRow) -> Result<()> {
        self.ensure_seeded()?;
        let file = OpenOptions::new().append(true).open(&self.path)?;
        let mut writer = csv::WriterBuilder::new()
            .has_headers(false)
            .from_writer(file);
        writer.serialize(row)?;
        writer.flush()?;
        Ok(())
    }

    /// All rows logged so far, oldest first.
    pub fn rows(&self) -> Result<Vec<RunRow>> {
        let mut reader = csv::Reader::from_path(&self.path)?;
        let mut rows = Vec::new();
        for row in reader.deserialize() {
            rows.push(row?);
        }
        Ok(rows)
    }

    /// Successful attempts observed between consecutive failures.
    ///
    /// See [`run_lengths`]; the first and last entries carry its edge
    /// caveat.
    pub fn successes_between_failures(&self) -> Result<Vec<u64>> {
        Ok(run_lengths(&self.rows()?))
    }
}

/// Group rows by the running total of the `fail` column and sum `success`
/// per group.
///
/// The running total includes the current row, so a failing row's own
/// successes open the span that follows its failure. The first entry has no
/// preceding failure and the last cannot tell whether the log's final run
/// is still in progress, so both entries may be truncated.
pub fn run_lengths(rows: &[RunRow]) -> Vec<u64> {
    let mut lengths: Vec<u64> = Vec::new();
    let mut fail_index: usize = 0;
    for row in rows {
        fail_index += usize::from(row.fail != 0);
        if lengths.len() <= fail_index {
            lengths.resize(fail_index + 1, 0);
        }
        lengths[fail_index] += row.success;
    }
    lengths
}
