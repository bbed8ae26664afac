use std::fmt;
use std::time::Duration;

use serde::Serialize;

use crate::db::{ApplyReport, CommitMode};

/// Summary of one synchronization run.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct SyncReport {
  /// Records read from the catalog
  pub records: usize,
  /// Update statements issued
  pub statements: usize,
  pub rows_affected: u64,
  /// Product ids that matched no row
  pub unmatched: Vec<i64>,
  pub commits: usize,
  pub commit_mode: CommitMode,
  pub dry_run: bool,
  #[serde(skip)]
  pub elapsed: Duration,
}

impl SyncReport {
  pub fn from_apply(
    records: usize,
    applied: ApplyReport,
    commit_mode: CommitMode,
    elapsed: Duration,
  ) -> Self {
    Self {
      records,
      statements: applied.statements,
      rows_affected: applied.rows_affected,
      unmatched: applied.unmatched,
      commits: applied.commits,
      commit_mode,
      dry_run: false,
      elapsed,
    }
  }

  pub fn dry_run(records: usize, commit_mode: CommitMode, elapsed: Duration) -> Self {
    Self {
      records,
      statements: 0,
      rows_affected: 0,
      unmatched: Vec::new(),
      commits: 0,
      commit_mode,
      dry_run: true,
      elapsed,
    }
  }

  pub fn is_fully_matched(&self) -> bool {
    self.unmatched.is_empty()
  }
}

impl fmt::Display for SyncReport {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    if self.dry_run {
      return write!(
        f,
        "dry run: {} records ready, nothing written",
        self.records
      );
    }
    write!(
      f,
      "{} records, {} updates, {} rows changed, {} unmatched (commit: {}, {} ms)",
      self.records,
      self.statements,
      self.rows_affected,
      self.unmatched.len(),
      self.commit_mode,
      self.elapsed.as_millis()
    )
  }
}
