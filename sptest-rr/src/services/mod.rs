//! Record reconciliation services
//!
//! Each service works on one class directory at a time and never aborts a
//! class pass over a single bad file: per-file faults are collected as
//! [`ItemFailure`]s for the run report.

pub mod duplicate_resolver;
pub mod quarantine;
pub mod record_completer;
pub mod record_scanner;
pub mod summary_compiler;

pub use duplicate_resolver::{Disposition, DuplicateBucket, DuplicateOutcome, DuplicateResolver};
pub use record_completer::{CompletedRecord, CompletionOutcome, RecordCompleter};
pub use record_scanner::{ClassScan, RecordScanner, ScanError, ScannedRecord};
pub use summary_compiler::{SummaryCompiler, SummaryEntry, SummaryOutcome};

use serde::Serialize;
use std::fmt;
use std::path::{Path, PathBuf};

/// A per-file fault that was reported and skipped
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ItemFailure {
    pub path: PathBuf,
    /// What was being attempted, e.g. "move to quarantine"
    pub action: String,
    pub error: String,
}

impl ItemFailure {
    pub fn new(path: &Path, action: &str, error: impl fmt::Display) -> Self {
        Self {
            path: path.to_path_buf(),
            action: action.to_string(),
            error: error.to_string(),
        }
    }
}

impl fmt::Display for ItemFailure {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} failed for {}: {}", self.action, self.path.display(), self.error)
    }
}
