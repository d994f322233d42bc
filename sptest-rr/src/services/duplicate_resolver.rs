//! Duplicate record resolution
//!
//! Records in a class directory are grouped by class and normalized student
//! identity. In every group with more than one member the most recent record
//! is authoritative and stays; the others move to quarantine. Malformed
//! timestamps sort as the oldest instant, so they never displace a valid
//! record.

use super::quarantine::move_to_quarantine;
use super::record_scanner::{RecordScanner, ScanError, ScannedRecord};
use super::ItemFailure;
use serde::Serialize;
use sptest_common::record::NormalizedKey;
use std::collections::HashMap;
use std::path::{Path, PathBuf};
use tracing::{info, warn};

/// What happened to one member of a duplicate group
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum Disposition {
    /// Most recent record; left in place
    Kept,
    /// Relocated to quarantine
    Moved,
    /// Should have moved but the move failed; still in place
    MoveFailed,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct DuplicateEntry {
    pub file_name: String,
    /// Student key as written in the file name
    pub student_key: String,
    pub timestamp: String,
    pub disposition: Disposition,
    pub destination: Option<PathBuf>,
}

/// One student's records, oldest first
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct DuplicateBucket {
    pub class_key: String,
    pub identity: String,
    pub entries: Vec<DuplicateEntry>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct DuplicateOutcome {
    pub buckets: Vec<DuplicateBucket>,
    /// Files relocated to quarantine
    pub moved: usize,
    pub failures: Vec<ItemFailure>,
}

impl DuplicateOutcome {
    /// Records that were found to be stale duplicates (moved or not)
    pub fn duplicates_found(&self) -> usize {
        self.buckets
            .iter()
            .flat_map(|b| &b.entries)
            .filter(|e| e.disposition != Disposition::Kept)
            .count()
    }
}

/// Group records by identity and order each multi-member group oldest first
///
/// Groups keep the scan order of their first member. Ordering is by parsed
/// instant; ties keep scan order. Single-member groups are dropped.
pub fn group_duplicates(records: &[ScannedRecord]) -> Vec<Vec<&ScannedRecord>> {
    let mut order: Vec<(String, NormalizedKey)> = Vec::new();
    let mut groups: HashMap<(String, NormalizedKey), Vec<&ScannedRecord>> = HashMap::new();

    for record in records {
        let key = record.name.identity();
        let group = groups.entry(key.clone()).or_default();
        if group.is_empty() {
            order.push(key);
        }
        group.push(record);
    }

    order
        .into_iter()
        .filter_map(|key| groups.remove(&key))
        .filter(|group| group.len() > 1)
        .map(|mut group| {
            group.sort_by_key(|r| (r.name.instant(), r.scan_index));
            group
        })
        .collect()
}

/// Duplicate resolver for class directories
#[derive(Debug, Clone)]
pub struct DuplicateResolver {
    scanner: RecordScanner,
    quarantine_dir: PathBuf,
}

impl DuplicateResolver {
    pub fn new(quarantine_dir: impl Into<PathBuf>) -> Self {
        Self {
            scanner: RecordScanner::new(),
            quarantine_dir: quarantine_dir.into(),
        }
    }

    /// Find and relocate stale duplicates in one class directory
    ///
    /// Re-running on a resolved directory is a no-op.
    pub fn resolve(&self, class_dir: &Path) -> Result<DuplicateOutcome, ScanError> {
        let scan = self.scanner.scan(class_dir)?;
        let mut outcome = DuplicateOutcome::default();

        for group in group_duplicates(&scan.records) {
            let newest = group.len() - 1;
            let (class_key, identity) = group[newest].name.identity();
            let mut entries = Vec::with_capacity(group.len());

            for (i, record) in group.iter().enumerate() {
                let mut entry = DuplicateEntry {
                    file_name: record.name.file_name.clone(),
                    student_key: record.name.student_key.to_string(),
                    timestamp: record.name.timestamp.clone(),
                    disposition: Disposition::Kept,
                    destination: None,
                };

                if i != newest {
                    match move_to_quarantine(&record.path, &self.quarantine_dir) {
                        Ok(destination) => {
                            info!(
                                file = %record.name.file_name,
                                to = %destination.display(),
                                "Quarantined stale duplicate"
                            );
                            entry.disposition = Disposition::Moved;
                            entry.destination = Some(destination);
                            outcome.moved += 1;
                        }
                        Err(e) => {
                            warn!(
                                file = %record.path.display(),
                                error = %e,
                                "Failed to quarantine duplicate"
                            );
                            entry.disposition = Disposition::MoveFailed;
                            outcome
                                .failures
                                .push(ItemFailure::new(&record.path, "move to quarantine", e));
                        }
                    }
                }
                entries.push(entry);
            }

            outcome.buckets.push(DuplicateBucket {
                class_key,
                identity: identity.to_string(),
                entries,
            });
        }

        Ok(outcome)
    }
}
