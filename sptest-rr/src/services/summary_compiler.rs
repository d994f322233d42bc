//! Class summary compilation
//!
//! The class summary `<class>_SpeakingTest.<YY.MM.DD>.txt` is a derived view:
//! it is rewritten from the headed records currently in the class directory.
//! The date stamp comes from the first qualifying record, so a class tested
//! across midnight lands in one file named after the first test's day.

use super::record_scanner::{RecordScanner, ScanError};
use super::ItemFailure;
use serde::Serialize;
use sptest_common::layout::{class_key_of, summary_file_name};
use sptest_common::record::{extract_header_fields, is_headed};
use sptest_common::time;
use sptest_common::StudentKey;
use std::fs;
use std::path::{Path, PathBuf};
use tracing::{debug, info, warn};

/// Width of the separator under the summary header
const SUMMARY_SEPARATOR_WIDTH: usize = 80;

/// One summary line's data
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct SummaryEntry {
    /// Raw timestamp segment of the record name
    pub timestamp: String,
    pub student_key: String,
    pub student_name: String,
    pub total: i64,
    pub max: i64,
    pub percentage: i64,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct SummaryOutcome {
    /// Summary file written, if any
    pub path: Option<PathBuf>,
    pub entries: usize,
    pub failures: Vec<ItemFailure>,
}

/// Summary file header for a class and `YY.MM.DD` date stamp
pub fn format_summary_header(class_key: &str, date_stamp: &str) -> String {
    format!(
        "Class {} - Speaking Test Summary\nDate: 20{}\n{}\n\n",
        class_key,
        date_stamp.replace('.', "-"),
        "=".repeat(SUMMARY_SEPARATOR_WIDTH)
    )
}

/// One summary line (with trailing newline)
///
/// `stamp` is the `YY.MM.DD.HHMM` column. Numeric student keys are padded
/// to two digits, others left-justified to two columns; names are padded or
/// truncated to 20 characters.
pub fn format_summary_line(
    stamp: &str,
    student_key: &str,
    student_name: &str,
    total: i64,
    max: i64,
    percentage: i64,
) -> String {
    let key = StudentKey::new(student_key);
    let student = if key.is_numeric() {
        key.padded()
    } else {
        format!("{:<2}", student_key)
    };
    let score = format!("{}/{}", total, max);
    let percent = format!("{}%", percentage);
    format!(
        "{}:   Student {} {:<20.20}:  {:>10} = {:>5}\n",
        stamp, student, student_name, score, percent
    )
}

/// Rebuilds class summaries
#[derive(Debug, Clone, Default)]
pub struct SummaryCompiler {
    scanner: RecordScanner,
}

impl SummaryCompiler {
    pub fn new() -> Self {
        Self {
            scanner: RecordScanner::new(),
        }
    }

    /// Collect summary entries from the headed records of a class directory, in scan order
    pub fn collect_entries(
        &self,
        class_dir: &Path,
    ) -> Result<(Vec<SummaryEntry>, Vec<ItemFailure>), ScanError> {
        let scan = self.scanner.scan(class_dir)?;
        let mut entries = Vec::new();
        let mut failures = Vec::new();

        for record in &scan.records {
            let body = match fs::read_to_string(&record.path) {
                Ok(body) => body,
                Err(e) => {
                    warn!(
                        file = %record.path.display(),
                        error = %e,
                        "Unreadable record left out of summary"
                    );
                    failures.push(ItemFailure::new(&record.path, "read record", e));
                    continue;
                }
            };
            if !is_headed(&body) {
                debug!(file = %record.name.file_name, "Headless record left out of summary");
                continue;
            }

            let fields = extract_header_fields(&body);
            let student_key = if fields.student_key.is_empty() {
                record.name.student_key.to_string()
            } else {
                fields.student_key
            };
            entries.push(SummaryEntry {
                timestamp: record.name.timestamp.clone(),
                student_key,
                student_name: fields.student_name,
                total: fields.total,
                max: fields.max,
                percentage: fields.percentage,
            });
        }

        Ok((entries, failures))
    }

    /// Rewrite the class summary from the current headed records
    ///
    /// With no qualifying records nothing is written and an existing summary
    /// is left alone.
    pub fn compile(&self, class_dir: &Path) -> Result<SummaryOutcome, ScanError> {
        let (entries, mut failures) = self.collect_entries(class_dir)?;
        if entries.is_empty() {
            return Ok(SummaryOutcome {
                path: None,
                entries: 0,
                failures,
            });
        }

        let class_key = class_key_of(class_dir);
        let date_stamp = time::date_stamp_from_timestamp(&entries[0].timestamp)
            .unwrap_or_else(|| time::format_date_stamp(time::now()));
        let path = class_dir.join(summary_file_name(&class_key, &date_stamp));

        let mut content = format_summary_header(&class_key, &date_stamp);
        for entry in &entries {
            let parts: Vec<&str> = entry.timestamp.split('.').collect();
            let time_part: String = if parts.len() >= 4 {
                parts[parts.len() - 1].chars().take(4).collect()
            } else {
                "0000".to_string()
            };
            content.push_str(&format_summary_line(
                &format!("{}.{}", date_stamp, time_part),
                &entry.student_key,
                &entry.student_name,
                entry.total,
                entry.max,
                entry.percentage,
            ));
        }

        match fs::write(&path, content) {
            Ok(()) => {
                info!(summary = %path.display(), entries = entries.len(), "Compiled class summary");
                Ok(SummaryOutcome {
                    path: Some(path),
                    entries: entries.len(),
                    failures,
                })
            }
            Err(e) => {
                warn!(summary = %path.display(), error = %e, "Failed to write class summary");
                failures.push(ItemFailure::new(&path, "write summary", e));
                Ok(SummaryOutcome {
                    path: None,
                    entries: 0,
                    failures,
                })
            }
        }
    }
}
