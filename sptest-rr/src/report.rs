//! Run report and operator-facing output
//!
//! One [`RunReport`] per invocation: per-class results plus totals. It is
//! printed to stdout by [`CliFormatter`] and can be exported as JSON.

use crate::services::{
    CompletionOutcome, Disposition, DuplicateBucket, DuplicateOutcome, ItemFailure, SummaryOutcome,
};
use serde::Serialize;
use std::fs::File;
use std::io::Write;
use std::path::{Path, PathBuf};

/// Everything one run did
#[derive(Debug, Clone, Serialize)]
pub struct RunReport {
    pub session: RunInfo,
    pub classes: Vec<ClassReport>,
    pub totals: RunTotals,
}

/// Run metadata
#[derive(Debug, Clone, Serialize)]
pub struct RunInfo {
    /// Run start (RFC 3339, local time)
    pub timestamp: String,
    pub records_root: PathBuf,
    pub command: String,
}

/// Results for one class directory
#[derive(Debug, Clone, Default, Serialize)]
pub struct ClassReport {
    pub class_key: String,
    pub completion: Option<CompletionOutcome>,
    pub duplicates: Option<DuplicateOutcome>,
    pub summary: Option<SummaryOutcome>,
    /// Intermediate files left behind by an interrupted completion; need operator action
    pub orphaned_intermediates: Vec<PathBuf>,
    /// Faults outside the per-stage outcomes (e.g. the class could not be scanned)
    pub failures: Vec<ItemFailure>,
}

impl ClassReport {
    pub fn new(class_key: impl Into<String>) -> Self {
        Self {
            class_key: class_key.into(),
            ..Default::default()
        }
    }

    /// Every per-item failure of this class, across stages
    pub fn all_failures(&self) -> Vec<&ItemFailure> {
        let mut all: Vec<&ItemFailure> = self.failures.iter().collect();
        if let Some(c) = &self.completion {
            all.extend(&c.failures);
        }
        if let Some(d) = &self.duplicates {
            all.extend(&d.failures);
        }
        if let Some(s) = &self.summary {
            all.extend(&s.failures);
        }
        all
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct RunTotals {
    pub classes: usize,
    pub records_completed: usize,
    pub duplicate_buckets: usize,
    pub duplicates_moved: usize,
    pub summaries_written: usize,
    pub summary_entries: usize,
    pub orphaned_intermediates: usize,
    pub failures: usize,
}

impl RunReport {
    pub fn new(records_root: &Path, command: &str) -> Self {
        Self {
            session: RunInfo {
                timestamp: chrono::Local::now().to_rfc3339(),
                records_root: records_root.to_path_buf(),
                command: command.to_string(),
            },
            classes: Vec::new(),
            totals: RunTotals::default(),
        }
    }

    /// Add a finished class and fold it into the totals
    pub fn push_class(&mut self, class: ClassReport) {
        let totals = &mut self.totals;
        totals.classes += 1;
        if let Some(c) = &class.completion {
            totals.records_completed += c.completed.len();
        }
        if let Some(d) = &class.duplicates {
            totals.duplicate_buckets += d.buckets.len();
            totals.duplicates_moved += d.moved;
        }
        if let Some(s) = &class.summary {
            if s.path.is_some() {
                totals.summaries_written += 1;
            }
            totals.summary_entries += s.entries;
        }
        totals.orphaned_intermediates += class.orphaned_intermediates.len();
        totals.failures += class.all_failures().len();
        self.classes.push(class);
    }

    /// Export report to a JSON file
    pub fn export_json<P: AsRef<Path>>(&self, path: P) -> std::io::Result<()> {
        let json = serde_json::to_string_pretty(self)?;
        let mut file = File::create(path)?;
        file.write_all(json.as_bytes())?;
        file.write_all(b"\n")?;
        Ok(())
    }
}

/// Plain-text rendering of run results
pub struct CliFormatter;

impl CliFormatter {
    pub fn format_run_header(report: &RunReport) -> String {
        format!(
            "Records root: {}\nCommand: {}\n",
            report.session.records_root.display(),
            report.session.command
        )
    }

    /// Kept/moved listing of one duplicate group
    ///
    /// Example:
    /// ```text
    /// Student 3 (class 5): 3 records
    ///   KEEPING: SpeakingTest_5_3_2024.03.15.1100.txt
    ///   MOVING:  SpeakingTest_5_03_2024.03.15.1000.txt -> Duplicates/...
    /// ```
    pub fn format_bucket(bucket: &DuplicateBucket) -> String {
        let mut output = format!(
            "Student {} (class {}): {} records\n",
            bucket.identity,
            bucket.class_key,
            bucket.entries.len()
        );
        for entry in bucket.entries.iter().rev() {
            let line = match entry.disposition {
                Disposition::Kept => format!("  KEEPING: {}\n", entry.file_name),
                Disposition::Moved => match &entry.destination {
                    Some(dest) => format!("  MOVING:  {} -> {}\n", entry.file_name, dest.display()),
                    None => format!("  MOVING:  {}\n", entry.file_name),
                },
                Disposition::MoveFailed => {
                    format!("  FAILED:  {} (left in place)\n", entry.file_name)
                }
            };
            output.push_str(&line);
        }
        output
    }

    /// Per-class progress block
    pub fn format_class(class: &ClassReport) -> String {
        let mut output = format!("\nClass {}\n", class.class_key);

        if let Some(c) = &class.completion {
            output.push_str(&format!(
                "  Completed {} record(s) ({} already headed, {} empty)\n",
                c.completed.len(),
                c.already_headed,
                c.empty
            ));
            for record in &c.completed {
                output.push_str(&format!(
                    "    {}: {}/{} = {}%\n",
                    record.file_name, record.score.total, record.score.max, record.score.percentage
                ));
            }
        }

        if let Some(d) = &class.duplicates {
            if d.buckets.is_empty() {
                output.push_str("  No duplicates\n");
            } else {
                output.push_str(&format!(
                    "  {} student(s) with duplicates, {} file(s) moved\n",
                    d.buckets.len(),
                    d.moved
                ));
                for bucket in &d.buckets {
                    for line in Self::format_bucket(bucket).lines() {
                        output.push_str("    ");
                        output.push_str(line);
                        output.push('\n');
                    }
                }
            }
        }

        if let Some(s) = &class.summary {
            match &s.path {
                Some(path) => output.push_str(&format!(
                    "  Summary: {} ({} entries)\n",
                    path.display(),
                    s.entries
                )),
                None => output.push_str("  Summary: no headed records, nothing written\n"),
            }
        }

        if !class.orphaned_intermediates.is_empty() {
            output.push_str("  Needs operator action (interrupted completion):\n");
            for path in &class.orphaned_intermediates {
                output.push_str(&format!("    {}\n", path.display()));
            }
        }

        for failure in class.all_failures() {
            output.push_str(&format!("  ERROR: {}\n", failure));
        }

        output
    }

    /// Final tally
    pub fn format_totals(totals: &RunTotals) -> String {
        let mut output = String::new();
        output.push_str("\n========================================\n");
        output.push_str(&format!("Classes processed:      {}\n", totals.classes));
        output.push_str(&format!("Records completed:      {}\n", totals.records_completed));
        output.push_str(&format!("Students w/ duplicates: {}\n", totals.duplicate_buckets));
        output.push_str(&format!("Duplicates moved:       {}\n", totals.duplicates_moved));
        output.push_str(&format!(
            "Summaries written:      {} ({} entries)\n",
            totals.summaries_written, totals.summary_entries
        ));
        if totals.orphaned_intermediates > 0 {
            output.push_str(&format!(
                "Orphaned intermediates: {}\n",
                totals.orphaned_intermediates
            ));
        }
        if totals.failures > 0 {
            output.push_str(&format!("Failures:               {}\n", totals.failures));
        }
        output.push_str("========================================\n");
        output
    }

    pub fn format_report(report: &RunReport) -> String {
        let mut output = Self::format_run_header(report);
        if report.classes.is_empty() {
            output.push_str("\nNo class directories found\n");
        }
        for class in &report.classes {
            output.push_str(&Self::format_class(class));
        }
        output.push_str(&Self::format_totals(&report.totals));
        output
    }
}
