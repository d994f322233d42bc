//! Reconciliation pipeline over a records root
//!
//! Per class directory, in name order: complete headless records, move
//! stale duplicates to quarantine, rebuild the class summary. Each command
//! runs a subset of these stages. Class directories are processed one after
//! another; a failing class is reported and the run moves on.

use crate::report::{ClassReport, RunReport};
use crate::services::{
    DuplicateResolver, ItemFailure, RecordCompleter, RecordScanner, SummaryCompiler,
};
use sptest_common::config::TomlConfig;
use sptest_common::layout::{class_key_of, roster_file_name, RecordsLayout};
use sptest_common::record::is_headed;
use sptest_common::roster::Roster;
use sptest_common::{PointScale, Result};
use std::fs;
use std::path::Path;
use tracing::{debug, info, warn};

/// Which stages a run performs
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Stages {
    pub complete: bool,
    pub dedupe: bool,
    pub compile: bool,
}

impl Stages {
    pub const FIND_DUPLICATES: Stages = Stages {
        complete: false,
        dedupe: true,
        compile: false,
    };
    pub const PROCESS: Stages = Stages {
        complete: true,
        dedupe: true,
        compile: true,
    };
    pub const COMPILE: Stages = Stages {
        complete: false,
        dedupe: false,
        compile: true,
    };

    fn touches_quarantine(&self) -> bool {
        self.complete || self.dedupe
    }
}

pub struct Pipeline {
    layout: RecordsLayout,
    config: TomlConfig,
}

impl Pipeline {
    pub fn new(layout: RecordsLayout, config: TomlConfig) -> Self {
        Self { layout, config }
    }

    pub fn layout(&self) -> &RecordsLayout {
        &self.layout
    }

    /// Run the given stages over every class directory
    ///
    /// Only a missing records root (or an unreadable root listing) fails the
    /// run; everything else ends up in the report.
    pub fn run(&self, stages: Stages, command: &str) -> Result<RunReport> {
        self.layout.ensure_root_exists()?;
        let class_dirs = self.layout.class_dirs()?;
        if stages.touches_quarantine() {
            self.layout.ensure_duplicates_dir()?;
        }

        info!(
            root = %self.layout.root().display(),
            classes = class_dirs.len(),
            command,
            "Starting run"
        );

        let mut report = RunReport::new(self.layout.root(), command);
        for class_dir in &class_dirs {
            report.push_class(self.run_class(class_dir, stages));
        }

        info!(
            completed = report.totals.records_completed,
            moved = report.totals.duplicates_moved,
            summaries = report.totals.summaries_written,
            failures = report.totals.failures,
            "Run finished"
        );
        Ok(report)
    }

    /// Run the stages for one class directory
    pub fn run_class(&self, class_dir: &Path, stages: Stages) -> ClassReport {
        let class_key = class_key_of(class_dir);
        let mut report = ClassReport::new(&class_key);
        let quarantine_dir = self.layout.duplicates_dir();
        debug!(class = %class_key, "Processing class");

        if stages.complete {
            let scale = self.point_scale_for(&class_key, class_dir);
            let roster = self.roster_for(&class_key, class_dir);
            let completer = RecordCompleter::new(&quarantine_dir);
            match completer.complete_class(class_dir, &scale, roster.as_ref()) {
                Ok(outcome) => report.completion = Some(outcome),
                Err(e) => {
                    warn!(class = %class_key, error = %e, "Completion skipped");
                    report.failures.push(ItemFailure::new(class_dir, "complete records", e));
                }
            }
        }

        if stages.dedupe {
            match DuplicateResolver::new(&quarantine_dir).resolve(class_dir) {
                Ok(outcome) => report.duplicates = Some(outcome),
                Err(e) => {
                    warn!(class = %class_key, error = %e, "Duplicate resolution skipped");
                    report.failures.push(ItemFailure::new(class_dir, "resolve duplicates", e));
                }
            }
        }

        if stages.compile {
            match SummaryCompiler::new().compile(class_dir) {
                Ok(outcome) => report.summary = Some(outcome),
                Err(e) => {
                    warn!(class = %class_key, error = %e, "Summary skipped");
                    report.failures.push(ItemFailure::new(class_dir, "compile summary", e));
                }
            }
        }

        if let Ok(scan) = RecordScanner::new().scan(class_dir) {
            for path in &scan.intermediates {
                warn!(file = %path.display(), "Orphaned intermediate needs operator action");
            }
            report.orphaned_intermediates = scan.intermediates;
        }

        report
    }

    /// Point scale for a class
    ///
    /// Class configuration first, then the legend of a headed record already
    /// in the class, then the global configuration, then the default.
    pub fn point_scale_for(&self, class_key: &str, class_dir: &Path) -> PointScale {
        match self.config.class_point_scale(class_key) {
            Ok(Some(scale)) => return scale,
            Ok(None) => {}
            Err(e) => warn!(class = %class_key, error = %e, "Ignoring invalid class point scale"),
        }

        if let Some(scale) = recover_class_scale(class_dir) {
            debug!(class = %class_key, "Using point scale from existing headed record");
            return scale;
        }

        match self.config.global_point_scale() {
            Ok(Some(scale)) => scale,
            Ok(None) => PointScale::default(),
            Err(e) => {
                warn!(error = %e, "Ignoring invalid global point scale");
                PointScale::default()
            }
        }
    }

    fn roster_for(&self, class_key: &str, class_dir: &Path) -> Option<Roster> {
        if !self.config.use_roster_for(class_key) {
            return None;
        }
        let path = class_dir.join(roster_file_name(class_key));
        match Roster::load(&path) {
            Ok(roster) if !roster.is_empty() => Some(roster),
            Ok(_) => None,
            Err(e) => {
                warn!(roster = %path.display(), error = %e, "Roster unreadable, names left blank");
                None
            }
        }
    }
}

/// Scale from the first headed record in the class that carries a legend
fn recover_class_scale(class_dir: &Path) -> Option<PointScale> {
    let scan = RecordScanner::new().scan(class_dir).ok()?;
    scan.records.iter().find_map(|record| {
        let body = fs::read_to_string(&record.path).ok()?;
        if !is_headed(&body) {
            return None;
        }
        PointScale::recover_from_body(&body)
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use sptest_common::point_scale::ScaleEntry;
    use tempfile::TempDir;

    const HEADED: &str = "SpeakingTest_5_3_2024.03.15.0942.txt\n\
                          Student: 03\n\
                          ===================================================================\n\
                          Total Questions: 1   Max Score: 4   Score: 4   Percentage: 100%\n\
                          ===================================================================\n\
                          4 = Good\n\
                          0 = Wrong\n\
                          \n\
                          Question 00: 4 = 1 0 0 0 0 a\n";

    #[test]
    fn test_scale_recovered_from_headed_record() {
        let root = TempDir::new().unwrap();
        let class_dir = root.path().join("5");
        fs::create_dir(&class_dir).unwrap();
        fs::write(class_dir.join("SpeakingTest_5_3_2024.03.15.0942.txt"), HEADED).unwrap();

        let pipeline = Pipeline::new(RecordsLayout::new(root.path()), TomlConfig::default());
        let scale = pipeline.point_scale_for("5", &class_dir);
        assert_eq!(scale.max_point_value(), 4);
        assert_eq!(scale.label_for(2), Some("Wrong"));
    }

    #[test]
    fn test_class_scale_beats_recovered_scale() {
        let root = TempDir::new().unwrap();
        let class_dir = root.path().join("5");
        fs::create_dir(&class_dir).unwrap();
        fs::write(class_dir.join("SpeakingTest_5_3_2024.03.15.0942.txt"), HEADED).unwrap();

        let mut config = TomlConfig::default();
        config.classes.insert(
            "5".to_string(),
            sptest_common::config::ClassConfig {
                use_roster: None,
                point_scale: Some(vec![ScaleEntry {
                    position: 1,
                    points: 10,
                    label: "Great".to_string(),
                }]),
            },
        );
        let pipeline = Pipeline::new(RecordsLayout::new(root.path()), config);
        assert_eq!(pipeline.point_scale_for("5", &class_dir).max_point_value(), 10);
    }

    #[test]
    fn test_default_scale_when_nothing_configured() {
        let root = TempDir::new().unwrap();
        let class_dir = root.path().join("5");
        fs::create_dir(&class_dir).unwrap();

        let pipeline = Pipeline::new(RecordsLayout::new(root.path()), TomlConfig::default());
        assert_eq!(pipeline.point_scale_for("5", &class_dir), PointScale::default());
    }
}
