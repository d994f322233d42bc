//! Batch completion of headless records
//!
//! A headless record (answers only, as left by an interrupted or older
//! session) is finalized in place:
//! 1. the original is renamed to `<stem>_Unprocessed.txt`,
//! 2. the header plus the original body is written under the original name,
//! 3. the `_Unprocessed` copy is moved to quarantine.
//!
//! If step 2 fails the rename is undone. If step 3 fails the intermediate
//! stays in the class directory and is reported; later runs ignore it.

use super::quarantine::move_to_quarantine;
use super::record_scanner::{RecordScanner, ScanError, ScannedRecord};
use super::ItemFailure;
use serde::Serialize;
use sptest_common::record::{
    apply_header, compute_score, decode_answers, is_headed, synthesize_header, unprocessed_name,
    Answer, ScoreSummary,
};
use sptest_common::roster::Roster;
use sptest_common::PointScale;
use std::fs;
use std::path::{Path, PathBuf};
use tracing::{debug, info, warn};

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct CompletedRecord {
    pub file_name: String,
    pub student_key: String,
    pub student_name: Option<String>,
    pub score: ScoreSummary,
    /// Where the raw original ended up; `None` if the quarantine move failed
    pub original_moved_to: Option<PathBuf>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct CompletionOutcome {
    pub completed: Vec<CompletedRecord>,
    /// Records that already carried a header
    pub already_headed: usize,
    /// Headless records without a single decodable answer, left untouched
    pub empty: usize,
    pub failures: Vec<ItemFailure>,
}

/// Completes headless records of a class directory
#[derive(Debug, Clone)]
pub struct RecordCompleter {
    scanner: RecordScanner,
    quarantine_dir: PathBuf,
}

impl RecordCompleter {
    pub fn new(quarantine_dir: impl Into<PathBuf>) -> Self {
        Self {
            scanner: RecordScanner::new(),
            quarantine_dir: quarantine_dir.into(),
        }
    }

    /// Complete every headless record in `class_dir`
    ///
    /// Student names come from `roster` when given.
    pub fn complete_class(
        &self,
        class_dir: &Path,
        scale: &PointScale,
        roster: Option<&Roster>,
    ) -> Result<CompletionOutcome, ScanError> {
        let scan = self.scanner.scan(class_dir)?;
        let mut outcome = CompletionOutcome::default();

        for record in &scan.records {
            let body = match fs::read_to_string(&record.path) {
                Ok(body) => body,
                Err(e) => {
                    warn!(file = %record.path.display(), error = %e, "Unreadable record skipped");
                    outcome.failures.push(ItemFailure::new(&record.path, "read record", e));
                    continue;
                }
            };

            if is_headed(&body) {
                outcome.already_headed += 1;
                continue;
            }

            let answers = decode_answers(&body);
            if answers.is_empty() {
                debug!(
                    file = %record.name.file_name,
                    "Headless record has no answers, left in place"
                );
                outcome.empty += 1;
                continue;
            }

            match self.complete_record(record, &body, &answers, scale, roster) {
                Ok((completed, move_failure)) => {
                    info!(
                        file = %completed.file_name,
                        score = completed.score.total,
                        max = completed.score.max,
                        "Completed headless record"
                    );
                    outcome.completed.push(completed);
                    outcome.failures.extend(move_failure);
                }
                Err(failure) => {
                    warn!("{}", failure);
                    outcome.failures.push(failure);
                }
            }
        }

        Ok(outcome)
    }

    fn complete_record(
        &self,
        record: &ScannedRecord,
        body: &str,
        answers: &[Answer],
        scale: &PointScale,
        roster: Option<&Roster>,
    ) -> Result<(CompletedRecord, Option<ItemFailure>), ItemFailure> {
        let name = &record.name;
        let score = compute_score(answers);
        let student_name = roster
            .and_then(|r| r.lookup(&name.student_key))
            .filter(|n| !n.is_empty())
            .map(str::to_string);
        let header = synthesize_header(
            &name.file_name,
            &name.student_key,
            student_name.as_deref(),
            &score,
            scale,
        );

        let unprocessed_path = record.path.with_file_name(unprocessed_name(&name.file_name));
        swap_in_headed(
            &record.path,
            &unprocessed_path,
            &apply_header(&header, body),
            |path, content| fs::write(path, content),
        )?;

        let (original_moved_to, move_failure) =
            match move_to_quarantine(&unprocessed_path, &self.quarantine_dir) {
                Ok(destination) => (Some(destination), None),
                Err(e) => (
                    None,
                    Some(ItemFailure::new(&unprocessed_path, "move to quarantine", e)),
                ),
            };

        Ok((
            CompletedRecord {
                file_name: name.file_name.clone(),
                student_key: name.student_key.to_string(),
                student_name,
                score,
                original_moved_to,
            },
            move_failure,
        ))
    }
}

/// Move the raw record aside and write its headed replacement
///
/// When the write fails the raw record gets its original name back.
fn swap_in_headed<W>(
    record_path: &Path,
    unprocessed_path: &Path,
    headed: &str,
    write: W,
) -> Result<(), ItemFailure>
where
    W: FnOnce(&Path, &str) -> std::io::Result<()>,
{
    fs::rename(record_path, unprocessed_path)
        .map_err(|e| ItemFailure::new(record_path, "rename to unprocessed", e))?;

    if let Err(e) = write(record_path, headed) {
        let failure = ItemFailure::new(record_path, "write headed record", e);
        if let Err(undo) = fs::rename(unprocessed_path, record_path) {
            warn!(
                file = %unprocessed_path.display(),
                error = %undo,
                "Could not restore original name; intermediate left in place"
            );
        }
        return Err(failure);
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use sptest_common::record::extract_header_fields;
    use tempfile::TempDir;

    const RAW: &str = "Question 00: 5 = 1 0 0 0 0 intro\n\
                       Question 01: 0 = 0 1 0 0 0 apple\n";

    #[test]
    fn test_complete_headless_record() {
        let root = TempDir::new().unwrap();
        let class_dir = root.path().join("5");
        fs::create_dir(&class_dir).unwrap();
        let record = class_dir.join("SpeakingTest_5_3_2024.03.15.0942.txt");
        fs::write(&record, RAW).unwrap();

        let completer = RecordCompleter::new(root.path().join("Duplicates"));
        let outcome = completer
            .complete_class(&class_dir, &PointScale::default(), None)
            .unwrap();

        assert_eq!(outcome.completed.len(), 1);
        assert!(outcome.failures.is_empty());
        let headed = fs::read_to_string(&record).unwrap();
        assert!(is_headed(&headed));
        assert!(headed.ends_with(RAW));
        let fields = extract_header_fields(&headed);
        assert_eq!(fields.student_key, "03");
        assert_eq!(fields.total, 5);
        assert_eq!(fields.max, 10);

        let moved = root
            .path()
            .join("Duplicates")
            .join("SpeakingTest_5_3_2024.03.15.0942_Unprocessed.txt");
        assert_eq!(fs::read_to_string(moved).unwrap(), RAW);
        assert!(!class_dir
            .join("SpeakingTest_5_3_2024.03.15.0942_Unprocessed.txt")
            .exists());
    }

    #[test]
    fn test_headed_and_empty_records_untouched() {
        let root = TempDir::new().unwrap();
        let class_dir = root.path().join("5");
        fs::create_dir(&class_dir).unwrap();
        let headed = "x.txt\nStudent: 01\n====================\n";
        fs::write(class_dir.join("SpeakingTest_5_1_2024.03.15.0900.txt"), headed).unwrap();
        fs::write(class_dir.join("SpeakingTest_5_2_2024.03.15.0900.txt"), "").unwrap();

        let outcome = RecordCompleter::new(root.path().join("Duplicates"))
            .complete_class(&class_dir, &PointScale::default(), None)
            .unwrap();

        assert!(outcome.completed.is_empty());
        assert_eq!(outcome.already_headed, 1);
        assert_eq!(outcome.empty, 1);
        assert_eq!(
            fs::read_to_string(class_dir.join("SpeakingTest_5_1_2024.03.15.0900.txt")).unwrap(),
            headed
        );
        assert!(!root.path().join("Duplicates").exists());
    }

    #[test]
    fn test_corrupt_body_is_reported_and_left_in_place() {
        let root = TempDir::new().unwrap();
        let class_dir = root.path().join("5");
        fs::create_dir(&class_dir).unwrap();
        let corrupt = class_dir.join("SpeakingTest_5_1_2024.03.15.0900.txt");
        fs::write(&corrupt, [0xff, 0xfe]).unwrap();
        let good = class_dir.join("SpeakingTest_5_2_2024.03.15.0900.txt");
        fs::write(&good, RAW).unwrap();

        let outcome = RecordCompleter::new(root.path().join("Duplicates"))
            .complete_class(&class_dir, &PointScale::default(), None)
            .unwrap();

        assert_eq!(outcome.failures.len(), 1);
        assert_eq!(outcome.failures[0].path, corrupt);
        assert_eq!(outcome.failures[0].action, "read record");
        assert_eq!(fs::read(&corrupt).unwrap(), vec![0xff, 0xfe]);
        assert_eq!(outcome.completed.len(), 1);
        assert!(is_headed(&fs::read_to_string(&good).unwrap()));
    }

    #[test]
    fn test_failed_headed_write_restores_original_name() {
        let dir = TempDir::new().unwrap();
        let record = dir.path().join("SpeakingTest_5_3_2024.03.15.0942.txt");
        let unprocessed = dir.path().join("SpeakingTest_5_3_2024.03.15.0942_Unprocessed.txt");
        fs::write(&record, RAW).unwrap();

        let result = swap_in_headed(&record, &unprocessed, "headed", |_, _| {
            Err(std::io::Error::new(std::io::ErrorKind::Other, "disk full"))
        });

        let failure = result.unwrap_err();
        assert_eq!(failure.action, "write headed record");
        assert_eq!(failure.error, "disk full");
        assert_eq!(fs::read_to_string(&record).unwrap(), RAW);
        assert!(!unprocessed.exists());
    }

    #[test]
    fn test_successful_swap_keeps_raw_copy_aside() {
        let dir = TempDir::new().unwrap();
        let record = dir.path().join("SpeakingTest_5_3_2024.03.15.0942.txt");
        let unprocessed = dir.path().join("SpeakingTest_5_3_2024.03.15.0942_Unprocessed.txt");
        fs::write(&record, RAW).unwrap();

        swap_in_headed(&record, &unprocessed, "headed", |path, content| {
            fs::write(path, content)
        })
        .unwrap();

        assert_eq!(fs::read_to_string(&record).unwrap(), "headed");
        assert_eq!(fs::read_to_string(&unprocessed).unwrap(), RAW);
    }
}
