//! Live test session
//!
//! Everything that identifies the test in progress (class, student, record
//! file) lives in one [`Session`] value owned by the caller. Answers are
//! appended to the record as they are given; [`Session::finish`] heads the
//! record and adds the student's line to the day's class summary.

use crate::services::summary_compiler::{format_summary_header, format_summary_line};
use crate::services::RecordScanner;
use chrono::NaiveDateTime;
use sptest_common::layout::{
    roster_file_name, sanitize_folder_name, summary_file_name, RecordsLayout,
};
use sptest_common::record::{
    apply_header, compute_score_against, decode_answers, extract_header_fields, is_headed,
    synthesize_header, Answer, RecordName, ScoreSummary,
};
use sptest_common::roster::Roster;
use sptest_common::{time, Error, PointScale, Result, StudentKey};
use std::fs::{self, OpenOptions};
use std::io::Write;
use std::path::{Path, PathBuf};
use tracing::{debug, info, warn};

/// A test being taken by one student
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Session {
    class_key: String,
    class_dir: PathBuf,
    student_key: StudentKey,
    student_name: Option<String>,
    record_path: PathBuf,
    started_at: NaiveDateTime,
}

impl Session {
    /// Start a test: create the class directory if needed and an empty record
    ///
    /// The class key is sanitized into a folder name. Keys that end up empty
    /// or contain `_` are rejected, since the record name could not be parsed
    /// back. An existing record with the same name is never overwritten.
    pub fn begin(
        layout: &RecordsLayout,
        class_key: &str,
        student_key: StudentKey,
        student_name: Option<String>,
        now: NaiveDateTime,
    ) -> Result<Self> {
        let class_key = sanitize_folder_name(class_key);
        if class_key.is_empty() || class_key.contains('_') {
            return Err(Error::InvalidInput(format!(
                "class key {:?} cannot be used in a record name",
                class_key
            )));
        }
        let key = student_key.as_str();
        if key.is_empty() || key.contains('_') || key.chars().any(char::is_whitespace) {
            return Err(Error::InvalidInput(format!(
                "student key {:?} cannot be used in a record name",
                key
            )));
        }

        let class_dir = layout.class_dir(&class_key);
        fs::create_dir_all(&class_dir)?;
        let record_path = class_dir.join(RecordName::compose(&class_key, &student_key, now));
        OpenOptions::new()
            .write(true)
            .create_new(true)
            .open(&record_path)?;

        info!(record = %record_path.display(), "Started test session");

        Ok(Self {
            class_key,
            class_dir,
            student_key,
            student_name: student_name.filter(|n| !n.trim().is_empty()),
            record_path,
            started_at: now,
        })
    }

    pub fn class_key(&self) -> &str {
        &self.class_key
    }

    pub fn class_dir(&self) -> &Path {
        &self.class_dir
    }

    pub fn student_key(&self) -> &StudentKey {
        &self.student_key
    }

    pub fn student_name(&self) -> Option<&str> {
        self.student_name.as_deref()
    }

    pub fn record_path(&self) -> &Path {
        &self.record_path
    }

    /// When the test began (the record name's timestamp)
    pub fn started_at(&self) -> NaiveDateTime {
        self.started_at
    }

    /// Append the answer for `question` at button `position` (1-based)
    pub fn record_answer(
        &self,
        question: u32,
        position: usize,
        scale: &PointScale,
        source_label: &str,
    ) -> Result<Answer> {
        let points = scale.points_for(position);
        let answer = Answer::for_position(question, position, points, source_label)
            .ok_or_else(|| {
                Error::InvalidInput(format!("answer position {} out of range", position))
            })?;

        let mut file = OpenOptions::new().append(true).open(&self.record_path)?;
        writeln!(file, "{}", answer.to_line())?;
        debug!(question, position, points = answer.point_value, "Recorded answer");
        Ok(answer)
    }

    /// Remove the most recent answer line
    ///
    /// Returns `false` when there was nothing to remove. A headed record is
    /// final and cannot be edited.
    pub fn retract_last_answer(&self) -> Result<bool> {
        let body = fs::read_to_string(&self.record_path)?;
        if is_headed(&body) {
            return Err(Error::InvalidInput(format!(
                "record {} is already finished",
                self.record_path.display()
            )));
        }

        let mut lines: Vec<&str> = body.lines().collect();
        while lines.last().is_some_and(|l| l.trim().is_empty()) {
            lines.pop();
        }
        if lines.pop().is_none() {
            return Ok(false);
        }

        let mut content = lines.join("\n");
        if !content.is_empty() {
            content.push('\n');
        }
        fs::write(&self.record_path, content)?;
        debug!(record = %self.record_path.display(), "Retracted last answer");
        Ok(true)
    }

    /// Head the record and add it to the class summary of the day it ends
    ///
    /// The score uses the scale's highest point value per question. A record
    /// that is already headed is left as it is and its recorded score returned.
    pub fn finish(&self, scale: &PointScale, now: NaiveDateTime) -> Result<ScoreSummary> {
        let body = fs::read_to_string(&self.record_path)?;
        if is_headed(&body) {
            let fields = extract_header_fields(&body);
            debug!(record = %self.record_path.display(), "Session already finished");
            return Ok(ScoreSummary {
                total: fields.total,
                max: fields.max,
                percentage: fields.percentage,
                question_count: fields.question_count,
            });
        }

        let answers = decode_answers(&body);
        let score = compute_score_against(&answers, scale.max_point_value());
        let file_name = self
            .record_path
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_default();
        let header = synthesize_header(
            &file_name,
            &self.student_key,
            self.student_name.as_deref(),
            &score,
            scale,
        );
        fs::write(&self.record_path, apply_header(&header, &body))?;

        self.append_summary_line(&score, now)?;
        info!(
            record = %file_name,
            score = score.total,
            max = score.max,
            "Finished test session"
        );
        Ok(score)
    }

    fn append_summary_line(&self, score: &ScoreSummary, now: NaiveDateTime) -> Result<()> {
        let date_stamp = time::format_date_stamp(now);
        let path = self
            .class_dir
            .join(summary_file_name(&self.class_key, &date_stamp));

        let mut file = OpenOptions::new().create(true).append(true).open(&path)?;
        if file.metadata()?.len() == 0 {
            file.write_all(format_summary_header(&self.class_key, &date_stamp).as_bytes())?;
        }
        let line = format_summary_line(
            &now.format("%y.%m.%d.%H%M").to_string(),
            self.student_key.as_str(),
            self.student_name.as_deref().unwrap_or(""),
            score.total,
            score.max,
            score.percentage,
        );
        file.write_all(line.as_bytes())?;
        Ok(())
    }

    /// Store the session's student name in the class roster
    pub fn remember_student_name(&self) -> Result<()> {
        let Some(name) = self.student_name.as_deref() else {
            return Ok(());
        };
        let mut roster = Roster::load(&self.class_dir.join(roster_file_name(&self.class_key)))?;
        roster.upsert(&self.student_key, name);
        roster.save()
    }
}

/// True when the class directory already holds a record for this student
///
/// Used to warn before a retake. A missing class directory holds nothing.
pub fn has_existing_record(class_dir: &Path, student_key: &StudentKey) -> bool {
    match RecordScanner::new().scan(class_dir) {
        Ok(scan) => scan
            .records
            .iter()
            .any(|r| r.name.student_key.same_identity(student_key)),
        Err(e) => {
            debug!(dir = %class_dir.display(), error = %e, "No records to check");
            false
        }
    }
}

/// Name of a student from the class roster, if the roster knows them
pub fn lookup_student_name(
    layout: &RecordsLayout,
    class_key: &str,
    student_key: &StudentKey,
) -> Option<String> {
    let folder = sanitize_folder_name(class_key);
    let roster_path = layout
        .class_dir(&folder)
        .join(roster_file_name(&folder));
    match Roster::load(&roster_path) {
        Ok(roster) => roster.lookup(student_key).map(str::to_string),
        Err(e) => {
            warn!(roster = %roster_path.display(), error = %e, "Roster unreadable");
            None
        }
    }
}
