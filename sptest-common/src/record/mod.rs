//! Speaking test records
//!
//! A record is one test attempt stored as a text file named
//! `SpeakingTest_<class>_<student>_<timestamp>.txt`. Its body is a run of
//! answer lines, optionally prefixed by a summary header once finalized.

pub mod answers;
pub mod header;

pub use answers::{
    compute_score, compute_score_against, decode_answers, is_headed, Answer, ScoreSummary,
};
pub use header::{apply_header, extract_header_fields, synthesize_header, HeaderFields};

use crate::time::{self, RecordInstant};
use chrono::NaiveDateTime;
use std::fmt;

/// Leading segment of every record file name
pub const RECORD_PREFIX: &str = "SpeakingTest";

/// Extension of record, summary and roster files
pub const TEXT_EXTENSION: &str = ".txt";

/// Name suffix given to a raw record while it is being completed
pub const UNPROCESSED_SUFFIX: &str = "_Unprocessed.txt";

/// Name suffix left by older tooling for already-handled records
pub const PROCESSED_SUFFIX: &str = "_PROCESSED.txt";

/// Student identifier token as it appears in a record name
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct StudentKey(String);

/// Identity used to match students: all-digit keys compare without leading zeros
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct NormalizedKey(String);

impl StudentKey {
    pub fn new(key: impl Into<String>) -> Self {
        Self(key.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    pub fn is_numeric(&self) -> bool {
        is_all_digits(&self.0)
    }

    pub fn normalized(&self) -> NormalizedKey {
        normalize_identity(&self.0)
    }

    /// Key as shown in headers: numeric keys zero-padded to two digits
    pub fn padded(&self) -> String {
        if self.is_numeric() {
            format!("{:0>2}", self.0)
        } else {
            self.0.clone()
        }
    }

    pub fn same_identity(&self, other: &StudentKey) -> bool {
        self.normalized() == other.normalized()
    }
}

impl fmt::Display for StudentKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl NormalizedKey {
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for NormalizedKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

pub(crate) fn is_all_digits(s: &str) -> bool {
    !s.is_empty() && s.bytes().all(|b| b.is_ascii_digit())
}

/// Normalize a student key for identity comparison
///
/// `"1"`, `"01"` and `"001"` all normalize to `"1"`; `"000"` normalizes to
/// `"0"`. Keys that are not all digits are returned unchanged.
pub fn normalize_identity(key: &str) -> NormalizedKey {
    if is_all_digits(key) {
        let stripped = key.trim_start_matches('0');
        if stripped.is_empty() {
            NormalizedKey("0".to_string())
        } else {
            NormalizedKey(stripped.to_string())
        }
    } else {
        NormalizedKey(key.to_string())
    }
}

/// Identity fields decoded from a record file name
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RecordName {
    /// Full file name, extension included
    pub file_name: String,
    pub class_key: String,
    pub student_key: StudentKey,
    /// Raw timestamp segment, e.g. `2024.03.15.0942`
    pub timestamp: String,
}

impl RecordName {
    /// Parse `SpeakingTest_<class>_<student>_<timestamp>.txt`
    ///
    /// Underscore segments past the fourth are ignored. Empty class or
    /// student segments do not parse.
    pub fn parse(file_name: &str) -> Option<Self> {
        let stem = file_name.strip_suffix(TEXT_EXTENSION)?;
        let mut parts = stem.split('_');
        if parts.next()? != RECORD_PREFIX {
            return None;
        }
        let class_key = parts.next()?;
        let student_key = parts.next()?;
        let timestamp = parts.next()?;
        if class_key.is_empty() || student_key.is_empty() {
            return None;
        }

        Some(Self {
            file_name: file_name.to_string(),
            class_key: class_key.to_string(),
            student_key: StudentKey::new(student_key),
            timestamp: timestamp.to_string(),
        })
    }

    /// Compose the file name for a new record taken at `taken_at`
    pub fn compose(class_key: &str, student_key: &StudentKey, taken_at: NaiveDateTime) -> String {
        format!(
            "{}_{}_{}_{}{}",
            RECORD_PREFIX,
            class_key,
            student_key,
            time::format_record_timestamp(taken_at),
            TEXT_EXTENSION
        )
    }

    pub fn instant(&self) -> RecordInstant {
        RecordInstant::parse(&self.timestamp)
    }

    /// Grouping key used for duplicate detection
    pub fn identity(&self) -> (String, NormalizedKey) {
        (self.class_key.clone(), self.student_key.normalized())
    }

    pub fn is_intermediate(&self) -> bool {
        is_intermediate_name(&self.file_name)
    }
}

/// True for names in an intermediate or already-quarantined state
pub fn is_intermediate_name(file_name: &str) -> bool {
    file_name.contains(UNPROCESSED_SUFFIX) || file_name.contains(PROCESSED_SUFFIX)
}

/// Name a raw record takes while its headed replacement is written
pub fn unprocessed_name(file_name: &str) -> String {
    match file_name.strip_suffix(TEXT_EXTENSION) {
        Some(stem) => format!("{}{}", stem, UNPROCESSED_SUFFIX),
        None => format!("{}{}", file_name, UNPROCESSED_SUFFIX),
    }
}
