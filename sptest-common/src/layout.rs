//! Records-root layout
//!
//! ```text
//! <records-root>/
//!   <class>/
//!     SpeakingTest_<class>_<student>_<YYYY.MM.DD.HHMM>.txt
//!     <class>_SpeakingTest.<YY.MM.DD>.txt
//!     <class>_Roster.txt
//!   Duplicates/
//! ```

use crate::{Error, Result};
use once_cell::sync::Lazy;
use regex::Regex;
use std::path::{Path, PathBuf};

/// Quarantine directory name, directly under the records root
pub const DUPLICATES_DIR: &str = "Duplicates";

static INVALID_FOLDER_CHARS: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"[^\w\s-]").expect("folder filter pattern is valid"));
static WHITESPACE_RUN: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"\s+").expect("whitespace pattern is valid"));

/// Paths inside one records root
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RecordsLayout {
    root: PathBuf,
}

impl RecordsLayout {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    pub fn duplicates_dir(&self) -> PathBuf {
        self.root.join(DUPLICATES_DIR)
    }

    /// Directory holding a class's records (class key sanitized for the filesystem)
    pub fn class_dir(&self, class_key: &str) -> PathBuf {
        self.root.join(sanitize_folder_name(class_key))
    }

    /// Fail unless the records root exists and is a directory
    pub fn ensure_root_exists(&self) -> Result<()> {
        if !self.root.is_dir() {
            return Err(Error::NotFound(format!(
                "records root {}",
                self.root.display()
            )));
        }
        Ok(())
    }

    /// Create the quarantine directory if absent
    pub fn ensure_duplicates_dir(&self) -> Result<PathBuf> {
        let dir = self.duplicates_dir();
        std::fs::create_dir_all(&dir)?;
        Ok(dir)
    }

    /// Class directories under the root, in name order, excluding quarantine
    pub fn class_dirs(&self) -> Result<Vec<PathBuf>> {
        self.ensure_root_exists()?;
        let mut dirs = Vec::new();
        for entry in std::fs::read_dir(&self.root)? {
            let entry = entry?;
            if entry.file_name() == DUPLICATES_DIR {
                continue;
            }
            if entry.file_type()?.is_dir() {
                dirs.push(entry.path());
            }
        }
        dirs.sort();
        Ok(dirs)
    }
}

/// File name of a class summary for one day
pub fn summary_file_name(class_key: &str, date_stamp: &str) -> String {
    format!("{}_SpeakingTest.{}.txt", class_key, date_stamp)
}

/// File name of a class roster
pub fn roster_file_name(class_key: &str) -> String {
    format!("{}_Roster.txt", class_key)
}

/// Make a class key safe to use as a directory name
///
/// Drops everything except word characters, whitespace and `-`, collapses
/// whitespace runs, trims, and turns the remaining spaces into `_`.
pub fn sanitize_folder_name(name: &str) -> String {
    let kept = INVALID_FOLDER_CHARS.replace_all(name, "");
    let collapsed = WHITESPACE_RUN.replace_all(&kept, " ");
    collapsed.trim().replace(' ', "_")
}

/// Class key of a class directory (its final path component)
pub fn class_key_of(class_dir: &Path) -> String {
    class_dir
        .file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .unwrap_or_default()
}
