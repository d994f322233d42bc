//! Class directory scanner
//!
//! Non-recursive listing of one class directory, in file name order,
//! sorted into records, intermediate files and everything else.

use sptest_common::record::{is_intermediate_name, RecordName, RECORD_PREFIX};
use std::path::{Path, PathBuf};
use thiserror::Error;
use walkdir::WalkDir;

/// Class directory scan errors
#[derive(Debug, Error)]
pub enum ScanError {
    /// Specified path does not exist
    #[error("Path not found: {0}")]
    PathNotFound(PathBuf),

    /// Path exists but is not a directory
    #[error("Not a directory: {0}")]
    NotADirectory(PathBuf),

    /// Directory listing failed
    #[error("I/O error listing {0}: {1}")]
    Io(PathBuf, String),
}

/// A record file found by a scan
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ScannedRecord {
    pub path: PathBuf,
    pub name: RecordName,
    /// Position in scan order
    pub scan_index: usize,
}

/// Result of scanning one class directory
#[derive(Debug, Clone, Default)]
pub struct ClassScan {
    /// Parseable, non-intermediate records in scan order
    pub records: Vec<ScannedRecord>,
    /// Record files left in an intermediate state (`_Unprocessed`, `_PROCESSED`)
    pub intermediates: Vec<PathBuf>,
    /// Files that are not records (summaries, rosters, strays)
    pub ignored: usize,
    /// Entries that could not be inspected
    pub errors: Vec<String>,
}

/// Class directory scanner
#[derive(Debug, Clone, Default)]
pub struct RecordScanner;

impl RecordScanner {
    pub fn new() -> Self {
        Self
    }

    /// Scan a class directory (files directly inside it only)
    pub fn scan(&self, class_dir: &Path) -> Result<ClassScan, ScanError> {
        if !class_dir.exists() {
            return Err(ScanError::PathNotFound(class_dir.to_path_buf()));
        }

        if !class_dir.is_dir() {
            return Err(ScanError::NotADirectory(class_dir.to_path_buf()));
        }

        let mut scan = ClassScan::default();
        let walker = WalkDir::new(class_dir)
            .min_depth(1)
            .max_depth(1)
            .follow_links(false)
            .sort_by_file_name();

        for entry in walker {
            let entry = match entry {
                Ok(entry) => entry,
                Err(e) => {
                    tracing::warn!("Error accessing entry: {}", e);
                    scan.errors.push(e.to_string());
                    continue;
                }
            };

            let path = entry.path();
            if !path.is_file() {
                continue;
            }

            let Some(file_name) = path.file_name().and_then(|n| n.to_str()) else {
                scan.ignored += 1;
                continue;
            };

            if is_intermediate_name(file_name) {
                if file_name.starts_with(RECORD_PREFIX) {
                    scan.intermediates.push(path.to_path_buf());
                } else {
                    scan.ignored += 1;
                }
                continue;
            }

            match RecordName::parse(file_name) {
                Some(name) => {
                    let scan_index = scan.records.len();
                    scan.records.push(ScannedRecord {
                        path: path.to_path_buf(),
                        name,
                        scan_index,
                    });
                }
                None => scan.ignored += 1,
            }
        }

        tracing::debug!(
            dir = %class_dir.display(),
            records = scan.records.len(),
            intermediates = scan.intermediates.len(),
            ignored = scan.ignored,
            "Class directory scanned"
        );

        Ok(scan)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;
    use tempfile::TempDir;

    #[test]
    fn test_scan_nonexistent_path() {
        let scanner = RecordScanner::new();
        let result = scanner.scan(Path::new("/nonexistent/sptest/class"));
        match result.unwrap_err() {
            ScanError::PathNotFound(_) => {}
            other => panic!("Expected PathNotFound error, got {:?}", other),
        }
    }

    #[test]
    fn test_scan_file_as_directory() {
        let dir = TempDir::new().unwrap();
        let file = dir.path().join("plain.txt");
        fs::write(&file, "x").unwrap();
        match RecordScanner::new().scan(&file).unwrap_err() {
            ScanError::NotADirectory(_) => {}
            other => panic!("Expected NotADirectory error, got {:?}", other),
        }
    }

    #[test]
    fn test_scan_empty_directory() {
        let dir = TempDir::new().unwrap();
        let scan = RecordScanner::new().scan(dir.path()).unwrap();
        assert!(scan.records.is_empty());
        assert!(scan.intermediates.is_empty());
        assert_eq!(scan.ignored, 0);
    }

    #[test]
    fn test_scan_classifies_entries() {
        let dir = TempDir::new().unwrap();
        for name in [
            "SpeakingTest_5_03_2024.03.15.0942.txt",
            "SpeakingTest_5_01_2024.03.15.0930.txt",
            "SpeakingTest_5_02_2024.03.15.0935_Unprocessed.txt",
            "5_SpeakingTest.24.03.15.txt",
            "5_Roster.txt",
        ] {
            fs::write(dir.path().join(name), "").unwrap();
        }
        fs::create_dir(dir.path().join("SpeakingTest_5_09_2024.03.15.0900.txt")).unwrap();

        let scan = RecordScanner::new().scan(dir.path()).unwrap();
        let names: Vec<&str> = scan.records.iter().map(|r| r.name.file_name.as_str()).collect();
        assert_eq!(
            names,
            vec![
                "SpeakingTest_5_01_2024.03.15.0930.txt",
                "SpeakingTest_5_03_2024.03.15.0942.txt",
            ]
        );
        assert_eq!(scan.records[1].scan_index, 1);
        assert_eq!(scan.intermediates.len(), 1);
        assert_eq!(scan.ignored, 2);
    }
}
