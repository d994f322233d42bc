//! Class roster: student key → display name
//!
//! One file per class, `<class>_Roster.txt`, one `<id> <name>` entry per line.

use crate::record::{is_all_digits, normalize_identity, StudentKey};
use crate::Result;
use std::path::{Path, PathBuf};
use tracing::debug;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RosterEntry {
    pub id: String,
    pub name: String,
}

impl RosterEntry {
    fn parse(line: &str) -> Option<Self> {
        let line = line.trim();
        if line.is_empty() {
            return None;
        }
        let (id, name) = line.split_once(' ').unwrap_or((line, ""));
        Some(Self {
            id: id.to_string(),
            name: name.to_string(),
        })
    }

    fn to_line(&self) -> String {
        if self.name.is_empty() {
            self.id.clone()
        } else {
            format!("{} {}", self.id, self.name)
        }
    }
}

/// Roster of one class, loaded from and saved to its roster file
#[derive(Debug, Clone)]
pub struct Roster {
    path: PathBuf,
    entries: Vec<RosterEntry>,
}

impl Roster {
    /// Load a roster; a missing file is an empty roster
    pub fn load(path: &Path) -> Result<Self> {
        let entries = if path.exists() {
            std::fs::read_to_string(path)?
                .lines()
                .filter_map(RosterEntry::parse)
                .collect()
        } else {
            debug!(path = %path.display(), "Roster file not found, starting empty");
            Vec::new()
        };
        Ok(Self {
            path: path.to_path_buf(),
            entries,
        })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn entries(&self) -> &[RosterEntry] {
        &self.entries
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Name of the student with the same identity as `key`
    pub fn lookup(&self, key: &StudentKey) -> Option<&str> {
        let wanted = key.normalized();
        self.entries
            .iter()
            .find(|e| normalize_identity(&e.id) == wanted)
            .map(|e| e.name.as_str())
    }

    /// Add or replace the entry for `key`, keeping numeric ids in order
    ///
    /// Numeric ids are stored zero-padded to two digits. Non-numeric ids sort
    /// after all numeric ones, in their existing order.
    pub fn upsert(&mut self, key: &StudentKey, name: &str) {
        let wanted = key.normalized();
        let entry = RosterEntry {
            id: key.padded(),
            name: name.to_string(),
        };

        match self
            .entries
            .iter_mut()
            .find(|e| normalize_identity(&e.id) == wanted)
        {
            Some(existing) => *existing = entry,
            None => self.entries.push(entry),
        }

        self.entries.sort_by_key(|e| {
            if is_all_digits(&e.id) {
                (0, e.id.trim_start_matches('0').len(), e.id.trim_start_matches('0').to_string())
            } else {
                (1, 0, String::new())
            }
        });
    }

    /// Rewrite the roster file
    pub fn save(&self) -> Result<()> {
        let mut content = String::new();
        for entry in &self.entries {
            content.push_str(&entry.to_line());
            content.push('\n');
        }
        std::fs::write(&self.path, content)?;
        Ok(())
    }
}
