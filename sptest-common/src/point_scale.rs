//! Point scale: answer position → (points, label)
//!
//! The scale comes from configuration (or from the legend of a record that
//! was already finalized). It renders header legends and gives the live
//! session its per-question maximum.

use crate::record::answers::{DEFAULT_MAX_POINT_VALUE, POSITION_COUNT};
use crate::record::is_headed;
use crate::{Error, Result};
use once_cell::sync::Lazy;
use regex::Regex;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

static LEGEND_LINE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^(-?\d+)\s*=\s*(.+)$").expect("legend line pattern is valid"));

/// One configured scale position
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ScaleEntry {
    /// Answer position, 1 through 5
    pub position: u8,
    pub points: i32,
    #[serde(default)]
    pub label: String,
}

/// Mapping of answer positions to point values and labels
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PointScale {
    entries: BTreeMap<u8, (i32, String)>,
}

impl Default for PointScale {
    fn default() -> Self {
        let entries = [
            (1, 5, "Correct"),
            (2, 0, "Incorrect"),
            (3, 3, "Fluent"),
            (4, 2, "Partial"),
            (5, 1, "Attempted"),
        ]
        .into_iter()
        .map(|(pos, points, label)| (pos, (points, label.to_string())))
        .collect();
        Self { entries }
    }
}

impl PointScale {
    /// Build a scale from configured entries
    ///
    /// Positions must lie in `1..=5` and appear at most once.
    pub fn from_entries(entries: &[ScaleEntry]) -> Result<Self> {
        let mut map = BTreeMap::new();
        for entry in entries {
            if !(1..=POSITION_COUNT as u8).contains(&entry.position) {
                return Err(Error::Config(format!(
                    "point scale position {} is outside 1..={}",
                    entry.position, POSITION_COUNT
                )));
            }
            if map
                .insert(entry.position, (entry.points, entry.label.clone()))
                .is_some()
            {
                return Err(Error::Config(format!(
                    "point scale position {} is configured twice",
                    entry.position
                )));
            }
        }
        Ok(Self { entries: map })
    }

    pub fn entries(&self) -> Vec<ScaleEntry> {
        self.entries
            .iter()
            .map(|(position, (points, label))| ScaleEntry {
                position: *position,
                points: *points,
                label: label.clone(),
            })
            .collect()
    }

    /// Points awarded for a position; unconfigured positions award 0
    pub fn points_for(&self, position: usize) -> i32 {
        u8::try_from(position)
            .ok()
            .and_then(|p| self.entries.get(&p))
            .map(|(points, _)| *points)
            .unwrap_or(0)
    }

    pub fn label_for(&self, position: usize) -> Option<&str> {
        u8::try_from(position)
            .ok()
            .and_then(|p| self.entries.get(&p))
            .map(|(_, label)| label.as_str())
    }

    /// Highest configured point value
    pub fn max_point_value(&self) -> i32 {
        self.entries
            .values()
            .map(|(points, _)| *points)
            .max()
            .unwrap_or(DEFAULT_MAX_POINT_VALUE)
    }

    /// Legend lines (`<points> = <label>`), highest points first
    ///
    /// Positions with zero points and no label are omitted; ties keep
    /// position order.
    pub fn legend_lines(&self) -> Vec<String> {
        let mut shown: Vec<(u8, i32, &str)> = self
            .entries
            .iter()
            .filter(|(_, (points, label))| *points != 0 || !label.is_empty())
            .map(|(position, (points, label))| (*position, *points, label.as_str()))
            .collect();
        shown.sort_by(|a, b| b.1.cmp(&a.1).then(a.0.cmp(&b.0)));
        shown
            .into_iter()
            .map(|(_, points, label)| format!("{} = {}", points, label))
            .collect()
    }

    /// Recover the scale from the legend of a headed record body
    ///
    /// The legend sits after the second separator line and ends at the first
    /// blank line. Repeated point values are kept once; positions follow the
    /// legend's order. Returns `None` for headless bodies or empty legends.
    pub fn recover_from_body(body: &str) -> Option<Self> {
        if !is_headed(body) {
            return None;
        }

        let mut separators = 0;
        let mut entries: BTreeMap<u8, (i32, String)> = BTreeMap::new();
        for line in body.lines() {
            let line = line.trim();
            if line.starts_with("====") {
                separators += 1;
                continue;
            }
            if separators < 2 {
                continue;
            }
            if line.is_empty() || entries.len() == POSITION_COUNT {
                break;
            }
            let Some(caps) = LEGEND_LINE.captures(line) else {
                break;
            };
            let Ok(points) = caps[1].parse::<i32>() else {
                break;
            };
            if entries.values().any(|(p, _)| *p == points) {
                continue;
            }
            let position = entries.len() as u8 + 1;
            entries.insert(position, (points, caps[2].trim().to_string()));
        }

        if entries.is_empty() {
            None
        } else {
            Some(Self { entries })
        }
    }
}
