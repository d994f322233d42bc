//! Answer line decoding and scoring
//!
//! Answer lines have the shape
//! `Question 03: 5 = 1 0 0 0 0 slide_label`: question index, awarded points,
//! the one-hot vector of the position that was chosen, and the label of the
//! prompt that was shown.

use once_cell::sync::Lazy;
use regex::Regex;
use serde::Serialize;
use std::collections::HashMap;

/// Number of answer positions in a selection vector
pub const POSITION_COUNT: usize = 5;

/// Width of the `=` separator lines in a record header
pub const SEPARATOR_WIDTH: usize = 67;

/// Run of `=` that marks a body as headed
const HEADED_MARKER: &str = "====================";

/// Per-question point value assumed when no answers are available
pub const DEFAULT_MAX_POINT_VALUE: i32 = 5;

static ANSWER_LINE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"^Question\s+(\d+):\s+(-?\d+)\s+=\s+([01](?:\s+[01]){4})\s+(.+)$")
        .expect("answer line pattern is valid")
});

/// One recorded response
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Answer {
    pub question_index: u32,
    pub point_value: i32,
    pub selection: [u8; POSITION_COUNT],
    pub source_label: String,
}

impl Answer {
    /// Build the answer for a choice of `position` (1-based)
    ///
    /// Returns `None` when the position is outside `1..=5`.
    pub fn for_position(
        question_index: u32,
        position: usize,
        point_value: i32,
        source_label: impl Into<String>,
    ) -> Option<Self> {
        if !(1..=POSITION_COUNT).contains(&position) {
            return None;
        }
        let mut selection = [0u8; POSITION_COUNT];
        selection[position - 1] = 1;
        Some(Self {
            question_index,
            point_value,
            selection,
            source_label: source_label.into(),
        })
    }

    /// Render as a record body line (without trailing newline)
    pub fn to_line(&self) -> String {
        let selection: Vec<String> = self.selection.iter().map(|v| v.to_string()).collect();
        format!(
            "Question {:02}: {} = {} {}",
            self.question_index,
            self.point_value,
            selection.join(" "),
            self.source_label
        )
    }

    fn parse_line(line: &str) -> Option<Self> {
        let caps = ANSWER_LINE.captures(line.trim())?;
        let question_index = caps[1].parse().ok()?;
        let point_value = caps[2].parse().ok()?;

        let mut selection = [0u8; POSITION_COUNT];
        for (slot, token) in selection.iter_mut().zip(caps[3].split_whitespace()) {
            *slot = if token == "1" { 1 } else { 0 };
        }

        Some(Self {
            question_index,
            point_value,
            selection,
            source_label: caps[4].trim().to_string(),
        })
    }
}

/// True when the body already carries a summary header
pub fn is_headed(body: &str) -> bool {
    body.contains(HEADED_MARKER) || body.contains("Total Questions:") || body.contains("Student:")
}

/// Decode every well-formed answer line of a headless body, in order
///
/// Lines of any other shape (blank lines, partial writes) are skipped.
/// Headed bodies decode to nothing; their summary is read with
/// [`extract_header_fields`](super::header::extract_header_fields) instead.
pub fn decode_answers(body: &str) -> Vec<Answer> {
    if is_headed(body) {
        return Vec::new();
    }
    body.lines().filter_map(Answer::parse_line).collect()
}

/// Score of a record
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize)]
pub struct ScoreSummary {
    pub total: i64,
    pub max: i64,
    pub percentage: i64,
    pub question_count: usize,
}

/// Reduce to the last answer per question index, keeping first-seen order
fn last_answer_per_question(answers: &[Answer]) -> Vec<&Answer> {
    let mut order: Vec<u32> = Vec::new();
    let mut latest: HashMap<u32, &Answer> = HashMap::new();
    for answer in answers {
        if latest.insert(answer.question_index, answer).is_none() {
            order.push(answer.question_index);
        }
    }
    order.iter().filter_map(|q| latest.get(q).copied()).collect()
}

/// Score answers using the largest point value observed as the per-question maximum
///
/// Only the last answer for each question index counts. The scale is assumed
/// uniform across questions; mixed scales are not corrected for.
pub fn compute_score(answers: &[Answer]) -> ScoreSummary {
    let reduced = last_answer_per_question(answers);
    let max_point_value = reduced
        .iter()
        .map(|a| a.point_value)
        .max()
        .unwrap_or(DEFAULT_MAX_POINT_VALUE);
    summarize(&reduced, max_point_value)
}

/// Score answers against a known per-question maximum (the live session's scale)
pub fn compute_score_against(answers: &[Answer], max_point_value: i32) -> ScoreSummary {
    let reduced = last_answer_per_question(answers);
    summarize(&reduced, max_point_value)
}

fn summarize(reduced: &[&Answer], max_point_value: i32) -> ScoreSummary {
    let question_count = reduced.len();
    let total: i64 = reduced.iter().map(|a| i64::from(a.point_value)).sum();
    let max = question_count as i64 * i64::from(max_point_value);
    let percentage = if max != 0 {
        (total as f64 / max as f64 * 100.0).round_ties_even() as i64
    } else {
        0
    };

    ScoreSummary {
        total,
        max,
        percentage,
        question_count,
    }
}
