//! Record header synthesis and extraction
//!
//! A headed record starts with:
//!
//! ```text
//! SpeakingTest_5A_03_2024.03.15.0942.txt
//! Student: 03 Jane Doe
//! ===================================================================
//! Total Questions: 10   Max Score: 50   Score: 41   Percentage: 82%
//! ===================================================================
//! 5 = Correct
//! 3 = Fluent
//!
//! Question 00: 5 = 1 0 0 0 0 intro
//! ```

use super::answers::{is_headed, ScoreSummary, SEPARATOR_WIDTH};
use super::StudentKey;
use crate::point_scale::PointScale;
use once_cell::sync::Lazy;
use regex::Regex;
use serde::Serialize;

static SCORE_FIELD: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"(Max )?Score:\s*(-?\d+)").expect("score field pattern is valid"));
static QUESTIONS_FIELD: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"Total Questions:\s*(\d+)").expect("question count pattern is valid")
});
static PERCENTAGE_FIELD: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"Percentage:\s*(-?\d+)%").expect("percentage pattern is valid"));

pub fn separator_line() -> String {
    "=".repeat(SEPARATOR_WIDTH)
}

/// Build the summary header for a record
pub fn synthesize_header(
    record_name: &str,
    student_key: &StudentKey,
    student_name: Option<&str>,
    score: &ScoreSummary,
    scale: &PointScale,
) -> String {
    let separator = separator_line();
    let mut header = String::new();

    header.push_str(record_name);
    header.push('\n');

    header.push_str("Student: ");
    header.push_str(&student_key.padded());
    if let Some(name) = student_name.filter(|n| !n.is_empty()) {
        header.push(' ');
        header.push_str(name);
    }
    header.push('\n');

    header.push_str(&separator);
    header.push('\n');
    header.push_str(&format!(
        "Total Questions: {}   Max Score: {}   Score: {}   Percentage: {}%\n",
        score.question_count, score.max, score.total, score.percentage
    ));
    header.push_str(&separator);
    header.push('\n');

    for line in scale.legend_lines() {
        header.push_str(&line);
        header.push('\n');
    }
    header.push('\n');

    header
}

/// Prefix a headless body with its header
///
/// Must be applied once per record; callers check [`is_headed`] first.
pub fn apply_header(header: &str, body: &str) -> String {
    debug_assert!(!is_headed(body), "header applied to an already headed body");
    let mut headed = String::with_capacity(header.len() + body.len());
    headed.push_str(header);
    headed.push_str(body);
    headed
}

/// Summary fields read back from a headed record
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize)]
pub struct HeaderFields {
    pub student_key: String,
    pub student_name: String,
    pub total: i64,
    pub max: i64,
    pub percentage: i64,
    pub question_count: usize,
}

/// Read the header fields of a headed body
///
/// Best effort: a field that cannot be found keeps its zero/empty default.
pub fn extract_header_fields(body: &str) -> HeaderFields {
    let mut fields = HeaderFields::default();
    let mut seen_student = false;
    let mut seen_summary = false;

    for line in body.lines() {
        if !seen_student && line.starts_with("Student:") {
            seen_student = true;
            let rest = line["Student:".len()..].trim();
            match rest.split_once(' ') {
                Some((key, name)) => {
                    fields.student_key = key.to_string();
                    fields.student_name = name.to_string();
                }
                None => fields.student_key = rest.to_string(),
            }
        } else if !seen_summary && line.contains("Total Questions:") && line.contains("Score:") {
            seen_summary = true;
            for caps in SCORE_FIELD.captures_iter(line) {
                let Ok(value) = caps[2].parse::<i64>() else {
                    continue;
                };
                if caps.get(1).is_some() {
                    fields.max = value;
                } else {
                    fields.total = value;
                }
            }
            if let Some(caps) = QUESTIONS_FIELD.captures(line) {
                fields.question_count = caps[1].parse().unwrap_or(0);
            }
            if let Some(caps) = PERCENTAGE_FIELD.captures(line) {
                fields.percentage = caps[1].parse().unwrap_or(0);
            }
        }

        if seen_student && seen_summary {
            break;
        }
    }

    fields
}
