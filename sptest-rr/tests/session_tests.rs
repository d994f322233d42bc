//! Live session flow against a throwaway records root

use chrono::{NaiveDate, NaiveDateTime};
use sptest_common::config::TomlConfig;
use sptest_common::layout::RecordsLayout;
use sptest_common::point_scale::ScaleEntry;
use sptest_common::record::{extract_header_fields, is_headed};
use sptest_common::{PointScale, StudentKey};
use sptest_rr::session::{has_existing_record, lookup_student_name};
use sptest_rr::{Pipeline, Session, Stages};
use std::fs;
use tempfile::TempDir;

fn at(h: u32, m: u32) -> NaiveDateTime {
    NaiveDate::from_ymd_opt(2024, 3, 15)
        .unwrap()
        .and_hms_opt(h, m, 0)
        .unwrap()
}

#[test]
fn test_full_session_heads_record_and_appends_summary() {
    let root = TempDir::new().unwrap();
    let layout = RecordsLayout::new(root.path());
    let scale = PointScale::default();

    let session = Session::begin(
        &layout,
        "5A",
        StudentKey::new("3"),
        Some("Jane Doe".to_string()),
        at(9, 42),
    )
    .unwrap();
    session.record_answer(0, 1, &scale, "cat.png").unwrap();
    session.record_answer(1, 3, &scale, "dog.png").unwrap();
    session.record_answer(1, 4, &scale, "dog.png").unwrap();

    let score = session.finish(&scale, at(9, 50)).unwrap();
    assert_eq!(score.total, 7);
    assert_eq!(score.max, 10);
    assert_eq!(score.percentage, 70);
    assert_eq!(score.question_count, 2);

    let body = fs::read_to_string(session.record_path()).unwrap();
    assert!(is_headed(&body));
    let lines: Vec<&str> = body.lines().collect();
    assert_eq!(lines[0], "SpeakingTest_5A_3_2024.03.15.0942.txt");
    assert_eq!(lines[1], "Student: 03 Jane Doe");
    assert_eq!(lines[3], "Total Questions: 2   Max Score: 10   Score: 7   Percentage: 70%");
    assert!(body.ends_with(
        "Question 00: 5 = 1 0 0 0 0 cat.png\n\
         Question 01: 3 = 0 0 1 0 0 dog.png\n\
         Question 01: 2 = 0 0 0 1 0 dog.png\n"
    ));

    let summary_path = session.class_dir().join("5A_SpeakingTest.24.03.15.txt");
    let summary = fs::read_to_string(summary_path).unwrap();
    assert!(summary.starts_with("Class 5A - Speaking Test Summary\nDate: 2024-03-15\n"));
    assert!(summary
        .ends_with("24.03.15.0950:   Student 03 Jane Doe            :        7/10 =   70%\n"));
}

#[test]
fn test_finish_twice_leaves_record_alone() {
    let root = TempDir::new().unwrap();
    let layout = RecordsLayout::new(root.path());
    let scale = PointScale::default();
    let session = Session::begin(&layout, "5A", StudentKey::new("3"), None, at(9, 42)).unwrap();
    session.record_answer(0, 1, &scale, "cat.png").unwrap();

    let first = session.finish(&scale, at(9, 50)).unwrap();
    let body = fs::read_to_string(session.record_path()).unwrap();
    let second = session.finish(&scale, at(9, 55)).unwrap();

    assert_eq!(first, second);
    assert_eq!(fs::read_to_string(session.record_path()).unwrap(), body);
    assert!(session.retract_last_answer().is_err());

    let summary_path = session.class_dir().join("5A_SpeakingTest.24.03.15.txt");
    let summary = fs::read_to_string(summary_path).unwrap();
    assert_eq!(summary.lines().filter(|l| l.contains("Student 03")).count(), 1);
}

#[test]
fn test_scale_max_drives_live_score() {
    let root = TempDir::new().unwrap();
    let layout = RecordsLayout::new(root.path());
    let scale = PointScale::from_entries(&[
        ScaleEntry { position: 1, points: 4, label: "Good".into() },
        ScaleEntry { position: 2, points: 1, label: "Weak".into() },
    ])
    .unwrap();
    let session = Session::begin(&layout, "6B", StudentKey::new("12"), None, at(10, 0)).unwrap();
    session.record_answer(0, 2, &scale, "a").unwrap();
    session.record_answer(1, 2, &scale, "b").unwrap();

    let score = session.finish(&scale, at(10, 5)).unwrap();
    assert_eq!(score.total, 2);
    assert_eq!(score.max, 8);
    assert_eq!(score.percentage, 25);

    let fields = extract_header_fields(&fs::read_to_string(session.record_path()).unwrap());
    assert_eq!(fields.student_key, "12");
    assert_eq!(fields.max, 8);
}

#[test]
fn test_roster_round_trip_and_retake_warning() {
    let root = TempDir::new().unwrap();
    let layout = RecordsLayout::new(root.path());
    let session = Session::begin(
        &layout,
        "5A",
        StudentKey::new("7"),
        Some("Sam Lee".to_string()),
        at(11, 0),
    )
    .unwrap();
    session.remember_student_name().unwrap();

    assert_eq!(
        fs::read_to_string(session.class_dir().join("5A_Roster.txt")).unwrap(),
        "07 Sam Lee\n"
    );
    assert_eq!(
        lookup_student_name(&layout, "5A", &StudentKey::new("007")).as_deref(),
        Some("Sam Lee")
    );
    assert!(has_existing_record(session.class_dir(), &StudentKey::new("07")));
}

#[test]
fn test_batch_run_leaves_finished_session_alone() {
    let root = TempDir::new().unwrap();
    let layout = RecordsLayout::new(root.path());
    let scale = PointScale::default();
    let session = Session::begin(&layout, "5A", StudentKey::new("3"), None, at(9, 42)).unwrap();
    session.record_answer(0, 1, &scale, "cat.png").unwrap();
    session.finish(&scale, at(9, 50)).unwrap();
    let body = fs::read_to_string(session.record_path()).unwrap();

    let report = Pipeline::new(RecordsLayout::new(root.path()), TomlConfig::default())
        .run(Stages::PROCESS, "process")
        .unwrap();

    assert_eq!(report.totals.records_completed, 0);
    assert_eq!(report.totals.summary_entries, 1);
    assert_eq!(fs::read_to_string(session.record_path()).unwrap(), body);
}
