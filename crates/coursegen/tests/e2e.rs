//! End-to-end tests for the coursegen ingestion pipeline.
//!
//! Adding a case:
//! 1. Put a file in `tests/fixtures/inputs/`
//! 2. Add an entry to `TEST_CASES` with the course it should produce

mod common;

use std::path::{Path, PathBuf};

use coursegen::db::course_repo;
use coursegen::{JobStatus, SourceInput, Stage};

use common::TestHarness;

/// Expected course for a fixture. `None` counts mean the run must fail at parsing.
struct TestCase {
    name: &'static str,
    input_file: &'static str,
    expected_title: &'static str,
    expected_modules: Option<usize>,
    expected_lessons: Option<usize>,
    expected_tasks: Option<usize>,
}

const TEST_CASES: &[TestCase] = &[
    TestCase {
        name: "two_module_outline",
        input_file: "rust-basics.md",
        expected_title: "Rust Basics",
        expected_modules: Some(2),
        expected_lessons: Some(3),
        expected_tasks: Some(3),
    },
    TestCase {
        name: "plain_text_notes",
        input_file: "closures.txt",
        expected_title: "Untitled course",
        expected_modules: Some(1),
        expected_lessons: Some(1),
        expected_tasks: Some(1),
    },
    TestCase {
        name: "headings_inside_code_fences",
        input_file: "code-fences.md",
        expected_title: "Macros",
        expected_modules: Some(1),
        expected_lessons: Some(1),
        expected_tasks: Some(1),
    },
    TestCase {
        name: "lessons_without_module",
        input_file: "preamble.md",
        expected_title: "Untitled course",
        expected_modules: Some(1),
        expected_lessons: Some(3),
        expected_tasks: Some(3),
    },
    TestCase {
        name: "whitespace_only",
        input_file: "whitespace.txt",
        expected_title: "",
        expected_modules: None,
        expected_lessons: None,
        expected_tasks: None,
    },
];

fn get_fixture_path(relative: &str) -> PathBuf {
    Path::new(env!("CARGO_MANIFEST_DIR"))
        .join("tests")
        .join("fixtures")
        .join(relative)
}

async fn run_test_case(test_case: &TestCase) {
    let harness = TestHarness::new();
    let path = get_fixture_path(&format!("inputs/{}", test_case.input_file));
    let content = std::fs::read(&path).expect("Failed to read fixture");
    let source = SourceInput::from_upload(test_case.input_file, content)
        .unwrap_or_else(|e| panic!("Test '{}': {}", test_case.name, e));

    let outcome = harness
        .orchestrator
        .submit(source, &harness.options())
        .await
        .expect("submit failed");

    let Some(expected_modules) = test_case.expected_modules else {
        let error = outcome.error.expect("expected a stage failure");
        assert_eq!(error.stage, Stage::Parse, "Test '{}'", test_case.name);
        assert_eq!(outcome.metadata.status, JobStatus::Error);
        return;
    };

    assert!(
        outcome.success,
        "Test '{}': pipeline failed: {:?}",
        test_case.name, outcome.error
    );
    let course_id = outcome.metadata.course_id.expect("course id");
    let summary = course_repo::course_summary(&harness.db, &course_id)
        .unwrap()
        .expect("course row");

    assert_eq!(
        summary.title, test_case.expected_title,
        "Test '{}': title",
        test_case.name
    );
    assert_eq!(
        Some(summary.module_count),
        Some(expected_modules),
        "Test '{}': modules",
        test_case.name
    );
    assert_eq!(
        Some(summary.lesson_count),
        test_case.expected_lessons,
        "Test '{}': lessons",
        test_case.name
    );
    assert_eq!(
        Some(summary.task_count),
        test_case.expected_tasks,
        "Test '{}': tasks",
        test_case.name
    );
}

#[tokio::test]
async fn test_two_module_outline() {
    run_test_case(&TEST_CASES[0]).await;
}

#[tokio::test]
async fn test_plain_text_notes() {
    run_test_case(&TEST_CASES[1]).await;
}

#[tokio::test]
async fn test_headings_inside_code_fences() {
    run_test_case(&TEST_CASES[2]).await;
}

#[tokio::test]
async fn test_lessons_without_module() {
    run_test_case(&TEST_CASES[3]).await;
}

#[tokio::test]
async fn test_whitespace_only() {
    run_test_case(&TEST_CASES[4]).await;
}

#[tokio::test]
async fn test_topic_source() {
    let harness = TestHarness::new();
    let outcome = harness
        .orchestrator
        .submit(SourceInput::topic("Async Rust"), &harness.options())
        .await
        .unwrap();

    assert!(outcome.success, "pipeline failed: {:?}", outcome.error);
    let preview = outcome.preview.expect("preview");
    assert_eq!(preview.title, "Async Rust");
    assert!(preview.lesson_count >= 1);
}
