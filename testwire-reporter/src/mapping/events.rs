// Copyright (c) The testwire Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

use super::{
    SuiteVisit, add_annotation_metadata, encode_duration, encode_timestamp, extract_attachments,
    extract_errors, map_run_status, map_step_status, map_suite_type, map_test_status,
    sanitize_run_duration, sanitize_run_start,
};
use crate::{
    errors::{InvalidTimeError, MapEventError},
    host::{FullResult, HostRunStatus, RunConfig, Suite, TestCase, TestError, TestResult, TestStep},
    ids::IdDeriver,
};
use itertools::Itertools;
use std::slice;
use testwire_metadata::{
    Duration, MapTestRunEventRequest, Metadata, StdErrorEventRequest, StdErrorKind,
    StepBeginEventRequest, StepEndEventRequest, StepRun, SuiteBeginEventRequest,
    SuiteEndEventRequest, SuiteType, TestBeginEventRequest, TestCaseRun, TestCaseSummary,
    TestEndEventRequest, TestFailureEventRequest, TestRunEndEventRequest, TestStatus,
    TestSuiteRun, Timestamp,
};

/// The name used for a suite without a title.
const ROOT_SUITE_NAME: &str = "root";

/// Builds the run-begin message: the whole suite tree, parents before children.
pub fn map_run_begin(
    ids: &mut IdDeriver,
    start_ms: f64,
    config: &RunConfig,
    suites: &[SuiteVisit<'_>],
    root: &Suite,
) -> Result<MapTestRunEventRequest, MapEventError> {
    let start_time = encode_timestamp(start_ms).map_err(invalid("run-begin", "start time"))?;

    let mut metadata = Metadata::new();
    metadata.insert("workers".to_owned(), config.workers.to_string());
    metadata.insert("projects".to_owned(), config.projects.iter().join(","));
    if let Some(version) = &config.version {
        metadata.insert("host_version".to_owned(), version.clone());
    }
    if let Some(root_dir) = &config.root_dir {
        metadata.insert("root_dir".to_owned(), root_dir.to_string());
    }

    let suites = suites
        .iter()
        .map(|visit| suite_run(ids, visit))
        .collect();

    Ok(MapTestRunEventRequest {
        run_id: ids.run_id().to_string(),
        start_time,
        total_tests: root.test_count() as u64,
        metadata,
        suites,
    })
}

/// Builds the suite-begin message for a suite. Suites start with the run.
pub fn map_suite_begin(
    ids: &mut IdDeriver,
    visit: &SuiteVisit<'_>,
    run_start: Timestamp,
) -> SuiteBeginEventRequest {
    let mut suite = suite_run(ids, visit);
    suite.start_time = Some(run_start);
    suite.status = TestStatus::Running;
    SuiteBeginEventRequest { suite }
}

/// Timing and outcome shared by every suite-end message of a run.
#[derive(Clone, Debug)]
pub struct SuiteEndTiming {
    /// When the run started.
    pub start_time: Timestamp,
    /// When the run ended.
    pub end_time: Timestamp,
    /// How long the run took.
    pub duration: Duration,
    /// The final status of the run.
    pub final_result: HostRunStatus,
}

/// Builds the suite-end message for a suite whose aggregated status is `status`.
pub fn map_suite_end(
    ids: &mut IdDeriver,
    visit: &SuiteVisit<'_>,
    timing: &SuiteEndTiming,
    status: TestStatus,
) -> SuiteEndEventRequest {
    let mut suite = suite_run(ids, visit);
    suite.start_time = Some(timing.start_time);
    suite.end_time = Some(timing.end_time);
    suite.duration = Some(timing.duration);
    suite.status = status;
    suite
        .metadata
        .insert("final_result".to_owned(), timing.final_result.to_string());
    SuiteEndEventRequest { suite }
}

/// Builds the test-begin message.
pub fn map_test_begin(
    run_id: &str,
    suite_id: &str,
    test: &TestCase,
    result: &TestResult,
) -> Result<TestBeginEventRequest, MapEventError> {
    let mut test_case = test_case_run(run_id, suite_id, test, result, "test-begin")?;
    test_case.status = TestStatus::Running;
    Ok(TestBeginEventRequest { test_case })
}

/// Builds the test-end message, including errors, attachments and result annotations.
pub fn map_test_end(
    run_id: &str,
    suite_id: &str,
    test: &TestCase,
    result: &TestResult,
) -> Result<TestEndEventRequest, MapEventError> {
    let mut test_case = test_case_run(run_id, suite_id, test, result, "test-end")?;
    test_case.status = map_test_status(result.status);
    test_case.duration =
        Some(encode_duration(result.duration).map_err(invalid("test-end", "duration"))?);
    add_annotation_metadata(
        &mut test_case.metadata,
        "result_annotation",
        &result.annotations,
    );

    let errors = extract_errors(&result.errors);
    test_case.error_message = errors.message;
    test_case.stack_trace = errors.stack_trace;
    test_case.errors = errors.messages;
    test_case.attachments = extract_attachments(&result.attachments);

    Ok(TestEndEventRequest { test_case })
}

/// Builds the test-failure message.
pub fn map_test_failure(
    run_id: &str,
    test: &TestCase,
    result: &TestResult,
    now_ms: f64,
) -> Result<TestFailureEventRequest, MapEventError> {
    let errors = extract_errors(&result.errors);
    Ok(TestFailureEventRequest {
        test_id: test.id.clone(),
        run_id: run_id.to_owned(),
        failure_message: errors.message,
        stack_trace: errors.stack_trace,
        timestamp: encode_timestamp(now_ms).map_err(invalid("test-fail", "timestamp"))?,
        attachments: extract_attachments(&result.attachments),
    })
}

/// Identifiers of a step and its enclosing step.
#[derive(Clone, Debug)]
pub struct StepIds {
    /// The step's own identifier.
    pub step_id: String,
    /// The identifier of the enclosing step, if the step is nested.
    pub parent_step_id: Option<String>,
}

/// Builds the step-begin message.
pub fn map_step_begin(
    run_id: &str,
    ids: StepIds,
    test: &TestCase,
    result: &TestResult,
    step: &TestStep,
) -> Result<StepBeginEventRequest, MapEventError> {
    let mut step = step_run(run_id, ids, test, result, step, "step-begin")?;
    step.status = TestStatus::Running;
    Ok(StepBeginEventRequest { step })
}

/// Builds the step-end message.
///
/// A step without a duration is treated as instantaneous.
pub fn map_step_end(
    run_id: &str,
    ids: StepIds,
    test: &TestCase,
    result: &TestResult,
    step: &TestStep,
) -> Result<StepEndEventRequest, MapEventError> {
    let duration = encode_duration(step.duration.unwrap_or_default())
        .map_err(invalid("step-end", "duration"))?;

    let mut step_run = step_run(run_id, ids, test, result, step, "step-end")?;
    step_run.status = map_step_status(step.error.as_ref());
    step_run.duration = Some(duration);
    if let Some(error) = &step.error {
        let errors = extract_errors(slice::from_ref(error));
        step_run.error = errors.message;
        step_run.errors = errors.messages;
    }
    Ok(StepEndEventRequest { step: step_run })
}

/// Builds the run-end message.
///
/// The host's start time and duration are sanitized rather than validated: a run always reports
/// its end. A missing or invalid start time is replaced by `fallback_start_ms`, and a missing or
/// invalid duration by zero.
pub fn map_run_end(
    run_id: &str,
    result: &FullResult,
    fallback_start_ms: f64,
) -> TestRunEndEventRequest {
    TestRunEndEventRequest {
        run_id: run_id.to_owned(),
        final_status: map_run_status(result.status),
        start_time: sanitize_run_start(result.start_time, fallback_start_ms),
        duration: sanitize_run_duration(result.duration),
    }
}

/// Builds the message for an error the host reported outside of any test.
pub fn map_host_error(
    run_id: &str,
    error: &TestError,
    now_ms: f64,
) -> Result<StdErrorEventRequest, MapEventError> {
    Ok(StdErrorEventRequest {
        run_id: run_id.to_owned(),
        kind: StdErrorKind::Error,
        message: error.message.clone().unwrap_or_default(),
        stack_trace: error.stack.clone().unwrap_or_default(),
        test_id: None,
        timestamp: encode_timestamp(now_ms).map_err(invalid("error", "timestamp"))?,
    })
}

/// Builds the message for a chunk written to standard error.
pub fn map_std_err(
    run_id: &str,
    chunk: &str,
    test: Option<&TestCase>,
    now_ms: f64,
) -> Result<StdErrorEventRequest, MapEventError> {
    Ok(StdErrorEventRequest {
        run_id: run_id.to_owned(),
        kind: StdErrorKind::Stderr,
        message: chunk.to_owned(),
        stack_trace: String::new(),
        test_id: test.map(|test| test.id.clone()),
        timestamp: encode_timestamp(now_ms).map_err(invalid("stderr", "timestamp"))?,
    })
}

fn suite_run(ids: &mut IdDeriver, visit: &SuiteVisit<'_>) -> TestSuiteRun {
    let suite = visit.suite;
    let suite_type = map_suite_type(suite.kind);

    let name = if suite.title.is_empty() && visit.depth == 0 {
        ROOT_SUITE_NAME.to_owned()
    } else {
        suite.title.clone()
    };

    let mut metadata = Metadata::new();
    metadata.insert("suite_type".to_owned(), suite_type_name(suite_type).to_owned());

    TestSuiteRun {
        id: ids.suite_id(&visit.path),
        name,
        run_id: ids.run_id().to_string(),
        parent_suite_id: visit.parent_path.as_ref().map(|path| ids.suite_id(path)),
        suite_type,
        location: suite.location.as_ref().map(ToString::to_string),
        start_time: None,
        end_time: None,
        duration: None,
        status: TestStatus::Unknown,
        metadata,
        test_cases: suite
            .tests
            .iter()
            .map(|test| TestCaseSummary {
                id: test.id.clone(),
                name: test.title.clone(),
            })
            .collect(),
    }
}

fn suite_type_name(suite_type: SuiteType) -> &'static str {
    match suite_type {
        SuiteType::Unspecified => "unspecified",
        SuiteType::Root => "root",
        SuiteType::Project => "project",
        SuiteType::File => "file",
        SuiteType::Group => "group",
    }
}

fn test_case_run(
    run_id: &str,
    suite_id: &str,
    test: &TestCase,
    result: &TestResult,
    event: &'static str,
) -> Result<TestCaseRun, MapEventError> {
    let start_time = encode_timestamp(result.start_time).map_err(invalid(event, "start time"))?;

    let mut metadata = Metadata::new();
    add_annotation_metadata(&mut metadata, "annotation", &test.annotations);

    Ok(TestCaseRun {
        id: test.id.clone(),
        name: test.title.clone(),
        run_id: run_id.to_owned(),
        suite_id: suite_id.to_owned(),
        status: TestStatus::Unknown,
        start_time: Some(start_time),
        duration: None,
        tags: test.tags.clone(),
        metadata,
        location: test.location.as_ref().map(ToString::to_string),
        retry_index: result.retry,
        retry_count: test.retries,
        worker_index: result.worker_index,
        attachments: Vec::new(),
        error_message: String::new(),
        stack_trace: String::new(),
        errors: Vec::new(),
    })
}

fn step_run(
    run_id: &str,
    ids: StepIds,
    test: &TestCase,
    result: &TestResult,
    step: &TestStep,
    event: &'static str,
) -> Result<StepRun, MapEventError> {
    let start_time = encode_timestamp(step.start_time).map_err(invalid(event, "start time"))?;

    let mut metadata = Metadata::new();
    metadata.insert("category".to_owned(), step.category.clone());
    add_annotation_metadata(&mut metadata, "annotation", &step.annotations);

    Ok(StepRun {
        id: ids.step_id,
        run_id: run_id.to_owned(),
        test_case_id: test.id.clone(),
        parent_step_id: ids.parent_step_id,
        title: step.title().to_owned(),
        category: step.category.clone(),
        status: TestStatus::Unknown,
        start_time: Some(start_time),
        duration: None,
        error: String::new(),
        errors: Vec::new(),
        location: step.location.as_ref().map(ToString::to_string),
        metadata,
        worker_index: result.worker_index,
    })
}

fn invalid(
    event: &'static str,
    field: &'static str,
) -> impl FnOnce(InvalidTimeError) -> MapEventError {
    move |err| MapEventError::new(event, field, err)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{
        host::{Annotation, HostTestStatus, TitlePath},
        ids::{IdStrategy, RunId},
        mapping::walk_pre_order,
        test_helpers::{sample_result, sample_step, sample_tree},
    };
    use pretty_assertions::assert_eq;

    fn deriver() -> IdDeriver {
        IdDeriver::new(IdStrategy::Readable, RunId::resolve(Some("run")))
    }

    #[test]
    fn run_begin_lists_suites_parents_first() {
        let root = sample_tree();
        let mut ids = deriver();
        let visits = walk_pre_order(&root);
        let config = RunConfig {
            workers: 4,
            version: Some("1.50.0".to_owned()),
            projects: vec!["chromium".to_owned()],
            root_dir: None,
        };

        let request = map_run_begin(&mut ids, 1500.0, &config, &visits, &root).unwrap();
        assert_eq!(request.run_id, "run");
        assert_eq!(request.total_tests, 3);
        assert_eq!(request.start_time, Timestamp { seconds: 1, nanos: 500_000_000 });
        assert_eq!(request.metadata["workers"], "4");
        assert_eq!(request.metadata["host_version"], "1.50.0");
        assert!(!request.metadata.contains_key("root_dir"));

        let names: Vec<_> = request.suites.iter().map(|s| s.name.as_str()).collect();
        assert_eq!(names, ["root", "chromium", "auth.spec.ts", "session", "cart.spec.ts"]);
        assert_eq!(request.suites[0].parent_suite_id, None);
        assert_eq!(request.suites[0].suite_type, SuiteType::Root);
        for suite in &request.suites[1..] {
            let parent = suite.parent_suite_id.as_deref().expect("non-root has parent");
            let parent_index = request.suites.iter().position(|s| s.id == parent).unwrap();
            let index = request.suites.iter().position(|s| s.id == suite.id).unwrap();
            assert!(parent_index < index);
        }
        assert_eq!(request.suites[3].suite_type, SuiteType::Group);
        assert_eq!(request.suites[3].metadata["suite_type"], "group");
        assert_eq!(request.suites[2].test_cases.len(), 1);
    }

    #[test]
    fn run_begin_rejects_invalid_start() {
        let root = sample_tree();
        let mut ids = deriver();
        let visits = walk_pre_order(&root);
        let error =
            map_run_begin(&mut ids, f64::NAN, &RunConfig::default(), &visits, &root).unwrap_err();
        assert_eq!(error.event(), "run-begin");
        assert_eq!(error.field(), "start time");
    }

    #[test]
    fn suite_end_carries_timing_and_final_result() {
        let root = sample_tree();
        let mut ids = deriver();
        let visits = walk_pre_order(&root);
        let timing = SuiteEndTiming {
            start_time: Timestamp { seconds: 1, nanos: 0 },
            end_time: Timestamp { seconds: 3, nanos: 0 },
            duration: Duration { seconds: 2, nanos: 0 },
            final_result: HostRunStatus::Failed,
        };

        let request = map_suite_end(&mut ids, &visits[2], &timing, TestStatus::Failed);
        assert_eq!(request.suite.status, TestStatus::Failed);
        assert_eq!(request.suite.end_time, Some(timing.end_time));
        assert_eq!(request.suite.metadata["final_result"], "failed");
        assert_eq!(request.suite.metadata["suite_type"], "file");
        assert_eq!(
            request.suite.id,
            ids.suite_id(&TitlePath::new(["", "chromium", "auth.spec.ts"]))
        );
    }

    #[test]
    fn test_end_folds_in_result_annotations_and_errors() {
        let root = sample_tree();
        let mut test = root.all_tests()[0].clone();
        test.annotations = vec![Annotation {
            kind: "issue".to_owned(),
            description: Some("#1".to_owned()),
        }];
        let mut result = sample_result(HostTestStatus::TimedOut);
        result.duration = 250.0;
        result.annotations = vec![Annotation {
            kind: "flaky".to_owned(),
            description: None,
        }];
        result.errors = vec![
            TestError {
                message: Some("expected 1".to_owned()),
                stack: Some("at auth.spec.ts:1".to_owned()),
            },
            TestError {
                message: Some("expected 2".to_owned()),
                stack: None,
            },
        ];

        let request = map_test_end("run", "suite-1", &test, &result).unwrap();
        let test_case = request.test_case;
        assert_eq!(test_case.status, TestStatus::Failed);
        assert_eq!(test_case.suite_id, "suite-1");
        assert_eq!(test_case.duration, Some(Duration { seconds: 0, nanos: 250_000_000 }));
        assert_eq!(test_case.error_message, "expected 1\nexpected 2");
        assert_eq!(test_case.stack_trace, "at auth.spec.ts:1\n");
        assert_eq!(test_case.errors, ["expected 1", "expected 2"]);
        let keys: Vec<_> = test_case.metadata.keys().map(String::as_str).collect();
        assert_eq!(
            keys,
            [
                "annotation_0_type",
                "annotation_0_description",
                "result_annotation_0_type",
            ]
        );
    }

    #[test]
    fn test_begin_is_running() {
        let root = sample_tree();
        let test = root.all_tests()[0];
        let request =
            map_test_begin("run", "suite-1", test, &sample_result(HostTestStatus::Passed))
                .unwrap();
        assert_eq!(request.test_case.status, TestStatus::Running);
        assert_eq!(request.test_case.duration, None);
        assert_eq!(request.test_case.location.as_deref(), Some("auth.spec.ts:3:5"));
    }

    #[test]
    fn test_end_rejects_negative_duration() {
        let root = sample_tree();
        let test = root.all_tests()[0];
        let mut result = sample_result(HostTestStatus::Passed);
        result.duration = -1.0;
        let error = map_test_end("run", "suite-1", test, &result).unwrap_err();
        assert_eq!(error.field(), "duration");
    }

    #[test]
    fn step_end_status_and_metadata() {
        let root = sample_tree();
        let test = root.all_tests()[0];
        let result = sample_result(HostTestStatus::Failed);
        let mut step = sample_step(&["outer", "inner"]);
        step.duration = Some(12.0);
        step.error = Some(TestError {
            message: Some("boom".to_owned()),
            stack: None,
        });
        let ids = StepIds {
            step_id: "s2".to_owned(),
            parent_step_id: Some("s1".to_owned()),
        };

        let request = map_step_end("run", ids, test, &result, &step).unwrap();
        let step_run = request.step;
        assert_eq!(step_run.status, TestStatus::Failed);
        assert_eq!(step_run.title, "inner");
        assert_eq!(step_run.parent_step_id.as_deref(), Some("s1"));
        assert_eq!(step_run.error, "boom");
        assert_eq!(step_run.errors, ["boom"]);
        assert_eq!(step_run.metadata["category"], "test.step");
        assert_eq!(step_run.duration, Some(Duration { seconds: 0, nanos: 12_000_000 }));
    }

    #[test]
    fn run_end_sanitizes_host_garbage() {
        let result = FullResult {
            status: HostRunStatus::Interrupted,
            start_time: Some(f64::NAN),
            duration: Some(-5.0),
        };
        let request = map_run_end("run", &result, 3000.0);
        assert_eq!(
            request,
            TestRunEndEventRequest {
                run_id: "run".to_owned(),
                final_status: TestStatus::Interrupted,
                start_time: Timestamp { seconds: 3, nanos: 0 },
                duration: Duration::ZERO,
            }
        );
    }

    #[test]
    fn std_err_references_test() {
        let root = sample_tree();
        let test = root.all_tests()[1];
        let request = map_std_err("run", "warning\n", Some(test), 1000.0).unwrap();
        assert_eq!(request.kind, StdErrorKind::Stderr);
        assert_eq!(request.test_id.as_deref(), Some("t-logout"));
        assert_eq!(request.message, "warning\n");
    }
}
