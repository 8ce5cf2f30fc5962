// Copyright (c) The testwire Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

use crate::host::{HostRunStatus, HostTestStatus, SuiteKind, TestError};
use testwire_metadata::{SuiteType, TestStatus};

/// Maps the status of a test execution.
///
/// A timed-out test is reported as failed.
pub fn map_test_status(status: HostTestStatus) -> TestStatus {
    match status {
        HostTestStatus::Passed => TestStatus::Passed,
        HostTestStatus::Failed | HostTestStatus::TimedOut => TestStatus::Failed,
        HostTestStatus::Skipped => TestStatus::Skipped,
        HostTestStatus::Unrecognized => TestStatus::Unknown,
    }
}

/// Maps the final status of a run.
pub fn map_run_status(status: HostRunStatus) -> TestStatus {
    match status {
        HostRunStatus::Passed => TestStatus::Passed,
        HostRunStatus::Failed => TestStatus::Failed,
        HostRunStatus::TimedOut => TestStatus::TimedOut,
        HostRunStatus::Interrupted => TestStatus::Interrupted,
        HostRunStatus::Unrecognized => TestStatus::Unknown,
    }
}

/// Maps the status of a finished step: failed if it carries an error, passed otherwise.
pub fn map_step_status(error: Option<&TestError>) -> TestStatus {
    if error.is_some() {
        TestStatus::Failed
    } else {
        TestStatus::Passed
    }
}

/// Computes the status of a finished suite from the final statuses of every test beneath it.
///
/// If no test beneath the suite reported a status, the suite takes the status of the run.
pub fn aggregate_suite_status(
    statuses: impl IntoIterator<Item = TestStatus>,
    run_status: HostRunStatus,
) -> TestStatus {
    let mut any_reported = false;
    let mut any_passed = false;
    let mut all_skipped = true;

    for status in statuses {
        any_reported = true;
        if status.is_failure() {
            return TestStatus::Failed;
        }
        any_passed |= status == TestStatus::Passed;
        all_skipped &= status == TestStatus::Skipped;
    }

    if !any_reported {
        map_run_status(run_status)
    } else if all_skipped {
        TestStatus::Skipped
    } else if any_passed {
        TestStatus::Passed
    } else {
        TestStatus::Unknown
    }
}

/// Maps the kind of a suite.
pub fn map_suite_type(kind: SuiteKind) -> SuiteType {
    match kind {
        SuiteKind::Root => SuiteType::Root,
        SuiteKind::Project => SuiteType::Project,
        SuiteKind::File => SuiteType::File,
        SuiteKind::Describe => SuiteType::Group,
    }
}
