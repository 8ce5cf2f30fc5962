// Copyright (c) The testwire Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

use super::{FullResult, RunConfig, Suite, TestCase, TestError, TestResult, TestStep};
use crate::reporter::Reporter;
use serde::{Deserialize, Serialize};

/// One host callback, in a form that can be recorded and replayed.
///
/// Serialized as an object with an `event` tag, one object per line in a recorded stream.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(tag = "event", rename_all = "kebab-case")]
pub enum HostEvent {
    /// The run started.
    RunBegin {
        /// The configuration the host is running with.
        #[serde(default)]
        config: RunConfig,
        /// The root of the test tree.
        suite: Suite,
    },

    /// The run finished.
    RunEnd {
        /// The final result.
        result: FullResult,
    },

    /// A test execution started.
    TestBegin {
        /// The test.
        test: TestCase,
        /// The execution, as known so far.
        result: TestResult,
    },

    /// A test execution finished.
    TestEnd {
        /// The test.
        test: TestCase,
        /// The finished execution.
        result: TestResult,
    },

    /// A test execution failed.
    TestFail {
        /// The test.
        test: TestCase,
        /// The failed execution.
        result: TestResult,
    },

    /// A step started.
    StepBegin {
        /// The test the step belongs to.
        test: TestCase,
        /// The execution the step belongs to.
        result: TestResult,
        /// The step.
        step: TestStep,
    },

    /// A step finished.
    StepEnd {
        /// The test the step belongs to.
        test: TestCase,
        /// The execution the step belongs to.
        result: TestResult,
        /// The finished step.
        step: TestStep,
    },

    /// The host hit an error outside of any test.
    Error {
        /// The error.
        error: TestError,
    },

    /// A chunk was written to standard output.
    Stdout {
        /// The output.
        chunk: String,
        /// The test that wrote it, if known.
        #[serde(default, skip_serializing_if = "Option::is_none")]
        test: Option<TestCase>,
        /// The execution that wrote it, if known.
        #[serde(default, skip_serializing_if = "Option::is_none")]
        result: Option<TestResult>,
    },

    /// A chunk was written to standard error.
    Stderr {
        /// The output.
        chunk: String,
        /// The test that wrote it, if known.
        #[serde(default, skip_serializing_if = "Option::is_none")]
        test: Option<TestCase>,
        /// The execution that wrote it, if known.
        #[serde(default, skip_serializing_if = "Option::is_none")]
        result: Option<TestResult>,
    },

    /// The host process is about to exit.
    Exit,
}

impl HostEvent {
    /// Returns the name of this event, as used in the `event` tag.
    pub fn name(&self) -> &'static str {
        match self {
            Self::RunBegin { .. } => "run-begin",
            Self::RunEnd { .. } => "run-end",
            Self::TestBegin { .. } => "test-begin",
            Self::TestEnd { .. } => "test-end",
            Self::TestFail { .. } => "test-fail",
            Self::StepBegin { .. } => "step-begin",
            Self::StepEnd { .. } => "step-end",
            Self::Error { .. } => "error",
            Self::Stdout { .. } => "stdout",
            Self::Stderr { .. } => "stderr",
            Self::Exit => "exit",
        }
    }

    /// Delivers this event to a reporter through the matching callback.
    pub async fn deliver<R: Reporter>(&self, reporter: &mut R) {
        match self {
            Self::RunBegin { config, suite } => reporter.on_begin(config, suite),
            Self::RunEnd { result } => reporter.on_end(result),
            Self::TestBegin { test, result } => reporter.on_test_begin(test, result),
            Self::TestEnd { test, result } => reporter.on_test_end(test, result),
            Self::TestFail { test, result } => reporter.on_test_fail(test, result),
            Self::StepBegin { test, result, step } => reporter.on_step_begin(test, result, step),
            Self::StepEnd { test, result, step } => reporter.on_step_end(test, result, step),
            Self::Error { error } => reporter.on_error(error),
            Self::Stdout {
                chunk,
                test,
                result,
            } => reporter.on_std_out(chunk, test.as_ref(), result.as_ref()),
            Self::Stderr {
                chunk,
                test,
                result,
            } => reporter.on_std_err(chunk, test.as_ref(), result.as_ref()),
            Self::Exit => reporter.on_exit().await,
        }
    }
}
