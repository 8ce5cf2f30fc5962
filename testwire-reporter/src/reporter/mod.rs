// Copyright (c) The testwire Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! The host-facing listener surface.
//!
//! A host drives a [`Reporter`] by invoking one method per lifecycle event, serially, from a single
//! task. Events for different tests may be interleaved when the host runs tests on several workers
//! at once.

mod observer;

pub use observer::*;

use crate::host::{FullResult, RunConfig, Suite, TestCase, TestError, TestResult, TestStep};
use std::future::Future;

/// Receives lifecycle events from a host.
///
/// Every method except [`on_exit`](Self::on_exit) is synchronous and must return promptly: the host
/// waits for it before continuing the run.
pub trait Reporter {
    /// The run is about to start. `suite` is the root of the test tree.
    fn on_begin(&mut self, config: &RunConfig, suite: &Suite);

    /// The run finished.
    fn on_end(&mut self, result: &FullResult);

    /// A test execution started.
    fn on_test_begin(&mut self, test: &TestCase, result: &TestResult);

    /// A test execution finished.
    fn on_test_end(&mut self, test: &TestCase, result: &TestResult);

    /// A test execution failed.
    fn on_test_fail(&mut self, test: &TestCase, result: &TestResult);

    /// A step started.
    fn on_step_begin(&mut self, test: &TestCase, result: &TestResult, step: &TestStep);

    /// A step finished.
    fn on_step_end(&mut self, test: &TestCase, result: &TestResult, step: &TestStep);

    /// The host hit an error outside of any test.
    fn on_error(&mut self, _error: &TestError) {}

    /// A chunk was written to standard output.
    fn on_std_out(&mut self, _chunk: &str, _test: Option<&TestCase>, _result: Option<&TestResult>) {
    }

    /// A chunk was written to standard error.
    fn on_std_err(&mut self, _chunk: &str, _test: Option<&TestCase>, _result: Option<&TestResult>) {
    }

    /// The host process is about to exit. The host waits for the returned future.
    fn on_exit(&mut self) -> impl Future<Output = ()> + Send;
}
