// Copyright (c) The testwire Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

use crate::UnknownMethodError;
use serde::{Deserialize, Serialize};
use std::{fmt, str::FromStr};

/// The fully-qualified service name of the collector.
pub const COLLECTOR_SERVICE: &str = "testsystem.v1.observer.TestEventCollector";

/// A unary method exposed by the collector.
///
/// Calls are made by method path against a generic channel rather than through a typed stub, so
/// the transport never needs to know about individual message types.
#[derive(Copy, Clone, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum CollectorMethod {
    /// Run begin: the full suite map of the run.
    MapTestRun,
    /// A suite started.
    ReportSuiteBegin,
    /// A suite finished.
    ReportSuiteEnd,
    /// A test started.
    ReportTestBegin,
    /// A test finished.
    ReportTestEnd,
    /// A test failed.
    ReportTestFailure,
    /// A step started.
    ReportStepBegin,
    /// A step finished.
    ReportStepEnd,
    /// The run finished.
    ReportRunEnd,
    /// A host error or a chunk of standard error output.
    ReportStdError,
}

impl CollectorMethod {
    /// All known methods, in lifecycle order.
    pub const ALL: &'static [Self] = &[
        Self::MapTestRun,
        Self::ReportSuiteBegin,
        Self::ReportSuiteEnd,
        Self::ReportTestBegin,
        Self::ReportTestEnd,
        Self::ReportTestFailure,
        Self::ReportStepBegin,
        Self::ReportStepEnd,
        Self::ReportRunEnd,
        Self::ReportStdError,
    ];

    /// Returns the bare method name.
    pub fn name(self) -> &'static str {
        match self {
            Self::MapTestRun => "MapTestRun",
            Self::ReportSuiteBegin => "ReportSuiteBegin",
            Self::ReportSuiteEnd => "ReportSuiteEnd",
            Self::ReportTestBegin => "ReportTestBegin",
            Self::ReportTestEnd => "ReportTestEnd",
            Self::ReportTestFailure => "ReportTestFailure",
            Self::ReportStepBegin => "ReportStepBegin",
            Self::ReportStepEnd => "ReportStepEnd",
            Self::ReportRunEnd => "ReportRunEnd",
            Self::ReportStdError => "ReportStdError",
        }
    }

    /// Returns the fully-qualified method path, e.g.
    /// `/testsystem.v1.observer.TestEventCollector/ReportTestEnd`.
    pub fn path(self) -> &'static str {
        match self {
            Self::MapTestRun => "/testsystem.v1.observer.TestEventCollector/MapTestRun",
            Self::ReportSuiteBegin => "/testsystem.v1.observer.TestEventCollector/ReportSuiteBegin",
            Self::ReportSuiteEnd => "/testsystem.v1.observer.TestEventCollector/ReportSuiteEnd",
            Self::ReportTestBegin => "/testsystem.v1.observer.TestEventCollector/ReportTestBegin",
            Self::ReportTestEnd => "/testsystem.v1.observer.TestEventCollector/ReportTestEnd",
            Self::ReportTestFailure => {
                "/testsystem.v1.observer.TestEventCollector/ReportTestFailure"
            }
            Self::ReportStepBegin => "/testsystem.v1.observer.TestEventCollector/ReportStepBegin",
            Self::ReportStepEnd => "/testsystem.v1.observer.TestEventCollector/ReportStepEnd",
            Self::ReportRunEnd => "/testsystem.v1.observer.TestEventCollector/ReportRunEnd",
            Self::ReportStdError => "/testsystem.v1.observer.TestEventCollector/ReportStdError",
        }
    }

    /// Parses a fully-qualified method path.
    pub fn from_path(path: &str) -> Result<Self, UnknownMethodError> {
        let name = path
            .strip_prefix('/')
            .and_then(|rest| rest.strip_prefix(COLLECTOR_SERVICE))
            .and_then(|rest| rest.strip_prefix('/'))
            .ok_or_else(|| UnknownMethodError::new(path))?;
        Self::ALL
            .iter()
            .copied()
            .find(|method| method.name() == name)
            .ok_or_else(|| UnknownMethodError::new(path))
    }
}

impl FromStr for CollectorMethod {
    type Err = UnknownMethodError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::from_path(s)
    }
}

impl fmt::Display for CollectorMethod {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}
