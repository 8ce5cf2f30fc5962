// Copyright (c) The testwire Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

use super::{HostRunStatus, HostTestStatus};
use bytes::Bytes;
use camino::Utf8PathBuf;
use itertools::Itertools;
use serde::{Deserialize, Serialize};
use smol_str::SmolStr;
use std::fmt;

/// The titles of a node and all of its ancestors, starting from the root.
///
/// The root suite has no title, so every suite path starts with an empty segment: the root's own
/// path is `[""]`, a file directly under it is `["", "a.spec.ts"]`, and so on. Step paths are
/// relative to their test and contain only step titles.
#[derive(Clone, Debug, Default, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct TitlePath(Vec<SmolStr>);

impl TitlePath {
    /// Creates a title path from its segments.
    pub fn new<I, S>(segments: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<SmolStr>,
    {
        Self(segments.into_iter().map(Into::into).collect())
    }

    /// Returns the title path of the root suite.
    pub fn root() -> Self {
        Self(vec![SmolStr::default()])
    }

    /// Returns the path of a child with the given title.
    pub fn child(&self, title: &str) -> Self {
        let mut segments = self.0.clone();
        segments.push(SmolStr::new(title));
        Self(segments)
    }

    /// Returns the path of the parent, or `None` for a path with at most one segment.
    pub fn parent(&self) -> Option<Self> {
        match self.0.split_last() {
            Some((_, rest)) if !rest.is_empty() => Some(Self(rest.to_vec())),
            _ => None,
        }
    }

    /// Returns the segments of this path.
    pub fn segments(&self) -> &[SmolStr] {
        &self.0
    }

    /// Returns the last segment, if any.
    pub fn last(&self) -> Option<&str> {
        self.0.last().map(SmolStr::as_str)
    }

    /// Returns the number of segments.
    pub fn len(&self) -> usize {
        self.0.len()
    }

    /// Returns true if this path has no segments.
    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    /// Joins the segments with `sep`.
    pub fn join(&self, sep: &str) -> String {
        self.0.iter().join(sep)
    }
}

impl fmt::Display for TitlePath {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.join(" > "))
    }
}

/// A position in a source file.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Location {
    /// The source file.
    pub file: Utf8PathBuf,
    /// The 1-based line.
    pub line: u32,
    /// The 1-based column.
    pub column: u32,
}

impl fmt::Display for Location {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:{}:{}", self.file, self.line, self.column)
    }
}

/// A type/description pair attached to a test, a result or a step.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Annotation {
    /// The annotation type, e.g. `skip` or `issue`.
    #[serde(rename = "type")]
    pub kind: String,
    /// An optional free-form description.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
}

/// What a suite node represents.
#[derive(Copy, Clone, Debug, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SuiteKind {
    /// The root of the tree.
    #[default]
    Root,
    /// A project: one configuration the whole test tree runs under.
    Project,
    /// A test file.
    File,
    /// A `describe` block within a file.
    Describe,
}

/// A node in the host's test tree.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct Suite {
    /// The suite title. Empty for the root.
    #[serde(default)]
    pub title: String,
    /// What this suite represents.
    #[serde(default)]
    pub kind: SuiteKind,
    /// Where the suite is declared, if known.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub location: Option<Location>,
    /// Child suites, in declaration order.
    #[serde(default)]
    pub suites: Vec<Suite>,
    /// Tests declared directly in this suite.
    #[serde(default)]
    pub tests: Vec<TestCase>,
}

impl Suite {
    /// Returns the total number of tests in this suite and all of its descendants.
    pub fn test_count(&self) -> usize {
        self.tests.len() + self.suites.iter().map(Suite::test_count).sum::<usize>()
    }

    /// Returns every test in this suite and all of its descendants.
    pub fn all_tests(&self) -> Vec<&TestCase> {
        let mut tests = Vec::new();
        let mut stack = vec![self];
        while let Some(suite) = stack.pop() {
            tests.extend(suite.tests.iter());
            stack.extend(suite.suites.iter().rev());
        }
        tests
    }
}

/// A single test, which may run several times when retried.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TestCase {
    /// The host-assigned identifier, stable across retries.
    pub id: String,
    /// The test title.
    pub title: String,
    /// The title path of the owning suite.
    #[serde(default = "TitlePath::root")]
    pub suite_path: TitlePath,
    /// Where the test is declared, if known.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub location: Option<Location>,
    /// Tags declared on the test.
    #[serde(default)]
    pub tags: Vec<String>,
    /// Annotations declared on the test.
    #[serde(default)]
    pub annotations: Vec<Annotation>,
    /// The maximum number of retries.
    #[serde(default)]
    pub retries: u32,
}

/// An error captured by the host.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct TestError {
    /// The error message, if any.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub message: Option<String>,
    /// The stack trace, if any.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub stack: Option<String>,
}

/// A file or blob attached to a result by the host.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct HostAttachment {
    /// The attachment name.
    pub name: String,
    /// The MIME type of the content.
    #[serde(default)]
    pub content_type: String,
    /// Where the content is stored, if it is stored externally.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub path: Option<String>,
    /// The content itself, if it is held in memory.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub body: Option<Bytes>,
}

/// The result of one execution of a test.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TestResult {
    /// The zero-based retry index.
    #[serde(default)]
    pub retry: u32,
    /// The worker that ran the test, or -1 if it never reached a worker.
    #[serde(default)]
    pub worker_index: i64,
    /// The outcome. Meaningless until the test has ended.
    pub status: HostTestStatus,
    /// When the execution started.
    pub start_time: f64,
    /// How long the execution took. Meaningless until the test has ended.
    #[serde(default)]
    pub duration: f64,
    /// Errors captured during the execution.
    #[serde(default)]
    pub errors: Vec<TestError>,
    /// Attachments produced by the execution.
    #[serde(default)]
    pub attachments: Vec<HostAttachment>,
    /// Annotations added while the test ran.
    #[serde(default)]
    pub annotations: Vec<Annotation>,
}

/// A step within a test execution.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TestStep {
    /// The titles of this step and its enclosing steps, outermost first.
    pub title_path: TitlePath,
    /// The step category, e.g. `test.step`, `expect` or `hook`.
    #[serde(default)]
    pub category: String,
    /// When the step started.
    pub start_time: f64,
    /// How long the step took. Only present once the step has ended.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub duration: Option<f64>,
    /// The error the step failed with, if any.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<TestError>,
    /// Where the step is declared, if known.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub location: Option<Location>,
    /// Annotations on the step.
    #[serde(default)]
    pub annotations: Vec<Annotation>,
}

impl TestStep {
    /// Returns the step's own title.
    pub fn title(&self) -> &str {
        self.title_path.last().unwrap_or_default()
    }

    /// Returns the title path of the enclosing step, if this step is nested.
    pub fn parent_path(&self) -> Option<TitlePath> {
        self.title_path.parent()
    }
}

/// The final result of a run.
///
/// The host may supply garbage for the start time and duration, so both are optional and may be
/// non-finite.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FullResult {
    /// The overall outcome.
    pub status: HostRunStatus,
    /// When the run started.
    #[serde(default)]
    pub start_time: Option<f64>,
    /// How long the run took.
    #[serde(default)]
    pub duration: Option<f64>,
}

/// Configuration the host ran with.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RunConfig {
    /// The number of workers.
    #[serde(default)]
    pub workers: u32,
    /// The host version, if known.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub version: Option<String>,
    /// The names of the configured projects.
    #[serde(default)]
    pub projects: Vec<String>,
    /// The root directory of the test tree, if known.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub root_dir: Option<Utf8PathBuf>,
}
