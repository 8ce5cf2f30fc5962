// Copyright (c) The testwire Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

use serde::{Deserialize, Serialize};
use std::fmt;

/// The status of a test, step, suite or run, as understood by the collector.
#[derive(Copy, Clone, Debug, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
#[repr(i32)]
pub enum TestStatus {
    /// The status is not known.
    #[default]
    Unknown = 0,
    /// The entity has started and not yet finished.
    Running = 1,
    /// The entity passed.
    Passed = 2,
    /// The entity failed.
    Failed = 3,
    /// The entity was skipped.
    Skipped = 4,
    /// The entity could not complete because of an infrastructure problem.
    Broken = 5,
    /// The run hit its global timeout.
    TimedOut = 6,
    /// The run was interrupted.
    Interrupted = 7,
}

impl TestStatus {
    /// Returns the numeric wire code for this status.
    pub fn code(self) -> i32 {
        self as i32
    }

    /// Returns true if this status represents a failure of some kind.
    pub fn is_failure(self) -> bool {
        matches!(
            self,
            Self::Failed | Self::Broken | Self::TimedOut | Self::Interrupted
        )
    }
}

impl fmt::Display for TestStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            Self::Unknown => "UNKNOWN",
            Self::Running => "RUNNING",
            Self::Passed => "PASSED",
            Self::Failed => "FAILED",
            Self::Skipped => "SKIPPED",
            Self::Broken => "BROKEN",
            Self::TimedOut => "TIMED_OUT",
            Self::Interrupted => "INTERRUPTED",
        };
        f.write_str(s)
    }
}

/// The kind of a suite node in the test hierarchy.
#[derive(Copy, Clone, Debug, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum SuiteType {
    /// The kind is not known.
    #[default]
    Unspecified,
    /// The root of the test tree.
    Root,
    /// A project-level grouping.
    Project,
    /// A test file.
    File,
    /// A logical group within a file.
    Group,
}

#[cfg(feature = "proptest1")]
mod proptest_impls {
    use super::*;
    use proptest::prelude::*;

    impl Arbitrary for TestStatus {
        type Parameters = ();
        type Strategy = BoxedStrategy<Self>;

        fn arbitrary_with(_: Self::Parameters) -> Self::Strategy {
            prop_oneof![
                Just(TestStatus::Unknown),
                Just(TestStatus::Running),
                Just(TestStatus::Passed),
                Just(TestStatus::Failed),
                Just(TestStatus::Skipped),
                Just(TestStatus::Broken),
                Just(TestStatus::TimedOut),
                Just(TestStatus::Interrupted),
            ]
            .boxed()
        }
    }
}
