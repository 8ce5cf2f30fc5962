// Copyright (c) The testwire Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

use serde::{Deserialize, Serialize};
use std::{convert::Infallible, fmt, str::FromStr};

/// The outcome of a single test execution, as reported by the host.
#[derive(Copy, Clone, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[cfg_attr(test, derive(test_strategy::Arbitrary))]
#[serde(rename_all = "camelCase")]
pub enum HostTestStatus {
    /// The test passed.
    Passed,
    /// The test failed.
    Failed,
    /// The test was skipped.
    Skipped,
    /// The test exceeded its timeout.
    TimedOut,
    /// Any status this crate doesn't know about.
    #[serde(other)]
    Unrecognized,
}

impl HostTestStatus {
    /// Returns the host's string for this status.
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Passed => "passed",
            Self::Failed => "failed",
            Self::Skipped => "skipped",
            Self::TimedOut => "timedOut",
            Self::Unrecognized => "unrecognized",
        }
    }
}

impl FromStr for HostTestStatus {
    type Err = Infallible;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Ok(match s {
            "passed" => Self::Passed,
            "failed" => Self::Failed,
            "skipped" => Self::Skipped,
            "timedOut" => Self::TimedOut,
            _ => Self::Unrecognized,
        })
    }
}

impl fmt::Display for HostTestStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// The outcome of a whole run, as reported by the host.
#[derive(Copy, Clone, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[cfg_attr(test, derive(test_strategy::Arbitrary))]
#[serde(rename_all = "lowercase")]
pub enum HostRunStatus {
    /// Every test passed or was skipped.
    Passed,
    /// At least one test failed.
    Failed,
    /// The run hit its global timeout.
    TimedOut,
    /// The run was interrupted, for example by a signal.
    Interrupted,
    /// Any status this crate doesn't know about.
    #[serde(other)]
    Unrecognized,
}

impl HostRunStatus {
    /// Returns the host's string for this status.
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Passed => "passed",
            Self::Failed => "failed",
            Self::TimedOut => "timedout",
            Self::Interrupted => "interrupted",
            Self::Unrecognized => "unrecognized",
        }
    }
}

impl FromStr for HostRunStatus {
    type Err = Infallible;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Ok(match s {
            "passed" => Self::Passed,
            "failed" => Self::Failed,
            "timedout" => Self::TimedOut,
            "interrupted" => Self::Interrupted,
            _ => Self::Unrecognized,
        })
    }
}

impl fmt::Display for HostRunStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}
