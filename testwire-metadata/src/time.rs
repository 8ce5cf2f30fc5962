// Copyright (c) The testwire Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

use serde::{Deserialize, Serialize};

/// An absolute instant: whole seconds since the Unix epoch plus a nanosecond remainder.
///
/// `nanos` is always in `0..1_000_000_000`, including for instants before the epoch.
#[derive(Copy, Clone, Debug, Default, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct Timestamp {
    /// Whole seconds since the Unix epoch.
    pub seconds: i64,
    /// Nanoseconds past `seconds`.
    pub nanos: i32,
}

/// An elapsed time: whole seconds plus a nanosecond remainder.
///
/// Encoded identically to [`Timestamp`], but only ever non-negative.
#[derive(Copy, Clone, Debug, Default, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct Duration {
    /// Whole seconds.
    pub seconds: i64,
    /// Nanoseconds past `seconds`.
    pub nanos: i32,
}

impl Duration {
    /// A zero-length duration.
    pub const ZERO: Self = Self {
        seconds: 0,
        nanos: 0,
    };
}
