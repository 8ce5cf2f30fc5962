// Copyright (c) The testwire Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! The host's view of a test run.
//!
//! A host is whatever executes tests: it discovers suites and tests, schedules them across workers,
//! and reports their lifecycle through the callbacks of [`Reporter`](crate::reporter::Reporter).
//! The types in this module are the payloads of those callbacks. They are owned and deserializable
//! so that a recorded stream of host events (see [`HostEvent`]) can be replayed.
//!
//! All instants are milliseconds since the Unix epoch and all durations are milliseconds, both as
//! `f64`, matching the host's own representation. Nothing in this module validates them: that
//! happens when events are mapped to wire messages.

mod events;
mod model;
mod status;

pub use events::*;
pub use model::*;
pub use status::*;
