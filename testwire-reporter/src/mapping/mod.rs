// Copyright (c) The testwire Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Conversion of host events into wire messages.
//!
//! Everything in this module is synchronous and free of side effects: mappers take host payloads
//! and already-derived identifiers, and return exactly one message. Validation failures are
//! returned as [`MapEventError`](crate::errors::MapEventError) for the caller to log.
//!
//! Time values follow two policies:
//!
//! * Per-test and per-step times are encoded strictly with [`encode_timestamp`] and
//!   [`encode_duration`]. Invalid values fail the mapping of that one event.
//! * Run-level times come straight from the host's final result and are sanitized with
//!   [`sanitize_run_start`] and [`sanitize_run_duration`], so that the end of a run is always
//!   reported.

mod events;
mod extract;
mod status;
mod time;
mod traversal;

pub use events::*;
pub use extract::*;
pub use status::*;
pub use time::*;
pub use traversal::*;
