// Copyright (c) The testwire Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

/// Documented exit codes for `testwire` failures.
///
/// A failing test run never changes the exit code of `testwire replay`: the reporter only observes
/// the run. The codes below cover failures of testwire itself.
///
/// Unknown/unexpected failures will always result in exit code 1.
pub enum TestwireExitCode {}

impl TestwireExitCode {
    /// No errors occurred and testwire exited normally.
    pub const OK: i32 = 0;

    /// A user issue happened while setting up a testwire invocation.
    pub const SETUP_ERROR: i32 = 96;

    /// The reporter configuration could not be loaded or resolved.
    pub const CONFIG_ERROR: i32 = 97;

    /// The host event stream could not be read.
    pub const INPUT_READ_ERROR: i32 = 98;

    /// The host event stream contained a malformed event.
    pub const INVALID_EVENT_STREAM: i32 = 99;

    /// The debug collector could not bind or accept connections.
    pub const LISTEN_ERROR: i32 = 102;

    /// Writing data to stdout or stderr produced an error.
    pub const WRITE_OUTPUT_ERROR: i32 = 110;
}
