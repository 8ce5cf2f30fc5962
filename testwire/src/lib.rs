// Copyright (c) The testwire Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Command-line tools for testwire.
//!
//! `testwire replay` drives the reporter from a recorded stream of host events, and
//! `testwire listen` runs a collector that prints what it receives. Both exist mostly to exercise
//! and debug reporters and collectors without a live test host.

#![warn(missing_docs)]

mod dispatch;
mod errors;
mod listen;
mod output;
mod replay;

#[doc(hidden)]
pub use dispatch::*;
#[doc(hidden)]
pub use errors::*;
pub use output::{LOG_ENV, OutputContext, StderrStyles};
