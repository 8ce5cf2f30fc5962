// Copyright (c) The testwire Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Core functionality for testwire: observing a test run and forwarding it to a collector.
//!
//! The flow of operations is:
//!
//! 1. A host drives an implementation of [`reporter::Reporter`] with lifecycle callbacks. The only
//!    implementation in this crate is [`reporter::ObserverReporter`].
//! 2. For each callback, the reporter derives stable identifiers for the suites and steps involved
//!    (see [`ids`]) and builds one wire message from the host event (see [`mapping`]).
//! 3. The message is handed to the [`transport::TransportGateway`], which sends it in the
//!    background. The host is never blocked on the network, and transport failures never surface
//!    to the host: the first one disables the gateway for the remainder of the run.

#![warn(missing_docs)]

pub mod config;
pub mod errors;
pub mod host;
pub mod ids;
pub mod mapping;
pub mod reporter;
#[cfg(test)]
mod test_helpers;
pub mod transport;
