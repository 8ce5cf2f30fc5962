// Copyright (c) The testwire Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Wire-format messages for testwire.
//!
//! This crate is the contract between a testwire reporter and a remote collector. Every lifecycle
//! event of a test run is represented by one request message, sent to the collector as a unary call
//! against a fully-qualified [`CollectorMethod`] path. The payload of each call is produced by
//! [`WireMessage::encode`].
//!
//! The types in this crate carry no behavior beyond (de)serialization. Mapping from host events to
//! these messages lives in `testwire-reporter`.

#![warn(missing_docs)]

mod errors;
mod exit_codes;
mod messages;
mod method;
mod status;
mod time;

pub use errors::*;
pub use exit_codes::*;
pub use messages::*;
pub use method::*;
pub use status::*;
pub use time::*;
