// Copyright (c) The testwire Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Errors produced by testwire.

pub use testwire_metadata::EncodeError;
use std::{error::Error as StdError, fmt, time::Duration};
use thiserror::Error;

/// A time or duration value that cannot be encoded on the wire.
#[derive(Clone, Debug, Error, PartialEq)]
#[non_exhaustive]
pub enum InvalidTimeError {
    /// The value was NaN or infinite.
    #[error("expected a finite number of milliseconds, found {value}")]
    NotFinite {
        /// The value that was rejected.
        value: f64,
    },

    /// A duration was negative.
    #[error("duration must not be negative, found {value} ms")]
    Negative {
        /// The value that was rejected.
        value: f64,
    },

    /// The number of whole seconds does not fit in the wire representation.
    #[error("{value} ms is out of range for a wire timestamp")]
    OutOfRange {
        /// The value that was rejected.
        value: f64,
    },
}

/// An error that occurred while building a wire message from a host event.
///
/// Mapping errors never reach the host: the reporter logs them and skips the event.
#[derive(Debug, Error)]
#[error("failed to map {event} event: invalid {field}")]
pub struct MapEventError {
    event: &'static str,
    field: &'static str,
    #[source]
    err: InvalidTimeError,
}

impl MapEventError {
    pub(crate) fn new(event: &'static str, field: &'static str, err: InvalidTimeError) -> Self {
        Self { event, field, err }
    }

    /// Returns the name of the event that failed to map.
    pub fn event(&self) -> &'static str {
        self.event
    }

    /// Returns the field that held the invalid value.
    pub fn field(&self) -> &'static str {
        self.field
    }
}

/// An error that occurred while talking to the collector.
#[derive(Debug, Error)]
#[non_exhaustive]
pub enum TransportError {
    /// The configured address is not of the form `host:port`.
    #[error("invalid collector address `{address}`: expected `host:port`")]
    InvalidAddress {
        /// The address that was rejected.
        address: String,
    },

    /// A connection to the collector could not be established.
    #[error("failed to connect to collector at `{address}`")]
    Connect {
        /// The collector address.
        address: String,

        /// The underlying error.
        #[source]
        err: std::io::Error,
    },

    /// A call did not complete within its deadline.
    #[error("call to `{path}` timed out after {timeout:?}")]
    Timeout {
        /// The method path.
        path: String,

        /// The deadline that was exceeded.
        timeout: Duration,
    },

    /// An I/O error occurred during a call.
    #[error("call to `{path}` failed")]
    Call {
        /// The method path.
        path: String,

        /// The underlying error.
        #[source]
        err: std::io::Error,
    },

    /// The collector answered with a non-zero status.
    #[error("collector returned status {status} for `{path}`: {message}")]
    Status {
        /// The method path.
        path: String,

        /// The status code.
        status: u8,

        /// The response body, interpreted as text.
        message: String,
    },

    /// A message could not be encoded.
    #[error(transparent)]
    Encode(#[from] EncodeError),

    /// The gateway was asked to connect outside of a tokio runtime.
    #[error("no tokio runtime available to drive the collector channel")]
    NoRuntime,

    /// The channel was used after it was closed.
    #[error("channel is closed")]
    Closed,
}

/// An error that occurred while resolving reporter configuration.
#[derive(Debug, Error)]
#[non_exhaustive]
pub enum ConfigResolveError {
    /// An environment variable that should hold an integer did not.
    #[error("invalid value for {var}: `{value}` is not a non-negative integer")]
    InvalidInteger {
        /// The environment variable.
        var: &'static str,

        /// The value that was rejected.
        value: String,

        /// The underlying error.
        #[source]
        err: std::num::ParseIntError,
    },

    /// An identifier strategy was not recognized.
    #[error("invalid value for {var}: `{value}` (known strategies: hashed, readable)")]
    InvalidIdStrategy {
        /// Where the value came from.
        var: &'static str,

        /// The value that was rejected.
        value: String,
    },
}

/// Displays an error along with the chain of errors that caused it.
///
/// Used wherever an error ends up in a log line rather than being propagated.
pub struct DisplayErrorChain<E>(E);

impl<E: StdError> DisplayErrorChain<E> {
    /// Creates a new `DisplayErrorChain`.
    pub fn new(error: E) -> Self {
        Self(error)
    }
}

impl<E: StdError> fmt::Display for DisplayErrorChain<E> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)?;

        let mut source = self.0.source();
        if source.is_some() {
            write!(f, "\ncaused by:")?;
        }
        while let Some(error) = source {
            write!(f, "\n  - {error}")?;
            source = error.source();
        }

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn display_error_chain_lists_causes() {
        let error = TransportError::Call {
            path: "/svc/Method".to_owned(),
            err: std::io::Error::new(std::io::ErrorKind::BrokenPipe, "pipe closed"),
        };
        assert_eq!(
            DisplayErrorChain::new(&error).to_string(),
            "call to `/svc/Method` failed\ncaused by:\n  - pipe closed"
        );

        let error = TransportError::Closed;
        assert_eq!(
            DisplayErrorChain::new(&error).to_string(),
            "channel is closed"
        );
    }
}
