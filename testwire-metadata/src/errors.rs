// Copyright (c) The testwire Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

use crate::CollectorMethod;
use thiserror::Error;

/// An error that occurred while encoding a message into its wire payload.
#[derive(Debug, Error)]
#[error("failed to encode `{method}` request")]
#[non_exhaustive]
pub struct EncodeError {
    method: CollectorMethod,
    #[source]
    err: serde_json::Error,
}

impl EncodeError {
    /// Creates a new `EncodeError`.
    pub fn new(method: CollectorMethod, err: serde_json::Error) -> Self {
        Self { method, err }
    }

    /// Returns the method whose request failed to encode.
    pub fn method(&self) -> CollectorMethod {
        self.method
    }
}

/// An error that occurred while decoding a wire payload into a message.
#[derive(Debug, Error)]
#[error("failed to decode `{method}` request")]
#[non_exhaustive]
pub struct DecodeError {
    method: CollectorMethod,
    #[source]
    err: serde_json::Error,
}

impl DecodeError {
    pub(crate) fn new(method: CollectorMethod, err: serde_json::Error) -> Self {
        Self { method, err }
    }
}

/// A method path was not recognized as one of the collector's methods.
#[derive(Clone, Debug, Error)]
#[error(
    "unrecognized collector method path: {input}\n(known methods: {})",
    CollectorMethod::ALL.iter().map(|m| m.name()).collect::<Vec<_>>().join(", "),
)]
pub struct UnknownMethodError {
    input: String,
}

impl UnknownMethodError {
    pub(crate) fn new(input: impl Into<String>) -> Self {
        Self {
            input: input.into(),
        }
    }
}
