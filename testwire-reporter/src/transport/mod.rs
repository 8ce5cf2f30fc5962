// Copyright (c) The testwire Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Delivery of wire messages to the collector.
//!
//! The collector is reached through a [`UnaryChannel`]: a point-to-point channel that sends one
//! payload to a method path and waits for one response. Channels are created by a [`Connector`].
//! The production implementations, [`TcpConnector`] and [`TcpChannel`], speak a small framed
//! protocol over TCP (see [`frame`]).
//!
//! The [`TransportGateway`] sits on top of a channel and implements the delivery policy: every send
//! is fire-and-forget, every call has a deadline, and the first failure of any kind disables the
//! gateway for the rest of the run.
//!
//! Sends are initiated in the order the reporter makes them, but they complete independently, so a
//! collector may receive an end event before the matching begin event. Collectors must tolerate
//! this.

pub mod frame;
mod gateway;
mod tcp;

pub use gateway::*;
pub use tcp::*;

use crate::errors::TransportError;
use bytes::Bytes;
use futures::future::BoxFuture;
use std::{fmt, sync::Arc, time::Duration};

/// A channel that carries unary calls to the collector.
pub trait UnaryChannel: fmt::Debug + Send + Sync {
    /// Sends `payload` to the method at `path` and returns the response body.
    ///
    /// The call fails with [`TransportError::Timeout`] if it takes longer than `timeout`. The
    /// deadline covers the call itself and starts once the channel is ready to carry it, so time
    /// spent queued behind earlier calls on the same connection doesn't count.
    fn unary<'a>(
        &'a self,
        path: &'a str,
        payload: Bytes,
        timeout: Duration,
    ) -> BoxFuture<'a, Result<Bytes, TransportError>>;

    /// Releases the channel. Calls made after closing fail with [`TransportError::Closed`].
    fn close(&self) -> Result<(), TransportError>;
}

/// Creates channels to a collector address.
pub trait Connector: fmt::Debug + Send + Sync {
    /// Creates a channel to `address`.
    ///
    /// Implementations may defer the actual network connection until the first call.
    fn connect(&self, address: &str) -> Result<Arc<dyn UnaryChannel>, TransportError>;
}
