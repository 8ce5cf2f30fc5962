// Copyright (c) The testwire Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

use super::{Connector, UnaryChannel, frame};
use crate::errors::TransportError;
use bytes::Bytes;
use futures::future::BoxFuture;
use std::{
    sync::{
        Arc,
        atomic::{AtomicBool, Ordering},
    },
    time::Duration,
};
use tokio::{net::TcpStream, sync::Mutex};
use tracing::debug;

/// Creates [`TcpChannel`]s.
#[derive(Clone, Copy, Debug, Default)]
pub struct TcpConnector;

impl Connector for TcpConnector {
    fn connect(&self, address: &str) -> Result<Arc<dyn UnaryChannel>, TransportError> {
        validate_address(address)?;
        Ok(Arc::new(TcpChannel::new(address)))
    }
}

/// Checks that `address` has the form `host:port`.
pub fn validate_address(address: &str) -> Result<(), TransportError> {
    let invalid = || TransportError::InvalidAddress {
        address: address.to_owned(),
    };
    let (host, port) = address.rsplit_once(':').ok_or_else(invalid)?;
    if host.is_empty() || port.parse::<u16>().is_err() {
        return Err(invalid());
    }
    Ok(())
}

/// An unauthenticated framed channel over a single TCP connection.
///
/// The connection is opened on the first call and reopened on the next call after an I/O error.
/// Calls are serialized over the connection in the order they were made.
#[derive(Debug)]
pub struct TcpChannel {
    address: String,
    stream: Mutex<Option<TcpStream>>,
    closed: AtomicBool,
}

impl TcpChannel {
    /// Creates a channel to `address`. No connection is made until the first call.
    pub fn new(address: impl Into<String>) -> Self {
        Self {
            address: address.into(),
            stream: Mutex::new(None),
            closed: AtomicBool::new(false),
        }
    }

    async fn call(
        &self,
        path: &str,
        payload: Bytes,
        timeout: Duration,
    ) -> Result<Bytes, TransportError> {
        if self.closed.load(Ordering::Acquire) {
            return Err(TransportError::Closed);
        }

        // The deadline starts once earlier calls on this connection have finished.
        let mut guard = self.stream.lock().await;
        match tokio::time::timeout(timeout, self.exchange(&mut guard, path, &payload)).await {
            Ok(result) => result,
            Err(_) => {
                // The stream may be mid-frame, so it can't be reused.
                *guard = None;
                Err(TransportError::Timeout {
                    path: path.to_owned(),
                    timeout,
                })
            }
        }
    }

    async fn open(&self) -> Result<TcpStream, TransportError> {
        debug!(address = %self.address, "opening collector connection");
        let connect_error = |err| TransportError::Connect {
            address: self.address.clone(),
            err,
        };
        let stream = TcpStream::connect(&self.address)
            .await
            .map_err(connect_error)?;
        // Frames are small and latency matters more than throughput.
        stream.set_nodelay(true).map_err(connect_error)?;
        Ok(stream)
    }

    /// Writes one request and reads its response, opening the connection first if necessary.
    async fn exchange(
        &self,
        slot: &mut Option<TcpStream>,
        path: &str,
        payload: &[u8],
    ) -> Result<Bytes, TransportError> {
        let stream = match slot.take() {
            Some(stream) => stream,
            None => self.open().await?,
        };
        let stream = slot.insert(stream);

        let result = async {
            frame::write_request(stream, path, payload).await?;
            frame::read_response(stream).await
        }
        .await;

        match result {
            Ok((frame::STATUS_OK, body)) => Ok(body),
            Ok((status, body)) => Err(TransportError::Status {
                path: path.to_owned(),
                status,
                message: String::from_utf8_lossy(&body).into_owned(),
            }),
            Err(err) => {
                *slot = None;
                Err(TransportError::Call {
                    path: path.to_owned(),
                    err,
                })
            }
        }
    }
}

impl UnaryChannel for TcpChannel {
    fn unary<'a>(
        &'a self,
        path: &'a str,
        payload: Bytes,
        timeout: Duration,
    ) -> BoxFuture<'a, Result<Bytes, TransportError>> {
        Box::pin(self.call(path, payload, timeout))
    }

    fn close(&self) -> Result<(), TransportError> {
        self.closed.store(true, Ordering::Release);
        // If a call is still in flight it holds the lock, and the stream is dropped along with the
        // channel instead.
        if let Ok(mut guard) = self.stream.try_lock() {
            guard.take();
        }
        Ok(())
    }
}
