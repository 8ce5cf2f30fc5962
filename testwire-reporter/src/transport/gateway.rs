// Copyright (c) The testwire Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

use super::{Connector, UnaryChannel};
use crate::errors::{DisplayErrorChain, TransportError};
use std::{
    fmt,
    sync::{
        Arc,
        atomic::{AtomicU8, Ordering},
    },
    time::Duration,
};
use testwire_metadata::{CollectorMethod, WireMessage};
use tokio::{runtime::Handle, task::JoinHandle};
use tracing::{debug, warn};

/// Extra time given to in-flight sends when draining, on top of the call timeout.
const DRAIN_GRACE: Duration = Duration::from_millis(50);

/// The state of a [`TransportGateway`].
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
#[repr(u8)]
pub enum GatewayState {
    /// No connection has been attempted. Sends are dropped.
    Uninitialized = 0,
    /// Connected. Sends are dispatched.
    Connected = 1,
    /// A connection or call failed. Sends are dropped for the rest of the run.
    Degraded = 2,
    /// The channel was released. Sends are dropped.
    Closed = 3,
}

impl GatewayState {
    fn from_u8(value: u8) -> Self {
        match value {
            0 => Self::Uninitialized,
            1 => Self::Connected,
            2 => Self::Degraded,
            _ => Self::Closed,
        }
    }
}

impl fmt::Display for GatewayState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            Self::Uninitialized => "uninitialized",
            Self::Connected => "connected",
            Self::Degraded => "degraded",
            Self::Closed => "closed",
        };
        f.write_str(s)
    }
}

/// State shared between the gateway and its in-flight sends.
#[derive(Debug)]
struct Shared {
    state: AtomicU8,
    address: String,
}

impl Shared {
    fn state(&self) -> GatewayState {
        GatewayState::from_u8(self.state.load(Ordering::Acquire))
    }

    /// Moves from `Connected` to `Degraded`. Only the caller that performs the transition logs.
    fn degrade(&self, method: CollectorMethod, error: &TransportError) {
        let transitioned = self
            .state
            .compare_exchange(
                GatewayState::Connected as u8,
                GatewayState::Degraded as u8,
                Ordering::AcqRel,
                Ordering::Acquire,
            )
            .is_ok();
        if transitioned {
            warn!(
                "failed to send {method} to collector, disabling for the remainder of the run \
                 (address: {}): {}",
                self.address,
                DisplayErrorChain::new(error),
            );
        } else {
            debug!("dropped failure for {method}: {error}");
        }
    }
}

/// Best-effort, fire-and-forget delivery of wire messages to the collector.
///
/// The gateway moves through the states of [`GatewayState`]:
///
/// * [`connect`](Self::connect) moves from `Uninitialized` to `Connected`, or straight to
///   `Degraded` if a channel can't be created.
/// * The first failed call of any kind (connection error, timeout, encoding error) moves from
///   `Connected` to `Degraded` and logs a single warning. Later failures are not logged.
/// * [`shutdown`](Self::shutdown) moves to `Closed` and releases the channel.
///
/// Only a `Connected` gateway dispatches messages. In every other state [`send`](Self::send) returns
/// immediately without doing anything, and there is no reconnection.
#[derive(Debug)]
pub struct TransportGateway {
    shared: Arc<Shared>,
    call_timeout: Duration,
    channel: Option<Arc<dyn UnaryChannel>>,
    runtime: Option<Handle>,
    in_flight: Vec<JoinHandle<()>>,
}

impl TransportGateway {
    /// Creates a gateway for `address` that gives each call `call_timeout` to complete.
    pub fn new(address: impl Into<String>, call_timeout: Duration) -> Self {
        Self {
            shared: Arc::new(Shared {
                state: AtomicU8::new(GatewayState::Uninitialized as u8),
                address: address.into(),
            }),
            call_timeout,
            channel: None,
            runtime: None,
            in_flight: Vec::new(),
        }
    }

    /// Returns the collector address.
    pub fn address(&self) -> &str {
        &self.shared.address
    }

    /// Returns the current state.
    pub fn state(&self) -> GatewayState {
        self.shared.state()
    }

    /// Returns true if messages are currently being dispatched.
    pub fn is_active(&self) -> bool {
        self.state() == GatewayState::Connected
    }

    /// Creates the channel to the collector.
    ///
    /// Must be called from within a tokio runtime, which is then used for all sends. Does nothing
    /// unless the gateway is `Uninitialized`. Failures are logged and degrade the gateway.
    pub fn connect(&mut self, connector: &dyn Connector) -> GatewayState {
        if self.state() != GatewayState::Uninitialized {
            return self.state();
        }

        let result = Handle::try_current()
            .map_err(|_| TransportError::NoRuntime)
            .and_then(|runtime| Ok((runtime, connector.connect(&self.shared.address)?)));

        match result {
            Ok((runtime, channel)) => {
                self.runtime = Some(runtime);
                self.channel = Some(channel);
                self.set_state(GatewayState::Connected);
                debug!(address = %self.shared.address, "collector channel ready");
            }
            Err(error) => {
                self.set_state(GatewayState::Degraded);
                warn!(
                    "failed to set up collector channel, disabling for the remainder of the run \
                     (address: {}): {}",
                    self.shared.address,
                    DisplayErrorChain::new(&error),
                );
            }
        }

        self.state()
    }

    /// Dispatches `message` in the background.
    ///
    /// Returns true if a send was started, and false if the gateway isn't connected. Never waits
    /// for the call and never fails: errors are handled by the background task.
    pub fn send<M: WireMessage>(&mut self, message: M) -> bool {
        if !self.is_active() {
            return false;
        }
        let (Some(channel), Some(runtime)) = (&self.channel, &self.runtime) else {
            return false;
        };

        let channel = channel.clone();
        let shared = self.shared.clone();
        let call_timeout = self.call_timeout;

        self.in_flight.retain(|handle| !handle.is_finished());
        self.in_flight.push(runtime.spawn(async move {
            // The gateway may have degraded while this task was queued.
            if shared.state() != GatewayState::Connected {
                return;
            }
            if let Err(error) = call(&*channel, &message, call_timeout).await {
                shared.degrade(M::METHOD, &error);
            }
        }));
        true
    }

    /// Waits for in-flight sends to finish, for at most one call timeout plus a short grace
    /// period.
    pub async fn flush(&mut self) {
        let handles = std::mem::take(&mut self.in_flight);
        if handles.is_empty() {
            return;
        }

        let count = handles.len();
        let deadline = self.call_timeout + DRAIN_GRACE;
        match tokio::time::timeout(deadline, futures::future::join_all(handles)).await {
            Ok(_) => debug!("flushed {count} in-flight sends"),
            Err(_) => debug!("gave up waiting for in-flight sends after {deadline:?}"),
        }
    }

    /// Flushes in-flight sends and releases the channel.
    ///
    /// Errors while closing are logged, never returned.
    pub async fn shutdown(&mut self) {
        self.flush().await;
        self.set_state(GatewayState::Closed);

        if let Some(channel) = self.channel.take() {
            match channel.close() {
                Ok(()) => debug!("collector channel closed"),
                Err(error) => warn!(
                    "failed to close collector channel (address: {}): {}",
                    self.shared.address,
                    DisplayErrorChain::new(&error),
                ),
            }
        }
        self.runtime = None;
    }

    fn set_state(&self, state: GatewayState) {
        self.shared.state.store(state as u8, Ordering::Release);
    }
}

async fn call<M: WireMessage>(
    channel: &dyn UnaryChannel,
    message: &M,
    call_timeout: Duration,
) -> Result<(), TransportError> {
    let payload = message.encode()?;
    channel
        .unary(M::METHOD.path(), payload, call_timeout)
        .await
        .map(|_| ())
}
