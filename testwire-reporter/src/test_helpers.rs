// Copyright (c) The testwire Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Fixtures and test doubles shared across unit tests.

use crate::{
    errors::TransportError,
    host::{
        HostTestStatus, Location, Suite, SuiteKind, TestCase, TestResult, TestStep, TitlePath,
    },
    transport::{Connector, UnaryChannel},
};
use bytes::Bytes;
use futures::future::BoxFuture;
use std::{
    future,
    sync::{
        Arc, Mutex,
        atomic::{AtomicUsize, Ordering},
    },
    time::Duration,
};
use testwire_metadata::{CollectorMethod, CollectorRequest};
use tracing::{Event, Level, Subscriber};
use tracing_subscriber::{Layer, layer::Context};

/// Returns a small tree:
///
/// ```text
/// (root)
/// └── chromium
///     ├── auth.spec.ts      [t-login]
///     │   └── session       [t-logout]
///     └── cart.spec.ts      [t-cart]
/// ```
pub(crate) fn sample_tree() -> Suite {
    let project = TitlePath::root().child("chromium");
    let auth = project.child("auth.spec.ts");
    let session = auth.child("session");
    let cart = project.child("cart.spec.ts");

    Suite {
        title: String::new(),
        kind: SuiteKind::Root,
        location: None,
        tests: Vec::new(),
        suites: vec![Suite {
            title: "chromium".to_owned(),
            kind: SuiteKind::Project,
            location: None,
            tests: Vec::new(),
            suites: vec![
                Suite {
                    title: "auth.spec.ts".to_owned(),
                    kind: SuiteKind::File,
                    location: None,
                    tests: vec![test_case("t-login", "logs in", &auth, 3)],
                    suites: vec![Suite {
                        title: "session".to_owned(),
                        kind: SuiteKind::Describe,
                        location: Some(location("auth.spec.ts", 10)),
                        tests: vec![test_case("t-logout", "logs out", &session, 11)],
                        suites: Vec::new(),
                    }],
                },
                Suite {
                    title: "cart.spec.ts".to_owned(),
                    kind: SuiteKind::File,
                    location: None,
                    tests: vec![test_case("t-cart", "adds to cart", &cart, 3)],
                    suites: Vec::new(),
                },
            ],
        }],
    }
}

fn location(file: &str, line: u32) -> Location {
    Location {
        file: file.into(),
        line,
        column: 5,
    }
}

fn test_case(id: &str, title: &str, suite_path: &TitlePath, line: u32) -> TestCase {
    let file = suite_path.segments()[2].as_str();
    TestCase {
        id: id.to_owned(),
        title: title.to_owned(),
        suite_path: suite_path.clone(),
        location: Some(location(file, line)),
        tags: vec!["@smoke".to_owned()],
        annotations: Vec::new(),
        retries: 0,
    }
}

pub(crate) fn sample_result(status: HostTestStatus) -> TestResult {
    TestResult {
        retry: 0,
        worker_index: 0,
        status,
        start_time: 1_704_110_400_000.0,
        duration: 0.0,
        errors: Vec::new(),
        attachments: Vec::new(),
        annotations: Vec::new(),
    }
}

pub(crate) fn sample_step(title_path: &[&str]) -> TestStep {
    TestStep {
        title_path: TitlePath::new(title_path.iter().copied()),
        category: "test.step".to_owned(),
        start_time: 1_704_110_400_010.0,
        duration: None,
        error: None,
        location: None,
        annotations: Vec::new(),
    }
}

/// What a [`RecordingChannel`] does with each call.
#[derive(Clone, Copy, Debug)]
pub(crate) enum ChannelBehavior {
    /// Every call succeeds immediately.
    Succeed,
    /// Every call stalls until its deadline passes, then times out.
    Stall,
}

/// An in-memory channel that records every call in the order calls are made.
#[derive(Debug)]
pub(crate) struct RecordingChannel {
    behavior: ChannelBehavior,
    calls: Mutex<Vec<(CollectorMethod, CollectorRequest)>>,
    attempts: AtomicUsize,
    closed: AtomicUsize,
}

impl RecordingChannel {
    pub(crate) fn new(behavior: ChannelBehavior) -> Arc<Self> {
        Arc::new(Self {
            behavior,
            calls: Mutex::new(Vec::new()),
            attempts: AtomicUsize::new(0),
            closed: AtomicUsize::new(0),
        })
    }

    pub(crate) fn calls(&self) -> Vec<(CollectorMethod, CollectorRequest)> {
        self.calls.lock().unwrap().clone()
    }

    pub(crate) fn methods(&self) -> Vec<CollectorMethod> {
        self.calls().into_iter().map(|(method, _)| method).collect()
    }

    pub(crate) fn attempts(&self) -> usize {
        self.attempts.load(Ordering::SeqCst)
    }

    pub(crate) fn close_count(&self) -> usize {
        self.closed.load(Ordering::SeqCst)
    }
}

impl UnaryChannel for RecordingChannel {
    fn unary<'a>(
        &'a self,
        path: &'a str,
        payload: Bytes,
        timeout: Duration,
    ) -> BoxFuture<'a, Result<Bytes, TransportError>> {
        self.attempts.fetch_add(1, Ordering::SeqCst);
        let method = CollectorMethod::from_path(path).expect("known method path");
        let request = CollectorRequest::decode(method, &payload).expect("payload decodes");
        self.calls.lock().unwrap().push((method, request));

        match self.behavior {
            ChannelBehavior::Succeed => Box::pin(future::ready(Ok(Bytes::new()))),
            ChannelBehavior::Stall => Box::pin(async move {
                tokio::time::sleep(timeout).await;
                Err(TransportError::Timeout {
                    path: path.to_owned(),
                    timeout,
                })
            }),
        }
    }

    fn close(&self) -> Result<(), TransportError> {
        self.closed.fetch_add(1, Ordering::SeqCst);
        Ok(())
    }
}

/// A connector that always hands out the same channel.
#[derive(Debug)]
pub(crate) struct FixedConnector(pub(crate) Arc<RecordingChannel>);

impl Connector for FixedConnector {
    fn connect(&self, _address: &str) -> Result<Arc<dyn UnaryChannel>, TransportError> {
        Ok(self.0.clone())
    }
}

/// A connector that always fails.
#[derive(Debug)]
pub(crate) struct RefusingConnector;

impl Connector for RefusingConnector {
    fn connect(&self, address: &str) -> Result<Arc<dyn UnaryChannel>, TransportError> {
        Err(TransportError::Connect {
            address: address.to_owned(),
            err: std::io::Error::from(std::io::ErrorKind::ConnectionRefused),
        })
    }
}

/// A tracing layer that counts events at WARN level.
#[derive(Clone, Debug, Default)]
pub(crate) struct WarnCounter(Arc<AtomicUsize>);

impl WarnCounter {
    pub(crate) fn count(&self) -> usize {
        self.0.load(Ordering::SeqCst)
    }
}

impl<S: Subscriber> Layer<S> for WarnCounter {
    fn on_event(&self, event: &Event<'_>, _ctx: Context<'_, S>) {
        if *event.metadata().level() == Level::WARN {
            self.0.fetch_add(1, Ordering::SeqCst);
        }
    }
}
