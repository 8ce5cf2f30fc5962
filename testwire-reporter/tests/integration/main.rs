// Copyright (c) The testwire Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Runs the reporter against a collector listening on a real socket.

mod collector;

use collector::{Collector, Reply};
use color_eyre::eyre::{Result, WrapErr};
use indoc::indoc;
use pretty_assertions::assert_eq;
use std::time::Duration;
use testwire_metadata::{CollectorMethod, CollectorRequest, StdErrorEventRequest, TestStatus};
use testwire_reporter::{
    config::{EnvSnapshot, ReporterOptions},
    host::HostEvent,
    ids::IdStrategy,
    reporter::{ObserverReporter, Reporter},
    transport::{GatewayState, TcpConnector, TransportGateway},
};

/// A recorded run: one file with a passing test and a test that fails inside a nested step.
const RECORDED_RUN: &str = indoc! {r#"
    {"event": "run-begin", "config": {"workers": 1, "projects": ["chromium"]}, "suite": {"title": "", "suites": [{"title": "chromium", "kind": "project", "suites": [{"title": "math.spec.ts", "kind": "file", "tests": [{"id": "t-add", "title": "adds", "suitePath": ["", "chromium", "math.spec.ts"]}, {"id": "t-div", "title": "divides", "suitePath": ["", "chromium", "math.spec.ts"]}]}]}]}}
    {"event": "test-begin", "test": {"id": "t-add", "title": "adds", "suitePath": ["", "chromium", "math.spec.ts"]}, "result": {"status": "passed", "startTime": 1704110400000}}
    {"event": "test-end", "test": {"id": "t-add", "title": "adds", "suitePath": ["", "chromium", "math.spec.ts"]}, "result": {"status": "passed", "startTime": 1704110400000, "duration": 12}}
    {"event": "test-begin", "test": {"id": "t-div", "title": "divides", "suitePath": ["", "chromium", "math.spec.ts"]}, "result": {"status": "passed", "startTime": 1704110400020}}
    {"event": "step-begin", "test": {"id": "t-div", "title": "divides", "suitePath": ["", "chromium", "math.spec.ts"]}, "result": {"status": "passed", "startTime": 1704110400020}, "step": {"titlePath": ["by zero"], "category": "test.step", "startTime": 1704110400021}}
    {"event": "step-begin", "test": {"id": "t-div", "title": "divides", "suitePath": ["", "chromium", "math.spec.ts"]}, "result": {"status": "passed", "startTime": 1704110400020}, "step": {"titlePath": ["by zero", "expect"], "category": "expect", "startTime": 1704110400022}}
    {"event": "step-end", "test": {"id": "t-div", "title": "divides", "suitePath": ["", "chromium", "math.spec.ts"]}, "result": {"status": "passed", "startTime": 1704110400020}, "step": {"titlePath": ["by zero", "expect"], "category": "expect", "startTime": 1704110400022, "duration": 1, "error": {"message": "expected Infinity to be finite"}}}
    {"event": "step-end", "test": {"id": "t-div", "title": "divides", "suitePath": ["", "chromium", "math.spec.ts"]}, "result": {"status": "passed", "startTime": 1704110400020}, "step": {"titlePath": ["by zero"], "category": "test.step", "startTime": 1704110400021, "duration": 3, "error": {"message": "expected Infinity to be finite"}}}
    {"event": "stderr", "chunk": "warning: slow division\n", "test": {"id": "t-div", "title": "divides", "suitePath": ["", "chromium", "math.spec.ts"]}}
    {"event": "test-end", "test": {"id": "t-div", "title": "divides", "suitePath": ["", "chromium", "math.spec.ts"]}, "result": {"status": "failed", "startTime": 1704110400020, "duration": 5, "errors": [{"message": "expected Infinity to be finite", "stack": "at math.spec.ts:9:3"}]}}
    {"event": "test-fail", "test": {"id": "t-div", "title": "divides", "suitePath": ["", "chromium", "math.spec.ts"]}, "result": {"status": "failed", "startTime": 1704110400020, "duration": 5, "errors": [{"message": "expected Infinity to be finite", "stack": "at math.spec.ts:9:3"}]}}
    {"event": "run-end", "result": {"status": "failed", "startTime": 1704110400000, "duration": 40}}
"#};

fn recorded_events() -> Result<Vec<HostEvent>> {
    RECORDED_RUN
        .lines()
        .enumerate()
        .map(|(index, line)| {
            serde_json::from_str(line).wrap_err_with(|| format!("line {} is invalid", index + 1))
        })
        .collect()
}

fn options(address: &str, id_strategy: IdStrategy) -> ReporterOptions {
    ReporterOptions {
        address: Some(address.to_owned()),
        enabled: Some(true),
        call_timeout_ms: Some(2000),
        verbose: Some(true),
        run_id: Some("integration-run".to_owned()),
        id_strategy: Some(id_strategy),
    }
}

fn reporter(address: &str, id_strategy: IdStrategy) -> Result<ObserverReporter> {
    let reporter =
        ObserverReporter::from_options(&options(address, id_strategy), &EnvSnapshot::default())?;
    Ok(reporter)
}

#[tokio::test]
async fn recorded_run_reaches_collector() -> Result<()> {
    let collector = Collector::start(Reply::Ok).await?;
    let mut reporter = reporter(collector.address(), IdStrategy::Readable)?;

    for event in recorded_events()? {
        event.deliver(&mut reporter).await;
    }
    reporter.on_exit().await;

    assert_eq!(
        collector.methods(),
        [
            CollectorMethod::MapTestRun,
            CollectorMethod::ReportSuiteBegin,
            CollectorMethod::ReportSuiteBegin,
            CollectorMethod::ReportSuiteBegin,
            CollectorMethod::ReportTestBegin,
            CollectorMethod::ReportTestEnd,
            CollectorMethod::ReportTestBegin,
            CollectorMethod::ReportStepBegin,
            CollectorMethod::ReportStepBegin,
            CollectorMethod::ReportStepEnd,
            CollectorMethod::ReportStepEnd,
            CollectorMethod::ReportStdError,
            CollectorMethod::ReportTestEnd,
            CollectorMethod::ReportTestFailure,
            CollectorMethod::ReportSuiteEnd,
            CollectorMethod::ReportSuiteEnd,
            CollectorMethod::ReportSuiteEnd,
            CollectorMethod::ReportRunEnd,
        ]
    );

    let received = collector.received();
    let CollectorRequest::MapTestRun(map) = &received[0] else {
        panic!("first request is the run map: {:?}", received[0]);
    };
    assert_eq!(map.run_id, "integration-run");
    assert_eq!(map.total_tests, 2);
    let suite_ids: Vec<_> = map.suites.iter().map(|suite| suite.id.as_str()).collect();
    assert_eq!(
        suite_ids,
        [
            "integration-run.suite._root",
            "integration-run.suite.chromium",
            "integration-run.suite.chromium.math_2espec_2ets",
        ]
    );

    let steps: Vec<_> = received
        .iter()
        .filter_map(|request| match request {
            CollectorRequest::ReportStepEnd(end) => Some(&end.step),
            _ => None,
        })
        .collect();
    assert_eq!(steps[0].id, "t-div.step.by_20zero.expect");
    assert_eq!(steps[0].parent_step_id.as_deref(), Some("t-div.step.by_20zero"));
    assert_eq!(steps[0].status, TestStatus::Failed);
    assert_eq!(steps[1].parent_step_id, None);

    let suite_statuses: Vec<_> = received
        .iter()
        .filter_map(|request| match request {
            CollectorRequest::ReportSuiteEnd(end) => {
                Some((end.suite.name.as_str(), end.suite.status))
            }
            _ => None,
        })
        .collect();
    assert_eq!(
        suite_statuses,
        [
            ("math.spec.ts", TestStatus::Failed),
            ("chromium", TestStatus::Failed),
            ("root", TestStatus::Failed),
        ]
    );

    let Some(CollectorRequest::ReportRunEnd(end)) = received.last() else {
        panic!("last request is the run end");
    };
    assert_eq!(end.final_status, TestStatus::Failed);
    assert_eq!(end.start_time.seconds, 1_704_110_400);
    assert_eq!(end.duration.nanos, 40_000_000);

    assert_eq!(reporter.gateway_state(), GatewayState::Closed);
    Ok(())
}

#[tokio::test]
async fn collector_errors_disable_reporting() -> Result<()> {
    let collector = Collector::start(Reply::Error).await?;
    let mut reporter = reporter(collector.address(), IdStrategy::Hashed)?;
    let events = recorded_events()?;

    events[0].deliver(&mut reporter).await;
    // Let the background sends reach the collector and fail.
    tokio::time::sleep(Duration::from_millis(200)).await;
    assert_eq!(reporter.gateway_state(), GatewayState::Degraded);

    let received_before = collector.received().len();
    assert!(received_before >= 1, "the collector saw the first request");

    for event in &events[1..] {
        event.deliver(&mut reporter).await;
    }
    reporter.on_exit().await;

    assert_eq!(
        collector.received().len(),
        received_before,
        "nothing is sent once reporting is disabled"
    );
    assert_eq!(reporter.gateway_state(), GatewayState::Closed);
    Ok(())
}

#[tokio::test]
async fn unreachable_collector_does_not_block_the_run() -> Result<()> {
    // Bind and drop a listener to find a port nothing listens on.
    let address = {
        let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await?;
        listener.local_addr()?.to_string()
    };
    let mut reporter = reporter(&address, IdStrategy::Hashed)?;

    let run = async {
        for event in recorded_events()? {
            event.deliver(&mut reporter).await;
        }
        reporter.on_exit().await;
        Ok::<_, color_eyre::Report>(())
    };
    tokio::time::timeout(Duration::from_secs(10), run)
        .await
        .wrap_err("run did not finish")??;

    assert_eq!(reporter.gateway_state(), GatewayState::Closed);
    Ok(())
}

#[tokio::test]
async fn queued_calls_do_not_count_against_the_deadline() -> Result<()> {
    // Each call is well within its deadline, but the burst as a whole is not.
    let collector = Collector::start(Reply::Delayed(Duration::from_millis(30))).await?;
    let mut gateway = TransportGateway::new(collector.address(), Duration::from_millis(200));
    assert_eq!(gateway.connect(&TcpConnector), GatewayState::Connected);

    const SENDS: usize = 20;
    for n in 0..SENDS {
        let message = StdErrorEventRequest {
            run_id: "burst".to_owned(),
            message: format!("chunk {n}"),
            ..Default::default()
        };
        assert!(gateway.send(message), "send {n} is dispatched");
    }

    let delivered = async {
        while collector.received().len() < SENDS {
            tokio::time::sleep(Duration::from_millis(10)).await;
        }
    };
    tokio::time::timeout(Duration::from_secs(10), delivered)
        .await
        .wrap_err("collector did not receive every call")?;
    gateway.flush().await;

    assert_eq!(gateway.state(), GatewayState::Connected);
    assert_eq!(collector.received().len(), SENDS);
    Ok(())
}
