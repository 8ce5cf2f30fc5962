// Copyright (c) The testwire Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

use super::Reporter;
use crate::{
    config::{EnvSnapshot, ReporterOptions, ResolvedConfig},
    errors::{ConfigResolveError, DisplayErrorChain, MapEventError},
    host::{FullResult, RunConfig, Suite, TestCase, TestError, TestResult, TestStep},
    ids::{IdDeriver, RunId},
    mapping::{
        StepIds, SuiteEndTiming, aggregate_suite_status, encode_timestamp, map_host_error,
        map_run_begin, map_run_end, map_std_err, map_step_begin, map_step_end, map_suite_begin,
        map_suite_end, map_test_begin, map_test_end, map_test_failure, map_test_status, now_ms,
        sanitize_run_duration, sanitize_run_start, walk_post_order, walk_pre_order,
    },
    transport::{Connector, GatewayState, TcpConnector, TransportGateway},
};
use std::collections::HashMap;
use testwire_metadata::{TestStatus, WireMessage};
use tracing::{debug, error, info, trace, warn};

/// Logs at info level when verbose, and at debug level otherwise.
macro_rules! log_event {
    ($verbose:expr, $($arg:tt)+) => {
        if $verbose {
            info!($($arg)+);
        } else {
            debug!($($arg)+);
        }
    };
}

/// Per-run state, created when the run begins.
#[derive(Debug)]
struct RunContext {
    ids: IdDeriver,
    start_ms: f64,
    root: Suite,
    // Final status of each test, keyed by test id. Retries overwrite earlier attempts.
    statuses: HashMap<String, TestStatus>,
}

impl RunContext {
    fn run_id(&self) -> &str {
        self.ids.run_id().as_str()
    }
}

/// The [`Reporter`] that forwards every event to a collector.
///
/// The reporter is a coordinator: for each callback it derives identifiers, builds one message
/// with the mappers in [`mapping`](crate::mapping), and hands the message to a
/// [`TransportGateway`]. It never blocks on the network and never fails: transport problems disable
/// the gateway, and events that can't be mapped are logged and skipped.
///
/// Must be used from within a tokio runtime; without one, the gateway is disabled when the run
/// begins.
#[derive(Debug)]
pub struct ObserverReporter {
    config: ResolvedConfig,
    connector: Box<dyn Connector>,
    gateway: TransportGateway,
    run: Option<RunContext>,
}

impl ObserverReporter {
    /// Creates a reporter that connects to the collector over TCP.
    pub fn new(config: ResolvedConfig) -> Self {
        Self::with_connector(config, Box::new(TcpConnector))
    }

    /// Resolves configuration from `options` and `env`, then creates a reporter that connects over
    /// TCP.
    pub fn from_options(
        options: &ReporterOptions,
        env: &EnvSnapshot,
    ) -> Result<Self, ConfigResolveError> {
        Ok(Self::new(ResolvedConfig::resolve(options, env)?))
    }

    /// Creates a reporter that obtains its channel from `connector`.
    pub fn with_connector(config: ResolvedConfig, connector: Box<dyn Connector>) -> Self {
        let gateway = TransportGateway::new(config.address.clone(), config.call_timeout);
        Self {
            config,
            connector,
            gateway,
            run: None,
        }
    }

    /// Returns the resolved configuration.
    pub fn config(&self) -> &ResolvedConfig {
        &self.config
    }

    /// Returns the id of the current run, once the run has begun.
    pub fn run_id(&self) -> Option<&RunId> {
        self.run.as_ref().map(|run| run.ids.run_id())
    }

    /// Returns the state of the transport gateway.
    pub fn gateway_state(&self) -> GatewayState {
        self.gateway.state()
    }

    /// Returns the run context if the run has begun and the gateway is sending.
    fn active_run(&mut self) -> Option<(&mut RunContext, &mut TransportGateway)> {
        let run = self.run.as_mut()?;
        if !self.gateway.is_active() {
            return None;
        }
        Some((run, &mut self.gateway))
    }
}

impl Reporter for ObserverReporter {
    fn on_begin(&mut self, config: &RunConfig, suite: &Suite) {
        let start_ms = now_ms();
        let run_id = RunId::resolve(self.config.run_id.as_deref());
        info!(
            "run {run_id} started: {} tests, collector at {}",
            suite.test_count(),
            self.config.address,
        );

        self.run = Some(RunContext {
            ids: IdDeriver::new(self.config.id_strategy, run_id),
            start_ms,
            root: suite.clone(),
            statuses: HashMap::new(),
        });

        if !self.config.enabled {
            debug!("reporting to collector is disabled");
            return;
        }
        self.gateway.connect(&*self.connector);

        let verbose = self.config.verbose;
        let Some((run, gateway)) = self.active_run() else {
            return;
        };

        let visits = walk_pre_order(&run.root);
        let message = map_run_begin(&mut run.ids, run.start_ms, config, &visits, &run.root);
        dispatch(gateway, message);

        let Ok(run_start) = encode_timestamp(run.start_ms) else {
            return;
        };
        for visit in &visits {
            log_event!(verbose, "suite begin: {}", visit.path);
            gateway.send(map_suite_begin(&mut run.ids, visit, run_start));
        }
    }

    fn on_end(&mut self, result: &FullResult) {
        info!("run finished with status {}", result.status);

        let verbose = self.config.verbose;
        let Some((run, gateway)) = self.active_run() else {
            return;
        };

        let timing = SuiteEndTiming {
            start_time: sanitize_run_start(None, run.start_ms),
            end_time: sanitize_run_start(Some(now_ms()), run.start_ms),
            duration: sanitize_run_duration(result.duration),
            final_result: result.status,
        };

        for visit in walk_post_order(&run.root) {
            let statuses = visit
                .suite
                .all_tests()
                .into_iter()
                .filter_map(|test| run.statuses.get(&test.id).copied());
            let status = aggregate_suite_status(statuses, result.status);
            log_event!(verbose, "suite end: {} ({status})", visit.path);
            gateway.send(map_suite_end(&mut run.ids, &visit, &timing, status));
        }

        gateway.send(map_run_end(run.run_id(), result, run.start_ms));
    }

    fn on_test_begin(&mut self, test: &TestCase, result: &TestResult) {
        log_event!(
            self.config.verbose,
            "test begin: {} (retry {})",
            test.title,
            result.retry
        );
        let Some((run, gateway)) = self.active_run() else {
            return;
        };

        let suite_id = run.ids.suite_id(&test.suite_path);
        dispatch(
            gateway,
            map_test_begin(run.run_id(), &suite_id, test, result),
        );
    }

    fn on_test_end(&mut self, test: &TestCase, result: &TestResult) {
        log_event!(
            self.config.verbose,
            "test end: {} ({}, {}ms)",
            test.title,
            result.status,
            result.duration
        );
        if let Some(run) = &mut self.run {
            run.statuses
                .insert(test.id.clone(), map_test_status(result.status));
            // Steps of this test can't be referenced again.
            run.ids.forget_test(&test.id);
        }
        let Some((run, gateway)) = self.active_run() else {
            return;
        };

        let suite_id = run.ids.suite_id(&test.suite_path);
        dispatch(gateway, map_test_end(run.run_id(), &suite_id, test, result));
    }

    fn on_test_fail(&mut self, test: &TestCase, result: &TestResult) {
        log_event!(self.config.verbose, "test failed: {}", test.title);
        let Some((run, gateway)) = self.active_run() else {
            return;
        };

        dispatch(
            gateway,
            map_test_failure(run.run_id(), test, result, now_ms()),
        );
    }

    fn on_step_begin(&mut self, test: &TestCase, result: &TestResult, step: &TestStep) {
        log_event!(self.config.verbose, "step begin: {}", step.title());
        let Some((run, gateway)) = self.active_run() else {
            return;
        };

        let ids = step_ids(&mut run.ids, test, step);
        dispatch(
            gateway,
            map_step_begin(run.run_id(), ids, test, result, step),
        );
    }

    fn on_step_end(&mut self, test: &TestCase, result: &TestResult, step: &TestStep) {
        log_event!(
            self.config.verbose,
            "step end: {} ({}ms)",
            step.title(),
            step.duration.unwrap_or_default()
        );
        let Some((run, gateway)) = self.active_run() else {
            return;
        };

        let ids = step_ids(&mut run.ids, test, step);
        dispatch(gateway, map_step_end(run.run_id(), ids, test, result, step));
    }

    fn on_error(&mut self, error: &TestError) {
        match &error.stack {
            Some(stack) => error!(
                "host reported an error: {}\n{stack}",
                error.message.as_deref().unwrap_or_default()
            ),
            None => error!(
                "host reported an error: {}",
                error.message.as_deref().unwrap_or_default()
            ),
        }
        let Some((run, gateway)) = self.active_run() else {
            return;
        };

        dispatch(gateway, map_host_error(run.run_id(), error, now_ms()));
    }

    fn on_std_out(&mut self, chunk: &str, test: Option<&TestCase>, _result: Option<&TestResult>) {
        trace!(
            test = test.map(|test| test.id.as_str()),
            "stdout: {}",
            chunk.trim_end()
        );
    }

    fn on_std_err(&mut self, chunk: &str, test: Option<&TestCase>, _result: Option<&TestResult>) {
        log_event!(self.config.verbose, "stderr: {}", chunk.trim_end());
        let Some((run, gateway)) = self.active_run() else {
            return;
        };

        dispatch(gateway, map_std_err(run.run_id(), chunk, test, now_ms()));
    }

    async fn on_exit(&mut self) {
        debug!("host exiting, closing collector channel");
        self.gateway.shutdown().await;
    }
}

fn step_ids(ids: &mut IdDeriver, test: &TestCase, step: &TestStep) -> StepIds {
    StepIds {
        step_id: ids.step_id(&test.id, &step.title_path),
        parent_step_id: step
            .parent_path()
            .map(|parent| ids.step_id(&test.id, &parent)),
    }
}

/// Sends a mapped message, or logs why the event couldn't be mapped.
fn dispatch<M: WireMessage>(gateway: &mut TransportGateway, message: Result<M, MapEventError>) {
    match message {
        Ok(message) => {
            gateway.send(message);
        }
        Err(error) => warn!(
            "skipping {} event: {}",
            error.event(),
            DisplayErrorChain::new(&error)
        ),
    }
}
