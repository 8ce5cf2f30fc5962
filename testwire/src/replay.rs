// Copyright (c) The testwire Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Replaying recorded host event streams.

use crate::errors::{ExpectedError, Result};
use camino::{Utf8Path, Utf8PathBuf};
use clap::Args;
use config::{Config, File, FileFormat};
use std::future::Future;
use testwire_reporter::{
    config::{EnvSnapshot, ReporterOptions},
    host::{FullResult, HostEvent, HostRunStatus},
    ids::IdStrategy,
    reporter::{ObserverReporter, Reporter},
};
use tokio::io::{AsyncBufRead, AsyncBufReadExt, BufReader};
use tracing::{debug, info, warn};

#[derive(Debug, Args)]
pub(crate) struct ReplayOpts {
    /// Recorded host events, one JSON object per line [default: standard input]
    #[arg(value_name = "INPUT")]
    input: Option<Utf8PathBuf>,

    #[command(flatten)]
    reporter: ReporterArgs,
}

impl ReplayOpts {
    pub(crate) async fn exec(self, verbose: bool) -> Result<ReplaySummary> {
        let options = self.reporter.to_options(verbose)?;
        let mut reporter = ObserverReporter::from_options(&options, &EnvSnapshot::capture())?;
        debug!(config = ?reporter.config(), "resolved reporter configuration");

        let interrupt = async {
            if let Err(error) = tokio::signal::ctrl_c().await {
                warn!("failed to listen for Ctrl-C, replay can't be interrupted: {error}");
                std::future::pending::<()>().await;
            }
        };

        let summary = match &self.input {
            Some(path) => {
                let file = tokio::fs::File::open(path).await.map_err(|err| {
                    ExpectedError::InputOpenError {
                        path: path.clone(),
                        err,
                    }
                })?;
                replay_events(BufReader::new(file), &mut reporter, interrupt).await?
            }
            None => {
                replay_events(BufReader::new(tokio::io::stdin()), &mut reporter, interrupt).await?
            }
        };

        info!(
            "replayed {} events{}",
            summary.events,
            if summary.interrupted {
                " (interrupted)"
            } else {
                ""
            }
        );
        Ok(summary)
    }
}

/// Reporter settings accepted on the command line.
#[derive(Debug, Args)]
#[command(next_help_heading = "Reporter options")]
struct ReporterArgs {
    /// TOML file with reporter options
    #[arg(long, value_name = "PATH")]
    config: Option<Utf8PathBuf>,

    /// Collector address, as host:port
    #[arg(long, value_name = "ADDR")]
    address: Option<String>,

    /// Deadline for each call to the collector, in milliseconds
    #[arg(long, value_name = "MS")]
    call_timeout_ms: Option<u64>,

    /// Don't send anything to the collector
    #[arg(long)]
    disable: bool,

    /// Run identifier to report instead of a random one
    #[arg(long, value_name = "ID")]
    run_id: Option<String>,

    /// How suite and step identifiers are derived: hashed, readable
    #[arg(long, value_name = "STRATEGY")]
    id_strategy: Option<IdStrategy>,
}

impl ReporterArgs {
    /// Loads options from the config file, if any, then applies command-line overrides.
    fn to_options(&self, verbose: bool) -> Result<ReporterOptions> {
        let mut options = match &self.config {
            Some(path) => read_options(path)?,
            None => ReporterOptions::default(),
        };

        if let Some(address) = &self.address {
            options.address = Some(address.clone());
        }
        if let Some(call_timeout_ms) = self.call_timeout_ms {
            options.call_timeout_ms = Some(call_timeout_ms);
        }
        if self.disable {
            options.enabled = Some(false);
        }
        if let Some(run_id) = &self.run_id {
            options.run_id = Some(run_id.clone());
        }
        if let Some(id_strategy) = self.id_strategy {
            options.id_strategy = Some(id_strategy);
        }
        if verbose {
            options.verbose = Some(true);
        }
        Ok(options)
    }
}

fn read_options(path: &Utf8Path) -> Result<ReporterOptions> {
    Config::builder()
        .add_source(File::new(path.as_str(), FileFormat::Toml))
        .build()
        .and_then(|config| config.try_deserialize())
        .map_err(|err| ExpectedError::config_read_error(path, err))
}

/// What happened during a replay.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub(crate) struct ReplaySummary {
    /// The number of events delivered from the input.
    pub(crate) events: usize,
    /// Whether the replay was cut short by an interrupt.
    pub(crate) interrupted: bool,
    /// Whether a run-end event was synthesized because the input had none.
    pub(crate) synthesized_run_end: bool,
}

/// Delivers every event in `input` to `reporter`, in order.
///
/// Blank lines are skipped. Reading stops at an `exit` event, at the end of the input, or when
/// `interrupt` completes. A run that began but never ended is then ended with an `interrupted`
/// status, and the reporter is told the process is exiting if the input didn't say so. This also
/// happens when a line fails to parse, before the error is returned. An `exit` event that arrives
/// while the run is still open gets the same `interrupted` run end first.
pub(crate) async fn replay_events<I, R>(
    input: I,
    reporter: &mut R,
    interrupt: impl Future<Output = ()>,
) -> Result<ReplaySummary>
where
    I: AsyncBufRead + Unpin,
    R: Reporter,
{
    let mut lines = input.lines();
    let mut summary = ReplaySummary::default();
    let mut run_begun = false;
    let mut run_ended = false;
    let mut exited = false;
    let mut line_number = 0;
    tokio::pin!(interrupt);

    let result = loop {
        let line = tokio::select! {
            biased;
            () = &mut interrupt => {
                warn!("interrupted, ending the run");
                summary.interrupted = true;
                break Ok(());
            }
            line = lines.next_line() => line,
        };

        let line = match line {
            Ok(Some(line)) => line,
            Ok(None) => break Ok(()),
            Err(err) => break Err(ExpectedError::InputReadError { err }),
        };
        line_number += 1;
        if line.trim().is_empty() {
            continue;
        }

        let event: HostEvent = match serde_json::from_str(&line) {
            Ok(event) => event,
            Err(err) => {
                break Err(ExpectedError::InvalidEvent {
                    line: line_number,
                    err,
                });
            }
        };

        match &event {
            HostEvent::RunBegin { .. } => run_begun = true,
            HostEvent::RunEnd { .. } => run_ended = true,
            HostEvent::Exit => {
                if run_begun && !run_ended {
                    debug!("process exiting before the run ended, synthesizing run end");
                    end_interrupted_run(reporter, &mut summary);
                    run_ended = true;
                }
                exited = true;
            }
            _ => {}
        }
        event.deliver(reporter).await;
        summary.events += 1;

        if exited {
            break Ok(());
        }
    };

    if run_begun && !run_ended {
        debug!("input ended before the run did, synthesizing run end");
        end_interrupted_run(reporter, &mut summary);
    }
    if !exited {
        reporter.on_exit().await;
    }

    result.map(|()| summary)
}

fn end_interrupted_run<R: Reporter>(reporter: &mut R, summary: &mut ReplaySummary) {
    reporter.on_end(&FullResult {
        status: HostRunStatus::Interrupted,
        start_time: None,
        duration: None,
    });
    summary.synthesized_run_end = true;
}
