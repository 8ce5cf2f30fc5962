// Copyright (c) The testwire Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

use crate::{
    errors::{ExpectedError, Result},
    listen::ListenOpts,
    output::{OutputContext, OutputOpts},
    replay::ReplayOpts,
};
use clap::{Parser, Subcommand};
use std::future::Future;
use testwire_metadata::TestwireExitCode;

/// Forwards test host events to a testwire collector.
///
/// `testwire replay` feeds a recorded stream of host events, one JSON object per line, through the
/// reporter exactly as a live host would. `testwire listen` runs a collector that prints every call
/// it receives, for debugging reporters.
#[derive(Debug, Parser)]
#[command(version, name = "testwire", styles = crate::output::clap_styles::style())]
pub struct TestwireApp {
    #[command(flatten)]
    output: OutputOpts,

    #[command(subcommand)]
    command: Command,
}

impl TestwireApp {
    /// Initializes the output context.
    pub fn init_output(&self) -> OutputContext {
        self.output.init()
    }

    /// Executes the app, returning the process exit code.
    pub fn exec(self, output: OutputContext) -> Result<i32> {
        match self.command {
            Command::Replay(opts) => {
                block_on(opts.exec(output.verbose))??;
            }
            Command::Listen(opts) => {
                block_on(opts.exec())??;
            }
        }
        Ok(TestwireExitCode::OK)
    }
}

#[derive(Debug, Subcommand)]
enum Command {
    /// Replay recorded host events to a collector
    ///
    /// Reads events from INPUT, or standard input if no file is given, and delivers them to the
    /// reporter in order. If the input ends or Ctrl-C is pressed before the run ends, the run is
    /// reported as interrupted.
    ///
    /// Reporter options are read from the command line, then the config file, then the
    /// TESTWIRE_* environment variables.
    Replay(ReplayOpts),

    /// Run a collector that prints each call it receives
    ///
    /// Every call is printed to standard output as a JSON object with `method` and `message`
    /// fields, one per line.
    Listen(ListenOpts),
}

/// Runs `future` to completion on a single-threaded runtime.
///
/// A single thread keeps the reporter's background sends in the order they were made.
fn block_on<F: Future>(future: F) -> Result<F::Output> {
    let runtime = tokio::runtime::Builder::new_current_thread()
        .enable_all()
        .build()
        .map_err(|err| ExpectedError::RuntimeBuildError { err })?;
    Ok(runtime.block_on(future))
}
