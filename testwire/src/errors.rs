// Copyright (c) The testwire Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

use crate::output::{NO_HEADING_TARGET, StderrStyles};
use camino::Utf8PathBuf;
use owo_colors::OwoColorize;
use std::error::Error;
use testwire_metadata::TestwireExitCode;
use testwire_reporter::errors::ConfigResolveError;
use thiserror::Error;
use tracing::error;

pub(crate) type Result<T, E = ExpectedError> = std::result::Result<T, E>;

// The #[error()] strings are short summaries. Errors are meant to be printed with
// `display_to_stderr`, which adds context and the chain of causes.

/// An error that `testwire` anticipates and reports with a documented exit code.
#[derive(Debug, Error)]
#[doc(hidden)]
pub enum ExpectedError {
    #[error("failed to read config file")]
    ConfigReadError {
        path: Utf8PathBuf,
        #[source]
        err: config::ConfigError,
    },
    #[error("invalid reporter configuration")]
    ConfigResolveError {
        #[from]
        err: ConfigResolveError,
    },
    #[error("failed to open input")]
    InputOpenError {
        path: Utf8PathBuf,
        #[source]
        err: std::io::Error,
    },
    #[error("failed to read input")]
    InputReadError {
        #[source]
        err: std::io::Error,
    },
    #[error("invalid event on line {line}")]
    InvalidEvent {
        line: usize,
        #[source]
        err: serde_json::Error,
    },
    #[error("failed to start async runtime")]
    RuntimeBuildError {
        #[source]
        err: std::io::Error,
    },
    #[error("failed to bind {address}")]
    BindError {
        address: String,
        #[source]
        err: std::io::Error,
    },
    #[error("failed to accept connection")]
    AcceptError {
        #[source]
        err: std::io::Error,
    },
    #[error("failed to serialize output")]
    SerializeOutputError {
        #[source]
        err: serde_json::Error,
    },
    #[error("failed to write output")]
    WriteOutputError {
        #[source]
        err: std::io::Error,
    },
}

impl ExpectedError {
    pub(crate) fn config_read_error(
        path: impl Into<Utf8PathBuf>,
        err: config::ConfigError,
    ) -> Self {
        Self::ConfigReadError {
            path: path.into(),
            err,
        }
    }

    /// Returns the exit code for the process.
    pub fn process_exit_code(&self) -> i32 {
        match self {
            Self::ConfigReadError { .. } | Self::ConfigResolveError { .. } => {
                TestwireExitCode::CONFIG_ERROR
            }
            Self::InputOpenError { .. } | Self::InputReadError { .. } => {
                TestwireExitCode::INPUT_READ_ERROR
            }
            Self::InvalidEvent { .. } => TestwireExitCode::INVALID_EVENT_STREAM,
            Self::RuntimeBuildError { .. } => TestwireExitCode::SETUP_ERROR,
            Self::BindError { .. } | Self::AcceptError { .. } => TestwireExitCode::LISTEN_ERROR,
            Self::SerializeOutputError { .. } | Self::WriteOutputError { .. } => {
                TestwireExitCode::WRITE_OUTPUT_ERROR
            }
        }
    }

    /// Displays this error to stderr.
    pub fn display_to_stderr(&self, styles: &StderrStyles) {
        let mut next_error = match self {
            Self::ConfigReadError { path, err } => {
                error!("failed to read config file at {}", path.style(styles.bold));
                Some(err as &dyn Error)
            }
            Self::ConfigResolveError { err } => {
                error!("invalid reporter configuration");
                Some(err as &dyn Error)
            }
            Self::InputOpenError { path, err } => {
                error!("failed to open input file {}", path.style(styles.bold));
                Some(err as &dyn Error)
            }
            Self::InputReadError { err } => {
                error!("failed to read input");
                Some(err as &dyn Error)
            }
            Self::InvalidEvent { line, err } => {
                error!("invalid event on line {}", line.style(styles.bold));
                Some(err as &dyn Error)
            }
            Self::RuntimeBuildError { err } => {
                error!("failed to start async runtime");
                Some(err as &dyn Error)
            }
            Self::BindError { address, err } => {
                error!("failed to bind {}", address.style(styles.bold));
                Some(err as &dyn Error)
            }
            Self::AcceptError { err } => {
                error!("failed to accept connection");
                Some(err as &dyn Error)
            }
            Self::SerializeOutputError { err } => {
                error!("failed to serialize output");
                Some(err as &dyn Error)
            }
            Self::WriteOutputError { err } => {
                if err.kind() == std::io::ErrorKind::BrokenPipe {
                    error!(
                        "{}",
                        "failed to write output: the reader went away".style(styles.warning_text)
                    );
                    None
                } else {
                    error!("failed to write output");
                    Some(err as &dyn Error)
                }
            }
        };

        while let Some(err) = next_error {
            error!(target: NO_HEADING_TARGET, "\nCaused by:\n  {}", err);
            next_error = err.source();
        }
    }
}
