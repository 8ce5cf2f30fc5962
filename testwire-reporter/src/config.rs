// Copyright (c) The testwire Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Reporter configuration.
//!
//! Configuration is resolved exactly once, when the reporter is constructed, from two sources:
//! explicitly supplied [`ReporterOptions`] and an [`EnvSnapshot`] captured from the process
//! environment. Explicit options take priority over the environment, which takes priority over
//! built-in defaults. Nothing reads the environment after resolution.

use crate::{errors::ConfigResolveError, ids::IdStrategy};
use serde::Deserialize;
use std::time::Duration;

/// The collector address used if none is configured.
pub const DEFAULT_ADDRESS: &str = "localhost:50051";

/// The per-call deadline used if none is configured.
pub const DEFAULT_CALL_TIMEOUT: Duration = Duration::from_millis(1000);

/// Options supplied programmatically or through a config file.
///
/// Every field is optional; unset fields fall back to the environment and then to defaults.
#[derive(Clone, Debug, Default, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "kebab-case", deny_unknown_fields)]
pub struct ReporterOptions {
    /// The collector address, as `host:port`.
    pub address: Option<String>,

    /// Whether to send events at all.
    pub enabled: Option<bool>,

    /// The deadline for each call, in milliseconds. Zero means the default.
    pub call_timeout_ms: Option<u64>,

    /// Whether to log every event at info level.
    pub verbose: Option<bool>,

    /// A run identifier to use instead of a randomly generated one.
    pub run_id: Option<String>,

    /// How suite and step identifiers are derived.
    pub id_strategy: Option<IdStrategy>,
}

/// The subset of the process environment that affects the reporter.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct EnvSnapshot {
    /// The value of `TESTWIRE_RUN_ID`.
    pub run_id: Option<String>,

    /// The value of `TESTWIRE_ADDRESS`.
    pub address: Option<String>,

    /// The value of `TESTWIRE_ENABLED`.
    pub enabled: Option<String>,

    /// The value of `TESTWIRE_CALL_TIMEOUT_MS`.
    pub call_timeout_ms: Option<String>,

    /// The value of `TESTWIRE_VERBOSE`.
    pub verbose: Option<String>,
}

impl EnvSnapshot {
    /// The environment variable that overrides the run identifier.
    pub const RUN_ID_VAR: &'static str = "TESTWIRE_RUN_ID";
    /// The environment variable that overrides the collector address.
    pub const ADDRESS_VAR: &'static str = "TESTWIRE_ADDRESS";
    /// The environment variable that disables the reporter when set to `false`.
    pub const ENABLED_VAR: &'static str = "TESTWIRE_ENABLED";
    /// The environment variable that overrides the per-call deadline.
    pub const CALL_TIMEOUT_MS_VAR: &'static str = "TESTWIRE_CALL_TIMEOUT_MS";
    /// The environment variable that turns on verbose logging.
    pub const VERBOSE_VAR: &'static str = "TESTWIRE_VERBOSE";

    /// Captures the relevant variables from the process environment.
    pub fn capture() -> Self {
        Self::from_lookup(|var| std::env::var(var).ok())
    }

    /// Builds a snapshot from an arbitrary lookup function.
    pub fn from_lookup(mut lookup: impl FnMut(&'static str) -> Option<String>) -> Self {
        // An empty variable is treated the same as an unset one.
        let mut get = |var| lookup(var).filter(|value: &String| !value.is_empty());
        Self {
            run_id: get(Self::RUN_ID_VAR),
            address: get(Self::ADDRESS_VAR),
            enabled: get(Self::ENABLED_VAR),
            call_timeout_ms: get(Self::CALL_TIMEOUT_MS_VAR),
            verbose: get(Self::VERBOSE_VAR),
        }
    }
}

/// Fully resolved reporter configuration.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ResolvedConfig {
    /// The collector address.
    pub address: String,

    /// Whether events are sent.
    pub enabled: bool,

    /// The deadline for each call.
    pub call_timeout: Duration,

    /// Whether every event is logged at info level.
    pub verbose: bool,

    /// The run identifier override, if any.
    pub run_id: Option<String>,

    /// How suite and step identifiers are derived.
    pub id_strategy: IdStrategy,
}

impl ResolvedConfig {
    /// Resolves configuration from explicit options and the environment.
    pub fn resolve(
        options: &ReporterOptions,
        env: &EnvSnapshot,
    ) -> Result<Self, ConfigResolveError> {
        let address = options
            .address
            .clone()
            .filter(|address| !address.is_empty())
            .or_else(|| env.address.clone())
            .unwrap_or_else(|| DEFAULT_ADDRESS.to_owned());

        let enabled = match options.enabled {
            Some(enabled) => enabled,
            None => !env
                .enabled
                .as_deref()
                .is_some_and(|value| value.eq_ignore_ascii_case("false")),
        };

        let call_timeout_ms = match options.call_timeout_ms {
            Some(ms) => ms,
            None => match &env.call_timeout_ms {
                Some(value) => {
                    value
                        .trim()
                        .parse()
                        .map_err(|err| ConfigResolveError::InvalidInteger {
                            var: EnvSnapshot::CALL_TIMEOUT_MS_VAR,
                            value: value.clone(),
                            err,
                        })?
                }
                None => 0,
            },
        };
        let call_timeout = if call_timeout_ms == 0 {
            DEFAULT_CALL_TIMEOUT
        } else {
            Duration::from_millis(call_timeout_ms)
        };

        let verbose = options.verbose.unwrap_or_else(|| {
            env.verbose
                .as_deref()
                .is_some_and(|value| value == "1" || value.eq_ignore_ascii_case("true"))
        });

        let run_id = options
            .run_id
            .clone()
            .filter(|run_id| !run_id.is_empty())
            .or_else(|| env.run_id.clone());

        Ok(Self {
            address,
            enabled,
            call_timeout,
            verbose,
            run_id,
            id_strategy: options.id_strategy.unwrap_or_default(),
        })
    }
}
