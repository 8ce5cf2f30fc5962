// Copyright (c) The testwire Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Identifier derivation for runs, suites and steps.
//!
//! Suites and steps have no identifier of their own in the host, so one is derived from their
//! [`TitlePath`]. Derivation is deterministic, so the begin and end events for a node always agree
//! even though they arrive as separate callbacks. The results are cached in an [`IdCache`] keyed by
//! title path, which makes repeated lookups cheap.
//!
//! Two strategies are supported, selected once per run with [`IdStrategy`]:
//!
//! * [`IdStrategy::Hashed`]: the lowercase hex SHA-256 of the colon-joined title path. Fixed length
//!   and reveals nothing about the tree.
//! * [`IdStrategy::Readable`]: the escaped path segments joined with `.`, prefixed by the run id
//!   (suites) or the test id (steps). Meant for reading in logs.

use crate::{errors::ConfigResolveError, host::TitlePath};
use newtype_uuid::{TypedUuid, TypedUuidKind, TypedUuidTag};
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};
use std::{collections::HashMap, fmt, str::FromStr};
use xxhash_rust::xxh3::xxh3_64;

/// The maximum length of a readable identifier, in bytes.
const MAX_READABLE_LEN: usize = 200;

/// Length of the hash suffix appended to truncated readable identifiers.
const HASH_SUFFIX_LEN: usize = 8;

/// The hashed path used for the root suite, whose joined title path is empty.
const HASHED_ROOT: &str = "root";

/// The readable segment string used for the root suite.
///
/// An escaped title can never produce this string, since `_r` is not a valid escape.
const READABLE_ROOT: &str = "_root";

/// How suite and step identifiers are derived.
#[derive(Copy, Clone, Debug, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum IdStrategy {
    /// SHA-256 of the title path.
    #[default]
    Hashed,
    /// Escaped title path segments, prefixed by a scope.
    Readable,
}

impl IdStrategy {
    /// Returns the configuration string for this strategy.
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Hashed => "hashed",
            Self::Readable => "readable",
        }
    }
}

impl fmt::Display for IdStrategy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for IdStrategy {
    type Err = ConfigResolveError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "hashed" => Ok(Self::Hashed),
            "readable" => Ok(Self::Readable),
            other => Err(ConfigResolveError::InvalidIdStrategy {
                var: "id-strategy",
                value: other.to_owned(),
            }),
        }
    }
}

/// The [`TypedUuidKind`] for generated run identifiers.
pub enum RunKind {}

impl TypedUuidKind for RunKind {
    fn tag() -> TypedUuidTag {
        const TAG: TypedUuidTag = TypedUuidTag::new("testwire_run");
        TAG
    }
}

/// A randomly generated run UUID.
pub type RunUuid = TypedUuid<RunKind>;

/// The identifier of a run.
#[derive(Clone, Debug, PartialEq, Eq, Hash)]
pub struct RunId(String);

impl RunId {
    /// Uses `run_id_override` if one is configured, otherwise generates a new random id.
    pub fn resolve(run_id_override: Option<&str>) -> Self {
        match run_id_override {
            Some(run_id) => Self(run_id.to_owned()),
            None => Self(RunUuid::new_v4().to_string()),
        }
    }

    /// Returns the id as a string.
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for RunId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Returns the hashed identifier of the suite at `path`.
pub fn hashed_suite_id(path: &TitlePath) -> String {
    let joined = path.join(":");
    if joined.is_empty() {
        sha256_hex(HASHED_ROOT)
    } else {
        sha256_hex(&joined)
    }
}

/// Returns the hashed identifier of the step at `path` within the test `test_id`.
pub fn hashed_step_id(test_id: &str, path: &TitlePath) -> String {
    sha256_hex(&format!("{test_id}:{}", path.join(":")))
}

/// Returns the readable identifier of the suite at `path` within the run `run_id`.
pub fn readable_suite_id(run_id: &str, path: &TitlePath) -> String {
    // Every suite path starts with the root's empty title, which carries no information.
    let segments = match path.segments().split_first() {
        Some((root, rest)) if root.is_empty() => rest,
        _ => path.segments(),
    };
    truncate_with_hash(format!(
        "{run_id}.suite.{}",
        readable_segments(segments.iter().map(|s| s.as_str()))
    ))
}

/// Returns the readable identifier of the step at `path` within the test `test_id`.
pub fn readable_step_id(test_id: &str, path: &TitlePath) -> String {
    truncate_with_hash(format!(
        "{test_id}.step.{}",
        readable_segments(path.segments().iter().map(|s| s.as_str()))
    ))
}

fn sha256_hex(input: &str) -> String {
    hex::encode(Sha256::digest(input.as_bytes()))
}

/// Escapes each segment and joins them with `.`.
///
/// The escaping is injective:
///
/// - `[A-Za-z0-9-]` are kept as is
/// - `_` → `__`
/// - an empty segment → `_`
/// - every other byte → `_` followed by two lowercase hex digits
fn readable_segments<'a>(segments: impl Iterator<Item = &'a str>) -> String {
    let mut out = String::new();
    for (i, segment) in segments.enumerate() {
        if i > 0 {
            out.push('.');
        }
        if segment.is_empty() {
            out.push('_');
            continue;
        }
        for byte in segment.bytes() {
            match byte {
                b'A'..=b'Z' | b'a'..=b'z' | b'0'..=b'9' | b'-' => out.push(byte as char),
                b'_' => out.push_str("__"),
                other => {
                    out.push('_');
                    out.push_str(&hex::encode([other]));
                }
            }
        }
    }

    if out.is_empty() {
        READABLE_ROOT.to_owned()
    } else {
        out
    }
}

/// Truncates an identifier to [`MAX_READABLE_LEN`] bytes.
///
/// Identifiers that are short enough are returned unchanged. Longer ones are cut at a character
/// boundary and given an 8-character hash suffix derived from the full identifier.
fn truncate_with_hash(id: String) -> String {
    if id.len() <= MAX_READABLE_LEN {
        return id;
    }

    let hash = xxh3_64(id.as_bytes());
    let hash_suffix = format!("{:08x}", hash & 0xFFFF_FFFF);

    let mut prefix_len = MAX_READABLE_LEN - HASH_SUFFIX_LEN;
    while !id.is_char_boundary(prefix_len) {
        prefix_len -= 1;
    }

    let mut result = id[..prefix_len].to_owned();
    result.push_str(&hash_suffix);
    result
}

/// A cache of derived identifiers, keyed by title path.
#[derive(Clone, Debug, Default)]
pub struct IdCache {
    entries: HashMap<TitlePath, String>,
}

impl IdCache {
    /// Creates an empty cache.
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns the identifier for `path`, deriving it with `derive` on first use.
    pub fn get_or_derive(&mut self, path: &TitlePath, derive: impl FnOnce() -> String) -> &str {
        if !self.entries.contains_key(path) {
            self.entries.insert(path.clone(), derive());
        }
        // The entry was inserted above if it was missing.
        self.entries.get(path).map_or("", String::as_str)
    }

    /// Returns the number of cached identifiers.
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Returns true if nothing is cached.
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

/// Derives and caches suite and step identifiers for one run.
#[derive(Clone, Debug)]
pub struct IdDeriver {
    strategy: IdStrategy,
    run_id: RunId,
    suites: IdCache,
    // Keyed by test id. Entries are dropped when the test ends.
    steps: HashMap<String, IdCache>,
}

impl IdDeriver {
    /// Creates a new deriver for the run `run_id`.
    pub fn new(strategy: IdStrategy, run_id: RunId) -> Self {
        Self {
            strategy,
            run_id,
            suites: IdCache::new(),
            steps: HashMap::new(),
        }
    }

    /// Returns the run id.
    pub fn run_id(&self) -> &RunId {
        &self.run_id
    }

    /// Returns the strategy in use.
    pub fn strategy(&self) -> IdStrategy {
        self.strategy
    }

    /// Returns the identifier of the suite at `path`.
    pub fn suite_id(&mut self, path: &TitlePath) -> String {
        let strategy = self.strategy;
        let run_id = self.run_id.as_str();
        self.suites
            .get_or_derive(path, || match strategy {
                IdStrategy::Hashed => hashed_suite_id(path),
                IdStrategy::Readable => readable_suite_id(run_id, path),
            })
            .to_owned()
    }

    /// Returns the identifier of the step at `path` within the test `test_id`.
    pub fn step_id(&mut self, test_id: &str, path: &TitlePath) -> String {
        let strategy = self.strategy;
        self.steps
            .entry(test_id.to_owned())
            .or_default()
            .get_or_derive(path, || match strategy {
                IdStrategy::Hashed => hashed_step_id(test_id, path),
                IdStrategy::Readable => readable_step_id(test_id, path),
            })
            .to_owned()
    }

    /// Drops the cached step identifiers of a test that has ended.
    pub fn forget_test(&mut self, test_id: &str) {
        self.steps.remove(test_id);
    }

    /// Returns the number of tests with cached step identifiers.
    pub fn tracked_tests(&self) -> usize {
        self.steps.len()
    }
}
