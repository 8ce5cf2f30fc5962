// Copyright (c) The testwire Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

use crate::errors::InvalidTimeError;
use chrono::Utc;
use testwire_metadata::{Duration, Timestamp};

const MILLIS_PER_SECOND: f64 = 1000.0;
const NANOS_PER_MILLI: f64 = 1_000_000.0;
const MAX_NANOS: i32 = 999_999_999;

/// Encodes an instant given in milliseconds since the Unix epoch.
///
/// Returns an error for NaN, infinite, or out-of-range input.
pub fn encode_timestamp(ms: f64) -> Result<Timestamp, InvalidTimeError> {
    let (seconds, nanos) = split_millis(ms)?;
    Ok(Timestamp { seconds, nanos })
}

/// Encodes an elapsed time given in milliseconds.
///
/// Returns an error for NaN, infinite, negative or out-of-range input.
pub fn encode_duration(ms: f64) -> Result<Duration, InvalidTimeError> {
    if ms < 0.0 {
        return Err(InvalidTimeError::Negative { value: ms });
    }
    let (seconds, nanos) = split_millis(ms)?;
    Ok(Duration { seconds, nanos })
}

/// Encodes the start time of a run, falling back to `fallback_ms` if the host's value is missing
/// or can't be encoded.
///
/// `fallback_ms` is captured by the reporter itself, so it is always valid in practice. If it
/// isn't, the epoch is used.
pub fn sanitize_run_start(start_ms: Option<f64>, fallback_ms: f64) -> Timestamp {
    start_ms
        .and_then(|ms| encode_timestamp(ms).ok())
        .or_else(|| encode_timestamp(fallback_ms).ok())
        .unwrap_or_default()
}

/// Encodes the duration of a run, clamping missing or invalid values to zero.
pub fn sanitize_run_duration(duration_ms: Option<f64>) -> Duration {
    duration_ms
        .and_then(|ms| encode_duration(ms).ok())
        .unwrap_or(Duration::ZERO)
}

/// Returns the current time in milliseconds since the Unix epoch.
pub fn now_ms() -> f64 {
    Utc::now().timestamp_micros() as f64 / MILLIS_PER_SECOND
}

fn split_millis(ms: f64) -> Result<(i64, i32), InvalidTimeError> {
    if !ms.is_finite() {
        return Err(InvalidTimeError::NotFinite { value: ms });
    }

    let seconds = (ms / MILLIS_PER_SECOND).floor();
    // i64::MAX as f64 rounds up to 2^63, which is itself out of range.
    if seconds < i64::MIN as f64 || seconds >= i64::MAX as f64 {
        return Err(InvalidTimeError::OutOfRange { value: ms });
    }

    let nanos = (ms.rem_euclid(MILLIS_PER_SECOND) * NANOS_PER_MILLI).floor() as i32;
    Ok((seconds as i64, nanos.min(MAX_NANOS)))
}
