//! Run-time duration normalization
//!
//! Producers report run time in two shapes: a plain number of seconds, or a
//! string with a trailing unit suffix ("3.2s"). Both are coerced to seconds
//! exactly once, at the ingestion boundary, so every downstream query works
//! on a single numeric representation.

use serde::{Deserialize, Serialize};

/// A run-time value as it appears on the wire
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum RawDuration {
    Seconds(f64),
    Text(String),
}

impl RawDuration {
    /// Normalize to seconds. Returns `None` for unparseable or non-finite
    /// values; a malformed record contributes no value rather than
    /// corrupting an aggregate.
    pub fn as_seconds(&self) -> Option<f64> {
        match self {
            RawDuration::Seconds(value) => finite(*value),
            RawDuration::Text(text) => parse_seconds(text),
        }
    }
}

/// Parse a duration string, stripping a trailing `s` unit suffix if present
/// ("3.2s" -> 3.2, "4" -> 4.0).
pub fn parse_seconds(text: &str) -> Option<f64> {
    let trimmed = text.trim();
    let trimmed = trimmed.strip_suffix('s').unwrap_or(trimmed).trim_end();
    trimmed.parse::<f64>().ok().and_then(finite)
}

fn finite(value: f64) -> Option<f64> {
    value.is_finite().then_some(value)
}
