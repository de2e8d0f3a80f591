//! Traffic-log filtering and response recovery.
//!
//! The session records one [`RawLogEntry`] per `Network.responseReceived`
//! CDP event. After the scroll loop converges, the accumulated entries are
//! filtered down to search-API calls and each correlation id is traded for
//! the full response body the page itself received. Per-entry failures are
//! routine (bodies get evicted, most traffic is images and tiles) and are
//! dropped rather than escalated, but each one is an explicit
//! [`ResolutionError`] so the skips stay auditable.

use serde::Deserialize;
use serde_json::Value;
use tracing::debug;

use crate::error::ResolutionError;
use crate::extract::RawItem;

/// Substring match, not equality: search requests carry varying query
/// parameters after this path segment.
pub const SEARCH_API_PATTERN: &str = "api/search";

/// One raw traffic-log record. `message` is the JSON-serialized CDP event;
/// it is treated as opaque text until a filter decides to parse it.
#[derive(Debug, Clone)]
pub struct RawLogEntry {
    pub message: String,
}

/// Identifier tying a log entry to its retrievable response body.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CorrelationId(pub String);

/// Parsed search-API response body. A body without `data.totalResultCount`
/// fails deserialization and is discarded as irrelevant.
#[derive(Debug, Clone, Deserialize)]
pub struct CapturedPayload {
    pub data: PayloadData,
}

#[derive(Debug, Clone, Deserialize)]
pub struct PayloadData {
    #[serde(rename = "totalResultCount")]
    pub total_result_count: u64,
    #[serde(default)]
    pub items: Vec<RawItem>,
}

/// Where completed response bodies come from. The live implementation is
/// the browser session (`Network.getResponseBody`); tests use a map.
pub trait ResponseBodySource {
    fn response_body(&self, id: &CorrelationId) -> Result<String, ResolutionError>;
}

/// Cheap prefilter on the raw message text before any JSON parsing.
pub fn is_relevant(entry: &RawLogEntry) -> bool {
    entry.message.contains(SEARCH_API_PATTERN)
}

/// Parses the embedded message and pulls the request id, confirming the
/// response URL itself matches the search-API pattern (the prefilter only
/// looked at the raw text).
pub fn extract_correlation_id(entry: &RawLogEntry) -> Result<CorrelationId, ResolutionError> {
    let message: Value =
        serde_json::from_str(&entry.message).map_err(ResolutionError::UnparsableMessage)?;

    let url = message
        .pointer("/params/response/url")
        .and_then(Value::as_str)
        .unwrap_or_default();
    if !url.contains(SEARCH_API_PATTERN) {
        return Err(ResolutionError::MissingCorrelationId);
    }

    message
        .pointer("/params/requestId")
        .and_then(Value::as_str)
        .map(|id| CorrelationId(id.to_owned()))
        .ok_or(ResolutionError::MissingCorrelationId)
}

/// Trades a correlation id for the parsed payload. Fetch failures and
/// bodies without the expected shape are both transient outcomes.
pub fn resolve(
    source: &dyn ResponseBodySource,
    id: &CorrelationId,
) -> Result<CapturedPayload, ResolutionError> {
    let body = source.response_body(id)?;
    serde_json::from_str(&body).map_err(ResolutionError::NotAPayload)
}

/// Filter → resolve over a batch of log entries, preserving entry order and
/// dropping failures. No payload-level dedup here: one query legitimately
/// produces several payload pages.
pub fn collect_payloads(
    source: &dyn ResponseBodySource,
    entries: &[RawLogEntry],
) -> Vec<CapturedPayload> {
    let mut payloads = Vec::new();
    for entry in entries.iter().filter(|e| is_relevant(e)) {
        match extract_correlation_id(entry).and_then(|id| resolve(source, &id)) {
            Ok(payload) => payloads.push(payload),
            Err(err) => debug!("skipping traffic log entry: {err}"),
        }
    }
    payloads
}
