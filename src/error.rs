use std::time::Duration;
use thiserror::Error;

/// Per-log-entry failures while turning traffic logs into payloads.
///
/// All of these are expected during a normal crawl (bodies get evicted,
/// most traffic is not the search API) and are skipped by the caller,
/// never escalated.
#[derive(Debug, Error)]
pub enum ResolutionError {
    #[error("log message is not valid JSON: {0}")]
    UnparsableMessage(#[source] serde_json::Error),

    #[error("log entry carries no correlation id for a search API call")]
    MissingCorrelationId,

    #[error("response body unavailable: {0}")]
    BodyUnavailable(String),

    #[error("response body is not a search payload: {0}")]
    NotAPayload(#[source] serde_json::Error),
}

/// A business-typed item missing a field we cannot emit a record without.
///
/// Unlike [`ResolutionError`] this is surfaced to the caller; whether the
/// item is skipped or the query aborted is a config policy.
#[derive(Debug, Error, PartialEq, Eq)]
#[error("business item is missing mandatory field `{field}`")]
pub struct MalformedItem {
    pub field: &'static str,
}

/// Fatal conditions for a single query. A failed query writes no output
/// file; the surrounding run continues with the next combination.
#[derive(Debug, Error)]
pub enum CrawlError {
    #[error("timed out after {timeout:?} waiting for {what}")]
    RetrievalTimeout {
        what: &'static str,
        timeout: Duration,
    },

    #[error(transparent)]
    Malformed(#[from] MalformedItem),

    #[error(transparent)]
    Session(#[from] anyhow::Error),
}
