//! Error types for the care engine.
//!
//! Two categories matter to callers. Business-health failures are never errors:
//! they are reported as `False` conditions by the evaluators. Everything in this
//! module is an infrastructure failure: it is converted into an `Unknown`
//! condition at the orchestrator boundary and retried on the next pass.

use std::time::Duration;
use thiserror::Error;

pub use crate::config::ConfigurationError;

/// Failures reported by a [`SignalStore`](crate::store::SignalStore)
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum StoreError {
    #[error("{kind} \"{namespace}/{name}\" not found")]
    NotFound {
        kind: String,
        namespace: String,
        name: String,
    },
    #[error("signal store unavailable: {0}")]
    Unavailable(String),
    #[error("signal store request timed out: {0}")]
    Timeout(String),
}

impl StoreError {
    pub fn not_found(
        kind: impl Into<String>,
        namespace: impl Into<String>,
        name: impl Into<String>,
    ) -> Self {
        Self::NotFound {
            kind: kind.into(),
            namespace: namespace.into(),
            name: name.into(),
        }
    }

    #[must_use]
    pub const fn is_not_found(&self) -> bool {
        matches!(self, Self::NotFound { .. })
    }
}

/// Failures of a single health-alert query against a monitoring backend
///
/// Every ambiguous response is an error: the query fails closed rather than
/// reading "no data" as healthy.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum QueryError {
    #[error("failed to build HTTP client: {0}")]
    Client(String),
    #[error("Post \"{url}\": {reason}")]
    Transport { url: String, reason: String },
    #[error("Post \"{url}\": timed out after {timeout:?}")]
    Timeout { url: String, timeout: Duration },
    #[error("unexpected HTTP status {status} from \"{url}\"")]
    HttpStatus { url: String, status: u16 },
    #[error("query failed ({error_type}): {error}")]
    Api { error_type: String, error: String },
    #[error("query returned warnings")]
    Warnings(Vec<String>),
    #[error("query returned an unexpected result type")]
    UnexpectedResultType(String),
    #[error("query returned empty vector")]
    EmptyVector,
    #[error("query returned an invalid sample: {0}")]
    InvalidSample(String),
    #[error("failed to decode query response: {0}")]
    Decode(String),
}

/// Errors raised while evaluating an aspect
#[derive(Debug, Clone, PartialEq, Error)]
pub enum CareError {
    #[error("failed listing {what} in namespace {namespace}: {source}")]
    SnapshotFetch {
        what: &'static str,
        namespace: String,
        #[source]
        source: StoreError,
    },
    #[error("failed listing workloads in namespace {namespace}: {source}")]
    WorkloadList {
        namespace: String,
        #[source]
        source: StoreError,
    },
    #[error("health evaluation did not finish within {0:?}")]
    DeadlineExceeded(Duration),
    #[error("evaluation task failed: {0}")]
    Internal(String),
}

pub type StoreResult<T> = std::result::Result<T, StoreError>;
pub type QueryResult<T> = std::result::Result<T, QueryError>;
pub type CareResult<T> = std::result::Result<T, CareError>;
