//! Error types for the hondenschool data layer.

use thiserror::Error;

/// Errors raised while talking to the remote sheet API or a static data file.
#[derive(Error, Debug)]
pub enum SheetError {
    #[error("Configuration error: {0}")]
    Config(String),

    #[error("Request timed out after {0}ms")]
    Timeout(u64),

    #[error("Network error: {0}")]
    Network(String),

    #[error("Received an HTML page instead of JSON")]
    HtmlResponse,

    #[error("HTTP status {0}")]
    Status(u16),

    #[error("Malformed JSON: {0}")]
    MalformedJson(String),

    #[error("Server rejected the request: {0}")]
    Rejected(String),

    #[error("Unexpected response shape")]
    UnexpectedShape,

    #[error("No data available from any source ({})", summarize(.0))]
    Exhausted(Vec<(String, SheetError)>),
}

impl SheetError {
    /// Whether another attempt against the same URL may succeed.
    ///
    /// Only transport-level trouble is retried: timeouts, connection failures,
    /// and HTML pages served where JSON was expected (login or error pages).
    pub fn is_retryable(&self) -> bool {
        matches!(
            self,
            SheetError::Timeout(_) | SheetError::Network(_) | SheetError::HtmlResponse
        )
    }
}

fn summarize(failures: &[(String, SheetError)]) -> String {
    if failures.is_empty() {
        return "no candidate URLs".to_string();
    }
    failures
        .iter()
        .map(|(url, err)| format!("{url}: {err}"))
        .collect::<Vec<_>>()
        .join("; ")
}

/// Errors from the key-value backend underneath the bucket store.
#[derive(Error, Debug)]
pub enum StorageError {
    #[error("Storage unavailable: {0}")]
    Unavailable(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

/// Validation errors from the entity builders.
#[derive(Error, Debug, PartialEq)]
pub enum BuildError {
    #[error("A start time is required")]
    MissingStart,

    #[error("Invalid date/time '{0}'")]
    InvalidDateTime(String),

    #[error("Invalid date '{0}'. Expected YYYY-MM-DD")]
    InvalidDate(String),

    #[error("End time lies before the start time")]
    EndBeforeStart,

    #[error("A duration of {0} minutes is out of range")]
    DurationOutOfRange(i64),

    #[error("A title or message is required")]
    MissingText,

    #[error("Invalid series plan: {0}")]
    InvalidPlan(String),
}

/// Top-level error for hondenschool-core operations.
#[derive(Error, Debug)]
pub enum HondenschoolError {
    #[error("Configuration error: {0}")]
    Config(String),

    #[error(transparent)]
    Sheet(#[from] SheetError),

    #[error(transparent)]
    Storage(#[from] StorageError),

    #[error(transparent)]
    Build(#[from] BuildError),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

/// Result type alias for hondenschool-core operations.
pub type HondenschoolResult<T> = Result<T, HondenschoolError>;
