//! Error types for trend acquisition.

use std::fmt;

/// Errors raised while acquiring a batch of trend series.
///
/// None of these abort an aggregation run. The aggregator records them per
/// batch in [`TrendTable::failures`](crate::series::TrendTable::failures).
#[derive(Debug, Clone, PartialEq, Eq)]
#[derive(serde::Serialize, serde::Deserialize)]
pub enum TrendsError {
    /// The request was rejected locally before any network call.
    InvalidInput(String),
    /// Timeouts, connection failures, 429 or 5xx that outlived the retry policy.
    Transient(String),
    /// A non-retryable rejection from the upstream service.
    UpstreamRejection {
        /// HTTP status returned by the upstream.
        status: u16,
        /// Body excerpt or reason.
        message: String,
    },
    /// The payload did not match the expected shape.
    Decode(String),
}

impl TrendsError {
    /// Build an invalid input error.
    pub fn invalid(msg: impl Into<String>) -> Self {
        Self::InvalidInput(msg.into())
    }

    /// Whether a later attempt could succeed.
    pub fn is_retryable(&self) -> bool {
        matches!(self, Self::Transient(_))
    }

    /// Classify a final HTTP status. Statuses the transport already retries on map
    /// to [`TrendsError::Transient`], anything else to an upstream rejection.
    pub fn from_status(status: u16, message: impl Into<String>) -> Self {
        let message = message.into();
        if crate::utils::retry::is_retryable_status(status) {
            Self::Transient(format!("HTTP {} after retries: {}", status, message))
        } else {
            Self::UpstreamRejection { status, message }
        }
    }
}

impl fmt::Display for TrendsError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::InvalidInput(msg) => write!(f, "Invalid trends request: {}", msg),
            Self::Transient(msg) => write!(f, "Trends request failed: {}", msg),
            Self::UpstreamRejection { status, message } => {
                write!(f, "Trends upstream rejected request (HTTP {}): {}", status, message)
            }
            Self::Decode(msg) => write!(f, "Trends payload could not be decoded: {}", msg),
        }
    }
}

impl std::error::Error for TrendsError {}

impl From<reqwest_middleware::Error> for TrendsError {
    fn from(err: reqwest_middleware::Error) -> Self {
        match err {
            reqwest_middleware::Error::Reqwest(e) => e.into(),
            reqwest_middleware::Error::Middleware(e) => Self::Transient(e.to_string()),
        }
    }
}

impl From<reqwest::Error> for TrendsError {
    /// Payloads are parsed with `serde_json`, so every reqwest error is a
    /// transport failure: a read that timed out or broke off is transient.
    fn from(err: reqwest::Error) -> Self {
        if err.is_timeout() || err.is_body() || err.is_decode() || err.is_connect() {
            return Self::Transient(err.to_string());
        }
        match err.status() {
            Some(status) => Self::from_status(status.as_u16(), err.to_string()),
            None => Self::Transient(err.to_string()),
        }
    }
}

impl From<serde_json::Error> for TrendsError {
    fn from(err: serde_json::Error) -> Self {
        Self::Decode(err.to_string())
    }
}
