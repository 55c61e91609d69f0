//! Error types and retry classification for the openFDA access layer.
//!
//! This module provides:
//! - [`FdaError`]: errors raised outside of a normal fetch (configuration,
//!   client construction) and the error side of [`FetchOutcome::into_result`]
//! - [`QuotaDenied`]: the rate limiter's refusal
//! - [`TransportError`]: failures below HTTP (connect, timeout)
//! - [`RetryClass`]: classification for determining retry behavior
//!
//! [`FetchOutcome::into_result`]: crate::models::FetchOutcome::into_result

mod retry;

pub use retry::RetryClass;

use chrono::NaiveDate;
use thiserror::Error;

/// Errors that can occur while configuring or using the client.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum FdaError {
    /// A configuration value is out of range.
    #[error("Invalid configuration: {0}")]
    InvalidConfig(String),

    /// The HTTP client could not be constructed.
    #[error("Failed to build HTTP client: {0}")]
    ClientBuild(String),

    /// The local quota refused the request.
    #[error("Rate limited: {0}")]
    RateLimited(#[from] QuotaDenied),

    /// Upstream answered with a non-success status.
    #[error("HTTP error: {0}")]
    Http(u16),

    /// The response body was not the JSON we expected.
    #[error("Parse error: {0}")]
    Parse(String),

    /// The request never produced an HTTP response.
    #[error("Transport error: {0}")]
    Transport(String),
}

impl FdaError {
    /// Returns the retry classification for this error.
    ///
    /// ```
    /// use devicewatch_openfda::errors::{FdaError, RetryClass};
    ///
    /// assert_eq!(FdaError::Http(503).retry_class(), RetryClass::WithBackoff);
    /// assert_eq!(FdaError::Parse("eof".into()).retry_class(), RetryClass::Never);
    /// ```
    pub fn retry_class(&self) -> RetryClass {
        match self {
            Self::InvalidConfig(_) | Self::ClientBuild(_) | Self::Parse(_) => RetryClass::Never,
            Self::RateLimited(_) => RetryClass::AfterQuotaReset,
            Self::Http(_) | Self::Transport(_) => RetryClass::WithBackoff,
        }
    }
}

/// Reason the rate limiter refused to grant a request.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum QuotaDenied {
    /// The per-day cap has been reached for `day` (UTC).
    #[error("daily quota of {limit} requests exhausted for {day}")]
    DailyQuotaExceeded { limit: u32, day: NaiveDate },
}

/// Failure to obtain any HTTP response.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum TransportError {
    #[error("request timed out")]
    Timeout,

    #[error("connection failed: {0}")]
    Connect(String),

    #[error("{0}")]
    Other(String),
}

impl From<reqwest::Error> for TransportError {
    fn from(err: reqwest::Error) -> Self {
        if err.is_timeout() {
            Self::Timeout
        } else if err.is_connect() {
            Self::Connect(err.to_string())
        } else {
            Self::Other(err.to_string())
        }
    }
}
