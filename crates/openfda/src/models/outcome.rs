//! Closed set of results a client call can end in.

use crate::errors::{FdaError, QuotaDenied, RetryClass, TransportError};

/// A single event record exactly as upstream returned it.
///
/// Shaping records into display rows is the caller's job.
pub type RawEvent = serde_json::Value;

/// Result of one client operation.
///
/// Every call terminates in exactly one of these variants; none of them is
/// raised as a panic or hidden behind a retry.
#[derive(Debug, Clone, PartialEq)]
pub enum FetchOutcome<T> {
    /// Upstream answered with data.
    Success(T),
    /// The local quota refused the call; no HTTP request was made.
    RateLimited(QuotaDenied),
    /// Upstream answered with a non-2xx status.
    HttpError(u16),
    /// The body was not valid JSON or did not have the expected shape.
    ParseError(String),
    /// Upstream answered successfully but had no matching data.
    EmptyResult,
    /// No HTTP response was obtained (connect failure, timeout).
    TransportError(TransportError),
}

impl<T> FetchOutcome<T> {
    pub fn is_success(&self) -> bool {
        matches!(self, Self::Success(_))
    }

    /// Borrow the payload of a successful outcome.
    pub fn success(&self) -> Option<&T> {
        match self {
            Self::Success(value) => Some(value),
            _ => None,
        }
    }

    /// Transform the payload, keeping every other variant as is.
    pub fn map<U, F>(self, f: F) -> FetchOutcome<U>
    where
        F: FnOnce(T) -> U,
    {
        self.and_then(|value| FetchOutcome::Success(f(value)))
    }

    /// Chain a step that can itself end in any outcome.
    pub fn and_then<U, F>(self, f: F) -> FetchOutcome<U>
    where
        F: FnOnce(T) -> FetchOutcome<U>,
    {
        match self {
            Self::Success(value) => f(value),
            Self::RateLimited(denied) => FetchOutcome::RateLimited(denied),
            Self::HttpError(status) => FetchOutcome::HttpError(status),
            Self::ParseError(message) => FetchOutcome::ParseError(message),
            Self::EmptyResult => FetchOutcome::EmptyResult,
            Self::TransportError(err) => FetchOutcome::TransportError(err),
        }
    }

    /// Convert into a `Result`, where `Ok(None)` stands for an empty result.
    pub fn into_result(self) -> Result<Option<T>, FdaError> {
        match self {
            Self::Success(value) => Ok(Some(value)),
            Self::EmptyResult => Ok(None),
            Self::RateLimited(denied) => Err(FdaError::RateLimited(denied)),
            Self::HttpError(status) => Err(FdaError::Http(status)),
            Self::ParseError(message) => Err(FdaError::Parse(message)),
            Self::TransportError(err) => Err(FdaError::Transport(err.to_string())),
        }
    }

    /// Retry classification of a failed outcome. `None` for success and
    /// empty results, which are terminal and not failures.
    pub fn retry_class(&self) -> Option<RetryClass> {
        match self {
            Self::Success(_) | Self::EmptyResult => None,
            Self::RateLimited(_) => Some(RetryClass::AfterQuotaReset),
            Self::HttpError(_) | Self::TransportError(_) => Some(RetryClass::WithBackoff),
            Self::ParseError(_) => Some(RetryClass::Never),
        }
    }

    /// Short label for logs.
    pub fn kind(&self) -> &'static str {
        match self {
            Self::Success(_) => "success",
            Self::RateLimited(_) => "rate_limited",
            Self::HttpError(_) => "http_error",
            Self::ParseError(_) => "parse_error",
            Self::EmptyResult => "empty_result",
            Self::TransportError(_) => "transport_error",
        }
    }
}
