use std::fmt;
use std::time::Duration;

use crate::errors::FdaError;
use crate::throttle::{RateLimitConfig, DEFAULT_CACHE_TTL};

/// Device adverse event endpoint.
pub const DEFAULT_BASE_URL: &str = "https://api.fda.gov/device/event.json";

/// Default HTTP timeout.
pub const DEFAULT_REQUEST_TIMEOUT: Duration = Duration::from_secs(30);

/// Client settings. All values are supplied by the caller; nothing secret is
/// compiled in.
#[derive(Clone, PartialEq, Eq)]
pub struct FdaConfig {
    pub base_url: String,
    /// Sent as the `api_key` query parameter when present.
    pub api_key: Option<String>,
    pub rate_limit: RateLimitConfig,
    /// Lifetime of cached field-value enumerations.
    pub cache_ttl: Duration,
    pub request_timeout: Duration,
}

impl Default for FdaConfig {
    fn default() -> Self {
        Self {
            base_url: DEFAULT_BASE_URL.to_string(),
            api_key: None,
            rate_limit: RateLimitConfig::default(),
            cache_ttl: DEFAULT_CACHE_TTL,
            request_timeout: DEFAULT_REQUEST_TIMEOUT,
        }
    }
}

impl FdaConfig {
    pub fn with_api_key(mut self, api_key: impl Into<String>) -> Self {
        let api_key = api_key.into();
        self.api_key = if api_key.trim().is_empty() {
            None
        } else {
            Some(api_key)
        };
        self
    }

    pub fn validate(&self) -> Result<(), FdaError> {
        if self.base_url.trim().is_empty() {
            return Err(FdaError::InvalidConfig("base_url must not be empty".to_string()));
        }
        if self.request_timeout.is_zero() {
            return Err(FdaError::InvalidConfig(
                "request_timeout must be greater than zero".to_string(),
            ));
        }
        self.rate_limit.validate()
    }
}

// Keeps the credential out of logs.
impl fmt::Debug for FdaConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("FdaConfig")
            .field("base_url", &self.base_url)
            .field("api_key", &self.api_key.as_ref().map(|_| "<redacted>"))
            .field("rate_limit", &self.rate_limit)
            .field("cache_ttl", &self.cache_ttl)
            .field("request_timeout", &self.request_timeout)
            .finish()
    }
}
