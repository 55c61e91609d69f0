use std::time::Duration;

use anyhow::{Context, Result};
use devicewatch_openfda::{FdaConfig, RateLimitConfig};

/// Runtime settings, read from the environment (and `.env`, if present).
pub struct Config {
    pub fda: FdaConfig,
    pub log_format: LogFormat,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum LogFormat {
    Text,
    Json,
}

impl Config {
    pub fn from_env() -> Result<Self> {
        dotenvy::dotenv().ok();
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Build from any key lookup. Unset keys fall back to defaults; set but
    /// unparsable keys are errors.
    pub fn from_lookup<F>(lookup: F) -> Result<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        let defaults = FdaConfig::default();

        let base_url = lookup("OPENFDA_BASE_URL").unwrap_or_else(|| defaults.base_url.clone());
        let api_key = lookup("OPENFDA_API_KEY").filter(|key| !key.trim().is_empty());

        let rate_limit = RateLimitConfig {
            requests_per_minute: parse_or(
                &lookup,
                "DEVICEWATCH_REQUESTS_PER_MINUTE",
                defaults.rate_limit.requests_per_minute,
            )?,
            requests_per_day: parse_or(
                &lookup,
                "DEVICEWATCH_REQUESTS_PER_DAY",
                defaults.rate_limit.requests_per_day,
            )?,
        };

        let cache_ttl = Duration::from_secs(parse_or(
            &lookup,
            "DEVICEWATCH_CACHE_TTL_SECS",
            defaults.cache_ttl.as_secs(),
        )?);
        let request_timeout = Duration::from_millis(parse_or(
            &lookup,
            "DEVICEWATCH_REQUEST_TIMEOUT_MS",
            defaults.request_timeout.as_millis() as u64,
        )?);

        let log_format = match lookup("DEVICEWATCH_LOG_FORMAT") {
            Some(format) if format.eq_ignore_ascii_case("json") => LogFormat::Json,
            _ => LogFormat::Text,
        };

        let fda = FdaConfig {
            base_url,
            api_key,
            rate_limit,
            cache_ttl,
            request_timeout,
        };
        fda.validate()?;

        Ok(Self { fda, log_format })
    }
}

fn parse_or<F, T>(lookup: &F, key: &str, default: T) -> Result<T>
where
    F: Fn(&str) -> Option<String>,
    T: std::str::FromStr,
    T::Err: std::error::Error + Send + Sync + 'static,
{
    match lookup(key) {
        Some(raw) => raw
            .trim()
            .parse()
            .with_context(|| format!("Invalid {}: '{}'", key, raw)),
        None => Ok(default),
    }
}
