//! openFDA device adverse event client.
//!
//! Two operations:
//! - field-value enumeration via `count=<field>` (cached)
//! - free-text event search via `search=<expression>&limit=<n>`
//!
//! Each call passes the rate limiter before any HTTP traffic and ends in one
//! [`FetchOutcome`]. Nothing is retried here.

use std::sync::Arc;

use serde::Deserialize;
use tracing::{debug, warn};

use super::config::FdaConfig;
use super::transport::{HttpResponse, HttpTransport, ReqwestTransport};
use crate::clock::{Clock, SystemClock};
use crate::errors::FdaError;
use crate::models::{clamp_limit, EventQuery, FetchOutcome, QuotaSnapshot, RawEvent, SearchKind};
use crate::throttle::{RateLimiter, ResultCache};

// ============================================================================
// API Response Structures
// ============================================================================

/// Response body of a `count` query.
#[derive(Debug, Deserialize)]
struct CountResponse {
    #[serde(default)]
    results: Option<Vec<TermCount>>,
}

/// One facet bucket; the `count` next to `term` is not needed.
#[derive(Debug, Deserialize)]
struct TermCount {
    term: Term,
}

/// Facet terms are strings for text fields and numbers for numeric ones.
#[derive(Debug, Deserialize)]
#[serde(untagged)]
enum Term {
    Text(String),
    Number(serde_json::Number),
}

impl Term {
    fn into_string(self) -> String {
        match self {
            Self::Text(text) => text,
            Self::Number(number) => number.to_string(),
        }
    }
}

/// Response body of a `search` query.
#[derive(Debug, Deserialize)]
struct SearchResponse {
    #[serde(default)]
    results: Option<Vec<RawEvent>>,
}

/// Error body, e.g. `{"error": {"code": "NOT_FOUND", "message": "No matches found!"}}`.
#[derive(Debug, Deserialize)]
struct ErrorResponse {
    error: Option<ErrorBody>,
}

#[derive(Debug, Deserialize)]
struct ErrorBody {
    code: Option<String>,
    message: Option<String>,
}

// ============================================================================
// FdaClient
// ============================================================================

/// Rate-limited, caching client for the device adverse event endpoint.
pub struct FdaClient {
    config: FdaConfig,
    transport: Arc<dyn HttpTransport>,
    limiter: Arc<RateLimiter>,
    field_cache: ResultCache<Vec<String>>,
}

impl FdaClient {
    /// Client on the system clock with a `reqwest` transport and its own limiter.
    pub fn new(config: FdaConfig) -> Result<Self, FdaError> {
        config.validate()?;
        let transport = Arc::new(ReqwestTransport::new(config.request_timeout)?);
        let clock: Arc<dyn Clock> = Arc::new(SystemClock::new());
        let limiter = Arc::new(RateLimiter::new(config.rate_limit.clone(), clock.clone())?);
        Ok(Self::with_parts(config, transport, limiter, clock))
    }

    /// Assemble a client from explicit parts.
    ///
    /// Pass the same `limiter` to several clients to make them share one
    /// quota. `config.rate_limit` is ignored in favor of the limiter's own
    /// configuration.
    pub fn with_parts(
        config: FdaConfig,
        transport: Arc<dyn HttpTransport>,
        limiter: Arc<RateLimiter>,
        clock: Arc<dyn Clock>,
    ) -> Self {
        Self {
            config,
            transport,
            limiter,
            field_cache: ResultCache::new(clock),
        }
    }

    pub fn config(&self) -> &FdaConfig {
        &self.config
    }

    pub fn limiter(&self) -> &Arc<RateLimiter> {
        &self.limiter
    }

    /// Remaining daily quota.
    pub fn quota(&self) -> QuotaSnapshot {
        self.limiter.snapshot()
    }

    /// Forget every cached field enumeration.
    pub fn clear_cache(&self) {
        self.field_cache.clear();
    }

    /// Distinct values of `field`, most frequent first.
    ///
    /// Upstream order is preserved. Served from the cache while a previous
    /// successful answer for the same field and limit is younger than the
    /// configured TTL.
    pub async fn fetch_field_values(&self, field: &str, limit: u32) -> FetchOutcome<Vec<String>> {
        let limit = clamp_limit(limit);
        let key = format!("count:{}:{}", field, limit);

        self.field_cache
            .get_or_fetch(&key, self.config.cache_ttl, move || async move {
                let params = vec![
                    ("count".to_string(), field.to_string()),
                    ("limit".to_string(), limit.to_string()),
                ];
                self.execute(params).await.and_then(|body| parse_terms(&body))
            })
            .await
    }

    /// Selectable values for a search kind (manufacturers, models or modalities).
    pub async fn fetch_choices(&self, kind: SearchKind, limit: u32) -> FetchOutcome<Vec<String>> {
        self.fetch_field_values(kind.facet_field(), limit).await
    }

    /// Raw event records matching `search_expression`.
    ///
    /// `limit` is clamped to `1..=1000`. Results are never cached.
    pub async fn search_events(
        &self,
        search_expression: &str,
        limit: u32,
    ) -> FetchOutcome<Vec<RawEvent>> {
        self.search(&EventQuery::raw(search_expression).with_limit(limit)).await
    }

    /// Raw event records for a prepared query.
    pub async fn search(&self, query: &EventQuery) -> FetchOutcome<Vec<RawEvent>> {
        let params = vec![
            ("search".to_string(), query.search_expression().to_string()),
            ("limit".to_string(), query.result_limit().to_string()),
        ];
        self.execute(params).await.and_then(|body| parse_events(&body))
    }

    /// Pass the limiter, issue the request and classify the response.
    ///
    /// `Success` carries the raw body of a 2xx response.
    async fn execute(&self, mut params: Vec<(String, String)>) -> FetchOutcome<String> {
        if let Err(denied) = self.limiter.acquire().await {
            return FetchOutcome::RateLimited(denied);
        }

        debug!(
            "openFDA request: {}",
            params
                .iter()
                .map(|(k, v)| format!("{}={}", k, v))
                .collect::<Vec<_>>()
                .join("&")
        );

        if let Some(api_key) = &self.config.api_key {
            params.insert(0, ("api_key".to_string(), api_key.clone()));
        }

        let response = match self.transport.get(&self.config.base_url, &params).await {
            Ok(response) => response,
            Err(err) => {
                warn!("openFDA request failed: {}", err);
                return FetchOutcome::TransportError(err);
            }
        };

        classify(response)
    }
}

/// Map an HTTP response to an outcome carrying the body.
fn classify(response: HttpResponse) -> FetchOutcome<String> {
    if response.is_success() {
        return FetchOutcome::Success(response.body);
    }

    if let Ok(ErrorResponse { error: Some(error) }) =
        serde_json::from_str::<ErrorResponse>(&response.body)
    {
        // openFDA answers "no matches" with a 404.
        if response.status == 404 && error.code.as_deref() == Some("NOT_FOUND") {
            debug!("openFDA: no matches");
            return FetchOutcome::EmptyResult;
        }
        warn!(
            "openFDA HTTP {}: {}",
            response.status,
            error.message.as_deref().unwrap_or("no message")
        );
    } else {
        warn!("openFDA HTTP {}", response.status);
    }

    FetchOutcome::HttpError(response.status)
}

fn parse_terms(body: &str) -> FetchOutcome<Vec<String>> {
    match serde_json::from_str::<CountResponse>(body) {
        Ok(CountResponse {
            results: Some(results),
        }) if !results.is_empty() => {
            FetchOutcome::Success(results.into_iter().map(|t| t.term.into_string()).collect())
        }
        Ok(_) => FetchOutcome::EmptyResult,
        Err(e) => {
            warn!("Failed to parse count response: {}", e);
            FetchOutcome::ParseError(format!("Failed to parse count response: {}", e))
        }
    }
}

fn parse_events(body: &str) -> FetchOutcome<Vec<RawEvent>> {
    match serde_json::from_str::<SearchResponse>(body) {
        Ok(SearchResponse {
            results: Some(results),
        }) if !results.is_empty() => FetchOutcome::Success(results),
        Ok(_) => FetchOutcome::EmptyResult,
        Err(e) => {
            warn!("Failed to parse search response: {}", e);
            FetchOutcome::ParseError(format!("Failed to parse search response: {}", e))
        }
    }
}
