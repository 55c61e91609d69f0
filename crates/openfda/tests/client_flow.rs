use std::collections::VecDeque;
use std::sync::{Arc, Mutex};
use std::time::Duration;

use async_trait::async_trait;
use chrono::{TimeZone, Utc};
use devicewatch_openfda::{
    Clock, EventQuery, FdaClient, FdaConfig, FetchOutcome, HttpResponse, HttpTransport,
    ManualClock, QuotaDenied, RateLimitConfig, RateLimiter, SearchKind, TransportError,
};

type Query = Vec<(String, String)>;

/// Replays canned responses in order and records every request.
#[derive(Default)]
struct StubTransport {
    responses: Mutex<VecDeque<Result<HttpResponse, TransportError>>>,
    requests: Mutex<Vec<(String, Query)>>,
}

impl StubTransport {
    fn with(responses: Vec<Result<HttpResponse, TransportError>>) -> Arc<Self> {
        Arc::new(Self {
            responses: Mutex::new(responses.into()),
            requests: Mutex::new(Vec::new()),
        })
    }

    fn ok(status: u16, body: &str) -> Result<HttpResponse, TransportError> {
        Ok(HttpResponse::new(status, body))
    }

    fn requests(&self) -> Vec<(String, Query)> {
        self.requests.lock().unwrap().clone()
    }

    fn request_count(&self) -> usize {
        self.requests.lock().unwrap().len()
    }
}

#[async_trait]
impl HttpTransport for StubTransport {
    async fn get(
        &self,
        url: &str,
        query: &[(String, String)],
    ) -> Result<HttpResponse, TransportError> {
        self.requests
            .lock()
            .unwrap()
            .push((url.to_string(), query.to_vec()));
        self.responses
            .lock()
            .unwrap()
            .pop_front()
            .unwrap_or_else(|| Err(TransportError::Other("no stubbed response".to_string())))
    }
}

fn param<'a>(query: &'a Query, name: &str) -> Option<&'a str> {
    query
        .iter()
        .find(|(k, _)| k == name)
        .map(|(_, v)| v.as_str())
}

struct Harness {
    client: FdaClient,
    transport: Arc<StubTransport>,
    clock: ManualClock,
}

fn harness_with(
    config: FdaConfig,
    responses: Vec<Result<HttpResponse, TransportError>>,
) -> Harness {
    let clock = ManualClock::new(Utc.with_ymd_and_hms(2024, 4, 10, 14, 0, 0).unwrap());
    let shared_clock: Arc<dyn Clock> = Arc::new(clock.clone());
    let limiter = Arc::new(RateLimiter::new(config.rate_limit.clone(), shared_clock.clone()).unwrap());
    let transport = StubTransport::with(responses);
    let client = FdaClient::with_parts(config, transport.clone(), limiter, shared_clock);
    Harness {
        client,
        transport,
        clock,
    }
}

fn harness(responses: Vec<Result<HttpResponse, TransportError>>) -> Harness {
    harness_with(FdaConfig::default(), responses)
}

const GENERIC_NAMES: &str =
    r#"{"results":[{"term":"PUMP, INFUSION","count":50},{"term":"STENT","count":30}]}"#;

#[tokio::test]
async fn field_values_preserve_upstream_order() {
    let h = harness(vec![StubTransport::ok(200, GENERIC_NAMES)]);

    let outcome = h
        .client
        .fetch_field_values("device.generic_name.exact", 10)
        .await;

    assert_eq!(
        outcome,
        FetchOutcome::Success(vec!["PUMP, INFUSION".to_string(), "STENT".to_string()])
    );

    let requests = h.transport.requests();
    assert_eq!(requests.len(), 1);
    let (url, query) = &requests[0];
    assert_eq!(url, "https://api.fda.gov/device/event.json");
    assert_eq!(param(query, "count"), Some("device.generic_name.exact"));
    assert_eq!(param(query, "limit"), Some("10"));
    assert_eq!(param(query, "search"), None);
}

#[tokio::test]
async fn search_clamps_limit_to_upstream_maximum() {
    let h = harness(vec![StubTransport::ok(
        200,
        r#"{"results":[{"event_key":"a1"}]}"#,
    )]);

    let outcome = h
        .client
        .search_events("device.generic_name:'STENT'", 5000)
        .await;
    assert!(outcome.is_success());

    let requests = h.transport.requests();
    let (_, query) = &requests[0];
    assert_eq!(param(query, "search"), Some("device.generic_name:'STENT'"));
    assert_eq!(param(query, "limit"), Some("1000"));
}

#[tokio::test]
async fn search_returns_records_unmodified() {
    let body = r#"{"meta":{"results":{"total":2}},"results":[
        {"event_key":"k1","event_type":"Injury","device":[{"brand_name":"X"}]},
        {"event_key":"k2","product_problems":["Leak"]}
    ]}"#;
    let h = harness(vec![StubTransport::ok(200, body)]);

    let events = match h.client.search(&EventQuery::by_kind(SearchKind::Model, "X")).await {
        FetchOutcome::Success(events) => events,
        other => panic!("unexpected outcome: {:?}", other),
    };

    assert_eq!(events.len(), 2);
    assert_eq!(events[0]["event_key"], "k1");
    assert_eq!(events[0]["device"][0]["brand_name"], "X");
    assert_eq!(events[1]["product_problems"][0], "Leak");
}

#[tokio::test]
async fn server_error_is_http_error() {
    let h = harness(vec![StubTransport::ok(500, "Internal Server Error")]);

    let outcome = h.client.search_events("device.generic_name:STENT", 5).await;

    assert_eq!(outcome, FetchOutcome::HttpError(500));
    assert_eq!(h.transport.request_count(), 1);
}

#[tokio::test]
async fn no_matches_is_empty_result() {
    let h = harness(vec![
        StubTransport::ok(
            404,
            r#"{"error":{"code":"NOT_FOUND","message":"No matches found!"}}"#,
        ),
        StubTransport::ok(200, r#"{"meta":{}}"#),
    ]);

    assert_eq!(
        h.client.search_events("manufacturer.name:NOBODY", 10).await,
        FetchOutcome::EmptyResult
    );
    assert_eq!(
        h.client.fetch_field_values("device.device_class", 10).await,
        FetchOutcome::EmptyResult
    );
}

#[tokio::test]
async fn malformed_body_is_parse_error() {
    let h = harness(vec![StubTransport::ok(200, "<html>maintenance</html>")]);

    let outcome = h.client.search_events("x", 1).await;
    assert!(matches!(outcome, FetchOutcome::ParseError(_)));
}

#[tokio::test]
async fn transport_failure_is_surfaced() {
    let h = harness(vec![Err(TransportError::Timeout)]);

    assert_eq!(
        h.client.search_events("x", 1).await,
        FetchOutcome::TransportError(TransportError::Timeout)
    );
}

#[tokio::test]
async fn field_values_are_cached_until_ttl() {
    let h = harness(vec![
        StubTransport::ok(200, GENERIC_NAMES),
        StubTransport::ok(200, r#"{"results":[{"term":"CATHETER","count":80}]}"#),
    ]);

    let first = h.client.fetch_choices(SearchKind::Modality, 10).await;
    let second = h.client.fetch_choices(SearchKind::Modality, 10).await;
    assert_eq!(first, second);
    assert_eq!(h.transport.request_count(), 1);

    // Cache hits never touch the quota.
    assert_eq!(h.client.quota().daily_count, 1);

    h.clock.advance(Duration::from_secs(3600));
    let third = h.client.fetch_choices(SearchKind::Modality, 10).await;
    assert_eq!(third, FetchOutcome::Success(vec!["CATHETER".to_string()]));
    assert_eq!(h.transport.request_count(), 2);
}

#[tokio::test]
async fn failed_lookups_are_retried_on_next_call() {
    let h = harness(vec![
        StubTransport::ok(503, "unavailable"),
        StubTransport::ok(200, GENERIC_NAMES),
    ]);

    assert_eq!(
        h.client.fetch_field_values("device.generic_name.exact", 10).await,
        FetchOutcome::HttpError(503)
    );
    assert!(h
        .client
        .fetch_field_values("device.generic_name.exact", 10)
        .await
        .is_success());
    assert_eq!(h.transport.request_count(), 2);
}

#[tokio::test]
async fn search_results_are_not_cached() {
    let body = r#"{"results":[{"event_key":"k1"}]}"#;
    let h = harness(vec![StubTransport::ok(200, body), StubTransport::ok(200, body)]);

    h.client.search_events("x", 1).await;
    h.client.search_events("x", 1).await;

    assert_eq!(h.transport.request_count(), 2);
}

#[tokio::test]
async fn exhausted_daily_quota_skips_http() {
    let config = FdaConfig {
        rate_limit: RateLimitConfig {
            requests_per_minute: 240,
            requests_per_day: 2,
        },
        ..FdaConfig::default()
    };
    let body = r#"{"results":[{"event_key":"k1"}]}"#;
    let h = harness_with(
        config,
        vec![StubTransport::ok(200, body), StubTransport::ok(200, body)],
    );

    assert!(h.client.search_events("x", 1).await.is_success());
    assert!(h.client.search_events("y", 1).await.is_success());

    let outcome = h.client.search_events("z", 1).await;
    assert_eq!(
        outcome,
        FetchOutcome::RateLimited(QuotaDenied::DailyQuotaExceeded {
            limit: 2,
            day: Utc.with_ymd_and_hms(2024, 4, 10, 0, 0, 0).unwrap().date_naive(),
        })
    );
    assert_eq!(h.transport.request_count(), 2);
}

#[tokio::test]
async fn requests_are_spaced_by_the_limiter() {
    let body = r#"{"results":[{"event_key":"k1"}]}"#;
    let h = harness(vec![
        StubTransport::ok(200, body),
        StubTransport::ok(200, body),
        StubTransport::ok(200, body),
    ]);

    for _ in 0..3 {
        h.client.search_events("x", 1).await;
    }

    assert_eq!(h.clock.total_slept(), Duration::from_millis(500));
}

#[tokio::test]
async fn api_key_is_sent_as_query_parameter() {
    let config = FdaConfig::default().with_api_key("test-key");
    let h = harness_with(config, vec![StubTransport::ok(200, GENERIC_NAMES)]);

    h.client.fetch_field_values("device.generic_name.exact", 10).await;

    let requests = h.transport.requests();
    assert_eq!(param(&requests[0].1, "api_key"), Some("test-key"));
}

#[tokio::test]
async fn clients_can_share_one_quota() {
    let clock = ManualClock::new(Utc.with_ymd_and_hms(2024, 4, 10, 14, 0, 0).unwrap());
    let shared_clock: Arc<dyn Clock> = Arc::new(clock.clone());
    let limiter = Arc::new(
        RateLimiter::new(
            RateLimitConfig {
                requests_per_minute: 240,
                requests_per_day: 1,
            },
            shared_clock.clone(),
        )
        .unwrap(),
    );
    let body = r#"{"results":[{"event_key":"k1"}]}"#;
    let first_transport = StubTransport::with(vec![StubTransport::ok(200, body)]);
    let second_transport = StubTransport::with(vec![StubTransport::ok(200, body)]);

    let first = FdaClient::with_parts(
        FdaConfig::default(),
        first_transport.clone(),
        limiter.clone(),
        shared_clock.clone(),
    );
    let second = FdaClient::with_parts(
        FdaConfig::default(),
        second_transport.clone(),
        limiter,
        shared_clock,
    );

    assert!(first.search_events("x", 1).await.is_success());
    assert!(matches!(
        second.search_events("x", 1).await,
        FetchOutcome::RateLimited(_)
    ));
    assert_eq!(second_transport.request_count(), 0);
}
