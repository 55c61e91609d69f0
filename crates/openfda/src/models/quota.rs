use chrono::{DateTime, NaiveDate, Utc};
use serde::Serialize;

/// Read-only view of the rate limiter's daily accounting.
#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct QuotaSnapshot {
    /// UTC day the counters refer to.
    pub day: NaiveDate,
    /// Requests granted so far on `day`.
    pub daily_count: u32,
    /// Configured per-day cap.
    pub daily_limit: u32,
    /// Requests still available on `day`.
    pub remaining_today: u32,
    /// Start time of the most recent grant, if any.
    pub last_request: Option<DateTime<Utc>>,
}
