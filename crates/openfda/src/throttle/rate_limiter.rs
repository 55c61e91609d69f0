//! Per-minute and per-day request gate for the openFDA API.
//!
//! Every outbound request goes through [`RateLimiter::acquire`]. Requests are
//! spaced at least `60 / R` seconds apart and at most `R` are granted inside a
//! minute window; callers over that pace are delayed, not dropped. Once `D`
//! requests have been granted on the current UTC day, further calls are
//! denied until the date changes.
//!
//! The daily counter is reset lazily on the first call of a new day. There is
//! no background timer. Each grant is charged to the UTC day of the slot it
//! starts in, and the counter only ever moves forward to a later day, so a
//! wall clock stepping backwards cannot hand out a second day's quota.

use std::sync::{Arc, Mutex, MutexGuard};
use std::time::Duration;

use chrono::{DateTime, NaiveDate, Utc};
use tracing::{debug, info, warn};

use crate::clock::{to_chrono, Clock, SystemClock};
use crate::errors::{FdaError, QuotaDenied};
use crate::models::QuotaSnapshot;

/// Default rate limit: 240 requests per minute.
pub const DEFAULT_REQUESTS_PER_MINUTE: u32 = 240;

/// Default daily quota: 120000 requests per day.
pub const DEFAULT_REQUESTS_PER_DAY: u32 = 120_000;

const MINUTE: Duration = Duration::from_secs(60);

/// Rate limiter configuration.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct RateLimitConfig {
    /// Maximum requests per minute (R).
    pub requests_per_minute: u32,
    /// Maximum requests per calendar day (D).
    pub requests_per_day: u32,
}

impl Default for RateLimitConfig {
    fn default() -> Self {
        Self {
            requests_per_minute: DEFAULT_REQUESTS_PER_MINUTE,
            requests_per_day: DEFAULT_REQUESTS_PER_DAY,
        }
    }
}

impl RateLimitConfig {
    /// Minimum spacing between two grants, rounded up to whole nanoseconds so
    /// that `R + 1` consecutive grants always span a full minute.
    pub fn min_interval(&self) -> Duration {
        let per_minute = u64::from(self.requests_per_minute.max(1));
        let minute_nanos = MINUTE.as_nanos() as u64;
        Duration::from_nanos(minute_nanos.div_ceil(per_minute))
    }

    pub fn validate(&self) -> Result<(), FdaError> {
        if self.requests_per_minute == 0 {
            return Err(FdaError::InvalidConfig(
                "requests_per_minute must be greater than zero".to_string(),
            ));
        }
        if self.requests_per_day == 0 {
            return Err(FdaError::InvalidConfig(
                "requests_per_day must be greater than zero".to_string(),
            ));
        }
        Ok(())
    }
}

/// Mutable accounting, only touched under the limiter's mutex.
#[derive(Debug)]
struct QuotaState {
    /// Start of the current minute window.
    minute_window_start: Option<DateTime<Utc>>,
    /// Grants inside the current minute window.
    minute_count: u32,
    /// Start time of the most recent grant.
    last_request: Option<DateTime<Utc>>,
    /// Grants on `daily_window`.
    daily_count: u32,
    /// UTC day `daily_count` refers to. Never moves backwards.
    daily_window: NaiveDate,
}

impl QuotaState {
    fn new(today: NaiveDate) -> Self {
        Self {
            minute_window_start: None,
            minute_count: 0,
            last_request: None,
            daily_count: 0,
            daily_window: today,
        }
    }

    /// Reset the daily counter when `day` is past the current window.
    fn roll_day(&mut self, day: NaiveDate) {
        if day > self.daily_window {
            info!(
                "Rate limiter: new quota day {} (previous day {} used {} requests)",
                day, self.daily_window, self.daily_count
            );
            self.daily_count = 0;
            self.daily_window = day;
        }
    }
}

/// Slot picked for the next grant, not yet recorded.
#[derive(Clone, Copy, Debug)]
struct Reservation {
    slot: DateTime<Utc>,
    minute_window_start: DateTime<Utc>,
    minute_count: u32,
}

/// A granted request slot.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct Grant {
    /// Instant the request may start.
    pub granted_at: DateTime<Utc>,
    /// Delay imposed on the caller before the grant.
    pub waited: Duration,
}

/// Shared request gate.
///
/// Thread-safe: the whole check-reset-compare-increment sequence runs under
/// one mutex, so concurrent callers cannot jointly overrun either cap. A
/// caller reserves its slot while holding the lock and sleeps after releasing
/// it, which lines concurrent callers up one interval apart.
pub struct RateLimiter {
    config: RateLimitConfig,
    clock: Arc<dyn Clock>,
    state: Mutex<QuotaState>,
}

impl RateLimiter {
    /// Create a limiter reading time from `clock`.
    pub fn new(config: RateLimitConfig, clock: Arc<dyn Clock>) -> Result<Self, FdaError> {
        config.validate()?;
        let today = clock.now().date_naive();
        Ok(Self {
            config,
            clock,
            state: Mutex::new(QuotaState::new(today)),
        })
    }

    /// Create a limiter on the system clock.
    pub fn with_system_clock(config: RateLimitConfig) -> Result<Self, FdaError> {
        Self::new(config, Arc::new(SystemClock::new()))
    }

    pub fn config(&self) -> &RateLimitConfig {
        &self.config
    }

    /// Lock the quota state, recovering from poison if necessary.
    ///
    /// Every mutation of the state completes before any await point, so a
    /// poisoned guard still holds consistent counters.
    fn lock_state(&self) -> MutexGuard<'_, QuotaState> {
        self.state.lock().unwrap_or_else(|poisoned| {
            warn!("Rate limiter state mutex was poisoned, recovering");
            poisoned.into_inner()
        })
    }

    /// Wait for a request slot.
    ///
    /// Returns `Err` without waiting and without touching any counter when the
    /// daily quota is exhausted. That denial is sticky until the UTC date
    /// changes; callers must not busy-retry it.
    ///
    /// The daily count is charged when the slot is reserved. If the returned
    /// future is dropped while it waits for its slot, the charge is refunded;
    /// the slot itself stays taken, so later callers keep their spacing.
    pub async fn acquire(&self) -> Result<Grant, QuotaDenied> {
        let (grant, day) = {
            let mut state = self.lock_state();
            let now = self.clock.now();
            let reservation = self.plan_slot(&state, now);
            state.roll_day(reservation.slot.date_naive());

            if state.daily_count >= self.config.requests_per_day {
                warn!(
                    "Rate limiter: daily quota of {} exhausted for {}",
                    self.config.requests_per_day, state.daily_window
                );
                return Err(QuotaDenied::DailyQuotaExceeded {
                    limit: self.config.requests_per_day,
                    day: state.daily_window,
                });
            }

            Self::record(&mut state, reservation);
            let grant = Grant {
                granted_at: reservation.slot,
                waited: (reservation.slot - now).to_std().unwrap_or(Duration::ZERO),
            };
            (grant, state.daily_window)
        };

        if !grant.waited.is_zero() {
            debug!("Rate limiter: waiting {:?} before request", grant.waited);
            let pending = PendingCharge {
                limiter: self,
                day,
                settled: false,
            };
            self.clock.sleep(grant.waited).await;
            pending.settle();
        }

        debug!("Rate limiter: granted request at {}", grant.granted_at);
        Ok(grant)
    }

    /// Earliest start time honoring both the spacing and the minute window.
    fn plan_slot(&self, state: &QuotaState, now: DateTime<Utc>) -> Reservation {
        let mut slot = now;
        if let Some(last) = state.last_request {
            let earliest = last + to_chrono(self.config.min_interval());
            if earliest > slot {
                slot = earliest;
            }
        }

        let minute = to_chrono(MINUTE);
        match state.minute_window_start {
            Some(start) if slot < start + minute => {
                if state.minute_count >= self.config.requests_per_minute {
                    let next_window = start + minute;
                    Reservation {
                        slot: next_window,
                        minute_window_start: next_window,
                        minute_count: 1,
                    }
                } else {
                    Reservation {
                        slot,
                        minute_window_start: start,
                        minute_count: state.minute_count + 1,
                    }
                }
            }
            _ => Reservation {
                slot,
                minute_window_start: slot,
                minute_count: 1,
            },
        }
    }

    fn record(state: &mut QuotaState, reservation: Reservation) {
        state.minute_window_start = Some(reservation.minute_window_start);
        state.minute_count = reservation.minute_count;
        state.last_request = Some(reservation.slot);
        state.daily_count += 1;
    }

    /// Current daily accounting, as the next `acquire` would see it.
    pub fn snapshot(&self) -> QuotaSnapshot {
        let state = self.lock_state();
        let day = self.clock.now().date_naive().max(state.daily_window);
        let daily_count = if day == state.daily_window {
            state.daily_count
        } else {
            0
        };

        QuotaSnapshot {
            day,
            daily_count,
            daily_limit: self.config.requests_per_day,
            remaining_today: self.config.requests_per_day.saturating_sub(daily_count),
            last_request: state.last_request,
        }
    }
}

/// Daily charge of a grant whose caller is still waiting for its slot.
/// Dropped unsettled, it hands the charge back.
struct PendingCharge<'a> {
    limiter: &'a RateLimiter,
    day: NaiveDate,
    settled: bool,
}

impl PendingCharge<'_> {
    fn settle(mut self) {
        self.settled = true;
    }
}

impl Drop for PendingCharge<'_> {
    fn drop(&mut self) {
        if self.settled {
            return;
        }
        let mut state = self.limiter.lock_state();
        if state.daily_window == self.day {
            state.daily_count = state.daily_count.saturating_sub(1);
            debug!(
                "Rate limiter: acquire abandoned before its slot, refunded quota for {}",
                self.day
            );
        }
    }
}
