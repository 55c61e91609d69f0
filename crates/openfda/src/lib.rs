//! Devicewatch openFDA Crate
//!
//! Rate-limited, cached access to the openFDA device adverse event API
//! (`https://api.fda.gov/device/event.json`).
//!
//! # Overview
//!
//! The crate supports:
//! - Field-value enumeration (`count=<field>`) for populating filter choices
//! - Free-text event search (`search=<expression>&limit=<n>`)
//! - A shared per-minute and per-day request quota
//! - TTL caching of enumerations
//!
//! # Architecture
//!
//! ```text
//! +------------------+
//! |      Caller      |  (UI, CLI)
//! +------------------+
//!          |
//!          v
//! +------------------+     +------------------+
//! |    FdaClient     | --> |   ResultCache    |  (count queries only)
//! +------------------+     +------------------+
//!          |
//!          v
//! +------------------+
//! |   RateLimiter    |  (spacing + daily quota)
//! +------------------+
//!          |
//!          v
//! +------------------+
//! |  HttpTransport   |  (reqwest)
//! +------------------+
//!          |
//!          v
//! +------------------+
//! |   FetchOutcome   |  (Success, RateLimited, HttpError, ...)
//! +------------------+
//! ```
//!
//! # Core Types
//!
//! - [`FdaClient`] - Issues requests and normalizes responses
//! - [`RateLimiter`] - Gates every outbound request
//! - [`ResultCache`] - Memoizes successful lookups for a TTL
//! - [`FetchOutcome`] - Closed set of results every call ends in
//! - [`EventQuery`] - Search expression plus clamped limit
//! - [`Clock`] - Time source, swappable for [`ManualClock`] in tests

pub mod client;
pub mod clock;
pub mod errors;
pub mod models;
pub mod throttle;

pub use client::{FdaClient, FdaConfig, HttpResponse, HttpTransport, ReqwestTransport};
pub use clock::{Clock, ManualClock, SystemClock};
pub use errors::{FdaError, QuotaDenied, RetryClass, TransportError};
pub use models::{EventQuery, FacetField, FetchOutcome, QuotaSnapshot, RawEvent, SearchKind};
pub use throttle::{Grant, RateLimitConfig, RateLimiter, ResultCache};
