//! Data types shared by the rate limiter, the cache and the client.

mod outcome;
mod query;
mod quota;

pub use outcome::{FetchOutcome, RawEvent};
pub use query::{
    clamp_limit, EventQuery, FacetField, SearchKind, DEFAULT_SEARCH_LIMIT, MAX_LIMIT,
};
pub use quota::QuotaSnapshot;
