/// Classification for retry policy.
///
/// The client never retries on its own. Callers use this to decide what to
/// tell the user and whether a later attempt makes sense.
///
/// | Class | Retry? |
/// |-------|--------|
/// | `Never` | No, the request or response needs investigation |
/// | `WithBackoff` | Yes, after a caller-chosen backoff |
/// | `AfterQuotaReset` | Not before the daily quota window rolls over |
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub enum RetryClass {
    /// Terminal for this request: malformed body or invalid configuration.
    Never,

    /// Transient upstream or network failure.
    WithBackoff,

    /// The local daily quota is exhausted. Sticky until the date changes,
    /// so busy-retrying is pointless.
    AfterQuotaReset,
}
