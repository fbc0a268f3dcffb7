//! Configuration for a validation run.
use chrono::{DateTime, Utc};

/// Options threaded through a single validation run.
///
/// The clock is injected so date-age assertions stay deterministic under
/// test; the default binding reads the system clock. The `debug` flag
/// controls whether diagnostics include full payloads instead of
/// summaries.
#[derive(Clone, Copy)]
pub struct ValidationOptions {
    pub(crate) now: fn() -> DateTime<Utc>,
    pub(crate) debug: bool,
}

impl ValidationOptions {
    /// Replace the time source used by `dateAge` and friends.
    #[must_use]
    pub fn with_clock(mut self, now: fn() -> DateTime<Utc>) -> Self {
        self.now = now;
        self
    }

    /// Include full payloads in diagnostics instead of summaries.
    #[must_use]
    pub fn with_debug(mut self, debug: bool) -> Self {
        self.debug = debug;
        self
    }

    pub(crate) fn now(&self) -> DateTime<Utc> {
        (self.now)()
    }
}

impl Default for ValidationOptions {
    fn default() -> Self {
        ValidationOptions {
            now: Utc::now,
            debug: false,
        }
    }
}

impl std::fmt::Debug for ValidationOptions {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ValidationOptions")
            .field("debug", &self.debug)
            .finish()
    }
}
