//! Per-request fetch options.

use std::time::Duration;

/// Default time-to-live for cached payloads: five minutes.
pub const DEFAULT_CACHE_DURATION: Duration = Duration::from_secs(300);

/// Options for a single coordinated fetch.
///
/// ```rust
/// # use munin::FetchOptions;
/// # use std::time::Duration;
/// let options = FetchOptions::new()
///     .cache_duration(Duration::from_secs(60))
///     .force_refresh(true);
/// ```
#[derive(Debug, Clone)]
pub struct FetchOptions {
    /// How long a successful result stays fresh. Default: 5 minutes.
    pub cache_duration: Duration,
    /// Bypass cache and dedup, always invoking the supplier. Default: false.
    pub force_refresh: bool,
}

impl Default for FetchOptions {
    fn default() -> Self {
        Self {
            cache_duration: DEFAULT_CACHE_DURATION,
            force_refresh: false,
        }
    }
}

impl FetchOptions {
    /// Create options with the defaults.
    pub fn new() -> Self {
        Self::default()
    }

    /// Set how long the fetched payload stays fresh.
    pub fn cache_duration(mut self, ttl: Duration) -> Self {
        self.cache_duration = ttl;
        self
    }

    /// Set whether to bypass cache and deduplication.
    pub fn force_refresh(mut self, force: bool) -> Self {
        self.force_refresh = force;
        self
    }
}
