//! Munin error types

use std::time::Duration;

/// Munin error types.
///
/// Derives `Clone`: a deduplicated fetch settles once and fans its result —
/// including its error — out to every attached caller, so errors must be
/// cloneable. This is also why [`MuninError::Json`] carries a rendered
/// message rather than the underlying `serde_json::Error`.
#[derive(Debug, Clone, thiserror::Error)]
pub enum MuninError {
    // Network errors, as reported by the host's suppliers and transport
    #[error("network error: {0}")]
    Network(String),

    #[error("API error ({status}): {message}")]
    Api { status: u16, message: String },

    #[error("rate limited, retry after {retry_after:?}")]
    RateLimited { retry_after: Option<Duration> },

    /// Connectivity observer reports no network.
    #[error("offline")]
    Offline,

    // Data errors
    #[error("JSON error: {0}")]
    Json(String),

    #[error("invalid input: {0}")]
    InvalidInput(String),

    /// Durable storage failure. Persistence is best-effort: internal
    /// callers log this and continue rather than propagating it.
    #[error("storage error: {0}")]
    Storage(String),

    // Configuration errors
    #[error("configuration error: {0}")]
    Configuration(String),
}

impl MuninError {
    /// Whether this error is worth retrying.
    ///
    /// Transient: network failures, rate limits, offline, and 408/429/5xx
    /// API statuses. Everything else (4xx rejections, bad JSON, storage,
    /// configuration) is permanent.
    pub fn is_transient(&self) -> bool {
        match self {
            MuninError::Network(_) | MuninError::RateLimited { .. } | MuninError::Offline => true,
            MuninError::Api { status, .. } => *status >= 500 || *status == 408 || *status == 429,
            _ => false,
        }
    }

    /// Retry-after hint, if the error carries one.
    pub fn retry_after(&self) -> Option<Duration> {
        match self {
            MuninError::RateLimited { retry_after } => *retry_after,
            _ => None,
        }
    }
}

impl From<serde_json::Error> for MuninError {
    fn from(err: serde_json::Error) -> Self {
        MuninError::Json(err.to_string())
    }
}

/// Result type alias for munin operations
pub type Result<T> = std::result::Result<T, MuninError>;
