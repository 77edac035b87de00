//! Telemetry metric name constants.
//!
//! Centralised metric names for munin operations. Consumers install their
//! own `metrics` recorder (e.g. prometheus, statsd); without a recorder
//! installed, all metric calls are no-ops.
//!
//! # Metric naming conventions
//!
//! All metrics are prefixed with `munin_`. Counters end in `_total`.
//!
//! # Common labels
//!
//! - `strategy` — read path: "ttl" or "revalidate"
//! - `status` — outcome: "ok" or "error"
//! - `store` — persisted snapshot: "tokens" or "queue"

/// Total cache hits served without a supplier call.
///
/// Labels: `strategy`.
pub const CACHE_HITS_TOTAL: &str = "munin_cache_hits_total";

/// Total cache misses (expired or absent entry).
///
/// Labels: `strategy`.
pub const CACHE_MISSES_TOTAL: &str = "munin_cache_misses_total";

/// Total callers that joined an already in-flight fetch instead of
/// issuing their own.
pub const DEDUP_JOINS_TOTAL: &str = "munin_dedup_joins_total";

/// Total conditional revalidations that came back "not modified".
pub const NOT_MODIFIED_TOTAL: &str = "munin_not_modified_total";

/// Total reads answered with stale cached data after a failed refresh.
pub const STALE_SERVED_TOTAL: &str = "munin_stale_served_total";

/// Total sync queue replay attempts.
///
/// Labels: `status` ("ok" | "error").
pub const SYNC_REPLAYS_TOTAL: &str = "munin_sync_replays_total";

/// Total drain passes initiated.
pub const SYNC_DRAINS_TOTAL: &str = "munin_sync_drains_total";

/// Total best-effort persistence failures that were logged and swallowed.
///
/// Labels: `store` ("tokens" | "queue").
pub const PERSIST_FAILURES_TOTAL: &str = "munin_persist_failures_total";
