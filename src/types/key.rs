//! Deterministic request keys.

use std::fmt;

use serde::Serialize;

use crate::Result;

/// Deterministic identifier for a request: endpoint plus parameter set.
///
/// Two calls with the same endpoint and semantically equal parameters map
/// to the same key, regardless of how the parameter value was constructed.
/// Parameters are canonicalised through `serde_json::Value`, whose object
/// maps are ordered by key, so field declaration order does not matter.
///
/// The key is a stable string (not a per-process hash) because the
/// revalidation-token map keyed by it persists across restarts.
///
/// ```rust
/// # use munin::CacheKey;
/// # use serde::Serialize;
/// #[derive(Serialize)]
/// struct Params<'a> { club_id: u32, status: &'a str }
///
/// let key = CacheKey::new("bookings/list", &Params { club_id: 7, status: "confirmed" })?;
/// assert_eq!(key.as_str(), r#"bookings/list?{"club_id":7,"status":"confirmed"}"#);
/// # Ok::<(), munin::MuninError>(())
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct CacheKey(String);

impl CacheKey {
    /// Derive a key from an endpoint identifier and its parameters.
    ///
    /// Fails only if `params` cannot be represented as JSON.
    pub fn new<P: Serialize>(endpoint: &str, params: &P) -> Result<Self> {
        let canonical = serde_json::to_value(params)?;
        Ok(Self(format!("{endpoint}?{canonical}")))
    }

    /// Key for an endpoint with no parameters.
    pub fn bare(endpoint: &str) -> Self {
        Self(format!("{endpoint}?null"))
    }

    /// The canonical string form.
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for CacheKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}
