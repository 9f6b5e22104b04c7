//! Cache data models.

use chrono::{DateTime, Utc};

/// A cached domain object together with the instant the local copy was
/// written.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CachedEntry<T> {
    /// The cached object.
    pub data: T,
    /// When the local copy was captured.
    pub cached_at: DateTime<Utc>,
}

/// Row counts for the cache tables.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct CacheStats {
    /// Number of cached thread metadata rows.
    pub metadata_count: u64,
    /// Number of cached thread detail rows.
    pub detail_count: u64,
}
