//! Thread cache for offline support.
//!
//! This module persists thread metadata and full thread details so the
//! client can render a useful inbox when the provider is unreachable.
//! Entries never expire on their own: staleness is a policy decision
//! made by the caller, and absence of a row is the only miss signal.

mod model;
mod repository;

pub use model::{CacheStats, CachedEntry};
pub use repository::CacheRepository;
