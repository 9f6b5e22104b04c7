//! Access-token caching.
//!
//! Access tokens are short-lived and never leave the process; only the
//! encrypted refresh token is persisted (in the session cookie). The
//! cache is keyed by that encrypted cookie value, so each browser
//! session maps to its own entry.

use std::collections::HashMap;
use std::sync::{Mutex, MutexGuard, PoisonError};

use chrono::{DateTime, Duration, Utc};
use serde::Deserialize;

/// Seconds subtracted from the provider-reported lifetime when caching.
///
/// A token within this buffer of its real expiry is treated as stale,
/// so requests in flight when it lapses still carry a valid token.
pub const EXPIRY_BUFFER_SECS: i64 = 300;

/// Token-endpoint response body, shared by both grant types.
#[derive(Debug, Clone, Deserialize)]
pub(crate) struct TokenResponse {
    pub access_token: String,
    #[serde(default)]
    pub expires_in: Option<u32>,
    #[serde(default)]
    pub refresh_token: Option<String>,
}

/// A cached access token with its effective expiry.
#[derive(Debug, Clone)]
pub struct CachedToken {
    /// Bearer token value.
    pub access_token: String,
    /// Instant after which the entry no longer serves.
    pub expires_at: DateTime<Utc>,
}

impl CachedToken {
    /// Builds a cache entry from a token response, applying
    /// [`EXPIRY_BUFFER_SECS`] to the provider-reported lifetime.
    ///
    /// A response without `expires_in` produces an already stale entry:
    /// the token is still returned to the caller, but the next request
    /// refreshes again.
    pub(crate) fn from_response(response: TokenResponse) -> Self {
        let lifetime = i64::from(response.expires_in.unwrap_or(0)) - EXPIRY_BUFFER_SECS;
        Self {
            access_token: response.access_token,
            expires_at: Utc::now() + Duration::seconds(lifetime.max(0)),
        }
    }

    /// True while the entry may serve without a refresh.
    #[must_use]
    pub fn is_fresh(&self) -> bool {
        Utc::now() < self.expires_at
    }
}

/// In-memory access-token cache keyed by encrypted session cookie.
///
/// Concurrent misses for the same session may each run a refresh; the
/// refresh grant is idempotent provider-side, so the cache does no
/// single-flight coordination and last write wins.
#[derive(Debug, Default)]
pub struct TokenCache {
    entries: Mutex<HashMap<String, CachedToken>>,
}

impl TokenCache {
    /// Creates an empty cache.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns a fresh token for the session, dropping the entry if it
    /// has gone stale.
    #[must_use]
    pub fn get(&self, session: &str) -> Option<CachedToken> {
        let mut entries = self.lock();
        match entries.get(session) {
            Some(token) if token.is_fresh() => Some(token.clone()),
            Some(_) => {
                entries.remove(session);
                None
            }
            None => None,
        }
    }

    /// Stores a token for the session, replacing any existing entry.
    pub fn put(&self, session: &str, token: CachedToken) {
        self.lock().insert(session.to_string(), token);
    }

    /// Drops the session's entry so a later login cannot observe a
    /// token refreshed for a logged-out session.
    pub fn invalidate(&self, session: &str) {
        self.lock().remove(session);
    }

    fn lock(&self) -> MutexGuard<'_, HashMap<String, CachedToken>> {
        self.entries.lock().unwrap_or_else(PoisonError::into_inner)
    }
}
