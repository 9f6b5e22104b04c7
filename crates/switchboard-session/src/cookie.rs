//! Cookie model for the session layer.
//!
//! Cookies are plain values here: [`SetCookie`] describes a
//! `Set-Cookie` response header to write, and [`CookieJar`] wraps the
//! name/value pairs of a request's `Cookie` header. The embedding HTTP
//! layer moves them on and off the wire.

use std::collections::HashMap;
use std::fmt;

/// Ephemeral cookie carrying the PKCE verifier across the login
/// round-trip.
pub const PKCE_COOKIE: &str = "sb_pkce_verifier";

/// Ephemeral cookie carrying the OAuth `state` parameter.
pub const STATE_COOKIE: &str = "sb_oauth_state";

/// Cookie holding the encrypted refresh token.
pub const SESSION_COOKIE: &str = "sb_session";

/// Script-readable cookie holding the CSRF double-submit token.
pub const CSRF_COOKIE: &str = "sb_csrf";

/// Lifetime of the ephemeral login cookies (10 minutes).
pub const EPHEMERAL_MAX_AGE: u64 = 600;

/// Lifetime of the session cookie (180 days).
pub const SESSION_MAX_AGE: u64 = 15_552_000;

/// A `Set-Cookie` response header described as a value.
///
/// All cookies issued by this crate use `Path=/` and `SameSite=Lax`;
/// those attributes are fixed in the rendered header.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SetCookie {
    /// Cookie name.
    pub name: String,
    /// Cookie value.
    pub value: String,
    /// `Max-Age` in seconds. `Some(0)` expires the cookie immediately;
    /// `None` omits the attribute (browser-session lifetime).
    pub max_age: Option<u64>,
    /// Whether the cookie is hidden from script access.
    pub http_only: bool,
    /// Whether the cookie is restricted to TLS requests.
    pub secure: bool,
}

impl SetCookie {
    /// Creates an `HttpOnly` cookie with the given lifetime.
    #[must_use]
    pub fn new(name: impl Into<String>, value: impl Into<String>, max_age: u64) -> Self {
        Self {
            name: name.into(),
            value: value.into(),
            max_age: Some(max_age),
            http_only: true,
            secure: true,
        }
    }

    /// Creates a script-readable cookie with browser-session lifetime.
    ///
    /// Used for the CSRF token, which the frontend must be able to copy
    /// into the request header for the double-submit check.
    #[must_use]
    pub fn readable(name: impl Into<String>, value: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            value: value.into(),
            max_age: None,
            http_only: false,
            secure: true,
        }
    }

    /// Creates a removal cookie: empty value, `Max-Age=0`.
    #[must_use]
    pub fn removal(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            value: String::new(),
            max_age: Some(0),
            http_only: true,
            secure: true,
        }
    }

    /// Sets the `HttpOnly` flag.
    #[must_use]
    pub const fn http_only(mut self, http_only: bool) -> Self {
        self.http_only = http_only;
        self
    }

    /// Sets the `Secure` flag.
    #[must_use]
    pub const fn secure(mut self, secure: bool) -> Self {
        self.secure = secure;
        self
    }
}

impl fmt::Display for SetCookie {
    /// Renders the `Set-Cookie` header value.
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}={}", self.name, self.value)?;
        if let Some(max_age) = self.max_age {
            write!(f, "; Max-Age={max_age}")?;
        }
        write!(f, "; Path=/; SameSite=Lax")?;
        if self.http_only {
            write!(f, "; HttpOnly")?;
        }
        if self.secure {
            write!(f, "; Secure")?;
        }
        Ok(())
    }
}

/// Cookies presented by a request, parsed from its `Cookie` header.
#[derive(Debug, Clone, Default)]
pub struct CookieJar {
    cookies: HashMap<String, String>,
}

impl CookieJar {
    /// Creates an empty jar.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Parses a `Cookie` request header (`name=value; name2=value2`).
    ///
    /// Fragments without a `=` are skipped. Values keep everything
    /// after the first `=`, so base64 padding and envelope separators
    /// survive intact.
    #[must_use]
    pub fn from_header(header: &str) -> Self {
        let cookies = header
            .split(';')
            .filter_map(|fragment| {
                let (name, value) = fragment.trim().split_once('=')?;
                if name.is_empty() {
                    return None;
                }
                Some((name.to_string(), value.to_string()))
            })
            .collect();
        Self { cookies }
    }

    /// Returns the value of the named cookie.
    #[must_use]
    pub fn get(&self, name: &str) -> Option<&str> {
        self.cookies.get(name).map(String::as_str)
    }

    /// Inserts a cookie value, replacing any existing one.
    pub fn insert(&mut self, name: impl Into<String>, value: impl Into<String>) {
        self.cookies.insert(name.into(), value.into());
    }

    /// Returns true if the jar holds no cookies.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.cookies.is_empty()
    }
}
