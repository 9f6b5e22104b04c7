//! CSRF double-submit validation.
//!
//! Mutating endpoints require an `x-csrf-token` header equal to the
//! `sb_csrf` cookie. The cookie is script-readable so the frontend can
//! copy it into the header; a cross-site attacker can trigger the
//! request but cannot read the cookie to forge the header.

use crate::cookie::{CSRF_COOKIE, CookieJar};

/// Request header carrying the CSRF token.
pub const CSRF_HEADER: &str = "x-csrf-token";

/// Checks a request's CSRF token against its cookie.
///
/// Returns true iff both sides are present, non-empty, and equal.
/// Missing or empty sides are an ordinary false, never an error.
#[must_use]
pub fn validate(jar: &CookieJar, header: Option<&str>) -> bool {
    let (Some(cookie), Some(header)) = (jar.get(CSRF_COOKIE), header) else {
        return false;
    };
    if cookie.is_empty() || header.is_empty() {
        return false;
    }
    constant_time_eq(cookie.as_bytes(), header.as_bytes())
}

/// Equality that does not short-circuit on the first differing byte.
///
/// Length is checked up front; over equal-length inputs the comparison
/// touches every byte and accumulates differences with XOR.
fn constant_time_eq(a: &[u8], b: &[u8]) -> bool {
    if a.len() != b.len() {
        return false;
    }
    let mut diff = 0u8;
    for (x, y) in a.iter().zip(b.iter()) {
        diff |= x ^ y;
    }
    diff == 0
}
