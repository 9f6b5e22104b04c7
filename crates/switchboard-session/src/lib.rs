//! # switchboard-session
//!
//! OAuth2 login flow and session management for the Switchboard email
//! client.
//!
//! ## Features
//!
//! - **Authorization Code Flow with PKCE** (S256) against Google's
//!   OAuth endpoints, requesting offline access so a refresh token is
//!   issued on first consent
//! - **Encrypted session cookie**: the refresh token is the only
//!   durable credential and is stored AEAD-sealed in the `sb_session`
//!   cookie; the server keeps no account database
//! - **Access-token cache**: short-lived bearer tokens cached in
//!   memory per session, refreshed behind a safety buffer before the
//!   provider expiry
//! - **CSRF double submit**: a script-readable `sb_csrf` cookie the
//!   frontend echoes in the `x-csrf-token` header, compared in
//!   constant time
//!
//! ## Quick Start
//!
//! The crate is HTTP-framework agnostic: it consumes a [`CookieJar`]
//! parsed from the `Cookie` header and hands back [`SetCookie`] values
//! to render. A typical embedding wires three handlers:
//!
//! ```ignore
//! use switchboard_crypto::SecretKey;
//! use switchboard_session::{CallbackOutcome, CookieJar, SessionConfig, SessionManager};
//!
//! let key = SecretKey::from_base64(&cookie_secret)?;
//! let config = SessionConfig::new(client_id, client_secret, redirect_uri, key);
//! let manager = SessionManager::new(config);
//!
//! // GET /api/auth/login
//! let start = manager.initiate()?;
//! // redirect to start.auth_url, setting start.cookies
//!
//! // GET /api/auth/callback
//! let jar = CookieJar::from_header(request.header("cookie"));
//! match manager.complete_callback(request.url(), &jar).await? {
//!     CallbackOutcome::Success { cookies, redirect } => {
//!         // set cookies, redirect to `redirect`
//!     }
//!     CallbackOutcome::Denied { redirect } => {
//!         // redirect without setting cookies
//!     }
//! }
//!
//! // any API handler
//! let token = manager.access_token(&jar).await?;
//! // use `token` as the Bearer credential; on a mutating request,
//! // first check manager.validate_csrf(&jar, request.header("x-csrf-token"))
//! ```
//!
//! Failures carry an HTTP mapping via [`Error::status`], so handlers
//! can translate them without matching every variant.

#![warn(missing_docs)]
#![warn(clippy::all)]
#![warn(clippy::pedantic)]
#![forbid(unsafe_code)]

pub mod cookie;
pub mod csrf;
mod error;
pub mod manager;
pub mod pkce;
pub mod token;

pub use cookie::{CookieJar, SetCookie};
pub use csrf::CSRF_HEADER;
pub use error::{Error, Result};
pub use manager::{CallbackOutcome, LoginStart, SessionConfig, SessionManager};
pub use pkce::PkcePair;
pub use token::{CachedToken, TokenCache};
