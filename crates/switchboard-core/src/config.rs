//! Deployment configuration.
//!
//! All values arrive through environment variables and are required; a
//! missing or empty variable fails fast with an error naming it, so a
//! misconfigured deployment never limps along half-authenticated.

use crate::{Error, Result};

/// Environment variables read by [`Config::from_env`].
const CLIENT_ID_VAR: &str = "GOOGLE_CLIENT_ID";
const CLIENT_SECRET_VAR: &str = "GOOGLE_CLIENT_SECRET";
const BASE_URL_VAR: &str = "APP_BASE_URL";
const COOKIE_SECRET_VAR: &str = "COOKIE_SECRET";

/// Deployment configuration for the Switchboard application.
#[derive(Clone)]
pub struct Config {
    /// OAuth client id registered with the provider.
    pub client_id: String,
    /// OAuth client secret registered with the provider.
    pub client_secret: String,
    /// Base URL the application is served from, e.g.
    /// `https://mail.example.com`.
    pub base_url: String,
    /// Base64-encoded 32-byte cookie encryption secret.
    pub cookie_secret: String,
}

impl Config {
    /// Load configuration from environment variables.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Config`] naming the variable if any of
    /// `GOOGLE_CLIENT_ID`, `GOOGLE_CLIENT_SECRET`, `APP_BASE_URL`, or
    /// `COOKIE_SECRET` is unset or empty.
    pub fn from_env() -> Result<Self> {
        Self::from_lookup(|name| std::env::var(name).ok())
    }

    fn from_lookup<F>(lookup: F) -> Result<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        let require = |name: &'static str| -> Result<String> {
            match lookup(name) {
                Some(value) if !value.trim().is_empty() => Ok(value.trim().to_string()),
                _ => Err(Error::Config(format!(
                    "Missing required environment variable: {name}"
                ))),
            }
        };

        Ok(Self {
            client_id: require(CLIENT_ID_VAR)?,
            client_secret: require(CLIENT_SECRET_VAR)?,
            base_url: require(BASE_URL_VAR)?,
            cookie_secret: require(COOKIE_SECRET_VAR)?,
        })
    }

    /// The OAuth redirect URI, derived from the base URL.
    #[must_use]
    pub fn redirect_uri(&self) -> String {
        format!("{}/api/auth/callback", self.base_url.trim_end_matches('/'))
    }

    /// Whether cookies should carry the `Secure` attribute.
    ///
    /// True when the application is served over TLS.
    #[must_use]
    pub fn secure_cookies(&self) -> bool {
        self.base_url.starts_with("https://")
    }
}

impl std::fmt::Debug for Config {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Config")
            .field("client_id", &self.client_id)
            .field("client_secret", &"<redacted>")
            .field("base_url", &self.base_url)
            .field("cookie_secret", &"<redacted>")
            .finish()
    }
}
