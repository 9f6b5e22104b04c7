//! Error types for session and login-flow operations.

/// Result type alias for session operations.
pub type Result<T> = std::result::Result<T, Error>;

/// Session and login-flow error types.
#[derive(Debug, thiserror::Error)]
pub enum Error {
    /// No usable session: the session cookie is absent or undecryptable.
    #[error("Not authenticated: {0}")]
    NotAuthenticated(&'static str),

    /// The callback `state` parameter did not match the state cookie.
    #[error("OAuth state mismatch")]
    StateMismatch,

    /// The callback carried no authorization code.
    #[error("Missing authorization code")]
    MissingCode,

    /// The verifier cookie expired or was never set.
    #[error("Missing PKCE verifier cookie")]
    MissingVerifier,

    /// The provider rejected the authorization-code exchange.
    #[error("Token exchange failed with status {0}")]
    TokenExchange(u16),

    /// The provider issued no refresh token.
    #[error("No refresh token received")]
    NoRefreshToken,

    /// The provider rejected the refresh grant.
    #[error("Token refresh failed with status {0}")]
    RefreshFailed(u16),

    /// A token-endpoint call exceeded its deadline.
    #[error("Token request timed out after {0} seconds")]
    Timeout(u64),

    /// HTTP request error.
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    /// URL parsing error.
    #[error("URL error: {0}")]
    Url(#[from] url::ParseError),

    /// Session-cookie encryption failure.
    #[error("Crypto error: {0}")]
    Crypto(#[from] switchboard_crypto::Error),
}

impl Error {
    /// HTTP status an embedding handler should answer with.
    ///
    /// Refresh rejections map to 401 like missing sessions: in both
    /// cases the user has to sign in again.
    #[must_use]
    pub const fn status(&self) -> u16 {
        match self {
            Self::NotAuthenticated(_) | Self::RefreshFailed(_) => 401,
            Self::StateMismatch => 403,
            Self::MissingCode | Self::MissingVerifier => 400,
            _ => 500,
        }
    }
}
