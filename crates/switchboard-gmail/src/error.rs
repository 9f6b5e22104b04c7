//! Error types for the Gmail client.

use thiserror::Error;

/// Result alias for Gmail operations.
pub type Result<T> = std::result::Result<T, Error>;

/// Errors surfaced by Gmail API calls and the batch codec.
#[derive(Debug, Error)]
pub enum Error {
    /// The provider answered with a non-success HTTP status.
    #[error("Gmail API returned status {0}")]
    Status(u16),

    /// A request exceeded its deadline.
    #[error("Gmail API request timed out after {0} seconds")]
    Timeout(u64),

    /// More sub-requests than one batch exchange carries.
    #[error("Batch of {0} sub-requests exceeds the provider limit of 100")]
    BatchTooLarge(usize),

    /// HTTP transport failure.
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    /// A payload that should be base64url was not.
    #[error("Base64 decode error: {0}")]
    Base64(#[from] base64::DecodeError),
}

impl Error {
    /// Whether the provider rejected the caller's credentials.
    ///
    /// A `401` means the access token is expired or revoked and the
    /// caller should refresh or sign in again; every other failure is
    /// worth retrying or reporting as-is.
    #[must_use]
    pub const fn is_unauthorized(&self) -> bool {
        matches!(self, Self::Status(401))
    }
}
