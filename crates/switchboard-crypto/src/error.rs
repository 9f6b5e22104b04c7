//! Error types for envelope encryption.

use std::string::FromUtf8Error;

/// Result type alias for crypto operations.
pub type Result<T> = std::result::Result<T, Error>;

/// Crypto error types.
#[derive(Debug, thiserror::Error)]
pub enum Error {
    /// Key material is not valid base64.
    #[error("Key is not valid base64")]
    InvalidKeyEncoding,

    /// Key material did not decode to exactly 32 bytes.
    #[error("Invalid key length: expected 32 bytes, got {0}")]
    InvalidKeyLength(usize),

    /// Envelope structure is damaged: wrong field count, bad base64,
    /// or wrong nonce/tag sizes.
    #[error("Malformed envelope: {0}")]
    MalformedEnvelope(&'static str),

    /// Authentication tag did not verify: the envelope was tampered
    /// with or the key is wrong.
    #[error("Integrity check failed: tampered envelope or wrong key")]
    Integrity,

    /// AEAD encryption failed.
    #[error("Encryption failed")]
    Encrypt,

    /// Decrypted bytes are not valid UTF-8.
    #[error("Decrypted data is not valid UTF-8: {0}")]
    Utf8Decode(#[from] FromUtf8Error),
}
