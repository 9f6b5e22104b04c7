//! # switchboard-crypto
//!
//! Authenticated encryption for Switchboard session tokens.
//!
//! The session layer stores the OAuth refresh token in a browser
//! cookie. This crate seals that value with AES-256-GCM so the cookie
//! holds only an opaque envelope: three base64 fields (nonce, tag,
//! ciphertext) joined by `:`.
//!
//! ## Quick Start
//!
//! ```
//! use switchboard_crypto::{CryptoBox, SecretKey};
//!
//! # fn main() -> switchboard_crypto::Result<()> {
//! let key = SecretKey::from_bytes([0u8; 32]);
//! let crypto = CryptoBox::new(&key);
//!
//! let envelope = crypto.encrypt("refresh-token")?;
//! assert_eq!(crypto.decrypt(&envelope)?, "refresh-token");
//! # Ok(())
//! # }
//! ```
//!
//! Decryption fails closed: a tampered envelope or wrong key yields
//! [`Error::Integrity`], never corrupted plaintext.

#![warn(missing_docs)]
#![warn(clippy::all)]
#![warn(clippy::pedantic)]
#![forbid(unsafe_code)]

mod envelope;
mod error;

pub use envelope::{CryptoBox, KEY_SIZE, NONCE_SIZE, SecretKey, TAG_SIZE};
pub use error::{Error, Result};
