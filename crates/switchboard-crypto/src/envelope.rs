//! AES-256-GCM envelope encryption for a single secret string.
//!
//! An envelope is three base64 fields joined by `:`:
//! `base64(nonce):base64(tag):base64(ciphertext)`. The colon never
//! appears in the base64 alphabet, so splitting is unambiguous. A
//! fresh random nonce is drawn for every encryption.

use aes_gcm::{
    Aes256Gcm, Nonce,
    aead::{Aead, KeyInit, OsRng, rand_core::RngCore},
};
use base64::{Engine, engine::general_purpose::STANDARD as BASE64};

use crate::error::{Error, Result};

/// AES-256 key size in bytes.
pub const KEY_SIZE: usize = 32;

/// AES-GCM nonce size in bytes (96 bits).
pub const NONCE_SIZE: usize = 12;

/// AES-GCM authentication tag size in bytes.
pub const TAG_SIZE: usize = 16;

/// Field separator between the encoded envelope components.
const SEPARATOR: char = ':';

/// A 32-byte symmetric key for envelope encryption.
///
/// Provisioned out-of-band as a base64 string (the `COOKIE_SECRET`
/// configuration value). The raw bytes are never exposed through
/// `Debug`.
#[derive(Clone)]
pub struct SecretKey([u8; KEY_SIZE]);

impl SecretKey {
    /// Decode a base64-encoded key.
    ///
    /// # Errors
    ///
    /// Returns [`Error::InvalidKeyEncoding`] if the input is not valid
    /// base64, or [`Error::InvalidKeyLength`] if it does not decode to
    /// exactly 32 bytes.
    pub fn from_base64(encoded: &str) -> Result<Self> {
        let bytes = BASE64
            .decode(encoded)
            .map_err(|_| Error::InvalidKeyEncoding)?;
        let len = bytes.len();
        let key: [u8; KEY_SIZE] = bytes.try_into().map_err(|_| Error::InvalidKeyLength(len))?;
        Ok(Self(key))
    }

    /// Wrap raw key bytes.
    #[must_use]
    pub const fn from_bytes(bytes: [u8; KEY_SIZE]) -> Self {
        Self(bytes)
    }
}

impl std::fmt::Debug for SecretKey {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str("SecretKey(..)")
    }
}

/// Authenticated encryption for a single secret string.
///
/// Wraps an AES-256-GCM cipher initialized once from a [`SecretKey`].
/// Decryption fails closed: any tampering with the envelope surfaces
/// as an error, never as corrupted plaintext.
pub struct CryptoBox {
    cipher: Aes256Gcm,
}

impl CryptoBox {
    /// Create a crypto box from a secret key.
    #[must_use]
    pub fn new(key: &SecretKey) -> Self {
        Self {
            cipher: Aes256Gcm::new(&key.0.into()),
        }
    }

    /// Encrypt a plaintext string into an envelope.
    ///
    /// Every call draws a fresh random nonce, so encrypting the same
    /// plaintext twice produces different envelopes.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Encrypt`] if the AEAD operation fails.
    pub fn encrypt(&self, plaintext: &str) -> Result<String> {
        let mut nonce_bytes = [0u8; NONCE_SIZE];
        OsRng.fill_bytes(&mut nonce_bytes);
        let nonce = Nonce::from_slice(&nonce_bytes);

        // The AEAD output is ciphertext || tag; the envelope keeps the
        // tag as its own field.
        let mut sealed = self
            .cipher
            .encrypt(nonce, plaintext.as_bytes())
            .map_err(|_| Error::Encrypt)?;
        let tag = sealed.split_off(sealed.len() - TAG_SIZE);

        Ok(format!(
            "{}{SEPARATOR}{}{SEPARATOR}{}",
            BASE64.encode(nonce_bytes),
            BASE64.encode(&tag),
            BASE64.encode(&sealed),
        ))
    }

    /// Decrypt an envelope back into the plaintext string.
    ///
    /// # Errors
    ///
    /// Returns [`Error::MalformedEnvelope`] if the envelope does not
    /// have exactly three fields, a field is not valid base64, or the
    /// nonce/tag have the wrong decoded size; [`Error::Integrity`] if
    /// authentication fails (tampered data or wrong key);
    /// [`Error::Utf8Decode`] if the decrypted bytes are not UTF-8.
    pub fn decrypt(&self, envelope: &str) -> Result<String> {
        let fields: Vec<&str> = envelope.split(SEPARATOR).collect();
        if fields.len() != 3 {
            return Err(Error::MalformedEnvelope("expected 3 fields"));
        }

        let nonce_bytes = BASE64
            .decode(fields[0])
            .map_err(|_| Error::MalformedEnvelope("nonce is not valid base64"))?;
        if nonce_bytes.len() != NONCE_SIZE {
            return Err(Error::MalformedEnvelope("nonce must be 12 bytes"));
        }
        let tag = BASE64
            .decode(fields[1])
            .map_err(|_| Error::MalformedEnvelope("tag is not valid base64"))?;
        if tag.len() != TAG_SIZE {
            return Err(Error::MalformedEnvelope("tag must be 16 bytes"));
        }
        let mut sealed = BASE64
            .decode(fields[2])
            .map_err(|_| Error::MalformedEnvelope("ciphertext is not valid base64"))?;
        sealed.extend_from_slice(&tag);

        let plaintext = self
            .cipher
            .decrypt(Nonce::from_slice(&nonce_bytes), sealed.as_ref())
            .map_err(|_| Error::Integrity)?;

        Ok(String::from_utf8(plaintext)?)
    }
}
