//! PKCE (Proof Key for Code Exchange, RFC 7636) support.
//!
//! The login flow never stores the authorization code secret
//! server-side: the verifier rides in an ephemeral cookie and the
//! provider checks it against the challenge sent with the consent URL.

use base64::Engine;
use base64::engine::general_purpose::URL_SAFE_NO_PAD;
use rand::Rng;
use sha2::{Digest, Sha256};

/// Challenge method sent to the provider. SHA-256 is the only method
/// this crate implements; `plain` is deliberately unsupported.
pub const CHALLENGE_METHOD: &str = "S256";

/// Generates a URL-safe random token: 32 OS-seeded random bytes,
/// base64url-encoded without padding (43 characters).
///
/// Used for PKCE verifiers, the OAuth `state` parameter, and CSRF
/// tokens.
#[must_use]
pub fn random_token() -> String {
    let mut bytes = [0u8; 32];
    rand::thread_rng().fill(&mut bytes);
    URL_SAFE_NO_PAD.encode(bytes)
}

/// PKCE verifier and challenge pair.
#[derive(Debug, Clone)]
pub struct PkcePair {
    /// Code verifier, kept client-side until the callback.
    pub verifier: String,
    /// Code challenge, sent with the authorization request.
    pub challenge: String,
}

impl PkcePair {
    /// Generates a fresh pair.
    ///
    /// The verifier is 43 characters, inside the 43-128 window RFC 7636
    /// requires; the challenge is its base64url-encoded SHA-256 digest.
    #[must_use]
    pub fn generate() -> Self {
        let verifier = random_token();
        let challenge = Self::compute_challenge(&verifier);
        Self { verifier, challenge }
    }

    /// Computes the S256 challenge for a verifier.
    fn compute_challenge(verifier: &str) -> String {
        let digest = Sha256::digest(verifier.as_bytes());
        URL_SAFE_NO_PAD.encode(digest)
    }
}
