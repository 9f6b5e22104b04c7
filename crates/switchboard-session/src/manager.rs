//! Login flow and session lifecycle.
//!
//! [`SessionManager`] owns the three moving parts of a browser session:
//! the OAuth2/PKCE consent round-trip, the encrypted refresh-token
//! cookie, and the in-memory access-token cache. The refresh token is
//! the only durable credential and it exists in exactly one place, AEAD
//! encrypted inside the `sb_session` cookie.

use std::collections::HashMap;
use std::fmt;
use std::time::Duration;

use switchboard_crypto::{CryptoBox, SecretKey};
use tokio::time::timeout;
use tracing::{debug, warn};
use url::Url;

use crate::cookie::{
    CSRF_COOKIE, CookieJar, EPHEMERAL_MAX_AGE, PKCE_COOKIE, SESSION_COOKIE, SESSION_MAX_AGE,
    STATE_COOKIE, SetCookie,
};
use crate::csrf;
use crate::error::{Error, Result};
use crate::pkce::{self, PkcePair, random_token};
use crate::token::{CachedToken, TokenCache, TokenResponse};

/// Google authorization endpoint.
const AUTH_URL: &str = "https://accounts.google.com/o/oauth2/v2/auth";

/// Google token endpoint.
const TOKEN_URL: &str = "https://oauth2.googleapis.com/token";

/// Scopes requested at login.
const SCOPES: &str = "openid email profile https://www.googleapis.com/auth/gmail.modify";

/// Deadline for token-endpoint requests.
const TOKEN_TIMEOUT_SECS: u64 = 10;

/// Configuration for a [`SessionManager`].
#[derive(Clone)]
pub struct SessionConfig {
    /// OAuth client id.
    pub client_id: String,
    /// OAuth client secret.
    pub client_secret: String,
    /// Redirect URI registered with the provider.
    pub redirect_uri: String,
    /// Key encrypting the session cookie.
    pub cookie_key: SecretKey,
    /// Whether issued cookies carry the `Secure` attribute. Disable
    /// only for plain-http development deployments.
    pub secure_cookies: bool,
}

impl SessionConfig {
    /// Creates a configuration with `Secure` cookies enabled.
    #[must_use]
    pub fn new(
        client_id: impl Into<String>,
        client_secret: impl Into<String>,
        redirect_uri: impl Into<String>,
        cookie_key: SecretKey,
    ) -> Self {
        Self {
            client_id: client_id.into(),
            client_secret: client_secret.into(),
            redirect_uri: redirect_uri.into(),
            cookie_key,
            secure_cookies: true,
        }
    }

    /// Enables or disables the `Secure` cookie attribute.
    #[must_use]
    pub const fn secure_cookies(mut self, secure: bool) -> Self {
        self.secure_cookies = secure;
        self
    }
}

impl fmt::Debug for SessionConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SessionConfig")
            .field("client_id", &self.client_id)
            .field("client_secret", &"<redacted>")
            .field("redirect_uri", &self.redirect_uri)
            .field("cookie_key", &self.cookie_key)
            .field("secure_cookies", &self.secure_cookies)
            .finish()
    }
}

/// Output of [`SessionManager::initiate`].
#[derive(Debug)]
pub struct LoginStart {
    /// Provider consent URL to redirect the browser to.
    pub auth_url: Url,
    /// Verifier and state cookies to set on the redirect response.
    pub cookies: [SetCookie; 2],
}

/// Output of [`SessionManager::complete_callback`].
#[derive(Debug)]
pub enum CallbackOutcome {
    /// Tokens were obtained and a session established.
    Success {
        /// Session and CSRF cookies, plus removals for the ephemeral
        /// login cookies.
        cookies: [SetCookie; 4],
        /// Where to send the browser next.
        redirect: String,
    },
    /// The provider reported an error code (for example the user
    /// denied consent). Not a hard failure: the browser goes back to
    /// the login page and no cookies are written.
    Denied {
        /// Login page URL carrying the provider error code.
        redirect: String,
    },
}

/// Manages the OAuth login flow and the lifetime of browser sessions.
///
/// One manager is constructed per process and shared across requests;
/// its token cache is keyed by encrypted session cookie, so each
/// browser session refreshes independently.
pub struct SessionManager {
    config: SessionConfig,
    crypto: CryptoBox,
    cache: TokenCache,
    http: reqwest::Client,
    token_url: String,
}

impl SessionManager {
    /// Creates a manager for the given configuration.
    #[must_use]
    pub fn new(config: SessionConfig) -> Self {
        let crypto = CryptoBox::new(&config.cookie_key);
        Self {
            config,
            crypto,
            cache: TokenCache::new(),
            http: reqwest::Client::new(),
            token_url: TOKEN_URL.to_string(),
        }
    }

    /// Overrides the token endpoint.
    #[must_use]
    pub fn with_token_url(mut self, url: impl Into<String>) -> Self {
        self.token_url = url.into();
        self
    }

    /// Starts a login: builds the consent URL and the ephemeral
    /// verifier/state cookies to set alongside the redirect.
    ///
    /// # Errors
    ///
    /// Returns an error if the authorization URL cannot be built.
    pub fn initiate(&self) -> Result<LoginStart> {
        let pair = PkcePair::generate();
        let state = random_token();

        let mut auth_url = Url::parse(AUTH_URL)?;
        {
            let mut pairs = auth_url.query_pairs_mut();
            pairs
                .append_pair("client_id", &self.config.client_id)
                .append_pair("redirect_uri", &self.config.redirect_uri)
                .append_pair("response_type", "code")
                .append_pair("scope", SCOPES)
                .append_pair("code_challenge", &pair.challenge)
                .append_pair("code_challenge_method", pkce::CHALLENGE_METHOD)
                .append_pair("access_type", "offline")
                .append_pair("prompt", "consent")
                .append_pair("state", &state);
        }

        let secure = self.config.secure_cookies;
        let cookies = [
            SetCookie::new(PKCE_COOKIE, pair.verifier, EPHEMERAL_MAX_AGE).secure(secure),
            SetCookie::new(STATE_COOKIE, state, EPHEMERAL_MAX_AGE).secure(secure),
        ];

        Ok(LoginStart { auth_url, cookies })
    }

    /// Completes the login from the provider redirect.
    ///
    /// Verifies the `state` round-trip, exchanges the authorization
    /// code (with the PKCE verifier) for tokens, and encrypts the
    /// refresh token into the session cookie.
    ///
    /// # Errors
    ///
    /// `StateMismatch` when the `state` parameter is absent or differs
    /// from the state cookie; `MissingCode`/`MissingVerifier` when the
    /// redirect or the jar is incomplete; `TokenExchange`/`Timeout`/
    /// `Http` when the code exchange fails; `NoRefreshToken` when the
    /// provider answered without one. No cookies are written on any
    /// error path.
    pub async fn complete_callback(
        &self,
        callback_url: &str,
        jar: &CookieJar,
    ) -> Result<CallbackOutcome> {
        let url = Url::parse(callback_url)?;
        let params: HashMap<String, String> = url.query_pairs().into_owned().collect();

        match (params.get("state"), jar.get(STATE_COOKIE)) {
            (Some(param), Some(cookie)) if param == cookie => {}
            _ => return Err(Error::StateMismatch),
        }

        if let Some(code) = params.get("error") {
            debug!("Authorization denied by provider: {code}");
            return Ok(CallbackOutcome::Denied {
                redirect: format!("/login?error={code}"),
            });
        }

        let code = params.get("code").ok_or(Error::MissingCode)?;
        let verifier = jar.get(PKCE_COOKIE).ok_or(Error::MissingVerifier)?;

        let response = self.exchange_code(code, verifier).await?;
        let refresh_token = response.refresh_token.ok_or(Error::NoRefreshToken)?;

        let session_value = self.crypto.encrypt(&refresh_token)?;
        let secure = self.config.secure_cookies;
        let cookies = [
            SetCookie::new(SESSION_COOKIE, session_value, SESSION_MAX_AGE).secure(secure),
            SetCookie::readable(CSRF_COOKIE, random_token()).secure(secure),
            SetCookie::removal(PKCE_COOKIE).secure(secure),
            SetCookie::removal(STATE_COOKIE).secure(secure),
        ];

        Ok(CallbackOutcome::Success {
            cookies,
            redirect: "/".to_string(),
        })
    }

    /// Returns a bearer token for the request's session.
    ///
    /// Serves from the cache while the cached token is outside its
    /// refresh buffer; otherwise redeems the encrypted refresh token at
    /// the token endpoint and caches the result.
    ///
    /// # Errors
    ///
    /// `NotAuthenticated` when the session cookie is absent or cannot
    /// be decrypted; `RefreshFailed`, `Timeout` or `Http` when the
    /// refresh grant does not produce a token.
    pub async fn access_token(&self, jar: &CookieJar) -> Result<String> {
        let Some(session) = jar.get(SESSION_COOKIE) else {
            debug!("Request without session cookie");
            return Err(Error::NotAuthenticated("no session"));
        };

        if let Some(token) = self.cache.get(session) {
            return Ok(token.access_token);
        }

        let refresh_token = match self.crypto.decrypt(session) {
            Ok(value) => value,
            Err(e) => {
                warn!("Failed to decrypt session cookie: {e}");
                return Err(Error::NotAuthenticated("corrupted session cookie"));
            }
        };

        let response = self.refresh_grant(&refresh_token).await?;
        let token = CachedToken::from_response(response);
        let access_token = token.access_token.clone();
        self.cache.put(session, token);
        Ok(access_token)
    }

    /// Ends the session: expires its cookies and drops the cached
    /// access token so a later login starts clean.
    #[must_use]
    pub fn logout(&self, jar: &CookieJar) -> [SetCookie; 2] {
        if let Some(session) = jar.get(SESSION_COOKIE) {
            self.cache.invalidate(session);
        }
        let secure = self.config.secure_cookies;
        [
            SetCookie::removal(SESSION_COOKIE).secure(secure),
            SetCookie::removal(CSRF_COOKIE).secure(secure),
        ]
    }

    /// Double-submit CSRF check for a mutating request.
    ///
    /// Compares the `x-csrf-token` header value against the CSRF
    /// cookie; see [`crate::csrf::validate`].
    #[must_use]
    pub fn validate_csrf(&self, jar: &CookieJar, header: Option<&str>) -> bool {
        csrf::validate(jar, header)
    }

    /// Exchanges an authorization code for tokens.
    async fn exchange_code(&self, code: &str, verifier: &str) -> Result<TokenResponse> {
        let mut params = HashMap::new();
        params.insert("grant_type", "authorization_code");
        params.insert("code", code);
        params.insert("client_id", &self.config.client_id);
        params.insert("client_secret", &self.config.client_secret);
        params.insert("redirect_uri", &self.config.redirect_uri);
        params.insert("code_verifier", verifier);

        let response = self.post_token_endpoint(&params).await?;
        if !response.status().is_success() {
            let status = response.status().as_u16();
            let body = response.text().await.unwrap_or_default();
            warn!("Token exchange rejected with status {status}: {body}");
            return Err(Error::TokenExchange(status));
        }
        Ok(response.json().await?)
    }

    /// Redeems a refresh token for a new access token.
    async fn refresh_grant(&self, refresh_token: &str) -> Result<TokenResponse> {
        let mut params = HashMap::new();
        params.insert("grant_type", "refresh_token");
        params.insert("refresh_token", refresh_token);
        params.insert("client_id", &self.config.client_id);
        params.insert("client_secret", &self.config.client_secret);

        let response = self.post_token_endpoint(&params).await?;
        if !response.status().is_success() {
            let status = response.status().as_u16();
            warn!("Token refresh rejected with status {status}");
            return Err(Error::RefreshFailed(status));
        }
        Ok(response.json().await?)
    }

    /// Form-encoded POST to the token endpoint under the deadline.
    async fn post_token_endpoint(
        &self,
        params: &HashMap<&str, &str>,
    ) -> Result<reqwest::Response> {
        let request = self.http.post(&self.token_url).form(params).send();
        match timeout(Duration::from_secs(TOKEN_TIMEOUT_SECS), request).await {
            Ok(Ok(response)) => Ok(response),
            Ok(Err(e)) => Err(e.into()),
            Err(_) => Err(Error::Timeout(TOKEN_TIMEOUT_SECS)),
        }
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::similar_names)]
mod tests {
    use super::*;
    use base64::Engine;
    use base64::engine::general_purpose::URL_SAFE_NO_PAD;
    use sha2::{Digest, Sha256};
    use std::sync::Arc;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use tokio::io::{AsyncReadExt, AsyncWriteExt};

    const CALLBACK: &str = "http://localhost:3000/api/auth/callback";

    fn test_config() -> SessionConfig {
        SessionConfig::new(
            "client-id",
            "client-secret",
            CALLBACK,
            SecretKey::from_bytes([7u8; 32]),
        )
        .secure_cookies(false)
    }

    fn manager() -> SessionManager {
        SessionManager::new(test_config())
    }

    /// One-connection-per-request token endpoint double. Counts hits
    /// and answers every request with the same canned response.
    async fn spawn_token_endpoint(
        status_line: &'static str,
        body: &'static str,
    ) -> (String, Arc<AtomicUsize>) {
        let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        let hits = Arc::new(AtomicUsize::new(0));
        let counter = Arc::clone(&hits);
        tokio::spawn(async move {
            loop {
                let Ok((mut stream, _)) = listener.accept().await else {
                    break;
                };
                counter.fetch_add(1, Ordering::SeqCst);
                let mut buf = [0u8; 4096];
                let _ = stream.read(&mut buf).await;
                let response = format!(
                    "{status_line}\r\ncontent-type: application/json\r\ncontent-length: {}\r\nconnection: close\r\n\r\n{body}",
                    body.len()
                );
                let _ = stream.write_all(response.as_bytes()).await;
            }
        });
        (format!("http://{addr}/token"), hits)
    }

    fn session_jar(manager: &SessionManager, refresh_token: &str) -> CookieJar {
        let mut jar = CookieJar::new();
        jar.insert(SESSION_COOKIE, manager.crypto.encrypt(refresh_token).unwrap());
        jar
    }

    #[test]
    fn test_initiate_builds_consent_url() {
        let start = manager().initiate().unwrap();
        let url = start.auth_url.as_str();
        assert!(url.starts_with("https://accounts.google.com/o/oauth2/v2/auth?"));
        assert!(url.contains("client_id=client-id"));
        assert!(url.contains("response_type=code"));
        assert!(url.contains("access_type=offline"));
        assert!(url.contains("prompt=consent"));
        assert!(url.contains("code_challenge_method=S256"));
        assert!(url.contains("gmail.modify"));
    }

    #[test]
    fn test_initiate_cookies_carry_verifier_and_state() {
        let start = manager().initiate().unwrap();
        let [verifier, state] = &start.cookies;
        assert_eq!(verifier.name, PKCE_COOKIE);
        assert_eq!(state.name, STATE_COOKIE);
        assert_eq!(verifier.max_age, Some(EPHEMERAL_MAX_AGE));
        assert_eq!(state.max_age, Some(EPHEMERAL_MAX_AGE));
        assert!(verifier.http_only);
        assert!(!verifier.secure);

        let query: HashMap<String, String> =
            start.auth_url.query_pairs().into_owned().collect();
        assert_eq!(query.get("state").unwrap(), &state.value);

        // The challenge in the URL derives from the verifier cookie.
        let expected = URL_SAFE_NO_PAD.encode(Sha256::digest(verifier.value.as_bytes()));
        assert_eq!(query.get("code_challenge").unwrap(), &expected);
    }

    #[test]
    fn test_initiate_unique_per_call() {
        let m = manager();
        let a = m.initiate().unwrap();
        let b = m.initiate().unwrap();
        assert_ne!(a.cookies[0].value, b.cookies[0].value);
        assert_ne!(a.cookies[1].value, b.cookies[1].value);
    }

    #[tokio::test]
    async fn test_callback_state_mismatch() {
        let m = manager();
        let mut jar = CookieJar::new();
        jar.insert(STATE_COOKIE, "expected-state");
        jar.insert(PKCE_COOKIE, "verifier");

        let url = format!("{CALLBACK}?code=abc&state=wrong");
        let err = m.complete_callback(&url, &jar).await.unwrap_err();
        assert_eq!(err.status(), 403);
        assert!(err.to_string().contains("state mismatch"));
        assert!(matches!(err, Error::StateMismatch));
    }

    #[tokio::test]
    async fn test_callback_state_missing_on_either_side() {
        let m = manager();

        let mut jar = CookieJar::new();
        jar.insert(STATE_COOKIE, "expected-state");
        let url = format!("{CALLBACK}?code=abc");
        let err = m.complete_callback(&url, &jar).await.unwrap_err();
        assert!(matches!(err, Error::StateMismatch));

        let url = format!("{CALLBACK}?code=abc&state=expected-state");
        let err = m.complete_callback(&url, &CookieJar::new()).await.unwrap_err();
        assert!(matches!(err, Error::StateMismatch));
    }

    #[tokio::test]
    async fn test_callback_provider_error_redirects() {
        let m = manager();
        let mut jar = CookieJar::new();
        jar.insert(STATE_COOKIE, "s1");

        let url = format!("{CALLBACK}?error=access_denied&state=s1");
        let outcome = m.complete_callback(&url, &jar).await.unwrap();
        match outcome {
            CallbackOutcome::Denied { redirect } => {
                assert_eq!(redirect, "/login?error=access_denied");
            }
            CallbackOutcome::Success { .. } => panic!("expected denial"),
        }
    }

    #[tokio::test]
    async fn test_callback_missing_code() {
        let m = manager();
        let mut jar = CookieJar::new();
        jar.insert(STATE_COOKIE, "s1");
        jar.insert(PKCE_COOKIE, "verifier");

        let url = format!("{CALLBACK}?state=s1");
        let err = m.complete_callback(&url, &jar).await.unwrap_err();
        assert_eq!(err.status(), 400);
        assert!(matches!(err, Error::MissingCode));
    }

    #[tokio::test]
    async fn test_callback_missing_verifier_cookie() {
        let m = manager();
        let mut jar = CookieJar::new();
        jar.insert(STATE_COOKIE, "s1");

        let url = format!("{CALLBACK}?code=abc&state=s1");
        let err = m.complete_callback(&url, &jar).await.unwrap_err();
        assert_eq!(err.status(), 400);
        assert!(matches!(err, Error::MissingVerifier));
    }

    #[tokio::test]
    async fn test_callback_success_sets_session_cookies() {
        let (url, _) = spawn_token_endpoint(
            "HTTP/1.1 200 OK",
            r#"{"access_token":"at-1","expires_in":3599,"refresh_token":"rt-1","token_type":"Bearer"}"#,
        )
        .await;
        let m = SessionManager::new(test_config()).with_token_url(url);

        let mut jar = CookieJar::new();
        jar.insert(STATE_COOKIE, "s1");
        jar.insert(PKCE_COOKIE, "verifier");

        let callback = format!("{CALLBACK}?code=auth-code&state=s1");
        let outcome = m.complete_callback(&callback, &jar).await.unwrap();
        let CallbackOutcome::Success { cookies, redirect } = outcome else {
            panic!("expected success");
        };
        assert_eq!(redirect, "/");

        assert_eq!(cookies[0].name, SESSION_COOKIE);
        assert_eq!(cookies[0].max_age, Some(SESSION_MAX_AGE));
        assert!(cookies[0].http_only);
        assert_eq!(m.crypto.decrypt(&cookies[0].value).unwrap(), "rt-1");

        assert_eq!(cookies[1].name, CSRF_COOKIE);
        assert!(!cookies[1].http_only);
        assert!(!cookies[1].value.is_empty());

        assert_eq!(cookies[2].name, PKCE_COOKIE);
        assert_eq!(cookies[2].max_age, Some(0));
        assert_eq!(cookies[3].name, STATE_COOKIE);
        assert_eq!(cookies[3].max_age, Some(0));
    }

    #[tokio::test]
    async fn test_callback_without_refresh_token() {
        let (url, _) = spawn_token_endpoint(
            "HTTP/1.1 200 OK",
            r#"{"access_token":"at-1","expires_in":3599,"token_type":"Bearer"}"#,
        )
        .await;
        let m = SessionManager::new(test_config()).with_token_url(url);

        let mut jar = CookieJar::new();
        jar.insert(STATE_COOKIE, "s1");
        jar.insert(PKCE_COOKIE, "verifier");

        let callback = format!("{CALLBACK}?code=auth-code&state=s1");
        let err = m.complete_callback(&callback, &jar).await.unwrap_err();
        assert_eq!(err.status(), 500);
        assert!(matches!(err, Error::NoRefreshToken));
    }

    #[tokio::test]
    async fn test_access_token_without_session() {
        let err = manager().access_token(&CookieJar::new()).await.unwrap_err();
        assert_eq!(err.status(), 401);
        assert!(matches!(err, Error::NotAuthenticated("no session")));
    }

    #[tokio::test]
    async fn test_access_token_corrupted_cookie() {
        let m = manager();
        let mut jar = CookieJar::new();
        jar.insert(SESSION_COOKIE, "not-an-envelope");

        let err = m.access_token(&jar).await.unwrap_err();
        assert!(matches!(
            err,
            Error::NotAuthenticated("corrupted session cookie")
        ));
    }

    #[tokio::test]
    async fn test_access_token_served_from_cache() {
        let (url, hits) = spawn_token_endpoint(
            "HTTP/1.1 200 OK",
            r#"{"access_token":"at-fresh","expires_in":3600,"token_type":"Bearer"}"#,
        )
        .await;
        let m = SessionManager::new(test_config()).with_token_url(url);
        let jar = session_jar(&m, "refresh-token");

        assert_eq!(m.access_token(&jar).await.unwrap(), "at-fresh");
        assert_eq!(m.access_token(&jar).await.unwrap(), "at-fresh");
        assert_eq!(hits.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn test_logout_invalidates_cached_token() {
        let (url, hits) = spawn_token_endpoint(
            "HTTP/1.1 200 OK",
            r#"{"access_token":"at-fresh","expires_in":3600,"token_type":"Bearer"}"#,
        )
        .await;
        let m = SessionManager::new(test_config()).with_token_url(url);
        let jar = session_jar(&m, "refresh-token");

        m.access_token(&jar).await.unwrap();
        let cookies = m.logout(&jar);
        assert_eq!(cookies[0].name, SESSION_COOKIE);
        assert_eq!(cookies[1].name, CSRF_COOKIE);
        assert!(cookies.iter().all(|c| c.max_age == Some(0)));

        // The cache entry is gone, so the next call refreshes again.
        m.access_token(&jar).await.unwrap();
        assert_eq!(hits.load(Ordering::SeqCst), 2);
    }

    #[tokio::test]
    async fn test_refresh_rejection_maps_to_sign_in_again() {
        let (url, _) = spawn_token_endpoint(
            "HTTP/1.1 400 Bad Request",
            r#"{"error":"invalid_grant"}"#,
        )
        .await;
        let m = SessionManager::new(test_config()).with_token_url(url);
        let jar = session_jar(&m, "revoked-token");

        let err = m.access_token(&jar).await.unwrap_err();
        assert_eq!(err.status(), 401);
        assert!(matches!(err, Error::RefreshFailed(400)));
    }

    #[test]
    fn test_validate_csrf_double_submit() {
        let m = manager();
        let mut jar = CookieJar::new();
        jar.insert(CSRF_COOKIE, "csrf-token");
        assert!(m.validate_csrf(&jar, Some("csrf-token")));
        assert!(!m.validate_csrf(&jar, Some("other")));
        assert!(!m.validate_csrf(&jar, None));
    }

    #[test]
    fn test_config_debug_redacts_secret() {
        let debug = format!("{:?}", test_config());
        assert!(debug.contains("<redacted>"));
        assert!(!debug.contains("client-secret"));
    }
}
