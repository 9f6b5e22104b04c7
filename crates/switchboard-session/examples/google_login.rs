#![allow(clippy::expect_used)]
//! Example: complete Google login flow driven from the terminal
//!
//! This example demonstrates how to:
//! 1. Build the PKCE consent URL and the ephemeral login cookies
//! 2. Complete the callback and obtain the encrypted session cookie
//! 3. Redeem the session cookie for a cached access token
//! 4. Validate a CSRF double-submit pair
//!
//! ## Prerequisites
//!
//! 1. Create OAuth credentials in the Google Cloud console:
//!    - Go to https://console.cloud.google.com/apis/credentials
//!    - Create an OAuth client ID of type "Web application"
//!    - Add `http://localhost:3000/api/auth/callback` as an authorized
//!      redirect URI
//!    - Enable the Gmail API for the project
//!
//! 2. Set environment variables:
//!    ```bash
//!    export GOOGLE_CLIENT_ID="your-client-id"
//!    export GOOGLE_CLIENT_SECRET="your-client-secret"
//!    export COOKIE_SECRET="$(openssl rand -base64 32)"
//!    ```
//!
//! ## Running
//!
//! ```bash
//! cargo run --example google_login
//! ```

use std::env;
use std::io::{self, Write};

use switchboard_crypto::SecretKey;
use switchboard_session::{CallbackOutcome, CookieJar, SessionConfig, SessionManager};

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    // Get configuration from environment
    let client_id =
        env::var("GOOGLE_CLIENT_ID").expect("GOOGLE_CLIENT_ID environment variable not set");
    let client_secret = env::var("GOOGLE_CLIENT_SECRET")
        .expect("GOOGLE_CLIENT_SECRET environment variable not set");
    let cookie_secret =
        env::var("COOKIE_SECRET").expect("COOKIE_SECRET environment variable not set");
    let base_url =
        env::var("APP_BASE_URL").unwrap_or_else(|_| "http://localhost:3000".to_string());

    println!("Switchboard Session Example - Google Login");
    println!("==========================================\n");

    // Step 1: Build the session manager
    println!("Step 1: Building the session manager...");
    let key = SecretKey::from_base64(cookie_secret.trim())?;
    let config = SessionConfig::new(
        &client_id,
        &client_secret,
        format!("{base_url}/api/auth/callback"),
        key,
    )
    .secure_cookies(base_url.starts_with("https://"));
    let manager = SessionManager::new(config);
    println!("  Redirect URI: {base_url}/api/auth/callback\n");

    // Step 2: Start the login
    println!("Step 2: Generating consent URL and login cookies...");
    let start = manager.initiate()?;
    println!("  Set-Cookie headers a server would send:");
    for cookie in &start.cookies {
        println!("    {cookie}");
    }

    println!("\n┌─────────────────────────────────────────────────────────────┐");
    println!("│  PLEASE VISIT THIS URL TO AUTHORIZE THE APPLICATION:       │");
    println!("└─────────────────────────────────────────────────────────────┘");
    println!("\n{}\n", start.auth_url);

    // In a real application, the browser carries the two cookies to the
    // callback; here we replay them into a jar by hand.
    let mut jar = CookieJar::new();
    for cookie in &start.cookies {
        jar.insert(&cookie.name, &cookie.value);
    }

    // Step 3: Get the redirect URL from the user
    println!("After authorizing, Google redirects the browser to:");
    println!("  {base_url}/api/auth/callback?code=...&state=...\n");
    print!("Paste the full redirect URL here: ");
    io::stdout().flush()?;

    let mut callback_url = String::new();
    io::stdin().read_line(&mut callback_url)?;
    let callback_url = callback_url.trim();

    if callback_url.is_empty() {
        println!("\nNo URL entered. Exiting.");
        return Ok(());
    }

    // Step 4: Complete the callback
    println!("\nStep 4: Exchanging the authorization code...");
    let outcome = manager.complete_callback(callback_url, &jar).await?;
    let cookies = match outcome {
        CallbackOutcome::Success { cookies, .. } => cookies,
        CallbackOutcome::Denied { redirect } => {
            println!("  Authorization was denied; browser would go to {redirect}");
            return Ok(());
        }
    };

    println!("✓ Session established!");
    println!("  Set-Cookie headers a server would send:");
    for cookie in &cookies {
        println!("    {cookie}");
    }

    // Step 5: Use the session like an API request would
    println!("\nStep 5: Redeeming the session cookie for an access token...");
    let mut session_jar = CookieJar::new();
    session_jar.insert(&cookies[0].name, &cookies[0].value);
    session_jar.insert(&cookies[1].name, &cookies[1].value);

    let token = manager.access_token(&session_jar).await?;
    println!("✓ Access token obtained: {}...", &token[..20.min(token.len())]);

    // A second call is served from the in-memory cache
    let again = manager.access_token(&session_jar).await?;
    println!("  Second call served from cache: {}\n", token == again);

    // Step 6: CSRF double submit
    println!("Step 6: Validating the CSRF double-submit pair...");
    let csrf_token = cookies[1].value.clone();
    println!(
        "  Header matches cookie: {}",
        manager.validate_csrf(&session_jar, Some(&csrf_token))
    );
    println!(
        "  Forged header rejected: {}\n",
        !manager.validate_csrf(&session_jar, Some("forged-token"))
    );

    println!("┌─────────────────────────────────────────────────────────────┐");
    println!("│  SUCCESS! The session cookie is the only state to keep     │");
    println!("└─────────────────────────────────────────────────────────────┘");
    println!("\nThe refresh token never leaves the AEAD envelope; store the");
    println!("cookie values client-side and replay them on every request.");

    Ok(())
}
