//! Authorization-code exchange against the Hosted UI token endpoint
//!
//! One exchange is one `POST {domain}/oauth2/token`. Codes are single-use at
//! the provider, so a failed exchange is final: retrying with the same code
//! would be rejected as replay. Callers surface the failure and send the
//! browser through a fresh authorization round-trip instead.

use std::fmt;
use std::time::Duration;

use common::Secret;
use serde::Deserialize;
use sha2::{Digest, Sha256};
use tracing::debug;

use crate::constants::{DEFAULT_EXCHANGE_TIMEOUT_SECS, TOKEN_PATH};
use crate::error::{Error, Result};

/// Tokens returned by a successful exchange.
///
/// Only `id_token` is inspected further. The access and refresh tokens are
/// opaque pass-through values.
#[derive(Clone, Deserialize)]
pub struct TokenSet {
    pub access_token: String,
    pub id_token: String,
    /// Omitted by providers whose app client has refresh tokens disabled
    #[serde(default)]
    pub refresh_token: Option<String>,
    pub token_type: String,
    /// Seconds until the access token expires (delta, not absolute)
    pub expires_in: u64,
}

impl fmt::Debug for TokenSet {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("TokenSet")
            .field("access_token", &"[REDACTED]")
            .field("id_token", &"[REDACTED]")
            .field("refresh_token", &self.refresh_token.as_ref().map(|_| "[REDACTED]"))
            .field("token_type", &self.token_type)
            .field("expires_in", &self.expires_in)
            .finish()
    }
}

/// Provider coordinates for the token endpoint.
#[derive(Debug, Clone)]
pub struct ExchangeConfig {
    /// Hosted UI base URL, e.g. `https://auth.example.com`
    pub hosted_ui_domain: String,
    pub client_id: String,
    /// Confidential app clients authenticate with HTTP Basic; public ones send none
    pub client_secret: Option<Secret<String>>,
    pub timeout: Duration,
}

impl ExchangeConfig {
    pub fn new(hosted_ui_domain: impl Into<String>, client_id: impl Into<String>) -> Self {
        Self {
            hosted_ui_domain: hosted_ui_domain.into(),
            client_id: client_id.into(),
            client_secret: None,
            timeout: Duration::from_secs(DEFAULT_EXCHANGE_TIMEOUT_SECS),
        }
    }
}

/// Client for the provider's token endpoint.
pub struct TokenExchangeClient {
    http: reqwest::Client,
    token_endpoint: String,
    config: ExchangeConfig,
}

impl TokenExchangeClient {
    pub fn new(http: reqwest::Client, config: ExchangeConfig) -> Self {
        let token_endpoint = format!(
            "{}{}",
            config.hosted_ui_domain.trim_end_matches('/'),
            TOKEN_PATH
        );
        Self {
            http,
            token_endpoint,
            config,
        }
    }

    pub fn token_endpoint(&self) -> &str {
        &self.token_endpoint
    }

    /// Exchange an authorization code for tokens.
    ///
    /// `redirect_uri` must be byte-identical to the one used when the code was
    /// issued; the provider enforces the match and a mismatch comes back as
    /// `Error::Exchange`. Timeouts, transport failures, non-2xx statuses and
    /// unparseable bodies all map to `Error::Exchange` as well.
    pub async fn exchange(&self, code: &str, redirect_uri: &str) -> Result<TokenSet> {
        debug!(
            code = %code_fingerprint(code),
            endpoint = %self.token_endpoint,
            "exchanging authorization code"
        );

        let mut request = self
            .http
            .post(&self.token_endpoint)
            .timeout(self.config.timeout)
            .form(&[
                ("grant_type", "authorization_code"),
                ("client_id", self.config.client_id.as_str()),
                ("code", code),
                ("redirect_uri", redirect_uri),
            ]);
        if let Some(secret) = &self.config.client_secret {
            request = request.basic_auth(&self.config.client_id, Some(secret.expose()));
        }

        let response = request.send().await.map_err(|e| {
            if e.is_timeout() {
                Error::Exchange(format!(
                    "token endpoint timed out after {}s",
                    self.config.timeout.as_secs_f64()
                ))
            } else {
                Error::Exchange(format!("token exchange request failed: {e}"))
            }
        })?;

        let status = response.status();
        if !status.is_success() {
            let body = response
                .text()
                .await
                .unwrap_or_else(|_| String::from("<no body>"));
            return Err(Error::Exchange(format!(
                "token endpoint returned {status}: {body}"
            )));
        }

        response
            .json::<TokenSet>()
            .await
            .map_err(|e| Error::Exchange(format!("invalid token response: {e}")))
    }
}

/// Short, non-reversible tag for an authorization code, safe to log.
pub fn code_fingerprint(code: &str) -> String {
    let hash = Sha256::digest(code.as_bytes());
    hash[..6].iter().map(|b| format!("{b:02x}")).collect()
}
