//! Callback state machine and session lookups
//!
//! `Authenticator::callback()` walks the authorization-code callback through
//! its states exactly once:
//!
//! ```text
//! AwaitingCode -> Exchanging -> ExtractingClaims -> Establishing -> Complete
//!      |              |               |                  |
//!  MissingCode  ExchangeFailed   ClaimsInvalid     SessionFailed
//! ```
//!
//! A session is only created after the exchange and claims extraction both
//! succeed, so abandoning the future at any earlier await leaves no state.

use std::sync::Arc;

use tracing::{info, warn};

use crate::claims::{ClaimsExtractor, IdentityClaims};
use crate::error::{Error, Result};
use crate::session::SessionStore;
use crate::token::{TokenExchangeClient, code_fingerprint};

/// Terminal result of one callback attempt.
#[derive(Debug)]
pub enum CallbackOutcome {
    /// No (or a blank) authorization code; zero provider calls were made
    MissingCode(Error),
    ExchangeFailed(Error),
    ClaimsInvalid(Error),
    SessionFailed(Error),
    Established {
        session_id: String,
        user: IdentityClaims,
    },
}

impl CallbackOutcome {
    /// Label for metrics and logs.
    pub fn label(&self) -> &'static str {
        match self {
            CallbackOutcome::MissingCode(_) => "missing_code",
            CallbackOutcome::ExchangeFailed(_) => "exchange_failed",
            CallbackOutcome::ClaimsInvalid(_) => "claims_invalid",
            CallbackOutcome::SessionFailed(_) => "session_failed",
            CallbackOutcome::Established { .. } => "established",
        }
    }
}

/// Wires the token exchange, claims extraction and session store together.
pub struct Authenticator {
    exchange: TokenExchangeClient,
    claims: Arc<dyn ClaimsExtractor>,
    sessions: Arc<dyn SessionStore>,
    redirect_uri: String,
}

impl Authenticator {
    pub fn new(
        exchange: TokenExchangeClient,
        claims: Arc<dyn ClaimsExtractor>,
        sessions: Arc<dyn SessionStore>,
        redirect_uri: impl Into<String>,
    ) -> Self {
        Self {
            exchange,
            claims,
            sessions,
            redirect_uri: redirect_uri.into(),
        }
    }

    pub fn redirect_uri(&self) -> &str {
        &self.redirect_uri
    }

    /// Run one callback attempt to completion. Never retries.
    pub async fn callback(&self, code: Option<&str>) -> CallbackOutcome {
        // AwaitingCode
        let code = match code.map(str::trim).filter(|c| !c.is_empty()) {
            Some(code) => code,
            None => {
                warn!("callback without authorization code");
                return CallbackOutcome::MissingCode(Error::MissingCode);
            }
        };
        let fingerprint = code_fingerprint(code);

        // Exchanging
        let tokens = match self.exchange.exchange(code, &self.redirect_uri).await {
            Ok(tokens) => tokens,
            Err(e) => {
                warn!(code = %fingerprint, error = %e, "authorization code exchange failed");
                return CallbackOutcome::ExchangeFailed(e);
            }
        };

        // ExtractingClaims
        let user = match self.claims.extract(&tokens.id_token) {
            Ok(user) => user,
            Err(e) => {
                warn!(code = %fingerprint, error = %e, "id token rejected");
                return CallbackOutcome::ClaimsInvalid(e);
            }
        };

        // Establishing
        match self.sessions.create(user.clone()).await {
            Ok(session_id) => {
                info!(code = %fingerprint, subject = %user.subject, "session established");
                CallbackOutcome::Established { session_id, user }
            }
            Err(e) => {
                warn!(code = %fingerprint, error = %e, "session creation failed");
                CallbackOutcome::SessionFailed(e)
            }
        }
    }

    /// Claims for the caller's session, or `None` when unauthenticated.
    pub async fn resolve(&self, session_id: Option<&str>) -> Result<Option<IdentityClaims>> {
        let Some(session_id) = session_id else {
            return Ok(None);
        };
        Ok(self
            .sessions
            .get(session_id)
            .await?
            .map(|record| record.user))
    }

    /// End the caller's session. Succeeds whether or not one existed.
    pub async fn sign_out(&self, session_id: Option<&str>) -> Result<()> {
        if let Some(session_id) = session_id {
            self.sessions.destroy(session_id).await?;
            info!("session signed out");
        }
        Ok(())
    }
}
