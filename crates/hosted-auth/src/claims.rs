//! Identity claims from the id token payload
//!
//! `UnverifiedClaimsExtractor` decodes the payload segment without checking
//! the signature. It relies on the token having arrived over the
//! authenticated TLS exchange with the token endpoint. Callers depend on the
//! `ClaimsExtractor` trait so a verifying implementation can replace it.

use base64::Engine;
use base64::engine::general_purpose::URL_SAFE_NO_PAD;
use serde::{Deserialize, Serialize};

use crate::error::{Error, Result};

/// Normalized user record derived from the id token.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct IdentityClaims {
    /// Stable, unique external identity (`sub`)
    pub subject: String,
    pub email: String,
    pub name: Option<String>,
}

/// Turns a raw id token into `IdentityClaims`.
pub trait ClaimsExtractor: Send + Sync {
    fn extract(&self, id_token: &str) -> Result<IdentityClaims>;
}

/// Payload fields read from the token. Everything else is ignored.
#[derive(Deserialize)]
struct RawClaims {
    sub: Option<String>,
    email: Option<String>,
    name: Option<String>,
    given_name: Option<String>,
    family_name: Option<String>,
}

/// Decode-only extractor: structure and payload are checked, the signature is not.
#[derive(Debug, Default, Clone, Copy)]
pub struct UnverifiedClaimsExtractor;

impl ClaimsExtractor for UnverifiedClaimsExtractor {
    fn extract(&self, id_token: &str) -> Result<IdentityClaims> {
        let segments: Vec<&str> = id_token.split('.').collect();
        if segments.len() != 3 {
            return Err(Error::MalformedToken(format!(
                "expected 3 segments, found {}",
                segments.len()
            )));
        }

        // Some issuers pad their base64url segments
        let payload = URL_SAFE_NO_PAD
            .decode(segments[1].trim_end_matches('='))
            .map_err(|e| Error::MalformedToken(format!("payload is not base64url: {e}")))?;

        let raw: RawClaims = serde_json::from_slice(&payload)
            .map_err(|e| Error::MalformedToken(format!("payload is not a JSON object: {e}")))?;

        let subject = raw
            .sub
            .filter(|s| !s.trim().is_empty())
            .ok_or_else(|| Error::MalformedToken("payload has no subject".into()))?;

        let name = raw.name.or_else(|| {
            let parts: Vec<String> = [raw.given_name, raw.family_name]
                .into_iter()
                .flatten()
                .collect();
            (!parts.is_empty()).then(|| parts.join(" "))
        });

        Ok(IdentityClaims {
            subject,
            email: raw.email.unwrap_or_default(),
            name,
        })
    }
}

#[cfg(test)]
pub(crate) fn test_token(payload: &str) -> String {
    format!(
        "{}.{}.sig",
        URL_SAFE_NO_PAD.encode(r#"{"alg":"RS256","kid":"k1"}"#),
        URL_SAFE_NO_PAD.encode(payload)
    )
}
