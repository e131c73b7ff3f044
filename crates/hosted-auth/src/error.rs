//! Error taxonomy for the authorization-code flow
//!
//! Every variant terminates the current authentication attempt. The payload
//! strings carry server-side detail (provider bodies, parse errors) and must
//! never be returned to the browser.

/// Errors from authentication operations.
#[derive(Debug, thiserror::Error)]
pub enum Error {
    /// The callback request carried no authorization code.
    #[error("authorization code missing from callback")]
    MissingCode,

    /// Token endpoint rejected the code, timed out, or answered garbage.
    #[error("token exchange failed: {0}")]
    Exchange(String),

    /// The id token is not a decodable three-segment token with a subject.
    #[error("malformed id token: {0}")]
    MalformedToken(String),

    #[error("session store error: {0}")]
    SessionStore(String),
}

impl Error {
    /// Stable label for metrics and log fields.
    pub fn kind(&self) -> &'static str {
        match self {
            Error::MissingCode => "missing_code",
            Error::Exchange(_) => "exchange",
            Error::MalformedToken(_) => "malformed_token",
            Error::SessionStore(_) => "session_store",
        }
    }
}

/// Result alias for auth operations.
pub type Result<T> = std::result::Result<T, Error>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn display_carries_detail() {
        let err = Error::Exchange("token endpoint returned 400: invalid_grant".into());
        assert!(err.to_string().contains("invalid_grant"));
        assert_eq!(
            Error::MissingCode.to_string(),
            "authorization code missing from callback"
        );
    }

    #[test]
    fn kind_labels_are_distinct() {
        let kinds = [
            Error::MissingCode.kind(),
            Error::Exchange(String::new()).kind(),
            Error::MalformedToken(String::new()).kind(),
            Error::SessionStore(String::new()).kind(),
        ];
        for (i, a) in kinds.iter().enumerate() {
            for b in &kinds[i + 1..] {
                assert_ne!(a, b);
            }
        }
    }
}
