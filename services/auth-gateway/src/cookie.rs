//! Session cookie formatting and parsing
//!
//! The cookie carries only the opaque session identifier. It is always
//! `HttpOnly` and `Path=/`, `Secure` unless explicitly disabled for local
//! plain-http development, and `SameSite=Lax` or `Strict`.

use axum::http::HeaderMap;
use axum::http::header::COOKIE;

use crate::config::{SameSite, SessionConfig};

/// Attributes applied to every session cookie the gateway emits.
#[derive(Debug, Clone)]
pub struct CookieSettings {
    pub name: String,
    pub max_age_secs: u64,
    pub same_site: SameSite,
    pub secure: bool,
}

impl CookieSettings {
    pub fn from_config(session: &SessionConfig) -> Self {
        Self {
            name: session.cookie_name.clone(),
            max_age_secs: session.ttl_secs,
            same_site: session.same_site,
            secure: session.secure,
        }
    }

    /// `Set-Cookie` value establishing the session.
    pub fn session_cookie(&self, session_id: &str) -> String {
        self.build(session_id, self.max_age_secs)
    }

    /// `Set-Cookie` value that makes the browser drop the session cookie.
    pub fn clearing_cookie(&self) -> String {
        self.build("", 0)
    }

    fn build(&self, value: &str, max_age_secs: u64) -> String {
        let mut out = format!(
            "{}={value}; Path=/; HttpOnly; SameSite={}; Max-Age={max_age_secs}",
            self.name,
            self.same_site.as_str()
        );
        if self.secure {
            out.push_str("; Secure");
        }
        out
    }

    /// Session identifier from the request's `Cookie` header(s), if any.
    ///
    /// Empty values are treated as absent.
    pub fn session_id(&self, headers: &HeaderMap) -> Option<String> {
        headers
            .get_all(COOKIE)
            .iter()
            .filter_map(|value| value.to_str().ok())
            .flat_map(|header| header.split(';'))
            .find_map(|pair| {
                let (name, value) = pair.trim().split_once('=')?;
                (name == self.name && !value.is_empty()).then(|| value.to_string())
            })
    }
}
