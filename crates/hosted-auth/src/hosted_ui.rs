//! Hosted UI browser URLs
//!
//! The gateway sends the browser to the authorize endpoint to start a login
//! and hands the logout URL back on sign-out so the provider's own session
//! ends too. Both take the already-validated Hosted UI base URL.

use reqwest::Url;

use crate::constants::{AUTHORIZE_PATH, LOGOUT_PATH};

/// Authorization endpoint URL that starts an authorization-code login.
///
/// `redirect_uri` must be the same value later passed to
/// `TokenExchangeClient::exchange()`.
pub fn authorize_url(base: &Url, client_id: &str, redirect_uri: &str, scopes: &str) -> String {
    let mut url = base.clone();
    url.set_path(AUTHORIZE_PATH);
    url.query_pairs_mut()
        .clear()
        .append_pair("response_type", "code")
        .append_pair("client_id", client_id)
        .append_pair("redirect_uri", redirect_uri)
        .append_pair("scope", scopes);
    url.into()
}

/// Hosted UI sign-out URL; the provider redirects to `logout_uri` afterwards.
pub fn logout_url(base: &Url, client_id: &str, logout_uri: &str) -> String {
    let mut url = base.clone();
    url.set_path(LOGOUT_PATH);
    url.query_pairs_mut()
        .clear()
        .append_pair("client_id", client_id)
        .append_pair("logout_uri", logout_uri);
    url.into()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn base() -> Url {
        Url::parse("https://auth.example.com").unwrap()
    }

    #[test]
    fn authorize_url_contains_required_params() {
        let url = authorize_url(
            &base(),
            "client-1",
            "https://app.example.com/auth/callback",
            "openid email profile",
        );

        assert!(url.starts_with("https://auth.example.com/oauth2/authorize?"));
        assert!(url.contains("response_type=code"));
        assert!(url.contains("client_id=client-1"));
        assert!(url.contains("redirect_uri=https%3A%2F%2Fapp.example.com%2Fauth%2Fcallback"));
        assert!(url.contains("scope=openid+email+profile"));
    }

    #[test]
    fn authorize_url_round_trips_redirect_uri() {
        let redirect = "https://app.example.com/auth/callback?x=1&y=2";
        let url = Url::parse(&authorize_url(&base(), "c", redirect, "openid")).unwrap();
        let got = url
            .query_pairs()
            .find(|(k, _)| k == "redirect_uri")
            .map(|(_, v)| v.into_owned());
        assert_eq!(got.as_deref(), Some(redirect));
    }

    #[test]
    fn logout_url_targets_logout_endpoint() {
        let url = logout_url(&base(), "client-1", "https://app.example.com/");
        assert!(url.starts_with("https://auth.example.com/logout?"));
        assert!(url.contains("client_id=client-1"));
        assert!(url.contains("logout_uri=https%3A%2F%2Fapp.example.com%2F"));
    }

    #[test]
    fn base_path_is_replaced() {
        let base = Url::parse("https://auth.example.com/some/prefix?stale=1").unwrap();
        let url = logout_url(&base, "c", "https://app/");
        assert!(url.starts_with("https://auth.example.com/logout?client_id=c"), "got: {url}");
        assert!(!url.contains("stale"));
    }
}
