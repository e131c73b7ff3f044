//! Configuration types and loading
//!
//! Config precedence: CLI args > env vars > config file > defaults.
//! The Hosted UI client secret is loaded from HOSTED_UI_CLIENT_SECRET or
//! client_secret_file, never stored in the TOML directly to avoid leaking it.

use common::Secret;
use hosted_auth::constants::{DEFAULT_EXCHANGE_TIMEOUT_SECS, DEFAULT_SCOPES};
use reqwest::Url;
use serde::Deserialize;
use std::net::SocketAddr;
use std::path::{Path, PathBuf};
use std::time::Duration;

/// Env var holding the app client secret for confidential clients
pub const CLIENT_SECRET_ENV: &str = "HOSTED_UI_CLIENT_SECRET";

/// Root configuration
#[derive(Debug, Deserialize)]
pub struct Config {
    pub server: ServerConfig,
    pub provider: ProviderConfig,
    #[serde(default)]
    pub session: SessionConfig,
}

/// HTTP listener settings
#[derive(Debug, Deserialize)]
pub struct ServerConfig {
    pub listen_addr: SocketAddr,
    #[serde(default = "default_max_connections")]
    pub max_connections: usize,
}

/// Hosted UI identity provider settings
#[derive(Debug, Deserialize)]
pub struct ProviderConfig {
    /// Base URL of the Hosted UI, e.g. `https://auth.example.com`
    pub hosted_ui_domain: String,
    pub client_id: String,
    #[serde(skip)]
    pub client_secret: Option<Secret<String>>,
    /// Path to a file containing the client secret (alternative to the env var)
    #[serde(default)]
    pub client_secret_file: Option<PathBuf>,
    /// Must match the redirect URI registered with the app client exactly
    pub redirect_uri: String,
    /// Where the Hosted UI sends the browser after sign-out
    #[serde(default)]
    pub logout_uri: Option<String>,
    #[serde(default = "default_scopes")]
    pub scopes: String,
    #[serde(default = "default_exchange_timeout")]
    pub timeout_secs: u64,
}

/// Session cookie and expiry policy
#[derive(Debug, Deserialize)]
pub struct SessionConfig {
    #[serde(default = "default_cookie_name")]
    pub cookie_name: String,
    #[serde(default = "default_session_ttl")]
    pub ttl_secs: u64,
    #[serde(default = "default_sweep_interval")]
    pub sweep_interval_secs: u64,
    #[serde(default)]
    pub same_site: SameSite,
    #[serde(default = "default_secure")]
    pub secure: bool,
}

impl Default for SessionConfig {
    fn default() -> Self {
        Self {
            cookie_name: default_cookie_name(),
            ttl_secs: default_session_ttl(),
            sweep_interval_secs: default_sweep_interval(),
            same_site: SameSite::default(),
            secure: default_secure(),
        }
    }
}

/// `SameSite` attribute for the session cookie. `None` is not offered.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SameSite {
    #[default]
    Lax,
    Strict,
}

impl SameSite {
    pub fn as_str(&self) -> &'static str {
        match self {
            SameSite::Lax => "Lax",
            SameSite::Strict => "Strict",
        }
    }
}

fn default_max_connections() -> usize {
    1000
}

fn default_scopes() -> String {
    DEFAULT_SCOPES.to_string()
}

fn default_exchange_timeout() -> u64 {
    DEFAULT_EXCHANGE_TIMEOUT_SECS
}

fn default_cookie_name() -> String {
    "session_id".to_string()
}

fn default_session_ttl() -> u64 {
    8 * 60 * 60
}

fn default_sweep_interval() -> u64 {
    300
}

fn default_secure() -> bool {
    true
}

impl ProviderConfig {
    /// Parsed Hosted UI base URL. Only http(s) is accepted.
    /// Hosted UI origin. Token, authorize and logout paths are all rooted
    /// here, so a path, query or fragment on the domain is rejected.
    pub fn hosted_ui_base(&self) -> common::Result<Url> {
        let field = "provider.hosted_ui_domain";
        let url = parse_http_url(field, &self.hosted_ui_domain)?;
        if url.path() != "/" || url.query().is_some() || url.fragment().is_some() {
            return Err(common::Error::invalid(
                field,
                format!(
                    "must be a bare origin without path, query or fragment, got: {}",
                    self.hosted_ui_domain
                ),
            ));
        }
        Ok(url)
    }

    pub fn exchange_timeout(&self) -> Duration {
        Duration::from_secs(self.timeout_secs)
    }
}

impl SessionConfig {
    pub fn ttl(&self) -> Duration {
        Duration::from_secs(self.ttl_secs)
    }

    pub fn sweep_interval(&self) -> Duration {
        Duration::from_secs(self.sweep_interval_secs)
    }
}

fn parse_http_url(field: &str, value: &str) -> common::Result<Url> {
    let url = Url::parse(value).map_err(|e| common::Error::invalid(field, e))?;
    if url.scheme() != "http" && url.scheme() != "https" {
        return Err(common::Error::invalid(
            field,
            format!("must start with http:// or https://, got: {value}"),
        ));
    }
    Ok(url)
}

impl Config {
    /// Load configuration from a TOML file, then overlay environment variables.
    ///
    /// Client secret resolution order:
    /// 1. HOSTED_UI_CLIENT_SECRET env var
    /// 2. client_secret_file path from config
    /// 3. none (public app client)
    pub fn load(path: &Path) -> common::Result<Self> {
        let contents = std::fs::read_to_string(path)?;
        let mut config: Config = toml::from_str(&contents)?;
        config.validate()?;

        if let Ok(secret) = std::env::var(CLIENT_SECRET_ENV) {
            let secret = Secret::new(secret);
            if !secret.is_blank() {
                config.provider.client_secret = Some(secret);
            }
        } else if let Some(ref secret_file) = config.provider.client_secret_file {
            let secret = std::fs::read_to_string(secret_file).map_err(|e| {
                common::Error::Config(format!(
                    "failed to read client_secret_file {}: {e}",
                    secret_file.display()
                ))
            })?;
            let secret = Secret::new(secret.trim().to_owned());
            if !secret.is_blank() {
                config.provider.client_secret = Some(secret);
            }
        }

        Ok(config)
    }

    fn validate(&self) -> common::Result<()> {
        self.provider.hosted_ui_base()?;
        parse_http_url("provider.redirect_uri", &self.provider.redirect_uri)?;
        if let Some(ref logout_uri) = self.provider.logout_uri {
            parse_http_url("provider.logout_uri", logout_uri)?;
        }

        if self.provider.client_id.trim().is_empty() {
            return Err(common::Error::invalid(
                "provider.client_id",
                "must not be empty",
            ));
        }
        if self.provider.timeout_secs == 0 {
            return Err(common::Error::invalid(
                "provider.timeout_secs",
                "must be greater than 0",
            ));
        }
        if self.server.max_connections == 0 {
            return Err(common::Error::invalid(
                "server.max_connections",
                "must be greater than 0",
            ));
        }
        if self.session.ttl_secs == 0 {
            return Err(common::Error::invalid(
                "session.ttl_secs",
                "must be greater than 0",
            ));
        }
        if self.session.sweep_interval_secs == 0 {
            return Err(common::Error::invalid(
                "session.sweep_interval_secs",
                "must be greater than 0",
            ));
        }

        let name = &self.session.cookie_name;
        if name.is_empty()
            || !name
                .chars()
                .all(|c| c.is_ascii_alphanumeric() || c == '_' || c == '-')
        {
            return Err(common::Error::invalid(
                "session.cookie_name",
                format!("must be non-empty [A-Za-z0-9_-], got: {name:?}"),
            ));
        }

        Ok(())
    }

    /// Resolve config file path from CLI arg or CONFIG_PATH env var.
    pub fn resolve_path(cli_path: Option<&str>) -> PathBuf {
        if let Some(p) = cli_path {
            return PathBuf::from(p);
        }
        if let Ok(p) = std::env::var("CONFIG_PATH") {
            return PathBuf::from(p);
        }
        PathBuf::from("hosted-auth-gateway.toml")
    }
}
