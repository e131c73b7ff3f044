//! Hosted UI endpoint paths and protocol defaults
//!
//! Paths are relative to the Hosted UI domain configured per deployment
//! (e.g. `https://auth.example.com`).

/// Token endpoint for the authorization-code exchange
pub const TOKEN_PATH: &str = "/oauth2/token";

/// Authorization endpoint the browser is sent to for login
pub const AUTHORIZE_PATH: &str = "/oauth2/authorize";

/// Hosted UI sign-out endpoint, ends the provider's own session
pub const LOGOUT_PATH: &str = "/logout";

/// Scopes requested when the deployment does not configure any.
pub const DEFAULT_SCOPES: &str = "openid email profile";

/// Upper bound on the token endpoint round-trip.
pub const DEFAULT_EXCHANGE_TIMEOUT_SECS: u64 = 5;

/// Random bytes behind each session identifier (256 bits).
pub const SESSION_ID_BYTES: usize = 32;
