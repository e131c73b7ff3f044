//! Hosted UI authorization-code authentication library
//!
//! Bridges an OpenID-Connect "Hosted UI" identity provider to a first-party
//! server-side session. The crate has no HTTP server dependency; the gateway
//! binary maps its results onto routes and cookies.
//!
//! Callback flow:
//! 1. Browser returns from the Hosted UI with a one-time `code`
//! 2. `TokenExchangeClient::exchange()` trades the code for a `TokenSet`
//! 3. `ClaimsExtractor::extract()` decodes the id token into `IdentityClaims`
//! 4. `SessionStore::create()` issues a session identifier for those claims
//!
//! Later requests resolve the session through `Authenticator::resolve()` and
//! end it with `Authenticator::sign_out()`. Nothing in this crate retries: a
//! failed attempt is only recoverable with a fresh authorization code.

pub mod callback;
pub mod claims;
pub mod constants;
pub mod error;
pub mod hosted_ui;
pub mod session;
pub mod token;

pub use callback::{Authenticator, CallbackOutcome};
pub use claims::{ClaimsExtractor, IdentityClaims, UnverifiedClaimsExtractor};
pub use error::{Error, Result};
pub use hosted_ui::{authorize_url, logout_url};
pub use session::{InMemorySessionStore, SessionRecord, SessionStore, spawn_sweep_task};
pub use token::{ExchangeConfig, TokenExchangeClient, TokenSet, code_fingerprint};
