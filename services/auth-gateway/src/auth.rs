//! Authentication routes
//!
//! Endpoints:
//! - GET  /auth/login    : redirect the browser to the Hosted UI
//! - POST /auth/callback : exchange `code` (query or JSON body), set session cookie
//! - GET  /auth/callback : same, for providers that redirect with `?code=`
//! - GET  /auth/me       : claims for the session cookie, 401 without one
//! - POST /auth/signout  : destroy the session and clear the cookie

use std::sync::Arc;
use std::time::Instant;

use axum::Router;
use axum::body::Bytes;
use axum::extract::rejection::QueryRejection;
use axum::extract::{Query, State};
use axum::http::header::{CACHE_CONTROL, CONTENT_TYPE, SET_COOKIE};
use axum::http::{HeaderMap, StatusCode};
use axum::response::{IntoResponse, Redirect, Response};
use axum::routing::{get, post};
use hosted_auth::{Authenticator, CallbackOutcome};
use serde::Deserialize;
use tracing::{error, instrument, warn};

use crate::cookie::CookieSettings;
use crate::error::ApiError;
use crate::metrics;

/// Shared state for the auth handlers.
#[derive(Clone)]
pub struct AuthState {
    authenticator: Arc<Authenticator>,
    cookies: Arc<CookieSettings>,
    login_url: Arc<str>,
    logout_url: Option<Arc<str>>,
}

impl AuthState {
    pub fn new(
        authenticator: Arc<Authenticator>,
        cookies: CookieSettings,
        login_url: String,
        logout_url: Option<String>,
    ) -> Self {
        Self {
            authenticator,
            cookies: Arc::new(cookies),
            login_url: login_url.into(),
            logout_url: logout_url.map(Into::into),
        }
    }
}

/// Build the auth router. State is applied here, so it merges into any app router.
pub fn build_auth_router(state: AuthState) -> Router {
    Router::new()
        .route("/auth/login", get(login))
        .route("/auth/callback", post(callback).get(callback))
        .route("/auth/me", get(me))
        .route("/auth/signout", post(sign_out))
        .with_state(state)
}

/// `code` may arrive as a query parameter or in a JSON body.
#[derive(Debug, Default, Deserialize)]
struct CallbackParams {
    code: Option<String>,
}

/// GET /auth/login: 303 to the Hosted UI authorize endpoint.
async fn login(State(state): State<AuthState>) -> Redirect {
    Redirect::to(&state.login_url)
}

/// POST|GET /auth/callback: run the callback state machine once.
///
/// An unparseable query (e.g. a repeated `code`) counts as no code, so the
/// response still goes through the JSON error path and the metrics.
async fn callback(
    State(state): State<AuthState>,
    query: Result<Query<CallbackParams>, QueryRejection>,
    body: Bytes,
) -> Response {
    let query_code = match query {
        Ok(Query(params)) => params.code,
        Err(rejection) => {
            warn!(error = %rejection, "unparseable callback query");
            None
        }
    };

    let code = query_code
        .filter(|c| !c.trim().is_empty())
        .or_else(|| {
            if body.is_empty() {
                return None;
            }
            serde_json::from_slice::<CallbackParams>(&body)
                .ok()
                .and_then(|params| params.code)
        });

    let request_id = format!("req_{}", uuid::Uuid::new_v4().as_simple());
    complete_callback(&state, code, request_id).await
}

#[instrument(skip_all, fields(request_id = %request_id))]
async fn complete_callback(state: &AuthState, code: Option<String>, request_id: String) -> Response {
    let started = Instant::now();
    let outcome = state.authenticator.callback(code.as_deref()).await;
    metrics::record_callback(outcome.label(), started.elapsed().as_secs_f64());

    match outcome {
        CallbackOutcome::Established { session_id, user } => (
            StatusCode::OK,
            [
                (SET_COOKIE, state.cookies.session_cookie(&session_id)),
                (CACHE_CONTROL, "no-store".to_string()),
            ],
            axum::Json(user),
        )
            .into_response(),
        CallbackOutcome::MissingCode(e) => ApiError::from(&e).into_response(),
        CallbackOutcome::ExchangeFailed(e)
        | CallbackOutcome::ClaimsInvalid(e)
        | CallbackOutcome::SessionFailed(e) => {
            error!(error = %e, kind = e.kind(), "authentication attempt failed");
            ApiError::from(&e).into_response()
        }
    }
}

/// GET /auth/me: resolve the session cookie to claims.
async fn me(State(state): State<AuthState>, headers: HeaderMap) -> Response {
    let session_id = state.cookies.session_id(&headers);

    match state.authenticator.resolve(session_id.as_deref()).await {
        Ok(Some(user)) => (
            StatusCode::OK,
            [(CACHE_CONTROL, "no-store")],
            axum::Json(user),
        )
            .into_response(),
        Ok(None) => ApiError::NOT_AUTHENTICATED.into_response(),
        Err(e) => {
            error!(error = %e, "session lookup failed");
            ApiError::from(&e).into_response()
        }
    }
}

/// POST /auth/signout: destroy the session; the cookie is cleared either way.
async fn sign_out(State(state): State<AuthState>, headers: HeaderMap) -> Response {
    let session_id = state.cookies.session_id(&headers);
    let clear = [(SET_COOKIE, state.cookies.clearing_cookie())];

    match state.authenticator.sign_out(session_id.as_deref()).await {
        Ok(()) => {
            metrics::record_signout("ok");
            let body = serde_json::json!({
                "status": "signed_out",
                "logout_url": state.logout_url.as_deref(),
            });
            (
                StatusCode::OK,
                clear,
                [(CONTENT_TYPE, "application/json")],
                body.to_string(),
            )
                .into_response()
        }
        Err(e) => {
            metrics::record_signout("error");
            error!(error = %e, "session destroy failed");
            (clear, ApiError::from(&e)).into_response()
        }
    }
}
