//! Hosted UI Auth Gateway
//!
//! Single-binary Rust service that:
//! 1. Sends browsers to the Hosted UI to sign in
//! 2. Exchanges the returned authorization code for tokens
//! 3. Establishes a server-side session behind an HttpOnly cookie
//! 4. Answers "who is signed in" and handles sign-out

mod auth;
mod config;
mod cookie;
mod error;
mod metrics;

use std::sync::Arc;
use std::time::{Duration, Instant};

use anyhow::{Context, Result};
use axum::Router;
use axum::extract::State;
use axum::response::IntoResponse;
use axum::routing::get;
use hosted_auth::{
    Authenticator, ExchangeConfig, InMemorySessionStore, TokenExchangeClient,
    UnverifiedClaimsExtractor,
};
use metrics_exporter_prometheus::PrometheusHandle;
use tokio::net::TcpListener;
use tracing::{error, info, warn};
use tracing_subscriber::EnvFilter;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use crate::auth::AuthState;
use crate::config::Config;
use crate::cookie::CookieSettings;

/// Time allowed for in-flight requests to finish after a shutdown signal.
const DRAIN_TIMEOUT: Duration = Duration::from_secs(5);

/// Shared state for the operational endpoints
#[derive(Clone)]
struct AppState {
    sessions: Arc<InMemorySessionStore>,
    started_at: Instant,
    prometheus: PrometheusHandle,
}

/// Build the full router: auth routes plus health and metrics.
///
/// Applies a concurrency limit layer based on `max_connections`.
fn build_router(state: AppState, auth: AuthState, max_connections: usize) -> Router {
    Router::new()
        .route("/health", get(health_handler))
        .route("/metrics", get(metrics_handler))
        .with_state(state)
        .merge(auth::build_auth_router(auth))
        .layer(tower::limit::ConcurrencyLimitLayer::new(max_connections))
}

#[tokio::main]
async fn main() -> Result<()> {
    // Initialize tracing with JSON output and LOG_LEVEL / RUST_LOG support
    tracing_subscriber::registry()
        .with(
            EnvFilter::try_from_env("LOG_LEVEL")
                .or_else(|_| EnvFilter::try_from_default_env())
                .unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .with(tracing_subscriber::fmt::layer().json())
        .init();

    info!("starting hosted-auth-gateway");

    let prometheus_handle = metrics::install_recorder();

    // CLI: simple --config flag parsing
    let args: Vec<String> = std::env::args().collect();
    let cli_config_path = args
        .iter()
        .position(|a| a == "--config")
        .and_then(|i| args.get(i + 1))
        .map(|s| s.as_str());

    let config_path = Config::resolve_path(cli_config_path);
    info!(path = %config_path.display(), "loading configuration");

    let config = Config::load(&config_path)
        .with_context(|| format!("failed to load config from {}", config_path.display()))?;

    info!(
        listen_addr = %config.server.listen_addr,
        hosted_ui_domain = %config.provider.hosted_ui_domain,
        client_id = %config.provider.client_id,
        confidential_client = config.provider.client_secret.is_some(),
        session_ttl_secs = config.session.ttl_secs,
        "configuration loaded"
    );
    if !config.session.secure {
        warn!("session cookie Secure attribute disabled, use only for local development");
    }

    let hosted_ui = config.provider.hosted_ui_base()?;
    let login_url = hosted_auth::authorize_url(
        &hosted_ui,
        &config.provider.client_id,
        &config.provider.redirect_uri,
        &config.provider.scopes,
    );
    let logout_url = config
        .provider
        .logout_uri
        .as_deref()
        .map(|uri| hosted_auth::logout_url(&hosted_ui, &config.provider.client_id, uri));

    let exchange = TokenExchangeClient::new(
        reqwest::Client::new(),
        ExchangeConfig {
            hosted_ui_domain: config.provider.hosted_ui_domain.clone(),
            client_id: config.provider.client_id.clone(),
            client_secret: config.provider.client_secret.clone(),
            timeout: config.provider.exchange_timeout(),
        },
    );

    let sessions = Arc::new(InMemorySessionStore::new(config.session.ttl()));
    let sweeper = hosted_auth::spawn_sweep_task(sessions.clone(), config.session.sweep_interval());

    let authenticator = Authenticator::new(
        exchange,
        Arc::new(UnverifiedClaimsExtractor),
        sessions.clone(),
        config.provider.redirect_uri.clone(),
    );

    let auth_state = AuthState::new(
        Arc::new(authenticator),
        CookieSettings::from_config(&config.session),
        login_url,
        logout_url,
    );
    let app_state = AppState {
        sessions,
        started_at: Instant::now(),
        prometheus: prometheus_handle,
    };

    let app = build_router(app_state, auth_state, config.server.max_connections);

    let listen_addr = config.server.listen_addr;
    let listener = TcpListener::bind(listen_addr)
        .await
        .with_context(|| format!("failed to bind to {listen_addr}"))?;
    info!(addr = %listen_addr, "accepting requests");

    // The drain timer starts when the shutdown signal fires, not when the
    // server starts: signal the server to drain, then race it against the timeout.
    let (shutdown_tx, shutdown_rx) = tokio::sync::oneshot::channel::<()>();

    let server_handle = tokio::spawn(async move {
        axum::serve(listener, app)
            .with_graceful_shutdown(async {
                let _ = shutdown_rx.await;
            })
            .await
    });

    shutdown_signal().await;
    let _ = shutdown_tx.send(());

    match tokio::time::timeout(DRAIN_TIMEOUT, server_handle).await {
        Ok(Ok(Ok(()))) => info!("all in-flight requests drained"),
        Ok(Ok(Err(e))) => error!(error = %e, "server error during shutdown"),
        Ok(Err(e)) => error!(error = %e, "server task panicked"),
        Err(_) => warn!(
            drain_timeout_secs = DRAIN_TIMEOUT.as_secs(),
            "drain timeout exceeded, forcing shutdown"
        ),
    }

    sweeper.abort();
    info!("shutdown complete");
    Ok(())
}

/// Health endpoint: status, uptime and live session count.
async fn health_handler(State(state): State<AppState>) -> impl IntoResponse {
    let body = serde_json::json!({
        "status": "healthy",
        "uptime_seconds": state.started_at.elapsed().as_secs(),
        "active_sessions": state.sessions.len().await,
    });

    (
        axum::http::StatusCode::OK,
        [(axum::http::header::CONTENT_TYPE, "application/json")],
        body.to_string(),
    )
}

/// Prometheus metrics endpoint: returns metrics in text exposition format.
async fn metrics_handler(State(state): State<AppState>) -> impl IntoResponse {
    (
        axum::http::StatusCode::OK,
        [(
            axum::http::header::CONTENT_TYPE,
            "text/plain; version=0.0.4; charset=utf-8",
        )],
        state.prometheus.render(),
    )
}

/// Wait for SIGTERM or SIGINT for graceful shutdown.
async fn shutdown_signal() {
    let ctrl_c = async {
        tokio::signal::ctrl_c()
            .await
            .expect("failed to install Ctrl+C handler");
    };

    #[cfg(unix)]
    let terminate = async {
        tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate())
            .expect("failed to install SIGTERM handler")
            .recv()
            .await;
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => info!("received SIGINT, shutting down"),
        _ = terminate => info!("received SIGTERM, shutting down"),
    }
}
