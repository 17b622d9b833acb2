//! Cookie Refresher
//!
//! Single-binary service that:
//! 1. Loads the account store from disk
//! 2. Runs the background cookie refresh worker
//! 3. Serves health, metrics and the admin API on one listener
//! 4. Stops the worker and drains requests on SIGINT/SIGTERM

mod admin;
mod config;
mod metrics;

use account_store::{AUTO_REFRESH_COOKIE, AccountStore, is_effectively_expired};
use anyhow::{Context, Result};
use axum::Router;
use axum::extract::State;
use axum::response::IntoResponse;
use axum::routing::get;
use cookie_refresh::{RefreshWorker, TriggerHandle, spawn_refresh_worker};
use refresher::ManualRefresher;
use std::sync::Arc;
use std::time::{Duration, Instant};
use tokio::net::TcpListener;
use tokio_util::sync::CancellationToken;
use tracing::{error, info, warn};
use tracing_subscriber::EnvFilter;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use metrics_exporter_prometheus::PrometheusHandle;

use crate::admin::{AdminState, build_admin_router};
use crate::config::Config;

/// Time allowed for in-flight requests, and then the worker, to finish after
/// a shutdown signal.
const DRAIN_TIMEOUT: Duration = Duration::from_secs(5);

/// Shared application state accessible from the health and metrics handlers
#[derive(Clone)]
struct AppState {
    store: Arc<AccountStore>,
    trigger: TriggerHandle,
    started_at: Instant,
    prometheus: PrometheusHandle,
}

/// Build the axum router: health, metrics and the admin API.
///
/// A concurrency limit bounds how many admin requests are served at once.
fn build_router(state: AppState, admin: AdminState, max_connections: usize) -> Router {
    Router::new()
        .route("/health", get(health_handler))
        .route("/metrics", get(metrics_handler))
        .with_state(state)
        .merge(build_admin_router(admin))
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

    info!("starting cookie-refresher");

    // Install Prometheus metrics recorder before any metrics are emitted
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

    let schedule = config.refresh.schedule();
    info!(
        listen_addr = %config.admin.listen_addr,
        store_path = %config.store.path.display(),
        check_interval_secs = schedule.check_interval.as_secs(),
        spacing_secs = schedule.spacing.as_secs(),
        admin_token = config.admin.token.is_some(),
        "configuration loaded"
    );

    let store = Arc::new(
        AccountStore::load(config.store.path.clone())
            .await
            .with_context(|| {
                format!("failed to load account store from {}", config.store.path.display())
            })?,
    );
    info!(accounts = store.len().await, "account store loaded");

    let worker = RefreshWorker::from_store(store.clone(), Arc::new(ManualRefresher::new()), schedule);
    let trigger = worker.trigger_handle();

    let cancel = CancellationToken::new();
    let worker_handle = spawn_refresh_worker(worker, cancel.clone());

    let app_state = AppState {
        store: store.clone(),
        trigger: trigger.clone(),
        started_at: Instant::now(),
        prometheus: prometheus_handle,
    };
    let admin_state = AdminState::new(store.clone(), trigger, config.admin.token.clone());
    let app = build_router(app_state, admin_state, config.admin.max_connections);

    let listen_addr = config.admin.listen_addr;
    let listener = TcpListener::bind(listen_addr)
        .await
        .with_context(|| format!("failed to bind to {listen_addr}"))?;
    info!(addr = %listen_addr, "accepting requests");

    // The drain timeout starts when the shutdown signal fires, not when the
    // server starts.
    let (shutdown_tx, shutdown_rx) = tokio::sync::oneshot::channel::<()>();

    let server_handle = tokio::spawn(async move {
        axum::serve(listener, app)
            .with_graceful_shutdown(async {
                let _ = shutdown_rx.await;
            })
            .await
    });

    shutdown_signal().await;

    // Stop the worker first so no new refresh starts while requests drain
    cancel.cancel();
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

    match tokio::time::timeout(DRAIN_TIMEOUT, worker_handle).await {
        Ok(Ok(())) => {}
        Ok(Err(e)) => error!(error = %e, "refresh worker task failed"),
        Err(_) => warn!("refresh worker did not stop in time"),
    }

    // Flush the store before exit
    if let Err(e) = store.save().await {
        error!(error = %e, "failed to persist account store on shutdown");
    }

    info!("shutdown complete");
    Ok(())
}

/// Health endpoint: status, uptime and a summary of the account store.
async fn health_handler(State(state): State<AppState>) -> impl IntoResponse {
    let accounts = state.store.accounts().await;
    let states = state.store.account_states().await;
    let expired = accounts
        .iter()
        .enumerate()
        .filter(|(index, account)| is_effectively_expired(account, states.get(index)))
        .count();

    let body = serde_json::json!({
        "status": "healthy",
        "uptime_seconds": state.started_at.elapsed().as_secs(),
        "accounts_total": accounts.len(),
        "accounts_expired": expired,
        "auto_refresh_cookie": state.store.get_flag(AUTO_REFRESH_COOKIE, false).await,
        "refresh_pending": state.trigger.is_pending(),
    });

    (
        axum::http::StatusCode::OK,
        [(axum::http::header::CONTENT_TYPE, "application/json")],
        body.to_string(),
    )
}

/// Prometheus metrics endpoint in text exposition format.
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
