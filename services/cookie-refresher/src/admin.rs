//! Admin API for accounts and the refresh worker
//!
//! Served on the admin listener alongside `/health` and `/metrics`. Mutating
//! endpoints require `Authorization: Bearer <token>` when an admin token is
//! configured.
//!
//! Endpoints:
//! - GET  /admin/accounts                     : list accounts with effective expiry
//! - POST /admin/accounts                     : append an account
//! - POST /admin/accounts/{index}/expired     : flag an account's cookie as expired
//! - PUT  /admin/settings/auto_refresh_cookie : enable/disable background refresh
//! - POST /admin/refresh/trigger              : wake the worker now

use std::sync::Arc;

use account_store::{AUTO_REFRESH_COOKIE, Account, AccountStore, is_effectively_expired};
use axum::Router;
use axum::extract::{Path, State};
use axum::http::{HeaderMap, StatusCode};
use axum::response::{IntoResponse, Response};
use axum::routing::{get, post, put};
use common::Secret;
use cookie_refresh::TriggerHandle;
use serde::Deserialize;
use subtle::ConstantTimeEq;
use tracing::{info, warn};

/// Shared state for admin API handlers.
#[derive(Clone)]
pub struct AdminState {
    store: Arc<AccountStore>,
    trigger: TriggerHandle,
    token: Option<Arc<Secret<String>>>,
}

impl AdminState {
    pub fn new(
        store: Arc<AccountStore>,
        trigger: TriggerHandle,
        token: Option<Secret<String>>,
    ) -> Self {
        Self {
            store,
            trigger,
            token: token.map(Arc::new),
        }
    }

    /// Reject the request unless it carries the configured bearer token.
    fn authorize(&self, headers: &HeaderMap) -> Result<(), Response> {
        let Some(expected) = &self.token else {
            return Ok(());
        };
        let provided = headers
            .get(axum::http::header::AUTHORIZATION)
            .and_then(|v| v.to_str().ok())
            .and_then(|v| v.strip_prefix("Bearer "));
        if provided.is_some_and(|p| constant_time_compare(p, expected.expose())) {
            Ok(())
        } else {
            warn!("admin request rejected: missing or invalid bearer token");
            Err(json_response(
                StatusCode::UNAUTHORIZED,
                serde_json::json!({ "error": "missing or invalid admin token" }),
            ))
        }
    }
}

fn constant_time_compare(a: &str, b: &str) -> bool {
    if a.len() != b.len() {
        return false;
    }
    a.as_bytes().ct_eq(b.as_bytes()).into()
}

/// Build the admin axum router with all account and worker endpoints.
pub fn build_admin_router(state: AdminState) -> Router {
    Router::new()
        .route("/admin/accounts", get(list_accounts).post(add_account))
        .route("/admin/accounts/{index}/expired", post(mark_expired))
        .route(
            "/admin/settings/auto_refresh_cookie",
            put(set_auto_refresh),
        )
        .route("/admin/refresh/trigger", post(trigger_refresh))
        .with_state(state)
}

fn json_response(status: StatusCode, body: serde_json::Value) -> Response {
    (
        status,
        [(axum::http::header::CONTENT_TYPE, "application/json")],
        body.to_string(),
    )
        .into_response()
}

/// GET /admin/accounts: accounts with their effective expired flag.
///
/// Never exposes cookies, only whether one is stored.
async fn list_accounts(State(state): State<AdminState>) -> Response {
    let accounts = state.store.accounts().await;
    let states = state.store.account_states().await;
    let auto_refresh = state.store.get_flag(AUTO_REFRESH_COOKIE, false).await;

    let accounts: Vec<serde_json::Value> = accounts
        .iter()
        .enumerate()
        .map(|(index, account)| {
            serde_json::json!({
                "index": index,
                "tempmail_name": account.tempmail_name,
                "has_tempmail": account.has_tempmail(),
                "has_cookie": account.cookie.is_some(),
                "cookie_expired": is_effectively_expired(account, states.get(&index)),
            })
        })
        .collect();

    json_response(
        StatusCode::OK,
        serde_json::json!({
            "auto_refresh_cookie": auto_refresh,
            "accounts": accounts,
        }),
    )
}

/// Request body for adding an account.
#[derive(Deserialize)]
struct NewAccountRequest {
    #[serde(default)]
    tempmail_name: String,
    #[serde(default)]
    tempmail_url: String,
    #[serde(default)]
    cookie_expired: bool,
}

/// POST /admin/accounts: append an account to the store.
async fn add_account(
    State(state): State<AdminState>,
    headers: HeaderMap,
    axum::Json(body): axum::Json<NewAccountRequest>,
) -> Response {
    if let Err(rejection) = state.authorize(&headers) {
        return rejection;
    }

    let account = Account {
        tempmail_name: body.tempmail_name,
        tempmail_url: body.tempmail_url,
        cookie_expired: body.cookie_expired,
        cookie: None,
    };

    match state.store.add_account(account).await {
        Ok(index) => {
            info!(account_index = index, "account added");
            json_response(
                StatusCode::CREATED,
                serde_json::json!({ "index": index, "status": "added" }),
            )
        }
        Err(e) => {
            warn!(error = %e, "failed to store account");
            json_response(
                StatusCode::INTERNAL_SERVER_ERROR,
                serde_json::json!({ "error": format!("failed to store account: {e}") }),
            )
        }
    }
}

/// POST /admin/accounts/{index}/expired: set the runtime expired flag.
async fn mark_expired(
    State(state): State<AdminState>,
    headers: HeaderMap,
    Path(index): Path<usize>,
) -> Response {
    if let Err(rejection) = state.authorize(&headers) {
        return rejection;
    }

    match state.store.mark_state_expired(index).await {
        Ok(()) => json_response(
            StatusCode::OK,
            serde_json::json!({ "index": index, "cookie_expired": true }),
        ),
        Err(account_store::Error::NotFound(_)) => json_response(
            StatusCode::NOT_FOUND,
            serde_json::json!({ "error": format!("no account at index {index}") }),
        ),
        Err(e) => json_response(
            StatusCode::INTERNAL_SERVER_ERROR,
            serde_json::json!({ "error": e.to_string() }),
        ),
    }
}

/// Request body for toggling background refresh.
#[derive(Deserialize)]
struct SetFlagRequest {
    enabled: bool,
}

/// PUT /admin/settings/auto_refresh_cookie: takes effect on the next cycle.
async fn set_auto_refresh(
    State(state): State<AdminState>,
    headers: HeaderMap,
    axum::Json(body): axum::Json<SetFlagRequest>,
) -> Response {
    if let Err(rejection) = state.authorize(&headers) {
        return rejection;
    }

    match state.store.set_flag(AUTO_REFRESH_COOKIE, body.enabled).await {
        Ok(()) => {
            info!(enabled = body.enabled, "auto cookie refresh setting changed");
            json_response(
                StatusCode::OK,
                serde_json::json!({ "auto_refresh_cookie": body.enabled }),
            )
        }
        Err(e) => {
            warn!(error = %e, "failed to persist setting");
            json_response(
                StatusCode::INTERNAL_SERVER_ERROR,
                serde_json::json!({ "error": format!("failed to persist setting: {e}") }),
            )
        }
    }
}

/// POST /admin/refresh/trigger: request an immediate scan.
///
/// Returns 202: the scan runs asynchronously on the worker, and requests made
/// while one is already pending collapse into it.
async fn trigger_refresh(State(state): State<AdminState>, headers: HeaderMap) -> Response {
    if let Err(rejection) = state.authorize(&headers) {
        crate::metrics::record_admin_request("/admin/refresh/trigger", 401);
        return rejection;
    }

    state.trigger.trigger_immediate_refresh();
    crate::metrics::record_admin_request("/admin/refresh/trigger", 202);
    info!("immediate cookie refresh triggered via admin API");

    json_response(
        StatusCode::ACCEPTED,
        serde_json::json!({ "status": "triggered" }),
    )
}
