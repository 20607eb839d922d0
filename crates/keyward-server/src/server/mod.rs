//! HTTP API for the Keyward license server.
//!
//! Everything lives under `/api` except the `/healthz` liveness check. Management
//! routes authenticate with a bearer session token; `/api/verify` is public.

mod admin;
mod auth_routes;
mod error;
mod reseller;
mod session;
mod verify;

use std::sync::Arc;

use axum::routing::{delete, get, post};
use axum::{Json, Router};
use serde_json::{Value, json};
use tower_http::trace::TraceLayer;

use crate::auth::JwtManager;
use crate::licensing::LicenseService;

pub use error::{ApiError, ApiResult};
pub use session::{AdminSession, AnySession, ResellerSession, SessionClaims};

/// Shared application state.
#[derive(Clone)]
pub struct AppState {
    pub licensing: Arc<LicenseService>,
    pub jwt: Arc<JwtManager>,
}

/// Build the full application router.
pub fn build_router(state: AppState) -> Router {
    let api = Router::new()
        .route("/verify", get(verify::verify_get).post(verify::verify_post))
        .route("/me", get(auth_routes::me))
        .route("/logout", post(auth_routes::logout))
        .route("/admin/login", post(auth_routes::admin_login))
        .route("/admin/referral-token", post(admin::create_referral_token))
        .route("/admin/referral-tokens", get(admin::list_referral_tokens))
        .route("/admin/resellers", get(admin::list_resellers))
        .route("/admin/resellers/{id}", delete(admin::delete_reseller))
        .route("/admin/resellers/{id}/credits", post(admin::add_credits))
        .route("/admin/keys", get(admin::list_keys))
        .route("/admin/keys/{id}/devices", get(admin::key_devices))
        .route("/reseller/login", post(auth_routes::reseller_login))
        .route("/reseller/register", post(auth_routes::register))
        .route("/reseller/credits", get(reseller::credits))
        .route(
            "/reseller/keys",
            get(reseller::list_keys).post(reseller::create_key),
        )
        .route("/reseller/keys/{id}", delete(reseller::revoke_key))
        .route("/reseller/keys/{id}/reset", post(reseller::reset_key))
        .route("/reseller/keys/{id}/devices", get(reseller::key_devices));

    Router::new()
        .route("/healthz", get(healthz))
        .nest("/api", api)
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}

/// `GET /healthz`
async fn healthz() -> Json<Value> {
    Json(json!({ "status": "ok" }))
}
