//! Admin routes: reseller management, credit grants, referral tokens, and a
//! read-only view of every key.
//!
//! Responses wrap their payload in a named field (`{resellers}`, `{keys}`, ...).

use axum::Json;
use axum::extract::rejection::{JsonRejection, PathRejection};
use axum::extract::{Path, State};
use axum::http::StatusCode;
use serde::Deserialize;
use serde_json::{Value, json};

use super::AppState;
use super::error::ApiResult;
use super::session::AdminSession;

#[derive(Debug, Deserialize)]
pub struct CreditsRequest {
    credits: i64,
}

/// `POST /api/admin/referral-token`
pub async fn create_referral_token(
    State(state): State<AppState>,
    AdminSession(admin): AdminSession,
) -> ApiResult<(StatusCode, Json<Value>)> {
    let token = state.licensing.issue_referral_token(&admin.username).await?;
    Ok((StatusCode::CREATED, Json(json!({ "token": token }))))
}

/// `GET /api/admin/referral-tokens`
pub async fn list_referral_tokens(
    State(state): State<AppState>,
    _admin: AdminSession,
) -> ApiResult<Json<Value>> {
    let tokens = state.licensing.list_referral_tokens().await?;
    Ok(Json(json!({ "tokens": tokens })))
}

/// `GET /api/admin/resellers`
pub async fn list_resellers(
    State(state): State<AppState>,
    _admin: AdminSession,
) -> ApiResult<Json<Value>> {
    let resellers = state.licensing.list_resellers().await?;
    Ok(Json(json!({ "resellers": resellers })))
}

/// `POST /api/admin/resellers/{id}/credits` with body `{credits}`
pub async fn add_credits(
    State(state): State<AppState>,
    _admin: AdminSession,
    id: Result<Path<i64>, PathRejection>,
    body: Result<Json<CreditsRequest>, JsonRejection>,
) -> ApiResult<Json<Value>> {
    let Path(id) = id?;
    let Json(request) = body?;
    let reseller = state.licensing.add_credits(id, request.credits).await?;
    Ok(Json(json!({ "reseller": reseller })))
}

/// `DELETE /api/admin/resellers/{id}`
pub async fn delete_reseller(
    State(state): State<AppState>,
    _admin: AdminSession,
    id: Result<Path<i64>, PathRejection>,
) -> ApiResult<Json<Value>> {
    let Path(id) = id?;
    state.licensing.delete_reseller(id).await?;
    Ok(Json(json!({ "message": "Reseller deleted successfully" })))
}

/// `GET /api/admin/keys`
pub async fn list_keys(
    State(state): State<AppState>,
    _admin: AdminSession,
) -> ApiResult<Json<Value>> {
    let keys = state.licensing.list_all_keys().await?;
    Ok(Json(json!({ "keys": keys })))
}

/// `GET /api/admin/keys/{id}/devices`
pub async fn key_devices(
    State(state): State<AppState>,
    AdminSession(admin): AdminSession,
    id: Result<Path<i64>, PathRejection>,
) -> ApiResult<Json<Value>> {
    let Path(id) = id?;
    let devices = state.licensing.list_devices(&admin, id).await?;
    Ok(Json(json!({ "devices": devices })))
}
