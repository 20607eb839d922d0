//! Reseller routes: balance, key issuance, and management of owned keys.

use axum::Json;
use axum::extract::rejection::{JsonRejection, PathRejection};
use axum::extract::{Path, State};
use axum::http::StatusCode;
use serde_json::{Value, json};

use super::AppState;
use super::error::ApiResult;
use super::session::ResellerSession;
use crate::licensing::{IssuedKey, KeySpec};

/// `GET /api/reseller/credits`
pub async fn credits(
    State(state): State<AppState>,
    ResellerSession(me): ResellerSession,
) -> ApiResult<Json<Value>> {
    let credits = state.licensing.credits(me.id).await?;
    Ok(Json(json!({ "credits": credits })))
}

/// `GET /api/reseller/keys`
pub async fn list_keys(
    State(state): State<AppState>,
    ResellerSession(me): ResellerSession,
) -> ApiResult<Json<Value>> {
    let keys = state.licensing.list_keys_for(me.id).await?;
    Ok(Json(json!({ "keys": keys })))
}

/// `POST /api/reseller/keys`
pub async fn create_key(
    State(state): State<AppState>,
    ResellerSession(me): ResellerSession,
    body: Result<Json<KeySpec>, JsonRejection>,
) -> ApiResult<(StatusCode, Json<IssuedKey>)> {
    let Json(spec) = body?;
    let issued = state.licensing.create_key(me.id, &spec).await?;
    Ok((StatusCode::CREATED, Json(issued)))
}

/// `DELETE /api/reseller/keys/{id}`
pub async fn revoke_key(
    State(state): State<AppState>,
    ResellerSession(me): ResellerSession,
    id: Result<Path<i64>, PathRejection>,
) -> ApiResult<Json<Value>> {
    let Path(id) = id?;
    let key = state.licensing.revoke_key(me.id, id).await?;
    Ok(Json(json!({ "message": "Key revoked successfully", "key": key })))
}

/// `POST /api/reseller/keys/{id}/reset`
pub async fn reset_key(
    State(state): State<AppState>,
    ResellerSession(me): ResellerSession,
    id: Result<Path<i64>, PathRejection>,
) -> ApiResult<Json<Value>> {
    let Path(id) = id?;
    let key = state.licensing.reset_key(me.id, id).await?;
    Ok(Json(json!({ "message": "Key reset successfully", "key": key })))
}

/// `GET /api/reseller/keys/{id}/devices`
pub async fn key_devices(
    State(state): State<AppState>,
    ResellerSession(me): ResellerSession,
    id: Result<Path<i64>, PathRejection>,
) -> ApiResult<Json<Value>> {
    let Path(id) = id?;
    let devices = state.licensing.list_devices(&me, id).await?;
    Ok(Json(json!({ "devices": devices })))
}
