//! Login, registration, and session introspection.

use axum::Json;
use axum::extract::State;
use axum::extract::rejection::JsonRejection;
use axum::http::StatusCode;
use serde::{Deserialize, Serialize};
use serde_json::{Value, json};
use tracing::{error, instrument};

use super::AppState;
use super::error::{ApiError, ApiResult};
use super::session::{AnySession, SessionClaims};
use crate::auth::{Principal, Role};
use crate::licensing::Registration;

#[derive(Debug, Deserialize)]
pub struct LoginRequest {
    #[serde(default)]
    username: String,
    #[serde(default)]
    password: String,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct LoginResponse {
    token: String,
    token_type: &'static str,
    expires_in: i64,
    user: Principal,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct MeResponse {
    #[serde(flatten)]
    principal: Principal,
    #[serde(skip_serializing_if = "Option::is_none")]
    credits: Option<i64>,
}

fn credentials(body: Result<Json<LoginRequest>, JsonRejection>) -> ApiResult<LoginRequest> {
    let Json(request) = body?;
    if request.username.is_empty() || request.password.is_empty() {
        return Err(ApiError::bad_request("Username and password are required"));
    }
    Ok(request)
}

fn session_for(state: &AppState, principal: Principal) -> ApiResult<Json<LoginResponse>> {
    let (token, expires_in) = state.jwt.issue(&principal).map_err(|e| {
        error!(error = %e, "Failed to sign session token");
        ApiError::internal()
    })?;

    Ok(Json(LoginResponse {
        token,
        token_type: "Bearer",
        expires_in,
        user: principal,
    }))
}

/// `POST /api/admin/login`
#[instrument(skip_all, fields(route = "admin_login"))]
pub async fn admin_login(
    State(state): State<AppState>,
    body: Result<Json<LoginRequest>, JsonRejection>,
) -> ApiResult<Json<LoginResponse>> {
    let request = credentials(body)?;
    let principal = state
        .licensing
        .login_admin(&request.username, &request.password)
        .await?;
    session_for(&state, principal)
}

/// `POST /api/reseller/login`
#[instrument(skip_all, fields(route = "reseller_login"))]
pub async fn reseller_login(
    State(state): State<AppState>,
    body: Result<Json<LoginRequest>, JsonRejection>,
) -> ApiResult<Json<LoginResponse>> {
    let request = credentials(body)?;
    let principal = state
        .licensing
        .login_reseller(&request.username, &request.password)
        .await?;
    session_for(&state, principal)
}

/// `POST /api/reseller/register`
#[instrument(skip_all, fields(route = "register"))]
pub async fn register(
    State(state): State<AppState>,
    body: Result<Json<Registration>, JsonRejection>,
) -> ApiResult<(StatusCode, Json<Value>)> {
    let Json(registration) = body?;
    let reseller = state.licensing.register_reseller(&registration).await?;
    Ok((
        StatusCode::CREATED,
        Json(json!({ "message": "Registration successful", "reseller": reseller })),
    ))
}

/// `POST /api/logout`
///
/// Revokes the presented token; it is refused from then on even though its
/// signature and expiry still check out.
pub async fn logout(
    State(state): State<AppState>,
    SessionClaims(claims): SessionClaims,
) -> ApiResult<Json<Value>> {
    state.licensing.end_session(&claims.jti, claims.exp).await?;
    Ok(Json(json!({ "message": "Logout successful" })))
}

/// `GET /api/me`
pub async fn me(
    State(state): State<AppState>,
    AnySession(principal): AnySession,
) -> ApiResult<Json<MeResponse>> {
    let credits = match principal.role {
        Role::Reseller => Some(state.licensing.credits(principal.id).await?),
        Role::Admin => None,
    };
    Ok(Json(MeResponse { principal, credits }))
}
