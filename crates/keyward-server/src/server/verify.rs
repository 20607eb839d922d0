//! Public key verification endpoint, called by end-user client software.
//!
//! Always answers with a structured body, including for malformed input.

use axum::Json;
use axum::extract::rejection::{JsonRejection, QueryRejection};
use axum::extract::{Query, State};
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use serde::{Deserialize, Serialize};

use super::AppState;
use crate::licensing::{Verdict, VerifyCode};

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct VerifyParams {
    #[serde(default)]
    key: String,
    #[serde(default)]
    device_id: String,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct VerifyResponse {
    success: bool,
    code: VerifyCode,
    message: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    game: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    expires_at: Option<i64>,
}

const fn status_for(code: VerifyCode) -> StatusCode {
    match code {
        VerifyCode::Valid | VerifyCode::DeviceRegistered => StatusCode::OK,
        VerifyCode::InvalidRequest => StatusCode::BAD_REQUEST,
        VerifyCode::InvalidKey => StatusCode::NOT_FOUND,
        VerifyCode::Revoked | VerifyCode::Expired | VerifyCode::DeviceLimitReached => {
            StatusCode::FORBIDDEN
        }
        VerifyCode::InternalError => StatusCode::INTERNAL_SERVER_ERROR,
    }
}

fn render(verdict: Verdict) -> Response {
    let status = status_for(verdict.code);
    let body = VerifyResponse {
        success: verdict.accepted(),
        code: verdict.code,
        message: verdict.message,
        game: verdict.game,
        expires_at: verdict.expires_at,
    };
    (status, Json(body)).into_response()
}

async fn run(state: &AppState, params: &VerifyParams) -> Response {
    render(state.licensing.verify(&params.key, &params.device_id).await)
}

/// `GET /api/verify?key=...&deviceId=...`
pub async fn verify_get(
    State(state): State<AppState>,
    params: Result<Query<VerifyParams>, QueryRejection>,
) -> Response {
    match params {
        Ok(Query(params)) => run(&state, &params).await,
        Err(rejection) => render(Verdict::reject(
            VerifyCode::InvalidRequest,
            rejection.body_text(),
        )),
    }
}

/// `POST /api/verify` with body `{key, deviceId}`
pub async fn verify_post(
    State(state): State<AppState>,
    body: Result<Json<VerifyParams>, JsonRejection>,
) -> Response {
    match body {
        Ok(Json(params)) => run(&state, &params).await,
        Err(rejection) => render(Verdict::reject(
            VerifyCode::InvalidRequest,
            rejection.body_text(),
        )),
    }
}
