//! Bearer-token session extractors.

use axum::extract::FromRequestParts;
use axum::http::header::AUTHORIZATION;
use axum::http::request::Parts;
use tracing::debug;

use super::AppState;
use super::error::ApiError;
use crate::auth::{Claims, Principal};
use crate::error::LicenseError;

/// The claims of a valid bearer token that has not been logged out.
#[derive(Debug, Clone)]
pub struct SessionClaims(pub Claims);

/// Any authenticated operator.
#[derive(Debug, Clone)]
pub struct AnySession(pub Principal);

/// An authenticated admin.
#[derive(Debug, Clone)]
pub struct AdminSession(pub Principal);

/// An authenticated reseller whose account still exists.
#[derive(Debug, Clone)]
pub struct ResellerSession(pub Principal);

fn bearer_token(parts: &Parts) -> Option<&str> {
    parts
        .headers
        .get(AUTHORIZATION)
        .and_then(|v| v.to_str().ok())
        .and_then(|v| v.strip_prefix("Bearer "))
        .map(str::trim)
        .filter(|t| !t.is_empty())
}

impl FromRequestParts<AppState> for SessionClaims {
    type Rejection = ApiError;

    async fn from_request_parts(parts: &mut Parts, state: &AppState) -> Result<Self, ApiError> {
        let token = bearer_token(parts)
            .ok_or_else(|| ApiError::unauthorized("Missing authorization header"))?;

        let claims = state.jwt.validate(token).map_err(|e| {
            debug!(error = %e, "Rejected session token");
            ApiError::unauthorized("Invalid or expired session")
        })?;

        if state.licensing.session_ended(&claims.jti).await? {
            debug!(jti = %claims.jti, "Rejected logged-out session token");
            return Err(ApiError::unauthorized("Invalid or expired session"));
        }

        Ok(Self(claims))
    }
}

impl FromRequestParts<AppState> for AnySession {
    type Rejection = ApiError;

    async fn from_request_parts(parts: &mut Parts, state: &AppState) -> Result<Self, ApiError> {
        let SessionClaims(claims) = SessionClaims::from_request_parts(parts, state).await?;
        Ok(Self(claims.principal()))
    }
}

impl FromRequestParts<AppState> for AdminSession {
    type Rejection = ApiError;

    async fn from_request_parts(parts: &mut Parts, state: &AppState) -> Result<Self, ApiError> {
        let AnySession(principal) = AnySession::from_request_parts(parts, state).await?;
        if !principal.is_admin() {
            return Err(ApiError::forbidden("Admin access required"));
        }
        Ok(Self(principal))
    }
}

impl FromRequestParts<AppState> for ResellerSession {
    type Rejection = ApiError;

    async fn from_request_parts(parts: &mut Parts, state: &AppState) -> Result<Self, ApiError> {
        let AnySession(principal) = AnySession::from_request_parts(parts, state).await?;
        if !principal.is_reseller() {
            return Err(ApiError::forbidden("Reseller access required"));
        }

        // Tokens outlive account deletion; refuse them once the account is gone.
        match state.licensing.reseller(principal.id).await {
            Ok(_) => Ok(Self(principal)),
            Err(LicenseError::NotFound(_)) => {
                Err(ApiError::unauthorized("Account no longer exists"))
            }
            Err(e) => Err(e.into()),
        }
    }
}
