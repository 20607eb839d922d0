//! Mapping from licensing errors to HTTP responses.

use axum::Json;
use axum::extract::rejection::{JsonRejection, PathRejection};
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use serde_json::json;
use tracing::error;

use crate::error::LicenseError;

pub type ApiResult<T> = Result<T, ApiError>;

/// An error rendered as `{"message": ...}` with a status code.
#[derive(Debug)]
pub struct ApiError {
    status: StatusCode,
    message: String,
}

impl ApiError {
    pub fn new(status: StatusCode, message: impl Into<String>) -> Self {
        Self {
            status,
            message: message.into(),
        }
    }

    pub fn bad_request(message: impl Into<String>) -> Self {
        Self::new(StatusCode::BAD_REQUEST, message)
    }

    pub fn unauthorized(message: impl Into<String>) -> Self {
        Self::new(StatusCode::UNAUTHORIZED, message)
    }

    pub fn forbidden(message: impl Into<String>) -> Self {
        Self::new(StatusCode::FORBIDDEN, message)
    }

    pub fn internal() -> Self {
        Self::new(StatusCode::INTERNAL_SERVER_ERROR, "Internal server error")
    }

    pub const fn status(&self) -> StatusCode {
        self.status
    }
}

impl From<LicenseError> for ApiError {
    fn from(e: LicenseError) -> Self {
        let status = match &e {
            LicenseError::Validation(_)
            | LicenseError::InvalidAmount
            | LicenseError::InsufficientCredits
            | LicenseError::InvalidToken => StatusCode::BAD_REQUEST,
            LicenseError::Unauthorized(_) => StatusCode::UNAUTHORIZED,
            LicenseError::Forbidden(_) => StatusCode::FORBIDDEN,
            LicenseError::NotFound(_) => StatusCode::NOT_FOUND,
            LicenseError::DuplicateKey | LicenseError::UsernameTaken => StatusCode::CONFLICT,
            LicenseError::Storage(_) | LicenseError::Internal(_) => {
                error!(error = %e, "Request failed");
                return Self::internal();
            }
        };
        Self::new(status, e.to_string())
    }
}

impl From<JsonRejection> for ApiError {
    fn from(rejection: JsonRejection) -> Self {
        Self::bad_request(rejection.body_text())
    }
}

impl From<PathRejection> for ApiError {
    fn from(rejection: PathRejection) -> Self {
        Self::bad_request(rejection.body_text())
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        (self.status, Json(json!({ "message": self.message }))).into_response()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use keyward_core::db::DatabaseError;

    #[test]
    fn conflicts_map_to_409() {
        assert_eq!(
            ApiError::from(LicenseError::DuplicateKey).status(),
            StatusCode::CONFLICT
        );
        assert_eq!(
            ApiError::from(LicenseError::UsernameTaken).status(),
            StatusCode::CONFLICT
        );
    }

    #[test]
    fn storage_detail_is_hidden() {
        let err = ApiError::from(LicenseError::Storage(DatabaseError::Query(
            "no such table: license_keys".into(),
        )));
        assert_eq!(err.status(), StatusCode::INTERNAL_SERVER_ERROR);
        assert_eq!(err.message, "Internal server error");
    }

    #[test]
    fn insufficient_credits_is_a_bad_request() {
        let err = ApiError::from(LicenseError::InsufficientCredits);
        assert_eq!(err.status(), StatusCode::BAD_REQUEST);
        assert_eq!(err.message, "Insufficient credits");
    }
}
