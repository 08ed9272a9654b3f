use axum::Json;
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use keyfort_core::AppError;
use serde::Serialize;

/// API error payload.
#[derive(Debug, Serialize)]
pub struct ErrorResponse {
    message: String,
}

/// HTTP API error wrapper around core application errors.
#[derive(Debug)]
pub struct ApiError(pub AppError);

impl From<AppError> for ApiError {
    fn from(value: AppError) -> Self {
        Self(value)
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        // Whether a bearer was unknown, revoked, or expired is operator
        // information, not client information: log the distinct kind, then
        // collapse to one generic unauthorized response.
        if self.0.is_credential_failure() {
            tracing::warn!(error = %self.0, "credential validation failed");
            let payload = Json(ErrorResponse {
                message: "invalid or expired credentials".to_owned(),
            });
            return (StatusCode::UNAUTHORIZED, payload).into_response();
        }

        let status = match self.0 {
            AppError::Validation(_) | AppError::InvalidRange(_) => StatusCode::UNPROCESSABLE_ENTITY,
            AppError::NotFound(_) => StatusCode::NOT_FOUND,
            AppError::NameConflict(_) | AppError::Conflict(_) | AppError::AlreadyRevoked(_) => {
                StatusCode::CONFLICT
            }
            AppError::RateLimited(_) => StatusCode::TOO_MANY_REQUESTS,
            AppError::StoreUnavailable(_) => StatusCode::SERVICE_UNAVAILABLE,
            _ => StatusCode::INTERNAL_SERVER_ERROR,
        };

        let payload = Json(ErrorResponse {
            message: self.0.to_string(),
        });

        (status, payload).into_response()
    }
}

/// Standard API result type.
pub type ApiResult<T> = Result<T, ApiError>;
