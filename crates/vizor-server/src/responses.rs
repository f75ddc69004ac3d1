//! API error responses.

use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde::Serialize;
use vizor_async_queries::AsyncQueryError;
use vizor_core::{ErrorResponse, VizorError};

/// Error body returned by every endpoint.
#[derive(Debug, Serialize)]
pub struct ErrorBody {
    pub error: ErrorResponse,
}

/// Application error type for Axum.
#[derive(Debug)]
pub struct AppError(pub VizorError);

impl From<VizorError> for AppError {
    fn from(err: VizorError) -> Self {
        Self(err)
    }
}

impl From<AsyncQueryError> for AppError {
    fn from(err: AsyncQueryError) -> Self {
        Self(err.into())
    }
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let status = StatusCode::from_u16(self.0.status_code())
            .unwrap_or(StatusCode::INTERNAL_SERVER_ERROR);

        let body = Json(ErrorBody {
            error: ErrorResponse::from_error(&self.0),
        });

        (status, body).into_response()
    }
}

/// Result type for Axum handlers.
pub type ApiResult<T> = Result<Json<T>, AppError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_token_missing_is_unauthorized() {
        let response = AppError::from(AsyncQueryError::TokenMissing).into_response();
        assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
    }

    #[test]
    fn test_backend_unavailable_status() {
        let response =
            AppError::from(VizorError::BackendUnavailable("redis down".into())).into_response();
        assert_eq!(response.status(), StatusCode::SERVICE_UNAVAILABLE);
    }
}
