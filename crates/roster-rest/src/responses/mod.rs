//! Response envelope for the user directory endpoints.
//!
//! Every body is an [`ApiResponse`]: `data` on success, `error` on failure.
//! [`AppError`] decides what a client may learn from a [`RosterError`]:
//! conflicts name the taken email, lookups name the missing id, and store
//! failures are logged here and reported without driver details.

use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use roster_core::{ErrorResponse, RosterError};
use serde::{Deserialize, Serialize};
use tracing::error;

/// Envelope wrapping every response body.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ApiResponse<T> {
    pub success: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub data: Option<T>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<ErrorResponse>,
}

impl<T> ApiResponse<T> {
    /// Wraps a payload.
    pub fn data(data: T) -> Self {
        Self {
            success: true,
            data: Some(data),
            error: None,
        }
    }
}

impl ApiResponse<()> {
    /// Wraps an error body.
    pub fn failure(error: ErrorResponse) -> Self {
        Self {
            success: false,
            data: None,
            error: Some(error),
        }
    }
}

/// `200 OK` with a payload, or an [`AppError`].
pub type ApiResult<T> = Result<Json<ApiResponse<T>>, AppError>;

/// `201 Created` with the stored resource.
#[derive(Debug)]
pub struct Created<T>(pub T);

impl<T: Serialize> IntoResponse for Created<T> {
    fn into_response(self) -> Response {
        (StatusCode::CREATED, Json(ApiResponse::data(self.0))).into_response()
    }
}

/// A failed request, rendered as an error envelope.
#[derive(Debug)]
pub struct AppError(RosterError);

impl AppError {
    /// Rejects a path id that is not an integer.
    pub fn invalid_user_id(raw: &str) -> Self {
        Self(RosterError::validation(format!("Invalid user ID: {}", raw)))
    }

    fn status(&self) -> StatusCode {
        StatusCode::from_u16(self.0.status_code()).unwrap_or(StatusCode::INTERNAL_SERVER_ERROR)
    }

    fn body(&self) -> ErrorResponse {
        let message = match &self.0 {
            RosterError::Conflict(detail) | RosterError::Validation(detail) => detail.clone(),
            RosterError::NotFound { resource_type, id } => {
                format!("{} {} not found", resource_type, id)
            }
            RosterError::Database(_) | RosterError::Configuration(_) | RosterError::Internal(_) => {
                "Internal server error".to_string()
            }
        };
        ErrorResponse::new(self.0.error_code(), message)
    }
}

impl From<RosterError> for AppError {
    fn from(err: RosterError) -> Self {
        Self(err)
    }
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let status = self.status();
        if status.is_server_error() {
            error!(error = %self.0, "Request failed");
        }

        (status, Json(ApiResponse::failure(self.body()))).into_response()
    }
}
