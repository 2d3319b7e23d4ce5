use actix_web::{HttpResponse, ResponseError, http::StatusCode};
use thiserror::Error;

use crate::model::{attendance::AttendanceError, geo::GeoError};

#[derive(Debug, Error)]
pub enum AppError {
    #[error("Bad request: {0}")]
    BadRequest(String),

    #[error("Validation error: {0}")]
    Validation(String),

    #[error("Unauthorized: {0}")]
    Unauthorized(String),

    #[error("Invalid token")]
    InvalidToken,

    #[error("Session revoked")]
    SessionRevoked,

    #[error("Forbidden: {0}")]
    Forbidden(String),

    #[error("Not found: {0}")]
    NotFound(String),

    #[error("Gone: {0}")]
    Gone(String),

    #[error("Internal server error")]
    Internal(#[source] anyhow::Error),
}

impl AppError {
    pub fn error_code(&self) -> &'static str {
        match self {
            AppError::BadRequest(_) => "BAD_REQUEST",
            AppError::Validation(_) => "VALIDATION_ERROR",
            AppError::Unauthorized(_) => "UNAUTHORIZED",
            AppError::InvalidToken => "INVALID_TOKEN",
            AppError::SessionRevoked => "SESSION_REVOKED",
            AppError::Forbidden(_) => "FORBIDDEN",
            AppError::NotFound(_) => "NOT_FOUND",
            AppError::Gone(_) => "GONE",
            AppError::Internal(_) => "INTERNAL_ERROR",
        }
    }

    fn error_label(&self) -> &'static str {
        match self {
            AppError::BadRequest(_) => "Bad request",
            AppError::Validation(_) => "Validation error",
            AppError::Unauthorized(_) | AppError::InvalidToken | AppError::SessionRevoked => {
                "Unauthorized"
            }
            AppError::Forbidden(_) => "Forbidden",
            AppError::NotFound(_) => "Not found",
            AppError::Gone(_) => "Gone",
            AppError::Internal(_) => "Internal server error",
        }
    }

    /// Message safe to show to clients; internal causes are only logged.
    fn public_message(&self) -> String {
        match self {
            AppError::BadRequest(m)
            | AppError::Validation(m)
            | AppError::Unauthorized(m)
            | AppError::Forbidden(m)
            | AppError::NotFound(m)
            | AppError::Gone(m) => m.clone(),
            AppError::InvalidToken => "Invalid or expired token".to_string(),
            AppError::SessionRevoked => "Session has been signed out".to_string(),
            AppError::Internal(_) => "Something went wrong, contact the system admin".to_string(),
        }
    }
}

impl ResponseError for AppError {
    fn status_code(&self) -> StatusCode {
        match self {
            AppError::BadRequest(_) | AppError::Validation(_) => StatusCode::BAD_REQUEST,
            AppError::Unauthorized(_) | AppError::InvalidToken | AppError::SessionRevoked => {
                StatusCode::UNAUTHORIZED
            }
            AppError::Forbidden(_) => StatusCode::FORBIDDEN,
            AppError::NotFound(_) => StatusCode::NOT_FOUND,
            AppError::Gone(_) => StatusCode::GONE,
            AppError::Internal(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    fn error_response(&self) -> HttpResponse {
        if let AppError::Internal(e) = self {
            tracing::error!(error = ?e, "Request failed");
        }

        HttpResponse::build(self.status_code()).json(serde_json::json!({
            "error": self.error_label(),
            "message": self.public_message(),
            "code": self.error_code(),
        }))
    }
}

impl From<GeoError> for AppError {
    fn from(e: GeoError) -> Self {
        AppError::Validation(e.to_string())
    }
}

impl From<AttendanceError> for AppError {
    fn from(e: AttendanceError) -> Self {
        AppError::Validation(e.to_string())
    }
}

impl From<anyhow::Error> for AppError {
    fn from(e: anyhow::Error) -> Self {
        AppError::Internal(e)
    }
}
