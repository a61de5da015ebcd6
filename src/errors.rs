use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Json;

use crate::services::booking::BookingError;

#[derive(Debug, thiserror::Error)]
pub enum AppError {
    /// Storage failed. `message` is what the caller sees; `detail` is only
    /// logged.
    #[error("{message}")]
    Storage { message: String, detail: String },

    #[error(transparent)]
    Booking(BookingError),

    #[error("{0}")]
    BadRequest(String),

    #[error("{0}")]
    NotFound(String),
}

impl AppError {
    pub fn storage(detail: impl std::fmt::Display) -> Self {
        AppError::Storage {
            message: "Storage error".to_string(),
            detail: detail.to_string(),
        }
    }

    /// Replaces the caller-facing message of a storage failure.
    pub fn with_message(self, message: &str) -> Self {
        match self {
            AppError::Storage { detail, .. } => AppError::Storage {
                message: message.to_string(),
                detail,
            },
            other => other,
        }
    }
}

impl From<rusqlite::Error> for AppError {
    fn from(e: rusqlite::Error) -> Self {
        AppError::storage(e)
    }
}

impl From<r2d2::Error> for AppError {
    fn from(e: r2d2::Error) -> Self {
        AppError::storage(format!("connection pool: {e}"))
    }
}

impl From<tokio::task::JoinError> for AppError {
    fn from(e: tokio::task::JoinError) -> Self {
        AppError::storage(format!("blocking task: {e}"))
    }
}

impl From<anyhow::Error> for AppError {
    fn from(e: anyhow::Error) -> Self {
        AppError::storage(format!("{e:#}"))
    }
}

impl From<BookingError> for AppError {
    fn from(e: BookingError) -> Self {
        match e {
            BookingError::Storage(inner) => AppError::storage(inner),
            other => AppError::Booking(other),
        }
    }
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let (status, body) = match &self {
            AppError::Storage { message, detail } => {
                tracing::error!(error = %detail, "{message}");
                (
                    StatusCode::INTERNAL_SERVER_ERROR,
                    serde_json::json!({
                        "success": false,
                        "message": message,
                        "error": "storage_error",
                    }),
                )
            }
            AppError::Booking(e) => (
                StatusCode::BAD_REQUEST,
                serde_json::json!({
                    "success": false,
                    "message": e.to_string(),
                    "code": e.code(),
                }),
            ),
            AppError::BadRequest(message) => (
                StatusCode::BAD_REQUEST,
                serde_json::json!({ "success": false, "message": message }),
            ),
            AppError::NotFound(message) => (
                StatusCode::NOT_FOUND,
                serde_json::json!({ "success": false, "message": message }),
            ),
        };

        (status, Json(body)).into_response()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_booking_storage_error_becomes_internal() {
        let err = AppError::from(BookingError::Storage(rusqlite::Error::QueryReturnedNoRows));
        assert!(matches!(err, AppError::Storage { .. }));
        assert_eq!(
            err.into_response().status(),
            StatusCode::INTERNAL_SERVER_ERROR
        );
    }

    #[test]
    fn test_booking_validation_error_is_bad_request() {
        let err = AppError::from(BookingError::ServiceNotFound(999));
        assert_eq!(err.to_string(), "Service with ID 999 not found");
        assert_eq!(err.into_response().status(), StatusCode::BAD_REQUEST);
    }

    #[test]
    fn test_with_message_keeps_detail_private() {
        let err = AppError::storage("disk I/O error").with_message("Failed to fetch services");
        match err {
            AppError::Storage { message, detail } => {
                assert_eq!(message, "Failed to fetch services");
                assert_eq!(detail, "disk I/O error");
            }
            other => panic!("unexpected error: {other:?}"),
        }
    }
}
