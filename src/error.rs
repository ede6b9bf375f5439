// src/error.rs

use axum::{
    Json,
    http::StatusCode,
    response::{IntoResponse, Response},
};
use serde_json::json;
use std::fmt;

/// Global Application Error Enum.
/// Centralizes error handling and mapping to HTTP responses.
#[derive(Debug)]
pub enum AppError {
    // 500 Internal Server Error
    InternalServerError(String),

    // 400 Bad Request (missing/malformed input)
    Validation(String),

    // 401 Unauthorized (missing/invalid bearer token)
    Unauthorized(String),

    // 401, single message for unknown email and wrong password alike
    InvalidCredentials,

    // 404 Not Found
    NotFound(String),

    // 404, recovery flows require a real account
    UserNotFound,

    // 409 Conflict
    AlreadyRegistered,

    // 400, OTP lifecycle failures
    OtpExpired,
    OtpMismatch,
    OtpNotVerified,

    // 502, the notification collaborator could not deliver
    NotificationFailed,

    // 502, question generation or scoring collaborator failure
    Oracle(String),
}

impl fmt::Display for AppError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:?}", self)
    }
}

impl std::error::Error for AppError {}

/// Implements `IntoResponse` for `AppError`.
/// Converts the error into a JSON response with appropriate HTTP status code.
impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let (status, error_message) = match self {
            AppError::InternalServerError(msg) => {
                tracing::error!("Internal Server Error: {}", msg);
                (
                    StatusCode::INTERNAL_SERVER_ERROR,
                    "Internal Server Error".to_string(),
                )
            }
            AppError::Validation(msg) => (StatusCode::BAD_REQUEST, msg),
            AppError::Unauthorized(msg) => (StatusCode::UNAUTHORIZED, msg),
            AppError::InvalidCredentials => (
                StatusCode::UNAUTHORIZED,
                "Invalid email or password".to_string(),
            ),
            AppError::NotFound(msg) => (StatusCode::NOT_FOUND, msg),
            AppError::UserNotFound => (StatusCode::NOT_FOUND, "No user found".to_string()),
            AppError::AlreadyRegistered => (
                StatusCode::CONFLICT,
                "Email already registered".to_string(),
            ),
            AppError::OtpExpired => (StatusCode::BAD_REQUEST, "OTP expired".to_string()),
            AppError::OtpMismatch => (StatusCode::BAD_REQUEST, "Invalid OTP".to_string()),
            AppError::OtpNotVerified => (
                StatusCode::BAD_REQUEST,
                "Please verify OTP first".to_string(),
            ),
            AppError::NotificationFailed => {
                tracing::error!("Notification dispatch failed");
                (StatusCode::BAD_GATEWAY, "Failed to send email".to_string())
            }
            AppError::Oracle(msg) => {
                tracing::error!("Oracle failure: {}", msg);
                (StatusCode::BAD_GATEWAY, "AI generation failed".to_string())
            }
        };
        let body = Json(json!({
            "error": error_message,
        }));

        (status, body).into_response()
    }
}

/// Converts `sqlx::Error` into `AppError::InternalServerError`.
/// Allows using `?` operator on database queries.
impl From<sqlx::Error> for AppError {
    fn from(err: sqlx::Error) -> Self {
        AppError::InternalServerError(err.to_string())
    }
}

impl From<serde_json::Error> for AppError {
    fn from(err: serde_json::Error) -> Self {
        AppError::Validation(err.to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::response::IntoResponse;

    #[test]
    fn credentials_errors_share_one_message() {
        // Unknown email and wrong password must be indistinguishable.
        let resp = AppError::InvalidCredentials.into_response();
        assert_eq!(resp.status(), StatusCode::UNAUTHORIZED);
    }

    #[test]
    fn otp_failures_are_bad_requests() {
        for err in [
            AppError::OtpExpired,
            AppError::OtpMismatch,
            AppError::OtpNotVerified,
        ] {
            assert_eq!(err.into_response().status(), StatusCode::BAD_REQUEST);
        }
    }

    #[test]
    fn collaborator_failures_map_to_bad_gateway() {
        assert_eq!(
            AppError::NotificationFailed.into_response().status(),
            StatusCode::BAD_GATEWAY
        );
        assert_eq!(
            AppError::Oracle("timeout".into()).into_response().status(),
            StatusCode::BAD_GATEWAY
        );
    }
}
