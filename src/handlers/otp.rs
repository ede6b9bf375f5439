// src/handlers/otp.rs
//
// Registration and password-recovery OTP flows. Per email the ledger moves
// through PENDING -> VERIFIED -> consumed (deleted); both flows share the
// verify mechanics and differ only in their existence precondition.

use std::sync::Arc;

use axum::{Json, extract::State, response::IntoResponse};
use serde_json::json;
use sqlx::PgPool;
use validator::Validate;

use crate::{
    error::AppError,
    mail::{Mailer, templates},
    models::otp::{ResetPasswordRequest, SendOtpRequest, VerifyOtpRequest},
    otp::OtpLedger,
    utils::hash::hash_password,
};

/// Sends a registration OTP.
///
/// Refused outright for already-registered emails; recovery is the flow for
/// those. A dispatch failure rolls the fresh record back so the ledger never
/// implies a code the user received.
pub async fn send_otp(
    State(pool): State<PgPool>,
    State(ledger): State<OtpLedger>,
    State(mailer): State<Arc<dyn Mailer>>,
    Json(payload): Json<SendOtpRequest>,
) -> Result<impl IntoResponse, AppError> {
    if let Err(validation_errors) = payload.validate() {
        return Err(AppError::Validation(validation_errors.to_string()));
    }

    let email = payload.email.trim().to_lowercase();

    let exists = sqlx::query("SELECT id FROM users WHERE email = $1")
        .bind(&email)
        .fetch_optional(&pool)
        .await?;
    if exists.is_some() {
        return Err(AppError::AlreadyRegistered);
    }

    let code = ledger.issue(&email).await?;

    if let Err(e) = mailer
        .send(
            &email,
            &format!("Your SmartLearn Verification Code: {code}"),
            &templates::registration_otp(&code),
        )
        .await
    {
        ledger.delete(&email).await?;
        return Err(e);
    }

    Ok(Json(json!({ "message": "OTP sent", "email": email })))
}

/// Verifies a registration OTP. Succeeding twice with the same still-valid
/// code is idempotent; the record survives until registration consumes it.
pub async fn verify_otp(
    State(ledger): State<OtpLedger>,
    Json(payload): Json<VerifyOtpRequest>,
) -> Result<impl IntoResponse, AppError> {
    if let Err(validation_errors) = payload.validate() {
        return Err(AppError::Validation(validation_errors.to_string()));
    }

    let email = payload.email.trim().to_lowercase();
    ledger.verify(&email, &payload.otp).await?;

    Ok(Json(json!({ "message": "OTP verified", "email": email })))
}

/// Issues a fresh code for an email that already requested one. Never
/// creates a record, and always invalidates any prior verification.
pub async fn resend_otp(
    State(ledger): State<OtpLedger>,
    State(mailer): State<Arc<dyn Mailer>>,
    Json(payload): Json<SendOtpRequest>,
) -> Result<impl IntoResponse, AppError> {
    if let Err(validation_errors) = payload.validate() {
        return Err(AppError::Validation(validation_errors.to_string()));
    }

    let email = payload.email.trim().to_lowercase();
    let code = ledger.reissue(&email).await?;

    // No rollback here: the old code is already invalidated, and keeping the
    // row lets the user simply hit resend again.
    mailer
        .send(
            &email,
            &format!("SmartLearn New OTP Code: {code}"),
            &templates::resend_otp(&code),
        )
        .await?;

    Ok(Json(json!({ "message": "OTP resent" })))
}

/// Starts password recovery. Requires a real account, the mirror image of
/// registration's existence check.
pub async fn forgot_password_send_otp(
    State(pool): State<PgPool>,
    State(ledger): State<OtpLedger>,
    State(mailer): State<Arc<dyn Mailer>>,
    Json(payload): Json<SendOtpRequest>,
) -> Result<impl IntoResponse, AppError> {
    if let Err(validation_errors) = payload.validate() {
        return Err(AppError::Validation(validation_errors.to_string()));
    }

    let email = payload.email.trim().to_lowercase();

    let user = sqlx::query("SELECT id FROM users WHERE email = $1")
        .bind(&email)
        .fetch_optional(&pool)
        .await?;
    if user.is_none() {
        return Err(AppError::UserNotFound);
    }

    let code = ledger.issue(&email).await?;

    if let Err(e) = mailer
        .send(
            &email,
            &format!("SmartLearn Password Reset OTP: {code}"),
            &templates::reset_password_otp(&code),
        )
        .await
    {
        ledger.delete(&email).await?;
        return Err(e);
    }

    Ok(Json(json!({ "message": "Reset OTP sent" })))
}

/// Verifies a recovery OTP. Identical contract to registration verification.
pub async fn forgot_password_verify_otp(
    State(ledger): State<OtpLedger>,
    Json(payload): Json<VerifyOtpRequest>,
) -> Result<impl IntoResponse, AppError> {
    if let Err(validation_errors) = payload.validate() {
        return Err(AppError::Validation(validation_errors.to_string()));
    }

    let email = payload.email.trim().to_lowercase();
    ledger.verify(&email, &payload.otp).await?;

    Ok(Json(json!({ "message": "OTP verified" })))
}

/// Consumes a verified recovery OTP and updates the password.
///
/// The caller re-supplies the code as a correlation check so a verified but
/// stale record can't be ridden by an unrelated reset attempt. Does not log
/// the user in.
pub async fn reset_password(
    State(pool): State<PgPool>,
    State(ledger): State<OtpLedger>,
    State(mailer): State<Arc<dyn Mailer>>,
    Json(payload): Json<ResetPasswordRequest>,
) -> Result<impl IntoResponse, AppError> {
    if let Err(validation_errors) = payload.validate() {
        return Err(AppError::Validation(validation_errors.to_string()));
    }

    let email = payload.email.trim().to_lowercase();

    let record = ledger.require_verified(&email).await?;
    if record.code != payload.otp {
        return Err(AppError::OtpMismatch);
    }

    let hashed = hash_password(&payload.new_password)?;

    let result = sqlx::query("UPDATE users SET password = $2 WHERE email = $1")
        .bind(&email)
        .bind(&hashed)
        .execute(&pool)
        .await?;
    if result.rows_affected() == 0 {
        return Err(AppError::UserNotFound);
    }

    ledger.delete(&email).await?;

    // The reset itself is done; a failed confirmation email is not worth
    // failing the operation over.
    if let Err(e) = mailer
        .send(
            &email,
            "SmartLearn Password Changed",
            &templates::password_reset_success(),
        )
        .await
    {
        tracing::warn!("Password reset confirmation email failed: {}", e);
    }

    Ok(Json(json!({ "message": "Password reset successful" })))
}
