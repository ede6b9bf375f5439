// src/models/otp.rs

use chrono::{DateTime, Utc};
use serde::Deserialize;
use sqlx::FromRow;
use validator::Validate;

/// One row of the OTP ledger. Email is the primary key, so at most one
/// unconsumed record exists per address.
#[derive(Debug, Clone, FromRow)]
pub struct OtpRecord {
    pub email: String,
    pub code: String,
    pub expires_at: DateTime<Utc>,
    pub verified: bool,
}

impl OtpRecord {
    pub fn is_expired(&self, now: DateTime<Utc>) -> bool {
        now > self.expires_at
    }
}

#[derive(Debug, Deserialize, Validate)]
pub struct SendOtpRequest {
    #[validate(email(message = "A valid email is required."))]
    pub email: String,
}

#[derive(Debug, Deserialize, Validate)]
pub struct VerifyOtpRequest {
    #[validate(email)]
    pub email: String,
    #[validate(length(equal = 6, message = "OTP must be 6 digits."))]
    pub otp: String,
}

#[derive(Debug, Deserialize, Validate)]
pub struct ResetPasswordRequest {
    #[validate(email)]
    pub email: String,
    /// Correlation check against the verified record, not a second verify.
    #[validate(length(equal = 6))]
    pub otp: String,
    #[validate(length(min = 6, max = 128))]
    pub new_password: String,
}
