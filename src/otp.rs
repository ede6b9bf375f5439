// src/otp.rs
//
// The OTP ledger: a keyed single-slot store over the `otps` table. Every write
// is one statement keyed by email, so Postgres serializes concurrent sends and
// an older code can never outlive a newer one.

use argon2::password_hash::rand_core::{OsRng, RngCore};
use chrono::{Duration, Utc};
use sqlx::PgPool;

use crate::{config::OTP_TTL_SECS, error::AppError, models::otp::OtpRecord};

/// Generates a 6-digit numeric code from the OS RNG.
pub fn generate_code() -> String {
    let n = 100_000 + (OsRng.next_u32() % 900_000);
    n.to_string()
}

#[derive(Clone)]
pub struct OtpLedger {
    pool: PgPool,
}

impl OtpLedger {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    /// Issues a fresh code for `email`, overwriting any prior pending record
    /// (last-code-wins). Returns the code for dispatch.
    pub async fn issue(&self, email: &str) -> Result<String, AppError> {
        let code = generate_code();
        let expires_at = Utc::now() + Duration::seconds(OTP_TTL_SECS);

        sqlx::query(
            r#"
            INSERT INTO otps (email, code, expires_at, verified, updated_at)
            VALUES ($1, $2, $3, FALSE, NOW())
            ON CONFLICT (email) DO UPDATE SET
                code = EXCLUDED.code,
                expires_at = EXCLUDED.expires_at,
                verified = FALSE,
                updated_at = NOW()
            "#,
        )
        .bind(email)
        .bind(&code)
        .bind(expires_at)
        .execute(&self.pool)
        .await?;

        Ok(code)
    }

    /// Replaces the code on an EXISTING record. Unlike `issue`, this never
    /// creates one: resend without a prior send is `NotFound`. Any earlier
    /// verification is invalidated.
    pub async fn reissue(&self, email: &str) -> Result<String, AppError> {
        let code = generate_code();
        let expires_at = Utc::now() + Duration::seconds(OTP_TTL_SECS);

        let result = sqlx::query(
            r#"
            UPDATE otps
            SET code = $2, expires_at = $3, verified = FALSE, updated_at = NOW()
            WHERE email = $1
            "#,
        )
        .bind(email)
        .bind(&code)
        .bind(expires_at)
        .execute(&self.pool)
        .await?;

        if result.rows_affected() == 0 {
            return Err(AppError::NotFound("OTP record not found".to_string()));
        }

        Ok(code)
    }

    pub async fn fetch(&self, email: &str) -> Result<Option<OtpRecord>, AppError> {
        let record = sqlx::query_as::<_, OtpRecord>(
            "SELECT email, code, expires_at, verified FROM otps WHERE email = $1",
        )
        .bind(email)
        .fetch_optional(&self.pool)
        .await?;

        Ok(record)
    }

    /// Matches `code` against the pending record and marks it verified.
    /// Exact string compare, no normalization. Repeating a successful verify
    /// with the same still-valid code is idempotent.
    pub async fn verify(&self, email: &str, code: &str) -> Result<(), AppError> {
        let record = self
            .fetch(email)
            .await?
            .ok_or_else(|| AppError::NotFound("OTP not found".to_string()))?;

        if record.is_expired(Utc::now()) {
            return Err(AppError::OtpExpired);
        }

        if record.code != code {
            return Err(AppError::OtpMismatch);
        }

        sqlx::query("UPDATE otps SET verified = TRUE, updated_at = NOW() WHERE email = $1")
            .bind(email)
            .execute(&self.pool)
            .await?;

        Ok(())
    }

    /// Returns the record if it exists and is verified, the precondition for
    /// both consumption points (registration, password reset).
    pub async fn require_verified(&self, email: &str) -> Result<OtpRecord, AppError> {
        match self.fetch(email).await? {
            Some(record) if record.verified => Ok(record),
            _ => Err(AppError::OtpNotVerified),
        }
    }

    /// Removes the record. Called at consumption, and to roll back a write
    /// whose notification never went out.
    pub async fn delete(&self, email: &str) -> Result<(), AppError> {
        sqlx::query("DELETE FROM otps WHERE email = $1")
            .bind(email)
            .execute(&self.pool)
            .await?;

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    #[test]
    fn generated_codes_are_six_digits() {
        for _ in 0..100 {
            let code = generate_code();
            assert_eq!(code.len(), 6);
            assert!(code.chars().all(|c| c.is_ascii_digit()));
            // never leads with zero, so parsing keeps all six digits
            assert!(code.parse::<u32>().unwrap() >= 100_000);
        }
    }

    #[test]
    fn expiry_is_strictly_after_deadline() {
        let record = OtpRecord {
            email: "a@x.com".to_string(),
            code: "123456".to_string(),
            expires_at: Utc.with_ymd_and_hms(2025, 6, 1, 12, 0, 0).unwrap(),
            verified: false,
        };
        let before = Utc.with_ymd_and_hms(2025, 6, 1, 11, 59, 59).unwrap();
        let at = record.expires_at;
        let after = Utc.with_ymd_and_hms(2025, 6, 1, 12, 0, 1).unwrap();

        assert!(!record.is_expired(before));
        assert!(!record.is_expired(at));
        assert!(record.is_expired(after));
    }
}
