// src/handlers/auth.rs

use axum::{Extension, Json, extract::State, http::StatusCode, response::IntoResponse};
use sqlx::PgPool;
use url::Url;
use validator::Validate;

use crate::{
    config::Config,
    error::AppError,
    models::user::{AuthResponse, LoginRequest, RegisterRequest, UpdateProfileRequest, User, UserProfile},
    otp::OtpLedger,
    utils::{
        hash::{hash_password, verify_password},
        jwt::{Claims, sign_jwt},
    },
};

const USER_COLUMNS: &str = "id, name, email, password, avatar_url, created_at";

/// Completes registration for an OTP-verified email.
///
/// This is the sole consumption point of the registration flow: the user row
/// is created, the OTP record deleted, and a session token issued in one go.
pub async fn register(
    State(pool): State<PgPool>,
    State(ledger): State<OtpLedger>,
    State(config): State<Config>,
    Json(payload): Json<RegisterRequest>,
) -> Result<impl IntoResponse, AppError> {
    if let Err(validation_errors) = payload.validate() {
        return Err(AppError::Validation(validation_errors.to_string()));
    }

    let email = payload.email.trim().to_lowercase();

    ledger.require_verified(&email).await?;

    let hashed_password = hash_password(&payload.password)?;

    let user = sqlx::query_as::<_, User>(&format!(
        "INSERT INTO users (name, email, password) VALUES ($1, $2, $3) RETURNING {USER_COLUMNS}"
    ))
    .bind(payload.name.trim())
    .bind(&email)
    .bind(&hashed_password)
    .fetch_one(&pool)
    .await
    .map_err(|e| {
        // Postgres error code for unique violation is 23505
        if e.to_string().contains("unique constraint") || e.to_string().contains("23505") {
            AppError::AlreadyRegistered
        } else {
            tracing::error!("Failed to register user: {:?}", e);
            AppError::from(e)
        }
    })?;

    ledger.delete(&email).await?;

    let token = sign_jwt(user.id, &config.jwt_secret, config.jwt_expiration)?;
    tracing::info!("New user registered: {}", email);

    Ok((
        StatusCode::CREATED,
        Json(AuthResponse {
            user: user.into(),
            token,
        }),
    ))
}

/// Authenticates a user and returns a JWT token.
///
/// Unknown email and wrong password produce the same error, so the endpoint
/// cannot be used to enumerate accounts.
pub async fn login(
    State(pool): State<PgPool>,
    State(config): State<Config>,
    Json(payload): Json<LoginRequest>,
) -> Result<impl IntoResponse, AppError> {
    if let Err(validation_errors) = payload.validate() {
        return Err(AppError::Validation(validation_errors.to_string()));
    }

    let email = payload.email.trim().to_lowercase();

    let user = sqlx::query_as::<_, User>(&format!(
        "SELECT {USER_COLUMNS} FROM users WHERE email = $1"
    ))
    .bind(&email)
    .fetch_optional(&pool)
    .await
    .map_err(|e| {
        tracing::error!("Login DB error: {:?}", e);
        AppError::InternalServerError(e.to_string())
    })?;

    let user = user.ok_or(AppError::InvalidCredentials)?;

    let is_valid = verify_password(&payload.password, &user.password)?;
    if !is_valid {
        return Err(AppError::InvalidCredentials);
    }

    let token = sign_jwt(user.id, &config.jwt_secret, config.jwt_expiration)?;

    Ok(Json(AuthResponse {
        user: user.into(),
        token,
    }))
}

/// Returns the authenticated user's profile.
pub async fn me(
    State(pool): State<PgPool>,
    Extension(claims): Extension<Claims>,
) -> Result<impl IntoResponse, AppError> {
    let user_id = claims.user_id()?;

    let user = sqlx::query_as::<_, User>(&format!(
        "SELECT {USER_COLUMNS} FROM users WHERE id = $1"
    ))
    .bind(user_id)
    .fetch_optional(&pool)
    .await?
    .ok_or(AppError::NotFound("User not found".to_string()))?;

    Ok(Json(UserProfile::from(user)))
}

/// Updates name and/or avatar reference. Absent fields are left untouched;
/// the avatar reference must at least parse as a URL.
pub async fn update_profile(
    State(pool): State<PgPool>,
    Extension(claims): Extension<Claims>,
    Json(payload): Json<UpdateProfileRequest>,
) -> Result<impl IntoResponse, AppError> {
    if let Err(validation_errors) = payload.validate() {
        return Err(AppError::Validation(validation_errors.to_string()));
    }

    if let Some(avatar) = &payload.avatar_url {
        Url::parse(avatar)
            .map_err(|_| AppError::Validation("avatar_url must be a valid URL".to_string()))?;
    }

    let user_id = claims.user_id()?;

    let user = sqlx::query_as::<_, User>(&format!(
        r#"
        UPDATE users
        SET name = COALESCE($2, name), avatar_url = COALESCE($3, avatar_url)
        WHERE id = $1
        RETURNING {USER_COLUMNS}
        "#
    ))
    .bind(user_id)
    .bind(payload.name.as_deref().map(str::trim))
    .bind(payload.avatar_url.as_deref())
    .fetch_optional(&pool)
    .await?
    .ok_or(AppError::NotFound("User not found".to_string()))?;

    Ok(Json(UserProfile::from(user)))
}
