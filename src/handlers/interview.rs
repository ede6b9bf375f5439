// src/handlers/interview.rs
//
// Mirrors the quiz session surface with free-text answers, an explicit skip,
// and oracle-side grading at finalization.

use axum::{
    Extension, Json,
    extract::{Path, State},
    response::IntoResponse,
};
use serde::Deserialize;
use serde_json::json;
use sqlx::PgPool;
use validator::Validate;

use crate::{
    config::QUESTION_COUNT,
    error::AppError,
    handlers::quiz::StartSessionRequest,
    models::attempt::AttemptRow,
    session::{AnswerInput, Batch, SessionEngine, SessionManager},
    state::AppState,
    utils::jwt::Claims,
};

#[derive(Debug, Deserialize)]
pub struct InterviewAnswerRequest {
    pub answer: String,
}

/// Starts a timed interview session for a subject.
pub async fn start_session(
    State(state): State<AppState>,
    Extension(claims): Extension<Claims>,
    Json(payload): Json<StartSessionRequest>,
) -> Result<impl IntoResponse, AppError> {
    if let Err(validation_errors) = payload.validate() {
        return Err(AppError::Validation(validation_errors.to_string()));
    }

    let user_id = claims.user_id()?;

    let batch = state
        .oracle
        .interview_batch(&payload.subject, QUESTION_COUNT)
        .await?;
    let engine = SessionEngine::new(payload.subject, Batch::Interview(batch))?;

    let view = state.sessions.start(user_id, engine).await;
    Ok(Json(view))
}

/// Records a written answer. Blank text is stored as "no answer"; grading is
/// deferred entirely to the scoring oracle at finalization.
pub async fn submit_answer(
    State(sessions): State<SessionManager>,
    Extension(claims): Extension<Claims>,
    Json(payload): Json<InterviewAnswerRequest>,
) -> Result<impl IntoResponse, AppError> {
    let user_id = claims.user_id()?;
    let outcome = sessions
        .answer(user_id, AnswerInput::Text(payload.answer))
        .await?;

    Ok(Json(outcome))
}

/// User-initiated skip: recorded with its own sentinel so scoring gives it an
/// explicit zero instead of grading it.
pub async fn skip_question(
    State(sessions): State<SessionManager>,
    Extension(claims): Extension<Claims>,
) -> Result<impl IntoResponse, AppError> {
    let user_id = claims.user_id()?;
    let outcome = sessions.answer(user_id, AnswerInput::Skipped).await?;

    Ok(Json(outcome))
}

pub async fn current_session(
    State(sessions): State<SessionManager>,
    Extension(claims): Extension<Claims>,
) -> Result<impl IntoResponse, AppError> {
    let user_id = claims.user_id()?;
    let view = sessions.view(user_id).await?;

    Ok(Json(view))
}

pub async fn exit_session(
    State(sessions): State<SessionManager>,
    Extension(claims): Extension<Claims>,
) -> Result<impl IntoResponse, AppError> {
    let user_id = claims.user_id()?;
    sessions.exit(user_id).await?;

    Ok(Json(json!({ "message": "Session discarded" })))
}

/// Lists the caller's finished interview attempts, newest first.
pub async fn list_my_attempts(
    State(pool): State<PgPool>,
    Extension(claims): Extension<Claims>,
) -> Result<impl IntoResponse, AppError> {
    let user_id = claims.user_id()?;

    let attempts = sqlx::query_as::<_, AttemptRow>(
        r#"
        SELECT id, user_id, subject, questions, scores, total_score, percentage, created_at
        FROM interview_attempts
        WHERE user_id = $1
        ORDER BY created_at DESC
        "#,
    )
    .bind(user_id)
    .fetch_all(&pool)
    .await
    .map_err(|e| {
        tracing::error!("Failed to list interview attempts: {:?}", e);
        AppError::InternalServerError(e.to_string())
    })?;

    Ok(Json(attempts))
}

/// Fetches one of the caller's interview attempts.
pub async fn get_attempt(
    State(pool): State<PgPool>,
    Extension(claims): Extension<Claims>,
    Path(id): Path<i64>,
) -> Result<impl IntoResponse, AppError> {
    let user_id = claims.user_id()?;

    let attempt = sqlx::query_as::<_, AttemptRow>(
        r#"
        SELECT id, user_id, subject, questions, scores, total_score, percentage, created_at
        FROM interview_attempts
        WHERE id = $1 AND user_id = $2
        "#,
    )
    .bind(id)
    .bind(user_id)
    .fetch_optional(&pool)
    .await?
    .ok_or(AppError::NotFound("Interview attempt not found".to_string()))?;

    Ok(Json(attempt))
}
