// src/handlers/quiz.rs

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
    models::attempt::AttemptRow,
    session::{AnswerInput, Batch, SessionEngine, SessionManager},
    state::AppState,
    utils::jwt::Claims,
};

#[derive(Debug, Deserialize, Validate)]
pub struct StartSessionRequest {
    #[validate(length(min = 1, max = 100, message = "Subject required"))]
    pub subject: String,
}

#[derive(Debug, Deserialize)]
pub struct QuizAnswerRequest {
    /// Index into the current question's options.
    pub option: usize,
}

/// Starts a timed quiz session: fetches a fresh batch from the question
/// oracle and arms the first deadline. An oracle failure aborts the start and
/// leaves the user back at subject selection.
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
        .quiz_batch(&payload.subject, QUESTION_COUNT)
        .await?;
    let engine = SessionEngine::new(payload.subject, Batch::Quiz(batch))?;

    let view = state.sessions.start(user_id, engine).await;
    Ok(Json(view))
}

/// Records the chosen option for the current question. Out-of-range indices
/// count as "no answer" rather than failing the submission.
pub async fn submit_answer(
    State(sessions): State<SessionManager>,
    Extension(claims): Extension<Claims>,
    Json(payload): Json<QuizAnswerRequest>,
) -> Result<impl IntoResponse, AppError> {
    let user_id = claims.user_id()?;
    let outcome = sessions
        .answer(user_id, AnswerInput::Choice(payload.option))
        .await?;

    Ok(Json(outcome))
}

/// Current question and progress for the live session.
pub async fn current_session(
    State(sessions): State<SessionManager>,
    Extension(claims): Extension<Claims>,
) -> Result<impl IntoResponse, AppError> {
    let user_id = claims.user_id()?;
    let view = sessions.view(user_id).await?;

    Ok(Json(view))
}

/// Abandons the live session. Nothing is persisted.
pub async fn exit_session(
    State(sessions): State<SessionManager>,
    Extension(claims): Extension<Claims>,
) -> Result<impl IntoResponse, AppError> {
    let user_id = claims.user_id()?;
    sessions.exit(user_id).await?;

    Ok(Json(json!({ "message": "Session discarded" })))
}

/// Lists the caller's finished quiz attempts, newest first.
pub async fn list_my_attempts(
    State(pool): State<PgPool>,
    Extension(claims): Extension<Claims>,
) -> Result<impl IntoResponse, AppError> {
    let user_id = claims.user_id()?;

    let attempts = sqlx::query_as::<_, AttemptRow>(
        r#"
        SELECT id, user_id, subject, questions, scores, total_score, percentage, created_at
        FROM quiz_attempts
        WHERE user_id = $1
        ORDER BY created_at DESC
        "#,
    )
    .bind(user_id)
    .fetch_all(&pool)
    .await
    .map_err(|e| {
        tracing::error!("Failed to list quiz attempts: {:?}", e);
        AppError::InternalServerError(e.to_string())
    })?;

    Ok(Json(attempts))
}

/// Fetches one of the caller's quiz attempts, sheet included.
pub async fn get_attempt(
    State(pool): State<PgPool>,
    Extension(claims): Extension<Claims>,
    Path(id): Path<i64>,
) -> Result<impl IntoResponse, AppError> {
    let user_id = claims.user_id()?;

    let attempt = sqlx::query_as::<_, AttemptRow>(
        r#"
        SELECT id, user_id, subject, questions, scores, total_score, percentage, created_at
        FROM quiz_attempts
        WHERE id = $1 AND user_id = $2
        "#,
    )
    .bind(id)
    .bind(user_id)
    .fetch_optional(&pool)
    .await?
    .ok_or(AppError::NotFound("Quiz attempt not found".to_string()))?;

    Ok(Json(attempt))
}
