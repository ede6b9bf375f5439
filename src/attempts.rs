// src/attempts.rs

use async_trait::async_trait;
use sqlx::PgPool;

use crate::{
    error::AppError,
    models::attempt::{AnswerSheet, FinalizedAttempt},
};

/// Persistence seam the session manager hands finished sessions to. Retrieval
/// queries live with the handlers; only the write crosses this boundary.
#[async_trait]
pub trait AttemptStore: Send + Sync {
    /// Persists the snapshot, returning the new row id.
    async fn save(&self, attempt: &FinalizedAttempt) -> Result<i64, AppError>;
}

#[derive(Clone)]
pub struct PgAttemptStore {
    pool: PgPool,
}

impl PgAttemptStore {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl AttemptStore for PgAttemptStore {
    async fn save(&self, attempt: &FinalizedAttempt) -> Result<i64, AppError> {
        let table = match attempt.answers {
            AnswerSheet::Quiz(_) => "quiz_attempts",
            AnswerSheet::Interview(_) => "interview_attempts",
        };

        let questions = serde_json::to_value(&attempt.answers)?;
        let scores = serde_json::to_value(&attempt.scores)?;

        let (id,): (i64,) = sqlx::query_as(&format!(
            r#"
            INSERT INTO {table} (user_id, subject, questions, scores, total_score, percentage)
            VALUES ($1, $2, $3, $4, $5, $6)
            RETURNING id
            "#,
        ))
        .bind(attempt.user_id)
        .bind(&attempt.subject)
        .bind(questions)
        .bind(scores)
        .bind(attempt.total_score)
        .bind(attempt.percentage)
        .fetch_one(&self.pool)
        .await
        .map_err(|e| {
            tracing::error!("Failed to save attempt: {:?}", e);
            AppError::from(e)
        })?;

        Ok(id)
    }
}
