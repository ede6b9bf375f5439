// src/oracle/mod.rs

use async_trait::async_trait;

use crate::{
    error::AppError,
    models::{
        attempt::InterviewAnswer,
        question::{InterviewQuestion, QuizQuestion},
    },
};

mod gemini;

pub use gemini::GeminiClient;

/// External question-generation capability. Implementations must return a
/// well-formed, non-empty batch or fail with `AppError::Oracle`.
#[async_trait]
pub trait QuestionOracle: Send + Sync {
    async fn quiz_batch(&self, subject: &str, count: usize) -> Result<Vec<QuizQuestion>, AppError>;

    async fn interview_batch(
        &self,
        subject: &str,
        count: usize,
    ) -> Result<Vec<InterviewQuestion>, AppError>;
}

/// External answer-grading capability: one 0-10 score per submitted answer.
/// Callers degrade any failure to all-zero scores; an oracle outage must never
/// block a user from finishing a session.
#[async_trait]
pub trait ScoringOracle: Send + Sync {
    async fn score_answers(&self, items: &[InterviewAnswer]) -> Result<Vec<i32>, AppError>;
}
