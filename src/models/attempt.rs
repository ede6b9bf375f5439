// src/models/attempt.rs

use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use sqlx::types::Json;

/// One answered quiz question: what was asked, what was right, what the user
/// picked (or the "(No Answer)" sentinel).
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct QuizAnswer {
    pub question: String,
    pub correct_answer: String,
    pub selected_answer: String,
    pub options: Vec<String>,
}

/// One answered interview question. Correctness is decided by the scoring
/// oracle, never locally.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct InterviewAnswer {
    pub question: String,
    pub user_answer: String,
}

/// Full answer sheet of a session. Serializes as a plain JSON array in the
/// attempt tables.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(untagged)]
pub enum AnswerSheet {
    Quiz(Vec<QuizAnswer>),
    Interview(Vec<InterviewAnswer>),
}

impl AnswerSheet {
    pub fn len(&self) -> usize {
        match self {
            AnswerSheet::Quiz(v) => v.len(),
            AnswerSheet::Interview(v) => v.len(),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

/// The immutable snapshot a completed session hands to the attempt store.
#[derive(Debug, Clone, Serialize)]
pub struct FinalizedAttempt {
    pub user_id: i64,
    pub subject: String,
    pub answers: AnswerSheet,
    /// Quiz: one 0/1 per question. Interview: one 0-10 per question.
    pub scores: Vec<i32>,
    pub total_score: i32,
    pub percentage: i32,
}

/// A persisted attempt row, answer sheet included.
#[derive(Debug, FromRow, Serialize)]
pub struct AttemptRow {
    pub id: i64,
    pub user_id: i64,
    pub subject: String,
    pub questions: Json<serde_json::Value>,
    pub scores: Json<Vec<i32>>,
    pub total_score: i32,
    pub percentage: i32,
    pub created_at: Option<chrono::DateTime<chrono::Utc>>,
}

/// Lightweight row for listings and the dashboard.
#[derive(Debug, FromRow, Serialize)]
pub struct AttemptSummary {
    pub id: i64,
    pub subject: String,
    pub total_score: i32,
    pub percentage: i32,
    pub created_at: Option<chrono::DateTime<chrono::Utc>>,
}

/// Dashboard grouping: one subject, attempts newest-first, best percentage
/// across them surfaced as the subject's best score.
#[derive(Debug, Serialize)]
pub struct SubjectProgress {
    pub subject: String,
    pub best_percentage: i32,
    pub attempts: Vec<AttemptSummary>,
}
