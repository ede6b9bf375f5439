// src/handlers/dashboard.rs

use axum::{
    Extension, Json,
    extract::{Query, State},
    response::IntoResponse,
};
use serde::Deserialize;
use sqlx::PgPool;

use crate::{
    error::AppError,
    models::attempt::{AttemptSummary, SubjectProgress},
    utils::jwt::Claims,
};

#[derive(Debug, Deserialize)]
pub struct ProgressParams {
    /// "quiz" (default) or "interview".
    pub kind: Option<String>,
}

/// Attempts grouped by subject for the dashboard: each group newest-first,
/// with the best percentage across attempts as the subject's best score.
pub async fn progress(
    State(pool): State<PgPool>,
    Extension(claims): Extension<Claims>,
    Query(params): Query<ProgressParams>,
) -> Result<impl IntoResponse, AppError> {
    let table = match params.kind.as_deref() {
        None | Some("quiz") => "quiz_attempts",
        Some("interview") => "interview_attempts",
        Some(other) => {
            return Err(AppError::Validation(format!("Unknown kind '{other}'")));
        }
    };

    let user_id = claims.user_id()?;

    let rows = sqlx::query_as::<_, AttemptSummary>(&format!(
        r#"
        SELECT id, subject, total_score, percentage, created_at
        FROM {table}
        WHERE user_id = $1
        ORDER BY subject ASC, created_at DESC
        "#
    ))
    .bind(user_id)
    .fetch_all(&pool)
    .await
    .map_err(|e| {
        tracing::error!("Failed to load progress: {:?}", e);
        AppError::InternalServerError(e.to_string())
    })?;

    Ok(Json(group_by_subject(rows)))
}

/// Rows arrive subject-sorted with per-subject recency order; fold them into
/// groups without disturbing either ordering.
fn group_by_subject(rows: Vec<AttemptSummary>) -> Vec<SubjectProgress> {
    let mut groups: Vec<SubjectProgress> = Vec::new();

    for row in rows {
        match groups.last_mut() {
            Some(group) if group.subject == row.subject => {
                group.best_percentage = group.best_percentage.max(row.percentage);
                group.attempts.push(row);
            }
            _ => groups.push(SubjectProgress {
                subject: row.subject.clone(),
                best_percentage: row.percentage,
                attempts: vec![row],
            }),
        }
    }

    groups
}

#[cfg(test)]
mod tests {
    use super::*;

    fn summary(subject: &str, percentage: i32) -> AttemptSummary {
        AttemptSummary {
            id: 0,
            subject: subject.to_string(),
            total_score: percentage / 10,
            percentage,
            created_at: None,
        }
    }

    #[test]
    fn groups_carry_the_max_percentage() {
        let rows = vec![
            summary("DBMS", 40),
            summary("DBMS", 90),
            summary("DSA", 60),
        ];

        let groups = group_by_subject(rows);
        assert_eq!(groups.len(), 2);
        assert_eq!(groups[0].subject, "DBMS");
        assert_eq!(groups[0].best_percentage, 90);
        assert_eq!(groups[0].attempts.len(), 2);
        assert_eq!(groups[1].subject, "DSA");
        assert_eq!(groups[1].best_percentage, 60);
    }

    #[test]
    fn empty_input_yields_no_groups() {
        assert!(group_by_subject(Vec::new()).is_empty());
    }
}
