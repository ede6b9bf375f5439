// src/session/manager.rs
//
// Owns every live assessment session and its single deadline timer. All
// transitions go through the map's lock, so per-user operations serialize.
// Each session has at most one outstanding deadline task: advancing aborts the
// old task and arms a new one, and every task carries the epoch it was armed
// with so a stale wake-up can never touch a session it no longer owns.

use std::{collections::HashMap, sync::Arc, time::Duration};

use serde::Serialize;
use tokio::{sync::Mutex, task::JoinHandle};

use crate::{
    attempts::AttemptStore,
    error::AppError,
    oracle::ScoringOracle,
    session::engine::{Advance, AnswerInput, SessionEngine, SessionKind},
};

/// What the client sees of a live session: the current question with the
/// answer withheld, plus progress counters.
#[derive(Debug, Serialize)]
pub struct SessionView {
    pub subject: String,
    pub kind: SessionKind,
    pub index: usize,
    pub total: usize,
    pub question: String,
    /// Present for quiz sessions only.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub options: Option<Vec<String>>,
    pub time_limit_secs: u64,
}

/// Response to an answer/skip: either the next question or the final result.
#[derive(Debug, Serialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum SessionOutcome {
    InProgress {
        session: SessionView,
    },
    Completed {
        attempt_id: i64,
        subject: String,
        total_score: i32,
        percentage: i32,
        scores: Vec<i32>,
    },
}

struct ActiveSession {
    engine: SessionEngine,
    epoch: u64,
    deadline: Option<JoinHandle<()>>,
}

#[derive(Clone)]
pub struct SessionManager {
    inner: Arc<Mutex<HashMap<i64, ActiveSession>>>,
    scoring: Arc<dyn ScoringOracle>,
    attempts: Arc<dyn AttemptStore>,
    question_time: Duration,
}

impl SessionManager {
    pub fn new(
        scoring: Arc<dyn ScoringOracle>,
        attempts: Arc<dyn AttemptStore>,
        question_time: Duration,
    ) -> Self {
        Self {
            inner: Arc::new(Mutex::new(HashMap::new())),
            scoring,
            attempts,
            question_time,
        }
    }

    /// Registers a session for the user and arms the first deadline. Any
    /// session already in flight for this user is cancelled and discarded.
    pub async fn start(&self, user_id: i64, engine: SessionEngine) -> SessionView {
        let mut sessions = self.inner.lock().await;

        if let Some(mut old) = sessions.remove(&user_id) {
            if let Some(handle) = old.deadline.take() {
                handle.abort();
            }
            tracing::debug!("Replacing active session for user {}", user_id);
        }

        let mut session = ActiveSession {
            engine,
            epoch: 0,
            deadline: None,
        };
        self.arm(&mut session, user_id, 0);
        let view = self.view_of(&session.engine);
        sessions.insert(user_id, session);

        view
    }

    /// Records an answer (or skip) for the user's current question.
    pub async fn answer(
        &self,
        user_id: i64,
        input: AnswerInput,
    ) -> Result<SessionOutcome, AppError> {
        let mut sessions = self.inner.lock().await;

        let advance = {
            let session = sessions
                .get_mut(&user_id)
                .ok_or_else(|| AppError::NotFound("No active session".to_string()))?;
            session.engine.record(input)?
        };

        match advance {
            Advance::Next(_) => {
                let session = sessions.get_mut(&user_id).expect("session present");
                if let Some(handle) = session.deadline.take() {
                    handle.abort();
                }
                session.epoch += 1;
                let epoch = session.epoch;
                self.arm(session, user_id, epoch);
                Ok(SessionOutcome::InProgress {
                    session: self.view_of(&session.engine),
                })
            }
            Advance::Complete => {
                let mut session = sessions.remove(&user_id).expect("session present");
                drop(sessions);
                if let Some(handle) = session.deadline.take() {
                    handle.abort();
                }
                self.finalize(user_id, session.engine).await
            }
        }
    }

    /// Discards the user's session without persisting anything and cancels
    /// the pending deadline so a stale timeout cannot fire afterwards.
    pub async fn exit(&self, user_id: i64) -> Result<(), AppError> {
        let mut sessions = self.inner.lock().await;
        let mut session = sessions
            .remove(&user_id)
            .ok_or_else(|| AppError::NotFound("No active session".to_string()))?;

        if let Some(handle) = session.deadline.take() {
            handle.abort();
        }

        Ok(())
    }

    pub async fn view(&self, user_id: i64) -> Result<SessionView, AppError> {
        let sessions = self.inner.lock().await;
        let session = sessions
            .get(&user_id)
            .ok_or_else(|| AppError::NotFound("No active session".to_string()))?;

        Ok(self.view_of(&session.engine))
    }

    /// Arms the per-question deadline. The task re-checks the epoch under the
    /// lock on wake, so an answer racing the timer wins cleanly.
    fn arm(&self, session: &mut ActiveSession, user_id: i64, epoch: u64) {
        let manager = self.clone();
        let delay = self.question_time;
        session.deadline = Some(tokio::spawn(async move {
            tokio::time::sleep(delay).await;
            manager.on_deadline(user_id, epoch).await;
        }));
    }

    /// Deadline wake-up: behaves exactly like an answer with the no-answer
    /// sentinel. Never aborts the running task's own handle.
    async fn on_deadline(&self, user_id: i64, epoch: u64) {
        let mut sessions = self.inner.lock().await;

        let advance = {
            let Some(session) = sessions.get_mut(&user_id) else {
                return;
            };
            if session.epoch != epoch {
                return;
            }

            let advance = match session.engine.record(AnswerInput::TimedOut) {
                Ok(advance) => advance,
                Err(e) => {
                    tracing::warn!("Deadline fired on unanswerable session: {}", e);
                    return;
                }
            };

            tracing::debug!(
                "Question timed out for user {} ({}/{})",
                user_id,
                session.engine.answered(),
                session.engine.total_questions()
            );
            advance
        };

        match advance {
            Advance::Next(_) => {
                let session = sessions.get_mut(&user_id).expect("session present");
                session.epoch += 1;
                let epoch = session.epoch;
                self.arm(session, user_id, epoch);
            }
            Advance::Complete => {
                let session = sessions.remove(&user_id).expect("session present");
                drop(sessions);
                if let Err(e) = self.finalize(user_id, session.engine).await {
                    tracing::error!("Failed to finalize timed-out session: {}", e);
                }
            }
        }
    }

    /// Scores the completed session and hands the snapshot to the attempt
    /// store. A scoring-oracle failure degrades to zeros; a storage failure
    /// propagates.
    async fn finalize(
        &self,
        user_id: i64,
        engine: SessionEngine,
    ) -> Result<SessionOutcome, AppError> {
        let attempt = match engine.kind() {
            SessionKind::Quiz => engine.finalize_quiz(user_id)?,
            SessionKind::Interview => {
                let answers = engine.interview_answers().expect("interview session");
                let scores = match self.scoring.score_answers(answers).await {
                    Ok(scores) => Some(scores),
                    Err(e) => {
                        tracing::warn!("Scoring oracle failed, recording zeros: {}", e);
                        None
                    }
                };
                engine.finalize_interview(user_id, scores)?
            }
        };

        let attempt_id = self.attempts.save(&attempt).await?;
        tracing::info!(
            "Attempt {} finalized for user {}: {} ({}%)",
            attempt_id,
            user_id,
            attempt.total_score,
            attempt.percentage
        );

        Ok(SessionOutcome::Completed {
            attempt_id,
            subject: attempt.subject,
            total_score: attempt.total_score,
            percentage: attempt.percentage,
            scores: attempt.scores,
        })
    }

    fn view_of(&self, engine: &SessionEngine) -> SessionView {
        let (question, options) = match engine.kind() {
            SessionKind::Quiz => {
                let q = engine.current_quiz_question().expect("active quiz question");
                (q.question.clone(), Some(q.options.clone()))
            }
            SessionKind::Interview => {
                let q = engine
                    .current_interview_question()
                    .expect("active interview question");
                (q.question.clone(), None)
            }
        };

        SessionView {
            subject: engine.subject().to_string(),
            kind: engine.kind(),
            index: engine.current_index(),
            total: engine.total_questions(),
            question,
            options,
            time_limit_secs: self.question_time.as_secs(),
        }
    }
}
