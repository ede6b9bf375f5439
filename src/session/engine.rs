// src/session/engine.rs
//
// Pure assessment state machine. No clocks, no storage, no HTTP: the manager
// owns deadlines and persistence, the engine owns answer bookkeeping and
// scoring arithmetic, which keeps every transition unit-testable.

use crate::{
    error::AppError,
    models::{
        attempt::{AnswerSheet, FinalizedAttempt, InterviewAnswer, QuizAnswer},
        question::{InterviewQuestion, QuizQuestion},
    },
};

/// Sentinel recorded when the deadline fires or a quiz option is out of range.
pub const NO_ANSWER: &str = "(No Answer)";

/// Sentinel for a user-initiated interview skip. Scoring treats it as an
/// explicit zero instead of grading it.
pub const SKIPPED: &str = "(Skipped)";

#[derive(Debug, Clone, Copy, PartialEq, Eq, serde::Serialize)]
#[serde(rename_all = "lowercase")]
pub enum SessionKind {
    Quiz,
    Interview,
}

/// The immutable question batch fetched from the oracle at session start.
#[derive(Debug, Clone)]
pub enum Batch {
    Quiz(Vec<QuizQuestion>),
    Interview(Vec<InterviewQuestion>),
}

impl Batch {
    pub fn len(&self) -> usize {
        match self {
            Batch::Quiz(v) => v.len(),
            Batch::Interview(v) => v.len(),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

/// How the current question was resolved.
#[derive(Debug, Clone)]
pub enum AnswerInput {
    /// Quiz: index into the current question's options.
    Choice(usize),
    /// Interview: free text.
    Text(String),
    /// Deadline elapsed with no submission.
    TimedOut,
    /// Interview only: explicit user skip.
    Skipped,
}

/// Result of recording an answer.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Advance {
    /// Session stays active at the given question index.
    Next(usize),
    /// Every question in the batch now has a record.
    Complete,
}

#[derive(Debug)]
enum CollectedAnswers {
    Quiz(Vec<QuizAnswer>),
    Interview(Vec<InterviewAnswer>),
}

#[derive(Debug)]
pub struct SessionEngine {
    subject: String,
    batch: Batch,
    current: usize,
    answers: CollectedAnswers,
}

impl SessionEngine {
    /// Builds a session over a freshly fetched batch. An empty batch is an
    /// oracle contract violation, surfaced before any session state exists.
    pub fn new(subject: impl Into<String>, batch: Batch) -> Result<Self, AppError> {
        if batch.is_empty() {
            return Err(AppError::Oracle("oracle returned an empty batch".to_string()));
        }

        let answers = match &batch {
            Batch::Quiz(_) => CollectedAnswers::Quiz(Vec::with_capacity(batch.len())),
            Batch::Interview(_) => CollectedAnswers::Interview(Vec::with_capacity(batch.len())),
        };

        Ok(Self {
            subject: subject.into(),
            batch,
            current: 0,
            answers,
        })
    }

    pub fn kind(&self) -> SessionKind {
        match self.batch {
            Batch::Quiz(_) => SessionKind::Quiz,
            Batch::Interview(_) => SessionKind::Interview,
        }
    }

    pub fn subject(&self) -> &str {
        &self.subject
    }

    pub fn current_index(&self) -> usize {
        self.current
    }

    pub fn total_questions(&self) -> usize {
        self.batch.len()
    }

    pub fn answered(&self) -> usize {
        match &self.answers {
            CollectedAnswers::Quiz(v) => v.len(),
            CollectedAnswers::Interview(v) => v.len(),
        }
    }

    /// Completion is judged against the actual batch length, never a
    /// hardcoded count.
    pub fn is_complete(&self) -> bool {
        self.answered() == self.batch.len()
    }

    pub fn current_quiz_question(&self) -> Option<&QuizQuestion> {
        match &self.batch {
            Batch::Quiz(v) => v.get(self.current),
            Batch::Interview(_) => None,
        }
    }

    pub fn current_interview_question(&self) -> Option<&InterviewQuestion> {
        match &self.batch {
            Batch::Interview(v) => v.get(self.current),
            Batch::Quiz(_) => None,
        }
    }

    /// Records the resolution of the current question, advances the index,
    /// and reports whether the sheet is now full. Exactly one record is
    /// appended per call, so a finished session always holds one record per
    /// batch item no matter how unresponsive the user was.
    pub fn record(&mut self, input: AnswerInput) -> Result<Advance, AppError> {
        if self.is_complete() {
            return Err(AppError::Validation("Session already complete".to_string()));
        }

        match (&self.batch, &mut self.answers) {
            (Batch::Quiz(questions), CollectedAnswers::Quiz(sheet)) => {
                let item = &questions[self.current];
                let selected = match input {
                    AnswerInput::Choice(i) => item
                        .options
                        .get(i)
                        .cloned()
                        .unwrap_or_else(|| NO_ANSWER.to_string()),
                    AnswerInput::TimedOut => NO_ANSWER.to_string(),
                    AnswerInput::Text(_) | AnswerInput::Skipped => {
                        return Err(AppError::Validation(
                            "Quiz questions take an option index".to_string(),
                        ));
                    }
                };

                sheet.push(QuizAnswer {
                    question: item.question.clone(),
                    correct_answer: item.answer.clone(),
                    selected_answer: selected,
                    options: item.options.clone(),
                });
            }
            (Batch::Interview(questions), CollectedAnswers::Interview(sheet)) => {
                let item = &questions[self.current];
                let user_answer = match input {
                    AnswerInput::Text(t) => {
                        let t = t.trim().to_string();
                        if t.is_empty() { NO_ANSWER.to_string() } else { t }
                    }
                    AnswerInput::TimedOut => NO_ANSWER.to_string(),
                    AnswerInput::Skipped => SKIPPED.to_string(),
                    AnswerInput::Choice(_) => {
                        return Err(AppError::Validation(
                            "Interview questions take a text answer".to_string(),
                        ));
                    }
                };

                sheet.push(InterviewAnswer {
                    question: item.question.clone(),
                    user_answer,
                });
            }
            _ => unreachable!("batch and sheet kinds are paired at construction"),
        }

        if self.is_complete() {
            Ok(Advance::Complete)
        } else {
            self.current += 1;
            Ok(Advance::Next(self.current))
        }
    }

    pub fn interview_answers(&self) -> Option<&[InterviewAnswer]> {
        match &self.answers {
            CollectedAnswers::Interview(v) => Some(v),
            CollectedAnswers::Quiz(_) => None,
        }
    }

    /// Grades a completed quiz locally: exact string equality of the selected
    /// option against the correct one, one point each.
    pub fn finalize_quiz(&self, user_id: i64) -> Result<FinalizedAttempt, AppError> {
        let sheet = match &self.answers {
            CollectedAnswers::Quiz(v) => v,
            CollectedAnswers::Interview(_) => {
                return Err(AppError::InternalServerError(
                    "finalize_quiz on an interview session".to_string(),
                ));
            }
        };

        if !self.is_complete() {
            return Err(AppError::InternalServerError(
                "finalize before session completion".to_string(),
            ));
        }

        let scores: Vec<i32> = sheet
            .iter()
            .map(|a| i32::from(a.selected_answer == a.correct_answer))
            .collect();
        let total_score: i32 = scores.iter().sum();
        let percentage = percentage_of(total_score, sheet.len() as i32);

        Ok(FinalizedAttempt {
            user_id,
            subject: self.subject.clone(),
            answers: AnswerSheet::Quiz(sheet.clone()),
            scores,
            total_score,
            percentage,
        })
    }

    /// Folds the scoring oracle's verdict into a completed interview.
    /// `None`, a wrong-length vector, or out-of-range values degrade to zeros
    /// rather than blocking completion; sentinel answers are forced to zero.
    pub fn finalize_interview(
        &self,
        user_id: i64,
        oracle_scores: Option<Vec<i32>>,
    ) -> Result<FinalizedAttempt, AppError> {
        let sheet = match &self.answers {
            CollectedAnswers::Interview(v) => v,
            CollectedAnswers::Quiz(_) => {
                return Err(AppError::InternalServerError(
                    "finalize_interview on a quiz session".to_string(),
                ));
            }
        };

        if !self.is_complete() {
            return Err(AppError::InternalServerError(
                "finalize before session completion".to_string(),
            ));
        }

        let scores: Vec<i32> = match oracle_scores {
            Some(s) if s.len() == sheet.len() => sheet
                .iter()
                .zip(s)
                .map(|(answer, score)| {
                    if answer.user_answer == NO_ANSWER || answer.user_answer == SKIPPED {
                        0
                    } else {
                        score.clamp(0, 10)
                    }
                })
                .collect(),
            _ => vec![0; sheet.len()],
        };

        let total_score: i32 = scores.iter().sum();
        let percentage = percentage_of(total_score, sheet.len() as i32 * 10);

        Ok(FinalizedAttempt {
            user_id,
            subject: self.subject.clone(),
            answers: AnswerSheet::Interview(sheet.clone()),
            scores,
            total_score,
            percentage,
        })
    }
}

fn percentage_of(total: i32, max: i32) -> i32 {
    if max == 0 {
        return 0;
    }
    ((total as f64 / max as f64) * 100.0).round() as i32
}

#[cfg(test)]
mod tests {
    use super::*;

    fn quiz_batch(n: usize) -> Batch {
        Batch::Quiz(
            (0..n)
                .map(|i| QuizQuestion {
                    question: format!("Q{i}"),
                    options: vec!["A".into(), "B".into(), "C".into(), "D".into()],
                    answer: "A".into(),
                })
                .collect(),
        )
    }

    fn interview_batch(n: usize) -> Batch {
        Batch::Interview(
            (0..n)
                .map(|i| InterviewQuestion {
                    question: format!("Q{i}"),
                    answer: format!("Reference {i}"),
                })
                .collect(),
        )
    }

    #[test]
    fn empty_batch_is_rejected() {
        assert!(SessionEngine::new("DSA", Batch::Quiz(vec![])).is_err());
    }

    #[test]
    fn all_correct_quiz_scores_full_marks() {
        let mut engine = SessionEngine::new("DSA", quiz_batch(10)).unwrap();
        for _ in 0..10 {
            engine.record(AnswerInput::Choice(0)).unwrap();
        }
        let attempt = engine.finalize_quiz(1).unwrap();
        assert_eq!(attempt.total_score, 10);
        assert_eq!(attempt.percentage, 100);
        assert_eq!(attempt.scores, vec![1; 10]);
    }

    #[test]
    fn all_wrong_quiz_scores_zero() {
        let mut engine = SessionEngine::new("DSA", quiz_batch(10)).unwrap();
        for _ in 0..10 {
            engine.record(AnswerInput::Choice(1)).unwrap();
        }
        let attempt = engine.finalize_quiz(1).unwrap();
        assert_eq!(attempt.total_score, 0);
        assert_eq!(attempt.percentage, 0);
    }

    #[test]
    fn six_of_ten_is_sixty_percent() {
        let mut engine = SessionEngine::new("DSA", quiz_batch(10)).unwrap();
        for i in 0..10 {
            let pick = if i < 6 { 0 } else { 1 };
            engine.record(AnswerInput::Choice(pick)).unwrap();
        }
        let attempt = engine.finalize_quiz(1).unwrap();
        assert_eq!(attempt.total_score, 6);
        assert_eq!(attempt.percentage, 60);
    }

    #[test]
    fn timeout_records_no_answer_sentinel_and_session_still_completes() {
        let mut engine = SessionEngine::new("OS", quiz_batch(10)).unwrap();
        for i in 0..10 {
            if i == 4 {
                engine.record(AnswerInput::TimedOut).unwrap();
            } else {
                engine.record(AnswerInput::Choice(0)).unwrap();
            }
        }
        let attempt = engine.finalize_quiz(1).unwrap();
        match &attempt.answers {
            AnswerSheet::Quiz(sheet) => {
                assert_eq!(sheet.len(), 10);
                assert_eq!(sheet[4].selected_answer, NO_ANSWER);
            }
            _ => panic!("expected quiz sheet"),
        }
        assert_eq!(attempt.total_score, 9);
    }

    #[test]
    fn out_of_range_choice_counts_as_no_answer() {
        let mut engine = SessionEngine::new("OS", quiz_batch(1)).unwrap();
        engine.record(AnswerInput::Choice(99)).unwrap();
        let attempt = engine.finalize_quiz(1).unwrap();
        match &attempt.answers {
            AnswerSheet::Quiz(sheet) => assert_eq!(sheet[0].selected_answer, NO_ANSWER),
            _ => panic!("expected quiz sheet"),
        }
    }

    #[test]
    fn completion_tracks_actual_batch_length_not_ten() {
        let mut engine = SessionEngine::new("DBMS", quiz_batch(7)).unwrap();
        for i in 0..7 {
            let advance = engine.record(AnswerInput::Choice(0)).unwrap();
            if i == 6 {
                assert_eq!(advance, Advance::Complete);
            } else {
                assert_eq!(advance, Advance::Next(i + 1));
            }
        }
        assert!(engine.is_complete());
        assert!(engine.record(AnswerInput::Choice(0)).is_err());
    }

    #[test]
    fn interview_blank_answer_becomes_no_answer() {
        let mut engine = SessionEngine::new("OOP", interview_batch(2)).unwrap();
        engine.record(AnswerInput::Text("   ".into())).unwrap();
        engine.record(AnswerInput::Text("B-trees".into())).unwrap();
        let answers = engine.interview_answers().unwrap();
        assert_eq!(answers[0].user_answer, NO_ANSWER);
        assert_eq!(answers[1].user_answer, "B-trees");
    }

    #[test]
    fn scoring_failure_degrades_to_all_zeros() {
        let mut engine = SessionEngine::new("ML", interview_batch(10)).unwrap();
        for _ in 0..10 {
            engine.record(AnswerInput::Text("an answer".into())).unwrap();
        }
        let attempt = engine.finalize_interview(1, None).unwrap();
        assert_eq!(attempt.scores, vec![0; 10]);
        assert_eq!(attempt.total_score, 0);
        assert_eq!(attempt.percentage, 0);
    }

    #[test]
    fn wrong_length_scores_also_degrade_to_zeros() {
        let mut engine = SessionEngine::new("ML", interview_batch(3)).unwrap();
        for _ in 0..3 {
            engine.record(AnswerInput::Text("x".into())).unwrap();
        }
        let attempt = engine.finalize_interview(1, Some(vec![5, 5])).unwrap();
        assert_eq!(attempt.scores, vec![0; 3]);
    }

    #[test]
    fn skipped_answers_score_zero_even_if_oracle_disagrees() {
        let mut engine = SessionEngine::new("ML", interview_batch(3)).unwrap();
        engine.record(AnswerInput::Text("good answer".into())).unwrap();
        engine.record(AnswerInput::Skipped).unwrap();
        engine.record(AnswerInput::TimedOut).unwrap();

        let attempt = engine.finalize_interview(1, Some(vec![8, 9, 7])).unwrap();
        assert_eq!(attempt.scores, vec![8, 0, 0]);
        assert_eq!(attempt.total_score, 8);
        // 3 questions, max 30
        assert_eq!(attempt.percentage, 27);
    }

    #[test]
    fn interview_percentage_scales_with_batch_length() {
        let mut engine = SessionEngine::new("ML", interview_batch(10)).unwrap();
        for _ in 0..10 {
            engine.record(AnswerInput::Text("x".into())).unwrap();
        }
        let attempt = engine.finalize_interview(1, Some(vec![10; 10])).unwrap();
        assert_eq!(attempt.total_score, 100);
        assert_eq!(attempt.percentage, 100);
    }

    #[test]
    fn oracle_scores_are_clamped_to_range() {
        let mut engine = SessionEngine::new("ML", interview_batch(2)).unwrap();
        engine.record(AnswerInput::Text("a".into())).unwrap();
        engine.record(AnswerInput::Text("b".into())).unwrap();
        let attempt = engine.finalize_interview(1, Some(vec![-3, 25])).unwrap();
        assert_eq!(attempt.scores, vec![0, 10]);
    }

    #[test]
    fn kind_mismatch_inputs_are_rejected() {
        let mut quiz = SessionEngine::new("DSA", quiz_batch(2)).unwrap();
        assert!(quiz.record(AnswerInput::Text("nope".into())).is_err());
        assert!(quiz.record(AnswerInput::Skipped).is_err());
        // rejected inputs must not consume the question
        assert_eq!(quiz.answered(), 0);

        let mut interview = SessionEngine::new("DSA", interview_batch(2)).unwrap();
        assert!(interview.record(AnswerInput::Choice(0)).is_err());
        assert_eq!(interview.answered(), 0);
    }
}
