// src/models/question.rs

use serde::{Deserialize, Serialize};

/// A multiple-choice item as returned by the question oracle.
/// `answer` holds the text of the correct option, not an index.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct QuizQuestion {
    pub question: String,
    pub options: Vec<String>,
    pub answer: String,
}

/// An open-ended interview item with the oracle's reference answer.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct InterviewQuestion {
    pub question: String,
    pub answer: String,
}
