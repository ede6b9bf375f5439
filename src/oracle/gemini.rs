// src/oracle/gemini.rs

use std::sync::OnceLock;
use std::time::Duration;

use async_trait::async_trait;
use regex::Regex;
use serde::Deserialize;

use crate::{
    config::{Config, ORACLE_TIMEOUT_SECS},
    error::AppError,
    models::{
        attempt::InterviewAnswer,
        question::{InterviewQuestion, QuizQuestion},
    },
};

use super::{QuestionOracle, ScoringOracle};

/// Client for the Gemini generateContent API, serving as both oracles.
/// Prompts pin the response to a bare JSON document; the model still loves to
/// wrap it in ```json fences, so those are stripped before parsing.
pub struct GeminiClient {
    http: reqwest::Client,
    base_url: String,
    model: String,
    api_key: String,
}

#[derive(Deserialize)]
struct GenerateResponse {
    candidates: Vec<Candidate>,
}

#[derive(Deserialize)]
struct Candidate {
    content: CandidateContent,
}

#[derive(Deserialize)]
struct CandidateContent {
    parts: Vec<Part>,
}

#[derive(Deserialize)]
struct Part {
    text: String,
}

/// Raw quiz item shape the prompt asks for: `ans` is an index into `options`.
#[derive(Deserialize)]
struct RawQuizQuestion {
    q: String,
    options: Vec<String>,
    ans: usize,
}

#[derive(Deserialize)]
struct RawQuizBatch {
    questions: Vec<RawQuizQuestion>,
}

#[derive(Deserialize)]
struct RawInterviewBatch {
    questions: Vec<InterviewQuestion>,
}

#[derive(Deserialize)]
struct RawScores {
    scores: Vec<i32>,
}

fn strip_code_fences(text: &str) -> String {
    static FENCE: OnceLock<Regex> = OnceLock::new();
    let fence = FENCE.get_or_init(|| Regex::new(r"```(?:json)?").expect("static regex"));
    fence.replace_all(text, "").trim().to_string()
}

impl GeminiClient {
    pub fn new(config: &Config) -> Self {
        let http = reqwest::Client::builder()
            .timeout(Duration::from_secs(ORACLE_TIMEOUT_SECS))
            .build()
            .expect("reqwest client");

        Self {
            http,
            base_url: config.gemini_base_url.trim_end_matches('/').to_string(),
            model: config.gemini_model.clone(),
            api_key: config.gemini_api_key.clone(),
        }
    }

    /// One generateContent round trip, returning the model's raw text with
    /// code fences removed. Timeouts and malformed envelopes map to `Oracle`.
    async fn generate_text(&self, prompt: &str) -> Result<String, AppError> {
        let url = format!(
            "{}/v1beta/models/{}:generateContent?key={}",
            self.base_url, self.model, self.api_key
        );

        let resp = self
            .http
            .post(&url)
            .json(&serde_json::json!({
                "contents": [{ "parts": [{ "text": prompt }] }]
            }))
            .send()
            .await
            .map_err(|e| AppError::Oracle(format!("request failed: {e}")))?;

        if !resp.status().is_success() {
            return Err(AppError::Oracle(format!("status {}", resp.status())));
        }

        let body: GenerateResponse = resp
            .json()
            .await
            .map_err(|e| AppError::Oracle(format!("bad envelope: {e}")))?;

        let text = body
            .candidates
            .first()
            .and_then(|c| c.content.parts.first())
            .map(|p| p.text.as_str())
            .ok_or_else(|| AppError::Oracle("empty response".to_string()))?;

        Ok(strip_code_fences(text))
    }
}

#[async_trait]
impl QuestionOracle for GeminiClient {
    async fn quiz_batch(&self, subject: &str, count: usize) -> Result<Vec<QuizQuestion>, AppError> {
        let prompt = format!(
            "Generate exactly {count} MCQ questions for this subject: {subject}.\n\
             Return ONLY this JSON format:\n\n\
             {{\n  \"questions\": [\n    {{ \"q\": \"\", \"options\": [\"A\",\"B\",\"C\",\"D\"], \"ans\": 0 }}\n  ]\n}}\n\n\
             No explanation. No extra text. Only JSON."
        );

        let text = self.generate_text(&prompt).await?;
        let raw: RawQuizBatch = serde_json::from_str(&text)
            .map_err(|e| AppError::Oracle(format!("invalid quiz JSON: {e}")))?;

        if raw.questions.is_empty() {
            return Err(AppError::Oracle("empty quiz batch".to_string()));
        }

        raw.questions
            .into_iter()
            .map(|q| {
                let answer = q
                    .options
                    .get(q.ans)
                    .cloned()
                    .ok_or_else(|| AppError::Oracle("answer index out of range".to_string()))?;
                Ok(QuizQuestion {
                    question: q.q,
                    options: q.options,
                    answer,
                })
            })
            .collect()
    }

    async fn interview_batch(
        &self,
        subject: &str,
        count: usize,
    ) -> Result<Vec<InterviewQuestion>, AppError> {
        let prompt = format!(
            "Generate exactly {count} interview questions and answers for this subject: {subject}.\n\
             Return ONLY this JSON:\n\n\
             {{\n  \"questions\": [\n    {{ \"question\": \"\", \"answer\": \"\" }}\n  ]\n}}\n\n\
             No extra text. No explanation. No markdown. Only pure JSON."
        );

        let text = self.generate_text(&prompt).await?;
        let raw: RawInterviewBatch = serde_json::from_str(&text)
            .map_err(|e| AppError::Oracle(format!("invalid interview JSON: {e}")))?;

        if raw.questions.is_empty() {
            return Err(AppError::Oracle("empty interview batch".to_string()));
        }

        Ok(raw.questions)
    }
}

#[async_trait]
impl ScoringOracle for GeminiClient {
    async fn score_answers(&self, items: &[InterviewAnswer]) -> Result<Vec<i32>, AppError> {
        let sheet = serde_json::to_string_pretty(items)
            .map_err(|e| AppError::Oracle(e.to_string()))?;

        let prompt = format!(
            "You are an expert technical interviewer.\n\
             Score each answer from 0 to 10.\n\n\
             Return ONLY:\n\n{{\n  \"scores\": [0, 5, 10, ...]\n}}\n\nNo explanation.\n\n\
             Questions:\n{sheet}"
        );

        let text = self.generate_text(&prompt).await?;
        let raw: RawScores = serde_json::from_str(&text)
            .map_err(|e| AppError::Oracle(format!("invalid scores JSON: {e}")))?;

        Ok(raw.scores)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn strips_fenced_json() {
        let fenced = "```json\n{\"scores\": [1, 2]}\n```";
        assert_eq!(strip_code_fences(fenced), "{\"scores\": [1, 2]}");
    }

    #[test]
    fn leaves_bare_json_alone() {
        assert_eq!(strip_code_fences("{\"a\": 1}"), "{\"a\": 1}");
    }

    #[test]
    fn quiz_answer_index_resolves_to_text() {
        let raw: RawQuizBatch = serde_json::from_str(
            r#"{"questions": [{"q": "2+2?", "options": ["3", "4"], "ans": 1}]}"#,
        )
        .unwrap();
        let q = &raw.questions[0];
        assert_eq!(q.options[q.ans], "4");
    }
}
