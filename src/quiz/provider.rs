//! Boundary between the quiz and whatever produces its questions.
//!
//! Providers never fail towards the caller: errors are logged and turned
//! into an empty question list or a zero-score evaluation.

use std::collections::HashSet;

use async_trait::async_trait;
use serde::Deserialize;
use thiserror::Error;

use super::Question;

pub const MISSING_KEY_FEEDBACK: &str = "API Key missing. Cannot evaluate.";
pub const EVALUATION_FAILED_FEEDBACK: &str = "Error evaluating answer. Please try again.";

/// Options are shown with letter labels, so more than this can't be answered.
const MAX_OPTIONS: usize = 26;

#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct Evaluation {
    pub score: f64,
    pub feedback: String,
}

impl Evaluation {
    pub fn zero(feedback: &str) -> Self {
        Self {
            score: 0.0,
            feedback: feedback.to_string(),
        }
    }
}

#[derive(Debug, Error)]
pub enum ProviderError {
    #[error("no API key configured")]
    MissingCredential,
    #[error("ChatGPT request failed: {0}")]
    ChatGpt(#[from] chatgpt::err::Error),
    #[error("response is not valid JSON: {0}")]
    Unparseable(#[from] serde_json::Error),
    #[error("response contained no usable questions")]
    Empty,
}

#[async_trait]
pub trait QuestionProvider: Send + Sync {
    /// A fresh list of multiple choice questions, empty if none could be produced.
    async fn generate_questions(&self) -> Vec<Question>;

    /// Grades a free text answer on a 0..=100 scale.
    async fn evaluate_answer(&self, question: &str, answer: &str, context: &str) -> Evaluation;
}

/// Strips a Markdown code fence the model likes to wrap JSON in.
fn strip_code_fence(raw: &str) -> &str {
    let trimmed = raw.trim();
    let Some(inner) = trimmed.strip_prefix("```") else {
        return trimmed;
    };
    // Drop the language tag on the opening fence, if any
    let inner = match inner.find('\n') {
        Some(newline) => &inner[newline + 1..],
        None => inner,
    };
    inner.strip_suffix("```").unwrap_or(inner).trim()
}

fn is_usable(question: &Question) -> bool {
    !question.text.trim().is_empty()
        && (2..=MAX_OPTIONS).contains(&question.options.len())
        && question.correct_option_index < question.options.len()
}

/// Parses a JSON array of questions, dropping the ones that can't be asked.
///
/// Ids must be unique; the first question with a given id wins.
pub fn parse_questions(raw: &str) -> Result<Vec<Question>, ProviderError> {
    let questions: Vec<Question> = serde_json::from_str(strip_code_fence(raw))?;
    let mut seen = HashSet::new();
    let usable: Vec<Question> = questions
        .into_iter()
        .filter(is_usable)
        .filter(|question| seen.insert(question.id.clone()))
        .collect();
    if usable.is_empty() {
        return Err(ProviderError::Empty);
    }
    Ok(usable)
}

pub fn parse_evaluation(raw: &str) -> Result<Evaluation, ProviderError> {
    let mut evaluation: Evaluation = serde_json::from_str(strip_code_fence(raw))?;
    evaluation.score = evaluation.score.clamp(0.0, 100.0);
    Ok(evaluation)
}
