use serde::Deserialize;

use quiz_core::model::Question;

use crate::error::GenerationError;

#[derive(Debug, Deserialize)]
struct QuizPayload {
    questions: Vec<RawQuestion>,
}

#[derive(Debug, Deserialize)]
struct RawQuestion {
    question: String,
    options: Vec<String>,
    answer: RawAnswer,
    #[serde(default)]
    explanation: String,
}

/// Models sometimes return a bare string for single-answer questions.
#[derive(Debug, Deserialize)]
#[serde(untagged)]
enum RawAnswer {
    Many(Vec<String>),
    One(String),
}

impl RawAnswer {
    fn into_vec(self) -> Vec<String> {
        match self {
            RawAnswer::Many(answers) => answers,
            RawAnswer::One(answer) => vec![answer],
        }
    }
}

/// Parses a model response into validated questions.
///
/// Questions that break the question invariants are skipped.
///
/// # Errors
///
/// Returns `GenerationError::Malformed` when the payload is not the expected JSON shape
/// and `GenerationError::EmptyResult` when no valid question remains.
pub fn parse_questions(raw: &str) -> Result<Vec<Question>, GenerationError> {
    let payload: QuizPayload = serde_json::from_str(strip_code_fence(raw))
        .map_err(|e| GenerationError::Malformed(e.to_string()))?;

    let questions: Vec<Question> = payload
        .questions
        .into_iter()
        .filter_map(|raw| {
            let text = raw.question.clone();
            Question::new(raw.question, raw.options, raw.answer.into_vec(), raw.explanation)
                .map_err(|err| log::warn!("skipping generated question {text:?}: {err}"))
                .ok()
        })
        .collect();

    if questions.is_empty() {
        return Err(GenerationError::EmptyResult);
    }
    Ok(questions)
}

fn strip_code_fence(raw: &str) -> &str {
    let trimmed = raw.trim();
    let Some(body) = trimmed.strip_prefix("```") else {
        return trimmed;
    };
    // The info line (`json`, `JSON`, ...) runs up to the first newline.
    let body = match body.split_once('\n') {
        Some((info, rest)) if !info.contains('{') => rest,
        _ => body,
    };
    body.strip_suffix("```").unwrap_or(body).trim()
}
