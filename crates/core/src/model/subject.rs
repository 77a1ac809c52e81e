use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::model::{Question, QuizAttempt, SubjectId};

#[derive(Debug, Error, Clone, PartialEq, Eq)]
#[non_exhaustive]
pub enum SubjectError {
    #[error("subject name cannot be empty")]
    EmptyName,

    #[error("subject content cannot be empty")]
    EmptyContent,
}

/// A named study topic: source text, cached questions and attempt history.
///
/// `id` never changes after creation. `history` only grows; use
/// [`Subject::sorted_history`] when order matters.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Subject {
    id: SubjectId,
    name: String,
    content: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    cached_questions: Option<Vec<Question>>,
    #[serde(default)]
    history: Vec<QuizAttempt>,
}

impl Subject {
    /// Creates a subject with an empty history.
    ///
    /// # Errors
    ///
    /// Returns `SubjectError::EmptyName` or `SubjectError::EmptyContent` when the
    /// trimmed values are empty.
    pub fn new(
        id: SubjectId,
        name: impl Into<String>,
        content: impl Into<String>,
        cached_questions: Option<Vec<Question>>,
    ) -> Result<Self, SubjectError> {
        let name = name.into().trim().to_string();
        if name.is_empty() {
            return Err(SubjectError::EmptyName);
        }
        let content = content.into();
        if content.trim().is_empty() {
            return Err(SubjectError::EmptyContent);
        }
        Ok(Self {
            id,
            name,
            content,
            cached_questions,
            history: Vec::new(),
        })
    }

    #[must_use]
    pub fn id(&self) -> &SubjectId {
        &self.id
    }

    #[must_use]
    pub fn name(&self) -> &str {
        &self.name
    }

    #[must_use]
    pub fn content(&self) -> &str {
        &self.content
    }

    /// Cached questions, if any were generated and stored.
    ///
    /// An empty cached list is treated the same as no cache.
    #[must_use]
    pub fn cached_questions(&self) -> Option<&[Question]> {
        self.cached_questions
            .as_deref()
            .filter(|questions| !questions.is_empty())
    }

    /// History in insertion order.
    #[must_use]
    pub fn history(&self) -> &[QuizAttempt] {
        &self.history
    }

    /// History ordered by date ascending.
    #[must_use]
    pub fn sorted_history(&self) -> Vec<QuizAttempt> {
        let mut history = self.history.clone();
        history.sort_by_key(QuizAttempt::date);
        history
    }

    pub fn set_cached_questions(&mut self, questions: Vec<Question>) {
        self.cached_questions = Some(questions);
    }

    pub fn push_attempt(&mut self, attempt: QuizAttempt) {
        self.history.push(attempt);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::time::fixed_now;
    use chrono::Duration;

    fn subject() -> Subject {
        Subject::new(SubjectId::generate(), " Biology ", "Cells and stuff", None).unwrap()
    }

    #[test]
    fn name_is_trimmed_and_required() {
        assert_eq!(subject().name(), "Biology");
        let err = Subject::new(SubjectId::generate(), "  ", "text", None).unwrap_err();
        assert_eq!(err, SubjectError::EmptyName);
    }

    #[test]
    fn sorted_history_orders_by_date() {
        let mut s = subject();
        let now = fixed_now();
        s.push_attempt(QuizAttempt::new(now + Duration::days(2), 1, 2).unwrap());
        s.push_attempt(QuizAttempt::new(now, 2, 2).unwrap());
        s.push_attempt(QuizAttempt::new(now + Duration::days(1), 0, 2).unwrap());

        let dates: Vec<_> = s.sorted_history().iter().map(QuizAttempt::date).collect();
        assert_eq!(
            dates,
            vec![now, now + Duration::days(1), now + Duration::days(2)]
        );
        assert_eq!(s.history()[0].date(), now + Duration::days(2));
    }

    #[test]
    fn empty_cache_counts_as_missing() {
        let mut s = subject();
        s.set_cached_questions(Vec::new());
        assert!(s.cached_questions().is_none());
    }

    #[test]
    fn json_shape_uses_camel_case() {
        let mut s = subject();
        s.push_attempt(QuizAttempt::new(fixed_now(), 1, 1).unwrap());
        let value = serde_json::to_value(&s).unwrap();
        assert!(value.get("history").is_some());
        assert!(value["history"][0].get("totalQuestions").is_some());

        let back: Subject = serde_json::from_value(value).unwrap();
        assert_eq!(back, s);
    }

    #[test]
    fn missing_history_defaults_to_empty() {
        let json = r#"{"id":"1","name":"N","content":"C"}"#;
        let s: Subject = serde_json::from_str(json).unwrap();
        assert!(s.history().is_empty());
        assert!(s.cached_questions().is_none());
    }
}
