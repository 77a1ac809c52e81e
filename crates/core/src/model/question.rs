use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;
use thiserror::Error;

//
// ─── ERRORS ────────────────────────────────────────────────────────────────────
//

#[derive(Debug, Error, Clone, PartialEq, Eq)]
#[non_exhaustive]
pub enum QuestionError {
    #[error("question text cannot be empty")]
    EmptyPrompt,

    #[error("a question needs at least two options, got {count}")]
    TooFewOptions { count: usize },

    #[error("a question needs at least one correct answer")]
    EmptyAnswer,

    #[error("answer {0:?} is not one of the options")]
    AnswerNotInOptions(String),
}

//
// ─── QUESTION ──────────────────────────────────────────────────────────────────
//

/// A multiple-choice question with one or more correct options.
///
/// `answer` has set semantics: duplicates collapse and order is irrelevant.
/// Every answer is guaranteed to be one of `options`.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(try_from = "QuestionRecord", into = "QuestionRecord")]
pub struct Question {
    question: String,
    options: Vec<String>,
    answer: BTreeSet<String>,
    explanation: String,
}

impl Question {
    /// Builds a validated question.
    ///
    /// # Errors
    ///
    /// Returns `QuestionError` when the prompt is blank, fewer than two options are
    /// given, the answer set is empty, or an answer is not among the options.
    pub fn new<A, S>(
        question: impl Into<String>,
        options: Vec<String>,
        answer: A,
        explanation: impl Into<String>,
    ) -> Result<Self, QuestionError>
    where
        A: IntoIterator<Item = S>,
        S: Into<String>,
    {
        let question = question.into();
        if question.trim().is_empty() {
            return Err(QuestionError::EmptyPrompt);
        }
        if options.len() < 2 {
            return Err(QuestionError::TooFewOptions {
                count: options.len(),
            });
        }

        let answer: BTreeSet<String> = answer.into_iter().map(Into::into).collect();
        if answer.is_empty() {
            return Err(QuestionError::EmptyAnswer);
        }
        if let Some(missing) = answer.iter().find(|a| !options.contains(a)) {
            return Err(QuestionError::AnswerNotInOptions(missing.clone()));
        }

        Ok(Self {
            question,
            options,
            answer,
            explanation: explanation.into(),
        })
    }

    #[must_use]
    pub fn text(&self) -> &str {
        &self.question
    }

    #[must_use]
    pub fn options(&self) -> &[String] {
        &self.options
    }

    #[must_use]
    pub fn answer(&self) -> &BTreeSet<String> {
        &self.answer
    }

    #[must_use]
    pub fn explanation(&self) -> &str {
        &self.explanation
    }

    /// True when more than one option must be selected.
    #[must_use]
    pub fn is_multi_answer(&self) -> bool {
        self.answer.len() > 1
    }

    /// Exact set equality between the selection and the correct answers.
    #[must_use]
    pub fn grade(&self, selection: &Selection) -> bool {
        selection.options() == &self.answer
    }

    /// Classifies every option once an answer has been graded.
    #[must_use]
    pub fn mark_options(&self, selection: &Selection) -> Vec<(&str, OptionMark)> {
        self.options
            .iter()
            .map(|option| {
                let mark = if self.answer.contains(option) {
                    OptionMark::Correct
                } else if selection.contains(option) {
                    OptionMark::WronglySelected
                } else {
                    OptionMark::Neutral
                };
                (option.as_str(), mark)
            })
            .collect()
    }
}

/// How an option should be shown after grading.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OptionMark {
    /// Part of the correct answer.
    Correct,
    /// Selected by the learner but not part of the answer.
    WronglySelected,
    Neutral,
}

//
// ─── SELECTION ─────────────────────────────────────────────────────────────────
//

/// The set of options a learner has picked for the current question.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Selection(BTreeSet<String>);

impl Selection {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Adds the option if absent, removes it otherwise.
    pub fn toggle(&mut self, option: impl Into<String>) {
        let option = option.into();
        if !self.0.remove(&option) {
            self.0.insert(option);
        }
    }

    #[must_use]
    pub fn contains(&self, option: &str) -> bool {
        self.0.contains(option)
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.0.len()
    }

    #[must_use]
    pub fn options(&self) -> &BTreeSet<String> {
        &self.0
    }
}

impl<S: Into<String>> FromIterator<S> for Selection {
    fn from_iter<I: IntoIterator<Item = S>>(iter: I) -> Self {
        Self(iter.into_iter().map(Into::into).collect())
    }
}

//
// ─── SERDE SHAPE ───────────────────────────────────────────────────────────────
//

#[derive(Serialize, Deserialize)]
struct QuestionRecord {
    question: String,
    options: Vec<String>,
    answer: Vec<String>,
    #[serde(default)]
    explanation: String,
}

impl TryFrom<QuestionRecord> for Question {
    type Error = QuestionError;

    fn try_from(record: QuestionRecord) -> Result<Self, Self::Error> {
        Question::new(
            record.question,
            record.options,
            record.answer,
            record.explanation,
        )
    }
}

impl From<Question> for QuestionRecord {
    fn from(q: Question) -> Self {
        Self {
            question: q.question,
            options: q.options,
            answer: q.answer.into_iter().collect(),
            explanation: q.explanation,
        }
    }
}

//
// ─── TESTS ─────────────────────────────────────────────────────────────────────
//
