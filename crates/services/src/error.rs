//! Shared error types for the services crate.

use thiserror::Error;

use quiz_core::model::{AttemptError, SubjectError, SubjectId};

/// Errors emitted by the question generation capability.
#[derive(Debug, Error)]
#[non_exhaustive]
pub enum GenerationError {
    #[error("source text is too short ({actual} characters, need at least {min})")]
    TextTooShort { min: usize, actual: usize },
    #[error("question generation is not configured")]
    Disabled,
    #[error("no questions could be generated from the provided text")]
    EmptyResult,
    #[error("could not parse quiz questions from the response: {0}")]
    Malformed(String),
    #[error("a generation request for {0} is already in flight")]
    AlreadyInFlight(String),
    #[error("generation request failed with status {0}")]
    HttpStatus(reqwest::StatusCode),
    #[error(transparent)]
    Http(#[from] reqwest::Error),
}

/// Errors emitted by the quiz session engine.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
#[non_exhaustive]
pub enum SessionError {
    #[error("no questions available for session")]
    Empty,
    #[error("session already completed")]
    Completed,
    #[error("session is still in progress")]
    NotFinished,
    #[error("select at least one option before submitting")]
    NoSelection,
    #[error("the current question has already been answered")]
    AlreadyAnswered,
    #[error("the current question has not been answered yet")]
    NotAnswered,
    #[error("no questions remain for another batch")]
    NoNextBatch,
    #[error("there are no missed questions to review")]
    NoMistakes,
    #[error(transparent)]
    Attempt(#[from] AttemptError),
}

/// Errors emitted while reading configuration.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
#[non_exhaustive]
pub enum ConfigError {
    #[error("invalid value for {key}: {value}")]
    InvalidValue { key: &'static str, value: String },
}

/// Errors emitted by `QuizLoopService` commands.
#[derive(Debug, Error)]
#[non_exhaustive]
pub enum QuizLoopError {
    #[error("pasted text is too short ({actual} characters, need at least {min})")]
    TextTooShort { min: usize, actual: usize },
    #[error("unknown subject {0}")]
    UnknownSubject(SubjectId),
    #[error("command not available while {state}")]
    InvalidState { state: &'static str },
    #[error("there is no unsaved quiz to save")]
    NothingToSave,
    #[error(transparent)]
    Generation(#[from] GenerationError),
    #[error(transparent)]
    Session(#[from] SessionError),
    #[error(transparent)]
    Subject(#[from] SubjectError),
}

impl QuizLoopError {
    /// Text suitable for showing to the learner.
    #[must_use]
    pub fn user_message(&self) -> String {
        match self {
            QuizLoopError::Generation(err) => format!("Quiz Generation Failed: {err}"),
            other => other.to_string(),
        }
    }
}
