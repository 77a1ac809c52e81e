use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use thiserror::Error;

#[derive(Debug, Error, Clone, PartialEq, Eq)]
#[non_exhaustive]
pub enum AttemptError {
    #[error("an attempt must cover at least one question")]
    NoQuestions,

    #[error("score {score} exceeds total questions {total}")]
    ScoreExceedsTotal { score: u32, total: u32 },
}

/// Immutable record of one completed quiz run.
///
/// Dates are stored as Unix milliseconds.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(try_from = "AttemptRecord", into = "AttemptRecord")]
pub struct QuizAttempt {
    date: DateTime<Utc>,
    score: u32,
    total_questions: u32,
}

impl QuizAttempt {
    /// # Errors
    ///
    /// Returns `AttemptError::NoQuestions` when `total_questions` is zero and
    /// `AttemptError::ScoreExceedsTotal` when `score > total_questions`.
    pub fn new(date: DateTime<Utc>, score: u32, total_questions: u32) -> Result<Self, AttemptError> {
        if total_questions == 0 {
            return Err(AttemptError::NoQuestions);
        }
        if score > total_questions {
            return Err(AttemptError::ScoreExceedsTotal {
                score,
                total: total_questions,
            });
        }
        Ok(Self {
            date,
            score,
            total_questions,
        })
    }

    #[must_use]
    pub fn date(&self) -> DateTime<Utc> {
        self.date
    }

    #[must_use]
    pub fn score(&self) -> u32 {
        self.score
    }

    #[must_use]
    pub fn total_questions(&self) -> u32 {
        self.total_questions
    }

    /// Score as a percentage in `[0, 100]`.
    #[must_use]
    pub fn percentage(&self) -> f64 {
        f64::from(self.score) / f64::from(self.total_questions) * 100.0
    }
}

#[derive(Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
struct AttemptRecord {
    #[serde(with = "chrono::serde::ts_milliseconds")]
    date: DateTime<Utc>,
    score: u32,
    total_questions: u32,
}

impl TryFrom<AttemptRecord> for QuizAttempt {
    type Error = AttemptError;

    fn try_from(record: AttemptRecord) -> Result<Self, Self::Error> {
        QuizAttempt::new(record.date, record.score, record.total_questions)
    }
}

impl From<QuizAttempt> for AttemptRecord {
    fn from(attempt: QuizAttempt) -> Self {
        Self {
            date: attempt.date,
            score: attempt.score,
            total_questions: attempt.total_questions,
        }
    }
}
