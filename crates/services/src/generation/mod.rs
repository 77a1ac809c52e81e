//! The external question generation capability and its in-flight guard.

mod http;
mod parse;
mod prompt;

use async_trait::async_trait;
use std::collections::HashSet;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use quiz_core::model::{Language, Question};

use crate::error::GenerationError;

pub use http::{GeneratorConfig, HttpQuestionGenerator};
pub use parse::parse_questions;

/// Minimum number of characters of source text accepted for generation.
pub const MIN_TEXT_CHARS: usize = 50;

/// Turns study text into candidate questions.
#[async_trait]
pub trait QuestionGenerator: Send + Sync {
    /// Generate questions from `text` in the given language.
    ///
    /// Callers check the text length with [`validate_source_text`] first.
    ///
    /// # Errors
    ///
    /// Returns `GenerationError` when the upstream call fails or the response
    /// contains no usable questions.
    async fn generate(
        &self,
        text: &str,
        language: Language,
    ) -> Result<Vec<Question>, GenerationError>;
}

/// Checks the trimmed character count of `text`.
///
/// # Errors
///
/// Returns `GenerationError::TextTooShort` below `min` characters.
pub fn validate_source_text(text: &str, min: usize) -> Result<(), GenerationError> {
    let actual = text.trim().chars().count();
    if actual < min {
        return Err(GenerationError::TextTooShort { min, actual });
    }
    Ok(())
}

/// Allows one in-flight generation request per key.
pub struct GenerationGate {
    generator: Arc<dyn QuestionGenerator>,
    in_flight: Mutex<HashSet<String>>,
}

impl GenerationGate {
    #[must_use]
    pub fn new(generator: Arc<dyn QuestionGenerator>) -> Self {
        Self {
            generator,
            in_flight: Mutex::new(HashSet::new()),
        }
    }

    /// Runs the generator unless a request for `key` is already pending.
    ///
    /// # Errors
    ///
    /// Returns `GenerationError::AlreadyInFlight` for a duplicate request, or the
    /// generator's own error.
    pub async fn generate(
        &self,
        key: &str,
        text: &str,
        language: Language,
    ) -> Result<Vec<Question>, GenerationError> {
        let _claim = self.claim(key)?;
        let result = self.generator.generate(text, language).await;
        if let Err(err) = &result {
            log::warn!("question generation for {key} failed: {err}");
        }
        result
    }

    #[cfg(test)]
    fn is_in_flight(&self, key: &str) -> bool {
        self.keys().contains(key)
    }

    /// The key set stays consistent across a panic, so a poisoned lock is recovered.
    fn keys(&self) -> MutexGuard<'_, HashSet<String>> {
        self.in_flight
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
    }

    fn claim(&self, key: &str) -> Result<InFlightClaim<'_>, GenerationError> {
        if !self.keys().insert(key.to_string()) {
            return Err(GenerationError::AlreadyInFlight(key.to_string()));
        }
        Ok(InFlightClaim {
            gate: self,
            key: key.to_string(),
        })
    }
}

struct InFlightClaim<'a> {
    gate: &'a GenerationGate,
    key: String,
}

impl Drop for InFlightClaim<'_> {
    fn drop(&mut self) {
        self.gate.keys().remove(&self.key);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Duration;

    struct SlowGenerator;

    #[async_trait]
    impl QuestionGenerator for SlowGenerator {
        async fn generate(
            &self,
            _text: &str,
            _language: Language,
        ) -> Result<Vec<Question>, GenerationError> {
            tokio::time::sleep(Duration::from_secs(1)).await;
            Ok(vec![
                Question::new("Q", vec!["A".into(), "B".into()], ["A"], "").unwrap(),
            ])
        }
    }

    #[test]
    fn short_text_is_rejected() {
        let err = validate_source_text("   too short   ", MIN_TEXT_CHARS).unwrap_err();
        assert!(matches!(
            err,
            GenerationError::TextTooShort { min: 50, actual: 9 }
        ));
        assert!(validate_source_text(&"x".repeat(50), MIN_TEXT_CHARS).is_ok());
    }

    #[test]
    fn counts_characters_not_bytes() {
        let text = "细胞".repeat(25);
        assert!(validate_source_text(&text, MIN_TEXT_CHARS).is_ok());
    }

    #[tokio::test(start_paused = true)]
    async fn duplicate_requests_are_refused_while_pending() {
        let gate = GenerationGate::new(Arc::new(SlowGenerator));

        let (first, second) = tokio::join!(
            gate.generate("subject-1", "text", Language::English),
            async {
                tokio::task::yield_now().await;
                gate.generate("subject-1", "text", Language::English).await
            }
        );

        assert_eq!(first.unwrap().len(), 1);
        assert!(matches!(second, Err(GenerationError::AlreadyInFlight(_))));
        assert!(!gate.is_in_flight("subject-1"));
    }

    #[tokio::test(start_paused = true)]
    async fn poisoned_lock_does_not_block_generation() {
        let gate = GenerationGate::new(Arc::new(SlowGenerator));
        let poisoned = std::panic::catch_unwind(std::panic::AssertUnwindSafe(|| {
            let _keys = gate.in_flight.lock().unwrap();
            panic!("poison the in-flight set");
        }));
        assert!(poisoned.is_err());
        assert!(gate.in_flight.is_poisoned());

        let questions = gate
            .generate("subject-1", "text", Language::English)
            .await
            .unwrap();

        assert_eq!(questions.len(), 1);
        assert!(!gate.is_in_flight("subject-1"));
    }

    #[tokio::test(start_paused = true)]
    async fn different_keys_run_independently() {
        let gate = GenerationGate::new(Arc::new(SlowGenerator));

        let (a, b) = tokio::join!(
            gate.generate("a", "text", Language::English),
            gate.generate("b", "text", Language::Chinese)
        );

        assert!(a.is_ok());
        assert!(b.is_ok());
    }
}
