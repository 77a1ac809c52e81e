use std::env;
use std::time::Duration;

use quiz_core::model::Language;

use crate::error::ConfigError;
use crate::generation::MIN_TEXT_CHARS;
use crate::sessions::plan::BatchSize;
use crate::sessions::timer::DEFAULT_AUTO_ADVANCE;

/// Tunables for quiz runs.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct QuizConfig {
    pub batch_size: BatchSize,
    pub auto_advance_delay: Duration,
    pub min_text_chars: usize,
    pub language: Language,
}

impl Default for QuizConfig {
    fn default() -> Self {
        Self {
            batch_size: BatchSize::default(),
            auto_advance_delay: DEFAULT_AUTO_ADVANCE,
            min_text_chars: MIN_TEXT_CHARS,
            language: Language::default(),
        }
    }
}

impl QuizConfig {
    /// Reads `QUIZ_BATCH_SIZE`, `QUIZ_AUTO_ADVANCE_MS` and `QUIZ_LANGUAGE`.
    ///
    /// # Errors
    ///
    /// Returns `ConfigError::InvalidValue` for unparsable or zero values.
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|key| env::var(key).ok())
    }

    /// Builds a config from an arbitrary key lookup; unset keys keep their defaults.
    ///
    /// # Errors
    ///
    /// Returns `ConfigError::InvalidValue` for unparsable or zero values.
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self, ConfigError> {
        let mut config = Self::default();

        if let Some(raw) = lookup("QUIZ_BATCH_SIZE") {
            config.batch_size = raw
                .trim()
                .parse::<usize>()
                .ok()
                .and_then(BatchSize::new)
                .ok_or(ConfigError::InvalidValue {
                    key: "QUIZ_BATCH_SIZE",
                    value: raw,
                })?;
        }

        if let Some(raw) = lookup("QUIZ_AUTO_ADVANCE_MS") {
            let millis = raw
                .trim()
                .parse::<u64>()
                .map_err(|_| ConfigError::InvalidValue {
                    key: "QUIZ_AUTO_ADVANCE_MS",
                    value: raw.clone(),
                })?;
            config.auto_advance_delay = Duration::from_millis(millis);
        }

        if let Some(raw) = lookup("QUIZ_LANGUAGE") {
            config.language = raw.parse().map_err(|_| ConfigError::InvalidValue {
                key: "QUIZ_LANGUAGE",
                value: raw.clone(),
            })?;
        }

        Ok(config)
    }
}
