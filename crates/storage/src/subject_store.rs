//! Load and save the whole subject collection as a single JSON blob.

use std::sync::Arc;

use quiz_core::model::Subject;

use crate::repository::{BlobRepository, StorageError};

/// Name of the blob that holds the serialized subject list.
pub const SUBJECTS_BLOB: &str = "quizmaster_subjects";

/// Fail-soft persistence for the subject collection.
///
/// Every mutation is "recompute the full list, then save the full list".
#[derive(Clone)]
pub struct SubjectStore {
    repo: Arc<dyn BlobRepository>,
    blob_name: String,
}

impl SubjectStore {
    #[must_use]
    pub fn new(repo: Arc<dyn BlobRepository>) -> Self {
        Self::with_blob_name(repo, SUBJECTS_BLOB)
    }

    #[must_use]
    pub fn with_blob_name(repo: Arc<dyn BlobRepository>, blob_name: impl Into<String>) -> Self {
        Self {
            repo,
            blob_name: blob_name.into(),
        }
    }

    /// Loads every subject. Read or parse failures are logged and yield an empty list.
    pub async fn load(&self) -> Vec<Subject> {
        match self.try_load().await {
            Ok(subjects) => subjects,
            Err(err) => {
                log::error!("failed to load subjects from {}: {err}", self.blob_name);
                Vec::new()
            }
        }
    }

    /// Saves the full collection. Failures are logged and otherwise ignored.
    pub async fn save(&self, subjects: &[Subject]) {
        if let Err(err) = self.try_save(subjects).await {
            log::error!("failed to save {} subjects: {err}", subjects.len());
        }
    }

    /// Loads every subject, surfacing storage and parse errors.
    ///
    /// # Errors
    ///
    /// Returns `StorageError::Serialization` when the blob is not a valid subject list,
    /// or the backend's error when it cannot be read.
    pub async fn try_load(&self) -> Result<Vec<Subject>, StorageError> {
        let Some(raw) = self.repo.get_blob(&self.blob_name).await? else {
            return Ok(Vec::new());
        };
        serde_json::from_str(&raw).map_err(|e| StorageError::Serialization(e.to_string()))
    }

    /// Saves the full collection, surfacing storage and serialization errors.
    ///
    /// # Errors
    ///
    /// Returns `StorageError` if serialization or the backend write fails.
    pub async fn try_save(&self, subjects: &[Subject]) -> Result<(), StorageError> {
        let raw = serde_json::to_string(subjects)
            .map_err(|e| StorageError::Serialization(e.to_string()))?;
        self.repo.put_blob(&self.blob_name, &raw).await?;
        log::debug!("saved {} subjects to {}", subjects.len(), self.blob_name);
        Ok(())
    }
}
