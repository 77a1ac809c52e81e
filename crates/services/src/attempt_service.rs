use quiz_core::model::{QuizAttempt, Subject, SubjectId};
use storage::SubjectStore;

/// Appends completed attempts to a subject's history.
#[derive(Clone)]
pub struct AttemptRecorder {
    store: SubjectStore,
}

impl AttemptRecorder {
    #[must_use]
    pub fn new(store: SubjectStore) -> Self {
        Self { store }
    }

    /// Append `attempt` to the matching subject and persist the collection.
    ///
    /// Other subjects are left untouched. An unknown id leaves the list unchanged
    /// and nothing is saved.
    pub async fn record(
        &self,
        subjects: &[Subject],
        id: &SubjectId,
        attempt: QuizAttempt,
    ) -> Vec<Subject> {
        if !subjects.iter().any(|subject| subject.id() == id) {
            log::warn!("attempt for unknown subject {id} dropped");
            return subjects.to_vec();
        }

        let updated: Vec<Subject> = subjects
            .iter()
            .map(|subject| {
                let mut subject = subject.clone();
                if subject.id() == id {
                    subject.push_attempt(attempt);
                }
                subject
            })
            .collect();
        self.store.save(&updated).await;
        updated
    }
}
