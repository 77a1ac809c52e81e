use quiz_core::model::{Question, Subject, SubjectError, SubjectId};
use storage::SubjectStore;

/// Subject collection mutations: recompute the full list, then save it.
#[derive(Clone)]
pub struct SubjectService {
    store: SubjectStore,
}

impl SubjectService {
    #[must_use]
    pub fn new(store: SubjectStore) -> Self {
        Self { store }
    }

    /// Loads the saved collection, empty on any storage failure.
    pub async fn list(&self) -> Vec<Subject> {
        self.store.load().await
    }

    /// Create a subject from freshly generated questions and persist the collection.
    ///
    /// # Errors
    ///
    /// Returns `SubjectError` if the name or content is empty.
    pub async fn create(
        &self,
        subjects: &[Subject],
        name: &str,
        content: &str,
        questions: Vec<Question>,
    ) -> Result<(Vec<Subject>, SubjectId), SubjectError> {
        let id = SubjectId::generate();
        let subject = Subject::new(id.clone(), name, content, Some(questions))?;

        let mut updated = subjects.to_vec();
        updated.push(subject);
        self.store.save(&updated).await;
        Ok((updated, id))
    }

    /// Replace a subject's cached questions and persist the collection.
    pub async fn cache_questions(
        &self,
        subjects: &[Subject],
        id: &SubjectId,
        questions: &[Question],
    ) -> Vec<Subject> {
        let updated: Vec<Subject> = subjects
            .iter()
            .map(|subject| {
                let mut subject = subject.clone();
                if subject.id() == id {
                    subject.set_cached_questions(questions.to_vec());
                }
                subject
            })
            .collect();
        self.store.save(&updated).await;
        updated
    }

    /// Remove a subject and persist the collection.
    pub async fn delete(&self, subjects: &[Subject], id: &SubjectId) -> Vec<Subject> {
        let updated: Vec<Subject> = subjects
            .iter()
            .filter(|subject| subject.id() != id)
            .cloned()
            .collect();
        if updated.len() == subjects.len() {
            log::warn!("delete requested for unknown subject {id}");
        }
        self.store.save(&updated).await;
        updated
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;
    use storage::InMemoryRepository;

    fn question() -> Question {
        Question::new("Q", vec!["A".into(), "B".into()], ["A"], "").unwrap()
    }

    fn service() -> SubjectService {
        SubjectService::new(SubjectStore::new(Arc::new(InMemoryRepository::new())))
    }

    #[tokio::test]
    async fn create_cache_and_delete_persist_full_list() {
        let service = service();

        let (subjects, first) = service
            .create(&[], "History", "Some history text", vec![question()])
            .await
            .unwrap();
        let (subjects, second) = service
            .create(&subjects, "Physics", "Some physics text", vec![question()])
            .await
            .unwrap();
        assert_eq!(service.list().await.len(), 2);

        let refreshed = vec![question(), question()];
        let subjects = service.cache_questions(&subjects, &second, &refreshed).await;
        let saved = service.list().await;
        assert_eq!(saved[1].cached_questions().unwrap().len(), 2);
        assert_eq!(saved[0].cached_questions().unwrap().len(), 1);

        let subjects = service.delete(&subjects, &first).await;
        assert_eq!(subjects.len(), 1);
        assert_eq!(service.list().await, subjects);
        assert_eq!(subjects[0].id(), &second);
    }

    #[tokio::test]
    async fn create_rejects_blank_name() {
        let err = service()
            .create(&[], "  ", "content", vec![question()])
            .await
            .unwrap_err();
        assert_eq!(err, SubjectError::EmptyName);
    }
}
