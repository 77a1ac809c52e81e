use std::sync::Arc;

use chrono::Duration;
use quiz_core::model::{Question, QuizAttempt, Subject, SubjectId};
use quiz_core::time::fixed_now;
use storage::repository::BlobRepository;
use storage::sqlite::SqliteRepository;
use storage::{SUBJECTS_BLOB, SubjectStore};

fn build_subject(name: &str, attempts: u32) -> Subject {
    let question = Question::new(
        "Which planets are gas giants?",
        vec!["Jupiter".into(), "Mars".into(), "Saturn".into()],
        ["Saturn", "Jupiter"],
        "Jupiter and Saturn are gas giants.",
    )
    .unwrap();
    let mut subject = Subject::new(
        SubjectId::generate(),
        name,
        "The outer planets Jupiter and Saturn are mostly hydrogen and helium.",
        Some(vec![question]),
    )
    .unwrap();
    for day in 0..attempts {
        let date = fixed_now() + Duration::days(i64::from(day));
        subject.push_attempt(QuizAttempt::new(date, day.min(1), 1).unwrap());
    }
    subject
}

async fn connect(name: &str) -> SqliteRepository {
    let url = format!("sqlite:file:{name}?mode=memory&cache=shared");
    let repo = SqliteRepository::connect(&url).await.expect("connect");
    repo.migrate().await.expect("migrate");
    repo
}

#[tokio::test]
async fn sqlite_blob_upsert_replaces_value() {
    let repo = connect("memdb_blobs").await;

    assert_eq!(repo.get_blob("a").await.unwrap(), None);
    repo.put_blob("a", "1").await.unwrap();
    repo.put_blob("a", "2").await.unwrap();
    assert_eq!(repo.get_blob("a").await.unwrap().as_deref(), Some("2"));
    assert_eq!(repo.get_blob("b").await.unwrap(), None);
}

#[tokio::test]
async fn sqlite_migrations_are_idempotent() {
    let repo = connect("memdb_migrate_twice").await;
    repo.migrate().await.expect("second migrate");
}

#[tokio::test]
async fn sqlite_subject_store_round_trip() {
    let repo = connect("memdb_subjects").await;
    let store = SubjectStore::new(Arc::new(repo.clone()));
    let subjects = vec![build_subject("Astronomy", 3), build_subject("Chemistry", 0)];

    store.save(&subjects).await;
    let loaded = store.load().await;

    assert_eq!(loaded, subjects);
    assert_eq!(loaded[0].history().len(), 3);
    assert!(repo.get_blob(SUBJECTS_BLOB).await.unwrap().is_some());
}

#[tokio::test]
async fn sqlite_corrupt_blob_fails_soft() {
    let repo = connect("memdb_corrupt").await;
    repo.put_blob(SUBJECTS_BLOB, "[{\"id\":1}]").await.unwrap();
    let store = SubjectStore::new(Arc::new(repo));

    assert!(store.load().await.is_empty());
}
