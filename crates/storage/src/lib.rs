#![forbid(unsafe_code)]

pub mod repository;
pub mod sqlite;
pub mod subject_store;

pub use repository::{BlobRepository, InMemoryRepository, StorageError};
pub use subject_store::{SUBJECTS_BLOB, SubjectStore};
