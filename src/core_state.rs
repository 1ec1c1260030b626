//! Shared application state for the HTTP layer.
//!
//! `CoreState` is wrapped in `Arc` at startup and handed to the router.
//! Every request opens its own SQLite connection; operations that touch
//! both the database and the media directory live here so the file side
//! effects always follow a committed row change.

use chrono::Utc;
use rusqlite::Connection;

use crate::config::Config;
use crate::db;
use crate::models::TestDocument;
use crate::storage::{self, DocumentStore};

/// Errors from CoreState operations.
#[derive(Debug, thiserror::Error)]
pub enum CoreError {
    #[error("Database error: {0}")]
    Database(#[from] db::DatabaseError),
    #[error("Storage error: {0}")]
    Storage(#[from] std::io::Error),
}

pub struct CoreState {
    pub config: Config,
    pub documents: DocumentStore,
}

impl CoreState {
    pub fn new(config: Config) -> Self {
        let documents = DocumentStore::new(config.media_root.clone());
        Self { config, documents }
    }

    /// Open a database connection (migrations are idempotent).
    pub fn open_db(&self) -> Result<Connection, CoreError> {
        Ok(db::open_database(&self.config.database_path)?)
    }

    /// Delete a patient with everything it owns, then its test files.
    pub fn delete_patient(&self, patient_id: i64) -> Result<(), CoreError> {
        let mut conn = self.open_db()?;
        let documents = db::delete_patient(&mut conn, patient_id)?;
        self.documents.remove_all(&documents);
        Ok(())
    }

    /// Delete a problem with its tests, then their files.
    pub fn delete_problem(&self, problem_id: i64) -> Result<(), CoreError> {
        let mut conn = self.open_db()?;
        let documents = db::delete_problem(&mut conn, problem_id)?;
        self.documents.remove_all(&documents);
        Ok(())
    }

    pub fn delete_test(&self, test_id: i64) -> Result<TestDocument, CoreError> {
        let conn = self.open_db()?;
        let removed = db::delete_test(&conn, test_id)?;
        self.documents.remove(&removed.document);
        Ok(removed)
    }

    /// Store an uploaded file and record it against a problem.
    ///
    /// The MIME type falls back to a guess from the file name. If the row
    /// cannot be inserted the stored file is removed again.
    pub fn attach_test(
        &self,
        problem_id: i64,
        file_name: &str,
        document_type: Option<&str>,
        bytes: &[u8],
    ) -> Result<TestDocument, CoreError> {
        let conn = self.open_db()?;
        let relative = self
            .documents
            .store(file_name, bytes, Utc::now().date_naive())?;
        let document_type = document_type
            .map(str::to_string)
            .or_else(|| storage::guess_document_type(file_name));

        db::insert_test(&conn, problem_id, document_type.as_deref(), &relative).map_err(|e| {
            self.documents.remove(&relative);
            e.into()
        })
    }
}
