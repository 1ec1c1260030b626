use std::path::Path;

use chrono::NaiveDateTime;
use serde::Serialize;

/// A document (medical test result) attached to a problem.
#[derive(Debug, Clone, Serialize)]
pub struct TestDocument {
    pub id: i64,
    pub problem_id: i64,
    /// MIME type of the stored file.
    pub document_type: Option<String>,
    /// Path of the stored file, relative to the media root.
    pub document: String,
    pub created: NaiveDateTime,
    pub modified: NaiveDateTime,
}

impl TestDocument {
    pub fn filename(&self) -> String {
        Path::new(&self.document)
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_default()
    }
}
