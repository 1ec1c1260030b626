//! Test document files under the media root.
//!
//! Rows in the `test` table reference files by a path relative to
//! `media_root`. Files are written once and only removed when the owning row
//! is gone; removal never fails the operation that triggered it.

use std::fs;
use std::io::{self, Write};
use std::path::{Component, Path, PathBuf};

use chrono::NaiveDate;
use rand::rngs::OsRng;
use rand::RngCore;

/// Directory (relative to the media root) holding every uploaded test.
pub const TESTS_DIR: &str = "medical_tests";

const MAX_NAME_LEN: usize = 100;

#[derive(Debug, Clone)]
pub struct DocumentStore {
    media_root: PathBuf,
}

impl DocumentStore {
    pub fn new(media_root: impl Into<PathBuf>) -> Self {
        Self {
            media_root: media_root.into(),
        }
    }

    pub fn media_root(&self) -> &Path {
        &self.media_root
    }

    /// Write `bytes` under `medical_tests/YYYY/MM/DD/` and return the path
    /// relative to the media root.
    pub fn store(&self, file_name: &str, bytes: &[u8], today: NaiveDate) -> io::Result<String> {
        let relative = format!(
            "{TESTS_DIR}/{}/{}_{}",
            today.format("%Y/%m/%d"),
            uuid::Uuid::new_v4().simple(),
            sanitize_file_name(file_name)
        );
        let path = self.path_of(&relative)?;
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent)?;
        }
        fs::write(&path, bytes)?;
        tracing::debug!(document = %relative, size = bytes.len(), "Stored test document");
        Ok(relative)
    }

    /// Resolve a stored relative path, refusing anything that escapes the media root.
    pub fn path_of(&self, relative: &str) -> io::Result<PathBuf> {
        let rel = Path::new(relative);
        let escapes = rel
            .components()
            .any(|c| !matches!(c, Component::Normal(_) | Component::CurDir));
        if relative.is_empty() || escapes {
            return Err(io::Error::new(
                io::ErrorKind::InvalidInput,
                format!("document path outside media root: {relative}"),
            ));
        }
        Ok(self.media_root.join(rel))
    }

    /// Best-effort removal of a stored document. Missing files are fine;
    /// anything else is logged and swallowed.
    pub fn remove(&self, relative: &str) {
        let result = self.path_of(relative).and_then(|path| secure_delete_file(&path));
        match result {
            Ok(()) => tracing::debug!(document = %relative, "Removed test document"),
            Err(e) => tracing::warn!(document = %relative, "Failed to remove test document: {e}"),
        }
    }

    pub fn remove_all(&self, documents: &[String]) {
        for document in documents {
            self.remove(document);
        }
    }
}

/// MIME type guessed from the file extension, if any.
pub fn guess_document_type(file_name: &str) -> Option<String> {
    mime_guess::from_path(file_name)
        .first()
        .map(|mime| mime.essence_str().to_string())
}

/// Keep the last path segment and replace anything outside `[A-Za-z0-9._-]`.
pub fn sanitize_file_name(file_name: &str) -> String {
    let base = file_name
        .rsplit(['/', '\\'])
        .next()
        .unwrap_or_default()
        .trim_start_matches('.');
    let cleaned: String = base
        .chars()
        .map(|c| {
            if c.is_ascii_alphanumeric() || matches!(c, '.' | '-' | '_') {
                c
            } else {
                '_'
            }
        })
        .take(MAX_NAME_LEN)
        .collect();
    if cleaned.is_empty() {
        "document".to_string()
    } else {
        cleaned
    }
}

/// Overwrite with random bytes, sync, then unlink. Missing file is Ok.
fn secure_delete_file(path: &Path) -> io::Result<()> {
    let file_size = match fs::metadata(path) {
        Ok(meta) => meta.len() as usize,
        Err(e) if e.kind() == io::ErrorKind::NotFound => return Ok(()),
        Err(e) => return Err(e),
    };

    if file_size > 0 {
        let mut buf = vec![0u8; file_size.min(64 * 1024)];
        let mut file = fs::OpenOptions::new().write(true).open(path)?;
        let mut remaining = file_size;
        while remaining > 0 {
            let chunk = remaining.min(buf.len());
            OsRng.fill_bytes(&mut buf[..chunk]);
            if let Err(e) = file.write_all(&buf[..chunk]) {
                tracing::warn!(path = %path.display(), "Secure overwrite failed: {e}");
                break;
            }
            remaining -= chunk;
        }
        if let Err(e) = file.sync_all() {
            tracing::warn!(path = %path.display(), "Sync after overwrite failed: {e}");
        }
    }

    fs::remove_file(path)
}
