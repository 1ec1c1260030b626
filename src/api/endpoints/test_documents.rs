//! Test document endpoints: list, upload and delete.
//!
//! Uploads arrive as JSON carrying base64 content, either raw or as a data
//! URL (`data:application/pdf;base64,...`). The MIME type comes from the
//! request, then the data URL, then the file extension.

use axum::extract::{Path, State};
use axum::http::StatusCode;
use axum::Json;
use base64::Engine;
use serde::Deserialize;

use crate::api::error::ApiError;
use crate::api::types::ApiContext;
use crate::db::{self, DatabaseError};
use crate::models::TestDocument;

/// Maximum decoded upload size (20 MB).
pub const MAX_UPLOAD_BYTES: usize = 20 * 1024 * 1024;

#[derive(Debug, Deserialize)]
pub struct UploadRequest {
    pub file_name: String,
    #[serde(default)]
    pub document_type: Option<String>,
    /// Base64 content or base64 data URL.
    pub data: String,
}

/// Split a data URL into its declared MIME type and decoded bytes.
fn decode_data_url(data: &str) -> Result<(Option<String>, Vec<u8>), String> {
    let (mime, payload) = match data.strip_prefix("data:").and_then(|rest| rest.split_once(',')) {
        Some((header, payload)) => {
            let mime = header
                .split(';')
                .next()
                .map(str::trim)
                .filter(|m| !m.is_empty())
                .map(str::to_string);
            (mime, payload)
        }
        None => (None, data),
    };

    let bytes = base64::engine::general_purpose::STANDARD
        .decode(payload.trim())
        .map_err(|e| format!("Base64 decode failed: {e}"))?;
    Ok((mime, bytes))
}

/// `GET /api/problems/:id/tests`
pub async fn list(
    State(ctx): State<ApiContext>,
    Path(problem_id): Path<i64>,
) -> Result<Json<Vec<TestDocument>>, ApiError> {
    let conn = ctx.core.open_db()?;
    if db::get_problem(&conn, problem_id)?.is_none() {
        return Err(DatabaseError::not_found("problem", problem_id).into());
    }
    Ok(Json(db::tests_for_problem(&conn, problem_id)?))
}

/// `POST /api/problems/:id/tests`
pub async fn upload(
    State(ctx): State<ApiContext>,
    Path(problem_id): Path<i64>,
    Json(payload): Json<UploadRequest>,
) -> Result<(StatusCode, Json<TestDocument>), ApiError> {
    let (declared_type, bytes) = decode_data_url(&payload.data)
        .map_err(|e| ApiError::BadRequest(format!("Invalid document data: {e}")))?;

    if bytes.is_empty() {
        return Err(ApiError::BadRequest("Empty document".into()));
    }
    if bytes.len() > MAX_UPLOAD_BYTES {
        return Err(ApiError::BadRequest(format!(
            "Document exceeds {} MB size limit ({} bytes)",
            MAX_UPLOAD_BYTES / (1024 * 1024),
            bytes.len()
        )));
    }

    let document_type = payload.document_type.or(declared_type);
    let test = ctx
        .core
        .attach_test(problem_id, &payload.file_name, document_type.as_deref(), &bytes)?;
    Ok((StatusCode::CREATED, Json(test)))
}

/// `DELETE /api/tests/:id`: the stored file goes too, best-effort.
pub async fn delete(
    State(ctx): State<ApiContext>,
    Path(id): Path<i64>,
) -> Result<StatusCode, ApiError> {
    ctx.core.delete_test(id)?;
    Ok(StatusCode::NO_CONTENT)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn data_url_carries_mime_type() {
        let (mime, bytes) = decode_data_url("data:application/pdf;base64,JVBERi0=").unwrap();
        assert_eq!(mime.as_deref(), Some("application/pdf"));
        assert_eq!(bytes, b"%PDF-");
    }

    #[test]
    fn raw_base64_has_no_mime_type() {
        let raw = base64::engine::general_purpose::STANDARD.encode(b"hello");
        let (mime, bytes) = decode_data_url(&raw).unwrap();
        assert_eq!(mime, None);
        assert_eq!(bytes, b"hello");
    }

    #[test]
    fn invalid_base64_is_rejected() {
        assert!(decode_data_url("not-valid-base64!!!").is_err());
    }
}
