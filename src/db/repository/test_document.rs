use rusqlite::{params, Connection, Row};

use super::now;
use crate::db::DatabaseError;
use crate::models::*;

const TEST_COLUMNS: &str = "t.id, t.problem_id, t.document_type, t.document, t.created, t.modified";

fn test_from_row(row: &Row<'_>) -> rusqlite::Result<TestDocument> {
    Ok(TestDocument {
        id: row.get(0)?,
        problem_id: row.get(1)?,
        document_type: row.get(2)?,
        document: row.get(3)?,
        created: row.get(4)?,
        modified: row.get(5)?,
    })
}

/// Record a stored document as a test of the given problem.
pub fn insert_test(
    conn: &Connection,
    problem_id: i64,
    document_type: Option<&str>,
    document: &str,
) -> Result<TestDocument, DatabaseError> {
    if document.trim().is_empty() {
        return Err(ValidationError::Required("document").into());
    }
    if let Some(mime) = document_type {
        if mime.chars().count() > 128 {
            return Err(ValidationError::TooLong { field: "document_type", max: 128 }.into());
        }
    }
    if super::get_problem(conn, problem_id)?.is_none() {
        return Err(DatabaseError::not_found("problem", problem_id));
    }

    let ts = now();
    conn.execute(
        "INSERT INTO test (document_type, document, problem_id, created, modified)
         VALUES (?1, ?2, ?3, ?4, ?5)",
        params![document_type, document, problem_id, ts, ts],
    )?;
    let id = conn.last_insert_rowid();
    tracing::info!(test_id = id, problem_id, "Test document attached");
    get_test(conn, id)?.ok_or_else(|| DatabaseError::not_found("test", id))
}

pub fn get_test(conn: &Connection, id: i64) -> Result<Option<TestDocument>, DatabaseError> {
    let sql = format!("SELECT {TEST_COLUMNS} FROM test t WHERE t.id = ?1");
    let mut stmt = conn.prepare(&sql)?;
    match stmt.query_row(params![id], test_from_row) {
        Ok(test) => Ok(Some(test)),
        Err(rusqlite::Error::QueryReturnedNoRows) => Ok(None),
        Err(e) => Err(e.into()),
    }
}

pub fn tests_for_problem(conn: &Connection, problem_id: i64) -> Result<Vec<TestDocument>, DatabaseError> {
    let sql = format!(
        "SELECT {TEST_COLUMNS} FROM test t WHERE t.problem_id = ?1 ORDER BY t.created, t.id"
    );
    let mut stmt = conn.prepare(&sql)?;
    let rows = stmt.query_map(params![problem_id], test_from_row)?;
    rows.map(|r| r.map_err(DatabaseError::from)).collect()
}

/// Tests across all problems of a patient, grouped by problem order number.
pub fn tests_for_patient(conn: &Connection, patient_id: i64) -> Result<Vec<TestDocument>, DatabaseError> {
    let sql = format!(
        "SELECT {TEST_COLUMNS} FROM test t JOIN problem pr ON pr.id = t.problem_id
         WHERE pr.patient_id = ?1 ORDER BY pr.order_number, t.created, t.id"
    );
    let mut stmt = conn.prepare(&sql)?;
    let rows = stmt.query_map(params![patient_id], test_from_row)?;
    rows.map(|r| r.map_err(DatabaseError::from)).collect()
}

/// Delete the test row and return it. The stored file is not touched.
pub fn delete_test(conn: &Connection, id: i64) -> Result<TestDocument, DatabaseError> {
    let test = get_test(conn, id)?.ok_or_else(|| DatabaseError::not_found("test", id))?;
    conn.execute("DELETE FROM test WHERE id = ?1", params![id])?;
    tracing::info!(test_id = id, problem_id = test.problem_id, "Test document deleted");
    Ok(test)
}
