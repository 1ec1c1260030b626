//! Autocomplete channels feeding the relatives and connections editors.
//!
//! Read-only: a lookup never creates entities.

use rusqlite::{params_from_iter, Connection};

use super::patient::{patient_from_row, PATIENT_COLUMNS};
use super::problem::{problem_from_row, PROBLEM_COLUMNS};
use super::search::like_pattern;
use crate::db::DatabaseError;
use crate::models::*;

/// Maximum number of candidates a lookup returns.
pub const LOOKUP_LIMIT: i64 = 20;

/// Patients whose first name, last name or optional last name contains `q`.
pub fn lookup_patients(conn: &Connection, q: &str) -> Result<Vec<Patient>, DatabaseError> {
    let sql = format!(
        "SELECT {PATIENT_COLUMNS} FROM patient p
         WHERE p.first_name LIKE ?1 ESCAPE '\\' OR p.last_name LIKE ?1 ESCAPE '\\'
            OR p.last_name_optional LIKE ?1 ESCAPE '\\'
         ORDER BY p.first_name, p.last_name, p.id LIMIT ?2"
    );
    let mut stmt = conn.prepare(&sql)?;
    let rows = stmt.query_map(rusqlite::params![like_pattern(q), LOOKUP_LIMIT], patient_from_row)?;
    rows.map(|r| r.map_err(DatabaseError::from)).collect()
}

/// Problems whose wording, subjective or objective text contains `q`.
pub fn lookup_problems(conn: &Connection, q: &str) -> Result<Vec<Problem>, DatabaseError> {
    let sql = format!(
        "SELECT {PROBLEM_COLUMNS} FROM problem pr
         WHERE pr.wording LIKE ?1 ESCAPE '\\' OR pr.subjective LIKE ?1 ESCAPE '\\'
            OR pr.objective LIKE ?1 ESCAPE '\\'
         ORDER BY pr.wording, pr.id LIMIT ?2"
    );
    let mut stmt = conn.prepare(&sql)?;
    let rows = stmt.query_map(rusqlite::params![like_pattern(q), LOOKUP_LIMIT], problem_from_row)?;
    rows.map(|r| r.map_err(DatabaseError::from)).collect()
}

fn placeholders(n: usize) -> String {
    vec!["?"; n].join(", ")
}

/// Resolve selected patient ids back to patients, ordered by first name.
/// Unknown ids are skipped.
pub fn resolve_patients(conn: &Connection, ids: &[i64]) -> Result<Vec<Patient>, DatabaseError> {
    if ids.is_empty() {
        return Ok(Vec::new());
    }
    let sql = format!(
        "SELECT {PATIENT_COLUMNS} FROM patient p WHERE p.id IN ({})
         ORDER BY p.first_name, p.id",
        placeholders(ids.len())
    );
    let mut stmt = conn.prepare(&sql)?;
    let rows = stmt.query_map(params_from_iter(ids.iter()), patient_from_row)?;
    rows.map(|r| r.map_err(DatabaseError::from)).collect()
}

/// Resolve selected problem ids back to problems, ordered by wording.
/// Unknown ids are skipped.
pub fn resolve_problems(conn: &Connection, ids: &[i64]) -> Result<Vec<Problem>, DatabaseError> {
    if ids.is_empty() {
        return Ok(Vec::new());
    }
    let sql = format!(
        "SELECT {PROBLEM_COLUMNS} FROM problem pr WHERE pr.id IN ({})
         ORDER BY pr.wording, pr.id",
        placeholders(ids.len())
    );
    let mut stmt = conn.prepare(&sql)?;
    let rows = stmt.query_map(params_from_iter(ids.iter()), problem_from_row)?;
    rows.map(|r| r.map_err(DatabaseError::from)).collect()
}
