//! Listing filters: single-field substring search and free-text search.
//!
//! Matching is case-insensitive substring (`LIKE '%text%'`), with the LIKE
//! wildcards in the user's text escaped. An empty text matches every row
//! whose column is not null.

use rusqlite::{params, Connection};

use super::patient::{patient_from_row, PATIENT_COLUMNS, PATIENT_ORDER};
use super::problem::{problem_from_row, PROBLEM_COLUMNS, PROBLEM_ORDER};
use crate::db::DatabaseError;
use crate::models::*;

/// Wrap user text into a `LIKE ... ESCAPE '\'` substring pattern.
pub fn like_pattern(text: &str) -> String {
    let mut pattern = String::with_capacity(text.len() + 2);
    pattern.push('%');
    for c in text.chars() {
        if matches!(c, '\\' | '%' | '_') {
            pattern.push('\\');
        }
        pattern.push(c);
    }
    pattern.push('%');
    pattern
}

/// Patients whose `field` contains `text`.
pub fn search_patients_by_field(
    conn: &Connection,
    field: PatientSearchField,
    text: &str,
    page: PageRequest,
) -> Result<Page<Patient>, DatabaseError> {
    let predicate = format!("p.{} LIKE ?1 ESCAPE '\\'", field.column());
    paged_patients(conn, &predicate, &like_pattern(text), page)
}

/// Free-text patient search across first name, last name and optional last name.
///
/// Without a pattern every patient is listed.
pub fn search_patients(
    conn: &Connection,
    pattern: Option<&str>,
    page: PageRequest,
) -> Result<Page<Patient>, DatabaseError> {
    match pattern.filter(|p| !p.is_empty()) {
        Some(p) => paged_patients(
            conn,
            "(p.first_name LIKE ?1 ESCAPE '\\' OR p.last_name LIKE ?1 ESCAPE '\\'
              OR p.last_name_optional LIKE ?1 ESCAPE '\\')",
            &like_pattern(p),
            page,
        ),
        None => super::list_patients(conn, page),
    }
}

fn paged_patients(
    conn: &Connection,
    predicate: &str,
    pattern: &str,
    page: PageRequest,
) -> Result<Page<Patient>, DatabaseError> {
    let sql = format!(
        "SELECT {PATIENT_COLUMNS} FROM patient p WHERE {predicate}
         ORDER BY {PATIENT_ORDER} LIMIT ?2 OFFSET ?3"
    );
    let mut stmt = conn.prepare(&sql)?;
    let rows = stmt.query_map(params![pattern, page.limit(), page.offset()], patient_from_row)?;
    let items = rows.collect::<Result<Vec<_>, _>>()?;

    let total: i64 = conn.query_row(
        &format!("SELECT COUNT(*) FROM patient p WHERE {predicate}"),
        params![pattern],
        |row| row.get(0),
    )?;
    Ok(Page::new(items, page, total))
}

/// Problems (of any patient) whose `field` contains `text`.
pub fn search_problems_by_field(
    conn: &Connection,
    field: ProblemSearchField,
    text: &str,
    page: PageRequest,
) -> Result<Page<Problem>, DatabaseError> {
    let predicate = format!("pr.{} LIKE ?1 ESCAPE '\\'", field.column());
    let pattern = like_pattern(text);

    let sql = format!(
        "SELECT {PROBLEM_COLUMNS} FROM problem pr WHERE {predicate}
         ORDER BY {PROBLEM_ORDER} LIMIT ?2 OFFSET ?3"
    );
    let mut stmt = conn.prepare(&sql)?;
    let rows = stmt.query_map(params![pattern, page.limit(), page.offset()], problem_from_row)?;
    let items = rows.collect::<Result<Vec<_>, _>>()?;

    let total: i64 = conn.query_row(
        &format!("SELECT COUNT(*) FROM problem pr WHERE {predicate}"),
        params![pattern],
        |row| row.get(0),
    )?;
    Ok(Page::new(items, page, total))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn like_pattern_escapes_wildcards() {
        assert_eq!(like_pattern("Doe"), "%Doe%");
        assert_eq!(like_pattern("50%_a\\b"), "%50\\%\\_a\\\\b%");
        assert_eq!(like_pattern(""), "%%");
    }
}
