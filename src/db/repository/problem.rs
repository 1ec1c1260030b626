use rusqlite::{params, Connection, Row, TransactionBehavior};

use super::now;
use super::staff::require_staff;
use crate::db::DatabaseError;
use crate::models::*;

pub(crate) const PROBLEM_COLUMNS: &str = "pr.id, pr.order_number, pr.patient_id, pr.closing_date,
     pr.wording, pr.meeting_place, pr.subjective, pr.objective, pr.appreciation,
     pr.action_plan, pr.prescription, pr.doctor_id, pr.created, pr.modified";

/// Default listing order for problems.
pub(crate) const PROBLEM_ORDER: &str = "pr.order_number, pr.id";

pub(crate) fn problem_from_row(row: &Row<'_>) -> rusqlite::Result<Problem> {
    Ok(Problem {
        id: row.get(0)?,
        order_number: row.get(1)?,
        patient_id: row.get(2)?,
        closing_date: row.get(3)?,
        fields: ProblemFields {
            wording: row.get(4)?,
            meeting_place: row.get(5)?,
            subjective: row.get(6)?,
            objective: row.get(7)?,
            appreciation: row.get(8)?,
            action_plan: row.get(9)?,
            prescription: row.get(10)?,
            doctor_id: row.get(11)?,
        },
        created: row.get(12)?,
        modified: row.get(13)?,
    })
}

/// The two disjoint partitions of the problem table.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ProblemState {
    /// No closing date.
    Opened,
    /// Closing date set.
    Closed,
}

impl ProblemState {
    fn predicate(&self) -> &'static str {
        match self {
            ProblemState::Opened => "pr.closing_date IS NULL",
            ProblemState::Closed => "pr.closing_date IS NOT NULL",
        }
    }
}

/// Order number the next problem of this patient receives: highest so far plus one.
pub fn next_order_number(conn: &Connection, patient_id: i64) -> Result<i64, DatabaseError> {
    Ok(conn.query_row(
        "SELECT COALESCE(MAX(order_number), 0) + 1 FROM problem WHERE patient_id = ?1",
        params![patient_id],
        |row| row.get(0),
    )?)
}

/// Create a problem for a patient, assigning the next order number.
///
/// The read of the current maximum and the insert run in one IMMEDIATE
/// transaction, so concurrent writers for the same database are serialized;
/// `UNIQUE(patient_id, order_number)` rejects anything that slips through.
pub fn insert_problem(
    conn: &mut Connection,
    patient_id: i64,
    input: &ProblemInput,
) -> Result<Problem, DatabaseError> {
    input.validate()?;
    let tx = conn.transaction_with_behavior(TransactionBehavior::Immediate)?;

    let patient_exists: bool = tx.query_row(
        "SELECT EXISTS(SELECT 1 FROM patient WHERE id = ?1)",
        params![patient_id],
        |row| row.get(0),
    )?;
    if !patient_exists {
        return Err(DatabaseError::not_found("patient", patient_id));
    }
    require_staff(&tx, input.fields.doctor_id)?;

    let order_number = next_order_number(&tx, patient_id)?;
    let ts = now();
    let f = &input.fields;
    tx.execute(
        "INSERT INTO problem (order_number, closing_date, meeting_place, wording, subjective,
         objective, appreciation, action_plan, prescription, patient_id, doctor_id,
         created, modified)
         VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11, ?12, ?13)",
        params![
            order_number,
            input.closing_date(ts),
            f.meeting_place,
            f.wording,
            f.subjective,
            f.objective,
            f.appreciation,
            f.action_plan,
            f.prescription,
            patient_id,
            f.doctor_id,
            ts,
            ts,
        ],
    )?;
    let id = tx.last_insert_rowid();
    tx.commit()?;

    tracing::info!(problem_id = id, patient_id, order_number, "Problem created");
    get_problem(conn, id)?.ok_or_else(|| DatabaseError::not_found("problem", id))
}

/// Update the clinical fields of a problem and reapply the closing rule.
///
/// Order number and patient never change.
pub fn update_problem(
    conn: &Connection,
    id: i64,
    input: &ProblemInput,
) -> Result<Problem, DatabaseError> {
    input.validate()?;
    require_staff(conn, input.fields.doctor_id)?;

    let ts = now();
    let f = &input.fields;
    let changed = conn.execute(
        "UPDATE problem SET closing_date = ?1, meeting_place = ?2, wording = ?3,
         subjective = ?4, objective = ?5, appreciation = ?6, action_plan = ?7,
         prescription = ?8, doctor_id = ?9, modified = ?10
         WHERE id = ?11",
        params![
            input.closing_date(ts),
            f.meeting_place,
            f.wording,
            f.subjective,
            f.objective,
            f.appreciation,
            f.action_plan,
            f.prescription,
            f.doctor_id,
            ts,
            id,
        ],
    )?;
    if changed == 0 {
        return Err(DatabaseError::not_found("problem", id));
    }

    tracing::info!(problem_id = id, closed = input.closed, "Problem updated");
    get_problem(conn, id)?.ok_or_else(|| DatabaseError::not_found("problem", id))
}

pub fn get_problem(conn: &Connection, id: i64) -> Result<Option<Problem>, DatabaseError> {
    let sql = format!("SELECT {PROBLEM_COLUMNS} FROM problem pr WHERE pr.id = ?1");
    let mut stmt = conn.prepare(&sql)?;
    match stmt.query_row(params![id], problem_from_row) {
        Ok(problem) => Ok(Some(problem)),
        Err(rusqlite::Error::QueryReturnedNoRows) => Ok(None),
        Err(e) => Err(e.into()),
    }
}

/// Delete a problem with its tests and connections.
///
/// Returns the stored document paths of the removed tests.
pub fn delete_problem(conn: &mut Connection, id: i64) -> Result<Vec<String>, DatabaseError> {
    let tx = conn.transaction()?;

    let documents = {
        let mut stmt = tx.prepare("SELECT document FROM test WHERE problem_id = ?1")?;
        let rows = stmt.query_map(params![id], |row| row.get::<_, String>(0))?;
        rows.collect::<Result<Vec<_>, _>>()?
    };

    let deleted = tx.execute("DELETE FROM problem WHERE id = ?1", params![id])?;
    if deleted == 0 {
        return Err(DatabaseError::not_found("problem", id));
    }
    tx.commit()?;

    tracing::info!(problem_id = id, tests_removed = documents.len(), "Problem deleted");
    Ok(documents)
}

/// All problems of a patient in order-number order.
pub fn problems_for_patient(conn: &Connection, patient_id: i64) -> Result<Vec<Problem>, DatabaseError> {
    let sql = format!(
        "SELECT {PROBLEM_COLUMNS} FROM problem pr WHERE pr.patient_id = ?1 ORDER BY {PROBLEM_ORDER}"
    );
    let mut stmt = conn.prepare(&sql)?;
    let rows = stmt.query_map(params![patient_id], problem_from_row)?;
    rows.map(|r| r.map_err(DatabaseError::from)).collect()
}

/// Problems in one partition, most recently modified first.
///
/// `patient_id = None` spans the whole table.
pub fn problems_in_state(
    conn: &Connection,
    state: ProblemState,
    patient_id: Option<i64>,
) -> Result<Vec<Problem>, DatabaseError> {
    let sql = format!(
        "SELECT {PROBLEM_COLUMNS} FROM problem pr
         WHERE {} AND (?1 IS NULL OR pr.patient_id = ?1)
         ORDER BY pr.modified DESC, pr.id DESC",
        state.predicate()
    );
    let mut stmt = conn.prepare(&sql)?;
    let rows = stmt.query_map(params![patient_id], problem_from_row)?;
    rows.map(|r| r.map_err(DatabaseError::from)).collect()
}

/// Paginated variant of [`problems_in_state`] for one patient.
pub fn problems_in_state_page(
    conn: &Connection,
    state: ProblemState,
    patient_id: i64,
    page: PageRequest,
) -> Result<Page<Problem>, DatabaseError> {
    let sql = format!(
        "SELECT {PROBLEM_COLUMNS} FROM problem pr
         WHERE {} AND pr.patient_id = ?1
         ORDER BY pr.modified DESC, pr.id DESC LIMIT ?2 OFFSET ?3",
        state.predicate()
    );
    let mut stmt = conn.prepare(&sql)?;
    let rows = stmt.query_map(params![patient_id, page.limit(), page.offset()], problem_from_row)?;
    let items = rows.collect::<Result<Vec<_>, _>>()?;

    let total: i64 = conn.query_row(
        &format!(
            "SELECT COUNT(*) FROM problem pr WHERE {} AND pr.patient_id = ?1",
            state.predicate()
        ),
        params![patient_id],
        |row| row.get(0),
    )?;
    Ok(Page::new(items, page, total))
}

pub fn opened_problems(conn: &Connection, patient_id: i64) -> Result<Vec<Problem>, DatabaseError> {
    problems_in_state(conn, ProblemState::Opened, Some(patient_id))
}

pub fn closed_problems(conn: &Connection, patient_id: i64) -> Result<Vec<Problem>, DatabaseError> {
    problems_in_state(conn, ProblemState::Closed, Some(patient_id))
}
