use rusqlite::{params, Connection, Row};

use crate::db::DatabaseError;
use crate::models::*;

const HISTORY_COLUMNS: &str = "id, patient_id, birth_growth, growth_sexuality, feed, habits,
     peristaltic_conditions, psychological_conditions, children_complaint, venereal_disease,
     accident_surgical_operation, medical_intolerance, mental_illness, parents_status_health,
     brothers_status_health, spouse_childs_status_health, family_illness";

fn history_from_row(row: &Row<'_>) -> rusqlite::Result<History> {
    Ok(History {
        id: row.get(0)?,
        patient_id: row.get(1)?,
        antecedents: Antecedents {
            birth_growth: row.get(2)?,
            growth_sexuality: row.get(3)?,
            feed: row.get(4)?,
            habits: row.get(5)?,
            peristaltic_conditions: row.get(6)?,
            psychological_conditions: row.get(7)?,
            children_complaint: row.get(8)?,
            venereal_disease: row.get(9)?,
            accident_surgical_operation: row.get(10)?,
            medical_intolerance: row.get(11)?,
            mental_illness: row.get(12)?,
            parents_status_health: row.get(13)?,
            brothers_status_health: row.get(14)?,
            spouse_childs_status_health: row.get(15)?,
            family_illness: row.get(16)?,
        },
    })
}

/// Create the antecedents record of a patient. Fails if one already exists.
pub fn insert_history(
    conn: &Connection,
    patient_id: i64,
    antecedents: &Antecedents,
) -> Result<History, DatabaseError> {
    if super::get_patient(conn, patient_id)?.is_none() {
        return Err(DatabaseError::not_found("patient", patient_id));
    }
    if get_history_by_patient(conn, patient_id)?.is_some() {
        return Err(ValidationError::HistoryAlreadyExists(patient_id).into());
    }

    let a = antecedents;
    conn.execute(
        "INSERT INTO history (patient_id, birth_growth, growth_sexuality, feed, habits,
         peristaltic_conditions, psychological_conditions, children_complaint, venereal_disease,
         accident_surgical_operation, medical_intolerance, mental_illness, parents_status_health,
         brothers_status_health, spouse_childs_status_health, family_illness)
         VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11, ?12, ?13, ?14, ?15, ?16)",
        params![
            patient_id,
            a.birth_growth,
            a.growth_sexuality,
            a.feed,
            a.habits,
            a.peristaltic_conditions,
            a.psychological_conditions,
            a.children_complaint,
            a.venereal_disease,
            a.accident_surgical_operation,
            a.medical_intolerance,
            a.mental_illness,
            a.parents_status_health,
            a.brothers_status_health,
            a.spouse_childs_status_health,
            a.family_illness,
        ],
    )
    .map_err(|e| duplicate_history(e, patient_id))?;

    tracing::info!(patient_id, "Antecedents created");
    get_history_by_patient(conn, patient_id)?
        .ok_or_else(|| DatabaseError::not_found("history", patient_id))
}

/// A concurrent insert that lost the race hits `UNIQUE(patient_id)`.
fn duplicate_history(err: rusqlite::Error, patient_id: i64) -> DatabaseError {
    match err {
        rusqlite::Error::SqliteFailure(e, _)
            if e.extended_code == rusqlite::ffi::SQLITE_CONSTRAINT_UNIQUE =>
        {
            ValidationError::HistoryAlreadyExists(patient_id).into()
        }
        other => other.into(),
    }
}

pub fn update_history(
    conn: &Connection,
    patient_id: i64,
    antecedents: &Antecedents,
) -> Result<History, DatabaseError> {
    let a = antecedents;
    let changed = conn.execute(
        "UPDATE history SET birth_growth = ?1, growth_sexuality = ?2, feed = ?3, habits = ?4,
         peristaltic_conditions = ?5, psychological_conditions = ?6, children_complaint = ?7,
         venereal_disease = ?8, accident_surgical_operation = ?9, medical_intolerance = ?10,
         mental_illness = ?11, parents_status_health = ?12, brothers_status_health = ?13,
         spouse_childs_status_health = ?14, family_illness = ?15
         WHERE patient_id = ?16",
        params![
            a.birth_growth,
            a.growth_sexuality,
            a.feed,
            a.habits,
            a.peristaltic_conditions,
            a.psychological_conditions,
            a.children_complaint,
            a.venereal_disease,
            a.accident_surgical_operation,
            a.medical_intolerance,
            a.mental_illness,
            a.parents_status_health,
            a.brothers_status_health,
            a.spouse_childs_status_health,
            a.family_illness,
            patient_id,
        ],
    )?;
    if changed == 0 {
        return Err(DatabaseError::not_found("history", patient_id));
    }

    tracing::info!(patient_id, "Antecedents updated");
    get_history_by_patient(conn, patient_id)?
        .ok_or_else(|| DatabaseError::not_found("history", patient_id))
}

pub fn get_history_by_patient(
    conn: &Connection,
    patient_id: i64,
) -> Result<Option<History>, DatabaseError> {
    let sql = format!("SELECT {HISTORY_COLUMNS} FROM history WHERE patient_id = ?1");
    let mut stmt = conn.prepare(&sql)?;
    match stmt.query_row(params![patient_id], history_from_row) {
        Ok(history) => Ok(Some(history)),
        Err(rusqlite::Error::QueryReturnedNoRows) => Ok(None),
        Err(e) => Err(e.into()),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::open_memory_database;

    #[test]
    fn unique_violation_maps_to_already_exists() {
        let conn = open_memory_database().unwrap();
        let patient = crate::db::insert_patient(&conn, &PatientInput {
            first_name: "John".into(),
            last_name: "Doe".into(),
            ..Default::default()
        })
        .unwrap();
        insert_history(&conn, patient.id, &Antecedents::default()).unwrap();

        // Same row the losing writer would attempt after its existence check passed.
        let err = conn
            .execute("INSERT INTO history (patient_id) VALUES (?1)", params![patient.id])
            .unwrap_err();
        assert!(matches!(
            duplicate_history(err, patient.id),
            DatabaseError::Validation(ValidationError::HistoryAlreadyExists(id)) if id == patient.id
        ));
    }

    #[test]
    fn other_failures_pass_through() {
        let conn = open_memory_database().unwrap();
        let err = conn
            .execute("INSERT INTO history (patient_id) VALUES (?1)", params![999])
            .unwrap_err();
        assert!(matches!(duplicate_history(err, 999), DatabaseError::Sqlite(_)));
    }
}
