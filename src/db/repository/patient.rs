use rusqlite::{params, Connection, Row};

use super::staff::require_doctor;
use super::{now, optional_enum_column};
use crate::db::DatabaseError;
use crate::models::*;

pub(crate) const PATIENT_COLUMNS: &str = "p.id, p.first_name, p.last_name, p.last_name_optional,
     p.address, p.phone_contact, p.gender, p.race, p.birth_date, p.birth_place, p.decease_date,
     p.tin, p.ssn, p.health_card_number, p.family_situation, p.labour_situation, p.education,
     p.insurance_company, p.doctor_assigned_id, p.created, p.modified";

/// Listing order for patients.
pub(crate) const PATIENT_ORDER: &str = "p.last_name, p.first_name, p.id";

pub(crate) fn patient_from_row(row: &Row<'_>) -> rusqlite::Result<Patient> {
    Ok(Patient {
        id: row.get(0)?,
        data: PatientInput {
            first_name: row.get(1)?,
            last_name: row.get(2)?,
            last_name_optional: row.get(3)?,
            address: row.get(4)?,
            phone_contact: row.get(5)?,
            gender: optional_enum_column(row, 6)?,
            race: row.get(7)?,
            birth_date: row.get(8)?,
            birth_place: row.get(9)?,
            decease_date: row.get(10)?,
            tin: row.get(11)?,
            ssn: row.get(12)?,
            health_card_number: row.get(13)?,
            family_situation: row.get(14)?,
            labour_situation: row.get(15)?,
            education: row.get(16)?,
            insurance_company: row.get(17)?,
            doctor_assigned_id: row.get(18)?,
        },
        created: row.get(19)?,
        modified: row.get(20)?,
    })
}

pub fn insert_patient(conn: &Connection, input: &PatientInput) -> Result<Patient, DatabaseError> {
    input.validate()?;
    require_doctor(conn, input.doctor_assigned_id)?;

    let ts = now();
    conn.execute(
        "INSERT INTO patient (first_name, last_name, last_name_optional, address, phone_contact,
         gender, race, birth_date, birth_place, decease_date, tin, ssn, health_card_number,
         family_situation, labour_situation, education, insurance_company, doctor_assigned_id,
         created, modified)
         VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11, ?12, ?13, ?14, ?15, ?16, ?17, ?18, ?19, ?20)",
        params![
            input.first_name.trim(),
            input.last_name.trim(),
            input.last_name_optional,
            input.address,
            input.phone_contact,
            input.gender.map(|g| g.as_str()),
            input.race,
            input.birth_date,
            input.birth_place,
            input.decease_date,
            input.tin,
            input.ssn,
            input.health_card_number,
            input.family_situation,
            input.labour_situation,
            input.education,
            input.insurance_company,
            input.doctor_assigned_id,
            ts,
            ts,
        ],
    )?;

    let id = conn.last_insert_rowid();
    tracing::info!(patient_id = id, "Patient created");
    get_patient(conn, id)?.ok_or_else(|| DatabaseError::not_found("patient", id))
}

pub fn update_patient(
    conn: &Connection,
    id: i64,
    input: &PatientInput,
) -> Result<Patient, DatabaseError> {
    input.validate()?;
    require_doctor(conn, input.doctor_assigned_id)?;

    let changed = conn.execute(
        "UPDATE patient SET first_name = ?1, last_name = ?2, last_name_optional = ?3,
         address = ?4, phone_contact = ?5, gender = ?6, race = ?7, birth_date = ?8,
         birth_place = ?9, decease_date = ?10, tin = ?11, ssn = ?12, health_card_number = ?13,
         family_situation = ?14, labour_situation = ?15, education = ?16,
         insurance_company = ?17, doctor_assigned_id = ?18, modified = ?19
         WHERE id = ?20",
        params![
            input.first_name.trim(),
            input.last_name.trim(),
            input.last_name_optional,
            input.address,
            input.phone_contact,
            input.gender.map(|g| g.as_str()),
            input.race,
            input.birth_date,
            input.birth_place,
            input.decease_date,
            input.tin,
            input.ssn,
            input.health_card_number,
            input.family_situation,
            input.labour_situation,
            input.education,
            input.insurance_company,
            input.doctor_assigned_id,
            now(),
            id,
        ],
    )?;
    if changed == 0 {
        return Err(DatabaseError::not_found("patient", id));
    }

    tracing::info!(patient_id = id, "Patient updated");
    get_patient(conn, id)?.ok_or_else(|| DatabaseError::not_found("patient", id))
}

pub fn get_patient(conn: &Connection, id: i64) -> Result<Option<Patient>, DatabaseError> {
    let sql = format!("SELECT {PATIENT_COLUMNS} FROM patient p WHERE p.id = ?1");
    let mut stmt = conn.prepare(&sql)?;
    match stmt.query_row(params![id], patient_from_row) {
        Ok(patient) => Ok(Some(patient)),
        Err(rusqlite::Error::QueryReturnedNoRows) => Ok(None),
        Err(e) => Err(e.into()),
    }
}

/// Delete a patient together with its history, problems, tests and relation rows.
///
/// Returns the stored document paths of the tests that went with it; the
/// files themselves are left for the caller to remove.
pub fn delete_patient(conn: &mut Connection, id: i64) -> Result<Vec<String>, DatabaseError> {
    let tx = conn.transaction()?;

    let documents = {
        let mut stmt = tx.prepare(
            "SELECT t.document FROM test t JOIN problem pr ON pr.id = t.problem_id
             WHERE pr.patient_id = ?1",
        )?;
        let rows = stmt.query_map(params![id], |row| row.get::<_, String>(0))?;
        rows.collect::<Result<Vec<_>, _>>()?
    };

    let deleted = tx.execute("DELETE FROM patient WHERE id = ?1", params![id])?;
    if deleted == 0 {
        return Err(DatabaseError::not_found("patient", id));
    }
    tx.commit()?;

    tracing::info!(patient_id = id, tests_removed = documents.len(), "Patient deleted");
    Ok(documents)
}

pub fn count_patients(conn: &Connection) -> Result<i64, DatabaseError> {
    Ok(conn.query_row("SELECT COUNT(*) FROM patient", [], |row| row.get(0))?)
}

pub fn list_patients(conn: &Connection, page: PageRequest) -> Result<Page<Patient>, DatabaseError> {
    let sql = format!(
        "SELECT {PATIENT_COLUMNS} FROM patient p ORDER BY {PATIENT_ORDER} LIMIT ?1 OFFSET ?2"
    );
    let mut stmt = conn.prepare(&sql)?;
    let rows = stmt.query_map(params![page.limit(), page.offset()], patient_from_row)?;
    let items = rows.collect::<Result<Vec<_>, _>>()?;
    Ok(Page::new(items, page, count_patients(conn)?))
}

/// Patients whose assigned doctor is the given staff member.
pub fn patients_assigned_to(conn: &Connection, staff_id: i64) -> Result<Vec<Patient>, DatabaseError> {
    let sql = format!(
        "SELECT {PATIENT_COLUMNS} FROM patient p WHERE p.doctor_assigned_id = ?1
         ORDER BY {PATIENT_ORDER}"
    );
    let mut stmt = conn.prepare(&sql)?;
    let rows = stmt.query_map(params![staff_id], patient_from_row)?;
    rows.map(|r| r.map_err(DatabaseError::from)).collect()
}
