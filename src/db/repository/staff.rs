use rusqlite::{params, Connection, Row};

use super::{enum_column, now};
use crate::db::DatabaseError;
use crate::models::*;

const STAFF_COLUMNS: &str = "s.id, s.username, s.first_name, s.last_name, s.last_name_optional,
     s.email, s.collegiate_number, s.tin, s.address, s.phone_contact, s.staff_type,
     s.is_active, s.date_joined";

pub(crate) fn staff_from_row(row: &Row<'_>) -> rusqlite::Result<Staff> {
    Ok(Staff {
        id: row.get(0)?,
        username: row.get(1)?,
        first_name: row.get(2)?,
        last_name: row.get(3)?,
        last_name_optional: row.get(4)?,
        email: row.get(5)?,
        collegiate_number: row.get(6)?,
        tin: row.get(7)?,
        address: row.get(8)?,
        phone_contact: row.get(9)?,
        staff_type: enum_column(row, 10)?,
        is_active: row.get::<_, i32>(11)? != 0,
        date_joined: row.get(12)?,
    })
}

pub fn insert_staff(conn: &Connection, input: &StaffInput) -> Result<Staff, DatabaseError> {
    input.validate()?;
    conn.execute(
        "INSERT INTO staff (username, first_name, last_name, last_name_optional, email,
         collegiate_number, tin, address, phone_contact, staff_type, is_active, date_joined)
         VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11, ?12)",
        params![
            input.username.trim(),
            input.first_name,
            input.last_name,
            input.last_name_optional,
            input.email,
            input.collegiate_number,
            input.tin,
            input.address,
            input.phone_contact,
            input.staff_type.as_str(),
            input.is_active as i32,
            now(),
        ],
    )
    .map_err(|e| unique_username(e, &input.username))?;

    let id = conn.last_insert_rowid();
    tracing::info!(staff_id = id, staff_type = input.staff_type.as_str(), "Staff member created");
    get_staff(conn, id)?.ok_or_else(|| DatabaseError::not_found("staff", id))
}

pub fn update_staff(conn: &Connection, id: i64, input: &StaffInput) -> Result<Staff, DatabaseError> {
    input.validate()?;
    let changed = conn
        .execute(
            "UPDATE staff SET username = ?1, first_name = ?2, last_name = ?3,
             last_name_optional = ?4, email = ?5, collegiate_number = ?6, tin = ?7,
             address = ?8, phone_contact = ?9, staff_type = ?10, is_active = ?11
             WHERE id = ?12",
            params![
                input.username.trim(),
                input.first_name,
                input.last_name,
                input.last_name_optional,
                input.email,
                input.collegiate_number,
                input.tin,
                input.address,
                input.phone_contact,
                input.staff_type.as_str(),
                input.is_active as i32,
                id,
            ],
        )
        .map_err(|e| unique_username(e, &input.username))?;
    if changed == 0 {
        return Err(DatabaseError::not_found("staff", id));
    }
    tracing::info!(staff_id = id, "Staff member updated");
    get_staff(conn, id)?.ok_or_else(|| DatabaseError::not_found("staff", id))
}

fn unique_username(err: rusqlite::Error, username: &str) -> DatabaseError {
    match err {
        rusqlite::Error::SqliteFailure(e, _)
            if e.code == rusqlite::ErrorCode::ConstraintViolation =>
        {
            DatabaseError::ConstraintViolation(format!("username '{username}' is already taken"))
        }
        other => other.into(),
    }
}

pub fn get_staff(conn: &Connection, id: i64) -> Result<Option<Staff>, DatabaseError> {
    let sql = format!("SELECT {STAFF_COLUMNS} FROM staff s WHERE s.id = ?1");
    let mut stmt = conn.prepare(&sql)?;
    match stmt.query_row(params![id], staff_from_row) {
        Ok(staff) => Ok(Some(staff)),
        Err(rusqlite::Error::QueryReturnedNoRows) => Ok(None),
        Err(e) => Err(e.into()),
    }
}

/// Delete a staff member. Patients and problems pointing at them keep
/// existing with the reference cleared.
pub fn delete_staff(conn: &Connection, id: i64) -> Result<(), DatabaseError> {
    let deleted = conn.execute("DELETE FROM staff WHERE id = ?1", params![id])?;
    if deleted == 0 {
        return Err(DatabaseError::not_found("staff", id));
    }
    tracing::info!(staff_id = id, "Staff member deleted");
    Ok(())
}

pub fn list_staff(conn: &Connection, filter: &StaffFilter) -> Result<Vec<Staff>, DatabaseError> {
    let mut sql = format!("SELECT {STAFF_COLUMNS} FROM staff s WHERE 1 = 1");
    if filter.staff_type.is_some() {
        sql.push_str(" AND s.staff_type = ?1");
    }
    if filter.active_only {
        sql.push_str(" AND s.is_active = 1");
    }
    sql.push_str(" ORDER BY s.username");

    let mut stmt = conn.prepare(&sql)?;
    let rows = match filter.staff_type {
        Some(staff_type) => stmt.query_map(params![staff_type.as_str()], staff_from_row)?,
        None => stmt.query_map([], staff_from_row)?,
    };
    rows.map(|r| r.map_err(DatabaseError::from)).collect()
}

pub fn get_doctors(conn: &Connection) -> Result<Vec<Staff>, DatabaseError> {
    list_staff(conn, &StaffFilter { staff_type: Some(StaffType::Doctor), active_only: false })
}

pub fn get_administratives(conn: &Connection) -> Result<Vec<Staff>, DatabaseError> {
    list_staff(
        conn,
        &StaffFilter { staff_type: Some(StaffType::Administrative), active_only: false },
    )
}

/// Resolve an optional staff reference that must point at a doctor.
pub(crate) fn require_doctor(conn: &Connection, id: Option<i64>) -> Result<(), DatabaseError> {
    let Some(id) = id else {
        return Ok(());
    };
    let staff = get_staff(conn, id)?.ok_or_else(|| DatabaseError::not_found("staff", id))?;
    if !staff.is_doctor() {
        return Err(ValidationError::NotADoctor(id).into());
    }
    Ok(())
}

/// Resolve an optional staff reference of any type.
pub(crate) fn require_staff(conn: &Connection, id: Option<i64>) -> Result<(), DatabaseError> {
    match id {
        Some(id) if get_staff(conn, id)?.is_none() => Err(DatabaseError::not_found("staff", id)),
        _ => Ok(()),
    }
}
