//! Symmetric self-referential links: patient relatives and problem connections.
//!
//! Each link is stored in both directions so either side can be listed with a
//! single indexed lookup. An entity never links to itself: its own id is
//! dropped from every submitted set, and the schema rejects the row anyway.

use std::collections::BTreeSet;

use rusqlite::{params, Connection};

use super::patient::{patient_from_row, PATIENT_COLUMNS};
use super::problem::{problem_from_row, PROBLEM_COLUMNS};
use crate::db::DatabaseError;
use crate::models::*;

/// Layout of a symmetric link table.
struct LinkTable {
    table: &'static str,
    owner: &'static str,
    other: &'static str,
    entity_table: &'static str,
}

const RELATIVES: LinkTable = LinkTable {
    table: "patient_relatives",
    owner: "patient_id",
    other: "relative_id",
    entity_table: "patient",
};

const CONNECTIONS: LinkTable = LinkTable {
    table: "problem_connections",
    owner: "problem_id",
    other: "connected_id",
    entity_table: "problem",
};

/// Remove the owner's own id and duplicates from a submitted selection.
pub fn exclude_self(owner_id: i64, ids: &[i64]) -> Vec<i64> {
    ids.iter()
        .copied()
        .filter(|id| *id != owner_id)
        .collect::<BTreeSet<_>>()
        .into_iter()
        .collect()
}

fn exists(conn: &Connection, table: &str, id: i64) -> Result<bool, DatabaseError> {
    let sql = format!("SELECT EXISTS(SELECT 1 FROM {table} WHERE id = ?1)");
    Ok(conn.query_row(&sql, params![id], |row| row.get::<_, bool>(0))?)
}

/// Replace the full link set of `owner_id` in one transaction. The owner's
/// `modified` timestamp moves with the edit.
fn replace_links(
    conn: &mut Connection,
    link: &LinkTable,
    owner_id: i64,
    ids: &[i64],
) -> Result<Vec<i64>, DatabaseError> {
    let selected = exclude_self(owner_id, ids);
    let tx = conn.transaction()?;

    if !exists(&tx, link.entity_table, owner_id)? {
        return Err(DatabaseError::not_found(link.entity_table, owner_id));
    }
    for id in &selected {
        if !exists(&tx, link.entity_table, *id)? {
            return Err(DatabaseError::not_found(link.entity_table, *id));
        }
    }

    tx.execute(
        &format!(
            "DELETE FROM {} WHERE {} = ?1 OR {} = ?1",
            link.table, link.owner, link.other
        ),
        params![owner_id],
    )?;
    tx.execute(
        &format!("UPDATE {} SET modified = ?1 WHERE id = ?2", link.entity_table),
        params![super::now(), owner_id],
    )?;
    {
        let mut insert = tx.prepare(&format!(
            "INSERT OR IGNORE INTO {} ({}, {}) VALUES (?1, ?2)",
            link.table, link.owner, link.other
        ))?;
        for id in &selected {
            insert.execute(params![owner_id, id])?;
            insert.execute(params![id, owner_id])?;
        }
    }
    tx.commit()?;

    tracing::info!(
        table = link.table,
        owner_id,
        links = selected.len(),
        "Link set replaced"
    );
    Ok(selected)
}

pub fn get_relatives(conn: &Connection, patient_id: i64) -> Result<Vec<Patient>, DatabaseError> {
    let sql = format!(
        "SELECT {PATIENT_COLUMNS} FROM patient p
         JOIN patient_relatives r ON r.relative_id = p.id
         WHERE r.patient_id = ?1 ORDER BY p.first_name, p.id"
    );
    let mut stmt = conn.prepare(&sql)?;
    let rows = stmt.query_map(params![patient_id], patient_from_row)?;
    rows.map(|r| r.map_err(DatabaseError::from)).collect()
}

/// Replace the relatives of a patient. Returns the saved relatives.
pub fn set_relatives(
    conn: &mut Connection,
    patient_id: i64,
    relative_ids: &[i64],
) -> Result<Vec<Patient>, DatabaseError> {
    replace_links(conn, &RELATIVES, patient_id, relative_ids)?;
    get_relatives(conn, patient_id)
}

pub fn get_connections(conn: &Connection, problem_id: i64) -> Result<Vec<Problem>, DatabaseError> {
    let sql = format!(
        "SELECT {PROBLEM_COLUMNS} FROM problem pr
         JOIN problem_connections c ON c.connected_id = pr.id
         WHERE c.problem_id = ?1 ORDER BY pr.wording, pr.id"
    );
    let mut stmt = conn.prepare(&sql)?;
    let rows = stmt.query_map(params![problem_id], problem_from_row)?;
    rows.map(|r| r.map_err(DatabaseError::from)).collect()
}

/// Replace the connections of a problem. Returns the saved connections.
pub fn set_connections(
    conn: &mut Connection,
    problem_id: i64,
    connected_ids: &[i64],
) -> Result<Vec<Problem>, DatabaseError> {
    replace_links(conn, &CONNECTIONS, problem_id, connected_ids)?;
    get_connections(conn, problem_id)
}
