//! Medical report: everything known about one patient in a single read.

use rusqlite::Connection;
use serde::Serialize;
use thiserror::Error;

use crate::db::{self, DatabaseError};
use crate::models::{History, PatientDetail, Problem};

#[derive(Debug, Clone, Serialize)]
pub struct MedicalReport {
    pub patient: PatientDetail,
    pub history: History,
    /// Opened problems, most recently modified first.
    pub problems: Vec<Problem>,
    /// Closed problems, most recently modified first.
    pub closed_problems: Vec<Problem>,
}

#[derive(Error, Debug)]
pub enum ReportError {
    #[error("Patient {0} not found")]
    PatientNotFound(i64),

    #[error("Patient {0} has no clinical history")]
    HistoryNotFound(i64),

    #[error(transparent)]
    Database(#[from] DatabaseError),
}

pub fn medical_report(conn: &Connection, patient_id: i64) -> Result<MedicalReport, ReportError> {
    let patient = db::get_patient(conn, patient_id)?.ok_or(ReportError::PatientNotFound(patient_id))?;
    let history = db::get_history_by_patient(conn, patient_id)?
        .ok_or(ReportError::HistoryNotFound(patient_id))?;

    Ok(MedicalReport {
        patient: patient.into(),
        history,
        problems: db::opened_problems(conn, patient_id)?,
        closed_problems: db::closed_problems(conn, patient_id)?,
    })
}
