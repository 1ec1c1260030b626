//! Antecedents (clinical history) endpoints.

use axum::extract::{Path, State};
use axum::http::StatusCode;
use axum::response::{IntoResponse, Redirect, Response};
use axum::Json;
use serde::Serialize;

use crate::api::endpoints::patients::require_patient;
use crate::api::error::ApiError;
use crate::api::types::ApiContext;
use crate::db;
use crate::models::{Antecedents, History, Patient};

#[derive(Serialize)]
pub struct PatientHistory {
    pub patient: Patient,
    pub history: History,
}

#[derive(Serialize)]
pub struct HistoryForm {
    pub patient: Patient,
    pub antecedents: Antecedents,
}

pub(crate) fn add_url(patient_id: i64) -> String {
    format!("/api/patients/{patient_id}/history/antecedents/add")
}

/// `GET /api/patients/:id/history/antecedents`
///
/// Redirects to the creation form while the patient has no history.
pub async fn detail(
    State(ctx): State<ApiContext>,
    Path(patient_id): Path<i64>,
) -> Result<Response, ApiError> {
    let conn = ctx.core.open_db()?;
    let patient = require_patient(&conn, patient_id)?;
    match db::get_history_by_patient(&conn, patient_id)? {
        Some(history) => Ok(Json(PatientHistory { patient, history }).into_response()),
        None => {
            tracing::debug!(patient_id, "No history yet, redirecting to creation");
            Ok(Redirect::to(&add_url(patient_id)).into_response())
        }
    }
}

/// `GET /api/patients/:id/history/antecedents/add`: blank form in patient context.
pub async fn add_form(
    State(ctx): State<ApiContext>,
    Path(patient_id): Path<i64>,
) -> Result<Json<HistoryForm>, ApiError> {
    let conn = ctx.core.open_db()?;
    let patient = require_patient(&conn, patient_id)?;
    Ok(Json(HistoryForm {
        patient,
        antecedents: Antecedents::default(),
    }))
}

/// `POST /api/patients/:id/history/antecedents/add`
pub async fn create(
    State(ctx): State<ApiContext>,
    Path(patient_id): Path<i64>,
    Json(antecedents): Json<Antecedents>,
) -> Result<(StatusCode, Json<History>), ApiError> {
    let conn = ctx.core.open_db()?;
    let history = db::insert_history(&conn, patient_id, &antecedents)?;
    Ok((StatusCode::CREATED, Json(history)))
}

/// `PUT /api/patients/:id/history/antecedents`
pub async fn update(
    State(ctx): State<ApiContext>,
    Path(patient_id): Path<i64>,
    Json(antecedents): Json<Antecedents>,
) -> Result<Json<History>, ApiError> {
    let conn = ctx.core.open_db()?;
    Ok(Json(db::update_history(&conn, patient_id, &antecedents)?))
}
