//! Patient endpoints: CRUD, search, relatives and the medical report.

use axum::extract::{Path, Query, State};
use axum::http::{header, StatusCode};
use axum::response::{IntoResponse, Redirect};
use axum::Json;
use serde::Serialize;

use crate::api::error::ApiError;
use crate::api::types::{non_blank, ApiContext, LinkSelection, PatientSearchQuery, TextQuery};
use crate::db::{self, DatabaseError};
use crate::models::{Page, Patient, PatientDetail, PatientInput, PatientSearchField, TestDocument};
use crate::report::{self, MedicalReport};

#[derive(Serialize)]
pub struct PatientSearchResponse {
    pub search_type: Option<String>,
    pub search_text: String,
    /// `None` until a search field is chosen.
    pub results: Option<Page<Patient>>,
}

pub(crate) fn detail_url(patient: &Patient) -> String {
    format!("/api/patients/{}/detail/{}", patient.id, patient.slug())
}

pub(crate) fn require_patient(
    conn: &rusqlite::Connection,
    id: i64,
) -> Result<Patient, ApiError> {
    db::get_patient(conn, id)?.ok_or_else(|| DatabaseError::not_found("patient", id).into())
}

/// `GET /api/patients`: search by one allow-listed field.
pub async fn list(
    State(ctx): State<ApiContext>,
    Query(query): Query<PatientSearchQuery>,
) -> Result<Json<PatientSearchResponse>, ApiError> {
    let search_text = query.search_text.clone().unwrap_or_default();
    let Some(search_type) = non_blank(query.search_type.as_deref()) else {
        return Ok(Json(PatientSearchResponse {
            search_type: None,
            search_text,
            results: None,
        }));
    };

    let field: PatientSearchField = search_type.parse()?;
    let conn = ctx.core.open_db()?;
    let results =
        db::search_patients_by_field(&conn, field, &search_text, ctx.page(query.page))?;

    Ok(Json(PatientSearchResponse {
        search_type: Some(search_type.to_string()),
        search_text,
        results: Some(results),
    }))
}

/// `GET /api/search/patients?q=`: free text over the name fields.
pub async fn search(
    State(ctx): State<ApiContext>,
    Query(query): Query<TextQuery>,
) -> Result<Json<Page<Patient>>, ApiError> {
    let conn = ctx.core.open_db()?;
    let page = db::search_patients(&conn, non_blank(query.q.as_deref()), ctx.page(query.page))?;
    Ok(Json(page))
}

/// `POST /api/patients`
pub async fn create(
    State(ctx): State<ApiContext>,
    Json(input): Json<PatientInput>,
) -> Result<impl IntoResponse, ApiError> {
    let conn = ctx.core.open_db()?;
    let patient = db::insert_patient(&conn, &input)?;
    let location = detail_url(&patient);
    Ok((
        StatusCode::CREATED,
        [(header::LOCATION, location)],
        Json(PatientDetail::from(patient)),
    ))
}

/// `GET /api/patients/:id`: redirect to the canonical detail URL.
pub async fn canonical(
    State(ctx): State<ApiContext>,
    Path(id): Path<i64>,
) -> Result<Redirect, ApiError> {
    let conn = ctx.core.open_db()?;
    let patient = require_patient(&conn, id)?;
    Ok(Redirect::to(&detail_url(&patient)))
}

/// `GET /api/patients/:id/detail/:slug`: the slug is not checked.
pub async fn detail(
    State(ctx): State<ApiContext>,
    Path((id, _slug)): Path<(i64, String)>,
) -> Result<Json<PatientDetail>, ApiError> {
    let conn = ctx.core.open_db()?;
    Ok(Json(require_patient(&conn, id)?.into()))
}

/// `PUT /api/patients/:id`
pub async fn update(
    State(ctx): State<ApiContext>,
    Path(id): Path<i64>,
    Json(input): Json<PatientInput>,
) -> Result<Json<PatientDetail>, ApiError> {
    let conn = ctx.core.open_db()?;
    Ok(Json(db::update_patient(&conn, id, &input)?.into()))
}

/// `DELETE /api/patients/:id`: cascades to history, problems and tests.
pub async fn delete(
    State(ctx): State<ApiContext>,
    Path(id): Path<i64>,
) -> Result<StatusCode, ApiError> {
    ctx.core.delete_patient(id)?;
    Ok(StatusCode::NO_CONTENT)
}

/// `GET /api/patients/:id/report`
pub async fn report(
    State(ctx): State<ApiContext>,
    Path(id): Path<i64>,
) -> Result<Json<MedicalReport>, ApiError> {
    let conn = ctx.core.open_db()?;
    Ok(Json(report::medical_report(&conn, id)?))
}

/// `GET /api/patients/:id/relatives`
pub async fn relatives(
    State(ctx): State<ApiContext>,
    Path(id): Path<i64>,
) -> Result<Json<Vec<Patient>>, ApiError> {
    let conn = ctx.core.open_db()?;
    require_patient(&conn, id)?;
    Ok(Json(db::get_relatives(&conn, id)?))
}

/// `PUT /api/patients/:id/relatives`: replaces the whole set.
pub async fn set_relatives(
    State(ctx): State<ApiContext>,
    Path(id): Path<i64>,
    Json(selection): Json<LinkSelection>,
) -> Result<Json<Vec<Patient>>, ApiError> {
    let mut conn = ctx.core.open_db()?;
    Ok(Json(db::set_relatives(&mut conn, id, &selection.ids)?))
}

/// `GET /api/patients/:id/tests`: tests across all of the patient's problems.
pub async fn tests(
    State(ctx): State<ApiContext>,
    Path(id): Path<i64>,
) -> Result<Json<Vec<TestDocument>>, ApiError> {
    let conn = ctx.core.open_db()?;
    require_patient(&conn, id)?;
    Ok(Json(db::tests_for_patient(&conn, id)?))
}
