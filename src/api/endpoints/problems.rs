//! Problem endpoints: per-patient opened/closed listings, CRUD, connections
//! and field search.

use axum::extract::{Path, Query, State};
use axum::http::StatusCode;
use axum::Json;
use serde::Serialize;

use crate::api::endpoints::patients::require_patient;
use crate::api::error::ApiError;
use crate::api::types::{non_blank, ApiContext, LinkSelection, PageQuery, ProblemSearchQuery};
use crate::db::{self, DatabaseError, ProblemState};
use crate::models::{Page, Patient, Problem, ProblemDraft, ProblemInput, ProblemSearchField};

#[derive(Serialize)]
pub struct PatientProblems {
    pub patient: Patient,
    pub problems: Page<Problem>,
}

#[derive(Serialize)]
pub struct ProblemDetail {
    #[serde(flatten)]
    pub problem: Problem,
    pub display_name: String,
    pub patient: Patient,
}

#[derive(Serialize)]
pub struct ProblemSearchResponse {
    pub search_type_problem: Option<String>,
    pub search_text_problem: String,
    pub results: Option<Page<Problem>>,
}

fn require_problem(conn: &rusqlite::Connection, id: i64) -> Result<Problem, ApiError> {
    db::get_problem(conn, id)?.ok_or_else(|| DatabaseError::not_found("problem", id).into())
}

fn problems_page(
    ctx: &ApiContext,
    patient_id: i64,
    state: ProblemState,
    page: Option<u32>,
) -> Result<PatientProblems, ApiError> {
    let conn = ctx.core.open_db()?;
    let patient = require_patient(&conn, patient_id)?;
    let problems = db::problems_in_state_page(&conn, state, patient_id, ctx.page(page))?;
    Ok(PatientProblems { patient, problems })
}

/// `GET /api/patients/:id/problems`: opened problems, latest change first.
pub async fn opened(
    State(ctx): State<ApiContext>,
    Path(patient_id): Path<i64>,
    Query(query): Query<PageQuery>,
) -> Result<Json<PatientProblems>, ApiError> {
    Ok(Json(problems_page(&ctx, patient_id, ProblemState::Opened, query.page)?))
}

/// `GET /api/patients/:id/history`: closed problems, latest change first.
pub async fn closed(
    State(ctx): State<ApiContext>,
    Path(patient_id): Path<i64>,
    Query(query): Query<PageQuery>,
) -> Result<Json<PatientProblems>, ApiError> {
    Ok(Json(problems_page(&ctx, patient_id, ProblemState::Closed, query.page)?))
}

/// `GET /api/patients/:id/problems/new`: initial form values.
pub async fn new_form(
    State(ctx): State<ApiContext>,
    Path(patient_id): Path<i64>,
) -> Result<Json<ProblemDraft>, ApiError> {
    let conn = ctx.core.open_db()?;
    require_patient(&conn, patient_id)?;
    Ok(Json(ProblemDraft {
        patient_id,
        order_number: db::next_order_number(&conn, patient_id)?,
    }))
}

/// `POST /api/patients/:id/problems`: the order number is assigned here.
pub async fn create(
    State(ctx): State<ApiContext>,
    Path(patient_id): Path<i64>,
    Json(input): Json<ProblemInput>,
) -> Result<(StatusCode, Json<Problem>), ApiError> {
    let mut conn = ctx.core.open_db()?;
    let problem = db::insert_problem(&mut conn, patient_id, &input)?;
    Ok((StatusCode::CREATED, Json(problem)))
}

/// `GET /api/problems/:id`
pub async fn detail(
    State(ctx): State<ApiContext>,
    Path(id): Path<i64>,
) -> Result<Json<ProblemDetail>, ApiError> {
    let conn = ctx.core.open_db()?;
    let problem = require_problem(&conn, id)?;
    let patient = require_patient(&conn, problem.patient_id)?;
    Ok(Json(ProblemDetail {
        display_name: problem.display_name(),
        problem,
        patient,
    }))
}

/// `PUT /api/problems/:id`
pub async fn update(
    State(ctx): State<ApiContext>,
    Path(id): Path<i64>,
    Json(input): Json<ProblemInput>,
) -> Result<Json<Problem>, ApiError> {
    let conn = ctx.core.open_db()?;
    Ok(Json(db::update_problem(&conn, id, &input)?))
}

/// `DELETE /api/problems/:id`
pub async fn delete(
    State(ctx): State<ApiContext>,
    Path(id): Path<i64>,
) -> Result<StatusCode, ApiError> {
    ctx.core.delete_problem(id)?;
    Ok(StatusCode::NO_CONTENT)
}

/// `GET /api/problems/:id/connections`
pub async fn connections(
    State(ctx): State<ApiContext>,
    Path(id): Path<i64>,
) -> Result<Json<Vec<Problem>>, ApiError> {
    let conn = ctx.core.open_db()?;
    require_problem(&conn, id)?;
    Ok(Json(db::get_connections(&conn, id)?))
}

/// `PUT /api/problems/:id/connections`: replaces the whole set.
pub async fn set_connections(
    State(ctx): State<ApiContext>,
    Path(id): Path<i64>,
    Json(selection): Json<LinkSelection>,
) -> Result<Json<Vec<Problem>>, ApiError> {
    let mut conn = ctx.core.open_db()?;
    Ok(Json(db::set_connections(&mut conn, id, &selection.ids)?))
}

/// `GET /api/search/problems`: search by one allow-listed field.
pub async fn search(
    State(ctx): State<ApiContext>,
    Query(query): Query<ProblemSearchQuery>,
) -> Result<Json<ProblemSearchResponse>, ApiError> {
    let search_text_problem = query.search_text_problem.clone().unwrap_or_default();
    let Some(search_type) = non_blank(query.search_type_problem.as_deref()) else {
        return Ok(Json(ProblemSearchResponse {
            search_type_problem: None,
            search_text_problem,
            results: None,
        }));
    };

    let field: ProblemSearchField = search_type.parse()?;
    let conn = ctx.core.open_db()?;
    let results = db::search_problems_by_field(
        &conn,
        field,
        &search_text_problem,
        ctx.page(query.page),
    )?;

    Ok(Json(ProblemSearchResponse {
        search_type_problem: Some(search_type.to_string()),
        search_text_problem,
        results: Some(results),
    }))
}
