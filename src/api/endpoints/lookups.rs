//! Autocomplete lookups. Read-only: lookups never create entities.

use axum::extract::{Query, State};
use axum::Json;
use serde::Serialize;

use crate::api::error::ApiError;
use crate::api::types::{non_blank, ApiContext, IdsQuery, TextQuery};
use crate::db;
use crate::models::{Patient, Problem};

#[derive(Debug, Serialize)]
pub struct LookupItem {
    pub id: i64,
    pub label: String,
}

impl From<&Patient> for LookupItem {
    fn from(patient: &Patient) -> Self {
        Self { id: patient.id, label: patient.display_name() }
    }
}

impl From<&Problem> for LookupItem {
    fn from(problem: &Problem) -> Self {
        Self { id: problem.id, label: problem.display_name() }
    }
}

/// `GET /api/lookups/patients?q=`
pub async fn patients(
    State(ctx): State<ApiContext>,
    Query(query): Query<TextQuery>,
) -> Result<Json<Vec<LookupItem>>, ApiError> {
    let Some(q) = non_blank(query.q.as_deref()) else {
        return Ok(Json(Vec::new()));
    };
    let conn = ctx.core.open_db()?;
    let found = db::lookup_patients(&conn, q)?;
    Ok(Json(found.iter().map(LookupItem::from).collect()))
}

/// `GET /api/lookups/problems?q=`
pub async fn problems(
    State(ctx): State<ApiContext>,
    Query(query): Query<TextQuery>,
) -> Result<Json<Vec<LookupItem>>, ApiError> {
    let Some(q) = non_blank(query.q.as_deref()) else {
        return Ok(Json(Vec::new()));
    };
    let conn = ctx.core.open_db()?;
    let found = db::lookup_problems(&conn, q)?;
    Ok(Json(found.iter().map(LookupItem::from).collect()))
}

/// `GET /api/lookups/patients/objects?ids=1,2`: ordered by first name.
pub async fn patient_objects(
    State(ctx): State<ApiContext>,
    Query(query): Query<IdsQuery>,
) -> Result<Json<Vec<Patient>>, ApiError> {
    let ids = query.parse()?;
    let conn = ctx.core.open_db()?;
    Ok(Json(db::resolve_patients(&conn, &ids)?))
}

/// `GET /api/lookups/problems/objects?ids=1,2`: ordered by wording.
pub async fn problem_objects(
    State(ctx): State<ApiContext>,
    Query(query): Query<IdsQuery>,
) -> Result<Json<Vec<Problem>>, ApiError> {
    let ids = query.parse()?;
    let conn = ctx.core.open_db()?;
    Ok(Json(db::resolve_problems(&conn, &ids)?))
}
