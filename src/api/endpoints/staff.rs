//! Staff endpoints.

use axum::extract::{Path, Query, State};
use axum::http::StatusCode;
use axum::Json;

use crate::api::error::ApiError;
use crate::api::types::{ApiContext, StaffQuery};
use crate::db::{self, DatabaseError};
use crate::models::{Patient, Staff, StaffFilter, StaffInput};

/// `GET /api/staff?staff_type=doctor&active_only=true`
pub async fn list(
    State(ctx): State<ApiContext>,
    Query(query): Query<StaffQuery>,
) -> Result<Json<Vec<Staff>>, ApiError> {
    let conn = ctx.core.open_db()?;
    let filter = StaffFilter {
        staff_type: query.staff_type,
        active_only: query.active_only,
    };
    Ok(Json(db::list_staff(&conn, &filter)?))
}

/// `POST /api/staff`
pub async fn create(
    State(ctx): State<ApiContext>,
    Json(input): Json<StaffInput>,
) -> Result<(StatusCode, Json<Staff>), ApiError> {
    let conn = ctx.core.open_db()?;
    let staff = db::insert_staff(&conn, &input)?;
    Ok((StatusCode::CREATED, Json(staff)))
}

/// `GET /api/staff/:id`
pub async fn detail(
    State(ctx): State<ApiContext>,
    Path(id): Path<i64>,
) -> Result<Json<Staff>, ApiError> {
    let conn = ctx.core.open_db()?;
    let staff = db::get_staff(&conn, id)?.ok_or_else(|| DatabaseError::not_found("staff", id))?;
    Ok(Json(staff))
}

/// `PUT /api/staff/:id`
pub async fn update(
    State(ctx): State<ApiContext>,
    Path(id): Path<i64>,
    Json(input): Json<StaffInput>,
) -> Result<Json<Staff>, ApiError> {
    let conn = ctx.core.open_db()?;
    Ok(Json(db::update_staff(&conn, id, &input)?))
}

/// `DELETE /api/staff/:id`: assignments and problem authorship are cleared.
pub async fn delete(
    State(ctx): State<ApiContext>,
    Path(id): Path<i64>,
) -> Result<StatusCode, ApiError> {
    let conn = ctx.core.open_db()?;
    db::delete_staff(&conn, id)?;
    Ok(StatusCode::NO_CONTENT)
}

/// `GET /api/staff/:id/patients`: patients assigned to a doctor.
pub async fn patients(
    State(ctx): State<ApiContext>,
    Path(id): Path<i64>,
) -> Result<Json<Vec<Patient>>, ApiError> {
    let conn = ctx.core.open_db()?;
    if db::get_staff(&conn, id)?.is_none() {
        return Err(DatabaseError::not_found("staff", id).into());
    }
    Ok(Json(db::patients_assigned_to(&conn, id)?))
}
