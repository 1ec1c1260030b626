//! Clinic header information.

use axum::extract::State;
use axum::Json;
use serde::Serialize;

use crate::api::types::ApiContext;
use crate::config::{self, ClinicInfo};

#[derive(Serialize)]
pub struct ClinicResponse {
    pub app_name: &'static str,
    pub version: &'static str,
    pub clinic: ClinicInfo,
}

/// `GET /api/clinic`: configured clinic details.
pub async fn info(State(ctx): State<ApiContext>) -> Json<ClinicResponse> {
    Json(ClinicResponse {
        app_name: config::APP_NAME,
        version: config::APP_VERSION,
        clinic: ctx.core.config.clinic.clone(),
    })
}
