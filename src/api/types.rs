//! Shared types for the API layer: router state and query strings.

use std::sync::Arc;

use serde::Deserialize;

use crate::api::error::ApiError;
use crate::core_state::CoreState;
use crate::models::{PageRequest, StaffType};

/// Router state handed to every handler.
#[derive(Clone)]
pub struct ApiContext {
    pub core: Arc<CoreState>,
}

impl ApiContext {
    pub fn new(core: Arc<CoreState>) -> Self {
        Self { core }
    }

    /// Page request using the configured page size.
    pub fn page(&self, page: Option<u32>) -> PageRequest {
        PageRequest::new(page, self.core.config.page_size)
    }
}

#[derive(Debug, Default, Deserialize)]
pub struct PageQuery {
    pub page: Option<u32>,
}

/// Field search over patients: `search_type` names the field.
#[derive(Debug, Default, Deserialize)]
pub struct PatientSearchQuery {
    pub search_type: Option<String>,
    pub search_text: Option<String>,
    pub page: Option<u32>,
}

/// Field search over problems.
#[derive(Debug, Default, Deserialize)]
pub struct ProblemSearchQuery {
    pub search_type_problem: Option<String>,
    pub search_text_problem: Option<String>,
    pub page: Option<u32>,
}

/// Free text (`q`) with optional paging; shared by search and lookups.
#[derive(Debug, Default, Deserialize)]
pub struct TextQuery {
    pub q: Option<String>,
    pub page: Option<u32>,
}

/// Comma-separated ids, e.g. `?ids=1,2,3`.
#[derive(Debug, Default, Deserialize)]
pub struct IdsQuery {
    #[serde(default)]
    pub ids: String,
}

impl IdsQuery {
    pub fn parse(&self) -> Result<Vec<i64>, ApiError> {
        self.ids
            .split(',')
            .map(str::trim)
            .filter(|s| !s.is_empty())
            .map(|s| {
                s.parse::<i64>()
                    .map_err(|_| ApiError::BadRequest(format!("Invalid id: {s}")))
            })
            .collect()
    }
}

#[derive(Debug, Default, Deserialize)]
pub struct StaffQuery {
    pub staff_type: Option<StaffType>,
    #[serde(default)]
    pub active_only: bool,
}

/// Full replacement set for relatives or connections.
#[derive(Debug, Deserialize)]
pub struct LinkSelection {
    #[serde(default)]
    pub ids: Vec<i64>,
}

/// Trimmed, non-empty value of an optional query parameter.
pub fn non_blank(value: Option<&str>) -> Option<&str> {
    value.map(str::trim).filter(|v| !v.is_empty())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn ids_parse_skips_blanks() {
        let query = IdsQuery { ids: "3, 1,,2".into() };
        assert_eq!(query.parse().unwrap(), vec![3, 1, 2]);
        assert!(IdsQuery::default().parse().unwrap().is_empty());
    }

    #[test]
    fn ids_parse_rejects_garbage() {
        let query = IdsQuery { ids: "1,abc".into() };
        assert!(matches!(query.parse(), Err(ApiError::BadRequest(_))));
    }

    #[test]
    fn non_blank_filters_whitespace() {
        assert_eq!(non_blank(Some("  ")), None);
        assert_eq!(non_blank(Some(" last_name ")), Some("last_name"));
        assert_eq!(non_blank(None), None);
    }
}
