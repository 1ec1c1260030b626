use chrono::NaiveDateTime;
use serde::{Deserialize, Serialize};

use super::validation::{max_len, require, ValidationError};

/// A medical problem (encounter) of a patient.
///
/// Open while `closing_date` is null, closed otherwise. There is no other
/// lifecycle state.
#[derive(Debug, Clone, Serialize)]
pub struct Problem {
    pub id: i64,
    pub order_number: i64,
    pub patient_id: i64,
    pub closing_date: Option<NaiveDateTime>,
    #[serde(flatten)]
    pub fields: ProblemFields,
    pub created: NaiveDateTime,
    pub modified: NaiveDateTime,
}

impl Problem {
    pub fn is_open(&self) -> bool {
        self.closing_date.is_none()
    }

    pub fn display_name(&self) -> String {
        format!("{}: {}", self.order_number, self.fields.wording)
    }
}

/// Clinical content editable on create and update.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ProblemFields {
    pub wording: String,
    pub meeting_place: Option<String>,
    pub subjective: Option<String>,
    pub objective: Option<String>,
    pub appreciation: Option<String>,
    pub action_plan: Option<String>,
    pub prescription: Option<String>,
    pub doctor_id: Option<i64>,
}

/// Submitted problem form: clinical fields plus the "closed problem?" flag.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ProblemInput {
    #[serde(flatten)]
    pub fields: ProblemFields,
    #[serde(default)]
    pub closed: bool,
}

impl ProblemInput {
    pub fn validate(&self) -> Result<(), ValidationError> {
        require("wording", &self.fields.wording)?;
        max_len("meeting_place", self.fields.meeting_place.as_deref(), 50)?;
        Ok(())
    }

    /// The closing date this submission stores: `now` when closed, null otherwise.
    pub fn closing_date(&self, now: NaiveDateTime) -> Option<NaiveDateTime> {
        self.closed.then_some(now)
    }
}

/// Initial values for a new problem form.
#[derive(Debug, Clone, Serialize)]
pub struct ProblemDraft {
    pub patient_id: i64,
    pub order_number: i64,
}
