use serde::{Deserialize, Serialize};

/// Antecedents of a patient. At most one per patient.
#[derive(Debug, Clone, Serialize)]
pub struct History {
    pub id: i64,
    pub patient_id: i64,
    #[serde(flatten)]
    pub antecedents: Antecedents,
}

/// Free-text personal and family background.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Antecedents {
    // Personal
    pub birth_growth: Option<String>,
    pub growth_sexuality: Option<String>,
    pub feed: Option<String>,
    pub habits: Option<String>,
    pub peristaltic_conditions: Option<String>,
    pub psychological_conditions: Option<String>,
    pub children_complaint: Option<String>,
    pub venereal_disease: Option<String>,
    pub accident_surgical_operation: Option<String>,
    pub medical_intolerance: Option<String>,
    pub mental_illness: Option<String>,
    // Family
    pub parents_status_health: Option<String>,
    pub brothers_status_health: Option<String>,
    pub spouse_childs_status_health: Option<String>,
    pub family_illness: Option<String>,
}
