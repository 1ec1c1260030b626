use std::sync::LazyLock;

use chrono::{Local, NaiveDate, NaiveDateTime};
use regex::Regex;
use serde::{Deserialize, Serialize};

use super::enums::Gender;
use super::validation::{max_len, require, ValidationError};
use super::display_name;

#[derive(Debug, Clone, Serialize)]
pub struct Patient {
    pub id: i64,
    #[serde(flatten)]
    pub data: PatientInput,
    pub created: NaiveDateTime,
    pub modified: NaiveDateTime,
}

/// Demographic and administrative data of a patient, as submitted by staff.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct PatientInput {
    pub first_name: String,
    pub last_name: String,
    pub last_name_optional: Option<String>,
    pub address: Option<String>,
    pub phone_contact: Option<String>,
    pub gender: Option<Gender>,
    pub race: Option<String>,
    pub birth_date: Option<NaiveDate>,
    pub birth_place: Option<String>,
    pub decease_date: Option<NaiveDate>,
    pub tin: Option<String>,
    pub ssn: Option<String>,
    pub health_card_number: Option<String>,
    pub family_situation: Option<String>,
    pub labour_situation: Option<String>,
    pub education: Option<String>,
    pub insurance_company: Option<String>,
    pub doctor_assigned_id: Option<i64>,
}

impl PatientInput {
    pub fn validate(&self) -> Result<(), ValidationError> {
        require("first_name", &self.first_name)?;
        require("last_name", &self.last_name)?;
        max_len("first_name", Some(&self.first_name), 30)?;
        max_len("last_name", Some(&self.last_name), 30)?;
        max_len("last_name_optional", self.last_name_optional.as_deref(), 30)?;
        max_len("race", self.race.as_deref(), 30)?;
        max_len("birth_place", self.birth_place.as_deref(), 50)?;
        max_len("tin", self.tin.as_deref(), 20)?;
        max_len("ssn", self.ssn.as_deref(), 30)?;
        max_len("health_card_number", self.health_card_number.as_deref(), 30)?;
        max_len("insurance_company", self.insurance_company.as_deref(), 30)?;

        if let (Some(birth), Some(decease)) = (self.birth_date, self.decease_date) {
            if birth > decease {
                return Err(ValidationError::DeceaseBeforeBirth);
            }
        }
        Ok(())
    }
}

impl Patient {
    /// Age in whole years (365-day years) on the given date.
    ///
    /// Counts up to the decease date when there is one. Zero without a birth date.
    pub fn age_on(&self, today: NaiveDate) -> i64 {
        let Some(begin) = self.data.birth_date else {
            return 0;
        };
        let end = self.data.decease_date.unwrap_or(today);
        (end - begin).num_days() / 365
    }

    pub fn age(&self) -> i64 {
        self.age_on(Local::now().date_naive())
    }

    pub fn gender_description(&self) -> Option<&'static str> {
        self.data.gender.map(|g| g.label())
    }

    pub fn display_name(&self) -> String {
        display_name(
            &self.data.first_name,
            &self.data.last_name,
            self.data.last_name_optional.as_deref(),
        )
    }

    /// Cosmetic URL fragment built from the display name.
    pub fn slug(&self) -> String {
        slugify(&self.display_name())
    }
}

static NON_ALNUM: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"[^a-z0-9]+").unwrap());

/// ASCII-folded, lowercase and dashed. Never empty.
fn slugify(text: &str) -> String {
    let lowered = deunicode::deunicode(text).to_lowercase();
    let slug = NON_ALNUM.replace_all(&lowered, "-").trim_matches('-').to_string();
    if slug.is_empty() {
        "patient".to_string()
    } else {
        slug
    }
}

/// Patient with the derived attributes shown on the detail page.
#[derive(Debug, Clone, Serialize)]
pub struct PatientDetail {
    #[serde(flatten)]
    pub patient: Patient,
    pub display_name: String,
    pub age: i64,
    pub gender_description: Option<&'static str>,
}

impl From<Patient> for PatientDetail {
    fn from(patient: Patient) -> Self {
        Self {
            display_name: patient.display_name(),
            age: patient.age(),
            gender_description: patient.gender_description(),
            patient,
        }
    }
}
