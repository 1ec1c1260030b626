use chrono::NaiveDateTime;
use serde::{Deserialize, Serialize};

use super::enums::StaffType;
use super::validation::{max_len, require, ValidationError};
use super::display_name;

/// A user account of the clinic: administrative staff or doctor.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Staff {
    pub id: i64,
    pub username: String,
    pub first_name: String,
    pub last_name: String,
    pub last_name_optional: Option<String>,
    pub email: Option<String>,
    pub collegiate_number: Option<String>,
    pub tin: Option<String>,
    pub address: Option<String>,
    pub phone_contact: Option<String>,
    pub staff_type: StaffType,
    pub is_active: bool,
    pub date_joined: NaiveDateTime,
}

impl Staff {
    pub fn is_doctor(&self) -> bool {
        self.staff_type == StaffType::Doctor
    }

    pub fn display_name(&self) -> String {
        display_name(&self.first_name, &self.last_name, self.last_name_optional.as_deref())
    }
}

/// Editable fields of a staff member.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct StaffInput {
    pub username: String,
    #[serde(default)]
    pub first_name: String,
    #[serde(default)]
    pub last_name: String,
    pub last_name_optional: Option<String>,
    pub email: Option<String>,
    pub collegiate_number: Option<String>,
    pub tin: Option<String>,
    pub address: Option<String>,
    pub phone_contact: Option<String>,
    #[serde(default)]
    pub staff_type: StaffType,
    #[serde(default = "default_active")]
    pub is_active: bool,
}

fn default_active() -> bool {
    true
}

impl StaffInput {
    pub fn validate(&self) -> Result<(), ValidationError> {
        require("username", &self.username)?;
        max_len("username", Some(&self.username), 150)?;
        max_len("first_name", Some(&self.first_name), 30)?;
        max_len("last_name", Some(&self.last_name), 30)?;
        max_len("last_name_optional", self.last_name_optional.as_deref(), 30)?;
        max_len("collegiate_number", self.collegiate_number.as_deref(), 20)?;
        max_len("tin", self.tin.as_deref(), 20)?;

        let has_number = self
            .collegiate_number
            .as_deref()
            .is_some_and(|n| !n.trim().is_empty());
        if self.staff_type == StaffType::Doctor && !has_number {
            return Err(ValidationError::CollegiateNumberRequired);
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn doctor(number: Option<&str>) -> StaffInput {
        StaffInput {
            username: "house".into(),
            first_name: "Gregory".into(),
            last_name: "House".into(),
            staff_type: StaffType::Doctor,
            collegiate_number: number.map(String::from),
            is_active: true,
            ..Default::default()
        }
    }

    #[test]
    fn doctor_requires_collegiate_number() {
        assert_eq!(doctor(None).validate(), Err(ValidationError::CollegiateNumberRequired));
        assert_eq!(
            doctor(Some("  ")).validate(),
            Err(ValidationError::CollegiateNumberRequired)
        );
        assert!(doctor(Some("28/12345")).validate().is_ok());
    }

    #[test]
    fn administrative_needs_no_collegiate_number() {
        let input = StaffInput {
            username: "front-desk".into(),
            ..Default::default()
        };
        assert!(input.validate().is_ok());
    }

    #[test]
    fn username_is_required() {
        let input = StaffInput::default();
        assert_eq!(input.validate(), Err(ValidationError::Required("username")));
    }

    #[test]
    fn missing_staff_type_deserializes_as_administrative() {
        let input: StaffInput = serde_json::from_str(r#"{"username":"ana"}"#).unwrap();
        assert_eq!(input.staff_type, StaffType::Administrative);
        assert!(input.is_active);
    }
}
