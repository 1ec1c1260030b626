//! Entity validation failures.
//!
//! Raised before any row is written; the message is shown to the user as-is.

use thiserror::Error;

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ValidationError {
    #[error("Can not die before birth")]
    DeceaseBeforeBirth,

    #[error("Collegiate number is required for doctor")]
    CollegiateNumberRequired,

    #[error("Field '{0}' is required")]
    Required(&'static str),

    #[error("Field '{field}' must be at most {max} characters")]
    TooLong { field: &'static str, max: usize },

    #[error("Staff member {0} is not a doctor")]
    NotADoctor(i64),

    #[error("Unknown search field: {0}")]
    UnknownSearchField(String),

    #[error("Patient {0} already has antecedents")]
    HistoryAlreadyExists(i64),

    #[error("Invalid document: {0}")]
    InvalidDocument(String),
}

/// Reject blank values for a mandatory text field.
pub(crate) fn require(field: &'static str, value: &str) -> Result<(), ValidationError> {
    if value.trim().is_empty() {
        return Err(ValidationError::Required(field));
    }
    Ok(())
}

/// Enforce a maximum length (in characters) on an optional text field.
pub(crate) fn max_len(
    field: &'static str,
    value: Option<&str>,
    max: usize,
) -> Result<(), ValidationError> {
    match value {
        Some(v) if v.chars().count() > max => Err(ValidationError::TooLong { field, max }),
        _ => Ok(()),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn require_rejects_whitespace() {
        assert_eq!(require("wording", "   "), Err(ValidationError::Required("wording")));
        assert!(require("wording", "Headache").is_ok());
    }

    #[test]
    fn max_len_counts_characters_not_bytes() {
        // 30 two-byte characters fit a 30 character limit
        let name = "ñ".repeat(30);
        assert!(max_len("first_name", Some(&name), 30).is_ok());
        let long = "a".repeat(31);
        assert_eq!(
            max_len("first_name", Some(&long), 30),
            Err(ValidationError::TooLong { field: "first_name", max: 30 })
        );
        assert!(max_len("first_name", None, 30).is_ok());
    }
}
