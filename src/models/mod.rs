pub mod enums;
pub mod filters;
pub mod history;
pub mod patient;
pub mod problem;
pub mod staff;
pub mod test_document;
pub mod validation;

pub use enums::*;
pub use filters::*;
pub use history::*;
pub use patient::*;
pub use problem::*;
pub use staff::*;
pub use test_document::*;
pub use validation::ValidationError;

/// "first last optional", skipping the parts that are missing.
pub(crate) fn display_name(first: &str, last: &str, optional: Option<&str>) -> String {
    [Some(first), Some(last), optional]
        .into_iter()
        .flatten()
        .map(str::trim)
        .filter(|part| !part.is_empty())
        .collect::<Vec<_>>()
        .join(" ")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn display_name_skips_missing_parts() {
        assert_eq!(display_name("John", "Doe", Some("Smith")), "John Doe Smith");
        assert_eq!(display_name("John", "Doe", None), "John Doe");
        assert_eq!(display_name("", "Doe", Some(" ")), "Doe");
    }
}
