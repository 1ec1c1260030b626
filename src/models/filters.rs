use std::str::FromStr;

use serde::{Deserialize, Serialize};

use super::enums::StaffType;
use super::validation::ValidationError;

/// Macro to generate a search-field allow-list mapping request names to columns.
macro_rules! search_fields {
    ($name:ident { $($variant:ident => $s:literal),+ $(,)? }) => {
        #[derive(Debug, Clone, Copy, PartialEq, Eq)]
        pub enum $name {
            $($variant),+
        }

        impl $name {
            /// Column searched for this field. Names double as column names.
            pub fn column(&self) -> &'static str {
                match self {
                    $(Self::$variant => $s),+
                }
            }
        }

        impl FromStr for $name {
            type Err = ValidationError;

            fn from_str(s: &str) -> Result<Self, Self::Err> {
                match s {
                    $($s => Ok(Self::$variant)),+,
                    _ => Err(ValidationError::UnknownSearchField(s.into())),
                }
            }
        }
    };
}

search_fields!(PatientSearchField {
    LastName => "last_name",
    FirstName => "first_name",
    LastNameOptional => "last_name_optional",
    Address => "address",
    PhoneContact => "phone_contact",
    Race => "race",
    BirthDate => "birth_date",
    BirthPlace => "birth_place",
    DeceaseDate => "decease_date",
    Tin => "tin",
    Ssn => "ssn",
    HealthCardNumber => "health_card_number",
    InsuranceCompany => "insurance_company",
});

search_fields!(ProblemSearchField {
    Wording => "wording",
    Subjective => "subjective",
    Objective => "objective",
    Appreciation => "appreciation",
    ActionPlan => "action_plan",
    Prescription => "prescription",
});

/// 1-based page selection.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PageRequest {
    pub page: u32,
    pub per_page: u32,
}

impl PageRequest {
    pub fn new(page: Option<u32>, per_page: u32) -> Self {
        Self {
            page: page.unwrap_or(1).max(1),
            per_page: per_page.max(1),
        }
    }

    pub fn offset(&self) -> i64 {
        i64::from(self.page - 1) * i64::from(self.per_page)
    }

    pub fn limit(&self) -> i64 {
        i64::from(self.per_page)
    }
}

impl Default for PageRequest {
    fn default() -> Self {
        Self { page: 1, per_page: 10 }
    }
}

/// One page of a listing.
#[derive(Debug, Clone, Serialize)]
pub struct Page<T> {
    pub items: Vec<T>,
    pub page: u32,
    pub per_page: u32,
    pub total: i64,
    pub has_next: bool,
}

impl<T> Page<T> {
    pub fn new(items: Vec<T>, request: PageRequest, total: i64) -> Self {
        let has_next = request.offset() + (items.len() as i64) < total;
        Self {
            items,
            page: request.page,
            per_page: request.per_page,
            total,
            has_next,
        }
    }

    pub fn map<U>(self, f: impl FnMut(T) -> U) -> Page<U> {
        Page {
            items: self.items.into_iter().map(f).collect(),
            page: self.page,
            per_page: self.per_page,
            total: self.total,
            has_next: self.has_next,
        }
    }
}

#[derive(Debug, Default, Clone, Deserialize)]
pub struct StaffFilter {
    pub staff_type: Option<StaffType>,
    #[serde(default)]
    pub active_only: bool,
}
