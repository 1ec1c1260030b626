//! API endpoint handlers, one module per resource.

pub mod clinic;
pub mod history;
pub mod lookups;
pub mod patients;
pub mod problems;
pub mod staff;
pub mod test_documents;
