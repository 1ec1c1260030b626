//! Repository layer: entity-scoped database operations.
//!
//! One sub-module per entity; all public functions are re-exported here.

mod history;
mod lookup;
mod patient;
mod problem;
mod relations;
mod search;
mod staff;
mod test_document;

use std::str::FromStr;

use chrono::NaiveDateTime;
use rusqlite::types::Type;
use rusqlite::Row;

use super::DatabaseError;

pub use history::*;
pub use lookup::*;
pub use patient::*;
pub use problem::*;
pub use relations::*;
pub use search::*;
pub use staff::*;
pub use test_document::*;

/// Timestamp written to `created` / `modified` columns (UTC).
pub(crate) fn now() -> NaiveDateTime {
    chrono::Utc::now().naive_utc()
}

/// Read a text column holding a `str_enum!` code.
pub(crate) fn enum_column<T>(row: &Row<'_>, idx: usize) -> rusqlite::Result<T>
where
    T: FromStr<Err = DatabaseError>,
{
    let raw: String = row.get(idx)?;
    T::from_str(&raw)
        .map_err(|e| rusqlite::Error::FromSqlConversionFailure(idx, Type::Text, Box::new(e)))
}

/// Nullable variant of [`enum_column`].
pub(crate) fn optional_enum_column<T>(row: &Row<'_>, idx: usize) -> rusqlite::Result<Option<T>>
where
    T: FromStr<Err = DatabaseError>,
{
    match row.get::<_, Option<String>>(idx)? {
        Some(raw) => T::from_str(&raw).map(Some).map_err(|e| {
            rusqlite::Error::FromSqlConversionFailure(idx, Type::Text, Box::new(e))
        }),
        None => Ok(None),
    }
}
