//! Store operations for examreg-api
//!
//! Plain async functions over the shared pool; one module per entity plus
//! the sitting action log.

pub mod faculties;
pub mod semesters;
pub mod sitting;
pub mod students;

use anyhow::{Context, Result};
use chrono::{DateTime, Utc};
use uuid::Uuid;

/// Parse a stored guid column.
pub(crate) fn parse_guid(value: &str) -> Result<Uuid> {
    Uuid::parse_str(value).with_context(|| format!("Malformed guid in store: {}", value))
}

/// Parse a stored RFC 3339 timestamp column.
pub(crate) fn parse_timestamp(value: &str) -> Result<DateTime<Utc>> {
    Ok(DateTime::parse_from_rfc3339(value)
        .with_context(|| format!("Malformed timestamp in store: {}", value))?
        .with_timezone(&Utc))
}

/// Current time, both as a value and in the stored text format.
pub(crate) fn now() -> (DateTime<Utc>, String) {
    let now = Utc::now();
    let text = now.to_rfc3339();
    (now, text)
}
