//! HTTP API handlers for examreg-api

pub mod faculties;
pub mod health;
pub mod semesters;
pub mod sitting;
pub mod students;

use crate::ApiError;
use uuid::Uuid;

/// Parse a path or query id, surfacing the given message on failure.
pub(crate) fn parse_id(value: &str, message: &str) -> Result<Uuid, ApiError> {
    Uuid::parse_str(value).map_err(|_| ApiError::BadRequest(message.to_string()))
}
