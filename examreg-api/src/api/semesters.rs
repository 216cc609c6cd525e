//! Semester routes
//!
//! Reads are direct; update and delete queue sitting actions, mirroring
//! the faculty routes.

use axum::extract::{Path, State};
use axum::routing::get;
use axum::{Json, Router};
use serde::Deserialize;
use serde_json::{json, Value};

use crate::api::parse_id;
use crate::db;
use crate::{ApiError, ApiResult, AppState};
use examreg_common::db::models::{Semester, SittingKind, SittingTarget};

pub fn routes() -> Router<AppState> {
    Router::new().route(
        "/:id",
        get(get_semester).put(update_semester).delete(delete_semester),
    )
}

#[derive(Debug, Deserialize)]
struct NamePayload {
    #[serde(default)]
    name: Option<String>,
}

/// GET /api/semesters/:id
async fn get_semester(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> ApiResult<Json<Semester>> {
    let guid = parse_id(&id, "Invalid semester id")?;
    let semester = db::semesters::load(&state.db, guid)
        .await?
        .ok_or_else(|| ApiError::NotFound("Not found".to_string()))?;
    Ok(Json(semester))
}

/// PUT /api/semesters/:id — queues an update action for moderation
async fn update_semester(
    State(state): State<AppState>,
    Path(id): Path<String>,
    Json(payload): Json<NamePayload>,
) -> ApiResult<Json<Value>> {
    let name = match payload.name.as_deref() {
        Some(name) if !name.is_empty() => name,
        _ => return Err(ApiError::BadRequest("Name required".to_string())),
    };
    let guid = parse_id(&id, "Invalid semester id")?;
    let semester = db::semesters::load(&state.db, guid)
        .await?
        .ok_or_else(|| ApiError::NotFound("Not found".to_string()))?;

    db::sitting::propose(
        &state.db,
        SittingTarget::Semester,
        guid,
        &semester.name,
        SittingKind::Update,
        Some(json!({ "name": name })),
    )
    .await?;

    Ok(Json(json!({ "message": "Update request is pending approval." })))
}

/// DELETE /api/semesters/:id — queues a delete action for moderation
async fn delete_semester(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> ApiResult<Json<Value>> {
    let guid = parse_id(&id, "Invalid semester id")?;
    let semester = db::semesters::load(&state.db, guid)
        .await?
        .ok_or_else(|| ApiError::NotFound("Not found".to_string()))?;

    db::sitting::propose(
        &state.db,
        SittingTarget::Semester,
        guid,
        &semester.name,
        SittingKind::Delete,
        None,
    )
    .await?;

    Ok(Json(json!({ "message": "Delete request is pending approval." })))
}
