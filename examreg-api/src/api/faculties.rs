//! Faculty routes
//!
//! Creation and reads write/read the store directly; update and delete
//! queue sitting actions awaiting moderation.

use axum::extract::{Path, State};
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::routing::{get, post};
use axum::{Json, Router};
use serde::Deserialize;
use serde_json::{json, Value};

use crate::api::parse_id;
use crate::db;
use crate::{ApiError, ApiResult, AppState};
use examreg_common::db::models::{Faculty, Semester, SittingKind, SittingTarget};

pub fn routes() -> Router<AppState> {
    Router::new()
        .route("/", post(create_faculty).get(list_faculties))
        .route(
            "/:id",
            get(get_faculty).put(update_faculty).delete(delete_faculty),
        )
        .route("/:id/semesters", post(create_semester).get(list_semesters))
}

#[derive(Debug, Deserialize)]
struct NamePayload {
    #[serde(default)]
    name: Option<String>,
}

impl NamePayload {
    fn required(&self) -> ApiResult<&str> {
        match self.name.as_deref() {
            Some(name) if !name.is_empty() => Ok(name),
            _ => Err(ApiError::BadRequest("Name required".to_string())),
        }
    }
}

/// POST /api/faculties
async fn create_faculty(
    State(state): State<AppState>,
    Json(payload): Json<NamePayload>,
) -> ApiResult<Response> {
    let name = payload.required()?;
    let faculty = db::faculties::create(&state.db, name).await?;
    Ok((StatusCode::CREATED, Json(faculty)).into_response())
}

/// GET /api/faculties
async fn list_faculties(State(state): State<AppState>) -> ApiResult<Json<Vec<Faculty>>> {
    Ok(Json(db::faculties::list(&state.db).await?))
}

/// GET /api/faculties/:id
async fn get_faculty(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> ApiResult<Json<Faculty>> {
    let guid = parse_id(&id, "Invalid faculty id")?;
    let faculty = db::faculties::load(&state.db, guid)
        .await?
        .ok_or_else(|| ApiError::NotFound("Not found".to_string()))?;
    Ok(Json(faculty))
}

/// PUT /api/faculties/:id — queues an update action for moderation
async fn update_faculty(
    State(state): State<AppState>,
    Path(id): Path<String>,
    Json(payload): Json<NamePayload>,
) -> ApiResult<Json<Value>> {
    let name = payload.required()?;
    let guid = parse_id(&id, "Invalid faculty id")?;
    let faculty = db::faculties::load(&state.db, guid)
        .await?
        .ok_or_else(|| ApiError::NotFound("Not found".to_string()))?;

    db::sitting::propose(
        &state.db,
        SittingTarget::Faculty,
        guid,
        &faculty.name,
        SittingKind::Update,
        Some(json!({ "name": name })),
    )
    .await?;

    Ok(Json(json!({ "message": "Update request is pending approval." })))
}

/// DELETE /api/faculties/:id — queues a delete action for moderation
async fn delete_faculty(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> ApiResult<Json<Value>> {
    let guid = parse_id(&id, "Invalid faculty id")?;
    let faculty = db::faculties::load(&state.db, guid)
        .await?
        .ok_or_else(|| ApiError::NotFound("Not found".to_string()))?;

    db::sitting::propose(
        &state.db,
        SittingTarget::Faculty,
        guid,
        &faculty.name,
        SittingKind::Delete,
        None,
    )
    .await?;

    Ok(Json(json!({ "message": "Delete request is pending approval." })))
}

/// POST /api/faculties/:faculty_id/semesters
async fn create_semester(
    State(state): State<AppState>,
    Path(faculty_id): Path<String>,
    Json(payload): Json<NamePayload>,
) -> ApiResult<Response> {
    let name = payload.required()?;
    let faculty_id = parse_id(&faculty_id, "Invalid facultyId")?;
    let semester = db::semesters::create(&state.db, name, faculty_id).await?;
    Ok((StatusCode::CREATED, Json(semester)).into_response())
}

/// GET /api/faculties/:faculty_id/semesters
async fn list_semesters(
    State(state): State<AppState>,
    Path(faculty_id): Path<String>,
) -> ApiResult<Json<Vec<Semester>>> {
    let faculty_id = parse_id(&faculty_id, "Invalid facultyId")?;
    Ok(Json(
        db::semesters::list_for_faculty(&state.db, faculty_id).await?,
    ))
}
