//! Student routes
//!
//! Registration, bulk import, and subject merge write the store directly;
//! whole-record update and delete queue sitting actions like the other
//! entities. Public portal lookups use the obfuscated student id codec.

use axum::extract::{Path, Query, State};
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::routing::{get, post};
use axum::{Json, Router};
use serde::Deserialize;
use serde_json::{json, Value};
use uuid::Uuid;

use crate::api::parse_id;
use crate::db;
use crate::db::students::{BulkImportResult, NewStudent, StudentView};
use crate::error::is_unique_violation;
use crate::{ApiError, ApiResult, AppState};
use examreg_common::db::models::{SittingKind, SittingTarget, StudentUpdate, Subject};

pub fn routes() -> Router<AppState> {
    Router::new()
        .route("/", post(create_student).get(list_students))
        .route("/bulk", post(bulk_import))
        .route("/search", get(search_students))
        .route("/add-subject", post(add_subject))
        .route("/studentid/:student_id", get(get_by_external_id))
        .route("/semester/:semester_id", get(list_by_semester))
        .route(
            "/faculty/:faculty_id/semester/:semester_id",
            get(list_by_faculty_semester),
        )
        .route("/last4/:digits", get(find_by_last4))
        .route(
            "/:id",
            get(get_student).put(update_student).delete(delete_student),
        )
}

fn present(value: &Option<String>) -> Option<&str> {
    value.as_deref().filter(|v| !v.is_empty())
}

// ============================================================================
// Registration
// ============================================================================

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct CreateStudentRequest {
    #[serde(default)]
    student_id: Option<String>,
    #[serde(default)]
    name: Option<String>,
    #[serde(default)]
    phone: Option<String>,
    #[serde(default)]
    faculty: Option<String>,
    #[serde(default)]
    semester: Option<String>,
}

/// POST /api/students
///
/// Direct creation; the identity triple must be new.
async fn create_student(
    State(state): State<AppState>,
    Json(payload): Json<CreateStudentRequest>,
) -> ApiResult<Response> {
    let (Some(student_id), Some(name), Some(faculty), Some(semester)) = (
        present(&payload.student_id),
        present(&payload.name),
        present(&payload.faculty),
        present(&payload.semester),
    ) else {
        return Err(ApiError::BadRequest("All fields required".to_string()));
    };

    let faculty_id = parse_id(faculty, "Invalid faculty id")?;
    let semester_id = parse_id(semester, "Invalid semester id")?;

    if db::students::find_by_key(&state.db, student_id, faculty_id, semester_id)
        .await?
        .is_some()
    {
        return Err(ApiError::Conflict(
            "Student already exists for this faculty and semester".to_string(),
        ));
    }

    // A concurrent create or a normalized-name duplicate still trips the
    // unique indexes here; both surface as a conflict.
    let student = db::students::create(
        &state.db,
        NewStudent {
            student_id,
            name,
            phone: present(&payload.phone),
            faculty_id,
            semester_id,
            subjects: &[],
        },
    )
    .await
    .map_err(|e| {
        if is_unique_violation(&e) {
            ApiError::Conflict("Student already exists for this faculty and semester".to_string())
        } else {
            ApiError::Other(e)
        }
    })?;

    Ok((StatusCode::CREATED, Json(student)).into_response())
}

/// POST /api/students/bulk
///
/// Accepts either a bare array or {"students": [...]}.
async fn bulk_import(
    State(state): State<AppState>,
    Json(payload): Json<Value>,
) -> ApiResult<Json<BulkImportResult>> {
    let rows = payload.get("students").unwrap_or(&payload);
    let Some(rows) = rows.as_array() else {
        return Err(ApiError::BadRequest(
            "Invalid data format. Expected array of students.".to_string(),
        ));
    };

    Ok(Json(db::students::bulk_import(&state.db, rows).await))
}

// ============================================================================
// Reads
// ============================================================================

/// GET /api/students
async fn list_students(State(state): State<AppState>) -> ApiResult<Json<Vec<StudentView>>> {
    Ok(Json(db::students::list_all(&state.db).await?))
}

/// GET /api/students/:id
async fn get_student(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> ApiResult<Json<StudentView>> {
    let guid = parse_id(&id, "Invalid student id")?;
    let student = db::students::load_view(&state.db, guid)
        .await?
        .ok_or_else(|| ApiError::NotFound("Not found".to_string()))?;
    Ok(Json(student))
}

/// GET /api/students/studentid/:student_id
///
/// Portal lookup. The path segment is decoded through the codec's
/// fallback chain before the store lookup.
async fn get_by_external_id(
    State(state): State<AppState>,
    Path(external_id): Path<String>,
) -> ApiResult<Json<StudentView>> {
    let student_id = state.id_codec.resolve(&external_id);
    tracing::debug!("Resolved external student id {} -> {}", external_id, student_id);

    let student = db::students::find_by_student_id(&state.db, &student_id)
        .await?
        .ok_or_else(|| ApiError::NotFound("Student not found".to_string()))?;
    Ok(Json(student))
}

#[derive(Debug, Deserialize)]
struct SearchQuery {
    #[serde(default)]
    name: Option<String>,
    #[serde(default)]
    faculty: Option<String>,
    #[serde(default)]
    semester: Option<String>,
}

/// GET /api/students/search?name&faculty&semester
///
/// Name matches case-insensitively as a literal substring. Faculty and
/// semester narrow the search only when they parse as ids; invalid values
/// are ignored rather than rejected.
async fn search_students(
    State(state): State<AppState>,
    Query(query): Query<SearchQuery>,
) -> ApiResult<Json<Vec<StudentView>>> {
    let name = query
        .name
        .as_deref()
        .map(str::trim)
        .filter(|n| !n.is_empty());
    let faculty_id = query.faculty.as_deref().and_then(|f| Uuid::parse_str(f).ok());
    let semester_id = query.semester.as_deref().and_then(|s| Uuid::parse_str(s).ok());

    Ok(Json(
        db::students::search(&state.db, name, faculty_id, semester_id).await?,
    ))
}

/// GET /api/students/semester/:semester_id
async fn list_by_semester(
    State(state): State<AppState>,
    Path(semester_id): Path<String>,
) -> ApiResult<Json<Vec<StudentView>>> {
    let semester_id = parse_id(&semester_id, "Invalid semester ID")?;
    Ok(Json(db::students::by_semester(&state.db, semester_id).await?))
}

/// GET /api/students/faculty/:faculty_id/semester/:semester_id
async fn list_by_faculty_semester(
    State(state): State<AppState>,
    Path((faculty_id, semester_id)): Path<(String, String)>,
) -> ApiResult<Json<Vec<StudentView>>> {
    let faculty_id = parse_id(&faculty_id, "Invalid facultyId")?;
    let semester_id = parse_id(&semester_id, "Invalid semesterId")?;
    Ok(Json(
        db::students::by_faculty_semester(&state.db, faculty_id, semester_id).await?,
    ))
}

/// GET /api/students/last4/:digits
async fn find_by_last4(
    State(state): State<AppState>,
    Path(digits): Path<String>,
) -> ApiResult<Json<Vec<StudentView>>> {
    if digits.len() != 4 || !digits.chars().all(|c| c.is_ascii_digit()) {
        return Err(ApiError::BadRequest("Invalid last 4 digits".to_string()));
    }
    Ok(Json(db::students::by_last4(&state.db, &digits).await?))
}

// ============================================================================
// Moderated mutations
// ============================================================================

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct UpdateStudentRequest {
    #[serde(default)]
    name: Option<String>,
    #[serde(default)]
    faculty: Option<String>,
    #[serde(default)]
    semester: Option<String>,
    #[serde(default)]
    subjects: Option<Vec<Subject>>,
}

/// PUT /api/students/:id — queues an update action for moderation
async fn update_student(
    State(state): State<AppState>,
    Path(id): Path<String>,
    Json(payload): Json<UpdateStudentRequest>,
) -> ApiResult<Json<Value>> {
    let guid = parse_id(&id, "Invalid student id")?;
    let student = db::students::load_record(&state.db, guid)
        .await?
        .ok_or_else(|| ApiError::NotFound("Not found".to_string()))?;

    let faculty = payload
        .faculty
        .as_deref()
        .map(|f| parse_id(f, "Invalid faculty id"))
        .transpose()?;
    let semester = payload
        .semester
        .as_deref()
        .map(|s| parse_id(s, "Invalid semester id"))
        .transpose()?;

    let update = StudentUpdate {
        name: payload.name.filter(|n| !n.is_empty()),
        faculty,
        semester,
        subjects: payload.subjects,
    };
    let payload_value = serde_json::to_value(&update).map_err(anyhow::Error::from)?;

    db::sitting::propose(
        &state.db,
        SittingTarget::Student,
        guid,
        &student.name,
        SittingKind::Update,
        Some(payload_value),
    )
    .await?;

    Ok(Json(json!({ "message": "Update request is pending approval." })))
}

/// DELETE /api/students/:id — queues a delete action for moderation
async fn delete_student(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> ApiResult<Json<Value>> {
    let guid = parse_id(&id, "Invalid student id")?;
    let student = db::students::load_record(&state.db, guid)
        .await?
        .ok_or_else(|| ApiError::NotFound("Not found".to_string()))?;

    db::sitting::propose(
        &state.db,
        SittingTarget::Student,
        guid,
        &student.name,
        SittingKind::Delete,
        None,
    )
    .await?;

    Ok(Json(json!({ "message": "Delete request is pending approval." })))
}

// ============================================================================
// Subject merge
// ============================================================================

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct AddSubjectRequest {
    #[serde(default)]
    student_id: Option<String>,
    #[serde(default)]
    name: Option<String>,
    #[serde(default)]
    phone: Option<String>,
    #[serde(default)]
    faculty: Option<String>,
    #[serde(default)]
    semester: Option<String>,
    #[serde(default)]
    subject: Option<Subject>,
}

/// POST /api/students/add-subject
///
/// Direct write, bypassing moderation. Appends one subject to the student
/// with the given identity triple, creating the student if absent.
/// Subjects are deduplicated case-insensitively by name, keeping the
/// first occurrence.
async fn add_subject(
    State(state): State<AppState>,
    Json(payload): Json<AddSubjectRequest>,
) -> ApiResult<Response> {
    let (Some(student_id), Some(name), Some(faculty), Some(semester), Some(subject)) = (
        present(&payload.student_id),
        present(&payload.name),
        present(&payload.faculty),
        present(&payload.semester),
        payload.subject.clone(),
    ) else {
        return Err(ApiError::BadRequest("Missing required fields".to_string()));
    };

    let faculty_id = parse_id(faculty, "Invalid faculty id")?;
    let semester_id = parse_id(semester, "Invalid semester id")?;

    match db::students::find_by_key(&state.db, student_id, faculty_id, semester_id).await? {
        Some(mut student) => {
            let mut subjects = db::students::dedup_subjects(student.subjects.clone());

            let duplicate = subjects
                .iter()
                .any(|s| s.name.to_lowercase() == subject.name.to_lowercase());
            if duplicate {
                return Err(ApiError::Conflict(
                    "Subject already exists for this student".to_string(),
                ));
            }

            subjects.push(subject);
            let subjects = db::students::dedup_subjects(subjects);
            db::students::set_subjects(&state.db, student.guid, &subjects).await?;

            student.subjects = subjects;
            Ok(Json(json!({
                "message": "Subject added to existing student",
                "student": student,
            }))
            .into_response())
        }
        None => {
            let student = db::students::create(
                &state.db,
                NewStudent {
                    student_id,
                    name,
                    phone: present(&payload.phone),
                    faculty_id,
                    semester_id,
                    subjects: &[subject],
                },
            )
            .await?;

            Ok((
                StatusCode::CREATED,
                Json(json!({
                    "message": "New student created",
                    "student": student,
                })),
            )
                .into_response())
        }
    }
}
