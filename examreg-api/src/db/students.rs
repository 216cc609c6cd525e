//! Student store operations: lookups, dedup-aware writes, bulk import
//!
//! Students are addressed two ways: by primary guid, and by the identity
//! triple (student_id, faculty, semester) that the unique indexes protect.
//! Subject rows are embedded as a JSON array in the subjects column.

use anyhow::{anyhow, bail, Context, Result};
use examreg_common::db::models::{Student, StudentUpdate, Subject};
use examreg_common::normalize_name;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use sqlx::sqlite::SqliteRow;
use sqlx::{Row, SqlitePool};
use std::collections::HashSet;
use uuid::Uuid;

/// Row-level error message for bulk rows missing a required field.
pub const MISSING_FIELDS_ERROR: &str = "Missing student ID, name, faculty, or semester";

/// A faculty or semester reference resolved to its display name.
#[derive(Debug, Clone, Serialize)]
pub struct EntityRef {
    pub id: Uuid,
    pub name: String,
}

/// Student record with faculty and semester references resolved, the shape
/// every read endpoint returns. A dangling reference (no cascade on
/// delete) serializes as null.
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct StudentView {
    pub id: Uuid,
    pub student_id: String,
    pub name: String,
    pub normalized_name: String,
    pub phone: Option<String>,
    pub faculty: Option<EntityRef>,
    pub semester: Option<EntityRef>,
    pub subjects: Vec<Subject>,
    pub created_at: chrono::DateTime<chrono::Utc>,
    pub updated_at: chrono::DateTime<chrono::Utc>,
}

/// Fields for a direct student creation.
#[derive(Debug)]
pub struct NewStudent<'a> {
    pub student_id: &'a str,
    pub name: &'a str,
    pub phone: Option<&'a str>,
    pub faculty_id: Uuid,
    pub semester_id: Uuid,
    pub subjects: &'a [Subject],
}

const VIEW_SELECT: &str = "SELECT st.guid, st.student_id, st.name, st.normalized_name, st.phone,
        st.faculty_id, st.semester_id, st.subjects, st.created_at, st.updated_at,
        f.name AS faculty_name, s.name AS semester_name
 FROM students st
 LEFT JOIN faculties f ON f.guid = st.faculty_id
 LEFT JOIN semesters s ON s.guid = st.semester_id";

fn parse_subjects(raw: &str) -> Result<Vec<Subject>> {
    serde_json::from_str(raw).context("Malformed subjects column")
}

fn map_record(row: &SqliteRow) -> Result<Student> {
    Ok(Student {
        guid: super::parse_guid(&row.get::<String, _>("guid"))?,
        student_id: row.get("student_id"),
        name: row.get("name"),
        normalized_name: row.get("normalized_name"),
        phone: row.get("phone"),
        faculty_id: super::parse_guid(&row.get::<String, _>("faculty_id"))?,
        semester_id: super::parse_guid(&row.get::<String, _>("semester_id"))?,
        subjects: parse_subjects(&row.get::<String, _>("subjects"))?,
        created_at: super::parse_timestamp(&row.get::<String, _>("created_at"))?,
        updated_at: super::parse_timestamp(&row.get::<String, _>("updated_at"))?,
    })
}

fn map_view(row: &SqliteRow) -> Result<StudentView> {
    let faculty_id = super::parse_guid(&row.get::<String, _>("faculty_id"))?;
    let semester_id = super::parse_guid(&row.get::<String, _>("semester_id"))?;

    Ok(StudentView {
        id: super::parse_guid(&row.get::<String, _>("guid"))?,
        student_id: row.get("student_id"),
        name: row.get("name"),
        normalized_name: row.get("normalized_name"),
        phone: row.get("phone"),
        faculty: row
            .get::<Option<String>, _>("faculty_name")
            .map(|name| EntityRef { id: faculty_id, name }),
        semester: row
            .get::<Option<String>, _>("semester_name")
            .map(|name| EntityRef { id: semester_id, name }),
        subjects: parse_subjects(&row.get::<String, _>("subjects"))?,
        created_at: super::parse_timestamp(&row.get::<String, _>("created_at"))?,
        updated_at: super::parse_timestamp(&row.get::<String, _>("updated_at"))?,
    })
}

/// Drop subjects whose name case-insensitively repeats an earlier entry.
pub fn dedup_subjects(subjects: Vec<Subject>) -> Vec<Subject> {
    let mut seen = HashSet::new();
    subjects
        .into_iter()
        .filter(|subject| seen.insert(subject.name.to_lowercase()))
        .collect()
}

/// Escape LIKE metacharacters so user input matches literally.
fn escape_like(input: &str) -> String {
    let mut escaped = String::with_capacity(input.len());
    for c in input.chars() {
        if matches!(c, '\\' | '%' | '_') {
            escaped.push('\\');
        }
        escaped.push(c);
    }
    escaped
}

/// Insert a new student. The identity and normalized-name unique indexes
/// reject duplicates; the caller decides how to surface that.
pub async fn create(pool: &SqlitePool, new: NewStudent<'_>) -> Result<Student> {
    let guid = Uuid::new_v4();
    let (now, now_text) = super::now();
    let normalized_name = normalize_name(new.name);
    let subjects = dedup_subjects(new.subjects.to_vec());
    let subjects_json = serde_json::to_string(&subjects)?;

    sqlx::query(
        "INSERT INTO students
            (guid, student_id, name, normalized_name, phone, faculty_id, semester_id, subjects, created_at, updated_at)
         VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?, ?)",
    )
    .bind(guid.to_string())
    .bind(new.student_id)
    .bind(new.name)
    .bind(&normalized_name)
    .bind(new.phone)
    .bind(new.faculty_id.to_string())
    .bind(new.semester_id.to_string())
    .bind(&subjects_json)
    .bind(&now_text)
    .bind(&now_text)
    .execute(pool)
    .await?;

    Ok(Student {
        guid,
        student_id: new.student_id.to_string(),
        name: new.name.to_string(),
        normalized_name,
        phone: new.phone.map(str::to_string),
        faculty_id: new.faculty_id,
        semester_id: new.semester_id,
        subjects,
        created_at: now,
        updated_at: now,
    })
}

/// Look up by the identity triple.
pub async fn find_by_key(
    pool: &SqlitePool,
    student_id: &str,
    faculty_id: Uuid,
    semester_id: Uuid,
) -> Result<Option<Student>> {
    let row = sqlx::query(
        "SELECT * FROM students WHERE student_id = ? AND faculty_id = ? AND semester_id = ?",
    )
    .bind(student_id)
    .bind(faculty_id.to_string())
    .bind(semester_id.to_string())
    .fetch_optional(pool)
    .await?;

    row.as_ref().map(map_record).transpose()
}

pub async fn load_record(pool: &SqlitePool, guid: Uuid) -> Result<Option<Student>> {
    let row = sqlx::query("SELECT * FROM students WHERE guid = ?")
        .bind(guid.to_string())
        .fetch_optional(pool)
        .await?;

    row.as_ref().map(map_record).transpose()
}

pub async fn load_view(pool: &SqlitePool, guid: Uuid) -> Result<Option<StudentView>> {
    let sql = format!("{} WHERE st.guid = ?", VIEW_SELECT);
    let row = sqlx::query(&sql)
        .bind(guid.to_string())
        .fetch_optional(pool)
        .await?;

    row.as_ref().map(map_view).transpose()
}

/// Portal lookup by raw student id (first match across all registrations).
pub async fn find_by_student_id(pool: &SqlitePool, student_id: &str) -> Result<Option<StudentView>> {
    let sql = format!("{} WHERE st.student_id = ? LIMIT 1", VIEW_SELECT);
    let row = sqlx::query(&sql)
        .bind(student_id)
        .fetch_optional(pool)
        .await?;

    row.as_ref().map(map_view).transpose()
}

pub async fn list_all(pool: &SqlitePool) -> Result<Vec<StudentView>> {
    let sql = format!("{} ORDER BY st.created_at", VIEW_SELECT);
    let rows = sqlx::query(&sql).fetch_all(pool).await?;

    rows.iter().map(map_view).collect()
}

/// Case-insensitive literal substring search on name, optionally narrowed
/// by faculty and semester.
pub async fn search(
    pool: &SqlitePool,
    name: Option<&str>,
    faculty_id: Option<Uuid>,
    semester_id: Option<Uuid>,
) -> Result<Vec<StudentView>> {
    let mut sql = String::from(VIEW_SELECT);
    let mut conditions = Vec::new();

    if name.is_some() {
        conditions.push("st.name LIKE ? ESCAPE '\\'");
    }
    if faculty_id.is_some() {
        conditions.push("st.faculty_id = ?");
    }
    if semester_id.is_some() {
        conditions.push("st.semester_id = ?");
    }
    if !conditions.is_empty() {
        sql.push_str(" WHERE ");
        sql.push_str(&conditions.join(" AND "));
    }
    sql.push_str(" ORDER BY st.name");

    let mut query = sqlx::query(&sql);
    if let Some(name) = name {
        query = query.bind(format!("%{}%", escape_like(name)));
    }
    if let Some(faculty_id) = faculty_id {
        query = query.bind(faculty_id.to_string());
    }
    if let Some(semester_id) = semester_id {
        query = query.bind(semester_id.to_string());
    }

    let rows = query.fetch_all(pool).await?;
    rows.iter().map(map_view).collect()
}

pub async fn by_semester(pool: &SqlitePool, semester_id: Uuid) -> Result<Vec<StudentView>> {
    let sql = format!("{} WHERE st.semester_id = ? ORDER BY st.name", VIEW_SELECT);
    let rows = sqlx::query(&sql)
        .bind(semester_id.to_string())
        .fetch_all(pool)
        .await?;

    rows.iter().map(map_view).collect()
}

pub async fn by_faculty_semester(
    pool: &SqlitePool,
    faculty_id: Uuid,
    semester_id: Uuid,
) -> Result<Vec<StudentView>> {
    let sql = format!(
        "{} WHERE st.faculty_id = ? AND st.semester_id = ? ORDER BY st.name",
        VIEW_SELECT
    );
    let rows = sqlx::query(&sql)
        .bind(faculty_id.to_string())
        .bind(semester_id.to_string())
        .fetch_all(pool)
        .await?;

    rows.iter().map(map_view).collect()
}

/// Suffix match on the trailing digits of student_id. The caller validates
/// that `digits` is numeric, so no LIKE escaping is needed.
pub async fn by_last4(pool: &SqlitePool, digits: &str) -> Result<Vec<StudentView>> {
    let sql = format!("{} WHERE st.student_id LIKE ? ORDER BY st.name", VIEW_SELECT);
    let rows = sqlx::query(&sql)
        .bind(format!("%{}", digits))
        .fetch_all(pool)
        .await?;

    rows.iter().map(map_view).collect()
}

/// Overwrite name, normalized_name and phone in place (bulk upsert's
/// update path). Subjects are untouched.
pub async fn update_contact(
    pool: &SqlitePool,
    guid: Uuid,
    name: &str,
    normalized_name: &str,
    phone: Option<&str>,
) -> Result<()> {
    let (_, now_text) = super::now();

    sqlx::query(
        "UPDATE students SET name = ?, normalized_name = ?, phone = ?, updated_at = ? WHERE guid = ?",
    )
    .bind(name)
    .bind(normalized_name)
    .bind(phone)
    .bind(&now_text)
    .bind(guid.to_string())
    .execute(pool)
    .await?;

    Ok(())
}

/// Replace the embedded subject rows.
pub async fn set_subjects(pool: &SqlitePool, guid: Uuid, subjects: &[Subject]) -> Result<()> {
    let (_, now_text) = super::now();
    let subjects_json = serde_json::to_string(subjects)?;

    sqlx::query("UPDATE students SET subjects = ?, updated_at = ? WHERE guid = ?")
        .bind(&subjects_json)
        .bind(&now_text)
        .bind(guid.to_string())
        .execute(pool)
        .await?;

    Ok(())
}

/// Merge an approved update action onto a student. Returns false when the
/// student no longer exists. Renaming recomputes the stored name key.
pub async fn apply_update(pool: &SqlitePool, guid: Uuid, update: &StudentUpdate) -> Result<bool> {
    let Some(mut student) = load_record(pool, guid).await? else {
        return Ok(false);
    };

    if let Some(name) = &update.name {
        student.name = name.clone();
        student.normalized_name = normalize_name(name);
    }
    if let Some(faculty_id) = update.faculty {
        student.faculty_id = faculty_id;
    }
    if let Some(semester_id) = update.semester {
        student.semester_id = semester_id;
    }
    if let Some(subjects) = &update.subjects {
        student.subjects = dedup_subjects(subjects.clone());
    }

    let (_, now_text) = super::now();
    let subjects_json = serde_json::to_string(&student.subjects)?;

    let result = sqlx::query(
        "UPDATE students
         SET name = ?, normalized_name = ?, faculty_id = ?, semester_id = ?, subjects = ?, updated_at = ?
         WHERE guid = ?",
    )
    .bind(&student.name)
    .bind(&student.normalized_name)
    .bind(student.faculty_id.to_string())
    .bind(student.semester_id.to_string())
    .bind(&subjects_json)
    .bind(&now_text)
    .bind(guid.to_string())
    .execute(pool)
    .await?;

    Ok(result.rows_affected() > 0)
}

/// Delete a student. Idempotent.
pub async fn delete(pool: &SqlitePool, guid: Uuid) -> Result<u64> {
    let result = sqlx::query("DELETE FROM students WHERE guid = ?")
        .bind(guid.to_string())
        .execute(pool)
        .await?;

    Ok(result.rows_affected())
}

// ============================================================================
// Bulk import
// ============================================================================

/// One bulk import row as uploaded (header row excluded).
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BulkRow {
    #[serde(default)]
    pub student_id: Option<String>,
    #[serde(default)]
    pub name: Option<String>,
    #[serde(default)]
    pub phone: Option<String>,
    #[serde(default)]
    pub faculty: Option<String>,
    #[serde(default)]
    pub semester: Option<String>,
}

/// Per-row error, keyed by the 1-based display row number (offset by the
/// header row, i.e. index + 2).
#[derive(Debug, PartialEq, Eq, Serialize)]
pub struct RowError {
    pub row: usize,
    pub error: String,
}

/// Bulk import outcome.
#[derive(Debug, Default, Serialize)]
pub struct BulkImportResult {
    pub added: u64,
    pub updated: u64,
    pub errors: u64,
    #[serde(rename = "errorDetails")]
    pub error_details: Vec<RowError>,
}

enum RowOutcome {
    Added,
    Updated,
}

/// Upsert many students with per-row isolation: one row's failure is
/// recorded and the batch continues. No transaction spans the batch.
pub async fn bulk_import(pool: &SqlitePool, rows: &[Value]) -> BulkImportResult {
    let mut result = BulkImportResult::default();

    for (index, value) in rows.iter().enumerate() {
        match import_row(pool, value).await {
            Ok(RowOutcome::Added) => result.added += 1,
            Ok(RowOutcome::Updated) => result.updated += 1,
            Err(e) => {
                result.errors += 1;
                result.error_details.push(RowError {
                    row: index + 2,
                    error: e.to_string(),
                });
            }
        }
    }

    result
}

async fn import_row(pool: &SqlitePool, value: &Value) -> Result<RowOutcome> {
    let row: BulkRow =
        serde_json::from_value(value.clone()).map_err(|_| anyhow!(MISSING_FIELDS_ERROR))?;

    let student_id = row.student_id.as_deref().filter(|v| !v.is_empty());
    let name = row.name.as_deref().filter(|v| !v.is_empty());
    let faculty = row.faculty.as_deref().filter(|v| !v.is_empty());
    let semester = row.semester.as_deref().filter(|v| !v.is_empty());

    let (Some(student_id), Some(name), Some(faculty), Some(semester)) =
        (student_id, name, faculty, semester)
    else {
        bail!(MISSING_FIELDS_ERROR);
    };

    let faculty_id = Uuid::parse_str(faculty).map_err(|_| anyhow!("Invalid faculty id"))?;
    let semester_id = Uuid::parse_str(semester).map_err(|_| anyhow!("Invalid semester id"))?;

    match find_by_key(pool, student_id, faculty_id, semester_id).await? {
        Some(existing) => {
            let normalized_name = normalize_name(name);
            update_contact(pool, existing.guid, name, &normalized_name, row.phone.as_deref())
                .await?;
            Ok(RowOutcome::Updated)
        }
        None => {
            create(
                pool,
                NewStudent {
                    student_id,
                    name,
                    phone: row.phone.as_deref(),
                    faculty_id,
                    semester_id,
                    subjects: &[],
                },
            )
            .await?;
            Ok(RowOutcome::Added)
        }
    }
}

/// Recompute normalized_name for every student. Returns the number of rows
/// whose stored key actually changed.
pub async fn renormalize_all(pool: &SqlitePool) -> Result<u64> {
    let rows = sqlx::query("SELECT guid, name, normalized_name FROM students")
        .fetch_all(pool)
        .await?;

    let mut updated = 0;
    for row in &rows {
        let name: String = row.get("name");
        let stored: String = row.get("normalized_name");
        let normalized = normalize_name(&name);
        if normalized != stored {
            let (_, now_text) = super::now();
            sqlx::query("UPDATE students SET normalized_name = ?, updated_at = ? WHERE guid = ?")
                .bind(&normalized)
                .bind(&now_text)
                .bind(row.get::<String, _>("guid"))
                .execute(pool)
                .await?;
            updated += 1;
        }
    }

    Ok(updated)
}
