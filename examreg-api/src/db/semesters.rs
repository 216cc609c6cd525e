//! Semester store operations

use anyhow::Result;
use examreg_common::db::models::Semester;
use sqlx::sqlite::SqliteRow;
use sqlx::{Row, SqlitePool};
use uuid::Uuid;

fn map_row(row: &SqliteRow) -> Result<Semester> {
    Ok(Semester {
        guid: super::parse_guid(&row.get::<String, _>("guid"))?,
        name: row.get("name"),
        faculty_id: super::parse_guid(&row.get::<String, _>("faculty_id"))?,
        created_at: super::parse_timestamp(&row.get::<String, _>("created_at"))?,
        updated_at: super::parse_timestamp(&row.get::<String, _>("updated_at"))?,
    })
}

pub async fn create(pool: &SqlitePool, name: &str, faculty_id: Uuid) -> Result<Semester> {
    let guid = Uuid::new_v4();
    let (now, now_text) = super::now();

    sqlx::query(
        "INSERT INTO semesters (guid, name, faculty_id, created_at, updated_at) VALUES (?, ?, ?, ?, ?)",
    )
    .bind(guid.to_string())
    .bind(name)
    .bind(faculty_id.to_string())
    .bind(&now_text)
    .bind(&now_text)
    .execute(pool)
    .await?;

    Ok(Semester {
        guid,
        name: name.to_string(),
        faculty_id,
        created_at: now,
        updated_at: now,
    })
}

pub async fn load(pool: &SqlitePool, guid: Uuid) -> Result<Option<Semester>> {
    let row = sqlx::query(
        "SELECT guid, name, faculty_id, created_at, updated_at FROM semesters WHERE guid = ?",
    )
    .bind(guid.to_string())
    .fetch_optional(pool)
    .await?;

    row.as_ref().map(map_row).transpose()
}

pub async fn list_for_faculty(pool: &SqlitePool, faculty_id: Uuid) -> Result<Vec<Semester>> {
    let rows = sqlx::query(
        "SELECT guid, name, faculty_id, created_at, updated_at
         FROM semesters
         WHERE faculty_id = ?
         ORDER BY created_at",
    )
    .bind(faculty_id.to_string())
    .fetch_all(pool)
    .await?;

    rows.iter().map(map_row).collect()
}

/// Rename a semester. Returns false when the semester no longer exists.
pub async fn rename(pool: &SqlitePool, guid: Uuid, name: &str) -> Result<bool> {
    let (_, now_text) = super::now();

    let result = sqlx::query("UPDATE semesters SET name = ?, updated_at = ? WHERE guid = ?")
        .bind(name)
        .bind(&now_text)
        .bind(guid.to_string())
        .execute(pool)
        .await?;

    Ok(result.rows_affected() > 0)
}

/// Delete a semester. Idempotent; students referencing it are left alone.
pub async fn delete(pool: &SqlitePool, guid: Uuid) -> Result<u64> {
    let result = sqlx::query("DELETE FROM semesters WHERE guid = ?")
        .bind(guid.to_string())
        .execute(pool)
        .await?;

    Ok(result.rows_affected())
}
