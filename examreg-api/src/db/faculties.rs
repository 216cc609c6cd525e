//! Faculty store operations

use anyhow::Result;
use examreg_common::db::models::Faculty;
use sqlx::sqlite::SqliteRow;
use sqlx::{Row, SqlitePool};
use uuid::Uuid;

fn map_row(row: &SqliteRow) -> Result<Faculty> {
    Ok(Faculty {
        guid: super::parse_guid(&row.get::<String, _>("guid"))?,
        name: row.get("name"),
        created_at: super::parse_timestamp(&row.get::<String, _>("created_at"))?,
        updated_at: super::parse_timestamp(&row.get::<String, _>("updated_at"))?,
    })
}

pub async fn create(pool: &SqlitePool, name: &str) -> Result<Faculty> {
    let guid = Uuid::new_v4();
    let (now, now_text) = super::now();

    sqlx::query(
        "INSERT INTO faculties (guid, name, created_at, updated_at) VALUES (?, ?, ?, ?)",
    )
    .bind(guid.to_string())
    .bind(name)
    .bind(&now_text)
    .bind(&now_text)
    .execute(pool)
    .await?;

    Ok(Faculty {
        guid,
        name: name.to_string(),
        created_at: now,
        updated_at: now,
    })
}

pub async fn list(pool: &SqlitePool) -> Result<Vec<Faculty>> {
    let rows = sqlx::query("SELECT guid, name, created_at, updated_at FROM faculties ORDER BY created_at")
        .fetch_all(pool)
        .await?;

    rows.iter().map(map_row).collect()
}

pub async fn load(pool: &SqlitePool, guid: Uuid) -> Result<Option<Faculty>> {
    let row = sqlx::query("SELECT guid, name, created_at, updated_at FROM faculties WHERE guid = ?")
        .bind(guid.to_string())
        .fetch_optional(pool)
        .await?;

    row.as_ref().map(map_row).transpose()
}

/// Rename a faculty. Returns false when the faculty no longer exists.
pub async fn rename(pool: &SqlitePool, guid: Uuid, name: &str) -> Result<bool> {
    let (_, now_text) = super::now();

    let result = sqlx::query("UPDATE faculties SET name = ?, updated_at = ? WHERE guid = ?")
        .bind(name)
        .bind(&now_text)
        .bind(guid.to_string())
        .execute(pool)
        .await?;

    Ok(result.rows_affected() > 0)
}

/// Delete a faculty. Zero affected rows is not an error: deletes are
/// idempotent so an approved action whose target is already gone succeeds.
pub async fn delete(pool: &SqlitePool, guid: Uuid) -> Result<u64> {
    let result = sqlx::query("DELETE FROM faculties WHERE guid = ?")
        .bind(guid.to_string())
        .execute(pool)
        .await?;

    Ok(result.rows_affected())
}
