//! Database bootstrap: connection and table creation

use crate::Result;
use sqlx::SqlitePool;
use std::path::Path;

/// Open (or create) the database and ensure the schema exists.
pub async fn connect(db_path: &Path) -> Result<SqlitePool> {
    // Ensure parent directory exists
    if let Some(parent) = db_path.parent() {
        std::fs::create_dir_all(parent)?;
    }

    // mode=rwc: read, write, create
    let db_url = format!("sqlite://{}?mode=rwc", db_path.display());
    tracing::debug!("Connecting to database: {}", db_url);

    let pool = SqlitePool::connect(&db_url).await?;
    init_database(&pool).await?;

    Ok(pool)
}

/// Create all tables and indexes if they don't exist.
pub async fn init_database(pool: &SqlitePool) -> Result<()> {
    create_faculties_table(pool).await?;
    create_semesters_table(pool).await?;
    create_students_table(pool).await?;
    create_sitting_actions_table(pool).await?;

    tracing::info!(
        "Database tables initialized (faculties, semesters, students, sitting_actions)"
    );

    Ok(())
}

pub async fn create_faculties_table(pool: &SqlitePool) -> Result<()> {
    sqlx::query(
        r#"
        CREATE TABLE IF NOT EXISTS faculties (
            guid TEXT PRIMARY KEY,
            name TEXT NOT NULL,
            created_at TEXT NOT NULL,
            updated_at TEXT NOT NULL
        )
        "#,
    )
    .execute(pool)
    .await?;

    Ok(())
}

/// Semester rows reference a faculty by id. The reference is advisory:
/// no FOREIGN KEY constraint, and deleting a faculty leaves its semesters
/// in place.
pub async fn create_semesters_table(pool: &SqlitePool) -> Result<()> {
    sqlx::query(
        r#"
        CREATE TABLE IF NOT EXISTS semesters (
            guid TEXT PRIMARY KEY,
            name TEXT NOT NULL,
            faculty_id TEXT NOT NULL,
            created_at TEXT NOT NULL,
            updated_at TEXT NOT NULL
        )
        "#,
    )
    .execute(pool)
    .await?;

    sqlx::query(
        "CREATE INDEX IF NOT EXISTS idx_semesters_faculty ON semesters(faculty_id)",
    )
    .execute(pool)
    .await?;

    Ok(())
}

/// Students are unique per (student_id, faculty, semester) and per
/// (normalized_name, faculty, semester). Subject rows are embedded as a
/// JSON array in the subjects column.
pub async fn create_students_table(pool: &SqlitePool) -> Result<()> {
    sqlx::query(
        r#"
        CREATE TABLE IF NOT EXISTS students (
            guid TEXT PRIMARY KEY,
            student_id TEXT NOT NULL,
            name TEXT NOT NULL,
            normalized_name TEXT NOT NULL,
            phone TEXT,
            faculty_id TEXT NOT NULL,
            semester_id TEXT NOT NULL,
            subjects TEXT NOT NULL DEFAULT '[]',
            created_at TEXT NOT NULL,
            updated_at TEXT NOT NULL
        )
        "#,
    )
    .execute(pool)
    .await?;

    sqlx::query(
        "CREATE UNIQUE INDEX IF NOT EXISTS idx_students_identity
         ON students(student_id, faculty_id, semester_id)",
    )
    .execute(pool)
    .await?;

    sqlx::query(
        "CREATE UNIQUE INDEX IF NOT EXISTS idx_students_normalized_name
         ON students(normalized_name, faculty_id, semester_id)",
    )
    .execute(pool)
    .await?;

    Ok(())
}

pub async fn create_sitting_actions_table(pool: &SqlitePool) -> Result<()> {
    sqlx::query(
        r#"
        CREATE TABLE IF NOT EXISTS sitting_actions (
            guid TEXT PRIMARY KEY,
            target_type TEXT NOT NULL,
            target_id TEXT NOT NULL,
            display_name TEXT NOT NULL,
            kind TEXT NOT NULL,
            payload TEXT,
            status TEXT NOT NULL DEFAULT 'pending',
            created_at TEXT NOT NULL
        )
        "#,
    )
    .execute(pool)
    .await?;

    sqlx::query(
        "CREATE INDEX IF NOT EXISTS idx_sitting_actions_created
         ON sitting_actions(created_at)",
    )
    .execute(pool)
    .await?;

    Ok(())
}
