//! Pending action log and moderation engine
//!
//! Update and delete requests against faculties, semesters, and students
//! are queued here as sitting actions instead of mutating the store
//! directly. Approval claims the action, applies the deferred mutation,
//! then persists the final status.
//!
//! The claim step (pending -> applying) is an atomic compare-and-set, so
//! a crash between applying the mutation and persisting `approved` leaves
//! the action in `applying`, which can never be claimed again. Without it
//! a retry after such a crash would apply the mutation twice.

use anyhow::{anyhow, Context, Result};
use examreg_common::db::models::{
    NameUpdate, SittingAction, SittingKind, SittingStatus, SittingTarget, StudentUpdate,
};
use serde::de::DeserializeOwned;
use sqlx::sqlite::SqliteRow;
use sqlx::{Row, SqlitePool};
use thiserror::Error;
use uuid::Uuid;

/// Moderation decision for a pending action.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Decision {
    Approved,
    Cancelled,
}

impl Decision {
    pub fn from_str(s: &str) -> Option<Self> {
        match s {
            "approved" => Some(Decision::Approved),
            "cancelled" => Some(Decision::Cancelled),
            _ => None,
        }
    }
}

/// Failure modes of [`resolve`].
#[derive(Debug, Error)]
pub enum ResolveError {
    /// The id does not exist, or the action already left `pending`.
    #[error("Not found or already processed")]
    NotPending,

    /// An update's target vanished between proposal and approval. The
    /// delete counterpart is a no-op instead.
    #[error("{0} no longer exists")]
    TargetMissing(&'static str),

    #[error(transparent)]
    Other(#[from] anyhow::Error),
}

fn map_row(row: &SqliteRow) -> Result<SittingAction> {
    let target_raw: String = row.get("target_type");
    let kind_raw: String = row.get("kind");
    let status_raw: String = row.get("status");

    let payload = row
        .get::<Option<String>, _>("payload")
        .map(|raw| serde_json::from_str(&raw).context("Malformed action payload column"))
        .transpose()?;

    Ok(SittingAction {
        guid: super::parse_guid(&row.get::<String, _>("guid"))?,
        target: SittingTarget::from_str(&target_raw)
            .ok_or_else(|| anyhow!("Unknown target type: {}", target_raw))?,
        target_id: super::parse_guid(&row.get::<String, _>("target_id"))?,
        display_name: row.get("display_name"),
        kind: SittingKind::from_str(&kind_raw)
            .ok_or_else(|| anyhow!("Unknown mutation kind: {}", kind_raw))?,
        payload,
        status: SittingStatus::from_str(&status_raw)
            .ok_or_else(|| anyhow!("Unknown status: {}", status_raw))?,
        created_at: super::parse_timestamp(&row.get::<String, _>("created_at"))?,
    })
}

/// Queue a proposed mutation. Always created as `pending`; a target may
/// accumulate several simultaneous proposals.
pub async fn propose(
    pool: &SqlitePool,
    target: SittingTarget,
    target_id: Uuid,
    display_name: &str,
    kind: SittingKind,
    payload: Option<serde_json::Value>,
) -> Result<SittingAction> {
    let guid = Uuid::new_v4();
    let (now, now_text) = super::now();
    let payload_json = payload
        .as_ref()
        .map(serde_json::to_string)
        .transpose()?;

    sqlx::query(
        "INSERT INTO sitting_actions
            (guid, target_type, target_id, display_name, kind, payload, status, created_at)
         VALUES (?, ?, ?, ?, ?, ?, 'pending', ?)",
    )
    .bind(guid.to_string())
    .bind(target.as_str())
    .bind(target_id.to_string())
    .bind(display_name)
    .bind(kind.as_str())
    .bind(payload_json)
    .bind(&now_text)
    .execute(pool)
    .await?;

    Ok(SittingAction {
        guid,
        target,
        target_id,
        display_name: display_name.to_string(),
        kind,
        payload,
        status: SittingStatus::Pending,
        created_at: now,
    })
}

/// Full backlog, newest first.
pub async fn list(pool: &SqlitePool) -> Result<Vec<SittingAction>> {
    let rows = sqlx::query("SELECT * FROM sitting_actions ORDER BY created_at DESC")
        .fetch_all(pool)
        .await?;

    rows.iter().map(map_row).collect()
}

pub async fn load(pool: &SqlitePool, guid: Uuid) -> Result<Option<SittingAction>> {
    let row = sqlx::query("SELECT * FROM sitting_actions WHERE guid = ?")
        .bind(guid.to_string())
        .fetch_optional(pool)
        .await?;

    row.as_ref().map(map_row).transpose()
}

/// Move an action between statuses, guarded on the current status.
/// Returns false when the guard did not match.
async fn set_status_if(
    pool: &SqlitePool,
    guid: Uuid,
    from: SittingStatus,
    to: SittingStatus,
) -> Result<bool> {
    let result = sqlx::query("UPDATE sitting_actions SET status = ? WHERE guid = ? AND status = ?")
        .bind(to.as_str())
        .bind(guid.to_string())
        .bind(from.as_str())
        .execute(pool)
        .await?;

    Ok(result.rows_affected() > 0)
}

/// Resolve a pending action.
///
/// Approval performs the deferred mutation before the final status is
/// persisted; cancellation has no side effect. Either way the action is
/// immutable afterwards: a second resolve reports `NotPending`.
pub async fn resolve(
    pool: &SqlitePool,
    guid: Uuid,
    decision: Decision,
) -> Result<SittingAction, ResolveError> {
    match decision {
        Decision::Cancelled => {
            if !set_status_if(pool, guid, SittingStatus::Pending, SittingStatus::Cancelled).await? {
                return Err(ResolveError::NotPending);
            }
        }
        Decision::Approved => {
            if !set_status_if(pool, guid, SittingStatus::Pending, SittingStatus::Applying).await? {
                return Err(ResolveError::NotPending);
            }

            let action = load(pool, guid).await?.ok_or(ResolveError::NotPending)?;

            if let Err(apply_err) = apply(pool, &action).await {
                // Release the claim so the action can be retried or
                // cancelled once the failure is understood.
                if let Err(rollback_err) =
                    set_status_if(pool, guid, SittingStatus::Applying, SittingStatus::Pending).await
                {
                    tracing::error!(
                        "Failed to release claim on sitting action {}: {}",
                        guid,
                        rollback_err
                    );
                }
                return Err(apply_err);
            }

            set_status_if(pool, guid, SittingStatus::Applying, SittingStatus::Approved).await?;
        }
    }

    load(pool, guid).await?.ok_or(ResolveError::NotPending)
}

/// Translate an approved action into a concrete store mutation.
async fn apply(pool: &SqlitePool, action: &SittingAction) -> Result<(), ResolveError> {
    match (action.target, action.kind) {
        (SittingTarget::Faculty, SittingKind::Delete) => {
            super::faculties::delete(pool, action.target_id).await?;
        }
        (SittingTarget::Faculty, SittingKind::Update) => {
            let update: NameUpdate = parse_payload(action)?;
            if !super::faculties::rename(pool, action.target_id, &update.name).await? {
                return Err(ResolveError::TargetMissing(action.target.label()));
            }
        }
        (SittingTarget::Semester, SittingKind::Delete) => {
            super::semesters::delete(pool, action.target_id).await?;
        }
        (SittingTarget::Semester, SittingKind::Update) => {
            let update: NameUpdate = parse_payload(action)?;
            if !super::semesters::rename(pool, action.target_id, &update.name).await? {
                return Err(ResolveError::TargetMissing(action.target.label()));
            }
        }
        (SittingTarget::Student, SittingKind::Delete) => {
            super::students::delete(pool, action.target_id).await?;
        }
        (SittingTarget::Student, SittingKind::Update) => {
            let update: StudentUpdate = parse_payload(action)?;
            if !super::students::apply_update(pool, action.target_id, &update).await? {
                return Err(ResolveError::TargetMissing(action.target.label()));
            }
        }
    }

    Ok(())
}

fn parse_payload<T: DeserializeOwned>(action: &SittingAction) -> Result<T, ResolveError> {
    let payload = action
        .payload
        .clone()
        .ok_or_else(|| anyhow!("Update action {} has no payload", action.guid))?;

    Ok(serde_json::from_value(payload).context("Malformed action payload")?)
}
