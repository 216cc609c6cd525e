//! Moderation endpoints for sitting actions

use axum::extract::{Path, State};
use axum::routing::{get, post};
use axum::{Json, Router};
use serde::Deserialize;
use serde_json::Value;

use crate::api::parse_id;
use crate::db;
use crate::db::sitting::{Decision, ResolveError};
use crate::{ApiError, ApiResult, AppState};
use examreg_common::db::models::SittingAction;

/// Cache key for the backlog listing.
pub const SITTING_CACHE_KEY: &str = "sitting";

pub fn routes() -> Router<AppState> {
    Router::new()
        .route("/", get(list_actions))
        .route("/:id/action", post(resolve_action))
}

/// GET /api/sitting — full backlog newest first, served through the TTL
/// cache. Staleness up to the TTL is accepted for reads; resolutions
/// invalidate eagerly.
async fn list_actions(State(state): State<AppState>) -> ApiResult<Json<Value>> {
    if let Some(cached) = state.sitting_cache.get(SITTING_CACHE_KEY).await {
        return Ok(Json(cached));
    }

    let actions = db::sitting::list(&state.db).await?;
    let value = serde_json::to_value(&actions).map_err(anyhow::Error::from)?;
    state.sitting_cache.put(SITTING_CACHE_KEY, value.clone()).await;

    Ok(Json(value))
}

#[derive(Debug, Deserialize)]
struct ResolveRequest {
    action: String,
}

/// POST /api/sitting/:id/action with body {"action": "approved"|"cancelled"}
async fn resolve_action(
    State(state): State<AppState>,
    Path(id): Path<String>,
    Json(payload): Json<ResolveRequest>,
) -> ApiResult<Json<SittingAction>> {
    let guid = parse_id(&id, "Invalid action id")?;
    let decision = Decision::from_str(&payload.action).ok_or_else(|| {
        ApiError::BadRequest("Action must be 'approved' or 'cancelled'".to_string())
    })?;

    let action = db::sitting::resolve(&state.db, guid, decision)
        .await
        .map_err(map_resolve_error)?;

    state.sitting_cache.invalidate(SITTING_CACHE_KEY).await;

    Ok(Json(action))
}

fn map_resolve_error(err: ResolveError) -> ApiError {
    match err {
        ResolveError::NotPending => {
            ApiError::NotFound("Not found or already processed".to_string())
        }
        ResolveError::TargetMissing(label) => {
            ApiError::NotFound(format!("{} no longer exists", label))
        }
        ResolveError::Other(e) => ApiError::Other(e),
    }
}
