//! examreg-api library - academic records HTTP service
//!
//! Exposes the router and application state for integration testing.

pub mod api;
pub mod cache;
pub mod db;
pub mod error;

pub use crate::error::{ApiError, ApiResult};

use axum::http::{header, HeaderValue, Method};
use axum::Router;
use cache::SittingCache;
use examreg_common::student_id::StudentIdCodec;
use sqlx::SqlitePool;
use std::sync::Arc;
use tower_http::cors::{AllowOrigin, CorsLayer};
use tower_http::trace::TraceLayer;

/// Browser origins permitted to call the API with credentials.
const ALLOWED_ORIGINS: [&str; 3] = [
    "http://localhost:5173",
    "https://examination-omega.vercel.app",
    "https://student-portal-seven-bay.vercel.app",
];

/// Application state shared across HTTP handlers
#[derive(Clone)]
pub struct AppState {
    /// Database connection pool
    pub db: SqlitePool,
    /// TTL cache in front of the sitting action list
    pub sitting_cache: SittingCache,
    /// Codec for obfuscated public student identifiers
    pub id_codec: Arc<StudentIdCodec>,
}

impl AppState {
    pub fn new(db: SqlitePool, sitting_cache: SittingCache, id_codec: StudentIdCodec) -> Self {
        Self {
            db,
            sitting_cache,
            id_codec: Arc::new(id_codec),
        }
    }
}

/// Build application router
pub fn build_router(state: AppState) -> Router {
    Router::new()
        .nest("/api/faculties", api::faculties::routes())
        .nest("/api/semesters", api::semesters::routes())
        .nest("/api/students", api::students::routes())
        .nest("/api/sitting", api::sitting::routes())
        .merge(api::health::health_routes())
        .layer(cors_layer())
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}

fn cors_layer() -> CorsLayer {
    let origins: Vec<HeaderValue> = ALLOWED_ORIGINS
        .iter()
        .map(|o| HeaderValue::from_static(o))
        .collect();

    CorsLayer::new()
        .allow_origin(AllowOrigin::list(origins))
        .allow_methods([Method::GET, Method::POST, Method::PUT, Method::DELETE])
        .allow_headers([header::CONTENT_TYPE])
        .allow_credentials(true)
}
