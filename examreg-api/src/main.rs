//! examreg-api - Academic records backend
//!
//! HTTP service over the examreg store: faculties, semesters, students
//! with embedded subject grades, and the sitting moderation queue that
//! gates update/delete mutations behind human approval.

use anyhow::Result;
use clap::Parser;
use examreg_api::cache::{SittingCache, SITTING_CACHE_TTL};
use examreg_api::{build_router, AppState};
use examreg_common::config;
use examreg_common::student_id::StudentIdCodec;
use tracing::info;

#[derive(Debug, Parser)]
#[command(name = "examreg-api", about = "Academic records backend")]
struct Args {
    /// Data root folder holding examreg.db
    #[arg(long)]
    root_folder: Option<String>,

    /// HTTP listen port
    #[arg(long)]
    port: Option<u16>,
}

#[tokio::main]
async fn main() -> Result<()> {
    let args = Args::parse();

    // Initialize tracing subscriber
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::from_default_env()
                .add_directive(tracing::Level::INFO.into()),
        )
        .init();

    // Build identification immediately after tracing init, before any
    // database delays.
    info!(
        "Starting examreg-api v{} [{}] built {} ({})",
        env!("CARGO_PKG_VERSION"),
        env!("GIT_HASH"),
        env!("BUILD_TIMESTAMP"),
        env!("BUILD_PROFILE")
    );

    let root_folder = config::resolve_root_folder(args.root_folder.as_deref());
    let db_path = config::database_path(&root_folder);
    info!("Database path: {}", db_path.display());

    let pool = examreg_common::db::connect(&db_path).await?;
    info!("✓ Connected to database");

    let id_codec = StudentIdCodec::new(&config::resolve_id_salt())?;
    let sitting_cache = SittingCache::new(SITTING_CACHE_TTL);

    let state = AppState::new(pool, sitting_cache, id_codec);
    let app = build_router(state);

    let port = config::resolve_port(args.port);
    let listener = tokio::net::TcpListener::bind(("0.0.0.0", port)).await?;
    info!("examreg-api listening on http://0.0.0.0:{}", port);
    info!("Health check: http://127.0.0.1:{}/health", port);

    axum::serve(listener, app).await?;

    Ok(())
}
