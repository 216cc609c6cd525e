//! Backfill normalized_name for every student row
//!
//! One-shot maintenance tool for databases written before normalization
//! existed, or after a normalization rule change.

use anyhow::Result;
use clap::Parser;
use examreg_common::config;
use tracing::info;

#[derive(Debug, Parser)]
#[command(name = "normalize-students", about = "Recompute stored student name keys")]
struct Args {
    /// Data root folder holding examreg.db
    #[arg(long)]
    root_folder: Option<String>,
}

#[tokio::main]
async fn main() -> Result<()> {
    let args = Args::parse();

    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::from_default_env()
                .add_directive(tracing::Level::INFO.into()),
        )
        .init();

    let root_folder = config::resolve_root_folder(args.root_folder.as_deref());
    let db_path = config::database_path(&root_folder);
    info!("Database path: {}", db_path.display());

    let pool = examreg_common::db::connect(&db_path).await?;

    let updated = examreg_api::db::students::renormalize_all(&pool).await?;
    info!("All students normalized ({} rows updated)", updated);

    Ok(())
}
