//! Ingredient catalog loader.
//!
//! Reads a JSON array of `{"name", "measurement_unit"}` records and inserts
//! them into the catalog.

use std::path::{Path, PathBuf};
use std::sync::Arc;

use anyhow::Context;
use clap::Parser;
use foodgram_common::Config;
use foodgram_core::{IngredientInput, IngredientService};
use foodgram_db::repositories::IngredientRepository;
use tracing::info;

/// Load ingredients into the catalog.
#[derive(Debug, Parser)]
#[command(name = "foodgram-load-ingredients", version)]
struct Args {
    /// JSON file with the ingredient records
    file: PathBuf,

    /// Delete the existing catalog before loading
    #[arg(long)]
    replace: bool,
}

fn read_records(path: &Path) -> anyhow::Result<Vec<IngredientInput>> {
    let raw = std::fs::read_to_string(path)
        .with_context(|| format!("failed to read {}", path.display()))?;
    serde_json::from_str(&raw).with_context(|| format!("invalid ingredient file {}", path.display()))
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenvy::dotenv().ok();
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "foodgram=info".into()),
        )
        .init();

    let args = Args::parse();
    let records = read_records(&args.file)?;
    info!(file = %args.file.display(), records = records.len(), "Loading ingredients");

    let config = Config::load()?;
    let db = foodgram_db::init(&config).await?;
    foodgram_db::migrate(&db).await?;

    let service = IngredientService::new(IngredientRepository::new(Arc::new(db)));
    let report = service.import(records, args.replace).await?;

    info!(
        created = report.created,
        skipped = report.skipped,
        "Ingredient catalog loaded"
    );
    Ok(())
}
