//! Catalog loader for Foodgram.
//!
//! Imports ingredients and tags from JSON files into the configured database.
//! Rows that already exist are skipped, so the loader can be re-run safely.
//!
//! Usage:
//! ```bash
//! # Load the ingredient catalog
//! load-catalog --ingredients data/ingredients.json
//!
//! # Load tags with a different config file
//! load-catalog --config prod.yml --tags data/tags.json
//! ```
//!
//! Ingredients are `[{"name": "...", "measurement_unit": "..."}]`, tags are
//! `[{"name": "...", "color": "#RRGGBB", "slug": "..."}]`.

use anyhow::{bail, Context, Result};
use clap::Parser;
use serde::de::DeserializeOwned;
use std::path::{Path, PathBuf};
use tracing::info;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use foodgram::{
    config::Config,
    db::{
        self,
        repositories::{SqlxIngredientRepository, SqlxTagRepository},
    },
    models::{CreateIngredientInput, CreateTagInput},
    services::CatalogService,
};

#[derive(Parser)]
#[command(
    name = "load-catalog",
    about = "Foodgram catalog loader",
    long_about = "Import ingredients and tags from JSON files into the Foodgram database"
)]
struct LoadArgs {
    /// Configuration file
    #[arg(long, default_value = "config.yml")]
    config: PathBuf,

    /// JSON file with ingredients
    #[arg(long)]
    ingredients: Option<PathBuf>,

    /// JSON file with tags
    #[arg(long)]
    tags: Option<PathBuf>,
}

async fn read_json<T: DeserializeOwned>(path: &Path) -> Result<Vec<T>> {
    let raw = tokio::fs::read_to_string(path)
        .await
        .with_context(|| format!("Failed to read {}", path.display()))?;
    serde_json::from_str(&raw).with_context(|| format!("Failed to parse {}", path.display()))
}

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "foodgram=info,load_catalog=info".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    let args = LoadArgs::parse();
    if args.ingredients.is_none() && args.tags.is_none() {
        bail!("Nothing to load: pass --ingredients and/or --tags");
    }

    let config = Config::load_with_env(&args.config)?;
    let pool = db::create_pool(&config.database).await?;
    db::migrations::run_migrations(&pool).await?;

    let catalog = CatalogService::new(
        SqlxTagRepository::boxed(pool.clone()),
        SqlxIngredientRepository::boxed(pool),
    );

    if let Some(path) = &args.ingredients {
        let items: Vec<CreateIngredientInput> = read_json(path).await?;
        let summary = catalog.import_ingredients(&items).await?;
        info!(
            "Ingredients from {}: {} inserted, {} skipped",
            path.display(),
            summary.inserted,
            summary.skipped
        );
    }

    if let Some(path) = &args.tags {
        let items: Vec<CreateTagInput> = read_json(path).await?;
        let summary = catalog.import_tags(&items).await?;
        info!(
            "Tags from {}: {} inserted, {} skipped",
            path.display(),
            summary.inserted,
            summary.skipped
        );
    }

    Ok(())
}
