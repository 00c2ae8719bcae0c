use anyhow::{Context, Result};
use clap::Parser;
use std::path::PathBuf;

use restoqit::config;
use restoqit::db;
use restoqit::inventory::{InventoryClient, InventorySource};

/// Fetch one Grocy endpoint with the stored credentials and print the raw JSON.
#[derive(Parser, Debug)]
struct Args {
    /// Path to YAML config
    #[arg(long, default_value = "config.yaml")]
    config: PathBuf,

    /// Endpoint below `/api/`, e.g. `stock` or `objects/products`
    #[arg(long)]
    endpoint: String,
}

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .with_target(false)
        .compact()
        .init();

    let args = Args::parse();
    let cfg = config::load(Some(&args.config))?;
    let pool = db::init_pool(&cfg.database_url()).await?;
    db::run_migrations(&pool).await?;
    let settings = db::load_settings(&pool).await?;

    let client = InventoryClient::from_settings(&settings, &cfg)?;
    let body = client
        .fetch_json(&args.endpoint)
        .await
        .with_context(|| format!("failed to fetch {}", args.endpoint))?;

    if let Some(rows) = body.as_array() {
        println!("{} rows", rows.len());
    }
    println!("{}", serde_json::to_string_pretty(&body)?);
    Ok(())
}
