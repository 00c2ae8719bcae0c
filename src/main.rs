use anyhow::{anyhow, Context, Result};
use chrono::{Duration as ChronoDuration, Utc};
use clap::{Parser, Subcommand};
use serde::Serialize;
use std::path::PathBuf;
use std::time::Duration;
use tracing::{info, warn};

use restoqit::aggregate::{compute_shopping_list_items, compute_stock_view, list_shopping_lists};
use restoqit::config::{self, Config};
use restoqit::db::{self, DisplaySettingsUpdate, InventorySettingsUpdate};
use restoqit::inventory::InventoryClient;
use restoqit::model::{Settings, StockView};
use restoqit::overview::{build_overview, default_list_id};
use restoqit::weather::{weather_for, WeatherClient};

#[derive(Debug, Parser)]
#[command(author, version, about = "Household dashboard over a Grocy instance")]
struct Args {
    /// Path to YAML config file
    #[arg(long, default_value = "config.yaml")]
    config: PathBuf,

    #[command(subcommand)]
    command: Command,
}

#[derive(Debug, Subcommand)]
enum Command {
    /// Expired, expiring and low stock, the default shopping list and the weather
    Overview {
        /// Re-print every `check_interval` seconds until interrupted
        #[arg(long)]
        watch: bool,
    },
    /// Stock past its best-before date
    Expired,
    /// Stock expiring within the configured window
    Expiring,
    /// Stock below its minimum amount
    LowStock,
    /// All shopping lists
    Lists,
    /// Items of a shopping list (defaults to the configured list)
    ListItems {
        #[arg(long)]
        list_id: Option<i64>,
    },
    /// Current weather for the configured location
    Weather,
    /// Show or change the stored settings
    #[command(subcommand)]
    Settings(SettingsCommand),
    /// Print a sample config.yaml
    ExampleConfig,
}

/// Omitted flags keep their stored value.
#[derive(Debug, Subcommand)]
enum SettingsCommand {
    Show,
    /// Grocy connection
    Inventory {
        #[arg(long)]
        url: Option<String>,
        #[arg(long)]
        api_key: Option<String>,
        /// Overview refresh interval in seconds
        #[arg(long)]
        check_interval: Option<i64>,
        #[arg(long)]
        default_list_id: Option<i64>,
    },
    /// Weather location and clock formats
    Weather {
        #[arg(long)]
        api_key: Option<String>,
        #[arg(long)]
        location: Option<String>,
        /// metric, imperial or standard
        #[arg(long)]
        units: Option<String>,
        /// YYYY-MM-DD, MM-DD-YYYY or DD-MM-YYYY
        #[arg(long)]
        date_format: Option<String>,
        /// "HH:mm" or "hh:mm AM/PM"
        #[arg(long)]
        time_format: Option<String>,
    },
}

#[derive(Debug, Clone, Copy)]
enum Bucket {
    Expired,
    Expiring,
    LowStock,
}

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .with_target(false)
        .compact()
        .init();

    let args = Args::parse();
    if let Command::ExampleConfig = args.command {
        print!("{}", config::example());
        return Ok(());
    }

    let cfg = config::load(Some(&args.config))
        .with_context(|| format!("failed to load {}", args.config.display()))?;
    cfg.ensure_dirs()?;

    let pool = db::init_pool(&cfg.database_url()).await?;
    db::run_migrations(&pool).await?;

    match args.command {
        Command::Overview { watch } => run_overview(&pool, &cfg, watch).await,
        Command::Expired => print_bucket(&pool, &cfg, Bucket::Expired).await,
        Command::Expiring => print_bucket(&pool, &cfg, Bucket::Expiring).await,
        Command::LowStock => print_bucket(&pool, &cfg, Bucket::LowStock).await,
        Command::Lists => {
            let settings = db::load_settings(&pool).await?;
            let client = inventory_client(&settings, &cfg)?;
            print_json(&list_shopping_lists(&client).await)
        }
        Command::ListItems { list_id } => {
            let settings = db::load_settings(&pool).await?;
            let client = inventory_client(&settings, &cfg)?;
            let list_id = list_id.unwrap_or_else(|| default_list_id(&settings, &cfg));
            let list_key = list_id.to_string();
            let items = compute_shopping_list_items(&client, Some(list_key.as_str())).await;
            print_json(&serde_json::json!({ "list_id": list_id, "grocery_list": items }))
        }
        Command::Weather => {
            let settings = db::load_settings(&pool).await?;
            let client = WeatherClient::from_config(&cfg)?;
            print_json(&weather_for(&client, &settings).await)
        }
        Command::Settings(cmd) => run_settings(&pool, cmd).await,
        Command::ExampleConfig => Ok(()),
    }
}

fn inventory_client(settings: &Settings, cfg: &Config) -> Result<InventoryClient> {
    InventoryClient::from_settings(settings, cfg).map_err(|err| {
        anyhow::Error::new(err).context(
            "Grocy is not configured; run `restoqit settings inventory --url <URL> --api-key <KEY>`",
        )
    })
}

async fn print_bucket(pool: &db::Pool, cfg: &Config, bucket: Bucket) -> Result<()> {
    let settings = db::load_settings(pool).await?;
    let client = inventory_client(&settings, cfg)?;
    let window = ChronoDuration::days(cfg.dashboard.expiring_window_days);
    let StockView {
        expired,
        expiring,
        low_stock,
    } = compute_stock_view(&client, Utc::now(), window)
        .await
        .ok_or_else(|| anyhow!("could not connect to Grocy; check the URL and API key in settings"))?;

    let items = match bucket {
        Bucket::Expired => expired,
        Bucket::Expiring => expiring,
        Bucket::LowStock => low_stock,
    };
    print_json(&items)
}

async fn run_overview(pool: &db::Pool, cfg: &Config, watch: bool) -> Result<()> {
    let weather = WeatherClient::from_config(cfg)?;
    loop {
        let settings = db::load_settings(pool).await?;
        let client = inventory_client(&settings, cfg)?;
        let overview = build_overview(&client, &weather, &settings, cfg, Utc::now()).await;
        if !overview.inventory_available {
            warn!("could not connect to Grocy; stock sections are empty");
        }
        print_json(&overview)?;

        if !watch {
            return Ok(());
        }
        let interval = Duration::from_secs(settings.check_interval_seconds.max(1) as u64);
        tokio::select! {
            _ = tokio::time::sleep(interval) => {}
            _ = tokio::signal::ctrl_c() => {
                info!("stopping overview refresh");
                return Ok(());
            }
        }
    }
}

async fn run_settings(pool: &db::Pool, cmd: SettingsCommand) -> Result<()> {
    match cmd {
        SettingsCommand::Show => {
            let settings = db::load_settings(pool).await?;
            print_json(&serde_json::json!({
                "configured": settings.is_configured(),
                "settings": settings,
            }))
        }
        SettingsCommand::Inventory {
            url,
            api_key,
            check_interval,
            default_list_id,
        } => {
            let current = db::load_settings(pool).await?;
            let mut update = InventorySettingsUpdate::from_current(&current);
            if let Some(url) = url {
                update.api_base_url = url;
            }
            if let Some(api_key) = api_key {
                update.api_key = api_key;
            }
            if let Some(check_interval) = check_interval {
                update.check_interval_seconds = check_interval;
            }
            if default_list_id.is_some() {
                update.default_list_id = default_list_id;
            }
            db::update_inventory_settings(pool, &update).await?;
            println!("Grocy settings saved.");
            Ok(())
        }
        SettingsCommand::Weather {
            api_key,
            location,
            units,
            date_format,
            time_format,
        } => {
            let current = db::load_settings(pool).await?;
            let mut update = DisplaySettingsUpdate::from_current(&current);
            if let Some(api_key) = api_key {
                update.weather_api_key = api_key;
            }
            if let Some(location) = location {
                update.weather_location = location;
            }
            if let Some(units) = units {
                update.weather_units = units;
            }
            if let Some(date_format) = date_format {
                update.date_format = date_format;
            }
            if let Some(time_format) = time_format {
                update.time_format = time_format;
            }
            db::update_display_settings(pool, &update).await?;
            println!("Weather settings saved.");
            Ok(())
        }
    }
}

fn print_json<T: Serialize>(value: &T) -> Result<()> {
    println!("{}", serde_json::to_string_pretty(value)?);
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn list_id_must_be_an_integer() {
        assert!(Args::try_parse_from(["restoqit", "list-items", "--list-id", "1&x=2"]).is_err());
        let args = Args::try_parse_from(["restoqit", "list-items", "--list-id", "3"]).unwrap();
        assert!(matches!(args.command, Command::ListItems { list_id: Some(3) }));
    }

    #[test]
    fn settings_flags_are_optional() {
        let args = Args::try_parse_from(["restoqit", "settings", "weather", "--location", "Oslo"])
            .unwrap();
        match args.command {
            Command::Settings(SettingsCommand::Weather {
                location, units, ..
            }) => {
                assert_eq!(location.as_deref(), Some("Oslo"));
                assert!(units.is_none());
            }
            other => panic!("unexpected command: {other:?}"),
        }
    }
}
