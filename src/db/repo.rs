use super::model::{DisplaySettingsUpdate, InventorySettingsUpdate, SettingsRow};
use crate::model::{DateFormat, Settings, TimeFormat, WeatherUnits};
use anyhow::{anyhow, Context, Result};
use sqlx::sqlite::{SqliteConnectOptions, SqliteJournalMode, SqlitePoolOptions, SqliteSynchronous};
use sqlx::SqlitePool;
use std::path::Path;
use std::str::FromStr;
use tracing::{info, instrument};

pub type Pool = SqlitePool;

/// Open the settings database, creating the file (and its directory) if
/// needed. File databases run in WAL mode.
pub async fn init_pool(database_url: &str) -> Result<Pool> {
    let options = SqliteConnectOptions::from_str(database_url)
        .with_context(|| format!("invalid database URL {database_url}"))?
        .create_if_missing(true)
        .journal_mode(SqliteJournalMode::Wal)
        .synchronous(SqliteSynchronous::Full);

    let filename = options.clone().get_filename();
    if let Some(parent) = Path::new(&*filename).parent() {
        if !parent.as_os_str().is_empty() {
            std::fs::create_dir_all(parent)
                .with_context(|| format!("failed to create {}", parent.display()))?;
        }
    }

    let pool = SqlitePoolOptions::new()
        .max_connections(4)
        .connect_with(options)
        .await
        .context("failed to open settings database")?;
    Ok(pool)
}

pub async fn run_migrations(pool: &Pool) -> Result<()> {
    sqlx::migrate!("./migrations").run(pool).await?;
    Ok(())
}

/// Current settings. Recreates the default row if it went missing so that
/// exactly one row always exists.
#[instrument(skip_all)]
pub async fn load_settings(pool: &Pool) -> Result<Settings> {
    let inserted = sqlx::query("INSERT OR IGNORE INTO settings (id) VALUES (1)")
        .execute(pool)
        .await?
        .rows_affected();
    if inserted > 0 {
        info!("default settings row inserted");
    }

    let row = sqlx::query_as::<_, SettingsRow>(
        "SELECT grocy_url, grocy_api_key, check_interval, default_shopping_list_id, \
         weather_api_key, weather_location, weather_units, date_format, time_format \
         FROM settings WHERE id = 1",
    )
    .fetch_one(pool)
    .await?;
    Ok(row.into())
}

/// Save the Grocy connection settings. The URL loses surrounding whitespace
/// and one trailing `/`; the key is trimmed.
#[instrument(skip_all)]
pub async fn update_inventory_settings(pool: &Pool, update: &InventorySettingsUpdate) -> Result<()> {
    if update.check_interval_seconds <= 0 {
        return Err(anyhow!("check interval must be a positive number of seconds"));
    }
    if matches!(update.default_list_id, Some(id) if id <= 0) {
        return Err(anyhow!("default shopping list id must be positive"));
    }

    let url = normalize_base_url(&update.api_base_url);
    let key = update.api_key.trim();
    sqlx::query(
        "UPDATE settings SET grocy_url = ?, grocy_api_key = ?, check_interval = ?, \
         default_shopping_list_id = ?, updated_at = CURRENT_TIMESTAMP WHERE id = 1",
    )
    .bind(url)
    .bind(key)
    .bind(update.check_interval_seconds)
    .bind(update.default_list_id)
    .execute(pool)
    .await?;
    info!(url, "grocy settings saved");
    Ok(())
}

/// Save weather and clock settings. Unknown units or formats are rejected.
#[instrument(skip_all)]
pub async fn update_display_settings(pool: &Pool, update: &DisplaySettingsUpdate) -> Result<()> {
    let units = WeatherUnits::parse_units(update.weather_units.trim())
        .ok_or_else(|| anyhow!("unknown weather units '{}'", update.weather_units))?;
    let date_format = DateFormat::parse_format(update.date_format.trim())
        .ok_or_else(|| anyhow!("unknown date format '{}'", update.date_format))?;
    let time_format = TimeFormat::parse_format(update.time_format.trim())
        .ok_or_else(|| anyhow!("unknown time format '{}'", update.time_format))?;

    sqlx::query(
        "UPDATE settings SET weather_api_key = ?, weather_location = ?, weather_units = ?, \
         date_format = ?, time_format = ?, updated_at = CURRENT_TIMESTAMP WHERE id = 1",
    )
    .bind(update.weather_api_key.trim())
    .bind(update.weather_location.trim())
    .bind(units.as_str())
    .bind(date_format.as_str())
    .bind(time_format.as_str())
    .execute(pool)
    .await?;
    info!(location = update.weather_location.trim(), "weather settings saved");
    Ok(())
}

fn normalize_base_url(raw: &str) -> &str {
    let trimmed = raw.trim();
    trimmed.strip_suffix('/').unwrap_or(trimmed)
}
