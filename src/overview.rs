//! The dashboard landing view: stock buckets, the default shopping list and
//! the weather, fetched concurrently.
use chrono::{DateTime, Duration, Local, TimeZone, Utc};
use tracing::{info, instrument};

use crate::aggregate::{compute_shopping_list_items, compute_stock_view};
use crate::config::Config;
use crate::inventory::InventorySource;
use crate::model::{DateFormat, Overview, Settings, TimeFormat};
use crate::weather::{weather_for, WeatherSource};

/// Build the overview for `settings` as of `now`.
///
/// Unlike the single-bucket views this never fails: when the stock view is
/// unavailable the buckets and the grocery list are empty and
/// `inventory_available` is false.
#[instrument(skip_all)]
pub async fn build_overview(
    inventory: &dyn InventorySource,
    weather: &dyn WeatherSource,
    settings: &Settings,
    cfg: &Config,
    now: DateTime<Utc>,
) -> Overview {
    let list_id = default_list_id(settings, cfg);
    let list_key = list_id.to_string();
    let window = Duration::days(cfg.dashboard.expiring_window_days);

    let (stock, grocery_list, weather) = futures::join!(
        compute_stock_view(inventory, now, window),
        compute_shopping_list_items(inventory, Some(list_key.as_str())),
        weather_for(weather, settings),
    );

    let inventory_available = stock.is_some();
    let grocery_list = if inventory_available {
        grocery_list
    } else {
        info!("grocy unavailable, rendering overview without stock data");
        Vec::new()
    };

    Overview {
        inventory_available,
        stock: stock.unwrap_or_default(),
        shopping_list_id: list_id,
        grocery_list,
        weather,
        clock: format_clock(
            &now.with_timezone(&Local),
            settings.date_format,
            settings.time_format,
        ),
    }
}

/// Shopping list shown on the overview: the configured default, otherwise the
/// installation-wide fallback.
pub fn default_list_id(settings: &Settings, cfg: &Config) -> i64 {
    settings
        .default_list_id
        .filter(|id| *id > 0)
        .unwrap_or(cfg.dashboard.fallback_list_id)
}

/// `"{date} | {time}"` in the user's preferred formats.
pub fn format_clock<Tz: TimeZone>(now: &DateTime<Tz>, date: DateFormat, time: TimeFormat) -> String {
    let local = now.naive_local();
    format!("{} | {}", date.render(local.date()), time.render(local.time()))
}
