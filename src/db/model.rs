//! Rows and payloads of the settings table.

use tracing::warn;

use crate::model::{DateFormat, Settings, TimeFormat, WeatherUnits};

/// The settings row exactly as stored.
#[derive(Debug, Clone, sqlx::FromRow)]
pub struct SettingsRow {
    pub grocy_url: Option<String>,
    pub grocy_api_key: Option<String>,
    pub check_interval: i64,
    pub default_shopping_list_id: Option<i64>,
    pub weather_api_key: Option<String>,
    pub weather_location: Option<String>,
    pub weather_units: String,
    pub date_format: String,
    pub time_format: String,
}

impl From<SettingsRow> for Settings {
    fn from(row: SettingsRow) -> Self {
        let defaults = Settings::default();
        Settings {
            api_base_url: row.grocy_url,
            api_key: row.grocy_api_key,
            check_interval_seconds: if row.check_interval > 0 {
                row.check_interval
            } else {
                defaults.check_interval_seconds
            },
            default_list_id: row.default_shopping_list_id,
            weather_api_key: row.weather_api_key,
            weather_location: row.weather_location,
            weather_units: WeatherUnits::parse_units(&row.weather_units).unwrap_or_else(|| {
                warn!(value = %row.weather_units, "unknown stored weather units");
                defaults.weather_units
            }),
            date_format: DateFormat::parse_format(&row.date_format).unwrap_or_else(|| {
                warn!(value = %row.date_format, "unknown stored date format");
                defaults.date_format
            }),
            time_format: TimeFormat::parse_format(&row.time_format).unwrap_or_else(|| {
                warn!(value = %row.time_format, "unknown stored time format");
                defaults.time_format
            }),
        }
    }
}

/// Grocy connection section of the settings form.
#[derive(Debug, Clone, Default)]
pub struct InventorySettingsUpdate {
    pub api_base_url: String,
    pub api_key: String,
    pub check_interval_seconds: i64,
    pub default_list_id: Option<i64>,
}

impl InventorySettingsUpdate {
    /// Payload that rewrites the stored values unchanged, for callers that
    /// only change some fields.
    pub fn from_current(settings: &Settings) -> Self {
        Self {
            api_base_url: settings.api_base_url.clone().unwrap_or_default(),
            api_key: settings.api_key.clone().unwrap_or_default(),
            check_interval_seconds: settings.check_interval_seconds,
            default_list_id: settings.default_list_id,
        }
    }
}

/// Weather and clock section of the settings form. Formats are given in
/// their stored spelling (`metric`, `YYYY-MM-DD`, `HH:mm`, ...).
#[derive(Debug, Clone, Default)]
pub struct DisplaySettingsUpdate {
    pub weather_api_key: String,
    pub weather_location: String,
    pub weather_units: String,
    pub date_format: String,
    pub time_format: String,
}

impl DisplaySettingsUpdate {
    /// Payload that rewrites the stored values unchanged.
    pub fn from_current(settings: &Settings) -> Self {
        Self {
            weather_api_key: settings.weather_api_key.clone().unwrap_or_default(),
            weather_location: settings.weather_location.clone().unwrap_or_default(),
            weather_units: settings.weather_units.as_str().to_string(),
            date_format: settings.date_format.as_str().to_string(),
            time_format: settings.time_format.as_str().to_string(),
        }
    }
}
