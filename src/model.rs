use chrono::{NaiveDate, NaiveTime};
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::inventory::model::{EntityId, Quantity};

/// Raised when the Grocy connection has not been configured yet. Callers send
/// the user to the settings screen instead of showing data.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum ConfigurationError {
    #[error("Grocy server URL is not configured")]
    MissingBaseUrl,
    #[error("Grocy API key is not configured")]
    MissingApiKey,
    #[error("Grocy server URL is invalid: {0}")]
    InvalidBaseUrl(String),
    #[error("failed to build HTTP client: {0}")]
    HttpClient(String),
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Default)]
pub enum WeatherUnits {
    #[default]
    Metric,
    Imperial,
    Standard,
}

impl WeatherUnits {
    pub fn as_str(&self) -> &'static str {
        match self {
            WeatherUnits::Metric => "metric",
            WeatherUnits::Imperial => "imperial",
            WeatherUnits::Standard => "standard",
        }
    }

    pub fn parse_units(s: &str) -> Option<Self> {
        match s {
            "metric" => Some(WeatherUnits::Metric),
            "imperial" => Some(WeatherUnits::Imperial),
            "standard" => Some(WeatherUnits::Standard),
            _ => None,
        }
    }
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Default)]
pub enum DateFormat {
    #[default]
    YearMonthDay,
    MonthDayYear,
    DayMonthYear,
}

impl DateFormat {
    pub fn as_str(&self) -> &'static str {
        match self {
            DateFormat::YearMonthDay => "YYYY-MM-DD",
            DateFormat::MonthDayYear => "MM-DD-YYYY",
            DateFormat::DayMonthYear => "DD-MM-YYYY",
        }
    }

    pub fn parse_format(s: &str) -> Option<Self> {
        match s {
            "YYYY-MM-DD" => Some(DateFormat::YearMonthDay),
            "MM-DD-YYYY" => Some(DateFormat::MonthDayYear),
            "DD-MM-YYYY" => Some(DateFormat::DayMonthYear),
            _ => None,
        }
    }

    pub fn render(&self, date: NaiveDate) -> String {
        let pattern = match self {
            DateFormat::YearMonthDay => "%Y-%m-%d",
            DateFormat::MonthDayYear => "%m-%d-%Y",
            DateFormat::DayMonthYear => "%d-%m-%Y",
        };
        date.format(pattern).to_string()
    }
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Default)]
pub enum TimeFormat {
    #[default]
    TwentyFourHour,
    TwelveHour,
}

impl TimeFormat {
    pub fn as_str(&self) -> &'static str {
        match self {
            TimeFormat::TwentyFourHour => "HH:mm",
            TimeFormat::TwelveHour => "hh:mm AM/PM",
        }
    }

    pub fn parse_format(s: &str) -> Option<Self> {
        match s {
            "HH:mm" => Some(TimeFormat::TwentyFourHour),
            "hh:mm AM/PM" => Some(TimeFormat::TwelveHour),
            _ => None,
        }
    }

    pub fn render(&self, time: NaiveTime) -> String {
        match self {
            TimeFormat::TwentyFourHour => time.format("%H:%M").to_string(),
            TimeFormat::TwelveHour => time.format("%I:%M %p").to_string(),
        }
    }
}

/// The single settings row of an installation.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct Settings {
    pub api_base_url: Option<String>,
    #[serde(skip_serializing)]
    pub api_key: Option<String>,
    pub check_interval_seconds: i64,
    pub default_list_id: Option<i64>,
    #[serde(skip_serializing)]
    pub weather_api_key: Option<String>,
    pub weather_location: Option<String>,
    pub weather_units: WeatherUnits,
    pub date_format: DateFormat,
    pub time_format: TimeFormat,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            api_base_url: None,
            api_key: None,
            check_interval_seconds: 300,
            default_list_id: None,
            weather_api_key: None,
            weather_location: None,
            weather_units: WeatherUnits::default(),
            date_format: DateFormat::default(),
            time_format: TimeFormat::default(),
        }
    }
}

/// Base URL and key needed to talk to Grocy.
#[derive(Clone, PartialEq, Eq)]
pub struct InventoryCredentials {
    pub base_url: String,
    pub api_key: String,
}

impl std::fmt::Debug for InventoryCredentials {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("InventoryCredentials")
            .field("base_url", &self.base_url)
            .finish_non_exhaustive()
    }
}

impl Settings {
    /// Grocy URL and key, or the reason aggregation is disabled.
    pub fn inventory_credentials(&self) -> Result<InventoryCredentials, ConfigurationError> {
        let base_url = non_empty(self.api_base_url.as_deref()).ok_or(ConfigurationError::MissingBaseUrl)?;
        let api_key = non_empty(self.api_key.as_deref()).ok_or(ConfigurationError::MissingApiKey)?;
        Ok(InventoryCredentials {
            base_url: base_url.to_string(),
            api_key: api_key.to_string(),
        })
    }

    pub fn is_configured(&self) -> bool {
        self.inventory_credentials().is_ok()
    }
}

fn non_empty(value: Option<&str>) -> Option<&str> {
    value.map(str::trim).filter(|v| !v.is_empty())
}

/// A stock entry joined with its product and location names.
#[derive(Debug, Clone, Serialize, PartialEq)]
pub struct StockItem {
    pub product_id: Option<EntityId>,
    pub location_id: Option<EntityId>,
    pub amount: Quantity,
    pub best_before_date: Option<String>,
    pub product_name: String,
    pub location_name: String,
}

/// Stock split into the buckets the dashboard shows.
#[derive(Debug, Clone, Serialize, PartialEq, Default)]
pub struct StockView {
    pub expired: Vec<StockItem>,
    pub expiring: Vec<StockItem>,
    pub low_stock: Vec<StockItem>,
}

/// A shopping-list entry joined with its product name.
#[derive(Debug, Clone, Serialize, PartialEq)]
pub struct ShoppingListItem {
    pub id: Option<EntityId>,
    pub shopping_list_id: Option<EntityId>,
    pub product_id: Option<EntityId>,
    pub amount: Quantity,
    pub note: Option<String>,
    pub product_name: String,
}

#[derive(Debug, Clone, Serialize, PartialEq)]
pub struct WeatherSnapshot {
    pub temperature: f64,
    pub description: String,
    pub icon_url: String,
}

/// Everything the dashboard landing page shows.
#[derive(Debug, Clone, Serialize, PartialEq)]
pub struct Overview {
    pub inventory_available: bool,
    #[serde(flatten)]
    pub stock: StockView,
    pub shopping_list_id: i64,
    pub grocery_list: Vec<ShoppingListItem>,
    pub weather: Option<WeatherSnapshot>,
    pub clock: String,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn client_build_failure_is_not_a_url_error() {
        let err = ConfigurationError::HttpClient("no TLS backend".into());
        assert_eq!(err.to_string(), "failed to build HTTP client: no TLS backend");
        assert_ne!(err, ConfigurationError::InvalidBaseUrl("no TLS backend".into()));
    }

    fn configured() -> Settings {
        Settings {
            api_base_url: Some("http://grocy.local".into()),
            api_key: Some("secret".into()),
            ..Settings::default()
        }
    }

    #[test]
    fn credentials_require_url_and_key() {
        assert_eq!(
            Settings::default().inventory_credentials().unwrap_err(),
            ConfigurationError::MissingBaseUrl
        );

        let mut settings = configured();
        settings.api_key = Some("   ".into());
        assert_eq!(
            settings.inventory_credentials().unwrap_err(),
            ConfigurationError::MissingApiKey
        );

        let creds = configured().inventory_credentials().unwrap();
        assert_eq!(creds.base_url, "http://grocy.local");
        assert_eq!(creds.api_key, "secret");
    }

    #[test]
    fn credentials_debug_hides_key() {
        let creds = configured().inventory_credentials().unwrap();
        assert!(!format!("{creds:?}").contains("secret"));
    }

    #[test]
    fn settings_serialization_omits_secrets() {
        let json = serde_json::to_value(configured()).unwrap();
        assert!(json.get("api_key").is_none());
        assert!(json.get("weather_api_key").is_none());
        assert_eq!(json["check_interval_seconds"], 300);
    }

    #[test]
    fn formats_round_trip_through_strings() {
        for f in [DateFormat::YearMonthDay, DateFormat::MonthDayYear, DateFormat::DayMonthYear] {
            assert_eq!(DateFormat::parse_format(f.as_str()), Some(f));
        }
        assert_eq!(TimeFormat::parse_format("hh:mm AM/PM"), Some(TimeFormat::TwelveHour));
        assert_eq!(WeatherUnits::parse_units("kelvin"), None);
    }

    #[test]
    fn date_and_time_render() {
        let date = NaiveDate::from_ymd_opt(2024, 3, 9).unwrap();
        assert_eq!(DateFormat::YearMonthDay.render(date), "2024-03-09");
        assert_eq!(DateFormat::MonthDayYear.render(date), "03-09-2024");
        assert_eq!(DateFormat::DayMonthYear.render(date), "09-03-2024");

        let time = NaiveTime::from_hms_opt(14, 5, 0).unwrap();
        assert_eq!(TimeFormat::TwentyFourHour.render(time), "14:05");
        assert_eq!(TimeFormat::TwelveHour.render(time), "02:05 PM");
    }
}
