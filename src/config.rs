//! Installation configuration for the Restoqit dashboard.
//!
//! Per-installation values that change at runtime (Grocy URL, API key, weather
//! location, ...) live in the settings table, see [`crate::db`]. This file only
//! carries what an operator sets once when deploying.
use reqwest::Url;
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::Path;
use std::time::Duration;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
    #[error("YAML parse error: {0}")]
    Parse(#[from] serde_yaml::Error),
    #[error("Invalid configuration: {0}")]
    Invalid(&'static str),
}

/// Root configuration struct mirroring the YAML schema.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct Config {
    pub app: App,
    #[serde(default)]
    pub inventory: Inventory,
    #[serde(default)]
    pub weather: Weather,
    #[serde(default)]
    pub dashboard: Dashboard,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct App {
    pub data_dir: String,
}

/// How requests to the Grocy API are issued.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(default)]
pub struct Inventory {
    pub api_key_header: String,
    pub request_timeout_secs: u64,
}

impl Default for Inventory {
    fn default() -> Self {
        Self {
            api_key_header: "GROCY-API-KEY".into(),
            request_timeout_secs: 15,
        }
    }
}

/// OpenWeatherMap endpoints.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(default)]
pub struct Weather {
    pub base_url: String,
    pub icon_base_url: String,
}

impl Default for Weather {
    fn default() -> Self {
        Self {
            base_url: "https://api.openweathermap.org/data/2.5/".into(),
            icon_base_url: "http://openweathermap.org/img/wn/".into(),
        }
    }
}

/// Thresholds used when building dashboard views.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(default)]
pub struct Dashboard {
    pub expiring_window_days: i64,
    pub fallback_list_id: i64,
}

impl Default for Dashboard {
    fn default() -> Self {
        Self {
            expiring_window_days: 7,
            fallback_list_id: 1,
        }
    }
}

impl Config {
    /// Ensure required directories exist (creates `app.data_dir` if missing).
    pub fn ensure_dirs(&self) -> Result<(), std::io::Error> {
        fs::create_dir_all(&self.app.data_dir)
    }

    /// SQLite URL for the settings database, honouring `DATABASE_URL`.
    pub fn database_url(&self) -> String {
        std::env::var("DATABASE_URL").unwrap_or_else(|_| {
            format!(
                "sqlite://{}/restoqit.db",
                self.app.data_dir.trim_end_matches('/')
            )
        })
    }

    pub fn request_timeout(&self) -> Duration {
        Duration::from_secs(self.inventory.request_timeout_secs)
    }

    /// Parsed weather base URL. Always ends with `/` so endpoints can be joined.
    pub fn weather_base_url(&self) -> Result<Url, ConfigError> {
        let raw = if self.weather.base_url.ends_with('/') {
            self.weather.base_url.clone()
        } else {
            format!("{}/", self.weather.base_url)
        };
        Url::parse(&raw).map_err(|_| ConfigError::Invalid("weather.base_url must be a valid URL"))
    }
}

/// Load configuration from a YAML file and validate it.
/// - If `path` is None, uses `config.yaml` in the current working directory.
pub fn load(path: Option<&Path>) -> Result<Config, ConfigError> {
    let path = path.unwrap_or_else(|| Path::new("config.yaml"));
    let content = fs::read_to_string(path)?;
    let cfg: Config = serde_yaml::from_str(&content)?;
    validate(&cfg)?;
    Ok(cfg)
}

fn validate(cfg: &Config) -> Result<(), ConfigError> {
    if cfg.app.data_dir.trim().is_empty() {
        return Err(ConfigError::Invalid("app.data_dir must be non-empty"));
    }

    if cfg.inventory.api_key_header.trim().is_empty() {
        return Err(ConfigError::Invalid("inventory.api_key_header must be non-empty"));
    }
    if cfg.inventory.request_timeout_secs == 0 {
        return Err(ConfigError::Invalid("inventory.request_timeout_secs must be > 0"));
    }

    cfg.weather_base_url()?;
    if cfg.weather.icon_base_url.trim().is_empty() {
        return Err(ConfigError::Invalid("weather.icon_base_url must be non-empty"));
    }

    if cfg.dashboard.expiring_window_days <= 0 {
        return Err(ConfigError::Invalid("dashboard.expiring_window_days must be > 0"));
    }
    if cfg.dashboard.fallback_list_id <= 0 {
        return Err(ConfigError::Invalid("dashboard.fallback_list_id must be > 0"));
    }

    Ok(())
}

/// Sample configuration written by operators as a starting point.
pub fn example() -> &'static str {
    r#"app:
  data_dir: "./data"

inventory:
  api_key_header: "GROCY-API-KEY"
  request_timeout_secs: 15

weather:
  base_url: "https://api.openweathermap.org/data/2.5/"
  icon_base_url: "http://openweathermap.org/img/wn/"

dashboard:
  expiring_window_days: 7
  fallback_list_id: 1
"#
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    #[test]
    fn parse_example_ok() {
        let cfg: Config = serde_yaml::from_str(example()).unwrap();
        validate(&cfg).unwrap();
        assert_eq!(cfg.dashboard.expiring_window_days, 7);
    }

    #[test]
    fn omitted_sections_use_defaults() {
        let cfg: Config = serde_yaml::from_str("app:\n  data_dir: \"./data\"\n").unwrap();
        validate(&cfg).unwrap();
        assert_eq!(cfg.inventory.api_key_header, "GROCY-API-KEY");
        assert_eq!(cfg.dashboard.fallback_list_id, 1);
        assert_eq!(
            cfg.weather_base_url().unwrap().as_str(),
            "https://api.openweathermap.org/data/2.5/"
        );
    }

    #[test]
    fn invalid_data_dir() {
        let mut cfg: Config = serde_yaml::from_str(example()).unwrap();
        cfg.app.data_dir = "  ".into();
        let err = validate(&cfg).unwrap_err();
        match err {
            ConfigError::Invalid(msg) => assert!(msg.contains("app.data_dir")),
            _ => panic!("wrong error"),
        }
    }

    #[test]
    fn invalid_thresholds() {
        let mut cfg: Config = serde_yaml::from_str(example()).unwrap();
        cfg.dashboard.expiring_window_days = 0;
        assert!(matches!(validate(&cfg), Err(ConfigError::Invalid(_))));

        let mut cfg: Config = serde_yaml::from_str(example()).unwrap();
        cfg.inventory.request_timeout_secs = 0;
        assert!(matches!(validate(&cfg), Err(ConfigError::Invalid(_))));

        let mut cfg: Config = serde_yaml::from_str(example()).unwrap();
        cfg.inventory.api_key_header = "".into();
        assert!(matches!(validate(&cfg), Err(ConfigError::Invalid(_))));
    }

    #[test]
    fn weather_base_url_gets_trailing_slash() {
        let mut cfg: Config = serde_yaml::from_str(example()).unwrap();
        cfg.weather.base_url = "http://localhost:9000/data/2.5".into();
        let url = cfg.weather_base_url().unwrap();
        assert_eq!(url.join("weather").unwrap().path(), "/data/2.5/weather");

        cfg.weather.base_url = "not a url".into();
        assert!(matches!(validate(&cfg), Err(ConfigError::Invalid(_))));
    }

    #[test]
    fn ensure_dirs_creates_data_dir() {
        let td = tempdir().unwrap();
        let data_path = td.path().join("data");
        let mut cfg: Config = serde_yaml::from_str(example()).unwrap();
        cfg.app.data_dir = data_path.to_string_lossy().to_string();
        cfg.ensure_dirs().unwrap();
        assert!(data_path.exists());
    }

    #[test]
    fn load_from_file_ok() {
        let td = tempdir().unwrap();
        let p = td.path().join("config.yaml");
        fs::write(&p, example()).unwrap();
        let cfg = load(Some(&p)).unwrap();
        assert_eq!(cfg.app.data_dir, "./data");
        assert_eq!(cfg.inventory.request_timeout_secs, 15);
    }
}
