//! Current weather for the dashboard header, from OpenWeatherMap.
//!
//! The current-weather endpoint is tried first; if it fails for any reason
//! the nearest entry of the forecast endpoint is used instead.
use async_trait::async_trait;
use reqwest::{Client, StatusCode, Url};
use serde::Deserialize;
use std::fmt;
use thiserror::Error;
use tracing::{debug, warn};

use crate::config::{Config, ConfigError};
use crate::model::{Settings, WeatherSnapshot, WeatherUnits};

#[derive(Debug, Error)]
pub enum WeatherError {
    #[error("failed to reach weather service: {0}")]
    Transport(#[from] reqwest::Error),
    #[error("weather service error {0}")]
    Status(StatusCode),
    #[error("invalid weather response JSON: {0}")]
    Decode(#[from] serde_json::Error),
    #[error("weather response has no conditions")]
    NoConditions,
    #[error("invalid weather URL: {0}")]
    Url(String),
}

#[async_trait]
pub trait WeatherSource: Send + Sync {
    async fn get_weather(
        &self,
        api_key: &str,
        location: &str,
        units: WeatherUnits,
    ) -> Option<WeatherSnapshot>;
}

/// Weather for the location stored in the settings, if one is configured.
pub async fn weather_for(source: &dyn WeatherSource, settings: &Settings) -> Option<WeatherSnapshot> {
    source
        .get_weather(
            settings.weather_api_key.as_deref().unwrap_or_default(),
            settings.weather_location.as_deref().unwrap_or_default(),
            settings.weather_units,
        )
        .await
}

#[derive(Clone)]
pub struct WeatherClient {
    http: Client,
    base_url: Url,
    icon_base_url: String,
}

impl fmt::Debug for WeatherClient {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("WeatherClient")
            .field("base_url", &self.base_url)
            .finish_non_exhaustive()
    }
}

impl WeatherClient {
    pub fn from_config(cfg: &Config) -> Result<Self, ConfigError> {
        let http = Client::builder()
            .user_agent(concat!("restoqit/", env!("CARGO_PKG_VERSION")))
            .timeout(cfg.request_timeout())
            .build()
            .map_err(|_| ConfigError::Invalid("failed to build HTTP client"))?;
        Ok(Self::with_http(
            http,
            cfg.weather_base_url()?,
            cfg.weather.icon_base_url.clone(),
        ))
    }

    /// `base_url` must end with `/` (e.g. `https://api.openweathermap.org/data/2.5/`).
    pub fn with_http(http: Client, base_url: Url, icon_base_url: String) -> Self {
        Self {
            http,
            base_url,
            icon_base_url,
        }
    }

    fn endpoint(
        &self,
        path: &str,
        api_key: &str,
        location: &str,
        units: WeatherUnits,
    ) -> Result<Url, WeatherError> {
        let mut url = self
            .base_url
            .join(path)
            .map_err(|e| WeatherError::Url(format!("{path}: {e}")))?;
        url.query_pairs_mut()
            .append_pair("q", location)
            .append_pair("appid", api_key)
            .append_pair("units", units.as_str());
        Ok(url)
    }

    async fn get_body<T: for<'de> Deserialize<'de>>(&self, url: Url) -> Result<T, WeatherError> {
        let res = self.http.get(url).send().await?;
        if !res.status().is_success() {
            return Err(WeatherError::Status(res.status()));
        }
        let body = res.bytes().await?;
        Ok(serde_json::from_slice(&body)?)
    }

    pub async fn current(
        &self,
        api_key: &str,
        location: &str,
        units: WeatherUnits,
    ) -> Result<WeatherSnapshot, WeatherError> {
        let url = self.endpoint("weather", api_key, location, units)?;
        let reading: Reading = self.get_body(url).await?;
        self.snapshot(reading)
    }

    /// Nearest forecast entry, or `None` when the forecast list is empty.
    pub async fn nearest_forecast(
        &self,
        api_key: &str,
        location: &str,
        units: WeatherUnits,
    ) -> Result<Option<WeatherSnapshot>, WeatherError> {
        let url = self.endpoint("forecast", api_key, location, units)?;
        let forecast: Forecast = self.get_body(url).await?;
        forecast
            .list
            .into_iter()
            .next()
            .map(|reading| self.snapshot(reading))
            .transpose()
    }

    fn snapshot(&self, reading: Reading) -> Result<WeatherSnapshot, WeatherError> {
        let condition = reading
            .weather
            .into_iter()
            .next()
            .ok_or(WeatherError::NoConditions)?;
        Ok(WeatherSnapshot {
            temperature: reading.main.temp,
            description: condition.description,
            icon_url: format!(
                "{}/{}.png",
                self.icon_base_url.trim_end_matches('/'),
                condition.icon
            ),
        })
    }
}

#[async_trait]
impl WeatherSource for WeatherClient {
    async fn get_weather(
        &self,
        api_key: &str,
        location: &str,
        units: WeatherUnits,
    ) -> Option<WeatherSnapshot> {
        let (api_key, location) = (api_key.trim(), location.trim());
        if api_key.is_empty() || location.is_empty() {
            return None;
        }

        match self.current(api_key, location, units).await {
            Ok(snapshot) => return Some(snapshot),
            Err(err) => warn!(%err, "could not fetch current weather, trying forecast"),
        }

        match self.nearest_forecast(api_key, location, units).await {
            Ok(Some(snapshot)) => Some(snapshot),
            Ok(None) => {
                debug!(location, "forecast returned no entries");
                None
            }
            Err(err) => {
                warn!(%err, "could not fetch forecast weather either");
                None
            }
        }
    }
}

#[derive(Debug, Deserialize)]
struct Reading {
    main: MainBlock,
    #[serde(default)]
    weather: Vec<Condition>,
}

#[derive(Debug, Deserialize)]
struct MainBlock {
    temp: f64,
}

#[derive(Debug, Deserialize)]
struct Condition {
    description: String,
    icon: String,
}

#[derive(Debug, Deserialize)]
struct Forecast {
    #[serde(default)]
    list: Vec<Reading>,
}

#[cfg(test)]
mod tests {
    use super::*;

    fn client() -> WeatherClient {
        WeatherClient::with_http(
            Client::new(),
            Url::parse("https://api.openweathermap.org/data/2.5/").unwrap(),
            "http://openweathermap.org/img/wn/".into(),
        )
    }

    #[test]
    fn endpoint_encodes_location() {
        let url = client()
            .endpoint("weather", "key", "São Paulo,BR", WeatherUnits::Imperial)
            .unwrap();
        assert_eq!(url.path(), "/data/2.5/weather");
        let pairs: Vec<(String, String)> = url
            .query_pairs()
            .map(|(k, v)| (k.into_owned(), v.into_owned()))
            .collect();
        assert_eq!(
            pairs,
            vec![
                ("q".to_string(), "São Paulo,BR".to_string()),
                ("appid".to_string(), "key".to_string()),
                ("units".to_string(), "imperial".to_string()),
            ]
        );
    }

    #[test]
    fn snapshot_builds_icon_url() {
        let reading: Reading = serde_json::from_value(serde_json::json!({
            "main": { "temp": 21.5 },
            "weather": [{ "description": "light rain", "icon": "10d" }]
        }))
        .unwrap();
        let snapshot = client().snapshot(reading).unwrap();
        assert_eq!(snapshot.temperature, 21.5);
        assert_eq!(snapshot.description, "light rain");
        assert_eq!(snapshot.icon_url, "http://openweathermap.org/img/wn/10d.png");
    }

    #[test]
    fn snapshot_without_conditions_fails() {
        let reading: Reading =
            serde_json::from_value(serde_json::json!({ "main": { "temp": 1.0 } })).unwrap();
        assert!(matches!(
            client().snapshot(reading),
            Err(WeatherError::NoConditions)
        ));
    }

    #[tokio::test]
    async fn missing_key_or_location_skips_requests() {
        let c = client();
        assert!(c.get_weather("", "Berlin", WeatherUnits::Metric).await.is_none());
        assert!(c.get_weather("key", "  ", WeatherUnits::Metric).await.is_none());
    }
}
