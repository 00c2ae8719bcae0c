use async_trait::async_trait;
use reqwest::{Client, StatusCode, Url};
use serde::de::DeserializeOwned;
use serde_json::Value;
use std::fmt;
use std::time::Duration;
use thiserror::Error;
use tracing::{debug, warn};

use crate::config::{self, Config};
use crate::model::{ConfigurationError, Settings};

pub mod model;

pub const STOCK: &str = "stock";
pub const PRODUCTS: &str = "objects/products";
pub const LOCATIONS: &str = "objects/locations";
pub const SHOPPING_LISTS: &str = "objects/shopping_lists";

/// Items of one shopping list, filtered server side.
pub fn shopping_list_items_endpoint(list_id: &str) -> String {
    format!("objects/shopping_list?query[]=shopping_list_id={}", list_id)
}

/// Why a single Grocy request produced no data.
#[derive(Debug, Error)]
pub enum FetchError {
    #[error("failed to reach Grocy: {0}")]
    Transport(#[from] reqwest::Error),
    #[error("grocy error {status}: {body}")]
    Status { status: StatusCode, body: String },
    #[error("invalid Grocy response JSON: {0}")]
    Decode(#[from] serde_json::Error),
    #[error("invalid Grocy endpoint {0}")]
    Endpoint(String),
}

/// Read access to the Grocy API. Implemented over HTTP by [`InventoryClient`]
/// and by recording fakes in tests.
#[async_trait]
pub trait InventorySource: Send + Sync {
    /// GET `{base}/api/{endpoint}` and return the decoded JSON body.
    async fn fetch_json(&self, endpoint: &str) -> Result<Value, FetchError>;
}

#[derive(Clone)]
pub struct InventoryClient {
    http: Client,
    api_base: Url,
    api_key: String,
    api_key_header: String,
}

impl fmt::Debug for InventoryClient {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("InventoryClient")
            .field("api_base", &self.api_base)
            .field("api_key_header", &self.api_key_header)
            .finish_non_exhaustive()
    }
}

impl InventoryClient {
    /// Build a client from the stored settings. Fails when the URL or key has
    /// not been configured, in which case nothing should be fetched.
    pub fn from_settings(settings: &Settings, cfg: &Config) -> Result<Self, ConfigurationError> {
        let creds = settings.inventory_credentials()?;
        let http = http_client(cfg.request_timeout())?;
        Self::with_http(
            http,
            &creds.base_url,
            creds.api_key,
            cfg.inventory.api_key_header.clone(),
        )
    }

    pub fn with_http(
        http: Client,
        base_url: &str,
        api_key: String,
        api_key_header: String,
    ) -> Result<Self, ConfigurationError> {
        let api_base = Url::parse(&format!("{}/api/", base_url.trim_end_matches('/')))
            .map_err(|e| ConfigurationError::InvalidBaseUrl(format!("{base_url}: {e}")))?;
        Ok(Self {
            http,
            api_base,
            api_key,
            api_key_header,
        })
    }

    /// Client with the default header name and timeout.
    pub fn new(base_url: &str, api_key: String) -> Result<Self, ConfigurationError> {
        let defaults = config::Inventory::default();
        let http = http_client(Duration::from_secs(defaults.request_timeout_secs))?;
        Self::with_http(http, base_url, api_key, defaults.api_key_header)
    }

    pub fn build_request(&self, endpoint: &str) -> Result<reqwest::Request, FetchError> {
        let url = self
            .api_base
            .join(endpoint.trim_start_matches('/'))
            .map_err(|e| FetchError::Endpoint(format!("{endpoint}: {e}")))?;
        Ok(self
            .http
            .get(url)
            .header(self.api_key_header.as_str(), &self.api_key)
            .header("Accept", "application/json")
            .build()?)
    }
}

fn http_client(timeout: Duration) -> Result<Client, ConfigurationError> {
    Client::builder()
        .user_agent(concat!("restoqit/", env!("CARGO_PKG_VERSION")))
        .timeout(timeout)
        .build()
        .map_err(|e| ConfigurationError::HttpClient(e.to_string()))
}

#[async_trait]
impl InventorySource for InventoryClient {
    async fn fetch_json(&self, endpoint: &str) -> Result<Value, FetchError> {
        let request = self.build_request(endpoint)?;
        debug!(url = %request.url(), "sending grocy request");
        let res = self.http.execute(request).await?;

        if !res.status().is_success() {
            let status = res.status();
            let body = res.text().await.unwrap_or_default();
            return Err(FetchError::Status { status, body });
        }

        let body = res.bytes().await?;
        Ok(serde_json::from_slice(&body)?)
    }
}

/// Fetch an endpoint that returns a JSON array and decode its rows.
///
/// Request failures and non-array bodies are logged and collapsed to `None`;
/// callers decide whether a missing collection empties their view or voids
/// it. Rows that fail to decode are skipped.
pub async fn fetch_collection<T: DeserializeOwned>(
    source: &dyn InventorySource,
    endpoint: &str,
) -> Option<Vec<T>> {
    let value = match source.fetch_json(endpoint).await {
        Ok(value) => value,
        Err(err) => {
            warn!(%err, endpoint, "grocy request failed");
            return None;
        }
    };
    let Value::Array(rows) = value else {
        warn!(endpoint, "unexpected grocy payload, expected an array");
        return None;
    };
    Some(decode_rows(endpoint, rows))
}

fn decode_rows<T: DeserializeOwned>(endpoint: &str, rows: Vec<Value>) -> Vec<T> {
    rows.into_iter()
        .enumerate()
        .filter_map(|(index, row)| match serde_json::from_value(row) {
            Ok(row) => Some(row),
            Err(err) => {
                warn!(%err, endpoint, index, "skipping malformed grocy row");
                None
            }
        })
        .collect()
}
