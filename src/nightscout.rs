//! # Nightscout Data Fetching
//!
//! This module handles the single network operation of the device: asking a
//! Nightscout site for its most recent entry and pulling the raw sensor glucose
//! value (SGV, mg/dL) out of it.
//!
//! ## Data Source
//!
//! ### Nightscout entries API
//! - **URL**: `{site}/api/v1/entries.json?count=1&token={token}`
//! - **Format**: JSON array, newest entry first
//! - **Data**: `[{"sgv": 175, "direction": "Flat", "date": 1700000000000, ...}]`
//!
//! ### Data Processing Pipeline
//! 1. **Fetch**: HTTP GET with the token as a query parameter
//! 2. **Check**: non-2xx status is a failure
//! 3. **Parse**: first array element, numeric `sgv` field
//! 4. **Return**: raw SGV; converting to a reading is the controller's job
//!
//! ## Error Handling
//!
//! Nothing is retried here. Transport failures (`Http`, `Status`) and payload
//! failures (`Json`, `Empty`, `MissingSgv`) all propagate to the caller, which
//! treats any of them as a fault of the whole cycle.

use crate::config::NightscoutConfig;
use reqwest::Url;
use serde::Deserialize;
use std::time::Duration;
use thiserror::Error;

/// Errors that can occur while fetching the latest value.
#[derive(Error, Debug)]
pub enum FetchError {
    /// HTTP request failed (network, TLS, timeout)
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    /// Server answered with a non-success status
    #[error("unexpected HTTP status {0}")]
    Status(u16),

    /// Body was not the expected JSON
    #[error("invalid JSON payload: {0}")]
    Json(#[from] serde_json::Error),

    /// JSON array with no entries
    #[error("no entries in response")]
    Empty,

    /// Latest entry is not a sensor reading (e.g. a meter calibration)
    #[error("latest entry has no sgv field")]
    MissingSgv,

    #[error("invalid Nightscout URL {0:?}")]
    Url(String),

    /// Could not start the async runtime driving requests
    #[error("runtime setup failed: {0}")]
    Runtime(#[from] std::io::Error),
}

/// Source of raw SGV values.
pub trait GlucoseSource {
    /// Fetch the most recent SGV in mg/dL. Blocks until done or failed.
    fn fetch_sgv(&mut self) -> Result<f64, FetchError>;
}

/// The fields we read from one Nightscout entry.
#[derive(Debug, Deserialize)]
struct Entry {
    sgv: Option<f64>,
}

/// Pull the SGV of the first entry out of an `entries.json` body.
///
/// # Example
/// ```
/// use glucose_matrix_lib::nightscout::parse_latest_sgv;
///
/// let body = r#"[{"sgv": 175, "direction": "Flat"}, {"sgv": 170}]"#;
/// assert_eq!(parse_latest_sgv(body).unwrap(), 175.0);
/// assert!(parse_latest_sgv("[]").is_err());
/// ```
pub fn parse_latest_sgv(body: &str) -> Result<f64, FetchError> {
    let entries: Vec<Entry> = serde_json::from_str(body)?;
    let latest = entries.first().ok_or(FetchError::Empty)?;
    latest.sgv.ok_or(FetchError::MissingSgv)
}

/// Build `{site}/api/v1/entries.json?count=1&token={token}`.
///
/// A path already present on `site` is kept, so sites served under a
/// prefix work. An empty token is left out.
pub fn entries_url(site: &str, token: &str) -> Result<Url, FetchError> {
    let mut url = Url::parse(site).map_err(|_| FetchError::Url(site.to_string()))?;
    url.path_segments_mut()
        .map_err(|_| FetchError::Url(site.to_string()))?
        .pop_if_empty()
        .extend(["api", "v1", "entries.json"]);
    {
        let mut query = url.query_pairs_mut();
        query.append_pair("count", "1");
        if !token.is_empty() {
            query.append_pair("token", token);
        }
    }
    Ok(url)
}

/// Blocking Nightscout client.
///
/// Owns a single-threaded tokio runtime and drives each async request to
/// completion on it, so a fetch blocks the tick like any other call.
pub struct NightscoutClient {
    runtime: tokio::runtime::Runtime,
    http: reqwest::Client,
    url: Url,
}

impl NightscoutClient {
    pub fn new(config: &NightscoutConfig) -> Result<Self, FetchError> {
        let http = reqwest::Client::builder()
            .timeout(Duration::from_secs(config.request_timeout_secs))
            .build()?;
        Self::with_http(config, http)
    }

    /// Use a preconfigured HTTP client.
    pub fn with_http(config: &NightscoutConfig, http: reqwest::Client) -> Result<Self, FetchError> {
        let runtime = tokio::runtime::Builder::new_current_thread()
            .enable_all()
            .build()?;
        let url = entries_url(&config.url, &config.token)?;
        Ok(Self { runtime, http, url })
    }

    pub fn url(&self) -> &Url {
        &self.url
    }

    async fn get_body(&self) -> Result<String, FetchError> {
        let response = self.http.get(self.url.clone()).send().await?;
        let status = response.status();
        if !status.is_success() {
            return Err(FetchError::Status(status.as_u16()));
        }
        Ok(response.text().await?)
    }
}

impl GlucoseSource for NightscoutClient {
    fn fetch_sgv(&mut self) -> Result<f64, FetchError> {
        let body = self.runtime.block_on(self.get_body())?;
        parse_latest_sgv(&body)
    }
}
