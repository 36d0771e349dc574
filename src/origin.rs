//! HTTP origin fetcher for full JSON datasets
//!
//! Pulls a complete dataset (timetable feed, professor export, major list)
//! from a URL. Used as the origin behind a cache namespace; each call returns
//! the whole dataset, there is no paging or patching.

use reqwest::Client;
use serde::de::DeserializeOwned;
use thiserror::Error;

/// Errors that can occur when fetching a dataset
#[derive(Debug, Error)]
pub enum OriginError {
    /// HTTP request failed
    #[error("HTTP request failed: {0}")]
    RequestFailed(#[from] reqwest::Error),

    /// The server answered with a non-success status
    #[error("Origin returned HTTP status {0}")]
    Status(u16),

    /// Failed to parse JSON response
    #[error("Failed to parse JSON response: {0}")]
    ParseError(#[from] serde_json::Error),
}

/// Fetches one dataset from a fixed URL
#[derive(Debug, Clone)]
pub struct HttpOrigin {
    client: Client,
    url: String,
}

impl HttpOrigin {
    /// Create an origin for `url` with a default HTTP client
    pub fn new(url: impl Into<String>) -> Self {
        Self::with_client(Client::new(), url)
    }

    /// Create an origin with a custom HTTP client
    pub fn with_client(client: Client, url: impl Into<String>) -> Self {
        Self {
            client,
            url: url.into(),
        }
    }

    pub fn url(&self) -> &str {
        &self.url
    }

    /// Fetch and decode the dataset
    ///
    /// # Returns
    /// * `Ok(T)` - The decoded dataset
    /// * `Err(OriginError)` - If the request fails, the status is not 2xx, or parsing fails
    pub async fn fetch<T: DeserializeOwned>(&self) -> Result<T, OriginError> {
        tracing::debug!(url = %self.url, "fetching dataset from origin");
        let response = self.client.get(&self.url).send().await?;

        let status = response.status();
        if !status.is_success() {
            return Err(OriginError::Status(status.as_u16()));
        }

        let text = response.text().await?;
        Ok(serde_json::from_str(&text)?)
    }
}
