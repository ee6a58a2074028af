//! Shared HTTP client for provider pages and torrent files

use crate::config::HttpConfig;
use crate::error::{Error, Result};
use tracing::debug;

/// Thin wrapper over `reqwest::Client` with a fixed timeout and no retries
///
/// Every request is a single GET; non-success statuses become
/// [`Error::HttpStatus`] so callers see one error shape for "the server did
/// not give us the page".
#[derive(Clone, Debug)]
pub struct HttpFetcher {
    client: reqwest::Client,
}

impl HttpFetcher {
    /// Build a client from configuration
    ///
    /// # Errors
    /// Returns error if the underlying TLS backend cannot be initialized
    pub fn new(config: &HttpConfig) -> Result<Self> {
        let client = reqwest::Client::builder()
            .timeout(config.timeout)
            .user_agent(config.user_agent.as_str())
            .build()
            .map_err(|e| Error::Other(format!("Failed to create HTTP client: {}", e)))?;
        Ok(Self { client })
    }

    async fn send(&self, url: &str) -> Result<reqwest::Response> {
        debug!(url, "GET");
        let response = self.client.get(url).send().await?;
        let status = response.status();
        if !status.is_success() {
            return Err(Error::HttpStatus {
                url: url.to_string(),
                status: status.as_u16(),
            });
        }
        Ok(response)
    }

    /// GET a page as text
    ///
    /// # Errors
    /// Network failure, timeout, non-success status, or a body that is cut off
    pub async fn get_text(&self, url: &str) -> Result<String> {
        let response = self.send(url).await?;
        Ok(response.text().await?)
    }

    /// GET a resource as raw bytes
    ///
    /// The whole body is buffered before returning; a transfer that breaks
    /// midway surfaces as an error rather than a short body.
    ///
    /// # Errors
    /// Network failure, timeout, non-success status, or a body that is cut off
    pub async fn get_bytes(&self, url: &str) -> Result<Vec<u8>> {
        let response = self.send(url).await?;
        Ok(response.bytes().await?.to_vec())
    }

    /// GET and deserialize a JSON document
    ///
    /// # Errors
    /// Transport errors as for [`get_text`](Self::get_text); malformed JSON is
    /// reported as [`Error::Serialization`]
    pub async fn get_json<T: serde::de::DeserializeOwned>(&self, url: &str) -> Result<T> {
        let text = self.get_text(url).await?;
        Ok(serde_json::from_str(&text)?)
    }
}
