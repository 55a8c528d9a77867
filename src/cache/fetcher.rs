//! Network tier: plain HTTP GET of manifests and layer payloads

use std::time::Duration;

#[cfg(test)]
use mockall::automock;
use tracing::warn;

use crate::cache::error::FetchError;

/// Trait for fetching the text body of a remote resource
#[cfg_attr(test, automock)]
#[async_trait::async_trait]
pub trait Fetcher: Send + Sync {
    /// Fetches the body of `url`
    ///
    /// # Returns
    /// * `Ok(String)` - The response body of a successful request
    /// * `Err(FetchError)` - On transport failure or a non-success status
    async fn fetch(&self, url: &str) -> Result<String, FetchError>;
}

/// Fetcher backed by reqwest
///
/// No headers or auth are applied. The optional timeout is the only retry or
/// cancellation policy at this level.
pub struct HttpFetcher {
    client: reqwest::Client,
}

impl HttpFetcher {
    pub fn new(timeout: Option<Duration>) -> Result<Self, FetchError> {
        let mut builder = reqwest::Client::builder().user_agent("geojson-cache");
        if let Some(timeout) = timeout {
            builder = builder.timeout(timeout);
        }
        Ok(Self {
            client: builder.build()?,
        })
    }
}

#[async_trait::async_trait]
impl Fetcher for HttpFetcher {
    async fn fetch(&self, url: &str) -> Result<String, FetchError> {
        let response = self.client.get(url).send().await?;

        let status = response.status();
        if !status.is_success() {
            warn!("{} returned status {}", url, status);
            return Err(FetchError::Status {
                url: url.to_string(),
                status: status.as_u16(),
            });
        }

        Ok(response.text().await?)
    }
}
