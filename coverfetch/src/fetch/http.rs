//! HTTP fetcher abstraction for testability

use std::time::Duration;

use bytes::Bytes;
use futures::future::BoxFuture;

use super::error::FetchError;

/// Default connect timeout for the HTTP client, in seconds.
pub const DEFAULT_CONNECT_TIMEOUT_SECS: u64 = 10;

/// Trait for fetching raw image bytes.
///
/// This abstraction allows for dependency injection and easier testing
/// by enabling mock fetchers in tests.
pub trait ImageFetcher: Send + Sync {
    /// Performs a GET on `locator`.
    ///
    /// # Returns
    ///
    /// The non-empty response body, or an error for transport failures,
    /// non-2xx statuses and empty bodies.
    fn fetch<'a>(&'a self, locator: &'a str) -> BoxFuture<'a, Result<Bytes, FetchError>>;
}

/// Real fetcher implementation using reqwest.
///
/// Redirects are followed according to reqwest's default policy. There is no
/// overall request timeout here; the task applies its own download deadline.
#[derive(Debug, Clone)]
pub struct ReqwestFetcher {
    client: reqwest::Client,
}

impl ReqwestFetcher {
    /// Creates a new ReqwestFetcher with default configuration.
    pub fn new() -> Result<Self, FetchError> {
        Self::with_connect_timeout(Duration::from_secs(DEFAULT_CONNECT_TIMEOUT_SECS))
    }

    /// Creates a new ReqwestFetcher with a custom connect timeout.
    pub fn with_connect_timeout(timeout: Duration) -> Result<Self, FetchError> {
        let client = reqwest::Client::builder()
            .connect_timeout(timeout)
            .user_agent(concat!("coverfetch/", env!("CARGO_PKG_VERSION")))
            .build()
            .map_err(|e| FetchError::Client(e.to_string()))?;

        Ok(Self { client })
    }

    async fn get(&self, locator: &str) -> Result<Bytes, FetchError> {
        let response = self
            .client
            .get(locator)
            .send()
            .await
            .map_err(|e| FetchError::Request(e.to_string()))?;

        // Check HTTP status
        let status = response.status();
        if !status.is_success() {
            return Err(FetchError::Status {
                status: status.as_u16(),
                locator: locator.to_string(),
            });
        }

        let body = response
            .bytes()
            .await
            .map_err(|e| FetchError::Body(e.to_string()))?;

        if body.is_empty() {
            return Err(FetchError::EmptyBody(locator.to_string()));
        }

        Ok(body)
    }
}

impl ImageFetcher for ReqwestFetcher {
    fn fetch<'a>(&'a self, locator: &'a str) -> BoxFuture<'a, Result<Bytes, FetchError>> {
        Box::pin(self.get(locator))
    }
}
