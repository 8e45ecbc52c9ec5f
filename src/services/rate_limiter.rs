//! Rate-limited HTTP client for external APIs
//!
//! Scans never retry a failed call within the same pass; the limiter only
//! keeps bursts of metadata lookups under the provider's published quota.

use std::num::NonZeroU32;
use std::sync::Arc;
use std::time::Duration;

use anyhow::{Context, Result};
use governor::{
    Quota, RateLimiter,
    clock::DefaultClock,
    state::{InMemoryState, NotKeyed},
};
use reqwest::{Client, Response, StatusCode};
use tracing::debug;

/// Configuration for rate limiting
#[derive(Debug, Clone)]
pub struct RateLimitConfig {
    /// Maximum requests per second
    pub requests_per_second: u32,
    /// Burst capacity (allows short bursts above the rate)
    pub burst_size: u32,
}

impl Default for RateLimitConfig {
    fn default() -> Self {
        Self {
            requests_per_second: 2,
            burst_size: 5,
        }
    }
}

/// A rate-limited HTTP client wrapper
pub struct RateLimitedClient {
    client: Client,
    limiter: Arc<RateLimiter<NotKeyed, InMemoryState, DefaultClock>>,
    name: String,
}

impl RateLimitedClient {
    /// Create a new rate-limited client
    pub fn new(name: &str, config: RateLimitConfig) -> Result<Self> {
        let quota = Quota::per_second(
            NonZeroU32::new(config.requests_per_second).unwrap_or(NonZeroU32::MIN),
        )
        .allow_burst(NonZeroU32::new(config.burst_size).unwrap_or(NonZeroU32::MIN));

        Ok(Self {
            client: Client::builder()
                .timeout(Duration::from_secs(30))
                .build()
                .context("Failed to create HTTP client")?,
            limiter: Arc::new(RateLimiter::direct(quota)),
            name: name.to_string(),
        })
    }

    /// Create a client for TMDB API
    pub fn for_tmdb() -> Result<Self> {
        // TMDB allows ~40 requests per 10 seconds, so ~4/sec with burst of 10
        Self::new(
            "tmdb",
            RateLimitConfig {
                requests_per_second: 4,
                burst_size: 10,
            },
        )
    }

    /// Create a client for torrent indexers
    pub fn for_indexer() -> Result<Self> {
        // Be conservative with indexers
        Self::new(
            "indexer",
            RateLimitConfig {
                requests_per_second: 1,
                burst_size: 3,
            },
        )
    }

    /// Wait for rate limit and make a GET request with query parameters
    pub async fn get_with_query<T: serde::Serialize + ?Sized>(
        &self,
        url: &str,
        query: &T,
    ) -> Result<Response> {
        self.wait_for_permit().await;
        debug!(client = %self.name, url = %url, "Making rate-limited GET request with query");

        self.client
            .get(url)
            .query(query)
            .send()
            .await
            .context("HTTP request failed")
    }

    /// Wait for rate limit and make a GET request with headers and query parameters
    pub async fn get_with_headers_and_query<T: serde::Serialize + ?Sized>(
        &self,
        url: &str,
        headers: &[(&str, &str)],
        query: &T,
    ) -> Result<Response> {
        self.wait_for_permit().await;
        debug!(client = %self.name, url = %url, "Making rate-limited GET request with headers and query");

        let mut request = self.client.get(url);
        for (key, value) in headers {
            request = request.header(*key, *value);
        }
        request
            .query(query)
            .send()
            .await
            .context("HTTP request failed")
    }

    /// Wait for a rate limit permit
    pub async fn wait_for_permit(&self) {
        self.limiter.until_ready().await;
    }
}

/// Turn a non-success response into an error naming the operation
pub fn ensure_success(response: Response, operation: &str) -> Result<Response> {
    match response.status() {
        status if status.is_success() => Ok(response),
        StatusCode::UNAUTHORIZED => anyhow::bail!("{}: credentials rejected (401)", operation),
        StatusCode::NOT_FOUND => anyhow::bail!("{}: not found (404)", operation),
        StatusCode::TOO_MANY_REQUESTS => anyhow::bail!("{}: rate limited (429)", operation),
        status => anyhow::bail!("{} failed with status: {}", operation, status),
    }
}
