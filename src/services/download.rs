//! Download client trait and payload resolution

use std::time::Duration;

use anyhow::{Context, Result};
use async_trait::async_trait;
use reqwest::{Client, header::LOCATION, redirect::Policy};
use tracing::debug;

use super::rate_limiter::ensure_success;

/// What to hand to the download client
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DownloadPayload {
    /// Magnet link the client resolves itself
    Link(String),
    /// Raw .torrent file contents
    TorrentFile(Vec<u8>),
}

impl DownloadPayload {
    pub fn describe(&self) -> String {
        match self {
            DownloadPayload::Link(_) => "magnet link".to_string(),
            DownloadPayload::TorrentFile(bytes) => format!("torrent file ({} bytes)", bytes.len()),
        }
    }
}

#[async_trait]
pub trait DownloadClient: Send + Sync {
    /// Queue a download under the given category label
    async fn submit(&self, payload: DownloadPayload, category: &str) -> Result<()>;
}

/// Turns an indexer link into a payload. Magnets pass through; download URLs
/// are fetched here, since indexer proxies often answer with a redirect to a
/// magnet link instead of a file.
pub struct PayloadResolver {
    client: Client,
}

impl PayloadResolver {
    pub fn new() -> Result<Self> {
        Ok(Self {
            client: Client::builder()
                .redirect(Policy::none())
                .timeout(Duration::from_secs(30))
                .build()
                .context("Failed to create HTTP client")?,
        })
    }

    pub async fn resolve(&self, link: &str) -> Result<DownloadPayload> {
        if link.starts_with("magnet:") {
            return Ok(DownloadPayload::Link(link.to_string()));
        }
        if !link.starts_with("http://") && !link.starts_with("https://") {
            anyhow::bail!("Unsupported download link: {}", link);
        }

        let response = self
            .client
            .get(link)
            .send()
            .await
            .context("Failed to fetch torrent file")?;

        if response.status().is_redirection() {
            let location = response
                .headers()
                .get(LOCATION)
                .and_then(|v| v.to_str().ok())
                .context("Redirect without a Location header")?;
            if location.starts_with("magnet:") {
                debug!("Download link redirected to a magnet");
                return Ok(DownloadPayload::Link(location.to_string()));
            }
            anyhow::bail!("Download link redirected to {}", location);
        }

        let response = ensure_success(response, "Torrent download")?;
        let bytes = response
            .bytes()
            .await
            .context("Failed to read torrent file")?;

        Ok(DownloadPayload::TorrentFile(bytes.to_vec()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_magnet_passes_through() {
        let resolver = PayloadResolver::new().unwrap();
        let payload = resolver.resolve("magnet:?xt=urn:btih:abc").await.unwrap();
        assert_eq!(payload, DownloadPayload::Link("magnet:?xt=urn:btih:abc".to_string()));
    }

    #[tokio::test]
    async fn test_unsupported_scheme_is_rejected() {
        let resolver = PayloadResolver::new().unwrap();
        assert!(resolver.resolve("ftp://example.org/a.torrent").await.is_err());
    }

    #[test]
    fn test_describe() {
        assert_eq!(DownloadPayload::TorrentFile(vec![0; 3]).describe(), "torrent file (3 bytes)");
    }
}
