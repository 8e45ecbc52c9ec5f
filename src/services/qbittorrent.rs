//! qBittorrent Web API client
//!
//! Logs in once with username/password (session cookie kept by the client's
//! cookie store) and re-authenticates when a request comes back 403.

use std::time::Duration;

use anyhow::{Context, Result};
use async_trait::async_trait;
use reqwest::{Client, StatusCode, multipart};
use tokio::sync::Mutex;
use tracing::{debug, info};

use super::download::{DownloadClient, DownloadPayload};
use super::rate_limiter::ensure_success;

pub struct QbittorrentClient {
    base_url: String,
    username: String,
    password: String,
    client: Client,
    logged_in: Mutex<bool>,
}

impl QbittorrentClient {
    pub fn new(base_url: String, username: String, password: String) -> Result<Self> {
        Ok(Self {
            base_url: base_url.trim_end_matches('/').to_string(),
            username,
            password,
            client: Client::builder()
                .cookie_store(true)
                .timeout(Duration::from_secs(30))
                .build()
                .context("Failed to create HTTP client")?,
            logged_in: Mutex::new(false),
        })
    }

    async fn login(&self) -> Result<()> {
        let url = format!("{}/api/v2/auth/login", self.base_url);
        let response = self
            .client
            .post(&url)
            // qBittorrent rejects logins without a matching Referer
            .header("Referer", &self.base_url)
            .form(&[("username", &self.username), ("password", &self.password)])
            .send()
            .await
            .context("qBittorrent login request failed")?;
        let response = ensure_success(response, "qBittorrent login")?;

        let body = response.text().await.unwrap_or_default();
        if body.trim() != "Ok." {
            anyhow::bail!("qBittorrent login rejected: {}", body.trim());
        }

        debug!("Logged in to qBittorrent");
        Ok(())
    }

    async fn ensure_logged_in(&self) -> Result<()> {
        let mut logged_in = self.logged_in.lock().await;
        if !*logged_in {
            self.login().await?;
            *logged_in = true;
        }
        Ok(())
    }

    fn add_form(payload: &DownloadPayload, category: &str) -> Result<multipart::Form> {
        let form = multipart::Form::new().text("category", category.to_string());
        let form = match payload {
            DownloadPayload::Link(link) => form.text("urls", link.clone()),
            DownloadPayload::TorrentFile(bytes) => form.part(
                "torrents",
                multipart::Part::bytes(bytes.clone())
                    .file_name("upload.torrent")
                    .mime_str("application/x-bittorrent")?,
            ),
        };
        Ok(form)
    }

    async fn post_add(&self, payload: &DownloadPayload, category: &str) -> Result<reqwest::Response> {
        let url = format!("{}/api/v2/torrents/add", self.base_url);
        self.client
            .post(&url)
            .multipart(Self::add_form(payload, category)?)
            .send()
            .await
            .context("qBittorrent add request failed")
    }
}

#[async_trait]
impl DownloadClient for QbittorrentClient {
    async fn submit(&self, payload: DownloadPayload, category: &str) -> Result<()> {
        self.ensure_logged_in().await?;

        let mut response = self.post_add(&payload, category).await?;
        if response.status() == StatusCode::FORBIDDEN {
            // Session expired
            *self.logged_in.lock().await = false;
            self.ensure_logged_in().await?;
            response = self.post_add(&payload, category).await?;
        }
        let response = ensure_success(response, "qBittorrent add torrent")?;

        let body = response.text().await.unwrap_or_default();
        if body.trim() == "Fails." {
            anyhow::bail!("qBittorrent refused the torrent");
        }

        info!(category = %category, payload = %payload.describe(), "Submitted download");
        Ok(())
    }
}
