use crate::error::NetworkError;
use anyhow::{Context, Result};
use async_trait::async_trait;
use chrono::Utc;
use reqwest::header::{self, HeaderMap, HeaderValue};
use reqwest::{Client, StatusCode};
use std::time::Duration;
use tracing::debug;

const USER_AGENT: &str =
    "Mozilla/5.0 (Macintosh; Intel Mac OS X 10.15; rv:127.0) Gecko/20100101 Firefox/127.0";
const NO_CACHE_HEADER: &str = "X-No-Cache";
const CONNECT_TIMEOUT: Duration = Duration::from_secs(10);

/// Downloads raw page content
#[async_trait]
pub trait Fetch: Send + Sync {
    /// Fetch `url` and return its body. Anything but a 200 is an error.
    async fn fetch(&self, url: &str) -> Result<String, NetworkError>;
}

/// Build the HTTP client shared by every site.
///
/// Requests look like they come from a desktop browser and time out after `timeout`.
pub fn build_client(timeout: Duration) -> Result<Client> {
    let mut headers = HeaderMap::new();
    headers.insert(
        header::ACCEPT,
        HeaderValue::from_static(
            "text/html,application/xhtml+xml,application/xml;q=0.9,image/avif,image/webp,*/*;q=0.8",
        ),
    );
    headers.insert(header::ACCEPT_LANGUAGE, HeaderValue::from_static("en-US,en;q=0.5"));
    headers.insert(header::DNT, HeaderValue::from_static("1"));
    headers.insert(header::UPGRADE_INSECURE_REQUESTS, HeaderValue::from_static("1"));

    Client::builder()
        .timeout(timeout)
        .connect_timeout(CONNECT_TIMEOUT.min(timeout))
        .user_agent(USER_AGENT)
        .default_headers(headers)
        .build()
        .context("Failed to create HTTP client")
}

/// Fetcher backed by a shared `reqwest::Client`
#[derive(Clone)]
pub struct HttpFetcher {
    client: Client,
}

impl HttpFetcher {
    pub fn new(client: Client) -> Self {
        Self { client }
    }
}

#[async_trait]
impl Fetch for HttpFetcher {
    async fn fetch(&self, url: &str) -> Result<String, NetworkError> {
        debug!("Fetching URL: {}", url);

        // Fresh value per request so no cache in between serves an old results page
        let response = self
            .client
            .get(url)
            .header(NO_CACHE_HEADER, Utc::now().timestamp_millis().to_string())
            .send()
            .await
            .map_err(|source| NetworkError::Request {
                url: url.to_string(),
                source,
            })?;

        let status = response.status();
        if status != StatusCode::OK {
            return Err(NetworkError::Status {
                status: status.as_u16(),
                url: url.to_string(),
            });
        }

        let html = response
            .text()
            .await
            .map_err(|source| NetworkError::Request {
                url: url.to_string(),
                source,
            })?;

        debug!("Downloaded {} bytes of HTML", html.len());

        Ok(html)
    }
}
