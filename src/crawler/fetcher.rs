//! HTTP transport
//!
//! This module handles every outbound request made on behalf of a site crawl:
//! - Building the HTTP client with the crawler's user agent
//! - GET requests for pages, images and robots.txt
//! - Classifying failures into page states
//!
//! The crawl code only sees the [`Transport`] trait, so tests can substitute
//! an in-memory implementation.

use crate::config::UserAgentConfig;
use crate::state::PageState;
use async_trait::async_trait;
use reqwest::{header::CONTENT_TYPE, Client, Response, StatusCode};
use std::time::Duration;
use thiserror::Error;
use url::Url;

/// Result of fetching a page
#[derive(Debug)]
pub enum FetchResult {
    /// The server answered with a 2xx status
    Success {
        /// Final URL after redirects
        final_url: Url,
        /// HTTP status code
        status_code: u16,
        /// Content-Type header value (empty when absent)
        content_type: String,
        /// Page body content
        body: String,
    },

    /// Non-success status
    HttpError {
        /// The HTTP status code
        status_code: u16,
        /// The sentinel state this status maps to, if any
        state: Option<PageState>,
    },

    /// Network error (connection refused, timeout, body read failure)
    NetworkError {
        /// Error description
        error: String,
    },
}

/// Errors fetching raw bytes
#[derive(Debug, Error)]
pub enum FetchError {
    #[error("HTTP status {0}")]
    Status(u16),

    #[error("Network error: {0}")]
    Network(String),
}

/// Raw response body with its declared content type
#[derive(Debug, Clone)]
pub struct FetchedBytes {
    pub bytes: Vec<u8>,
    pub content_type: Option<String>,
}

/// Outcome of requesting `/robots.txt`
#[derive(Debug, Clone, PartialEq)]
pub enum RobotsFetch {
    Body(String),
    /// Any non-success status
    NotFound,
    /// The request itself failed
    Failed(String),
    /// The body is longer than the size limit; it was not read in full
    TooLarge(usize),
}

/// Outbound HTTP used by the crawler
#[async_trait]
pub trait Transport: Send + Sync {
    async fn fetch_page(&self, url: &Url) -> FetchResult;

    async fn fetch_bytes(&self, url: &Url) -> Result<FetchedBytes, FetchError>;

    /// Fetches `/robots.txt` relative to the origin of `origin`, giving up
    /// once the body exceeds `max_size` bytes
    async fn fetch_robots_txt(&self, origin: &Url, max_size: usize) -> RobotsFetch;
}

/// Builds an HTTP client with proper configuration
///
/// # Arguments
///
/// * `config` - The user agent configuration
///
/// # Returns
///
/// * `Ok(Client)` - Successfully built HTTP client
/// * `Err(reqwest::Error)` - Failed to build client
///
/// # Example
///
/// ```no_run
/// use button_trawler::config::UserAgentConfig;
/// use button_trawler::crawler::build_http_client;
///
/// let config = UserAgentConfig {
///     crawler_name: "ButtonTrawler".to_string(),
///     crawler_version: "1.0".to_string(),
///     contact_url: "https://example.com/about".to_string(),
///     contact_email: "admin@example.com".to_string(),
/// };
///
/// let client = build_http_client(&config).unwrap();
/// ```
pub fn build_http_client(config: &UserAgentConfig) -> Result<Client, reqwest::Error> {
    Client::builder()
        .user_agent(config.header_value())
        .timeout(Duration::from_secs(30))
        .connect_timeout(Duration::from_secs(10))
        .gzip(true)
        .brotli(true)
        .build()
}

/// Maps a failing status to the sentinel state recorded for the page
pub fn sentinel_for_status(status: StatusCode) -> Option<PageState> {
    match status {
        StatusCode::FORBIDDEN => Some(PageState::Forbidden),
        StatusCode::NOT_FOUND | StatusCode::GONE => Some(PageState::DeadLink),
        _ => None,
    }
}

fn content_type_of(response: &Response) -> Option<String> {
    response
        .headers()
        .get(CONTENT_TYPE)
        .and_then(|v| v.to_str().ok())
        .map(|v| v.to_string())
}

fn describe(error: &reqwest::Error) -> String {
    if error.is_timeout() {
        "Request timeout".to_string()
    } else if error.is_connect() {
        "Connection refused".to_string()
    } else {
        error.to_string()
    }
}

/// reqwest-backed transport
#[derive(Debug, Clone)]
pub struct HttpTransport {
    client: Client,
}

impl HttpTransport {
    pub fn new(client: Client) -> Self {
        Self { client }
    }

    pub fn from_config(config: &UserAgentConfig) -> Result<Self, reqwest::Error> {
        Ok(Self::new(build_http_client(config)?))
    }

    /// The underlying client, shared with the service clients
    pub fn client(&self) -> &Client {
        &self.client
    }
}

#[async_trait]
impl Transport for HttpTransport {
    async fn fetch_page(&self, url: &Url) -> FetchResult {
        let response = match self.client.get(url.as_str()).send().await {
            Ok(response) => response,
            Err(e) => {
                return FetchResult::NetworkError {
                    error: describe(&e),
                }
            }
        };

        let status = response.status();
        if !status.is_success() {
            return FetchResult::HttpError {
                status_code: status.as_u16(),
                state: sentinel_for_status(status),
            };
        }

        let final_url = response.url().clone();
        let content_type = content_type_of(&response).unwrap_or_default();

        match response.text().await {
            Ok(body) => FetchResult::Success {
                final_url,
                status_code: status.as_u16(),
                content_type,
                body,
            },
            Err(e) => FetchResult::NetworkError {
                error: describe(&e),
            },
        }
    }

    async fn fetch_bytes(&self, url: &Url) -> Result<FetchedBytes, FetchError> {
        let response = self
            .client
            .get(url.as_str())
            .send()
            .await
            .map_err(|e| FetchError::Network(describe(&e)))?;

        let status = response.status();
        if !status.is_success() {
            return Err(FetchError::Status(status.as_u16()));
        }

        let content_type = content_type_of(&response);
        let bytes = response
            .bytes()
            .await
            .map_err(|e| FetchError::Network(describe(&e)))?;

        Ok(FetchedBytes {
            bytes: bytes.to_vec(),
            content_type,
        })
    }

    async fn fetch_robots_txt(&self, origin: &Url, max_size: usize) -> RobotsFetch {
        let robots_url = match origin.join("/robots.txt") {
            Ok(url) => url,
            Err(e) => return RobotsFetch::Failed(e.to_string()),
        };

        let mut response = match self.client.get(robots_url).send().await {
            Ok(response) => response,
            Err(e) => return RobotsFetch::Failed(describe(&e)),
        };

        if response.status() != StatusCode::OK {
            tracing::debug!(
                "robots.txt for {} returned {}",
                origin,
                response.status().as_u16()
            );
            return RobotsFetch::NotFound;
        }

        if let Some(length) = response.content_length() {
            if length as usize > max_size {
                return RobotsFetch::TooLarge(length as usize);
            }
        }

        let mut body = Vec::new();
        loop {
            match response.chunk().await {
                Ok(Some(chunk)) => {
                    body.extend_from_slice(&chunk);
                    if body.len() > max_size {
                        return RobotsFetch::TooLarge(body.len());
                    }
                }
                Ok(None) => break,
                Err(e) => return RobotsFetch::Failed(describe(&e)),
            }
        }

        RobotsFetch::Body(String::from_utf8_lossy(&body).into_owned())
    }
}
