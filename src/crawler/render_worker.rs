//! Render worker client
//!
//! The worker loads a page in a real browser and answers with JSON. It is
//! addressed as `base + form-encoded(target URL)`.

use crate::crawler::extract::{PageSource, RawPage, SourceError};
use crate::crawler::parser::{RawImage, RawLink};
use async_trait::async_trait;
use reqwest::{header::ACCEPT, Client, StatusCode};
use serde::Deserialize;
use url::Url;

#[derive(Debug, Deserialize)]
struct WorkerButton {
    src: String,
    #[serde(default)]
    links_to: Option<String>,
    #[serde(default)]
    alt: Option<String>,
}

#[derive(Debug, Deserialize)]
struct WorkerLink {
    href: String,
    #[serde(default)]
    text: Option<String>,
}

#[derive(Debug, Deserialize)]
struct WorkerResponse {
    #[serde(default)]
    title: Option<String>,
    #[serde(default)]
    description: Option<String>,
    #[serde(rename = "rawText", default)]
    raw_text: String,
    #[serde(default)]
    buttons: Vec<WorkerButton>,
    #[serde(default)]
    links: Vec<WorkerLink>,
}

fn present(value: Option<String>) -> Option<String> {
    value
        .map(|v| v.trim().to_string())
        .filter(|v| !v.is_empty())
}

impl WorkerResponse {
    fn into_raw_page(self, url: &Url) -> RawPage {
        RawPage {
            final_url: url.clone(),
            status_code: 200,
            title: present(self.title),
            description: present(self.description),
            text: self.raw_text,
            images: self
                .buttons
                .into_iter()
                .map(|b| RawImage {
                    src: b.src,
                    links_to: present(b.links_to),
                    alt: present(b.alt),
                })
                .collect(),
            links: self
                .links
                .into_iter()
                .map(|l| RawLink {
                    href: l.href,
                    text: present(l.text),
                })
                .collect(),
        }
    }
}

/// Page source backed by the render worker
pub struct RenderWorkerSource {
    client: Client,
    base: String,
}

impl RenderWorkerSource {
    pub fn new(client: Client, base: impl Into<String>) -> Self {
        Self {
            client,
            base: base.into(),
        }
    }

    /// Worker request URL for `target`
    pub fn request_url(&self, target: &Url) -> String {
        let encoded: String =
            url::form_urlencoded::byte_serialize(target.as_str().as_bytes()).collect();
        format!("{}{}", self.base, encoded)
    }
}

#[async_trait]
impl PageSource for RenderWorkerSource {
    async fn load(&self, url: &Url) -> Result<RawPage, SourceError> {
        let response = self
            .client
            .get(self.request_url(url))
            .header(ACCEPT, "application/json")
            .send()
            .await
            .map_err(|e| SourceError::Network(e.to_string()))?;

        match response.status() {
            StatusCode::OK => {}
            StatusCode::INTERNAL_SERVER_ERROR => return Err(SourceError::Forbidden),
            StatusCode::NOT_FOUND => return Err(SourceError::Absent),
            other => return Err(SourceError::Status(other.as_u16())),
        }

        let body = response
            .text()
            .await
            .map_err(|e| SourceError::Network(e.to_string()))?;
        let parsed: WorkerResponse =
            serde_json::from_str(&body).map_err(|e| SourceError::Decode(e.to_string()))?;

        Ok(parsed.into_raw_page(url))
    }
}
