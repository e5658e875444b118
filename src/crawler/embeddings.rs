//! Text embedding client
//!
//! POSTs `{"text": ...}` to the embedding service and reads the first vector
//! of `{"vectors": [[...]]}`.

use reqwest::Client;
use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Page fields sent for embedding
pub const EMBEDDED_FIELDS: [&str; 3] = ["body", "title", "description"];

#[derive(Debug, Error)]
pub enum EmbeddingError {
    #[error("Request failed: {0}")]
    Request(#[from] reqwest::Error),

    #[error("Service returned status {0}")]
    Status(u16),

    #[error("Service returned no vector")]
    Empty,
}

#[derive(Serialize)]
struct EmbeddingRequest<'a> {
    text: &'a str,
}

#[derive(Deserialize)]
struct EmbeddingResponse {
    #[serde(default)]
    vectors: Vec<Vec<f32>>,
}

/// Client for the embedding service
#[derive(Debug, Clone)]
pub struct EmbeddingClient {
    client: Client,
    endpoint: String,
}

impl EmbeddingClient {
    pub fn new(client: Client, endpoint: impl Into<String>) -> Self {
        Self {
            client,
            endpoint: endpoint.into(),
        }
    }

    /// Embeds one piece of text
    pub async fn embed(&self, text: &str) -> Result<Vec<f32>, EmbeddingError> {
        let response = self
            .client
            .post(&self.endpoint)
            .json(&EmbeddingRequest { text })
            .send()
            .await?;

        if !response.status().is_success() {
            return Err(EmbeddingError::Status(response.status().as_u16()));
        }

        let body: EmbeddingResponse = response.json().await?;
        body.vectors
            .into_iter()
            .next()
            .filter(|v| !v.is_empty())
            .ok_or(EmbeddingError::Empty)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use wiremock::matchers::{body_json, method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    #[tokio::test]
    async fn test_embed_returns_first_vector() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/vectorize"))
            .and(body_json(serde_json::json!({"text": "hello"})))
            .respond_with(
                ResponseTemplate::new(200)
                    .set_body_json(serde_json::json!({"vectors": [[0.25, 0.5], [9.0]]})),
            )
            .mount(&server)
            .await;

        let client = EmbeddingClient::new(Client::new(), format!("{}/vectorize", server.uri()));
        assert_eq!(client.embed("hello").await.unwrap(), vec![0.25, 0.5]);
    }

    #[tokio::test]
    async fn test_embed_errors() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/empty"))
            .respond_with(
                ResponseTemplate::new(200).set_body_json(serde_json::json!({"vectors": []})),
            )
            .mount(&server)
            .await;

        let empty = EmbeddingClient::new(Client::new(), format!("{}/empty", server.uri()));
        assert!(matches!(empty.embed("x").await, Err(EmbeddingError::Empty)));

        let missing = EmbeddingClient::new(Client::new(), format!("{}/missing", server.uri()));
        assert!(matches!(missing.embed("x").await, Err(EmbeddingError::Status(404))));
    }
}
