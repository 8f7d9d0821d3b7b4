//! Embedding service abstraction and its OpenAI-compatible HTTP client.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Errors that can arise from embedding calls.
#[derive(Error, Debug)]
pub enum EmbedError {
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),
    #[error("Embedding server returned {status}: {body}")]
    Status { status: u16, body: String },
    #[error("No embedding returned")]
    Empty,
    #[error("Embedding timed out")]
    Timeout,
}

/// Maps text onto a fixed-length vector.
#[async_trait]
pub trait EmbeddingService: Send + Sync {
    async fn embed(&self, text: &str) -> Result<Vec<f32>, EmbedError>;
}

#[derive(Serialize)]
struct EmbeddingRequest<'a> {
    model: &'a str,
    input: Vec<String>,
}

#[derive(Deserialize)]
struct EmbeddingResponse {
    data: Vec<EmbeddingData>,
}

#[derive(Deserialize)]
struct EmbeddingData {
    embedding: Vec<f32>,
    #[serde(default)]
    index: usize,
}

/// Client for a `/v1/embeddings` endpoint.
pub struct HttpEmbedder {
    base_url: String,
    model: String,
    client: reqwest::Client,
}

impl HttpEmbedder {
    pub fn new(base_url: impl Into<String>, model: impl Into<String>) -> Self {
        Self {
            base_url: base_url.into().trim_end_matches('/').to_string(),
            model: model.into(),
            client: reqwest::Client::new(),
        }
    }
}

/// Whitespace-normalise text before embedding.
fn normalize_text(text: &str) -> String {
    text.split_whitespace().collect::<Vec<_>>().join(" ")
}

#[async_trait]
impl EmbeddingService for HttpEmbedder {
    async fn embed(&self, text: &str) -> Result<Vec<f32>, EmbedError> {
        let request = EmbeddingRequest {
            model: &self.model,
            input: vec![normalize_text(text)],
        };
        let response = self
            .client
            .post(format!("{}/v1/embeddings", self.base_url))
            .json(&request)
            .send()
            .await?;

        if !response.status().is_success() {
            let status = response.status().as_u16();
            let body = response.text().await.unwrap_or_default();
            return Err(EmbedError::Status { status, body });
        }

        let data: EmbeddingResponse = response.json().await?;
        first_embedding(data)
    }
}

fn first_embedding(data: EmbeddingResponse) -> Result<Vec<f32>, EmbedError> {
    data.data
        .into_iter()
        .min_by_key(|d| d.index)
        .map(|d| d.embedding)
        .filter(|v| !v.is_empty())
        .ok_or(EmbedError::Empty)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn normalizes_whitespace() {
        assert_eq!(normalize_text("  a \n\t b  "), "a b");
    }

    #[test]
    fn picks_lowest_index() {
        let data: EmbeddingResponse = serde_json::from_str(
            r#"{"data":[{"embedding":[2.0],"index":1},{"embedding":[1.0,0.5],"index":0}]}"#,
        )
        .unwrap();
        assert_eq!(first_embedding(data).unwrap(), vec![1.0, 0.5]);
    }

    #[test]
    fn empty_payload_is_an_error() {
        let data: EmbeddingResponse = serde_json::from_str(r#"{"data":[]}"#).unwrap();
        assert!(matches!(first_embedding(data), Err(EmbedError::Empty)));
    }
}
