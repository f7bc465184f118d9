//! OpenAI embeddings provider (`POST /v1/embeddings`).
//!
//! Retry strategy:
//! - HTTP 429 or 5xx: retry with exponential backoff
//! - other HTTP 4xx: fail immediately
//! - network error: retry

use crate::embeddings::{EmbeddingConfig, EmbeddingProvider};
use async_trait::async_trait;
use pigeon_core::{AppError, AppResult};
use reqwest::Client;
use serde::Deserialize;
use std::time::Duration;
use tracing::{instrument, warn};

const DEFAULT_BASE_URL: &str = "https://api.openai.com/v1";
const MAX_RETRIES: u32 = 4;
const REQUEST_TIMEOUT_SECS: u64 = 30;

#[derive(Debug, Clone)]
pub struct OpenAiProvider {
    client: Client,
    base_url: String,
    api_key: String,
    model: String,
    dimensions: usize,
}

#[derive(Debug, Deserialize)]
struct EmbeddingsResponse {
    data: Vec<EmbeddingItem>,
}

#[derive(Debug, Deserialize)]
struct EmbeddingItem {
    index: usize,
    embedding: Vec<f32>,
}

impl OpenAiProvider {
    pub fn new(config: EmbeddingConfig, api_key: &str) -> AppResult<Self> {
        let client = Client::builder()
            .timeout(Duration::from_secs(REQUEST_TIMEOUT_SECS))
            .build()
            .map_err(|e| AppError::Knowledge(format!("Failed to create HTTP client: {}", e)))?;

        Ok(Self {
            client,
            base_url: config
                .endpoint
                .unwrap_or_else(|| DEFAULT_BASE_URL.to_string())
                .trim_end_matches('/')
                .to_string(),
            api_key: api_key.to_string(),
            model: config.model,
            dimensions: config.dimensions,
        })
    }

    /// Order items by their `index` and check the dimension of each.
    fn into_vectors(&self, response: EmbeddingsResponse, expected: usize) -> AppResult<Vec<Vec<f32>>> {
        let mut items = response.data;
        if items.len() != expected {
            return Err(AppError::Knowledge(format!(
                "OpenAI returned {} embeddings for {} inputs",
                items.len(),
                expected
            )));
        }
        items.sort_by_key(|item| item.index);

        items
            .into_iter()
            .map(|item| {
                if item.embedding.len() != self.dimensions {
                    return Err(AppError::Knowledge(format!(
                        "Unexpected embedding dimensions: got {}, expected {}",
                        item.embedding.len(),
                        self.dimensions
                    )));
                }
                Ok(item.embedding)
            })
            .collect()
    }
}

#[async_trait]
impl EmbeddingProvider for OpenAiProvider {
    fn provider_name(&self) -> &str {
        "openai"
    }

    fn model_name(&self) -> &str {
        &self.model
    }

    fn dimensions(&self) -> usize {
        self.dimensions
    }

    #[instrument(skip(self, texts), fields(batch_size = texts.len(), provider = "openai", model = %self.model))]
    async fn embed_batch(&self, texts: &[String]) -> AppResult<Vec<Vec<f32>>> {
        if texts.is_empty() {
            return Ok(vec![]);
        }

        let body = serde_json::json!({
            "model": self.model,
            "input": texts,
        });

        let mut last_err = None;

        for attempt in 0..=MAX_RETRIES {
            if attempt > 0 {
                let delay = Duration::from_secs(1 << (attempt - 1).min(5));
                warn!("Retrying OpenAI embeddings in {:?} (attempt {})", delay, attempt);
                tokio::time::sleep(delay).await;
            }

            let response = self
                .client
                .post(format!("{}/embeddings", self.base_url))
                .bearer_auth(&self.api_key)
                .json(&body)
                .send()
                .await;

            match response {
                Ok(response) => {
                    let status = response.status();

                    if status.is_success() {
                        let parsed: EmbeddingsResponse = response.json().await.map_err(|e| {
                            AppError::Knowledge(format!("Failed to parse OpenAI response: {}", e))
                        })?;
                        return self.into_vectors(parsed, texts.len());
                    }

                    let body_text = response.text().await.unwrap_or_default();
                    let err = AppError::Knowledge(format!(
                        "OpenAI API error {}: {}",
                        status, body_text
                    ));

                    if status.as_u16() == 429 || status.is_server_error() {
                        last_err = Some(err);
                        continue;
                    }

                    return Err(err);
                }
                Err(e) => {
                    last_err = Some(AppError::Knowledge(format!(
                        "Failed to send request to OpenAI: {}",
                        e
                    )));
                }
            }
        }

        Err(last_err
            .unwrap_or_else(|| AppError::Knowledge("Embedding failed after retries".to_string())))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn provider(dimensions: usize) -> OpenAiProvider {
        let config = EmbeddingConfig {
            provider: "openai".to_string(),
            model: "text-embedding-3-small".to_string(),
            dimensions,
            ..Default::default()
        };
        OpenAiProvider::new(config, "sk-test").unwrap()
    }

    #[test]
    fn test_vectors_sorted_by_index() {
        let response: EmbeddingsResponse = serde_json::from_str(
            r#"{"data":[{"index":1,"embedding":[0.0,1.0]},{"index":0,"embedding":[1.0,0.0]}]}"#,
        )
        .unwrap();
        let vectors = provider(2).into_vectors(response, 2).unwrap();
        assert_eq!(vectors, vec![vec![1.0, 0.0], vec![0.0, 1.0]]);
    }

    #[test]
    fn test_dimension_mismatch_rejected() {
        let response: EmbeddingsResponse =
            serde_json::from_str(r#"{"data":[{"index":0,"embedding":[1.0,0.0,0.0]}]}"#).unwrap();
        assert!(provider(2).into_vectors(response, 1).is_err());
    }

    #[test]
    fn test_count_mismatch_rejected() {
        let response: EmbeddingsResponse = serde_json::from_str(r#"{"data":[]}"#).unwrap();
        assert!(provider(2).into_vectors(response, 1).is_err());
    }
}
