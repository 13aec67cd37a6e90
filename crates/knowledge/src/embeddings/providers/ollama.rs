//! Embeddings served by a local Ollama instance.
//!
//! Each text is one `/api/embeddings` call. Failed calls are retried with
//! doubling backoff. The base URL is taken from `provider_config.endpoint`,
//! then `OLLAMA_URL`, then `http://localhost:11434`.

use crate::embeddings::{EmbeddingConfig, EmbeddingProvider};
use async_trait::async_trait;
use crimestat_core::{AppError, AppResult};
use reqwest::Client;
use serde::{Deserialize, Serialize};
use std::time::Duration;
use tracing::{debug, instrument, warn};

const DEFAULT_OLLAMA_URL: &str = "http://localhost:11434";

const MAX_ATTEMPTS: u32 = 3;
const INITIAL_BACKOFF_MS: u64 = 100;
const REQUEST_TIMEOUT: Duration = Duration::from_secs(30);

/// Text embedded once at startup to prove the model is installed.
const PROBE_TEXT: &str = "Municipality: probe. Total records: 0.";

#[derive(Debug, Clone)]
pub struct OllamaProvider {
    client: Client,
    embeddings_url: String,
    model: String,
    dimensions: usize,
}

#[derive(Serialize)]
struct EmbeddingRequest<'a> {
    model: &'a str,
    prompt: &'a str,
}

#[derive(Deserialize)]
struct EmbeddingResponse {
    embedding: Vec<f32>,
}

#[derive(Deserialize)]
struct ErrorResponse {
    error: String,
}

impl OllamaProvider {
    /// Create a provider and verify that Ollama serves the configured model.
    ///
    /// # Errors
    /// * `AppError::Knowledge` if Ollama is unreachable or returns vectors of
    ///   the wrong dimension
    pub async fn new(config: &EmbeddingConfig) -> AppResult<Self> {
        let provider = Self::unverified(config)?;
        provider.verify_connection().await?;
        Ok(provider)
    }

    fn unverified(config: &EmbeddingConfig) -> AppResult<Self> {
        let client = Client::builder()
            .timeout(REQUEST_TIMEOUT)
            .build()
            .map_err(|e| AppError::Knowledge(format!("Ollama HTTP client: {}", e)))?;

        let base_url = match config.provider_option("endpoint") {
            Some(endpoint) => endpoint.to_string(),
            None => std::env::var("OLLAMA_URL").unwrap_or_else(|_| DEFAULT_OLLAMA_URL.to_string()),
        };

        Ok(Self {
            client,
            embeddings_url: format!("{}/api/embeddings", base_url.trim_end_matches('/')),
            model: config.model.clone(),
            dimensions: config.dimensions,
        })
    }

    async fn verify_connection(&self) -> AppResult<()> {
        debug!("Probing {} with model '{}'", self.embeddings_url, self.model);

        self.embed_text(PROBE_TEXT).await.map_err(|e| {
            AppError::Knowledge(format!(
                "Ollama not available at {} ({}). Start Ollama and run: ollama pull {}",
                self.embeddings_url, e, self.model
            ))
        })?;

        debug!("Ollama model '{}' ready", self.model);
        Ok(())
    }

    /// Embed one text, retrying failed calls.
    #[instrument(skip(self, text), fields(text_len = text.len()))]
    async fn embed_text(&self, text: &str) -> AppResult<Vec<f32>> {
        let mut backoff = Duration::from_millis(INITIAL_BACKOFF_MS);

        for attempt in 1..MAX_ATTEMPTS {
            match self.request_embedding(text).await {
                Ok(embedding) => return Ok(embedding),
                Err(e) => {
                    warn!(
                        "Ollama embedding attempt {}/{} failed: {}; retrying in {:?}",
                        attempt, MAX_ATTEMPTS, e, backoff
                    );
                    tokio::time::sleep(backoff).await;
                    backoff *= 2;
                }
            }
        }

        self.request_embedding(text).await
    }

    async fn request_embedding(&self, text: &str) -> AppResult<Vec<f32>> {
        let response = self
            .client
            .post(&self.embeddings_url)
            .json(&EmbeddingRequest {
                model: &self.model,
                prompt: text,
            })
            .send()
            .await
            .map_err(|e| AppError::Knowledge(format!("Ollama request failed: {}", e)))?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            let message = serde_json::from_str::<ErrorResponse>(&body)
                .map(|r| r.error)
                .unwrap_or(body);
            return Err(AppError::Knowledge(format!(
                "Ollama returned {}: {}",
                status, message
            )));
        }

        let parsed: EmbeddingResponse = response
            .json()
            .await
            .map_err(|e| AppError::Knowledge(format!("Invalid Ollama response: {}", e)))?;

        self.check_dimensions(parsed.embedding)
    }

    fn check_dimensions(&self, embedding: Vec<f32>) -> AppResult<Vec<f32>> {
        if embedding.len() == self.dimensions {
            Ok(embedding)
        } else {
            Err(AppError::Knowledge(format!(
                "Model '{}' produced {}-dimensional vectors; configured for {}",
                self.model,
                embedding.len(),
                self.dimensions
            )))
        }
    }
}

#[async_trait]
impl EmbeddingProvider for OllamaProvider {
    fn provider_name(&self) -> &str {
        "ollama"
    }

    fn model_name(&self) -> &str {
        &self.model
    }

    fn dimensions(&self) -> usize {
        self.dimensions
    }

    async fn embed_batch(&self, texts: &[String]) -> AppResult<Vec<Vec<f32>>> {
        let mut embeddings = Vec::with_capacity(texts.len());
        for text in texts {
            // Blank queries map to the zero vector
            let embedding = if text.trim().is_empty() {
                vec![0.0; self.dimensions]
            } else {
                self.embed_text(text).await?
            };
            embeddings.push(embedding);
        }
        Ok(embeddings)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn create_test_config() -> EmbeddingConfig {
        EmbeddingConfig {
            provider: "ollama".to_string(),
            model: "nomic-embed-text".to_string(),
            dimensions: 768,
            ..Default::default()
        }
    }

    async fn ollama_reachable() -> bool {
        let client = Client::builder()
            .timeout(Duration::from_secs(2))
            .build()
            .unwrap();
        client
            .get(format!("{}/api/tags", DEFAULT_OLLAMA_URL))
            .send()
            .await
            .is_ok()
    }

    #[test]
    fn test_endpoint_from_provider_config() {
        let config = EmbeddingConfig {
            provider_config: serde_json::json!({"endpoint": "http://gpu-box:11434/"}),
            ..create_test_config()
        };
        let provider = OllamaProvider::unverified(&config).unwrap();
        assert_eq!(provider.embeddings_url, "http://gpu-box:11434/api/embeddings");
        assert_eq!(provider.model_id(), "ollama/nomic-embed-text/768");
    }

    #[test]
    fn test_dimension_check() {
        let provider = OllamaProvider::unverified(&create_test_config()).unwrap();
        assert!(provider.check_dimensions(vec![0.1; 768]).is_ok());
        assert!(provider.check_dimensions(vec![0.1; 384]).is_err());
    }

    #[tokio::test]
    async fn test_empty_text_is_zero_vector() {
        // No request is made for blank input
        let provider = OllamaProvider::unverified(&create_test_config()).unwrap();
        let embedding = provider.embed("   ").await.unwrap();
        assert_eq!(embedding.len(), 768);
        assert!(embedding.iter().all(|&x| x == 0.0));
    }

    #[tokio::test]
    async fn test_unreachable_server_fails_init() {
        let config = EmbeddingConfig {
            provider_config: serde_json::json!({"endpoint": "http://127.0.0.1:9"}),
            ..create_test_config()
        };
        let result = OllamaProvider::new(&config).await;
        assert!(matches!(result, Err(AppError::Knowledge(_))));
    }

    #[tokio::test]
    async fn test_embed_batch_live() {
        if std::env::var("OLLAMA_URL").is_err() && !ollama_reachable().await {
            println!("Skipping test: Ollama not running");
            return;
        }

        let provider = match OllamaProvider::new(&create_test_config()).await {
            Ok(p) => p,
            Err(e) => {
                println!("Skipping test: {}", e);
                return;
            }
        };

        let texts = vec![
            "Municipality: Giron. Total records: 12.".to_string(),
            "Predictions for Lebrija. Total: 3 predictions.".to_string(),
        ];
        let embeddings = provider.embed_batch(&texts).await.unwrap();

        assert_eq!(embeddings.len(), 2);
        for embedding in embeddings {
            assert_eq!(embedding.len(), 768);
            assert!(embedding.iter().any(|&x| x != 0.0));
        }
    }
}
