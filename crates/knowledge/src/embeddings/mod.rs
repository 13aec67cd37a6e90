//! Embedding generation for chunk text and queries.
//!
//! Provider-agnostic: the session holds one `Arc<dyn EmbeddingProvider>` and
//! uses it both to build the index and to embed queries.

pub mod config;
pub mod provider;
pub mod providers;

pub use config::EmbeddingConfig;
pub use provider::{create_provider, EmbeddingProvider};

use crimestat_core::{AppError, AppResult};

/// Embed `texts` in batches of `batch_size`, checking count and dimensions.
pub async fn embed_texts(
    provider: &dyn EmbeddingProvider,
    texts: &[String],
    batch_size: usize,
) -> AppResult<Vec<Vec<f32>>> {
    if texts.is_empty() {
        return Ok(Vec::new());
    }

    tracing::info!(
        "Embedding {} texts using provider '{}' (model: {})",
        texts.len(),
        provider.provider_name(),
        provider.model_name()
    );

    let mut embeddings = Vec::with_capacity(texts.len());
    for batch in texts.chunks(batch_size.max(1)) {
        let vectors = provider.embed_batch(batch).await?;
        if vectors.len() != batch.len() {
            return Err(AppError::Knowledge(format!(
                "Provider '{}' returned {} embeddings for {} texts",
                provider.provider_name(),
                vectors.len(),
                batch.len()
            )));
        }
        embeddings.extend(vectors);
    }

    if let Some(bad) = embeddings
        .iter()
        .find(|v| v.len() != provider.dimensions())
    {
        return Err(AppError::Knowledge(format!(
            "Embedding dimension mismatch: got {}, expected {}",
            bad.len(),
            provider.dimensions()
        )));
    }

    tracing::debug!(
        "Generated {} embeddings of dimension {}",
        embeddings.len(),
        provider.dimensions()
    );

    Ok(embeddings)
}
