//! Query-time retrieval over the current index snapshot.

use crate::chunk::Chunk;
use crate::embeddings::EmbeddingProvider;
use crate::session::IndexSnapshot;
use crimestat_core::{AppError, AppResult};
use std::sync::Arc;

/// Number of chunks retrieved per query unless configured otherwise.
pub const DEFAULT_TOP_K: usize = 3;

/// One search hit.
#[derive(Debug, Clone)]
pub struct RetrievedChunk {
    pub chunk: Arc<Chunk>,
    /// Squared Euclidean distance to the query embedding
    pub distance: f32,
    /// Position of the chunk in the snapshot's chunk list
    pub position: usize,
}

/// Find the `top_k` chunks closest to `query`.
///
/// An unbuilt or empty index and `top_k == 0` yield an empty result. The
/// provider must be the one the snapshot was built with.
pub async fn search(
    snapshot: &IndexSnapshot,
    provider: &dyn EmbeddingProvider,
    query: &str,
    top_k: usize,
) -> AppResult<Vec<RetrievedChunk>> {
    let Some(index) = snapshot.index.as_ref() else {
        tracing::debug!("Search skipped: index not built");
        return Ok(Vec::new());
    };
    if top_k == 0 || index.is_empty() {
        return Ok(Vec::new());
    }

    let model_id = provider.model_id();
    if model_id != snapshot.model_id {
        return Err(AppError::Knowledge(format!(
            "Index was built with '{}' but query provider is '{}'",
            snapshot.model_id, model_id
        )));
    }

    let query_embedding = provider.embed(query).await?;
    let hits = index.search(&query_embedding, top_k)?;

    let results: Vec<RetrievedChunk> = hits
        .into_iter()
        .filter_map(|(position, distance)| {
            snapshot.chunks.get(position).map(|chunk| RetrievedChunk {
                chunk: Arc::clone(chunk),
                distance,
                position,
            })
        })
        .collect();

    tracing::debug!(
        "Retrieved {} chunks (requested top-{}), distances: {:?}",
        results.len(),
        top_k,
        results.iter().map(|r| r.distance).collect::<Vec<_>>()
    );

    Ok(results)
}
