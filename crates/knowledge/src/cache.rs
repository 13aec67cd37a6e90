//! SQLite-backed embedding cache.
//!
//! Chunk embeddings are keyed by `(model_id, sha256(text))`. A cached vector
//! is only ever returned for the model that produced it, and a change in
//! chunk text changes the key, so stale entries are never served. Entries
//! for texts that are no longer indexed are pruned after each build.

use crate::embeddings::{self, EmbeddingProvider};
use chrono::Utc;
use crimestat_core::{AppError, AppResult};
use rusqlite::{params, Connection, OptionalExtension};
use sha2::{Digest, Sha256};
use std::collections::HashSet;
use std::path::Path;
use std::sync::{Mutex, MutexGuard};

/// Persistent store of previously computed embeddings.
pub struct EmbeddingCache {
    conn: Mutex<Connection>,
}

impl EmbeddingCache {
    /// Open (or create) the cache database at `path`.
    pub fn open(path: &Path) -> AppResult<Self> {
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent).map_err(|e| {
                AppError::Knowledge(format!("Failed to create cache directory: {}", e))
            })?;
        }

        let conn = Connection::open(path)
            .map_err(|e| AppError::Knowledge(format!("Failed to open embedding cache: {}", e)))?;

        conn.execute_batch(
            r#"
            CREATE TABLE IF NOT EXISTS embeddings (
                model_id TEXT NOT NULL,
                text_hash TEXT NOT NULL,
                embedding BLOB NOT NULL,
                created_at TEXT NOT NULL,
                PRIMARY KEY (model_id, text_hash)
            );
            "#,
        )
        .map_err(|e| AppError::Knowledge(format!("Failed to create cache table: {}", e)))?;

        tracing::debug!("Opened embedding cache at {:?}", path);
        Ok(Self {
            conn: Mutex::new(conn),
        })
    }

    fn conn(&self) -> AppResult<MutexGuard<'_, Connection>> {
        self.conn
            .lock()
            .map_err(|_| AppError::Knowledge("Embedding cache lock poisoned".to_string()))
    }

    /// Cached embedding of `text` for `model_id`.
    ///
    /// Entries whose length differs from `dimensions` are treated as misses.
    pub fn get(&self, model_id: &str, text: &str, dimensions: usize) -> AppResult<Option<Vec<f32>>> {
        let bytes: Option<Vec<u8>> = self
            .conn()?
            .query_row(
                "SELECT embedding FROM embeddings WHERE model_id = ?1 AND text_hash = ?2",
                params![model_id, text_hash(text)],
                |row| row.get(0),
            )
            .optional()
            .map_err(|e| AppError::Knowledge(format!("Failed to read embedding cache: {}", e)))?;

        let Some(bytes) = bytes else {
            return Ok(None);
        };

        match bytes_to_embedding(&bytes) {
            Ok(embedding) if embedding.len() == dimensions => Ok(Some(embedding)),
            _ => {
                tracing::debug!("Ignoring cached embedding with unexpected size");
                Ok(None)
            }
        }
    }

    /// Store the embedding of `text` for `model_id`, replacing any previous entry.
    pub fn put(&self, model_id: &str, text: &str, embedding: &[f32]) -> AppResult<()> {
        self.conn()?
            .execute(
                "INSERT OR REPLACE INTO embeddings (model_id, text_hash, embedding, created_at) \
                 VALUES (?1, ?2, ?3, ?4)",
                params![
                    model_id,
                    text_hash(text),
                    embedding_to_bytes(embedding),
                    Utc::now().to_rfc3339()
                ],
            )
            .map_err(|e| AppError::Knowledge(format!("Failed to write embedding cache: {}", e)))?;
        Ok(())
    }

    /// Drop entries for `model_id` whose text is not in `texts`.
    ///
    /// Returns the number of rows removed. Entries of other models are kept.
    pub fn retain(&self, model_id: &str, texts: &[String]) -> AppResult<usize> {
        let live: HashSet<String> = texts.iter().map(|t| text_hash(t)).collect();

        let mut conn = self.conn()?;
        let tx = conn
            .transaction()
            .map_err(|e| AppError::Knowledge(format!("Failed to start cache prune: {}", e)))?;

        let stored: Vec<String> = {
            let mut stmt = tx
                .prepare("SELECT text_hash FROM embeddings WHERE model_id = ?1")
                .map_err(|e| AppError::Knowledge(format!("Failed to scan cache: {}", e)))?;
            let rows = stmt
                .query_map(params![model_id], |row| row.get::<_, String>(0))
                .map_err(|e| AppError::Knowledge(format!("Failed to scan cache: {}", e)))?;
            let hashes: Vec<String> = rows
                .collect::<Result<_, _>>()
                .map_err(|e| AppError::Knowledge(format!("Failed to scan cache: {}", e)))?;
            hashes
        };

        let mut removed = 0;
        for hash in stored.iter().filter(|h| !live.contains(*h)) {
            removed += tx
                .execute(
                    "DELETE FROM embeddings WHERE model_id = ?1 AND text_hash = ?2",
                    params![model_id, hash],
                )
                .map_err(|e| AppError::Knowledge(format!("Failed to prune cache: {}", e)))?;
        }

        tx.commit()
            .map_err(|e| AppError::Knowledge(format!("Failed to prune cache: {}", e)))?;
        Ok(removed)
    }

    /// Number of entries stored for `model_id`.
    pub fn count(&self, model_id: &str) -> AppResult<usize> {
        let count: i64 = self
            .conn()?
            .query_row(
                "SELECT COUNT(*) FROM embeddings WHERE model_id = ?1",
                params![model_id],
                |row| row.get(0),
            )
            .map_err(|e| AppError::Knowledge(format!("Failed to count cache entries: {}", e)))?;
        Ok(count as usize)
    }
}

/// Embed `texts`, serving hits from `cache` and storing misses.
///
/// Cache read/write failures are logged and fall back to the provider; only
/// provider failures are returned as errors.
pub async fn embed_with_cache(
    provider: &dyn EmbeddingProvider,
    cache: Option<&EmbeddingCache>,
    texts: &[String],
    batch_size: usize,
) -> AppResult<Vec<Vec<f32>>> {
    let Some(cache) = cache else {
        return embeddings::embed_texts(provider, texts, batch_size).await;
    };

    let model_id = provider.model_id();
    let dimensions = provider.dimensions();

    let mut results: Vec<Option<Vec<f32>>> = Vec::with_capacity(texts.len());
    for text in texts {
        let hit = cache.get(&model_id, text, dimensions).unwrap_or_else(|e| {
            tracing::warn!("Embedding cache lookup failed: {}", e);
            None
        });
        results.push(hit);
    }

    let missing: Vec<usize> = results
        .iter()
        .enumerate()
        .filter(|(_, r)| r.is_none())
        .map(|(i, _)| i)
        .collect();

    tracing::info!(
        "Embedding cache: {} hits, {} misses (model {})",
        texts.len() - missing.len(),
        missing.len(),
        model_id
    );

    if !missing.is_empty() {
        let miss_texts: Vec<String> = missing.iter().map(|&i| texts[i].clone()).collect();
        let fresh = embeddings::embed_texts(provider, &miss_texts, batch_size).await?;

        for (&i, embedding) in missing.iter().zip(fresh) {
            if let Err(e) = cache.put(&model_id, &texts[i], &embedding) {
                tracing::warn!("Failed to store embedding in cache: {}", e);
            }
            results[i] = Some(embedding);
        }
    }

    match cache.retain(&model_id, texts) {
        Ok(0) => {}
        Ok(removed) => tracing::debug!("Pruned {} stale cache entries", removed),
        Err(e) => tracing::warn!("Failed to prune embedding cache: {}", e),
    }

    results
        .into_iter()
        .map(|r| r.ok_or_else(|| AppError::Knowledge("Missing embedding".to_string())))
        .collect()
}

/// SHA-256 of `text`, hex encoded.
pub fn text_hash(text: &str) -> String {
    let mut hasher = Sha256::new();
    hasher.update(text.as_bytes());
    format!("{:x}", hasher.finalize())
}

/// Convert embedding vector to little-endian bytes.
fn embedding_to_bytes(embedding: &[f32]) -> Vec<u8> {
    let mut bytes = Vec::with_capacity(embedding.len() * 4);
    for &value in embedding {
        bytes.extend_from_slice(&value.to_le_bytes());
    }
    bytes
}

/// Convert bytes back to embedding vector.
fn bytes_to_embedding(bytes: &[u8]) -> AppResult<Vec<f32>> {
    if bytes.len() % 4 != 0 {
        return Err(AppError::Knowledge(
            "Invalid embedding bytes length".to_string(),
        ));
    }

    Ok(bytes
        .chunks_exact(4)
        .map(|b| f32::from_le_bytes([b[0], b[1], b[2], b[3]]))
        .collect())
}
