//! Knowledge system type definitions.

use crate::chunk::ChunkConfig;
use crate::dataset::DatasetFiles;
use crate::embeddings::EmbeddingConfig;
use serde::{Deserialize, Serialize};

/// Settings for the retrieval subsystem (`.crimestat/knowledge.yaml`).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct KnowledgeConfig {
    /// Source table file names inside the data directory
    #[serde(default)]
    pub files: DatasetFiles,

    /// Embedding provider settings
    #[serde(default)]
    pub embedding: EmbeddingConfig,

    /// Chunking limits
    #[serde(default)]
    pub chunking: ChunkConfig,

    /// Number of chunks retrieved per query
    #[serde(default = "default_top_k")]
    pub top_k: usize,

    /// Persist chunk embeddings between runs
    #[serde(default = "default_cache_embeddings")]
    pub cache_embeddings: bool,
}

fn default_top_k() -> usize {
    crate::retriever::DEFAULT_TOP_K
}

fn default_cache_embeddings() -> bool {
    true
}

impl Default for KnowledgeConfig {
    fn default() -> Self {
        Self {
            files: DatasetFiles::default(),
            embedding: EmbeddingConfig::default(),
            chunking: ChunkConfig::default(),
            top_k: default_top_k(),
            cache_embeddings: default_cache_embeddings(),
        }
    }
}
