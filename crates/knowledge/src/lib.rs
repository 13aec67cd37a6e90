//! Retrieval over municipal crime tables.
//!
//! Loads the historical and prediction CSV tables, summarizes each
//! municipality into a text chunk, embeds the chunks and answers
//! nearest-neighbour queries against an exact in-memory index.

pub mod cache;
pub mod chunk;
pub mod config;
pub mod context;
pub mod dataset;
pub mod embeddings;
pub mod index;
pub mod retriever;
pub mod session;
pub mod summary;
pub mod types;


// Re-export commonly used types
pub use chunk::{Chunk, ChunkConfig};
pub use context::{has_relevant_data, NO_DATA_SENTINEL};
pub use dataset::{DatasetFiles, DatasetKind, Datasets, Table, TableSchema};
pub use embeddings::{EmbeddingConfig, EmbeddingProvider};
pub use retriever::{RetrievedChunk, DEFAULT_TOP_K};
pub use session::{IndexSnapshot, RagSession};
pub use summary::{DatasetOverview, DatasetStats};
pub use types::KnowledgeConfig;
