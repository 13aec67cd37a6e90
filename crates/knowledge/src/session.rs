//! Long-lived retrieval session.
//!
//! A `RagSession` owns the embedding provider and the current
//! `IndexSnapshot`. Readers clone the snapshot `Arc` under a short read
//! lock; `reload` builds a complete replacement first and swaps it in under
//! the write lock, so a query sees either the old or the new index.

use crate::cache::{self, EmbeddingCache};
use crate::chunk::{self, Chunk};
use crate::context;
use crate::dataset::{self, Datasets};
use crate::embeddings::{create_provider, EmbeddingProvider};
use crate::index::FlatIndex;
use crate::retriever::{self, RetrievedChunk, DEFAULT_TOP_K};
use crate::summary::{self, DatasetOverview, DatasetStats};
use crate::types::KnowledgeConfig;
use crimestat_core::AppResult;
use std::path::{Path, PathBuf};
use std::sync::{Arc, RwLock};
use std::time::Instant;

/// Everything derived from one load of the source tables.
#[derive(Debug)]
pub struct IndexSnapshot {
    pub chunks: Vec<Arc<Chunk>>,
    /// `None` until built; an empty index is a built index with zero vectors
    pub index: Option<FlatIndex>,
    /// Identity of the provider that produced the index vectors
    pub model_id: String,
    /// Whether the tables were read without a parse error
    pub data_loaded: bool,
    pub stats: DatasetStats,
    pub overview: Vec<DatasetOverview>,
}

impl IndexSnapshot {
    /// State before the first build.
    pub fn unbuilt(model_id: impl Into<String>) -> Self {
        Self {
            chunks: Vec::new(),
            index: None,
            model_id: model_id.into(),
            data_loaded: false,
            stats: DatasetStats::default(),
            overview: Vec::new(),
        }
    }

    /// Index built and holding at least one vector.
    pub fn is_ready(&self) -> bool {
        self.index.as_ref().is_some_and(|index| !index.is_empty())
    }
}

/// Retrieval session over the crime tables in one data directory.
pub struct RagSession {
    provider: Arc<dyn EmbeddingProvider>,
    config: KnowledgeConfig,
    data_dir: PathBuf,
    cache_path: Option<PathBuf>,
    state: RwLock<Arc<IndexSnapshot>>,
}

impl std::fmt::Debug for RagSession {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RagSession")
            .field("provider", &self.provider.model_id())
            .field("data_dir", &self.data_dir)
            .field("cache_path", &self.cache_path)
            .finish()
    }
}

impl RagSession {
    /// Create a session with an unbuilt index. Call `load_and_process` to build it.
    pub fn new(
        provider: Arc<dyn EmbeddingProvider>,
        config: KnowledgeConfig,
        data_dir: impl Into<PathBuf>,
        cache_path: Option<PathBuf>,
    ) -> Self {
        let state = RwLock::new(Arc::new(IndexSnapshot::unbuilt(provider.model_id())));
        Self {
            provider,
            config,
            data_dir: data_dir.into(),
            cache_path,
            state,
        }
    }

    /// Load `.crimestat/knowledge.yaml`, create the embedding provider and
    /// build the index from `data_dir`.
    ///
    /// Fails only if the configuration is invalid or the provider cannot be
    /// created. Missing or unreadable tables leave the session usable with
    /// an empty index.
    pub async fn initialize(workspace: &Path, data_dir: &Path) -> AppResult<Self> {
        let config = crate::config::load_config(workspace)?;
        let provider = create_provider(&config.embedding).await?;
        let cache_path = config
            .cache_embeddings
            .then(|| crate::config::get_cache_path(workspace));

        tracing::info!(
            "Initializing retrieval session: data {:?}, provider {}",
            data_dir,
            provider.model_id()
        );

        let session = Self::new(provider, config, data_dir, cache_path);
        session.load_and_process().await;
        Ok(session)
    }

    /// Read the tables, build chunks and index, and swap in the result.
    ///
    /// Returns whether the tables were loaded without error.
    pub async fn load_and_process(&self) -> bool {
        let start = Instant::now();
        let snapshot = self.build_snapshot().await;
        let data_loaded = snapshot.data_loaded;

        tracing::info!(
            "Retrieval index {}: {} chunks in {:.2}s",
            if snapshot.is_ready() { "ready" } else { "not ready" },
            snapshot.chunks.len(),
            start.elapsed().as_secs_f64()
        );

        self.swap(snapshot);
        data_loaded
    }

    /// Rebuild from disk. Queries running meanwhile keep the previous index.
    pub async fn reload(&self) -> bool {
        tracing::info!("Reloading data from {:?}", self.data_dir);
        self.load_and_process().await
    }

    async fn build_snapshot(&self) -> IndexSnapshot {
        let model_id = self.provider.model_id();

        let datasets = match dataset::load_datasets(&self.data_dir, &self.config.files) {
            Ok(datasets) => datasets,
            Err(e) => {
                tracing::error!("Failed to load data: {}", e);
                return IndexSnapshot::unbuilt(model_id);
            }
        };

        let chunks = chunk::build_chunks(&datasets, &self.config.chunking);
        let (index, data_loaded) = match self.build_index(&chunks).await {
            Ok(index) => (Some(index), true),
            Err(e) => {
                tracing::error!("Failed to build retrieval index: {}", e);
                (None, false)
            }
        };

        Self::snapshot_from(datasets, chunks, index, model_id, data_loaded)
    }

    fn snapshot_from(
        datasets: Datasets,
        chunks: Vec<Chunk>,
        index: Option<FlatIndex>,
        model_id: String,
        data_loaded: bool,
    ) -> IndexSnapshot {
        IndexSnapshot {
            chunks: chunks.into_iter().map(Arc::new).collect(),
            index,
            model_id,
            data_loaded,
            stats: DatasetStats::from_datasets(&datasets),
            overview: summary::build_overview(&datasets),
        }
    }

    async fn build_index(&self, chunks: &[Chunk]) -> AppResult<FlatIndex> {
        let texts: Vec<String> = chunks.iter().map(|c| c.text.clone()).collect();
        let cache = self.open_cache();
        let embeddings = cache::embed_with_cache(
            self.provider.as_ref(),
            cache.as_ref(),
            &texts,
            self.config.embedding.batch_size,
        )
        .await?;

        FlatIndex::build(self.provider.dimensions(), &embeddings)
    }

    fn open_cache(&self) -> Option<EmbeddingCache> {
        let path = self.cache_path.as_ref()?;
        match EmbeddingCache::open(path) {
            Ok(cache) => Some(cache),
            Err(e) => {
                tracing::warn!("Embedding cache unavailable, embedding without it: {}", e);
                None
            }
        }
    }

    fn swap(&self, snapshot: IndexSnapshot) {
        let snapshot = Arc::new(snapshot);
        match self.state.write() {
            Ok(mut state) => *state = snapshot,
            Err(poisoned) => *poisoned.into_inner() = snapshot,
        }
    }

    /// Current snapshot.
    pub fn snapshot(&self) -> Arc<IndexSnapshot> {
        match self.state.read() {
            Ok(state) => state.clone(),
            Err(poisoned) => poisoned.into_inner().clone(),
        }
    }

    pub fn provider(&self) -> &Arc<dyn EmbeddingProvider> {
        &self.provider
    }

    pub fn config(&self) -> &KnowledgeConfig {
        &self.config
    }

    pub fn is_data_loaded(&self) -> bool {
        self.snapshot().data_loaded
    }

    /// The `top_k` chunks nearest to `query`.
    pub async fn search(&self, query: &str, top_k: usize) -> AppResult<Vec<RetrievedChunk>> {
        let snapshot = self.snapshot();
        retriever::search(&snapshot, self.provider.as_ref(), query, top_k).await
    }

    /// Context block for `query` from the nearest `DEFAULT_TOP_K` chunks, or
    /// the no-data sentinel when nothing is retrieved.
    ///
    /// The configured `top_k` does not apply here; it only sets the default
    /// for ad hoc searches.
    pub async fn format_context(&self, query: &str) -> AppResult<String> {
        let results = self.search(query, DEFAULT_TOP_K).await?;
        Ok(context::format_context(&results))
    }

    /// Status block describing loaded data and index readiness.
    pub fn summary(&self) -> String {
        let snapshot = self.snapshot();
        summary::render_summary(&snapshot.stats, snapshot.chunks.len(), snapshot.is_ready())
    }

    /// Per-table profiles from the last load.
    pub fn overview(&self) -> Vec<DatasetOverview> {
        self.snapshot().overview.clone()
    }
}
