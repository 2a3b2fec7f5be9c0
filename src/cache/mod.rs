//! Semantic response cache.
//!
//! Maps a query, via its embedding, to a previously produced answer when a
//! stored query is similar enough. Backed by a vector index behind the
//! [`VectorStore`] trait; every operation is best-effort and a connectivity
//! failure disables the cache for the rest of the process lifetime.

mod qdrant;

pub use qdrant::QdrantCacheStore;

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use async_trait::async_trait;

use crate::llm::EmbeddingProvider;

/// Cosine similarity a stored query must reach to count as a hit.
pub const SIMILARITY_THRESHOLD: f32 = 0.85;

pub const CACHE_COLLECTION: &str = "semantic_cache";

#[derive(Debug, Clone)]
pub struct CachedAnswer {
    pub score: f32,
    pub query: String,
    pub answer: String,
}

/// Vector index holding (embedding, query, answer) entries.
#[async_trait]
pub trait VectorStore: Send + Sync {
    async fn upsert(
        &self,
        id: &str,
        embedding: &[f32],
        query: &str,
        answer: &str,
    ) -> anyhow::Result<()>;

    /// Nearest stored entry scoring at or above `threshold`, if any.
    async fn nearest(
        &self,
        embedding: &[f32],
        threshold: f32,
    ) -> anyhow::Result<Option<CachedAnswer>>;
}

pub struct SemanticCache {
    embedder: Arc<dyn EmbeddingProvider>,
    store: Option<Arc<dyn VectorStore>>,
    threshold: f32,
    disabled: AtomicBool,
}

impl SemanticCache {
    pub fn new(embedder: Arc<dyn EmbeddingProvider>, store: Option<Arc<dyn VectorStore>>) -> Self {
        if store.is_none() {
            tracing::warn!("Vector index not reachable. Semantic caching disabled.");
        }
        Self {
            embedder,
            store,
            threshold: SIMILARITY_THRESHOLD,
            disabled: AtomicBool::new(false),
        }
    }

    fn usable(&self) -> bool {
        self.store.is_some() && !self.disabled.load(Ordering::Relaxed)
    }

    fn disable(&self, err: &dyn std::fmt::Display) {
        tracing::warn!("Semantic cache error: {}; caching disabled", err);
        self.disabled.store(true, Ordering::Relaxed);
    }

    /// Look up the answer of the nearest cached query, if similar enough.
    pub async fn check(&self, query: &str) -> Option<String> {
        if !self.usable() {
            return None;
        }
        let store = self.store.as_ref()?;

        let embedding = match self.embedder.embed(query).await {
            Ok(vector) => vector,
            Err(err) => {
                tracing::warn!("Cache check embedding failed: {}", err);
                return None;
            }
        };

        match store.nearest(&embedding, self.threshold).await {
            Ok(Some(hit)) => {
                tracing::debug!("Semantic cache hit (score {:.3})", hit.score);
                Some(hit.answer)
            }
            Ok(None) => None,
            Err(err) => {
                self.disable(&err);
                None
            }
        }
    }

    /// Store a (query, answer) pair. Entries are never updated or evicted.
    pub async fn add(&self, query: &str, answer: &str) {
        if !self.usable() {
            return;
        }
        let Some(store) = self.store.as_ref() else {
            return;
        };

        let embedding = match self.embedder.embed(query).await {
            Ok(vector) => vector,
            Err(err) => {
                tracing::warn!("Cache add embedding failed: {}", err);
                return;
            }
        };

        let id = uuid::Uuid::new_v4().to_string();
        if let Err(err) = store.upsert(&id, &embedding, query, answer).await {
            self.disable(&err);
        }
    }
}
