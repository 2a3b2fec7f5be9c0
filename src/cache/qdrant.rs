//! Qdrant-backed vector store for the semantic cache.

use async_trait::async_trait;
use qdrant_client::qdrant::value::Kind;
use qdrant_client::qdrant::{
    CreateCollectionBuilder, Distance, PointStruct, SearchPointsBuilder, UpsertPointsBuilder,
    VectorParamsBuilder,
};
use qdrant_client::{Payload, Qdrant};

use super::{CachedAnswer, VectorStore};

pub struct QdrantCacheStore {
    client: Qdrant,
    collection: String,
}

impl QdrantCacheStore {
    /// Connect and make sure the cache collection exists. Any failure here
    /// means the caller should run with caching disabled.
    pub async fn connect(
        url: &str,
        api_key: Option<&str>,
        collection: &str,
        dimensions: usize,
    ) -> anyhow::Result<Self> {
        let mut builder = Qdrant::from_url(url);
        if let Some(key) = api_key {
            builder = builder.api_key(key);
        }
        let client = builder.build()?;

        let store = Self {
            client,
            collection: collection.to_string(),
        };
        store.ensure_collection(dimensions).await?;
        Ok(store)
    }

    async fn ensure_collection(&self, dimensions: usize) -> anyhow::Result<()> {
        let collections = self.client.list_collections().await?;
        if collections
            .collections
            .iter()
            .any(|c| c.name == self.collection)
        {
            return Ok(());
        }

        self.client
            .create_collection(
                CreateCollectionBuilder::new(self.collection.as_str()).vectors_config(
                    VectorParamsBuilder::new(dimensions as u64, Distance::Cosine),
                ),
            )
            .await?;
        tracing::info!(
            "Created vector collection '{}' ({} dims)",
            self.collection,
            dimensions
        );
        Ok(())
    }
}

#[async_trait]
impl VectorStore for QdrantCacheStore {
    async fn upsert(
        &self,
        id: &str,
        embedding: &[f32],
        query: &str,
        answer: &str,
    ) -> anyhow::Result<()> {
        let payload: Payload = serde_json::json!({
            "query": query,
            "answer": answer,
        })
        .try_into()
        .map_err(|e| anyhow::anyhow!("cache payload conversion failed: {e}"))?;

        let point = PointStruct::new(id.to_string(), embedding.to_vec(), payload);
        self.client
            .upsert_points(UpsertPointsBuilder::new(self.collection.as_str(), vec![point]))
            .await?;
        Ok(())
    }

    async fn nearest(
        &self,
        embedding: &[f32],
        threshold: f32,
    ) -> anyhow::Result<Option<CachedAnswer>> {
        let response = self
            .client
            .search_points(
                SearchPointsBuilder::new(self.collection.as_str(), embedding.to_vec(), 1)
                    .score_threshold(threshold)
                    .with_payload(true),
            )
            .await?;

        let Some(hit) = response.result.into_iter().next() else {
            return Ok(None);
        };

        let field = |key: &str| -> String {
            match hit.payload.get(key).and_then(|v| v.kind.as_ref()) {
                Some(Kind::StringValue(s)) => s.clone(),
                _ => String::new(),
            }
        };

        Ok(Some(CachedAnswer {
            score: hit.score,
            query: field("query"),
            answer: field("answer"),
        }))
    }
}
