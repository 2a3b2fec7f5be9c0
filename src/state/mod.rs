use std::sync::Arc;

use reqwest::Client;

use crate::cache::{QdrantCacheStore, SemanticCache, VectorStore, CACHE_COLLECTION};
use crate::core::config::{AppPaths, Settings};
use crate::graph::{build_agent_graph, GraphRuntime};
use crate::history::HistoryStore;
use crate::llm::{ChatModel, EmbeddingProvider, GeminiClient};
use crate::tools::ToolRouter;

pub mod error;

use error::InitializationError;

/// Global application state shared across all routes.
///
/// Every service is constructed once here and injected; there is no
/// ambient module state. The model and embedder sit behind trait objects
/// so tests can substitute scripted implementations.
#[derive(Clone)]
pub struct AppState {
    pub paths: Arc<AppPaths>,
    pub history: HistoryStore,
    pub model: Arc<dyn ChatModel>,
    pub embedder: Arc<dyn EmbeddingProvider>,
    pub cache: Arc<SemanticCache>,
    pub tools: ToolRouter,
    pub graph_runtime: Arc<GraphRuntime>,
}

impl AppState {
    /// Initializes the application state:
    /// 1. Paths and the history database
    /// 2. The Gemini client (chat + embeddings)
    /// 3. The semantic cache (disabled if the vector index is unreachable)
    /// 4. Tool routing and the agent graph
    pub async fn initialize(settings: Settings) -> Result<Arc<Self>, InitializationError> {
        let paths = Arc::new(AppPaths::new());

        let history = HistoryStore::new(paths.db_path.clone())
            .await
            .map_err(|e| InitializationError::History(e.into()))?;

        let http = Client::new();
        let gemini = GeminiClient::new(
            http.clone(),
            settings.gemini_api_key.clone(),
            settings.gemini_model.clone(),
            settings.gemini_embedding_model.clone(),
        );
        let model: Arc<dyn ChatModel> = Arc::new(gemini.clone());
        let embedder: Arc<dyn EmbeddingProvider> = Arc::new(gemini);

        let store: Option<Arc<dyn VectorStore>> = match QdrantCacheStore::connect(
            &settings.qdrant_url,
            settings.qdrant_api_key.as_deref(),
            CACHE_COLLECTION,
            embedder.dimensions(),
        )
        .await
        {
            Ok(store) => Some(Arc::new(store)),
            Err(err) => {
                tracing::warn!("Vector index not reachable ({}). Caching disabled.", err);
                None
            }
        };
        let cache = Arc::new(SemanticCache::new(embedder.clone(), store));

        let tools = ToolRouter::new(
            http,
            settings.tavily_api_key.clone(),
            settings.webdriver_url.clone(),
        );

        let graph_runtime =
            Arc::new(build_agent_graph().map_err(|e| InitializationError::Graph(e.into()))?);

        Ok(Arc::new(AppState {
            paths,
            history,
            model,
            embedder,
            cache,
            tools,
            graph_runtime,
        }))
    }

    /// Network-free state over a scripted model and a throwaway database.
    #[cfg(test)]
    pub async fn for_tests(
        turns: Vec<crate::llm::Message>,
    ) -> (tempfile::TempDir, AppState) {
        let dir = tempfile::tempdir().expect("tempdir");
        let paths = AppPaths::for_dir(dir.path());
        let history = HistoryStore::new(paths.db_path.clone())
            .await
            .expect("history store");

        let model: Arc<dyn ChatModel> =
            Arc::new(crate::llm::test_support::ScriptedModel::new(turns));
        let embedder: Arc<dyn EmbeddingProvider> =
            Arc::new(crate::cache::tests::StubEmbedder::new(&[]));
        let cache = Arc::new(SemanticCache::new(embedder.clone(), None));
        let tools = ToolRouter::new(Client::new(), None, None);
        let graph_runtime = Arc::new(build_agent_graph().expect("agent graph"));

        let state = AppState {
            paths: Arc::new(paths),
            history,
            model,
            embedder,
            cache,
            tools,
            graph_runtime,
        };
        (dir, state)
    }
}
