use async_trait::async_trait;
use serde_json::Value;

use super::types::Message;
use crate::core::errors::ApiError;

/// Chat-completion backend with native tool calling.
///
/// `tools` is a list of function declarations in the provider's wire
/// format; implementations return one assistant message which may carry
/// tool-call requests instead of (or alongside) text.
#[async_trait]
pub trait ChatModel: Send + Sync {
    async fn generate(
        &self,
        system: &str,
        messages: &[Message],
        tools: &[Value],
    ) -> Result<Message, ApiError>;
}

/// Text embedding backend.
#[async_trait]
pub trait EmbeddingProvider: Send + Sync {
    async fn embed(&self, text: &str) -> Result<Vec<f32>, ApiError>;

    /// Dimensionality of the produced vectors.
    fn dimensions(&self) -> usize;
}
