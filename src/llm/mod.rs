pub mod gemini;
pub mod provider;
#[cfg(test)]
pub(crate) mod test_support;
pub mod types;

pub use gemini::GeminiClient;
pub use provider::{ChatModel, EmbeddingProvider};
pub use types::{Message, Part, Role, TokenUsage, ToolCall};
