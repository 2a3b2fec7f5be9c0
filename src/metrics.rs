//! Per-response quality metrics.

use crate::llm::{EmbeddingProvider, Message};
use crate::tools::vector_math::cosine_similarity;

/// Head of the assembled context used for the grounding comparison.
const GROUNDING_CONTEXT_LIMIT: usize = 5_000;

/// Contexts at or below this size carry no grounding signal.
const MIN_CONTEXT_CHARS: usize = 50;

/// Total tokens from the most recent message carrying usage metadata,
/// falling back to a chars/4 estimate of the answer.
pub fn tokens_used(messages: &[Message], answer: &str) -> u64 {
    for message in messages.iter().rev() {
        if let Some(usage) = message.usage {
            return usage.total_tokens;
        }
    }
    (answer.chars().count() / 4) as u64
}

/// Cosine similarity between the answer embedding and the embedding of the
/// context head, clamped to [0, 1]. A rough faithfulness proxy, not a
/// chunked max-similarity RAG score.
pub async fn grounding_score(
    embedder: &dyn EmbeddingProvider,
    answer: &str,
    context: &str,
) -> Option<f64> {
    if context.chars().count() <= MIN_CONTEXT_CHARS {
        return None;
    }
    let snippet: String = context.chars().take(GROUNDING_CONTEXT_LIMIT).collect();

    let answer_embedding = match embedder.embed(answer).await {
        Ok(vector) => vector,
        Err(err) => {
            tracing::warn!("Grounding score calculation failed: {}", err);
            return None;
        }
    };
    let context_embedding = match embedder.embed(&snippet).await {
        Ok(vector) => vector,
        Err(err) => {
            tracing::warn!("Grounding score calculation failed: {}", err);
            return None;
        }
    };

    let score = cosine_similarity(&answer_embedding, &context_embedding) as f64;
    Some(score.clamp(0.0, 1.0))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::cache::tests::StubEmbedder;
    use crate::llm::TokenUsage;

    #[test]
    fn tokens_prefer_latest_usage_metadata() {
        let mut with_usage = Message::assistant_text("mid");
        with_usage.usage = Some(TokenUsage { total_tokens: 321 });

        let messages = vec![
            Message::user_text("hello"),
            with_usage,
            Message::tool_result("web_search", "digest"),
        ];
        assert_eq!(tokens_used(&messages, "whatever"), 321);
    }

    #[test]
    fn tokens_fall_back_to_char_estimate() {
        let messages = vec![Message::user_text("hello")];
        assert_eq!(tokens_used(&messages, "12345678"), 2);
    }

    #[tokio::test]
    async fn grounding_requires_a_real_context() {
        let embedder = StubEmbedder::new(&[]);
        assert_eq!(grounding_score(&embedder, "answer", "tiny").await, None);
    }

    #[tokio::test]
    async fn grounding_scores_similar_texts_high() {
        let context = "the capital of france is paris, a city on the seine ".repeat(3);
        let embedder = StubEmbedder::new(&[
            ("Paris is the capital of France.", &[1.0, 0.1, 0.0]),
            (context.trim_end(), &[0.98, 0.15, 0.05]),
        ]);

        // The stub only knows the first 5000 chars form; context is short
        // enough to pass through untruncated.
        let score = grounding_score(&embedder, "Paris is the capital of France.", context.trim_end())
            .await
            .expect("score");
        assert!(score > 0.9);
    }

    #[tokio::test]
    async fn grounding_degrades_to_none_on_embed_failure() {
        let embedder = StubEmbedder::new(&[]);
        let context = "x".repeat(100);
        assert_eq!(grounding_score(&embedder, "answer", &context).await, None);
    }
}
