use async_trait::async_trait;
use reqwest::Client;
use serde_json::{json, Value};

use super::provider::{ChatModel, EmbeddingProvider};
use super::types::{Message, Part, Role, TokenUsage, ToolCall};
use crate::core::errors::ApiError;

const DEFAULT_BASE_URL: &str = "https://generativelanguage.googleapis.com/v1beta";

/// Dimensionality of `text-embedding-004` vectors.
const EMBEDDING_DIMENSIONS: usize = 768;

/// Gemini REST client (`generateContent` / `embedContent`).
#[derive(Clone)]
pub struct GeminiClient {
    client: Client,
    base_url: String,
    api_key: String,
    model: String,
    embedding_model: String,
}

impl GeminiClient {
    pub fn new(client: Client, api_key: String, model: String, embedding_model: String) -> Self {
        Self {
            client,
            base_url: DEFAULT_BASE_URL.to_string(),
            api_key,
            model,
            embedding_model,
        }
    }

    fn endpoint(&self, model: &str, method: &str) -> String {
        format!(
            "{}/models/{}:{}?key={}",
            self.base_url, model, method, self.api_key
        )
    }

    /// Map conversation messages onto the Gemini `contents` array.
    ///
    /// Assistant turns become `model` contents (text parts plus any
    /// `functionCall` parts); tool turns are sent back as `user` contents
    /// holding `functionResponse` parts, which is how the API expects tool
    /// results to be threaded.
    fn build_contents(messages: &[Message]) -> Vec<Value> {
        let mut contents = Vec::with_capacity(messages.len());
        for message in messages {
            let mut parts = Vec::new();
            for part in &message.parts {
                match part {
                    Part::Text { text } => parts.push(json!({ "text": text })),
                    Part::InlineData { mime_type, data } => parts.push(json!({
                        "inlineData": { "mimeType": mime_type, "data": data }
                    })),
                    Part::ToolResult { name, content } => parts.push(json!({
                        "functionResponse": {
                            "name": name,
                            "response": { "content": content }
                        }
                    })),
                }
            }
            for call in &message.tool_calls {
                parts.push(json!({
                    "functionCall": { "name": call.name, "args": call.args }
                }));
            }
            if parts.is_empty() {
                continue;
            }

            let role = match message.role {
                Role::Assistant => "model",
                // System text travels via systemInstruction, not contents.
                Role::System => continue,
                Role::User | Role::Tool => "user",
            };
            contents.push(json!({ "role": role, "parts": parts }));
        }
        contents
    }

    fn parse_assistant_turn(payload: &Value) -> Message {
        let mut parts = Vec::new();
        let mut tool_calls = Vec::new();

        if let Some(candidate_parts) = payload
            .get("candidates")
            .and_then(|v| v.get(0))
            .and_then(|v| v.get("content"))
            .and_then(|v| v.get("parts"))
            .and_then(|v| v.as_array())
        {
            for part in candidate_parts {
                if let Some(text) = part.get("text").and_then(|v| v.as_str()) {
                    parts.push(Part::Text {
                        text: text.to_string(),
                    });
                }
                if let Some(call) = part.get("functionCall") {
                    let name = call
                        .get("name")
                        .and_then(|v| v.as_str())
                        .unwrap_or_default()
                        .to_string();
                    let args = call
                        .get("args")
                        .cloned()
                        .unwrap_or_else(|| Value::Object(serde_json::Map::new()));
                    if !name.is_empty() {
                        tool_calls.push(ToolCall { name, args });
                    }
                }
            }
        }

        let usage = payload
            .get("usageMetadata")
            .and_then(|v| v.get("totalTokenCount"))
            .and_then(|v| v.as_u64())
            .map(|total_tokens| TokenUsage { total_tokens });

        Message {
            role: Role::Assistant,
            parts,
            tool_calls,
            usage,
        }
    }
}

#[async_trait]
impl ChatModel for GeminiClient {
    async fn generate(
        &self,
        system: &str,
        messages: &[Message],
        tools: &[Value],
    ) -> Result<Message, ApiError> {
        let url = self.endpoint(&self.model, "generateContent");

        let mut body = json!({
            "systemInstruction": { "parts": [{ "text": system }] },
            "contents": Self::build_contents(messages),
            "generationConfig": { "temperature": 0.0 },
        });
        if !tools.is_empty() {
            if let Some(obj) = body.as_object_mut() {
                obj.insert(
                    "tools".to_string(),
                    json!([{ "functionDeclarations": tools }]),
                );
            }
        }

        let res = self
            .client
            .post(&url)
            .json(&body)
            .send()
            .await
            .map_err(ApiError::internal)?;

        if !res.status().is_success() {
            let status = res.status();
            let text = res.text().await.unwrap_or_default();
            return Err(ApiError::Internal(format!(
                "Gemini generateContent error ({}): {}",
                status, text
            )));
        }

        let payload: Value = res.json().await.map_err(ApiError::internal)?;
        Ok(Self::parse_assistant_turn(&payload))
    }
}

#[async_trait]
impl EmbeddingProvider for GeminiClient {
    async fn embed(&self, text: &str) -> Result<Vec<f32>, ApiError> {
        let url = self.endpoint(&self.embedding_model, "embedContent");

        let body = json!({
            "model": format!("models/{}", self.embedding_model),
            "content": { "parts": [{ "text": text }] },
        });

        let res = self
            .client
            .post(&url)
            .json(&body)
            .send()
            .await
            .map_err(ApiError::internal)?;

        if !res.status().is_success() {
            let status = res.status();
            let text = res.text().await.unwrap_or_default();
            return Err(ApiError::Internal(format!(
                "Gemini embedContent error ({}): {}",
                status, text
            )));
        }

        let payload: Value = res.json().await.map_err(ApiError::internal)?;
        let values = payload
            .get("embedding")
            .and_then(|v| v.get("values"))
            .and_then(|v| v.as_array())
            .ok_or_else(|| ApiError::Internal("Gemini embedding response missing values".into()))?;

        Ok(values
            .iter()
            .filter_map(|v| v.as_f64().map(|f| f as f32))
            .collect())
    }

    fn dimensions(&self) -> usize {
        EMBEDDING_DIMENSIONS
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_text_and_function_call_parts() {
        let payload = json!({
            "candidates": [{
                "content": {
                    "role": "model",
                    "parts": [
                        { "text": "Let me check." },
                        { "functionCall": { "name": "web_search", "args": { "query": "rust" } } }
                    ]
                },
                "finishReason": "STOP"
            }],
            "usageMetadata": { "totalTokenCount": 17 }
        });

        let turn = GeminiClient::parse_assistant_turn(&payload);
        assert_eq!(turn.role, Role::Assistant);
        assert_eq!(turn.text(), "Let me check.");
        assert_eq!(turn.tool_calls.len(), 1);
        assert_eq!(turn.tool_calls[0].name, "web_search");
        assert_eq!(turn.tool_calls[0].args["query"], "rust");
        assert_eq!(turn.usage.unwrap().total_tokens, 17);
    }

    #[test]
    fn parses_empty_candidates_to_empty_turn() {
        let turn = GeminiClient::parse_assistant_turn(&json!({ "candidates": [] }));
        assert!(turn.parts.is_empty());
        assert!(turn.tool_calls.is_empty());
        assert!(turn.usage.is_none());
    }

    #[test]
    fn contents_thread_tool_results_as_function_responses() {
        let messages = vec![
            Message::user_text("read https://example.com"),
            {
                let mut m = Message::new(Role::Assistant, Vec::new());
                m.tool_calls.push(ToolCall {
                    name: "scrape_webpage".to_string(),
                    args: json!({ "url": "https://example.com" }),
                });
                m
            },
            Message::tool_result("scrape_webpage", "Example Domain"),
        ];

        let contents = GeminiClient::build_contents(&messages);
        assert_eq!(contents.len(), 3);
        assert_eq!(contents[0]["role"], "user");
        assert_eq!(contents[1]["role"], "model");
        assert_eq!(
            contents[1]["parts"][0]["functionCall"]["name"],
            "scrape_webpage"
        );
        assert_eq!(contents[2]["role"], "user");
        assert_eq!(
            contents[2]["parts"][0]["functionResponse"]["response"]["content"],
            "Example Domain"
        );
    }

    #[test]
    fn system_messages_are_excluded_from_contents() {
        let messages = vec![
            Message::new(
                Role::System,
                vec![Part::Text {
                    text: "be helpful".to_string(),
                }],
            ),
            Message::user_text("hi"),
        ];
        let contents = GeminiClient::build_contents(&messages);
        assert_eq!(contents.len(), 1);
        assert_eq!(contents[0]["role"], "user");
    }
}
