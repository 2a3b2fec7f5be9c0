use reqwest::Client;
use serde_json::{json, Value};

use crate::core::errors::ApiError;

const TAVILY_ENDPOINT: &str = "https://api.tavily.com/search";

/// Web search via the Tavily API, formatted as a plain-text digest.
///
/// A missing API key or any transport failure degrades to a descriptive
/// string; there are no retries.
pub async fn run(http: &Client, api_key: Option<&str>, query: &str) -> String {
    let Some(api_key) = api_key else {
        return "Error: TAVILY_API_KEY is not configured.".to_string();
    };

    match tavily_search(http, api_key, query).await {
        Ok(digest) => digest,
        Err(err) => format!("Search failed: {}", err),
    }
}

async fn tavily_search(http: &Client, api_key: &str, query: &str) -> Result<String, ApiError> {
    let body = json!({
        "query": query,
        "search_depth": "advanced",
        "include_answer": true,
        "max_results": 5,
    });

    let response = http
        .post(TAVILY_ENDPOINT)
        .header(
            reqwest::header::AUTHORIZATION,
            format!("Bearer {}", api_key),
        )
        .json(&body)
        .send()
        .await
        .map_err(ApiError::internal)?;

    if !response.status().is_success() {
        return Err(ApiError::Internal(format!(
            "Tavily search failed: {}",
            response.status()
        )));
    }

    let payload: Value = response.json().await.map_err(ApiError::internal)?;
    Ok(format_digest(&payload))
}

/// Synthesized answer first (when present), then each ranked result as a
/// title/URL/snippet block, blank-line separated.
fn format_digest(payload: &Value) -> String {
    let mut sections = Vec::new();

    if let Some(answer) = payload.get("answer").and_then(|v| v.as_str()) {
        if !answer.is_empty() {
            sections.push(format!("AI Answer: {}", answer));
        }
    }

    if let Some(results) = payload.get("results").and_then(|v| v.as_array()) {
        for result in results {
            let title = result.get("title").and_then(|v| v.as_str()).unwrap_or("");
            let url = result.get("url").and_then(|v| v.as_str()).unwrap_or("");
            let snippet = result
                .get("content")
                .and_then(|v| v.as_str())
                .unwrap_or("");
            if title.is_empty() && url.is_empty() {
                continue;
            }
            sections.push(format!("Source: {}\nURL: {}\nSnippet: {}", title, url, snippet));
        }
    }

    if sections.is_empty() {
        "No search results found.".to_string()
    } else {
        sections.join("\n\n")
    }
}
