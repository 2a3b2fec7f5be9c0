pub mod search;
pub mod vector_math;

use reqwest::Client;
use serde_json::{json, Value};

use crate::scrape;

/// Closed set of tools the model may invoke by name.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ToolKind {
    WebSearch,
    ScrapeWebpage,
}

impl ToolKind {
    pub const ALL: [ToolKind; 2] = [ToolKind::WebSearch, ToolKind::ScrapeWebpage];

    pub fn name(&self) -> &'static str {
        match self {
            ToolKind::WebSearch => "web_search",
            ToolKind::ScrapeWebpage => "scrape_webpage",
        }
    }

    pub fn from_name(name: &str) -> Option<Self> {
        Self::ALL.iter().copied().find(|kind| kind.name() == name)
    }

    /// Function declaration in the model's wire format.
    pub fn declaration(&self) -> Value {
        match self {
            ToolKind::WebSearch => json!({
                "name": self.name(),
                "description": "Current events and general knowledge search engine. Use this for questions about news, facts, or recent info.",
                "parameters": {
                    "type": "object",
                    "properties": {
                        "query": {
                            "type": "string",
                            "description": "The search query"
                        }
                    },
                    "required": ["query"]
                }
            }),
            ToolKind::ScrapeWebpage => json!({
                "name": self.name(),
                "description": "Scrapes the content of a specific webpage URL. Handles dynamic JS sites.",
                "parameters": {
                    "type": "object",
                    "properties": {
                        "url": {
                            "type": "string",
                            "description": "The URL to read"
                        }
                    },
                    "required": ["url"]
                }
            }),
        }
    }
}

pub fn declarations() -> Vec<Value> {
    ToolKind::ALL.iter().map(|kind| kind.declaration()).collect()
}

/// Shared dependencies for tool execution, constructed once per process.
#[derive(Clone)]
pub struct ToolRouter {
    http: Client,
    tavily_api_key: Option<String>,
    webdriver_url: Option<String>,
}

impl ToolRouter {
    pub fn new(http: Client, tavily_api_key: Option<String>, webdriver_url: Option<String>) -> Self {
        Self {
            http,
            tavily_api_key,
            webdriver_url,
        }
    }

    pub fn http(&self) -> &Client {
        &self.http
    }

    pub fn webdriver_url(&self) -> Option<&str> {
        self.webdriver_url.as_deref()
    }

    /// Execute a named tool call. The result is always text destined for
    /// the model's context — failures come back as descriptive strings,
    /// never as errors.
    pub async fn execute(&self, name: &str, args: &Value) -> String {
        match ToolKind::from_name(name) {
            Some(ToolKind::WebSearch) => {
                let query = args
                    .get("query")
                    .or_else(|| args.get("q"))
                    .and_then(|v| v.as_str())
                    .unwrap_or("")
                    .trim();
                if query.is_empty() {
                    return "Error: search query missing.".to_string();
                }
                search::run(&self.http, self.tavily_api_key.as_deref(), query).await
            }
            Some(ToolKind::ScrapeWebpage) => {
                let url = args
                    .get("url")
                    .or_else(|| args.get("link"))
                    .and_then(|v| v.as_str())
                    .unwrap_or("")
                    .trim();
                if url.is_empty() {
                    return "Error: URL missing.".to_string();
                }
                scrape::scrape_url(&self.http, self.webdriver_url.as_deref(), url)
                    .await
                    .render()
            }
            None => format!("Unknown tool: {}", name),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn tool_names_roundtrip() {
        for kind in ToolKind::ALL {
            assert_eq!(ToolKind::from_name(kind.name()), Some(kind));
        }
        assert_eq!(ToolKind::from_name("nonexistent"), None);
    }

    #[test]
    fn declarations_cover_every_tool() {
        let decls = declarations();
        assert_eq!(decls.len(), ToolKind::ALL.len());
        assert_eq!(decls[0]["name"], "web_search");
        assert_eq!(decls[1]["name"], "scrape_webpage");
        assert_eq!(decls[0]["parameters"]["required"][0], "query");
    }

    #[tokio::test]
    async fn unknown_tool_returns_error_text() {
        let router = ToolRouter::new(Client::new(), None, None);
        let out = router.execute("make_coffee", &json!({})).await;
        assert_eq!(out, "Unknown tool: make_coffee");
    }

    #[tokio::test]
    async fn search_without_key_degrades_to_error_string() {
        let router = ToolRouter::new(Client::new(), None, None);
        let out = router.execute("web_search", &json!({"query": "rust"})).await;
        assert!(out.contains("TAVILY_API_KEY"));
    }

    #[tokio::test]
    async fn missing_arguments_are_reported_inline() {
        let router = ToolRouter::new(Client::new(), None, None);
        let out = router.execute("web_search", &json!({})).await;
        assert_eq!(out, "Error: search query missing.");
        let out = router.execute("scrape_webpage", &json!({})).await;
        assert_eq!(out, "Error: URL missing.");
    }
}
