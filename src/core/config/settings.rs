use std::env;

use anyhow::{bail, Result};

/// Runtime configuration, read once from the environment at startup.
///
/// Every subsystem degrades gracefully when its key is missing; only the
/// model API key is required for the process to start.
#[derive(Debug, Clone)]
pub struct Settings {
    pub gemini_api_key: String,
    pub gemini_model: String,
    pub gemini_embedding_model: String,
    pub qdrant_url: String,
    pub qdrant_api_key: Option<String>,
    pub tavily_api_key: Option<String>,
    pub webdriver_url: Option<String>,
    pub trace_enabled: bool,
    pub trace_api_key: Option<String>,
    pub port: u16,
}

impl Settings {
    pub fn from_env() -> Result<Self> {
        let Some(gemini_api_key) = env_nonempty("GEMINI_API_KEY") else {
            bail!("GEMINI_API_KEY is not set; the model client cannot start without it");
        };

        Ok(Settings {
            gemini_api_key,
            gemini_model: env_nonempty("GEMINI_MODEL")
                .unwrap_or_else(|| "gemini-2.0-flash".to_string()),
            gemini_embedding_model: env_nonempty("GEMINI_EMBEDDING_MODEL")
                .unwrap_or_else(|| "text-embedding-004".to_string()),
            qdrant_url: env_nonempty("QDRANT_URL")
                .unwrap_or_else(|| "http://localhost:6334".to_string()),
            qdrant_api_key: env_nonempty("QDRANT_API_KEY"),
            tavily_api_key: env_nonempty("TAVILY_API_KEY"),
            webdriver_url: env_nonempty("WEBDRIVER_URL"),
            trace_enabled: env_nonempty("SIBYL_TRACE")
                .map(|v| v.eq_ignore_ascii_case("true") || v == "1")
                .unwrap_or(false),
            trace_api_key: env_nonempty("SIBYL_TRACE_KEY"),
            port: env_nonempty("PORT")
                .and_then(|v| v.parse::<u16>().ok())
                .unwrap_or(8050),
        })
    }
}

fn env_nonempty(key: &str) -> Option<String> {
    env::var(key)
        .ok()
        .map(|v| v.trim().to_string())
        .filter(|v| !v.is_empty())
}
