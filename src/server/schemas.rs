use serde::Serialize;

/// One cited input or tool result.
#[derive(Debug, Clone, Serialize)]
pub struct Source {
    pub title: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub url: Option<String>,
    pub content_snippet: String,
    pub score: f64,
}

#[derive(Debug, Clone, Serialize)]
pub struct Metrics {
    /// Wall-clock latency in seconds.
    pub latency: f64,
    pub tokens_used: u64,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub grounding_score: Option<f64>,
}

#[derive(Debug, Serialize)]
pub struct QueryResponse {
    pub answer: String,
    pub sources: Vec<Source>,
    pub metrics: Metrics,
    pub trace_id: String,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn response_serializes_expected_shape() {
        let response = QueryResponse {
            answer: "4".to_string(),
            sources: vec![Source {
                title: "Web: https://example.com".to_string(),
                url: Some("https://example.com".to_string()),
                content_snippet: "Provided by user".to_string(),
                score: 1.0,
            }],
            metrics: Metrics {
                latency: 0.5,
                tokens_used: 12,
                grounding_score: None,
            },
            trace_id: "default_session".to_string(),
        };

        let json = serde_json::to_value(&response).unwrap();
        assert_eq!(json["answer"], "4");
        assert_eq!(json["sources"][0]["score"], 1.0);
        assert_eq!(json["metrics"]["tokens_used"], 12);
        // Absent grounding score is omitted, not null.
        assert!(json["metrics"].get("grounding_score").is_none());
        assert_eq!(json["trace_id"], "default_session");
    }
}
