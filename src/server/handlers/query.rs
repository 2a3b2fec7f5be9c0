use std::sync::Arc;
use std::time::Instant;

use axum::extract::{Multipart, State};
use axum::Json;

use crate::core::errors::ApiError;
use crate::graph;
use crate::ingest::{self, UploadedFile};
use crate::llm::{Message, Part, Role};
use crate::metrics;
use crate::server::schemas::{Metrics, QueryResponse, Source};
use crate::state::AppState;

const DEFAULT_SESSION_ID: &str = "default_session";

#[derive(Debug)]
pub struct QueryInput {
    pub query: String,
    pub session_id: String,
    pub urls: Vec<String>,
    pub files: Vec<UploadedFile>,
}

/// Main entry point: query + optional URLs and file uploads in, answer with
/// sources and metrics out.
pub async fn query(
    State(state): State<Arc<AppState>>,
    multipart: Multipart,
) -> Result<Json<QueryResponse>, ApiError> {
    let input = parse_multipart(multipart).await?;
    Ok(Json(run_query(&state, input).await))
}

async fn parse_multipart(mut multipart: Multipart) -> Result<QueryInput, ApiError> {
    let mut query: Option<String> = None;
    let mut session_id = DEFAULT_SESSION_ID.to_string();
    let mut urls = Vec::new();
    let mut files = Vec::new();

    while let Some(field) = multipart
        .next_field()
        .await
        .map_err(|e| ApiError::BadRequest(format!("invalid multipart body: {}", e)))?
    {
        match field.name().unwrap_or("") {
            "query" => {
                query = Some(field.text().await.map_err(ApiError::internal)?);
            }
            "session_id" => {
                let value = field.text().await.map_err(ApiError::internal)?;
                if !value.trim().is_empty() {
                    session_id = value.trim().to_string();
                }
            }
            "urls" => {
                let value = field.text().await.map_err(ApiError::internal)?;
                let value = value.trim();
                if !value.is_empty() {
                    urls.push(value.to_string());
                }
            }
            "files" => {
                let filename = field.file_name().unwrap_or("upload").to_string();
                let content_type = field
                    .content_type()
                    .unwrap_or("application/octet-stream")
                    .to_string();
                let bytes = field.bytes().await.map_err(ApiError::internal)?.to_vec();
                files.push(UploadedFile {
                    filename,
                    content_type,
                    bytes,
                });
            }
            _ => {}
        }
    }

    let query = query
        .map(|q| q.trim().to_string())
        .filter(|q| !q.is_empty())
        .ok_or_else(|| ApiError::BadRequest("query field is required".to_string()))?;

    Ok(QueryInput {
        query,
        session_id,
        urls,
        files,
    })
}

/// Run the full query pipeline. Every processing failure is converted into
/// an error-text answer with empty sources; the HTTP layer always sees a
/// well-formed response.
pub async fn run_query(state: &AppState, input: QueryInput) -> QueryResponse {
    let started = Instant::now();

    match process(state, &input).await {
        Ok(outcome) => {
            let grounding_score = metrics::grounding_score(
                state.embedder.as_ref(),
                &outcome.answer,
                &outcome.context_text,
            )
            .await;

            QueryResponse {
                answer: outcome.answer,
                sources: outcome.sources,
                metrics: Metrics {
                    latency: started.elapsed().as_secs_f64(),
                    tokens_used: outcome.tokens_used,
                    grounding_score,
                },
                trace_id: input.session_id,
            }
        }
        Err(err) => {
            tracing::error!("Query processing failed: {}", err);
            QueryResponse {
                answer: format!("Error processing request: {}", err),
                sources: Vec::new(),
                metrics: Metrics {
                    latency: started.elapsed().as_secs_f64(),
                    tokens_used: 0,
                    grounding_score: None,
                },
                trace_id: input.session_id,
            }
        }
    }
}

struct ProcessOutcome {
    answer: String,
    sources: Vec<Source>,
    tokens_used: u64,
    context_text: String,
}

async fn process(state: &AppState, input: &QueryInput) -> Result<ProcessOutcome, ApiError> {
    // 1. Semantic cache: a hit short-circuits the agent loop entirely.
    if let Some(answer) = state.cache.check(&input.query).await {
        tracing::info!("Semantic cache hit for session {}", input.session_id);
        let tokens_used = (answer.chars().count() / 4) as u64;
        return Ok(ProcessOutcome {
            answer,
            sources: Vec::new(),
            tokens_used,
            context_text: String::new(),
        });
    }

    // 2. Active ingestion: scrape user-supplied URLs into the context.
    let mut context_text = input.query.clone();
    if !input.urls.is_empty() {
        context_text.push_str(&ingest::fetch_url_context(&state.tools, &input.urls).await);
    }

    // 3. Uploaded files become additional message parts.
    let mut parts = vec![Part::Text {
        text: context_text.clone(),
    }];
    for file in &input.files {
        parts.extend(ingest::file_parts(file));
    }
    let user_message = Message::new(Role::User, parts);

    // 4. Run the agent loop on prior history plus the new message.
    let mut conversation = state.history.get_messages(&input.session_id).await?;
    let base_len = conversation.len();
    conversation.push(user_message);

    let agent_state = graph::run_agent(
        state.graph_runtime.as_ref(),
        state.model.as_ref(),
        &state.tools,
        &input.session_id,
        conversation,
    )
    .await?;

    // 5. Extract the answer, checkpoint the new messages, cache the pair.
    let answer = agent_state
        .output
        .clone()
        .or_else(|| agent_state.last_message().map(|m| m.text()))
        .unwrap_or_default();

    state
        .history
        .append_messages(&input.session_id, &agent_state.messages[base_len..])
        .await?;
    state.cache.add(&input.query, &answer).await;

    // 6. Sources: tool results plus user-supplied URLs and files.
    let mut sources = Vec::new();
    for message in &agent_state.messages[base_len..] {
        if message.role == Role::Tool {
            let snippet: String = message.text().chars().take(200).collect();
            sources.push(Source {
                title: "Agent Tool Result".to_string(),
                url: None,
                content_snippet: format!("{}...", snippet),
                score: 1.0,
            });
        }
    }
    for url in &input.urls {
        sources.push(Source {
            title: format!("Web: {}", url),
            url: Some(url.clone()),
            content_snippet: "Provided by user".to_string(),
            score: 1.0,
        });
    }
    for file in &input.files {
        sources.push(Source {
            title: format!("File: {}", file.filename),
            url: None,
            content_snippet: "Uploaded Document".to_string(),
            score: 1.0,
        });
    }

    let tokens_used = metrics::tokens_used(&agent_state.messages, &answer);

    Ok(ProcessOutcome {
        answer,
        sources,
        tokens_used,
        context_text,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::state::AppState;

    fn input(query: &str) -> QueryInput {
        QueryInput {
            query: query.to_string(),
            session_id: DEFAULT_SESSION_ID.to_string(),
            urls: Vec::new(),
            files: Vec::new(),
        }
    }

    #[tokio::test]
    async fn plain_question_returns_answer_with_no_sources() {
        let (_dir, state) = AppState::for_tests(vec![Message::assistant_text("4")]).await;

        let response = run_query(&state, input("what is 2+2")).await;
        assert_eq!(response.answer, "4");
        assert!(response.sources.is_empty());
        assert!(response.metrics.latency >= 0.0);
        assert_eq!(response.trace_id, DEFAULT_SESSION_ID);
    }

    #[tokio::test]
    async fn conversation_is_checkpointed_per_session() {
        let (_dir, state) = AppState::for_tests(vec![
            Message::assistant_text("first answer"),
            Message::assistant_text("second answer"),
        ])
        .await;

        run_query(&state, input("first question")).await;
        run_query(&state, input("second question")).await;

        let messages = state.history.get_messages(DEFAULT_SESSION_ID).await.unwrap();
        // user + assistant, twice.
        assert_eq!(messages.len(), 4);
        assert_eq!(messages[0].text(), "first question");
        assert_eq!(messages[3].text(), "second answer");
    }

    #[tokio::test]
    async fn uploaded_files_are_cited_as_sources() {
        let (_dir, state) = AppState::for_tests(vec![Message::assistant_text("summary")]).await;

        let mut query_input = input("summarize this");
        query_input.files.push(UploadedFile {
            filename: "notes.txt".to_string(),
            content_type: "text/plain".to_string(),
            bytes: b"some notes".to_vec(),
        });

        let response = run_query(&state, query_input).await;
        assert_eq!(response.sources.len(), 1);
        assert_eq!(response.sources[0].title, "File: notes.txt");
        assert_eq!(response.sources[0].score, 1.0);
    }

    #[tokio::test]
    async fn script_exhaustion_degrades_to_error_answer() {
        let (_dir, state) = AppState::for_tests(Vec::new()).await;

        let response = run_query(&state, input("anything")).await;
        assert!(response.answer.starts_with("Error processing request:"));
        assert!(response.sources.is_empty());
        assert_eq!(response.metrics.tokens_used, 0);
    }
}
