use std::sync::Arc;

use axum::extract::{Path, State};
use axum::response::IntoResponse;
use axum::Json;
use serde_json::{json, Value};

use crate::llm::Role;
use crate::state::AppState;

/// Up to 5 most recent session ids, string-sorted descending. Storage
/// failures come back as an empty listing plus an error field rather than a
/// protocol failure.
pub async fn list_sessions(State(state): State<Arc<AppState>>) -> impl IntoResponse {
    match state.history.list_recent_sessions(5).await {
        Ok(sessions) => Json(json!({ "sessions": sessions })),
        Err(err) => Json(json!({ "sessions": [], "error": err.to_string() })),
    }
}

/// Message history for one session as role/content pairs. Tool and system
/// messages are omitted from the view.
pub async fn get_history(
    State(state): State<Arc<AppState>>,
    Path(session_id): Path<String>,
) -> impl IntoResponse {
    match state.history.get_messages(&session_id).await {
        Ok(messages) => {
            let history: Vec<Value> = messages
                .iter()
                .filter_map(|message| {
                    let role = match message.role {
                        Role::Assistant => "assistant",
                        Role::User => "user",
                        Role::Tool | Role::System => return None,
                    };
                    Some(json!({ "role": role, "content": message.text() }))
                })
                .collect();
            Json(json!({ "history": history }))
        }
        Err(err) => Json(json!({ "history": [], "error": err.to_string() })),
    }
}
