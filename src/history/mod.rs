use std::path::PathBuf;

use sqlx::{sqlite::SqlitePoolOptions, Row, SqlitePool};

use crate::core::errors::ApiError;
use crate::llm::Message;

/// Per-session message checkpoint store.
///
/// Conversations are append-only: a session appears on its first message
/// and nothing is ever deleted by the system. The full message (parts,
/// tool calls, usage) is stored as JSON so the agent loop can resume a
/// session exactly where it left off.
#[derive(Clone)]
pub struct HistoryStore {
    pool: SqlitePool,
}

impl HistoryStore {
    pub async fn new(db_path: PathBuf) -> Result<Self, ApiError> {
        let conn_str = format!("sqlite://{}?mode=rwc", db_path.to_string_lossy());
        let pool = SqlitePoolOptions::new()
            .max_connections(5)
            .connect(&conn_str)
            .await
            .map_err(|e| ApiError::internal(format!("Failed to connect to history db: {}", e)))?;

        sqlx::query(
            "CREATE TABLE IF NOT EXISTS messages (
                id INTEGER PRIMARY KEY AUTOINCREMENT,
                session_id TEXT NOT NULL,
                role TEXT NOT NULL,
                payload JSON NOT NULL,
                created_at DATETIME DEFAULT CURRENT_TIMESTAMP
            )",
        )
        .execute(&pool)
        .await
        .map_err(|e| ApiError::internal(format!("Failed to init messages table: {}", e)))?;

        sqlx::query("CREATE INDEX IF NOT EXISTS idx_messages_session_id ON messages(session_id)")
            .execute(&pool)
            .await
            .map_err(|e| ApiError::internal(format!("Failed to create index: {}", e)))?;

        Ok(Self { pool })
    }

    pub async fn append_messages(
        &self,
        session_id: &str,
        messages: &[Message],
    ) -> Result<(), ApiError> {
        for message in messages {
            let payload = serde_json::to_string(message).map_err(ApiError::internal)?;
            let now = chrono::Utc::now().to_rfc3339();
            sqlx::query(
                "INSERT INTO messages (session_id, role, payload, created_at) VALUES (?, ?, ?, ?)",
            )
            .bind(session_id)
            .bind(message.role.as_str())
            .bind(payload)
            .bind(now)
            .execute(&self.pool)
            .await
            .map_err(|e| ApiError::internal(format!("Failed to append message: {}", e)))?;
        }
        Ok(())
    }

    /// Full message sequence for a session, oldest first.
    pub async fn get_messages(&self, session_id: &str) -> Result<Vec<Message>, ApiError> {
        let rows = sqlx::query("SELECT payload FROM messages WHERE session_id = ? ORDER BY id ASC")
            .bind(session_id)
            .fetch_all(&self.pool)
            .await
            .map_err(ApiError::internal)?;

        let mut messages = Vec::with_capacity(rows.len());
        for row in rows {
            let payload: String = row.try_get("payload").unwrap_or_default();
            match serde_json::from_str::<Message>(&payload) {
                Ok(message) => messages.push(message),
                Err(err) => {
                    tracing::warn!("Skipping unreadable history row: {}", err);
                }
            }
        }
        Ok(messages)
    }

    /// Most recent session ids, string-sorted descending.
    pub async fn list_recent_sessions(&self, limit: i64) -> Result<Vec<String>, ApiError> {
        let rows = sqlx::query(
            "SELECT DISTINCT session_id FROM messages ORDER BY session_id DESC LIMIT ?",
        )
        .bind(limit)
        .fetch_all(&self.pool)
        .await
        .map_err(ApiError::internal)?;

        Ok(rows
            .into_iter()
            .map(|row| row.try_get::<String, _>("session_id").unwrap_or_default())
            .collect())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::llm::{Role, ToolCall};

    async fn store() -> (tempfile::TempDir, HistoryStore) {
        let dir = tempfile::tempdir().expect("tempdir");
        let store = HistoryStore::new(dir.path().join("history.db"))
            .await
            .expect("store");
        (dir, store)
    }

    #[tokio::test]
    async fn messages_roundtrip_per_session() {
        let (_dir, store) = store().await;

        let mut assistant = Message::assistant_text("checking");
        assistant.tool_calls.push(ToolCall {
            name: "web_search".to_string(),
            args: serde_json::json!({"query": "weather"}),
        });

        store
            .append_messages(
                "session-a",
                &[
                    Message::user_text("what is the weather"),
                    assistant,
                    Message::tool_result("web_search", "sunny"),
                ],
            )
            .await
            .unwrap();
        store
            .append_messages("session-b", &[Message::user_text("other session")])
            .await
            .unwrap();

        let messages = store.get_messages("session-a").await.unwrap();
        assert_eq!(messages.len(), 3);
        assert_eq!(messages[0].role, Role::User);
        assert_eq!(messages[1].tool_calls.len(), 1);
        assert_eq!(messages[2].role, Role::Tool);
        assert_eq!(messages[2].text(), "sunny");

        assert_eq!(store.get_messages("session-b").await.unwrap().len(), 1);
        assert!(store.get_messages("missing").await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn recent_sessions_sorted_descending_and_capped() {
        let (_dir, store) = store().await;

        for session in ["s1", "s3", "s2", "s5", "s4", "s6"] {
            store
                .append_messages(session, &[Message::user_text("hi")])
                .await
                .unwrap();
        }

        let sessions = store.list_recent_sessions(5).await.unwrap();
        assert_eq!(sessions, vec!["s6", "s5", "s4", "s3", "s2"]);
    }
}
