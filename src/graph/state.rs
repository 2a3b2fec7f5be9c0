// Graph State
// AgentState for the respond/run-tools StateGraph

use crate::llm::{Message, Role};

/// Main graph state: the conversation being extended by this run.
#[derive(Debug, Clone)]
pub struct AgentState {
    // Session identifier
    pub session_id: String,

    // Full message sequence: prior history plus this run's appends
    pub messages: Vec<Message>,

    // Completed run-tools transitions in this run
    pub tool_rounds: usize,

    // Final answer text
    pub output: Option<String>,
}

impl AgentState {
    pub fn new(session_id: String, messages: Vec<Message>) -> Self {
        Self {
            session_id,
            messages,
            tool_rounds: 0,
            output: None,
        }
    }

    pub fn last_message(&self) -> Option<&Message> {
        self.messages.last()
    }

    /// Tool calls requested by the most recent assistant turn.
    pub fn pending_tool_calls(&self) -> Vec<crate::llm::ToolCall> {
        match self.last_message() {
            Some(message) if message.role == Role::Assistant => message.tool_calls.clone(),
            _ => Vec::new(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::llm::ToolCall;

    #[test]
    fn agent_state_new_initializes_correctly() {
        let state = AgentState::new(
            "session-1".to_string(),
            vec![Message::user_text("test input")],
        );

        assert_eq!(state.session_id, "session-1");
        assert_eq!(state.messages.len(), 1);
        assert_eq!(state.tool_rounds, 0);
        assert!(state.output.is_none());
    }

    #[test]
    fn pending_tool_calls_come_from_last_assistant_turn() {
        let mut state = AgentState::new("s".to_string(), vec![Message::user_text("hi")]);
        assert!(state.pending_tool_calls().is_empty());

        let mut assistant = Message::assistant_text("");
        assistant.tool_calls.push(ToolCall {
            name: "web_search".to_string(),
            args: serde_json::json!({"query": "news"}),
        });
        state.messages.push(assistant);
        assert_eq!(state.pending_tool_calls().len(), 1);

        state.messages.push(Message::tool_result("web_search", "digest"));
        assert!(state.pending_tool_calls().is_empty());
    }
}
