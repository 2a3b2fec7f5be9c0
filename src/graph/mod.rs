// Graph Module
// StateGraph-style agent loop: respond ⇄ run-tools

pub mod builder;
pub mod node;
pub mod runtime;
pub mod state;

pub mod nodes;

pub use builder::build_agent_graph;
pub use node::{GraphError, Node, NodeContext, NodeOutput};
pub use runtime::GraphRuntime;
pub use state::AgentState;

use crate::llm::{ChatModel, Message};
use crate::tools::ToolRouter;

/// Run the agent loop over a conversation, returning the final state.
///
/// `messages` is the prior session history plus the new user message; the
/// returned state carries everything appended during the run.
pub async fn run_agent(
    runtime: &GraphRuntime,
    model: &dyn ChatModel,
    tools: &ToolRouter,
    session_id: &str,
    messages: Vec<Message>,
) -> Result<AgentState, GraphError> {
    let mut state = AgentState::new(session_id.to_string(), messages);
    let mut ctx = NodeContext { model, tools };
    runtime.run(&mut state, &mut ctx).await?;
    Ok(state)
}

#[cfg(test)]
mod tests {
    use super::nodes::respond::{GIVE_UP_ANSWER, MAX_TOOL_ROUNDS, SYSTEM_PROMPT};
    use super::*;
    use crate::core::errors::ApiError;
    use crate::llm::test_support::ScriptedModel;
    use crate::llm::{Role, ToolCall};
    use async_trait::async_trait;
    use serde_json::{json, Value};

    /// A model that requests a tool call on every turn.
    struct AlwaysToolModel;

    #[async_trait]
    impl ChatModel for AlwaysToolModel {
        async fn generate(
            &self,
            _system: &str,
            _messages: &[Message],
            _tools: &[Value],
        ) -> Result<Message, ApiError> {
            let mut turn = Message::assistant_text("");
            turn.tool_calls.push(ToolCall {
                name: "web_search".to_string(),
                args: json!({"query": "again"}),
            });
            Ok(turn)
        }
    }

    fn router() -> ToolRouter {
        // No API keys, no webdriver: tool results degrade to error strings
        // without touching the network.
        ToolRouter::new(reqwest::Client::new(), None, None)
    }

    fn tool_call_turn(name: &str, args: Value) -> Message {
        let mut turn = Message::assistant_text("");
        turn.tool_calls.push(ToolCall {
            name: name.to_string(),
            args,
        });
        turn
    }

    #[tokio::test]
    async fn terminates_after_one_respond_when_no_tools_requested() {
        let model = ScriptedModel::new(vec![Message::assistant_text("4")]);
        let runtime = build_agent_graph().unwrap();

        let input = vec![Message::user_text("what is 2+2")];
        let state = run_agent(&runtime, &model, &router(), "s1", input.clone())
            .await
            .unwrap();

        assert_eq!(state.messages.len(), input.len() + 1);
        assert_eq!(state.output.as_deref(), Some("4"));
        assert_eq!(state.tool_rounds, 0);

        // The fixed instruction is re-prepended on every call.
        let seen = model.seen_system.lock().unwrap();
        assert_eq!(seen.len(), 1);
        assert!(seen[0].contains("scrape_webpage"));
    }

    #[tokio::test]
    async fn single_tool_call_appends_exactly_one_tool_message() {
        let model = ScriptedModel::new(vec![
            tool_call_turn("web_search", json!({"query": "latest rust release"})),
            Message::assistant_text("Rust 1.80 is out."),
        ]);
        let runtime = build_agent_graph().unwrap();

        let state = run_agent(
            &runtime,
            &model,
            &router(),
            "s1",
            vec![Message::user_text("what is the latest rust release?")],
        )
        .await
        .unwrap();

        // user, assistant(tool call), tool result, assistant answer
        assert_eq!(state.messages.len(), 4);
        assert_eq!(state.messages[1].role, Role::Assistant);
        assert!(state.messages[1].requests_tools());
        assert_eq!(state.messages[2].role, Role::Tool);
        assert_eq!(state.messages[3].role, Role::Assistant);
        assert_eq!(state.tool_rounds, 1);
        assert_eq!(state.output.as_deref(), Some("Rust 1.80 is out."));
    }

    #[tokio::test]
    async fn tool_calls_run_in_request_order() {
        let mut multi = Message::assistant_text("");
        multi.tool_calls.push(ToolCall {
            name: "web_search".to_string(),
            args: json!({"query": "a"}),
        });
        multi.tool_calls.push(ToolCall {
            name: "scrape_webpage".to_string(),
            args: json!({}),
        });

        let model = ScriptedModel::new(vec![multi, Message::assistant_text("done")]);
        let runtime = build_agent_graph().unwrap();

        let state = run_agent(
            &runtime,
            &model,
            &router(),
            "s1",
            vec![Message::user_text("go")],
        )
        .await
        .unwrap();

        let tool_messages: Vec<_> = state
            .messages
            .iter()
            .filter(|m| m.role == Role::Tool)
            .collect();
        assert_eq!(tool_messages.len(), 2);
        assert!(tool_messages[0].text().contains("TAVILY_API_KEY"));
        assert_eq!(tool_messages[1].text(), "Error: URL missing.");
    }

    #[tokio::test]
    async fn perpetual_tool_requests_hit_the_round_cap() {
        let runtime = build_agent_graph().unwrap();
        let state = run_agent(
            &runtime,
            &AlwaysToolModel,
            &router(),
            "s1",
            vec![Message::user_text("loop forever")],
        )
        .await
        .unwrap();

        assert_eq!(state.tool_rounds, MAX_TOOL_ROUNDS);
        assert_eq!(state.output.as_deref(), Some(GIVE_UP_ANSWER));
        assert_eq!(
            state.last_message().unwrap().text(),
            GIVE_UP_ANSWER.to_string()
        );
    }

    #[test]
    fn system_prompt_mandates_scraping_user_urls() {
        assert!(SYSTEM_PROMPT.contains("MUST use the `scrape_webpage` tool"));
        assert!(SYSTEM_PROMPT.contains("```graphviz"));
    }
}
