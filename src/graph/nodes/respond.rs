// Respond Node
// One model turn: answer directly or request tool calls

use async_trait::async_trait;

use crate::graph::node::{GraphError, Node, NodeContext, NodeOutput};
use crate::graph::state::AgentState;
use crate::llm::Message;
use crate::tools;

/// Maximum respond→tools transitions in one run. Past this, the loop stops
/// asking for tools and answers with [`GIVE_UP_ANSWER`] instead of running
/// unboundedly.
pub const MAX_TOOL_ROUNDS: usize = 8;

pub const GIVE_UP_ANSWER: &str = "I could not complete this request: the allowed number of tool \
calls for a single question was used up before the answer converged. Please narrow the question \
or try again.";

/// Fixed instruction prepended on every model call.
pub const SYSTEM_PROMPT: &str = r#"You are a helpful AI research assistant called 'Sibyl'.

CAPABILITIES:
1. You have access to a web search tool (`web_search`) and a webpage scraper (`scrape_webpage`).
2. You can read PDFs, TXTs, and CSVs provided by the user.
3. If you see an image or a scanned PDF, you can understand it visually.

IMPORTANT:
- If the user provides a URL in the chat (e.g. "read https://..."), YOU MUST use the `scrape_webpage` tool to read it. Do not just make up the content.
- Web sources under "Processed Web Sources" are already in your context; do not scrape them again.

VISUALIZATION RULES:
If the user asks for a "workflow", "diagram", "process flow", or an image for understanding:
1. You MUST generate a Graphviz DOT code block.
2. Enclose the code in ```graphviz ... ```.
3. Use 'digraph G { ... }' syntax, with 'rankdir=LR' or 'TB' and clear node shapes (box, oval).

Example:
```graphviz
digraph G {
  rankdir=LR;
  node [shape=box, style=filled, fillcolor=lightblue];
  Start -> Process -> End;
}
```
"#;

pub struct RespondNode;

impl RespondNode {
    pub fn new() -> Self {
        Self
    }
}

impl Default for RespondNode {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl Node for RespondNode {
    fn id(&self) -> &'static str {
        "respond"
    }

    fn name(&self) -> &'static str {
        "Respond"
    }

    async fn execute(
        &self,
        state: &mut AgentState,
        ctx: &mut NodeContext<'_>,
    ) -> Result<NodeOutput, GraphError> {
        let turn = ctx
            .model
            .generate(SYSTEM_PROMPT, &state.messages, &tools::declarations())
            .await
            .map_err(|e| GraphError::new(self.id(), format!("Model call failed: {e}")))?;

        if turn.requests_tools() {
            if state.tool_rounds >= MAX_TOOL_ROUNDS {
                tracing::warn!(
                    "Tool round cap ({}) reached for session {}; giving up",
                    MAX_TOOL_ROUNDS,
                    state.session_id
                );
                state.messages.push(Message::assistant_text(GIVE_UP_ANSWER));
                state.output = Some(GIVE_UP_ANSWER.to_string());
                return Ok(NodeOutput::Final);
            }

            state.messages.push(turn);
            return Ok(NodeOutput::Branch("tools".to_string()));
        }

        let answer = turn.text();
        state.messages.push(turn);
        state.output = Some(answer);
        Ok(NodeOutput::Final)
    }
}
