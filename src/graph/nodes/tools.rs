// Tools Node
// Executes every tool call requested by the last assistant turn

use async_trait::async_trait;

use crate::graph::node::{GraphError, Node, NodeContext, NodeOutput};
use crate::graph::state::AgentState;
use crate::llm::Message;

pub struct ToolsNode;

impl ToolsNode {
    pub fn new() -> Self {
        Self
    }
}

impl Default for ToolsNode {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl Node for ToolsNode {
    fn id(&self) -> &'static str {
        "tools"
    }

    fn name(&self) -> &'static str {
        "Run Tools"
    }

    async fn execute(
        &self,
        state: &mut AgentState,
        ctx: &mut NodeContext<'_>,
    ) -> Result<NodeOutput, GraphError> {
        let calls = state.pending_tool_calls();
        if calls.is_empty() {
            return Err(GraphError::new(self.id(), "No pending tool calls"));
        }

        // Calls run in request order; one tool-result message per call.
        // Tool failures come back as text and the model sees them.
        for call in &calls {
            tracing::info!("Executing tool: {}", call.name);
            let output = ctx.tools.execute(&call.name, &call.args).await;
            state.messages.push(Message::tool_result(&call.name, output));
        }

        state.tool_rounds += 1;
        Ok(NodeOutput::Continue(None))
    }
}
