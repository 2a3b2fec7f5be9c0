// Graph Builder
// Wires the respond/run-tools agent graph

use super::node::GraphError;
use super::nodes::{RespondNode, ToolsNode};
use super::runtime::{GraphBuilder, GraphRuntime};

/// Build the agent graph: `respond` answers or requests tools; `tools`
/// runs every requested call and hands control back to `respond`.
pub fn build_agent_graph() -> Result<GraphRuntime, GraphError> {
    GraphBuilder::new()
        .entry("respond")
        .max_steps(50)
        .node(Box::new(RespondNode::new()))
        .node(Box::new(ToolsNode::new()))
        // Conditional edge: only taken when respond requests tool calls
        .conditional_edge("respond", "tools", "tools")
        // Tool results always feed the next respond turn
        .edge("tools", "respond")
        .build()
}
