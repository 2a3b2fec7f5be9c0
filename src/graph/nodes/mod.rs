// Graph Nodes Module
// Individual node implementations

pub mod respond;
pub mod tools;

pub use respond::RespondNode;
pub use tools::ToolsNode;
