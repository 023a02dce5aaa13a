use crate::graph::{Graph, Tool};
use ahash::AHashSet;
use itertools::Itertools;

/// Whether terminal tools (`end_call`, `transfer_call`) belong in a flat tool list.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TerminalPolicy {
    /// Tool-based vendors: terminal actions stay callable tools.
    Keep,
    /// Node-based vendors: terminal actions are represented by synthesized nodes.
    Exclude,
}

/// All tools of the graph, deduplicated by name in node order. First occurrence wins.
pub fn export_tools(graph: &Graph, policy: TerminalPolicy) -> Vec<Tool> {
    graph
        .nodes()
        .iter()
        .flat_map(|n| n.tools.iter())
        .filter(|t| policy == TerminalPolicy::Keep || !t.kind.is_terminal())
        .unique_by(|t| t.name.as_str())
        .cloned()
        .collect()
}

/// Distinct terminal tools of the graph, deduplicated by name.
pub fn terminal_tools(graph: &Graph) -> Vec<Tool> {
    graph
        .nodes()
        .iter()
        .flat_map(|n| n.tools.iter())
        .filter(|t| t.kind.is_terminal())
        .unique_by(|t| t.name.as_str())
        .cloned()
        .collect()
}

/// Names of tools attached to more than one node of the graph.
pub fn shared_tool_names(graph: &Graph) -> AHashSet<String> {
    graph
        .nodes()
        .iter()
        .flat_map(|n| n.tools.iter().map(|t| t.name.as_str()).unique())
        .counts()
        .into_iter()
        .filter(|(_, count)| *count > 1)
        .map(|(name, _)| name.to_string())
        .collect()
}

/// Removes repeated tool names within each node's own list, keeping the first.
pub(crate) fn dedup_node_tools(tools: Vec<Tool>) -> Vec<Tool> {
    tools.into_iter().unique_by(|t| t.name.clone()).collect()
}
