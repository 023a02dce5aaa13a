//! Export-time materialization of terminal tools as graph nodes.
//!
//! The canonical shape models ending and transferring a call as tools. Some
//! vendors instead require dedicated end and transfer nodes; before export
//! to those vendors, [`synthesize_terminal_nodes`] manufactures the missing
//! nodes and wires edges into them from every node whose prompt names the tool.

use super::dedup::terminal_tools;
use crate::graph::{
    Condition, Graph, Node, NodeKind, SYNTHESIZED_FROM_KEY, TRANSFER_FAILED, Tool, ToolKind,
    Transition,
};
use regex::Regex;
use tracing::{debug, warn};

/// Metadata key shared by transfer tools and transfer nodes naming where the call goes.
pub const TRANSFER_DESTINATION_KEY: &str = "transfer_destination";

#[derive(Debug, Clone, Copy, Default)]
pub struct SynthesisOptions {
    /// Give every transfer node an explicit "transfer failed" edge.
    pub failure_edges: bool,
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SynthesisSummary {
    pub created: Vec<String>,
    pub edges_added: usize,
}

/// Materializes end/transfer nodes for the graph's terminal tools.
///
/// Idempotent: a second run finds every node already present and every edge
/// already wired, and changes nothing.
pub fn synthesize_terminal_nodes(graph: &mut Graph, options: SynthesisOptions) -> SynthesisSummary {
    let mut summary = SynthesisSummary::default();

    // End nodes first, so transfer failure edges have a target.
    let mut tools = terminal_tools(graph);
    tools.sort_by_key(|t| t.kind != ToolKind::EndCall);

    for tool in &tools {
        let kind = match tool.kind {
            ToolKind::EndCall => NodeKind::End,
            _ => NodeKind::Transfer,
        };

        let node_id = match find_terminal_node(graph, &kind, tool) {
            Some(id) => id,
            None => {
                let node = terminal_node(graph, tool, kind.clone());
                let id = node.id.clone();
                if let Err(e) = graph.push_node(node) {
                    warn!(tool = %tool.name, error = %e, "could not add synthesized node");
                    continue;
                }
                debug!(tool = %tool.name, node = %id, "synthesized terminal node");
                summary.created.push(id.clone());
                id
            }
        };

        summary.edges_added += wire_mentions(graph, tool, &node_id);

        if kind == NodeKind::Transfer && options.failure_edges {
            summary.edges_added += wire_failure_edge(graph, &node_id);
        }
    }

    summary
}

fn find_terminal_node(graph: &Graph, kind: &NodeKind, tool: &Tool) -> Option<String> {
    let by_tool = graph.nodes().iter().find(|n| {
        &n.kind() == kind && n.metadata_str(SYNTHESIZED_FROM_KEY) == Some(tool.name.as_str())
    });
    by_tool
        .or_else(|| match kind {
            // Any end node will do; transfers differ by destination.
            NodeKind::End => graph.nodes().iter().find(|n| n.kind() == NodeKind::End),
            _ => {
                let destination = tool.metadata.get(TRANSFER_DESTINATION_KEY)?;
                graph.nodes().iter().find(|n| {
                    n.kind() == NodeKind::Transfer
                        && n.metadata.get(TRANSFER_DESTINATION_KEY) == Some(destination)
                })
            }
        })
        .map(|n| n.id.clone())
}

fn terminal_node(graph: &Graph, tool: &Tool, kind: NodeKind) -> Node {
    let prompt = if tool.description.trim().is_empty() {
        match kind {
            NodeKind::End => "Thank the caller and end the call politely.".to_string(),
            _ => "Let the caller know they are being transferred.".to_string(),
        }
    } else {
        tool.description.clone()
    };

    let mut node = Node::new(graph.unused_node_id(&tool.name), prompt).with_kind(kind);
    for (key, value) in &tool.metadata {
        node.metadata.entry(key.clone()).or_insert_with(|| value.clone());
    }
    node.metadata
        .insert(SYNTHESIZED_FROM_KEY.to_string(), tool.name.clone().into());
    node
}

fn condition_for(tool: &Tool) -> Condition {
    match tool.kind {
        ToolKind::EndCall => {
            Condition::prompt("The conversation is complete and the call should end")
        }
        _ if tool.description.trim().is_empty() => {
            Condition::prompt("The caller needs to be transferred to another party")
        }
        _ => Condition::prompt(format!(
            "The caller needs to be transferred: {}",
            tool.description.trim()
        )),
    }
}

/// Adds an edge to `target` from every node whose prompt names the tool as a whole word.
fn wire_mentions(graph: &mut Graph, tool: &Tool, target: &str) -> usize {
    let Ok(pattern) = Regex::new(&format!(r"\b{}\b", regex::escape(&tool.name))) else {
        return 0;
    };
    let condition = condition_for(tool);

    let mut added = 0;
    for node in graph.nodes_mut() {
        if node.id == target || node.kind().is_terminal() || node.has_transition_to(target) {
            continue;
        }
        if pattern.is_match(&node.prompt) {
            node.transitions
                .push(Transition::new(target, condition.clone()));
            added += 1;
        }
    }
    added
}

fn wire_failure_edge(graph: &mut Graph, transfer_id: &str) -> usize {
    let fallback = graph
        .nodes()
        .iter()
        .find(|n| n.kind() == NodeKind::End)
        .map(|n| n.id.clone())
        .unwrap_or_else(|| graph.entry_node_id().to_string());

    let Some(node) = graph.node_mut(transfer_id) else {
        return 0;
    };
    if node.transitions.iter().any(Transition::is_transfer_failure) {
        return 0;
    }
    node.transitions.push(
        Transition::new(fallback, Condition::prompt("Transfer failed"))
            .with_description(TRANSFER_FAILED),
    );
    1
}
