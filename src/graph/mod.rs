//! The canonical graph every transcoder imports into and exports from.

pub mod artifact;
pub mod builder;
pub mod definition;
pub mod validation;

pub use artifact::*;
pub use builder::*;
pub use definition::*;
pub use validation::*;

use crate::error::GraphError;
use crate::transcode::Format;
use ahash::AHashSet;
use serde::{Deserialize, Serialize};
use serde_json::Value;

/// A whole conversational agent: its states, the entry state, and the
/// vendor fields that had nowhere else to go.
///
/// The entry invariant (`entry_node_id` names an existing node) holds for
/// every value of this type, including deserialized ones. Transition targets
/// are *not* required to resolve; see [`Graph::dangling_targets`].
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(try_from = "GraphRepr")]
pub struct Graph {
    nodes: Vec<Node>,
    entry_node_id: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    source_format: Option<Format>,
    #[serde(default, skip_serializing_if = "serde_json::Map::is_empty")]
    metadata: Metadata,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    default_model: Option<String>,
}

#[derive(Deserialize)]
struct GraphRepr {
    nodes: Vec<Node>,
    entry_node_id: String,
    #[serde(default)]
    source_format: Option<Format>,
    #[serde(default)]
    metadata: Metadata,
    #[serde(default)]
    default_model: Option<String>,
}

impl TryFrom<GraphRepr> for Graph {
    type Error = GraphError;

    fn try_from(repr: GraphRepr) -> Result<Self, Self::Error> {
        let graph = Graph::new(repr.nodes, repr.entry_node_id)?
            .with_metadata(repr.metadata)
            .with_default_model(repr.default_model);
        Ok(match repr.source_format {
            Some(format) => graph.with_source_format(format),
            None => graph,
        })
    }
}

impl Graph {
    /// Creates a graph, rejecting duplicate node ids and a dangling entry.
    pub fn new(nodes: Vec<Node>, entry_node_id: impl Into<String>) -> Result<Self, GraphError> {
        let entry_node_id = entry_node_id.into();
        if nodes.is_empty() {
            return Err(GraphError::EmptyGraph);
        }

        let mut seen = AHashSet::with_capacity(nodes.len());
        for node in &nodes {
            if !seen.insert(node.id.as_str()) {
                return Err(GraphError::DuplicateNode(node.id.clone()));
            }
        }
        if !seen.contains(entry_node_id.as_str()) {
            return Err(GraphError::MissingEntry { entry_node_id });
        }

        Ok(Self {
            nodes,
            entry_node_id,
            source_format: None,
            metadata: Metadata::new(),
            default_model: None,
        })
    }

    pub fn builder() -> GraphBuilder {
        GraphBuilder::new()
    }

    pub fn with_metadata(mut self, metadata: Metadata) -> Self {
        self.metadata = metadata;
        self
    }

    pub fn with_default_model(mut self, model: Option<String>) -> Self {
        self.default_model = model;
        self
    }

    pub fn with_source_format(mut self, format: Format) -> Self {
        self.source_format = Some(format);
        self
    }

    pub fn nodes(&self) -> &[Node] {
        &self.nodes
    }

    pub fn node(&self, id: &str) -> Option<&Node> {
        self.nodes.iter().find(|n| n.id == id)
    }

    pub fn contains(&self, id: &str) -> bool {
        self.node(id).is_some()
    }

    pub fn entry_node_id(&self) -> &str {
        &self.entry_node_id
    }

    pub fn entry_node(&self) -> &Node {
        // The constructor guarantees membership; fall back to the first node anyway.
        self.node(&self.entry_node_id).unwrap_or(&self.nodes[0])
    }

    pub fn source_format(&self) -> Option<Format> {
        self.source_format
    }

    pub fn metadata(&self) -> &Metadata {
        &self.metadata
    }

    pub fn metadata_str(&self, key: &str) -> Option<&str> {
        self.metadata.get(key).and_then(Value::as_str)
    }

    pub fn default_model(&self) -> Option<&str> {
        self.default_model.as_deref()
    }

    /// Every edge in the graph as `(source_node_id, transition)`.
    pub fn transitions(&self) -> impl Iterator<Item = (&str, &Transition)> {
        self.nodes
            .iter()
            .flat_map(|n| n.transitions.iter().map(move |t| (n.id.as_str(), t)))
    }

    /// Edges whose target names no node in this graph.
    pub fn dangling_targets(&self) -> Vec<(&str, &str)> {
        self.transitions()
            .filter(|(_, t)| !self.contains(&t.target_node_id))
            .map(|(source, t)| (source, t.target_node_id.as_str()))
            .collect()
    }

    /// Returns an id based on `base` that no node uses yet.
    pub fn unused_node_id(&self, base: &str) -> String {
        if !self.contains(base) {
            return base.to_string();
        }
        (2..)
            .map(|n| format!("{}_{}", base, n))
            .find(|candidate| !self.contains(candidate))
            .unwrap_or_else(|| base.to_string())
    }

    pub(crate) fn node_mut(&mut self, id: &str) -> Option<&mut Node> {
        self.nodes.iter_mut().find(|n| n.id == id)
    }

    pub(crate) fn nodes_mut(&mut self) -> &mut [Node] {
        &mut self.nodes
    }

    /// Appends a node produced by an export-time rewiring phase.
    pub(crate) fn push_node(&mut self, node: Node) -> Result<(), GraphError> {
        if self.contains(&node.id) {
            return Err(GraphError::DuplicateNode(node.id));
        }
        self.nodes.push(node);
        Ok(())
    }
}
