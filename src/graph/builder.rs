use super::{Condition, Graph, Metadata, Node, Transition};
use crate::error::{GraphError, UnresolvedTarget};
use crate::transcode::Format;
use ahash::AHashMap;

/// An edge recorded before its target is known to exist.
#[derive(Debug, Clone)]
struct PendingEdge {
    source: String,
    target: String,
    condition: Condition,
    description: Option<String>,
}

/// Two-phase graph construction.
///
/// Nodes are added first; edges may name nodes (or vendor aliases of nodes)
/// that have not been added yet. [`GraphBuilder::build`] resolves every
/// pending edge against the frozen node set and reports all unresolved
/// targets at once.
#[derive(Debug, Default)]
pub struct GraphBuilder {
    nodes: Vec<Node>,
    index: AHashMap<String, usize>,
    aliases: AHashMap<String, String>,
    pending: Vec<PendingEdge>,
    entry: Option<String>,
    metadata: Metadata,
    default_model: Option<String>,
    source_format: Option<Format>,
}

impl GraphBuilder {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn add_node(&mut self, node: Node) -> Result<(), GraphError> {
        if self.index.contains_key(&node.id) {
            return Err(GraphError::DuplicateNode(node.id));
        }
        self.index.insert(node.id.clone(), self.nodes.len());
        self.nodes.push(node);
        Ok(())
    }

    pub fn has_node(&self, id: &str) -> bool {
        self.index.contains_key(id)
    }

    /// Lets edges and the entry refer to node `id` by a vendor name.
    pub fn alias(&mut self, alias: impl Into<String>, id: impl Into<String>) {
        self.aliases.insert(alias.into(), id.into());
    }

    pub fn connect(
        &mut self,
        source: impl Into<String>,
        target: impl Into<String>,
        condition: Condition,
        description: Option<String>,
    ) {
        self.pending.push(PendingEdge {
            source: source.into(),
            target: target.into(),
            condition,
            description,
        });
    }

    pub fn entry(&mut self, id: impl Into<String>) {
        self.entry = Some(id.into());
    }

    pub fn metadata(&mut self, metadata: Metadata) {
        self.metadata = metadata;
    }

    pub fn default_model(&mut self, model: Option<String>) {
        self.default_model = model;
    }

    pub fn source_format(&mut self, format: Format) {
        self.source_format = Some(format);
    }

    fn resolve(&self, name: &str) -> Option<String> {
        if self.index.contains_key(name) {
            return Some(name.to_string());
        }
        self.aliases
            .get(name)
            .filter(|id| self.index.contains_key(id.as_str()))
            .cloned()
    }

    /// Resolves pending edges and validates the entry node.
    ///
    /// Without an explicit entry, the first added node is the entry.
    pub fn build(mut self) -> Result<Graph, GraphError> {
        let mut unresolved = Vec::new();
        let pending = std::mem::take(&mut self.pending);

        for edge in pending {
            let source = self.resolve(&edge.source);
            let target = self.resolve(&edge.target);
            match (source, target) {
                (Some(source), Some(target)) => {
                    let slot = self.index[&source];
                    let mut transition = Transition::new(target, edge.condition);
                    transition.description = edge.description;
                    self.nodes[slot].transitions.push(transition);
                }
                _ => unresolved.push(UnresolvedTarget {
                    source_node_id: edge.source,
                    target: edge.target,
                }),
            }
        }

        if !unresolved.is_empty() {
            return Err(GraphError::UnresolvedTargets { unresolved });
        }

        let entry = match self.entry.take() {
            Some(name) => self.resolve(&name).unwrap_or(name),
            None => self
                .nodes
                .first()
                .map(|n| n.id.clone())
                .ok_or(GraphError::EmptyGraph)?,
        };

        let graph = Graph::new(self.nodes, entry)?
            .with_metadata(self.metadata)
            .with_default_model(self.default_model);
        Ok(match self.source_format {
            Some(format) => graph.with_source_format(format),
            None => graph,
        })
    }
}
