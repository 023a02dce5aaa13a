use super::{Graph, NodeKind};
use ahash::AHashSet;
use std::collections::VecDeque;
use std::fmt;
use tracing::debug;

/// A non-fatal structural problem found in a graph.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Issue {
    DanglingTarget { source: String, target: String },
    Unreachable { node_id: String },
    DuplicateTool { node_id: String, tool_name: String },
    EmptyPrompt { node_id: String },
}

impl fmt::Display for Issue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Issue::DanglingTarget { source, target } => {
                write!(f, "node '{}' transitions to unknown node '{}'", source, target)
            }
            Issue::Unreachable { node_id } => {
                write!(f, "node '{}' is unreachable from the entry node", node_id)
            }
            Issue::DuplicateTool { node_id, tool_name } => {
                write!(f, "node '{}' declares tool '{}' twice", node_id, tool_name)
            }
            Issue::EmptyPrompt { node_id } => {
                write!(f, "conversation node '{}' has an empty prompt", node_id)
            }
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ValidationReport {
    pub issues: Vec<Issue>,
}

impl ValidationReport {
    pub fn is_clean(&self) -> bool {
        self.issues.is_empty()
    }

    pub fn len(&self) -> usize {
        self.issues.len()
    }

    pub fn is_empty(&self) -> bool {
        self.issues.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = &Issue> {
        self.issues.iter()
    }
}

impl fmt::Display for ValidationReport {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.issues.is_empty() {
            return write!(f, "no issues");
        }
        for issue in &self.issues {
            writeln!(f, "- {}", issue)?;
        }
        Ok(())
    }
}

impl Graph {
    /// Checks the soft invariants the constructor does not enforce.
    pub fn validate(&self) -> ValidationReport {
        let mut issues = Vec::new();

        for (source, target) in self.dangling_targets() {
            issues.push(Issue::DanglingTarget {
                source: source.to_string(),
                target: target.to_string(),
            });
        }

        let reachable = self.reachable_from_entry();
        for node in self.nodes() {
            if !reachable.contains(node.id.as_str()) {
                issues.push(Issue::Unreachable {
                    node_id: node.id.clone(),
                });
            }

            let mut names = AHashSet::new();
            for tool in &node.tools {
                if !names.insert(tool.name.as_str()) {
                    issues.push(Issue::DuplicateTool {
                        node_id: node.id.clone(),
                        tool_name: tool.name.clone(),
                    });
                }
            }

            if node.kind() == NodeKind::Conversation && node.prompt.trim().is_empty() {
                issues.push(Issue::EmptyPrompt {
                    node_id: node.id.clone(),
                });
            }
        }

        debug!(issues = issues.len(), "validated graph");
        ValidationReport { issues }
    }

    fn reachable_from_entry(&self) -> AHashSet<&str> {
        let mut seen = AHashSet::new();
        let mut queue = VecDeque::from([self.entry_node_id()]);
        while let Some(id) = queue.pop_front() {
            if !seen.insert(id) {
                continue;
            }
            if let Some(node) = self.node(id) {
                queue.extend(node.transitions.iter().map(|t| t.target_node_id.as_str()));
            }
        }
        seen
    }
}
