use crate::transcode::Format;
use thiserror::Error;

/// Errors raised while constructing or validating a canonical graph.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum GraphError {
    #[error("Graph has no nodes")]
    EmptyGraph,

    #[error("Entry node '{entry_node_id}' does not exist in the graph")]
    MissingEntry { entry_node_id: String },

    #[error("Node id '{0}' is defined more than once")]
    DuplicateNode(String),

    #[error("{} transition target(s) could not be resolved: {}", .unresolved.len(), format_unresolved(.unresolved))]
    UnresolvedTargets { unresolved: Vec<UnresolvedTarget> },
}

/// A transition whose target name matched no node after the resolution pass.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UnresolvedTarget {
    pub source_node_id: String,
    pub target: String,
}

fn format_unresolved(unresolved: &[UnresolvedTarget]) -> String {
    unresolved
        .iter()
        .map(|u| format!("'{}' -> '{}'", u.source_node_id, u.target))
        .collect::<Vec<_>>()
        .join(", ")
}

/// Errors that can occur while importing or exporting a vendor payload.
#[derive(Error, Debug, Clone)]
pub enum TranscodeError {
    #[error("Malformed {format} input: {message}")]
    Malformed { format: Format, message: String },

    #[error("Ambiguous {format} input: {message}")]
    Ambiguous { format: Format, message: String },

    #[error("Unknown format '{0}'")]
    UnknownFormat(String),

    #[error("No registered format accepts this input")]
    NoMatchingFormat,

    #[error("Graph cannot be exported as {format}: {reason}")]
    UnsupportedTarget { format: Format, reason: String },

    #[error("I/O error on '{path}': {message}")]
    Io { path: String, message: String },

    #[error(transparent)]
    Graph(#[from] GraphError),
}

impl TranscodeError {
    pub(crate) fn malformed(format: Format, message: impl Into<String>) -> Self {
        TranscodeError::Malformed {
            format,
            message: message.into(),
        }
    }

    pub(crate) fn unsupported(format: Format, reason: impl Into<String>) -> Self {
        TranscodeError::UnsupportedTarget {
            format,
            reason: reason.into(),
        }
    }
}

/// Errors that can occur when saving or loading a graph artifact.
#[derive(Error, Debug, Clone)]
pub enum PersistError {
    #[error("Artifact error: {0}")]
    Generic(String),

    #[error(transparent)]
    Graph(#[from] GraphError),
}
