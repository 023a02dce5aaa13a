use super::{Condition, Graph, Metadata, Node, Tool, ToolKind, Transition};
use crate::error::PersistError;
use crate::transcode::Format;
use bincode::config::standard;
use bincode::serde::{decode_from_slice, encode_to_vec};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::fs;
use std::io::{Read, Write};

const ARTIFACT_VERSION: u32 = 1;

// bincode is not self-describing, so every `serde_json::Value` is stored as JSON text.

#[derive(Serialize, Deserialize, Debug)]
pub struct GraphArtifact {
    pub version: u32,
    pub entry_node_id: String,
    pub source_format: Option<String>,
    pub default_model: Option<String>,
    pub metadata_json: String,
    pub nodes: Vec<NodeArtifact>,
}

#[derive(Serialize, Deserialize, Debug)]
pub struct NodeArtifact {
    pub id: String,
    pub prompt: String,
    pub transitions: Vec<TransitionArtifact>,
    pub tools: Vec<ToolArtifact>,
    pub metadata_json: String,
}

#[derive(Serialize, Deserialize, Debug)]
pub enum ConditionArtifact {
    LlmPrompt(String),
    Equation(String),
    ToolCall(String),
    Always,
}

#[derive(Serialize, Deserialize, Debug)]
pub struct TransitionArtifact {
    pub target_node_id: String,
    pub condition: ConditionArtifact,
    pub description: Option<String>,
}

#[derive(Serialize, Deserialize, Debug)]
pub struct ToolArtifact {
    pub name: String,
    pub description: String,
    pub kind: String,
    pub parameters_json: String,
    pub url: Option<String>,
    pub vendor_id: Option<String>,
    pub metadata_json: String,
}

impl GraphArtifact {
    pub fn from_graph(graph: &Graph) -> Self {
        Self {
            version: ARTIFACT_VERSION,
            entry_node_id: graph.entry_node_id().to_string(),
            source_format: graph.source_format().map(|f| f.as_str().to_string()),
            default_model: graph.default_model().map(str::to_string),
            metadata_json: Value::Object(graph.metadata().clone()).to_string(),
            nodes: graph.nodes().iter().map(NodeArtifact::from_node).collect(),
        }
    }

    /// Rebuilds the graph, re-checking the entry invariant.
    pub fn into_graph(self) -> Result<Graph, PersistError> {
        if self.version != ARTIFACT_VERSION {
            return Err(PersistError::Generic(format!(
                "Unsupported artifact version {}",
                self.version
            )));
        }
        let nodes = self
            .nodes
            .into_iter()
            .map(NodeArtifact::into_node)
            .collect::<Result<Vec<_>, _>>()?;
        let graph = Graph::new(nodes, self.entry_node_id)?
            .with_metadata(parse_metadata(&self.metadata_json)?)
            .with_default_model(self.default_model);
        Ok(match self.source_format.as_deref().map(str::parse::<Format>) {
            Some(Ok(format)) => graph.with_source_format(format),
            _ => graph,
        })
    }

    /// Saves the artifact to a file using the bincode format.
    pub fn save(&self, path: &str) -> Result<(), PersistError> {
        let bytes = self.to_bytes()?;
        let mut file = fs::File::create(path).map_err(|e| {
            PersistError::Generic(format!("Could not create file '{}': {}", path, e))
        })?;
        file.write_all(&bytes).map_err(|e| {
            PersistError::Generic(format!("Could not write to file '{}': {}", path, e))
        })?;
        Ok(())
    }

    /// Loads an artifact from a file.
    pub fn from_file(path: &str) -> Result<Self, PersistError> {
        let mut file = fs::File::open(path)
            .map_err(|e| PersistError::Generic(format!("Could not open file '{}': {}", path, e)))?;
        let mut bytes = Vec::new();
        file.read_to_end(&mut bytes).map_err(|e| {
            PersistError::Generic(format!("Could not read from file '{}': {}", path, e))
        })?;
        Self::from_bytes(&bytes)
    }

    pub fn to_bytes(&self) -> Result<Vec<u8>, PersistError> {
        encode_to_vec(self, standard())
            .map_err(|e| PersistError::Generic(format!("Serialization failed: {}", e)))
    }

    pub fn from_bytes(bytes: &[u8]) -> Result<Self, PersistError> {
        decode_from_slice(bytes, standard())
            .map(|(artifact, _)| artifact)
            .map_err(|e| PersistError::Generic(format!("Deserialization failed: {}", e)))
    }
}

impl NodeArtifact {
    fn from_node(node: &Node) -> Self {
        Self {
            id: node.id.clone(),
            prompt: node.prompt.clone(),
            transitions: node
                .transitions
                .iter()
                .map(|t| TransitionArtifact {
                    target_node_id: t.target_node_id.clone(),
                    condition: match &t.condition {
                        Condition::LlmPrompt { prompt } => ConditionArtifact::LlmPrompt(prompt.clone()),
                        Condition::Equation { expression } => {
                            ConditionArtifact::Equation(expression.clone())
                        }
                        Condition::ToolCall { tool_name } => {
                            ConditionArtifact::ToolCall(tool_name.clone())
                        }
                        Condition::Always => ConditionArtifact::Always,
                    },
                    description: t.description.clone(),
                })
                .collect(),
            tools: node
                .tools
                .iter()
                .map(|tool| ToolArtifact {
                    name: tool.name.clone(),
                    description: tool.description.clone(),
                    kind: tool.kind.as_str().to_string(),
                    parameters_json: tool.parameters.to_string(),
                    url: tool.url.clone(),
                    vendor_id: tool.vendor_id.clone(),
                    metadata_json: Value::Object(tool.metadata.clone()).to_string(),
                })
                .collect(),
            metadata_json: Value::Object(node.metadata.clone()).to_string(),
        }
    }

    fn into_node(self) -> Result<Node, PersistError> {
        let transitions = self
            .transitions
            .into_iter()
            .map(|t| Transition {
                target_node_id: t.target_node_id,
                condition: match t.condition {
                    ConditionArtifact::LlmPrompt(prompt) => Condition::LlmPrompt { prompt },
                    ConditionArtifact::Equation(expression) => Condition::Equation { expression },
                    ConditionArtifact::ToolCall(tool_name) => Condition::ToolCall { tool_name },
                    ConditionArtifact::Always => Condition::Always,
                },
                description: t.description,
            })
            .collect();
        let tools = self
            .tools
            .into_iter()
            .map(|t| {
                Ok(Tool {
                    name: t.name,
                    description: t.description,
                    kind: ToolKind::from(t.kind),
                    parameters: serde_json::from_str(&t.parameters_json).map_err(|e| {
                        PersistError::Generic(format!("Invalid tool parameters: {}", e))
                    })?,
                    url: t.url,
                    vendor_id: t.vendor_id,
                    metadata: parse_metadata(&t.metadata_json)?,
                })
            })
            .collect::<Result<Vec<_>, PersistError>>()?;

        Ok(Node {
            id: self.id,
            prompt: self.prompt,
            transitions,
            tools,
            metadata: parse_metadata(&self.metadata_json)?,
        })
    }
}

fn parse_metadata(json: &str) -> Result<Metadata, PersistError> {
    match serde_json::from_str(json) {
        Ok(Value::Object(map)) => Ok(map),
        Ok(other) => Err(PersistError::Generic(format!(
            "Expected a metadata object, found {}",
            other
        ))),
        Err(e) => Err(PersistError::Generic(format!("Invalid metadata JSON: {}", e))),
    }
}
