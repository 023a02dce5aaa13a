use serde::Deserialize;
use serde_json::{Map, Value};

/// A Bland conversational pathway as exported by the pathway editor.
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Pathway {
    pub nodes: Vec<PathwayNode>,
    #[serde(default)]
    pub edges: Vec<PathwayEdge>,
    #[serde(default)]
    pub global_config: Option<GlobalConfig>,
}

#[derive(Debug, Deserialize)]
pub struct PathwayNode {
    pub id: String,
    #[serde(rename = "type", default = "default_type")]
    pub node_type: String,
    #[serde(default)]
    pub data: NodeData,
    #[serde(default)]
    pub position: Option<Value>,
}

fn default_type() -> String {
    "Default".to_string()
}

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NodeData {
    #[serde(default)]
    pub name: Option<String>,
    #[serde(default)]
    pub prompt: Option<String>,
    #[serde(default)]
    pub text: Option<String>,
    #[serde(default)]
    pub is_start: bool,
    #[serde(default)]
    pub tools: Vec<PathwayTool>,
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

/// Custom tools attached to a node.
#[derive(Debug, Deserialize)]
pub struct PathwayTool {
    pub name: String,
    #[serde(rename = "type", default = "custom_type")]
    pub tool_type: String,
    #[serde(default)]
    pub description: String,
    #[serde(default)]
    pub parameters: Option<Value>,
    #[serde(default)]
    pub url: Option<String>,
}

fn custom_type() -> String {
    "custom".to_string()
}

#[derive(Debug, Deserialize)]
pub struct PathwayEdge {
    pub source: String,
    pub target: String,
    #[serde(default)]
    pub label: Option<String>,
    #[serde(default)]
    pub data: Option<EdgeData>,
}

#[derive(Debug, Deserialize)]
pub struct EdgeData {
    #[serde(default)]
    pub label: Option<String>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct GlobalConfig {
    #[serde(default)]
    pub global_prompt: Option<String>,
}
