use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use std::fmt;

/// Opaque, string-keyed bag for vendor fields that have no canonical slot.
pub type Metadata = Map<String, Value>;

/// Node metadata key holding the vendor-native role of a node.
pub const NODE_TYPE_KEY: &str = "node_type";
/// Node metadata key naming the terminal tool a synthesized node stands in for.
pub const SYNTHESIZED_FROM_KEY: &str = "synthesized_from";
/// Description marker of the edge a transfer node follows when the transfer fails.
pub const TRANSFER_FAILED: &str = "transfer_failed";

// Metadata keys shared by several vendors.
pub const GLOBAL_PROMPT_KEY: &str = "global_prompt";
pub const GREETING_KEY: &str = "greeting";
pub const POSITION_KEY: &str = "position";
pub const DISPLAY_NAME_KEY: &str = "name";

/// The native role of a node, as recorded in its metadata.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum NodeKind {
    Conversation,
    End,
    Transfer,
    Function,
    Other(String),
}

impl NodeKind {
    pub fn as_str(&self) -> &str {
        match self {
            NodeKind::Conversation => "conversation",
            NodeKind::End => "end",
            NodeKind::Transfer => "transfer_call",
            NodeKind::Function => "function",
            NodeKind::Other(name) => name,
        }
    }

    pub fn parse(name: &str) -> Self {
        match name {
            "conversation" => NodeKind::Conversation,
            "end" => NodeKind::End,
            "transfer_call" => NodeKind::Transfer,
            "function" => NodeKind::Function,
            other => NodeKind::Other(other.to_string()),
        }
    }

    pub fn is_terminal(&self) -> bool {
        matches!(self, NodeKind::End | NodeKind::Transfer)
    }
}

/// One conversational state: a prompt plus its tools and outgoing transitions.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Node {
    pub id: String,
    #[serde(default)]
    pub prompt: String,
    #[serde(default)]
    pub transitions: Vec<Transition>,
    #[serde(default)]
    pub tools: Vec<Tool>,
    #[serde(default, skip_serializing_if = "Map::is_empty")]
    pub metadata: Metadata,
}

impl Node {
    pub fn new(id: impl Into<String>, prompt: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            prompt: prompt.into(),
            transitions: Vec::new(),
            tools: Vec::new(),
            metadata: Metadata::new(),
        }
    }

    pub fn with_transition(mut self, transition: Transition) -> Self {
        self.transitions.push(transition);
        self
    }

    pub fn with_tool(mut self, tool: Tool) -> Self {
        self.tools.push(tool);
        self
    }

    pub fn with_metadata(mut self, key: &str, value: impl Into<Value>) -> Self {
        self.metadata.insert(key.to_string(), value.into());
        self
    }

    pub fn with_kind(mut self, kind: NodeKind) -> Self {
        self.set_kind(kind);
        self
    }

    /// Nodes without an explicit `node_type` are conversational.
    pub fn kind(&self) -> NodeKind {
        self.metadata
            .get(NODE_TYPE_KEY)
            .and_then(Value::as_str)
            .map(NodeKind::parse)
            .unwrap_or(NodeKind::Conversation)
    }

    pub fn set_kind(&mut self, kind: NodeKind) {
        self.metadata
            .insert(NODE_TYPE_KEY.to_string(), Value::from(kind.as_str()));
    }

    pub fn tool(&self, name: &str) -> Option<&Tool> {
        self.tools.iter().find(|t| t.name == name)
    }

    pub fn metadata_str(&self, key: &str) -> Option<&str> {
        self.metadata.get(key).and_then(Value::as_str)
    }

    pub fn has_transition_to(&self, target_node_id: &str) -> bool {
        self.transitions
            .iter()
            .any(|t| t.target_node_id == target_node_id)
    }
}

/// When a transition is taken.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum Condition {
    /// Free-text criterion evaluated by a downstream judge.
    LlmPrompt { prompt: String },
    /// Template expression such as `{{age}} >= 18 && {{consent}} == yes`.
    Equation { expression: String },
    /// Fired when the named tool is invoked.
    ToolCall { tool_name: String },
    Always,
}

impl Condition {
    pub fn prompt(text: impl Into<String>) -> Self {
        Condition::LlmPrompt {
            prompt: text.into(),
        }
    }

    pub fn equation(expression: impl Into<String>) -> Self {
        Condition::Equation {
            expression: expression.into(),
        }
    }

    pub fn type_name(&self) -> &'static str {
        match self {
            Condition::LlmPrompt { .. } => "llm_prompt",
            Condition::Equation { .. } => "equation",
            Condition::ToolCall { .. } => "tool_call",
            Condition::Always => "always",
        }
    }

    /// Human-readable criterion text, as read by judges and text-only vendors.
    pub fn text(&self) -> String {
        match self {
            Condition::LlmPrompt { prompt } => prompt.clone(),
            Condition::Equation { expression } => expression.clone(),
            Condition::ToolCall { tool_name } => format!("The `{}` tool was called", tool_name),
            Condition::Always => "Always".to_string(),
        }
    }
}

impl fmt::Display for Condition {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "[{}] {}", self.type_name(), self.text())
    }
}

/// A directed, conditionally-taken edge. The target is referenced by id only.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Transition {
    pub target_node_id: String,
    pub condition: Condition,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
}

impl Transition {
    pub fn new(target_node_id: impl Into<String>, condition: Condition) -> Self {
        Self {
            target_node_id: target_node_id.into(),
            condition,
            description: None,
        }
    }

    pub fn with_description(mut self, description: impl Into<String>) -> Self {
        self.description = Some(description.into());
        self
    }

    pub fn is_transfer_failure(&self) -> bool {
        self.description.as_deref() == Some(TRANSFER_FAILED)
    }
}

/// Type tag of a tool. Unknown vendor tags are kept verbatim.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(from = "String", into = "String")]
pub enum ToolKind {
    Custom,
    EndCall,
    TransferCall,
    Transfer,
    Hangup,
    FunctionTool,
    Other(String),
}

impl ToolKind {
    pub fn as_str(&self) -> &str {
        match self {
            ToolKind::Custom => "custom",
            ToolKind::EndCall => "end_call",
            ToolKind::TransferCall => "transfer_call",
            ToolKind::Transfer => "transfer",
            ToolKind::Hangup => "hangup",
            ToolKind::FunctionTool => "function_tool",
            ToolKind::Other(name) => name,
        }
    }

    /// Only these two are materialized as nodes by terminal-node synthesis.
    pub fn is_terminal(&self) -> bool {
        matches!(self, ToolKind::EndCall | ToolKind::TransferCall)
    }
}

impl From<String> for ToolKind {
    fn from(value: String) -> Self {
        match value.as_str() {
            "custom" => ToolKind::Custom,
            "end_call" => ToolKind::EndCall,
            "transfer_call" => ToolKind::TransferCall,
            "transfer" => ToolKind::Transfer,
            "hangup" => ToolKind::Hangup,
            "function_tool" => ToolKind::FunctionTool,
            _ => ToolKind::Other(value),
        }
    }
}

impl From<&str> for ToolKind {
    fn from(value: &str) -> Self {
        ToolKind::from(value.to_string())
    }
}

impl From<ToolKind> for String {
    fn from(value: ToolKind) -> Self {
        value.as_str().to_string()
    }
}

impl fmt::Display for ToolKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A callable side effect or terminal action available from a node.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Tool {
    pub name: String,
    #[serde(default)]
    pub description: String,
    #[serde(rename = "type")]
    pub kind: ToolKind,
    /// JSON-Schema shaped parameter object; `Null` when the vendor declared none.
    #[serde(default, skip_serializing_if = "Value::is_null")]
    pub parameters: Value,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub url: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub vendor_id: Option<String>,
    #[serde(default, skip_serializing_if = "Map::is_empty")]
    pub metadata: Metadata,
}

impl Tool {
    pub fn new(name: impl Into<String>, kind: ToolKind) -> Self {
        Self {
            name: name.into(),
            description: String::new(),
            kind,
            parameters: Value::Null,
            url: None,
            vendor_id: None,
            metadata: Metadata::new(),
        }
    }

    pub fn with_description(mut self, description: impl Into<String>) -> Self {
        self.description = description.into();
        self
    }

    pub fn with_parameters(mut self, parameters: Value) -> Self {
        self.parameters = parameters;
        self
    }

    pub fn with_url(mut self, url: impl Into<String>) -> Self {
        self.url = Some(url.into());
        self
    }

    pub fn with_metadata(mut self, key: &str, value: impl Into<Value>) -> Self {
        self.metadata.insert(key.to_string(), value.into());
        self
    }
}
