use serde::Deserialize;
use serde_json::{Map, Value};

/// Tool entry shared by the Retell LLM and conversation-flow formats.
#[derive(Debug, Deserialize, Clone)]
pub struct RetellTool {
    #[serde(rename = "type")]
    pub tool_type: String,
    pub name: String,
    #[serde(default)]
    pub description: String,
    #[serde(default)]
    pub url: Option<String>,
    #[serde(default)]
    pub parameters: Option<Value>,
    #[serde(default)]
    pub tool_id: Option<String>,
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

/// Multi-state Retell LLM (`retell-llm` response engine).
#[derive(Debug, Deserialize)]
pub struct RetellLlm {
    #[serde(default)]
    pub model: Option<String>,
    #[serde(default)]
    pub general_prompt: Option<String>,
    #[serde(default)]
    pub general_tools: Vec<RetellTool>,
    #[serde(default)]
    pub states: Vec<RetellState>,
    #[serde(default)]
    pub starting_state: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct RetellState {
    pub name: String,
    #[serde(default)]
    pub state_prompt: String,
    #[serde(default)]
    pub edges: Vec<RetellStateEdge>,
    #[serde(default)]
    pub tools: Vec<RetellTool>,
}

#[derive(Debug, Deserialize)]
pub struct RetellStateEdge {
    pub destination_state_name: String,
    #[serde(default)]
    pub description: String,
}

/// Retell conversation flow (`conversation-flow` response engine).
#[derive(Debug, Deserialize)]
pub struct ConversationFlow {
    pub nodes: Vec<FlowNode>,
    #[serde(default)]
    pub start_node_id: Option<String>,
    #[serde(default)]
    pub global_prompt: Option<String>,
    #[serde(default)]
    pub tools: Vec<RetellTool>,
    #[serde(default)]
    pub model_choice: Option<ModelChoice>,
}

#[derive(Debug, Deserialize)]
pub struct ModelChoice {
    #[serde(default)]
    pub model: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct FlowNode {
    pub id: String,
    #[serde(rename = "type", default = "conversation_type")]
    pub node_type: String,
    #[serde(default)]
    pub name: Option<String>,
    #[serde(default)]
    pub instruction: Option<Instruction>,
    #[serde(default)]
    pub edges: Vec<FlowEdge>,
    /// Failure edge of a transfer node.
    #[serde(default)]
    pub edge: Option<FlowEdge>,
    #[serde(default)]
    pub skip_response_edge: Option<FlowEdge>,
    #[serde(default)]
    pub tool_id: Option<String>,
    #[serde(default)]
    pub display_position: Option<Value>,
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

fn conversation_type() -> String {
    "conversation".to_string()
}

#[derive(Debug, Deserialize)]
pub struct Instruction {
    #[serde(rename = "type", default = "prompt_type")]
    pub kind: String,
    #[serde(default)]
    pub text: String,
}

fn prompt_type() -> String {
    "prompt".to_string()
}

#[derive(Debug, Deserialize)]
pub struct FlowEdge {
    #[serde(default)]
    pub destination_node_id: Option<String>,
    #[serde(default)]
    pub transition_condition: Option<TransitionCondition>,
}

#[derive(Debug, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum TransitionCondition {
    Prompt {
        #[serde(default)]
        prompt: String,
    },
    Equation {
        #[serde(default)]
        equations: Vec<Equation>,
        #[serde(default = "and_operator")]
        operator: String,
    },
}

fn and_operator() -> String {
    "&&".to_string()
}

#[derive(Debug, Deserialize)]
pub struct Equation {
    pub left: String,
    pub operator: String,
    #[serde(default)]
    pub right: Option<String>,
}
