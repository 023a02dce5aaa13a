use serde::Deserialize;
use serde_json::{Map, Value};

/// A Vapi assistant. Unmodeled fields land in `extra` for the passthrough lift.
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Assistant {
    #[serde(default)]
    pub name: Option<String>,
    #[serde(default)]
    pub first_message: Option<String>,
    #[serde(default)]
    pub model: Option<AssistantModel>,
    #[serde(default)]
    pub end_call_function_enabled: bool,
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

#[derive(Debug, Deserialize)]
pub struct AssistantModel {
    #[serde(default)]
    pub model: Option<String>,
    #[serde(default)]
    pub messages: Vec<Message>,
    #[serde(default)]
    pub tools: Vec<Value>,
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

#[derive(Debug, Deserialize)]
pub struct Message {
    pub role: String,
    #[serde(default)]
    pub content: String,
}

#[derive(Debug, Deserialize)]
pub struct Squad {
    #[serde(default)]
    pub name: Option<String>,
    pub members: Vec<SquadMember>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SquadMember {
    pub assistant: Assistant,
    #[serde(default)]
    pub assistant_destinations: Vec<AssistantDestination>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AssistantDestination {
    pub assistant_name: String,
    #[serde(default)]
    pub description: Option<String>,
    #[serde(default)]
    pub message: Option<String>,
}

/// The `function` block of a Vapi tool.
#[derive(Debug, Default, Deserialize)]
pub struct FunctionSpec {
    #[serde(default)]
    pub name: Option<String>,
    #[serde(default)]
    pub description: Option<String>,
    #[serde(default)]
    pub parameters: Option<Value>,
}
