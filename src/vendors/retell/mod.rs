//! Retell AI: the multi-state LLM format and the conversation-flow format.

mod envelope;
mod flow;
mod llm;
pub mod types;

pub use flow::RetellFlowTranscoder;
pub use llm::RetellLlmTranscoder;

use crate::graph::{Tool, ToolKind};
use crate::transcode::Passthrough;
use serde_json::{Map, Value};
use types::RetellTool;

/// Tool fields round-tripped through `Tool::metadata`.
const TOOL_PASSTHROUGH: Passthrough = Passthrough::new(&[
    "transfer_destination",
    "transfer_option",
    "speak_during_execution",
    "speak_after_execution",
    "execution_message_description",
    "timeout_ms",
    "method",
    "headers",
    "query_params",
    "response_variables",
    "digit",
    "event_type_id",
    "timezone",
    "show_transferee_as_caller",
]);

fn tool_from_retell(tool: &RetellTool) -> Tool {
    let mut canonical = Tool::new(tool.name.clone(), ToolKind::from(tool.tool_type.as_str()))
        .with_description(tool.description.clone());
    canonical.parameters = tool.parameters.clone().unwrap_or(Value::Null);
    canonical.url = tool.url.clone();
    canonical.vendor_id = tool.tool_id.clone();
    canonical.metadata = TOOL_PASSTHROUGH.lift(&tool.extra);
    canonical
}

fn retell_tool_type(kind: &ToolKind) -> &str {
    match kind {
        ToolKind::Custom | ToolKind::FunctionTool => "custom",
        ToolKind::Hangup => "end_call",
        ToolKind::Transfer => "transfer_call",
        other => other.as_str(),
    }
}

fn tool_to_retell(tool: &Tool, with_id: bool) -> Value {
    let mut out = Map::new();
    out.insert("type".into(), retell_tool_type(&tool.kind).into());
    out.insert("name".into(), tool.name.clone().into());
    if !tool.description.is_empty() {
        out.insert("description".into(), tool.description.clone().into());
    }
    if let Some(url) = &tool.url {
        out.insert("url".into(), url.clone().into());
    }
    if !tool.parameters.is_null() {
        out.insert("parameters".into(), tool.parameters.clone());
    }
    if with_id {
        out.insert("tool_id".into(), tool_id(tool).into());
    }
    TOOL_PASSTHROUGH.lower(&tool.metadata, &mut out);
    Value::Object(out)
}

fn tool_id(tool: &Tool) -> String {
    tool.vendor_id
        .clone()
        .unwrap_or_else(|| format!("tool_{}", tool.name))
}
