//! Vapi: single assistants and multi-assistant squads.

pub mod types;

use crate::error::TranscodeError;
use crate::graph::{
    Condition, DISPLAY_NAME_KEY, GLOBAL_PROMPT_KEY, GREETING_KEY, Graph, GraphBuilder, Node, Tool,
    ToolKind, TRANSFER_FAILED,
};
use crate::transcode::{
    Format, Native, Passthrough, Payload, Transcoder, coerce, dedup_node_tools, expect_json,
};
use serde_json::{Map, Value, json};
use tracing::debug;
use types::{Assistant, FunctionSpec, Squad};

const FORMAT: Format = Format::Vapi;

/// Id of a single assistant's node when the assistant has no name.
const DEFAULT_NODE: &str = "assistant";

/// Node metadata key holding a squad member's own model name.
const MODEL_KEY: &str = "model";
/// Node metadata key holding provider-side model settings.
const MODEL_SETTINGS_KEY: &str = "model_settings";
/// Tool metadata flag: the tool came from `endCallFunctionEnabled`.
const END_CALL_FLAG_KEY: &str = "end_call_function_enabled";
/// Tool metadata key holding the raw object of a tool type we do not model.
const RAW_TOOL_KEY: &str = "vapi_tool";

const ASSISTANT_PASSTHROUGH: Passthrough = Passthrough::new(&[
    "voice",
    "transcriber",
    "endCallMessage",
    "endCallPhrases",
    "voicemailMessage",
    "serverUrl",
    "server",
    "silenceTimeoutSeconds",
    "maxDurationSeconds",
    "backgroundSound",
    "recordingEnabled",
    "metadata",
]);

const SQUAD_PASSTHROUGH: Passthrough = Passthrough::new(&["name"]);

const MODEL_PASSTHROUGH: Passthrough =
    Passthrough::new(&["provider", "temperature", "maxTokens", "emotionRecognitionEnabled"]);

const TOOL_PASSTHROUGH: Passthrough = Passthrough::new(&["async", "messages", "destinations"]);

pub struct VapiTranscoder;

impl Transcoder for VapiTranscoder {
    fn format(&self) -> Format {
        FORMAT
    }

    fn detect(&self, payload: &Payload) -> bool {
        let Some(object) = payload.as_json().and_then(Value::as_object) else {
            return false;
        };
        let model_object = object.get("model").is_some_and(Value::is_object);
        let squad = object
            .get("members")
            .and_then(Value::as_array)
            .is_some_and(|members| {
                !members.is_empty()
                    && members
                        .iter()
                        .all(|m| m.get("assistant").is_some_and(Value::is_object))
            });
        model_object || squad
    }

    fn import(&self, payload: &Payload) -> Result<Graph, TranscodeError> {
        let value = expect_json(FORMAT, payload)?;
        let object = value
            .as_object()
            .ok_or_else(|| TranscodeError::malformed(FORMAT, "expected a JSON object"))?;

        let mut builder = GraphBuilder::new();
        builder.source_format(FORMAT);

        if object.contains_key("members") {
            let squad: Squad = coerce(FORMAT, value)?;
            if squad.members.is_empty() {
                return Err(TranscodeError::malformed(FORMAT, "squad has no members"));
            }
            builder.default_model(
                squad.members[0]
                    .assistant
                    .model
                    .as_ref()
                    .and_then(|m| m.model.clone()),
            );

            let mut global_prompt = None;
            for (index, member) in squad.members.iter().enumerate() {
                let fallback = format!("member_{}", index + 1);
                let (mut node, lead_prompt) = assistant_node(&member.assistant, &fallback, index == 0)?;
                if lead_prompt.is_some() {
                    global_prompt = lead_prompt;
                }
                if let Some(name) = member.assistant.name.as_deref().filter(|n| *n != node.id) {
                    builder.alias(name, node.id.clone());
                }
                node.metadata
                    .extend(ASSISTANT_PASSTHROUGH.lift(&member.assistant.extra));
                if let Some(model) = member.assistant.model.as_ref().and_then(|m| m.model.clone()) {
                    node.metadata.insert(MODEL_KEY.into(), model.into());
                }
                let source = node.id.clone();
                builder.add_node(node)?;

                for destination in &member.assistant_destinations {
                    let condition = destination
                        .description
                        .clone()
                        .unwrap_or_else(|| format!("Transfer to {}", destination.assistant_name));
                    builder.connect(
                        source.clone(),
                        destination.assistant_name.clone(),
                        Condition::prompt(condition),
                        destination.message.clone(),
                    );
                }
            }
            let mut metadata = SQUAD_PASSTHROUGH.lift(object);
            if let Some(prompt) = global_prompt {
                metadata.insert(GLOBAL_PROMPT_KEY.into(), prompt.into());
            }
            builder.metadata(metadata);
            debug!(members = squad.members.len(), "imported vapi squad");
        } else {
            let assistant: Assistant = coerce(FORMAT, value)?;
            builder.default_model(assistant.model.as_ref().and_then(|m| m.model.clone()));
            let (node, global_prompt) = assistant_node(&assistant, DEFAULT_NODE, true)?;
            builder.add_node(node)?;
            let mut metadata = ASSISTANT_PASSTHROUGH.lift(&assistant.extra);
            if let Some(prompt) = global_prompt {
                metadata.insert(GLOBAL_PROMPT_KEY.into(), prompt.into());
            }
            builder.metadata(metadata);
            debug!("imported vapi assistant");
        }

        Ok(builder.build()?)
    }

    fn export(&self, graph: &Graph) -> Result<Native, TranscodeError> {
        let entry = graph.entry_node();
        if graph.nodes().len() == 1 && entry.transitions.is_empty() {
            let mut out = assistant_object(
                entry,
                graph.default_model(),
                entry.metadata_str(DISPLAY_NAME_KEY),
            );
            ASSISTANT_PASSTHROUGH.lower(graph.metadata(), &mut out);
            if let Some(prompt) = graph.metadata_str(GLOBAL_PROMPT_KEY) {
                prepend_system_message(&mut out, prompt);
            }
            return Ok(Native::Json(Value::Object(out)));
        }

        // The entry assistant leads the squad.
        let ordered = std::iter::once(entry).chain(
            graph
                .nodes()
                .iter()
                .filter(|n| n.id != graph.entry_node_id()),
        );
        let members: Vec<Value> = ordered
            .map(|node| {
                let model = node.metadata_str(MODEL_KEY).or(graph.default_model());
                let mut assistant = assistant_object(node, model, Some(node.id.as_str()));
                ASSISTANT_PASSTHROUGH.lower(&node.metadata, &mut assistant);
                if node.id == graph.entry_node_id() {
                    if let Some(prompt) = graph.metadata_str(GLOBAL_PROMPT_KEY) {
                        prepend_system_message(&mut assistant, prompt);
                    }
                }

                let destinations: Vec<Value> = node
                    .transitions
                    .iter()
                    .map(|t| {
                        let mut destination = Map::new();
                        destination.insert("type".into(), "assistant".into());
                        destination.insert("assistantName".into(), t.target_node_id.clone().into());
                        destination.insert("description".into(), t.condition.text().into());
                        if let Some(message) = t.description.as_deref().filter(|d| *d != TRANSFER_FAILED) {
                            destination.insert("message".into(), message.into());
                        }
                        Value::Object(destination)
                    })
                    .collect();

                let mut member = Map::new();
                member.insert("assistant".into(), Value::Object(assistant));
                if !destinations.is_empty() {
                    member.insert("assistantDestinations".into(), destinations.into());
                }
                Value::Object(member)
            })
            .collect();

        let mut out = Map::new();
        out.insert("members".into(), members.into());
        SQUAD_PASSTHROUGH.lower(graph.metadata(), &mut out);
        Ok(Native::Json(Value::Object(out)))
    }
}

/// Builds an assistant's node. On the `lead` assistant, the first of several
/// system messages is the graph's global prompt and is returned separately.
fn assistant_node(
    assistant: &Assistant,
    fallback_id: &str,
    lead: bool,
) -> Result<(Node, Option<String>), TranscodeError> {
    let id = assistant
        .name
        .as_deref()
        .map(str::trim)
        .filter(|n| !n.is_empty())
        .unwrap_or(fallback_id)
        .to_string();

    let mut node = Node::new(id, "");
    if let Some(name) = &assistant.name {
        node.metadata.insert(DISPLAY_NAME_KEY.into(), name.clone().into());
    }
    if let Some(greeting) = &assistant.first_message {
        node.metadata.insert(GREETING_KEY.into(), greeting.clone().into());
    }

    let mut tools = Vec::new();
    let mut global_prompt = None;
    if let Some(model) = &assistant.model {
        let mut system: Vec<&str> = model
            .messages
            .iter()
            .filter(|m| m.role == "system")
            .map(|m| m.content.as_str())
            .collect();
        if lead && system.len() > 1 {
            global_prompt = Some(system.remove(0).to_string());
        }
        node.prompt = system.join("\n\n");
        let settings = MODEL_PASSTHROUGH.lift(&model.extra);
        if !settings.is_empty() {
            node.metadata
                .insert(MODEL_SETTINGS_KEY.into(), Value::Object(settings));
        }
        for raw in &model.tools {
            tools.push(tool_from_vapi(raw)?);
        }
    }
    if assistant.end_call_function_enabled && !tools.iter().any(|t| t.kind == ToolKind::EndCall) {
        tools.push(Tool::new("end_call", ToolKind::EndCall).with_metadata(END_CALL_FLAG_KEY, true));
    }
    node.tools = dedup_node_tools(tools);
    Ok((node, global_prompt))
}

fn prepend_system_message(assistant: &mut Map<String, Value>, content: &str) {
    let Some(model) = assistant.get_mut("model").and_then(Value::as_object_mut) else {
        return;
    };
    if let Some(messages) = model
        .entry("messages")
        .or_insert_with(|| Value::Array(Vec::new()))
        .as_array_mut()
    {
        messages.insert(0, json!({ "role": "system", "content": content }));
    }
}

fn assistant_object(node: &Node, model: Option<&str>, name: Option<&str>) -> Map<String, Value> {
    let mut out = Map::new();
    if let Some(name) = name {
        out.insert("name".into(), name.into());
    }
    if let Some(greeting) = node.metadata_str(GREETING_KEY) {
        out.insert("firstMessage".into(), greeting.into());
    }

    let mut model_object = Map::new();
    if let Some(model) = model {
        model_object.insert("model".into(), model.into());
    }
    if !node.prompt.is_empty() {
        model_object.insert(
            "messages".into(),
            json!([{ "role": "system", "content": node.prompt }]),
        );
    }
    let tools: Vec<Value> = node
        .tools
        .iter()
        .filter(|t| !t.metadata.contains_key(END_CALL_FLAG_KEY))
        .map(tool_to_vapi)
        .collect();
    if !tools.is_empty() {
        model_object.insert("tools".into(), tools.into());
    }
    if let Some(settings) = node.metadata.get(MODEL_SETTINGS_KEY).and_then(Value::as_object) {
        MODEL_PASSTHROUGH.lower(settings, &mut model_object);
    }
    out.insert("model".into(), Value::Object(model_object));

    if node.tools.iter().any(|t| t.metadata.contains_key(END_CALL_FLAG_KEY)) {
        out.insert("endCallFunctionEnabled".into(), true.into());
    }
    out
}

fn tool_from_vapi(raw: &Value) -> Result<Tool, TranscodeError> {
    let object = raw
        .as_object()
        .ok_or_else(|| TranscodeError::malformed(FORMAT, "tool must be an object"))?;
    let tag = object
        .get("type")
        .and_then(Value::as_str)
        .ok_or_else(|| TranscodeError::malformed(FORMAT, "tool without a `type`"))?;
    let function: FunctionSpec = match object.get("function") {
        Some(f) => coerce(FORMAT, f)?,
        None => FunctionSpec::default(),
    };

    let (kind, default_name) = match tag {
        "function" => (ToolKind::Custom, None),
        "endCall" => (ToolKind::EndCall, Some("end_call")),
        "transferCall" => (ToolKind::TransferCall, Some("transfer_call")),
        other => (ToolKind::Other(other.to_string()), Some(other)),
    };
    let name = function
        .name
        .clone()
        .or_else(|| default_name.map(str::to_string))
        .ok_or_else(|| TranscodeError::malformed(FORMAT, "function tool without a name"))?;

    let mut tool = Tool::new(name, kind.clone());
    tool.description = function.description.unwrap_or_default();
    tool.parameters = function.parameters.unwrap_or(Value::Null);
    tool.url = object
        .get("server")
        .and_then(|s| s.get("url"))
        .and_then(Value::as_str)
        .map(str::to_string);
    tool.metadata = TOOL_PASSTHROUGH.lift(object);
    if let ToolKind::Other(_) = kind {
        tool.metadata.insert(RAW_TOOL_KEY.into(), raw.clone());
    }
    Ok(tool)
}

fn tool_to_vapi(tool: &Tool) -> Value {
    if let Some(raw) = tool.metadata.get(RAW_TOOL_KEY) {
        return raw.clone();
    }

    let tag = match &tool.kind {
        ToolKind::Custom | ToolKind::FunctionTool => "function",
        ToolKind::EndCall | ToolKind::Hangup => "endCall",
        ToolKind::TransferCall | ToolKind::Transfer => "transferCall",
        ToolKind::Other(tag) => tag.as_str(),
    };

    let mut function = Map::new();
    function.insert("name".into(), tool.name.clone().into());
    if !tool.description.is_empty() {
        function.insert("description".into(), tool.description.clone().into());
    }
    if !tool.parameters.is_null() {
        function.insert("parameters".into(), tool.parameters.clone());
    }

    let mut out = Map::new();
    out.insert("type".into(), tag.into());
    out.insert("function".into(), Value::Object(function));
    if let Some(url) = &tool.url {
        out.insert("server".into(), json!({ "url": url }));
    }
    TOOL_PASSTHROUGH.lower(&tool.metadata, &mut out);
    Value::Object(out)
}
