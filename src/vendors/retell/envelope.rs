use crate::error::TranscodeError;
use crate::transcode::{Format, Passthrough};
use serde_json::{Map, Value};

/// Agent-level fields of the UI-importable agent envelope.
pub(super) const AGENT_PASSTHROUGH: Passthrough = Passthrough::new(&[
    "agent_name",
    "voice_id",
    "voice_temperature",
    "voice_speed",
    "language",
    "ambient_sound",
    "responsiveness",
    "interruption_sensitivity",
    "end_call_after_silence_ms",
    "max_call_duration_ms",
    "webhook_url",
    "begin_message_delay_ms",
]);

/// Graph metadata key holding the agent-level envelope fields.
pub(super) const AGENT_KEY: &str = "agent";

/// Where the conversation flow sits inside a payload.
#[derive(Debug)]
pub(super) enum FlowLocation<'a> {
    Bare(&'a Value),
    Wrapped {
        flow: &'a Value,
        agent: &'a Map<String, Value>,
    },
}

/// Keys whose presence marks an object as a conversation flow.
fn has_flow_fields(object: &Map<String, Value>) -> bool {
    let has_nodes = object.get("nodes").is_some_and(Value::is_array);
    let flow_nodes = object
        .get("nodes")
        .and_then(Value::as_array)
        .and_then(|nodes| nodes.first())
        .and_then(Value::as_object)
        .is_some_and(|node| {
            node.contains_key("instruction")
                || (node.contains_key("type") && !node.contains_key("data"))
        });
    // Bland pathways also have `nodes`, but with top-level `edges`.
    has_nodes
        && !object.contains_key("edges")
        && (object.contains_key("start_node_id") || flow_nodes)
}

fn wrappers(object: &Map<String, Value>) -> Vec<&Value> {
    let mut found = Vec::new();
    for key in ["conversationFlow", "conversation_flow"] {
        if let Some(inner) = object.get(key).filter(|v| v.is_object()) {
            found.push(inner);
        }
    }
    if let Some(inner) = object
        .get("response_engine")
        .and_then(|engine| engine.get("conversation_flow"))
        .filter(|v| v.is_object())
    {
        found.push(inner);
    }
    found
}

/// Cheap structural signature check, used by `detect`.
pub(super) fn looks_like_flow(value: &Value) -> bool {
    let Some(object) = value.as_object() else {
        return false;
    };
    has_flow_fields(object)
        || wrappers(object)
            .into_iter()
            .filter_map(Value::as_object)
            .any(has_flow_fields)
}

/// Finds the single conversation flow in a payload.
///
/// Flow fields at both the outer level and inside a wrapper (or inside two
/// wrappers) are ambiguous and rejected rather than guessed.
pub(super) fn locate(format: Format, value: &Value) -> Result<FlowLocation<'_>, TranscodeError> {
    let object = value
        .as_object()
        .ok_or_else(|| TranscodeError::malformed(format, "expected a JSON object"))?;

    let outer = has_flow_fields(object);
    let inner: Vec<&Value> = wrappers(object)
        .into_iter()
        .filter(|v| v.as_object().is_some_and(has_flow_fields))
        .collect();

    match (outer, inner.as_slice()) {
        (true, []) => Ok(FlowLocation::Bare(value)),
        (false, [flow]) => Ok(FlowLocation::Wrapped {
            flow: *flow,
            agent: object,
        }),
        (true, [_, ..]) => Err(TranscodeError::Ambiguous {
            format,
            message: "conversation flow fields appear both at the top level and inside a wrapper"
                .to_string(),
        }),
        (false, [_, _, ..]) => Err(TranscodeError::Ambiguous {
            format,
            message: "more than one wrapper holds a conversation flow".to_string(),
        }),
        (false, []) => Err(TranscodeError::malformed(
            format,
            "no conversation flow found (expected `nodes`)",
        )),
    }
}
