use super::types::RetellLlm;
use super::{tool_from_retell, tool_to_retell};
use crate::error::TranscodeError;
use crate::graph::{Condition, GLOBAL_PROMPT_KEY, Graph, GraphBuilder, Node, Tool, Transition};
use crate::transcode::{
    Format, Native, Passthrough, Payload, TerminalPolicy, Transcoder, coerce, dedup_node_tools,
    expect_json, export_tools, shared_tool_names,
};
use ahash::AHashMap;
use serde_json::{Map, Value};
use tracing::debug;

const FORMAT: Format = Format::RetellLlm;

/// Id of the only node of a single-prompt LLM (one without states).
const SINGLE_PROMPT_NODE: &str = "main";

const PASSTHROUGH: Passthrough = Passthrough::new(&[
    "llm_id",
    "version",
    "begin_message",
    "model_temperature",
    "start_speaker",
    "knowledge_base_ids",
    "default_dynamic_variables",
    "inbound_dynamic_variables_webhook_url",
]);

/// Retell's multi-state LLM: a global prompt plus named states with
/// state-local prompts, tools, and description-driven edges.
pub struct RetellLlmTranscoder;

impl Transcoder for RetellLlmTranscoder {
    fn format(&self) -> Format {
        FORMAT
    }

    fn detect(&self, payload: &Payload) -> bool {
        let Some(object) = payload.as_json().and_then(Value::as_object) else {
            return false;
        };
        if ["nodes", "conversationFlow", "response_engine", "members"]
            .iter()
            .any(|k| object.contains_key(*k))
        {
            return false;
        }
        // Vapi's `model` is an object; Retell's is a plain model name.
        let model_is_name = matches!(object.get("model"), None | Some(Value::String(_)));
        let has_states = object.get("states").is_some_and(Value::is_array);
        let has_general_prompt = object.get("general_prompt").is_some_and(Value::is_string);
        model_is_name && (has_states || has_general_prompt)
    }

    fn import(&self, payload: &Payload) -> Result<Graph, TranscodeError> {
        let value = expect_json(FORMAT, payload)?;
        let object = value
            .as_object()
            .ok_or_else(|| TranscodeError::malformed(FORMAT, "expected a JSON object"))?;
        let llm: RetellLlm = coerce(FORMAT, value)?;

        let mut metadata = PASSTHROUGH.lift(object);
        let general_tools: Vec<Tool> = llm.general_tools.iter().map(tool_from_retell).collect();

        let mut builder = GraphBuilder::new();
        builder.source_format(FORMAT);
        builder.default_model(llm.model.clone());

        if llm.states.is_empty() {
            let node = Node {
                tools: dedup_node_tools(general_tools),
                ..Node::new(SINGLE_PROMPT_NODE, llm.general_prompt.clone().unwrap_or_default())
            };
            builder.add_node(node)?;
        } else {
            if let Some(prompt) = &llm.general_prompt {
                metadata.insert(GLOBAL_PROMPT_KEY.to_string(), prompt.clone().into());
            }

            // One definition per terminal tool name, shared by every state.
            let mut terminal: AHashMap<String, Tool> = AHashMap::new();
            for state in &llm.states {
                if state.name.trim().is_empty() {
                    return Err(TranscodeError::malformed(FORMAT, "state with an empty name"));
                }

                let mut tools: Vec<Tool> = state.tools.iter().map(tool_from_retell).collect();
                tools.extend(general_tools.iter().cloned());
                let tools = tools
                    .into_iter()
                    .map(|tool| {
                        if tool.kind.is_terminal() {
                            terminal.entry(tool.name.clone()).or_insert(tool).clone()
                        } else {
                            tool
                        }
                    })
                    .collect();

                builder.add_node(Node {
                    tools: dedup_node_tools(tools),
                    ..Node::new(state.name.clone(), state.state_prompt.clone())
                })?;

                for edge in &state.edges {
                    builder.connect(
                        state.name.clone(),
                        edge.destination_state_name.clone(),
                        Condition::prompt(edge.description.clone()),
                        None,
                    );
                }
            }

            if let Some(start) = &llm.starting_state {
                builder.entry(start.clone());
            }
        }

        builder.metadata(metadata);
        let graph = builder.build()?;
        debug!(states = llm.states.len(), "imported retell llm");
        Ok(graph)
    }

    fn export(&self, graph: &Graph) -> Result<Native, TranscodeError> {
        let mut out = Map::new();
        if let Some(model) = graph.default_model() {
            out.insert("model".into(), model.into());
        }

        let entry = graph.entry_node();
        let single_prompt = graph.nodes().len() == 1
            && entry.transitions.is_empty()
            && !graph.metadata().contains_key(GLOBAL_PROMPT_KEY);

        if single_prompt {
            out.insert("general_prompt".into(), entry.prompt.clone().into());
            let tools: Vec<Value> = entry.tools.iter().map(|t| tool_to_retell(t, false)).collect();
            if !tools.is_empty() {
                out.insert("general_tools".into(), tools.into());
            }
        } else {
            if let Some(prompt) = graph.metadata_str(GLOBAL_PROMPT_KEY) {
                out.insert("general_prompt".into(), prompt.into());
            }

            let shared = shared_tool_names(graph);
            let general: Vec<Value> = export_tools(graph, TerminalPolicy::Keep)
                .iter()
                .filter(|t| shared.contains(&t.name))
                .map(|t| tool_to_retell(t, false))
                .collect();
            if !general.is_empty() {
                out.insert("general_tools".into(), general.into());
            }

            let states: Vec<Value> = graph
                .nodes()
                .iter()
                .map(|node| {
                    let mut state = Map::new();
                    state.insert("name".into(), node.id.clone().into());
                    state.insert("state_prompt".into(), node.prompt.clone().into());
                    let edges: Vec<Value> = node.transitions.iter().map(state_edge).collect();
                    if !edges.is_empty() {
                        state.insert("edges".into(), edges.into());
                    }
                    let tools: Vec<Value> = node
                        .tools
                        .iter()
                        .filter(|t| !shared.contains(&t.name))
                        .map(|t| tool_to_retell(t, false))
                        .collect();
                    if !tools.is_empty() {
                        state.insert("tools".into(), tools.into());
                    }
                    Value::Object(state)
                })
                .collect();
            out.insert("states".into(), states.into());
            out.insert("starting_state".into(), graph.entry_node_id().into());
        }

        PASSTHROUGH.lower(graph.metadata(), &mut out);
        Ok(Native::Json(Value::Object(out)))
    }
}

fn state_edge(transition: &Transition) -> Value {
    let description = match &transition.condition {
        Condition::LlmPrompt { prompt } => prompt.clone(),
        Condition::Always => "Proceed to the next state".to_string(),
        other => other.text(),
    };
    serde_json::json!({
        "destination_state_name": transition.target_node_id,
        "description": description,
    })
}
