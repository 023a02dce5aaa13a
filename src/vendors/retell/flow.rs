use super::envelope::{AGENT_KEY, AGENT_PASSTHROUGH, FlowLocation, locate, looks_like_flow};
use super::types::{ConversationFlow, FlowEdge, TransitionCondition};
use super::{tool_from_retell, tool_id, tool_to_retell};
use crate::error::TranscodeError;
use crate::graph::{
    Condition, DISPLAY_NAME_KEY, GLOBAL_PROMPT_KEY, Graph, GraphBuilder, Node, NodeKind,
    POSITION_KEY, TRANSFER_FAILED, Tool, Transition,
};
use crate::transcode::{
    Format, Native, Passthrough, Payload, SynthesisOptions, TerminalPolicy, Transcoder, coerce,
    expect_json, export_tools, synthesize_terminal_nodes,
};
use ahash::{AHashMap, AHashSet};
use serde_json::{Map, Value, json};
use tracing::debug;

const FORMAT: Format = Format::RetellFlow;

const FLOW_PASSTHROUGH: Passthrough = Passthrough::new(&[
    "conversation_flow_id",
    "version",
    "start_speaker",
    "model_temperature",
    "knowledge_base_ids",
    "default_dynamic_variables",
    "begin_after_user_silence_ms",
]);

const NODE_PASSTHROUGH: Passthrough = Passthrough::new(&[
    "transfer_destination",
    "transfer_option",
    "speak_during_execution",
    "wait_for_result",
    "tool_type",
    "interruption_sensitivity",
    "global_node_setting",
    "knowledge_base_ids",
    "finetune_transition_examples",
    "finetune_conversation_examples",
]);

/// Node metadata key remembering a non-prompt instruction type (e.g. `static_text`).
const INSTRUCTION_TYPE_KEY: &str = "instruction_type";

/// Prompt text of an unconditional edge. Only one fits in `skip_response_edge`.
const SKIP_RESPONSE: &str = "Skip response";

/// Operators of a Retell equation, longest first so prefixes never shadow.
const EQUATION_OPERATORS: [&str; 10] = [
    "not_contains",
    "not_exist",
    "contains",
    "exists",
    "==",
    "!=",
    ">=",
    "<=",
    ">",
    "<",
];

/// Retell's node-based conversation flow. End and transfer are nodes here,
/// so export runs terminal-node synthesis first.
pub struct RetellFlowTranscoder;

impl RetellFlowTranscoder {
    /// The UI-importable agent: agent-level fields plus the flow under
    /// `conversationFlow`, with a `conversation-flow` response engine.
    pub fn export_agent_envelope(&self, graph: &Graph) -> Native {
        let mut out = Map::new();
        if let Some(agent) = graph.metadata().get(AGENT_KEY).and_then(Value::as_object) {
            AGENT_PASSTHROUGH.lower(agent, &mut out);
        }
        out.insert(
            "response_engine".into(),
            json!({ "type": "conversation-flow" }),
        );
        out.insert("conversationFlow".into(), Value::Object(flow_object(graph)));
        Native::Json(Value::Object(out))
    }
}

impl Transcoder for RetellFlowTranscoder {
    fn format(&self) -> Format {
        FORMAT
    }

    fn detect(&self, payload: &Payload) -> bool {
        payload.as_json().is_some_and(looks_like_flow)
    }

    fn import(&self, payload: &Payload) -> Result<Graph, TranscodeError> {
        let value = expect_json(FORMAT, payload)?;
        let (flow_value, agent) = match locate(FORMAT, value)? {
            FlowLocation::Bare(flow) => (flow, None),
            FlowLocation::Wrapped { flow, agent } => (flow, Some(agent)),
        };
        let flow: ConversationFlow = coerce(FORMAT, flow_value)?;
        let flow_object = flow_value
            .as_object()
            .ok_or_else(|| TranscodeError::malformed(FORMAT, "flow must be an object"))?;

        let mut metadata = FLOW_PASSTHROUGH.lift(flow_object);
        if let Some(prompt) = &flow.global_prompt {
            metadata.insert(GLOBAL_PROMPT_KEY.into(), prompt.clone().into());
        }
        if let Some(agent) = agent {
            let lifted = AGENT_PASSTHROUGH.lift(agent);
            if !lifted.is_empty() {
                metadata.insert(AGENT_KEY.into(), Value::Object(lifted));
            }
        }

        let entry_id = flow
            .start_node_id
            .clone()
            .or_else(|| flow.nodes.first().map(|n| n.id.clone()))
            .ok_or_else(|| TranscodeError::malformed(FORMAT, "flow has no nodes"))?;

        let tools: AHashMap<String, Tool> = flow
            .tools
            .iter()
            .map(tool_from_retell)
            .map(|t| (tool_id(&t), t))
            .collect();
        let referenced: AHashSet<&str> =
            flow.nodes.iter().filter_map(|n| n.tool_id.as_deref()).collect();

        let mut builder = GraphBuilder::new();
        builder.source_format(FORMAT);
        builder.default_model(flow.model_choice.as_ref().and_then(|m| m.model.clone()));

        for raw in &flow.nodes {
            let instruction = raw.instruction.as_ref();
            let mut node = Node::new(
                raw.id.clone(),
                instruction.map(|i| i.text.clone()).unwrap_or_default(),
            )
            .with_kind(NodeKind::parse(&raw.node_type));
            node.metadata.extend(NODE_PASSTHROUGH.lift(&raw.extra));
            if let Some(name) = &raw.name {
                node.metadata.insert(DISPLAY_NAME_KEY.into(), name.clone().into());
            }
            if let Some(position) = &raw.display_position {
                node.metadata.insert(POSITION_KEY.into(), position.clone());
            }
            if let Some(kind) = instruction.map(|i| i.kind.as_str()).filter(|k| *k != "prompt") {
                node.metadata.insert(INSTRUCTION_TYPE_KEY.into(), kind.into());
            }

            if let Some(id) = &raw.tool_id {
                let tool = tools.get(id).ok_or_else(|| {
                    TranscodeError::malformed(
                        FORMAT,
                        format!("node '{}' references unknown tool '{}'", raw.id, id),
                    )
                })?;
                node.tools.push(tool.clone());
            }
            if raw.id == entry_id {
                // Tools no function node claims stay reachable from the entry.
                node.tools.extend(
                    flow.tools
                        .iter()
                        .map(tool_from_retell)
                        .filter(|t| !referenced.contains(tool_id(t).as_str())),
                );
            }
            builder.add_node(node)?;

            for edge in &raw.edges {
                let (target, condition) = edge_parts(&raw.id, edge)?;
                builder.connect(raw.id.clone(), target, condition, None);
            }
            if let Some(edge) = &raw.skip_response_edge {
                let (target, _) = edge_parts(&raw.id, edge)?;
                builder.connect(raw.id.clone(), target, Condition::Always, None);
            }
            if let Some(edge) = &raw.edge {
                let (target, condition) = edge_parts(&raw.id, edge)?;
                builder.connect(
                    raw.id.clone(),
                    target,
                    condition,
                    Some(TRANSFER_FAILED.to_string()),
                );
            }
        }

        builder.entry(entry_id);
        builder.metadata(metadata);
        let graph = builder.build()?;
        debug!(nodes = graph.nodes().len(), wrapped = agent.is_some(), "imported retell flow");
        Ok(graph)
    }

    fn export(&self, graph: &Graph) -> Result<Native, TranscodeError> {
        Ok(Native::Json(Value::Object(flow_object(graph))))
    }
}

fn edge_parts(node_id: &str, edge: &FlowEdge) -> Result<(String, Condition), TranscodeError> {
    let target = edge.destination_node_id.clone().ok_or_else(|| {
        TranscodeError::malformed(
            FORMAT,
            format!("edge on node '{}' has no destination_node_id", node_id),
        )
    })?;
    let condition = match &edge.transition_condition {
        Some(TransitionCondition::Prompt { prompt }) if prompt == SKIP_RESPONSE => Condition::Always,
        Some(TransitionCondition::Prompt { prompt }) => Condition::prompt(prompt.clone()),
        Some(TransitionCondition::Equation {
            equations,
            operator,
        }) => {
            let clauses: Vec<String> = equations
                .iter()
                .map(|e| match &e.right {
                    Some(right) => format!("{} {} {}", e.left, e.operator, right),
                    None => format!("{} {}", e.left, e.operator),
                })
                .collect();
            Condition::equation(clauses.join(&format!(" {} ", operator)))
        }
        None => Condition::Always,
    };
    Ok((target, condition))
}

/// Builds the bare conversation-flow object, synthesizing terminal nodes first.
fn flow_object(graph: &Graph) -> Map<String, Value> {
    let mut graph = graph.clone();
    let summary = synthesize_terminal_nodes(
        &mut graph,
        SynthesisOptions {
            failure_edges: true,
        },
    );
    debug!(created = ?summary.created, edges = summary.edges_added, "terminal synthesis for retell flow");

    let tools = export_tools(&graph, TerminalPolicy::Exclude);
    let nodes: Vec<Value> = graph.nodes().iter().map(flow_node).collect();

    let mut out = Map::new();
    out.insert("start_node_id".into(), graph.entry_node_id().into());
    out.insert("nodes".into(), nodes.into());
    if !tools.is_empty() {
        let tools: Vec<Value> = tools.iter().map(|t| tool_to_retell(t, true)).collect();
        out.insert("tools".into(), tools.into());
    }
    if let Some(model) = graph.default_model() {
        out.insert(
            "model_choice".into(),
            json!({ "type": "cascading", "model": model }),
        );
    }
    if let Some(prompt) = graph.metadata_str(GLOBAL_PROMPT_KEY) {
        out.insert("global_prompt".into(), prompt.into());
    }
    FLOW_PASSTHROUGH.lower(graph.metadata(), &mut out);
    out
}

fn flow_node(node: &Node) -> Value {
    let kind = node.kind();
    let mut out = Map::new();
    out.insert("id".into(), node.id.clone().into());
    out.insert("type".into(), kind.as_str().into());
    out.insert(
        "name".into(),
        node.metadata_str(DISPLAY_NAME_KEY)
            .unwrap_or(&node.id)
            .into(),
    );
    out.insert(
        "instruction".into(),
        json!({
            "type": node.metadata_str(INSTRUCTION_TYPE_KEY).unwrap_or("prompt"),
            "text": node.prompt,
        }),
    );

    if kind == NodeKind::Function {
        if let Some(tool) = node.tools.iter().find(|t| !t.kind.is_terminal()) {
            out.insert("tool_id".into(), tool_id(tool).into());
        }
    }

    let mut edges = Vec::new();
    for (index, transition) in node.transitions.iter().enumerate() {
        let edge_id = format!("edge_{}_{}", node.id, index);
        if transition.is_transfer_failure() && kind == NodeKind::Transfer {
            out.insert("edge".into(), flow_edge(&edge_id, transition));
        } else if transition.condition == Condition::Always && !out.contains_key("skip_response_edge") {
            out.insert("skip_response_edge".into(), flow_edge(&edge_id, transition));
        } else {
            edges.push(flow_edge(&edge_id, transition));
        }
    }
    if !edges.is_empty() {
        out.insert("edges".into(), edges.into());
    }

    if let Some(position) = node.metadata.get(POSITION_KEY) {
        out.insert("display_position".into(), position.clone());
    }
    NODE_PASSTHROUGH.lower(&node.metadata, &mut out);
    Value::Object(out)
}

fn flow_edge(id: &str, transition: &Transition) -> Value {
    let condition = match &transition.condition {
        Condition::Equation { expression } => {
            equation_condition(expression).unwrap_or_else(|| prompt_condition(expression))
        }
        Condition::Always => prompt_condition(SKIP_RESPONSE),
        other => prompt_condition(&other.text()),
    };
    json!({
        "id": id,
        "destination_node_id": transition.target_node_id,
        "transition_condition": condition,
    })
}

fn prompt_condition(text: &str) -> Value {
    json!({ "type": "prompt", "prompt": text })
}

/// Parses `a == 1 && b exists` back into Retell's equation object.
fn equation_condition(expression: &str) -> Option<Value> {
    let (joiner, parts): (&str, Vec<&str>) = if expression.contains(" || ") {
        if expression.contains(" && ") {
            return None;
        }
        ("||", expression.split(" || ").collect())
    } else {
        ("&&", expression.split(" && ").collect())
    };

    let equations = parts
        .into_iter()
        .map(parse_clause)
        .collect::<Option<Vec<Value>>>()?;
    Some(json!({ "type": "equation", "equations": equations, "operator": joiner }))
}

fn parse_clause(clause: &str) -> Option<Value> {
    let clause = clause.trim();
    for operator in EQUATION_OPERATORS {
        let spaced = format!(" {} ", operator);
        if let Some((left, right)) = clause.split_once(&spaced) {
            return Some(json!({ "left": left.trim(), "operator": operator, "right": right.trim() }));
        }
        if let Some(left) = clause.strip_suffix(&format!(" {}", operator)) {
            return Some(json!({ "left": left.trim(), "operator": operator }));
        }
    }
    None
}
