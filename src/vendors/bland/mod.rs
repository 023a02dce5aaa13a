//! Bland AI conversational pathways: typed nodes plus labelled edges.

pub mod types;

use crate::error::TranscodeError;
use crate::graph::{
    Condition, DISPLAY_NAME_KEY, GLOBAL_PROMPT_KEY, GREETING_KEY, Graph, GraphBuilder, Node,
    NodeKind, POSITION_KEY, Tool, ToolKind, Transition,
};
use crate::transcode::{
    Format, Native, Passthrough, Payload, SynthesisOptions, Transcoder, coerce, expect_json,
    synthesize_terminal_nodes,
};
use serde_json::{Map, Value, json};
use tracing::debug;
use types::{Pathway, PathwayTool};

const FORMAT: Format = Format::Bland;

const GRAPH_PASSTHROUGH: Passthrough = Passthrough::new(&["name", "description", "globalConfig"]);

const NODE_PASSTHROUGH: Passthrough = Passthrough::new(&[
    "modelOptions",
    "extractVars",
    "condition",
    "isGlobal",
    "globalLabel",
    "transferNumber",
    "url",
    "method",
    "body",
    "responseData",
    "kb",
]);

fn kind_from_bland(node_type: &str) -> NodeKind {
    match node_type {
        "Default" => NodeKind::Conversation,
        "End Call" => NodeKind::End,
        "Transfer Call" => NodeKind::Transfer,
        other => NodeKind::Other(other.to_string()),
    }
}

fn kind_to_bland(kind: &NodeKind) -> &str {
    match kind {
        NodeKind::Conversation => "Default",
        NodeKind::End => "End Call",
        NodeKind::Transfer => "Transfer Call",
        NodeKind::Function => "Webhook",
        NodeKind::Other(name) => name,
    }
}

pub struct BlandTranscoder;

impl Transcoder for BlandTranscoder {
    fn format(&self) -> Format {
        FORMAT
    }

    fn detect(&self, payload: &Payload) -> bool {
        let Some(object) = payload.as_json().and_then(Value::as_object) else {
            return false;
        };
        let Some(nodes) = object.get("nodes").and_then(Value::as_array) else {
            return false;
        };
        let has_edges = object.get("edges").is_some_and(Value::is_array);
        let data_nodes = nodes
            .first()
            .is_some_and(|n| n.get("data").is_some_and(Value::is_object));
        has_edges || data_nodes
    }

    fn import(&self, payload: &Payload) -> Result<Graph, TranscodeError> {
        let value = expect_json(FORMAT, payload)?;
        let object = value
            .as_object()
            .ok_or_else(|| TranscodeError::malformed(FORMAT, "expected a JSON object"))?;
        let pathway: Pathway = coerce(FORMAT, value)?;

        let mut metadata = GRAPH_PASSTHROUGH.lift(object);
        if let Some(prompt) = pathway
            .global_config
            .as_ref()
            .and_then(|c| c.global_prompt.clone())
        {
            metadata.insert(GLOBAL_PROMPT_KEY.into(), prompt.into());
        }

        let mut builder = GraphBuilder::new();
        builder.source_format(FORMAT);

        let mut entry = None;
        for raw in &pathway.nodes {
            let data = &raw.data;
            let prompt = data
                .prompt
                .clone()
                .or_else(|| data.text.clone())
                .unwrap_or_default();
            let mut node = Node::new(raw.id.clone(), prompt).with_kind(kind_from_bland(&raw.node_type));
            node.metadata.extend(NODE_PASSTHROUGH.lift(&data.extra));
            if let Some(name) = &data.name {
                node.metadata.insert(DISPLAY_NAME_KEY.into(), name.clone().into());
            }
            if let Some(text) = &data.text {
                node.metadata.insert(GREETING_KEY.into(), text.clone().into());
            }
            if let Some(position) = &raw.position {
                node.metadata.insert(POSITION_KEY.into(), position.clone());
            }
            node.tools = data.tools.iter().map(tool_from_bland).collect();

            if data.is_start && entry.is_none() {
                entry = Some(raw.id.clone());
            }
            builder.add_node(node)?;
        }

        for edge in &pathway.edges {
            let label = edge
                .label
                .clone()
                .or_else(|| edge.data.as_ref().and_then(|d| d.label.clone()))
                .filter(|l| !l.trim().is_empty());
            let condition = label.map(Condition::prompt).unwrap_or(Condition::Always);
            builder.connect(edge.source.clone(), edge.target.clone(), condition, None);
        }

        if let Some(entry) = entry {
            builder.entry(entry);
        }
        builder.metadata(metadata);
        let graph = builder.build()?;
        debug!(nodes = graph.nodes().len(), edges = pathway.edges.len(), "imported bland pathway");
        Ok(graph)
    }

    fn export(&self, graph: &Graph) -> Result<Native, TranscodeError> {
        let mut graph = graph.clone();
        let summary = synthesize_terminal_nodes(&mut graph, SynthesisOptions::default());
        debug!(created = ?summary.created, "terminal synthesis for bland");

        let nodes: Vec<Value> = graph
            .nodes()
            .iter()
            .map(|node| pathway_node(node, node.id == graph.entry_node_id()))
            .collect();

        let mut edges = Vec::new();
        for (source, transition) in graph.transitions() {
            edges.push(pathway_edge(edges.len(), source, transition));
        }

        let mut out = Map::new();
        out.insert("nodes".into(), nodes.into());
        out.insert("edges".into(), edges.into());

        let mut global_config = graph
            .metadata()
            .get("globalConfig")
            .and_then(Value::as_object)
            .cloned()
            .unwrap_or_default();
        if let Some(prompt) = graph.metadata_str(GLOBAL_PROMPT_KEY) {
            global_config.insert("globalPrompt".into(), prompt.into());
        }
        if !global_config.is_empty() {
            out.insert("globalConfig".into(), Value::Object(global_config));
        }
        GRAPH_PASSTHROUGH.lower(graph.metadata(), &mut out);
        Ok(Native::Json(Value::Object(out)))
    }
}

fn pathway_node(node: &Node, is_start: bool) -> Value {
    let mut data = Map::new();
    data.insert(
        "name".into(),
        node.metadata_str(DISPLAY_NAME_KEY).unwrap_or(&node.id).into(),
    );
    data.insert("prompt".into(), node.prompt.clone().into());
    if let Some(greeting) = node.metadata_str(GREETING_KEY) {
        data.insert("text".into(), greeting.into());
    }
    if is_start {
        data.insert("isStart".into(), true.into());
    }
    let tools: Vec<Value> = node
        .tools
        .iter()
        .filter(|t| !t.kind.is_terminal())
        .map(tool_to_bland)
        .collect();
    if !tools.is_empty() {
        data.insert("tools".into(), tools.into());
    }
    NODE_PASSTHROUGH.lower(&node.metadata, &mut data);

    let mut out = Map::new();
    out.insert("id".into(), node.id.clone().into());
    out.insert("type".into(), kind_to_bland(&node.kind()).into());
    out.insert("data".into(), Value::Object(data));
    if let Some(position) = node.metadata.get(POSITION_KEY) {
        out.insert("position".into(), position.clone());
    }
    Value::Object(out)
}

fn pathway_edge(index: usize, source: &str, transition: &Transition) -> Value {
    let mut out = Map::new();
    out.insert("id".into(), format!("edge_{}", index + 1).into());
    out.insert("source".into(), source.into());
    out.insert("target".into(), transition.target_node_id.clone().into());
    if transition.condition != Condition::Always {
        out.insert("label".into(), transition.condition.text().into());
    }
    Value::Object(out)
}

fn tool_from_bland(tool: &PathwayTool) -> Tool {
    let mut canonical = Tool::new(tool.name.clone(), ToolKind::from(tool.tool_type.as_str()))
        .with_description(tool.description.clone());
    canonical.parameters = tool.parameters.clone().unwrap_or(Value::Null);
    canonical.url = tool.url.clone();
    canonical
}

fn tool_to_bland(tool: &Tool) -> Value {
    let mut out = json!({
        "name": tool.name,
        "type": tool.kind.as_str(),
        "description": tool.description,
    });
    if let Some(object) = out.as_object_mut() {
        if !tool.parameters.is_null() {
            object.insert("parameters".into(), tool.parameters.clone());
        }
        if let Some(url) = &tool.url {
            object.insert("url".into(), url.clone().into());
        }
    }
    out
}
