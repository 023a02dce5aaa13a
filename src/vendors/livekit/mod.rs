//! LiveKit Agents: graphs mined from Python source, exported as Python source.

mod mining;
mod render;

use crate::error::TranscodeError;
use crate::graph::{Condition, GREETING_KEY, Graph, GraphBuilder, Node};
use crate::transcode::{Format, Native, Payload, Transcoder, dedup_node_tools};
use once_cell::sync::Lazy;
use regex::Regex;
use tracing::{debug, warn};

const FORMAT: Format = Format::LiveKit;

/// Id of the node produced when the source declares no agent class.
const FALLBACK_NODE: &str = "agent";

static LIVEKIT_IMPORT: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"(?m)^\s*(?:from|import)\s+livekit\b").expect("valid regex")
});
static AGENT_SUBCLASS: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"(?m)^\s*class\s+\w+\s*\([^)]*\bAgent\b").expect("valid regex")
});

pub struct LiveKitTranscoder;

impl Transcoder for LiveKitTranscoder {
    fn format(&self) -> Format {
        FORMAT
    }

    fn detect(&self, payload: &Payload) -> bool {
        match payload {
            Payload::Source(text) => LIVEKIT_IMPORT.is_match(text) || AGENT_SUBCLASS.is_match(text),
            _ => false,
        }
    }

    fn import(&self, payload: &Payload) -> Result<Graph, TranscodeError> {
        let Payload::Source(text) = payload else {
            return Err(TranscodeError::malformed(FORMAT, "expected Python source text"));
        };
        let mined = mining::mine(text).map_err(|e| TranscodeError::malformed(FORMAT, e))?;

        let mut builder = GraphBuilder::new();
        builder.source_format(FORMAT);
        builder.default_model(mined.default_model.clone());

        if mined.agents.is_empty() {
            warn!("no agent classes found; producing a single fallback node");
            builder.add_node(Node::new(
                FALLBACK_NODE,
                mined.loose_instructions.clone().unwrap_or_default(),
            ))?;
            return Ok(builder.build()?);
        }

        for agent in &mined.agents {
            let mut node = Node::new(
                agent.class_name.clone(),
                agent.instructions.clone().unwrap_or_default(),
            );
            if let Some(greeting) = &agent.greeting {
                node.metadata.insert(GREETING_KEY.into(), greeting.clone().into());
            }
            node.tools = dedup_node_tools(agent.tools.clone());
            builder.add_node(node)?;

            for handoff in &agent.handoffs {
                let condition = handoff
                    .docstring
                    .clone()
                    .filter(|d| !d.is_empty())
                    .unwrap_or_else(|| handoff.method.replace('_', " "));
                builder.connect(
                    agent.class_name.clone(),
                    handoff.target.clone(),
                    Condition::prompt(condition),
                    Some(handoff.method.clone()),
                );
            }
        }

        if let Some(entry) = &mined.entry {
            builder.entry(entry.clone());
        }
        let graph = builder.build()?;
        debug!(
            agents = mined.agents.len(),
            entry = graph.entry_node_id(),
            "mined livekit source"
        );
        Ok(graph)
    }

    fn export(&self, graph: &Graph) -> Result<Native, TranscodeError> {
        Ok(Native::Source(render::render(graph)))
    }
}
