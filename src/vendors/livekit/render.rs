//! Python source generation for LiveKit agents.

use crate::graph::{GREETING_KEY, Graph, Node, Tool, Transition};
use ahash::{AHashMap, AHashSet};
use itertools::Itertools;
use serde_json::Value;
use std::fmt::Write;

const INDENT: &str = "    ";

/// Renders one agent class per node plus an `entrypoint` that starts the entry agent.
pub(super) fn render(graph: &Graph) -> String {
    let class_names = class_names(graph);
    let class_of = |id: &str| {
        class_names
            .get(id)
            .cloned()
            .unwrap_or_else(|| pascal_case(id))
    };

    let mut out = String::new();
    out.push_str(
        "from livekit.agents import Agent, AgentSession, JobContext, RunContext, WorkerOptions, cli, function_tool\n",
    );
    if graph.default_model().is_some() {
        out.push_str("from livekit.plugins import openai\n");
    }

    for node in graph.nodes() {
        out.push_str("\n\n");
        render_class(&mut out, node, &class_of);
    }

    out.push_str("\n\nasync def entrypoint(ctx: JobContext):\n");
    let _ = writeln!(out, "{INDENT}await ctx.connect()");
    match graph.default_model() {
        Some(model) => {
            let _ = writeln!(
                out,
                "{INDENT}session = AgentSession(llm=openai.LLM(model={}))",
                python_string(model)
            );
        }
        None => {
            let _ = writeln!(out, "{INDENT}session = AgentSession()");
        }
    }
    let _ = writeln!(
        out,
        "{INDENT}await session.start(agent={}(), room=ctx.room)",
        class_of(graph.entry_node_id())
    );
    out.push_str("\n\nif __name__ == \"__main__\":\n");
    let _ = writeln!(out, "{INDENT}cli.run_app(WorkerOptions(entrypoint_fnc=entrypoint))");
    out
}

fn render_class(out: &mut String, node: &Node, class_of: &dyn Fn(&str) -> String) {
    let _ = writeln!(out, "class {}(Agent):", class_of(&node.id));
    let _ = writeln!(out, "{INDENT}def __init__(self) -> None:");
    let _ = writeln!(
        out,
        "{INDENT}{INDENT}super().__init__(instructions={})",
        python_string(&node.prompt)
    );

    if let Some(greeting) = node.metadata_str(GREETING_KEY) {
        out.push('\n');
        let _ = writeln!(out, "{INDENT}async def on_enter(self) -> None:");
        let _ = writeln!(
            out,
            "{INDENT}{INDENT}await self.session.generate_reply(instructions={})",
            python_string(greeting)
        );
    }

    let mut used: AHashSet<String> = ["__init__", "on_enter"].iter().map(|s| s.to_string()).collect();
    for transition in &node.transitions {
        let method = unique(&mut used, handoff_method(transition, &class_of(&transition.target_node_id)));
        out.push('\n');
        render_handoff(out, &method, transition, &class_of(&transition.target_node_id));
    }
    for tool in &node.tools {
        let method = unique(&mut used, snake_case(&tool.name));
        out.push('\n');
        render_tool(out, &method, tool);
    }
}

fn render_handoff(out: &mut String, method: &str, transition: &Transition, target_class: &str) {
    let _ = writeln!(out, "{INDENT}@function_tool()");
    let _ = writeln!(out, "{INDENT}async def {}(self, context: RunContext):", method);
    let _ = writeln!(out, "{INDENT}{INDENT}{}", python_string(&transition.condition.text()));
    let _ = writeln!(out, "{INDENT}{INDENT}return {}()", target_class);
}

fn render_tool(out: &mut String, method: &str, tool: &Tool) {
    let mut params = vec!["self".to_string(), "context: RunContext".to_string()];
    if let Some(properties) = tool.parameters.get("properties").and_then(Value::as_object) {
        let required: AHashSet<&str> = tool
            .parameters
            .get("required")
            .and_then(Value::as_array)
            .map(|r| r.iter().filter_map(Value::as_str).collect())
            .unwrap_or_default();
        // Python wants parameters with defaults last.
        let ordered = properties
            .iter()
            .sorted_by_key(|(name, _)| !required.contains(name.as_str()));
        for (name, schema) in ordered {
            let annotation = python_type(schema.get("type").and_then(Value::as_str));
            if required.contains(name.as_str()) {
                params.push(format!("{}: {}", name, annotation));
            } else {
                params.push(format!("{}: {} | None = None", name, annotation));
            }
        }
    }

    let _ = writeln!(out, "{INDENT}@function_tool()");
    let _ = writeln!(out, "{INDENT}async def {}({}):", method, params.join(", "));
    if !tool.description.is_empty() {
        let _ = writeln!(out, "{INDENT}{INDENT}{}", python_string(&tool.description));
    }
    let _ = writeln!(out, "{INDENT}{INDENT}return None");
}

fn python_type(json_type: Option<&str>) -> &'static str {
    match json_type {
        Some("integer") => "int",
        Some("number") => "float",
        Some("boolean") => "bool",
        Some("array") => "list",
        Some("object") => "dict",
        _ => "str",
    }
}

/// JSON string escaping is a valid Python string literal.
fn python_string(text: &str) -> String {
    serde_json::to_string(text).unwrap_or_else(|_| "\"\"".to_string())
}

fn handoff_method(transition: &Transition, target_class: &str) -> String {
    match transition.description.as_deref() {
        Some(d) if is_identifier(d) => d.to_string(),
        _ => format!("transfer_to_{}", snake_case(target_class)),
    }
}

/// Names the generated module imports; agent classes must not shadow them.
const RESERVED: [&str; 6] = ["Agent", "AgentSession", "JobContext", "RunContext", "WorkerOptions", "cli"];

fn class_names(graph: &Graph) -> AHashMap<String, String> {
    let mut used: AHashSet<String> = RESERVED.iter().map(|s| s.to_string()).collect();
    graph
        .nodes()
        .iter()
        .map(|n| {
            let base = if is_identifier(&n.id) && n.id.starts_with(|c: char| c.is_ascii_uppercase()) {
                n.id.clone()
            } else {
                pascal_case(&n.id)
            };
            (n.id.clone(), unique(&mut used, base))
        })
        .collect()
}

fn unique(used: &mut AHashSet<String>, base: String) -> String {
    let mut candidate = base.clone();
    let mut suffix = 2;
    while used.contains(&candidate) {
        candidate = format!("{}_{}", base, suffix);
        suffix += 1;
    }
    used.insert(candidate.clone());
    candidate
}

fn is_identifier(text: &str) -> bool {
    let mut chars = text.chars();
    chars
        .next()
        .is_some_and(|c| c.is_ascii_alphabetic() || c == '_')
        && chars.all(|c| c.is_ascii_alphanumeric() || c == '_')
}

fn words(text: &str) -> Vec<String> {
    let mut words = Vec::new();
    let mut current = String::new();
    let mut previous_lower = false;
    for c in text.chars() {
        if !c.is_ascii_alphanumeric() {
            if !current.is_empty() {
                words.push(std::mem::take(&mut current));
            }
            previous_lower = false;
            continue;
        }
        if c.is_ascii_uppercase() && previous_lower && !current.is_empty() {
            words.push(std::mem::take(&mut current));
        }
        previous_lower = c.is_ascii_lowercase() || c.is_ascii_digit();
        current.push(c);
    }
    if !current.is_empty() {
        words.push(current);
    }
    words
}

fn pascal_case(text: &str) -> String {
    let joined: String = words(text)
        .iter()
        .map(|w| {
            let mut chars = w.chars();
            match chars.next() {
                Some(first) => first.to_ascii_uppercase().to_string() + &chars.as_str().to_ascii_lowercase(),
                None => String::new(),
            }
        })
        .collect();
    match joined.chars().next() {
        Some(c) if c.is_ascii_alphabetic() => joined,
        Some(_) => format!("Agent{}", joined),
        None => "UnnamedAgent".to_string(),
    }
}

fn snake_case(text: &str) -> String {
    let joined = words(text)
        .iter()
        .map(|w| w.to_ascii_lowercase())
        .join("_");
    match joined.chars().next() {
        Some(c) if c.is_ascii_alphabetic() || c == '_' => joined,
        Some(_) => format!("tool_{}", joined),
        None => "unnamed_tool".to_string(),
    }
}
