//! Static analysis of LiveKit agent source with the tree-sitter Python grammar.
//!
//! Recognised agents are classes whose base is `Agent` (under any module
//! prefix) or another recognised class. A `@function_tool` method is a
//! handoff when one of its `return` statements constructs a recognised class,
//! directly or as the first element of a tuple. Indirect returns through a
//! local variable are not followed.

use crate::graph::{Tool, ToolKind};
use ahash::{AHashMap, AHashSet};
use serde_json::{Map, Value, json};
use tree_sitter::{Node, Parser};

const AGENT_BASE: &str = "Agent";
const END_CALL_METHODS: [&str; 3] = ["end_call", "hang_up", "hangup"];

/// A recognised agent class.
#[derive(Debug, Clone, PartialEq)]
pub(super) struct MinedAgent {
    pub class_name: String,
    pub instructions: Option<String>,
    pub greeting: Option<String>,
    pub handoffs: Vec<Handoff>,
    pub tools: Vec<Tool>,
}

/// A `@function_tool` method that returns another agent.
#[derive(Debug, Clone, PartialEq)]
pub(super) struct Handoff {
    pub method: String,
    pub docstring: Option<String>,
    pub target: String,
}

#[derive(Debug, Default)]
pub(super) struct MinedSource {
    pub agents: Vec<MinedAgent>,
    /// Class passed as `agent=` to `session.start(...)`.
    pub entry: Option<String>,
    pub default_model: Option<String>,
    /// First `instructions=` string anywhere, used when no class is recognised.
    pub loose_instructions: Option<String>,
}

struct ClassInfo<'t> {
    name: String,
    bases: Vec<String>,
    node: Node<'t>,
}

fn node_text(node: Node, source: &[u8]) -> String {
    std::str::from_utf8(&source[node.byte_range()])
        .unwrap_or("")
        .to_string()
}

fn named_children<'t>(node: Node<'t>) -> Vec<Node<'t>> {
    node.named_children(&mut node.walk()).collect()
}

/// `openai.LLM` -> `LLM`, `Agent` -> `Agent`.
fn last_segment(node: Node, source: &[u8]) -> Option<String> {
    match node.kind() {
        "identifier" => Some(node_text(node, source)),
        "attribute" => node
            .child_by_field_name("attribute")
            .map(|a| node_text(a, source)),
        _ => None,
    }
}

pub(super) fn mine(text: &str) -> Result<MinedSource, String> {
    let mut parser = Parser::new();
    parser
        .set_language(&tree_sitter_python::LANGUAGE.into())
        .map_err(|e| format!("failed to load the Python grammar: {}", e))?;
    let tree = parser
        .parse(text, None)
        .ok_or_else(|| "failed to parse Python source".to_string())?;
    let source = text.as_bytes();
    let root = tree.root_node();

    let mut classes = Vec::new();
    collect_classes(root, source, &mut classes);
    let recognized = recognize(&classes);

    let mut mined = MinedSource::default();
    let mut by_name: AHashMap<String, usize> = AHashMap::new();
    for class in classes.iter().filter(|c| recognized.contains(&c.name)) {
        if by_name.contains_key(&class.name) {
            continue;
        }
        by_name.insert(class.name.clone(), mined.agents.len());
        mined.agents.push(mine_class(class, source, &recognized));
    }

    // Subclasses without their own instructions inherit them.
    for class in &classes {
        let Some(&slot) = by_name.get(&class.name) else {
            continue;
        };
        if mined.agents[slot].instructions.is_some() {
            continue;
        }
        let inherited = class
            .bases
            .iter()
            .filter_map(|b| by_name.get(b))
            .find_map(|&i| mined.agents[i].instructions.clone());
        mined.agents[slot].instructions = inherited;
    }

    let mut calls = Vec::new();
    collect_kind(root, "call", &mut calls);
    mined.entry = calls
        .iter()
        .find_map(|call| session_start_agent(*call, source, &recognized));
    mined.default_model = calls.iter().find_map(|call| session_model(*call, source));
    mined.loose_instructions = calls
        .iter()
        .find_map(|call| keyword_string(*call, "instructions", source));
    Ok(mined)
}

fn collect_classes<'t>(node: Node<'t>, source: &[u8], out: &mut Vec<ClassInfo<'t>>) {
    if node.kind() == "class_definition" {
        if let Some(name) = node.child_by_field_name("name") {
            let bases = node
                .child_by_field_name("superclasses")
                .map(|list| {
                    named_children(list)
                        .into_iter()
                        .filter_map(|b| last_segment(b, source))
                        .collect()
                })
                .unwrap_or_default();
            out.push(ClassInfo {
                name: node_text(name, source),
                bases,
                node,
            });
        }
    }
    for child in named_children(node) {
        collect_classes(child, source, out);
    }
}

fn collect_kind<'t>(node: Node<'t>, kind: &str, out: &mut Vec<Node<'t>>) {
    if node.kind() == kind {
        out.push(node);
    }
    for child in named_children(node) {
        collect_kind(child, kind, out);
    }
}

/// Fixed point over the inheritance relation.
fn recognize(classes: &[ClassInfo]) -> AHashSet<String> {
    let mut recognized = AHashSet::new();
    loop {
        let before = recognized.len();
        for class in classes {
            if class
                .bases
                .iter()
                .any(|b| b == AGENT_BASE || recognized.contains(b))
            {
                recognized.insert(class.name.clone());
            }
        }
        if recognized.len() == before {
            return recognized;
        }
    }
}

fn mine_class(class: &ClassInfo, source: &[u8], recognized: &AHashSet<String>) -> MinedAgent {
    let mut agent = MinedAgent {
        class_name: class.name.clone(),
        instructions: None,
        greeting: None,
        handoffs: Vec::new(),
        tools: Vec::new(),
    };
    let Some(body) = class.node.child_by_field_name("body") else {
        return agent;
    };

    for item in named_children(body) {
        let (decorators, function) = match item.kind() {
            "function_definition" => (Vec::new(), item),
            "decorated_definition" => {
                let Some(definition) = item
                    .child_by_field_name("definition")
                    .filter(|d| d.kind() == "function_definition")
                else {
                    continue;
                };
                let decorators: Vec<Node> = named_children(item)
                    .into_iter()
                    .filter(|c| c.kind() == "decorator")
                    .collect();
                (decorators, definition)
            }
            _ => continue,
        };
        let Some(name) = function
            .child_by_field_name("name")
            .map(|n| node_text(n, source))
        else {
            continue;
        };

        if name == "__init__" {
            agent.instructions = super_init_instructions(function, source);
        } else if name == "on_enter" {
            agent.greeting = entry_greeting(function, source);
        } else if decorators.iter().any(|d| is_function_tool(*d, source)) {
            let docstring = docstring(function, source);
            match returned_agent(function, source, recognized) {
                Some(target) => agent.handoffs.push(Handoff {
                    method: name,
                    docstring,
                    target,
                }),
                None => agent.tools.push(method_tool(name, docstring, function, source)),
            }
        }
    }
    agent
}

fn is_function_tool(decorator: Node, source: &[u8]) -> bool {
    let Some(expression) = named_children(decorator).into_iter().next() else {
        return false;
    };
    let callee = if expression.kind() == "call" {
        expression.child_by_field_name("function")
    } else {
        Some(expression)
    };
    callee
        .and_then(|c| last_segment(c, source))
        .is_some_and(|name| name == "function_tool")
}

/// `super().__init__(instructions=...)` inside `__init__`.
fn super_init_instructions(function: Node, source: &[u8]) -> Option<String> {
    let mut calls = Vec::new();
    collect_kind(function, "call", &mut calls);
    calls.into_iter().find_map(|call| {
        let callee = call.child_by_field_name("function")?;
        if callee.kind() != "attribute" || last_segment(callee, source)? != "__init__" {
            return None;
        }
        let object = callee.child_by_field_name("object")?;
        let is_super = object.kind() == "call"
            && object
                .child_by_field_name("function")
                .is_some_and(|f| node_text(f, source) == "super");
        if !is_super {
            return None;
        }
        keyword_string(call, "instructions", source)
    })
}

/// What the agent says or is told to say when it becomes active.
fn entry_greeting(function: Node, source: &[u8]) -> Option<String> {
    let mut calls = Vec::new();
    collect_kind(function, "call", &mut calls);
    calls.into_iter().find_map(|call| {
        let callee = call.child_by_field_name("function")?;
        match last_segment(callee, source)?.as_str() {
            "generate_reply" => keyword_string(call, "instructions", source),
            "say" => {
                let arguments = call.child_by_field_name("arguments")?;
                named_children(arguments)
                    .into_iter()
                    .next()
                    .and_then(|first| string_value(first, source))
            }
            _ => None,
        }
    })
}

fn keyword_argument<'t>(call: Node<'t>, keyword: &str, source: &[u8]) -> Option<Node<'t>> {
    let arguments = call.child_by_field_name("arguments")?;
    named_children(arguments).into_iter().find_map(|arg| {
        if arg.kind() != "keyword_argument" {
            return None;
        }
        let name = arg.child_by_field_name("name")?;
        if node_text(name, source) == keyword {
            arg.child_by_field_name("value")
        } else {
            None
        }
    })
}

fn keyword_string(call: Node, keyword: &str, source: &[u8]) -> Option<String> {
    keyword_argument(call, keyword, source).and_then(|v| string_value(v, source))
}

/// `session.start(agent=Greeter(), ...)`.
fn session_start_agent(call: Node, source: &[u8], recognized: &AHashSet<String>) -> Option<String> {
    let callee = call.child_by_field_name("function")?;
    if callee.kind() != "attribute" || last_segment(callee, source)? != "start" {
        return None;
    }
    let agent = keyword_argument(call, "agent", source)?;
    constructed_class(agent, source, recognized)
}

/// `AgentSession(llm=openai.LLM(model="gpt-4o"))` or `llm="openai/gpt-4o"`.
fn session_model(call: Node, source: &[u8]) -> Option<String> {
    let callee = call.child_by_field_name("function")?;
    match last_segment(callee, source)?.as_str() {
        "LLM" => keyword_string(call, "model", source),
        "AgentSession" => keyword_string(call, "llm", source),
        _ => None,
    }
}

fn docstring(function: Node, source: &[u8]) -> Option<String> {
    let body = function.child_by_field_name("body")?;
    let first = named_children(body).into_iter().next()?;
    if first.kind() != "expression_statement" {
        return None;
    }
    let expression = named_children(first).into_iter().next()?;
    string_value(expression, source).map(|s| clean_docstring(&s))
}

fn returned_agent(function: Node, source: &[u8], recognized: &AHashSet<String>) -> Option<String> {
    let body = function.child_by_field_name("body")?;
    find_return(body, source, recognized)
}

fn find_return(node: Node, source: &[u8], recognized: &AHashSet<String>) -> Option<String> {
    for child in named_children(node) {
        match child.kind() {
            // Nested scopes return for themselves.
            "function_definition" | "class_definition" | "lambda" => continue,
            "return_statement" => {
                let found = named_children(child)
                    .into_iter()
                    .next()
                    .and_then(|e| constructed_class(e, source, recognized));
                if found.is_some() {
                    return found;
                }
            }
            _ => {
                if let Some(found) = find_return(child, source, recognized) {
                    return Some(found);
                }
            }
        }
    }
    None
}

/// The recognised class an expression instantiates, if any.
fn constructed_class(expr: Node, source: &[u8], recognized: &AHashSet<String>) -> Option<String> {
    match expr.kind() {
        "parenthesized_expression" | "tuple" | "expression_list" => {
            let first = named_children(expr).into_iter().next()?;
            constructed_class(first, source, recognized)
        }
        "call" => {
            let callee = expr.child_by_field_name("function")?;
            last_segment(callee, source).filter(|name| recognized.contains(name))
        }
        _ => None,
    }
}

fn method_tool(name: String, docstring: Option<String>, function: Node, source: &[u8]) -> Tool {
    let kind = if END_CALL_METHODS.contains(&name.as_str()) {
        ToolKind::EndCall
    } else {
        ToolKind::FunctionTool
    };
    let parameters = function
        .child_by_field_name("parameters")
        .map(|p| parameter_schema(p, source))
        .unwrap_or(Value::Null);
    Tool::new(name, kind)
        .with_description(docstring.unwrap_or_default())
        .with_parameters(parameters)
}

/// JSON Schema for the annotated parameters, skipping `self` and the run context.
fn parameter_schema(parameters: Node, source: &[u8]) -> Value {
    let mut properties = Map::new();
    let mut required = Vec::new();

    for param in named_children(parameters) {
        let (name, annotation, has_default) = match param.kind() {
            "identifier" => (Some(node_text(param, source)), None, false),
            "typed_parameter" => (
                named_children(param)
                    .into_iter()
                    .find(|c| c.kind() == "identifier")
                    .map(|c| node_text(c, source)),
                param.child_by_field_name("type").map(|t| node_text(t, source)),
                false,
            ),
            "default_parameter" => (
                param.child_by_field_name("name").map(|n| node_text(n, source)),
                None,
                true,
            ),
            "typed_default_parameter" => (
                param.child_by_field_name("name").map(|n| node_text(n, source)),
                param.child_by_field_name("type").map(|t| node_text(t, source)),
                true,
            ),
            _ => continue,
        };
        let Some(name) = name else {
            continue;
        };
        if name == "self" || annotation.as_deref().is_some_and(|a| a.contains("RunContext")) {
            continue;
        }

        let json_type = annotation.as_deref().map(json_type).unwrap_or("string");
        properties.insert(name.clone(), json!({ "type": json_type }));
        if !has_default {
            required.push(Value::from(name));
        }
    }

    if properties.is_empty() {
        return Value::Null;
    }
    json!({ "type": "object", "properties": properties, "required": required })
}

/// Maps a Python annotation onto a JSON Schema type name.
fn json_type(annotation: &str) -> &'static str {
    let annotation = annotation.trim();
    let annotation = annotation
        .strip_prefix("Optional[")
        .or_else(|| annotation.strip_prefix("Annotated["))
        .unwrap_or(annotation);
    let head: String = annotation
        .chars()
        .take_while(|c| c.is_alphanumeric() || *c == '_')
        .collect();
    match head.as_str() {
        "int" => "integer",
        "float" => "number",
        "bool" => "boolean",
        "list" | "List" | "tuple" | "Tuple" | "set" => "array",
        "dict" | "Dict" => "object",
        _ => "string",
    }
}

/// Literal string value of an expression: plain, implicitly concatenated,
/// or parenthesized. F-strings keep their placeholders verbatim.
fn string_value(expr: Node, source: &[u8]) -> Option<String> {
    match expr.kind() {
        "string" => Some(literal_text(&node_text(expr, source))),
        "concatenated_string" => Some(
            named_children(expr)
                .into_iter()
                .filter(|c| c.kind() == "string")
                .map(|c| literal_text(&node_text(c, source)))
                .collect(),
        ),
        "parenthesized_expression" => named_children(expr)
            .into_iter()
            .next()
            .and_then(|inner| string_value(inner, source)),
        _ => None,
    }
}

fn literal_text(raw: &str) -> String {
    let split = raw.find(['"', '\'']).unwrap_or(0);
    let (prefix, quoted) = raw.split_at(split);
    let delimiter = if quoted.starts_with("\"\"\"") || quoted.starts_with("'''") {
        &quoted[..3]
    } else {
        &quoted[..quoted.len().min(1)]
    };
    let inner = quoted
        .strip_prefix(delimiter)
        .and_then(|q| q.strip_suffix(delimiter))
        .unwrap_or(quoted);

    if prefix.to_ascii_lowercase().contains('r') {
        inner.to_string()
    } else {
        unescape(inner)
    }
}

fn unescape(text: &str) -> String {
    let mut out = String::with_capacity(text.len());
    let mut chars = text.chars();
    while let Some(c) = chars.next() {
        if c != '\\' {
            out.push(c);
            continue;
        }
        match chars.next() {
            Some('n') => out.push('\n'),
            Some('t') => out.push('\t'),
            Some('r') => out.push('\r'),
            Some('\\') => out.push('\\'),
            Some('\'') => out.push('\''),
            Some('"') => out.push('"'),
            Some('\n') => {}
            Some(kind @ ('u' | 'x')) => {
                let width = if kind == 'u' { 4 } else { 2 };
                let digits: String = chars.by_ref().take(width).collect();
                match u32::from_str_radix(&digits, 16).ok().and_then(char::from_u32) {
                    Some(decoded) => out.push(decoded),
                    None => {
                        out.push('\\');
                        out.push(kind);
                        out.push_str(&digits);
                    }
                }
            }
            Some(other) => {
                out.push('\\');
                out.push(other);
            }
            None => out.push('\\'),
        }
    }
    out
}

/// Strips docstring indentation the way `inspect.cleandoc` does.
fn clean_docstring(text: &str) -> String {
    let lines: Vec<&str> = text.lines().collect();
    let indent = lines
        .iter()
        .skip(1)
        .filter(|l| !l.trim().is_empty())
        .map(|l| l.len() - l.trim_start().len())
        .min()
        .unwrap_or(0);

    let cleaned: Vec<String> = lines
        .iter()
        .enumerate()
        .map(|(i, l)| {
            if i == 0 {
                l.trim().to_string()
            } else {
                l.get(indent..).unwrap_or("").trim_end().to_string()
            }
        })
        .collect();
    cleaned.join("\n").trim().to_string()
}
