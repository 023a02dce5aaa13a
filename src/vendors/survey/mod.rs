//! Spreadsheet surveys (XLSForm-style or REDCap data dictionaries) saved as CSV.
//!
//! Each question row becomes a node. Rows flow forward in sheet order, with
//! skip logic (`relevant`) turned into conditional edges.

pub mod skip_logic;

use crate::error::TranscodeError;
use crate::graph::{Condition, Graph, GraphBuilder, Node};
use crate::transcode::{Format, Native, Payload, Transcoder};
use ahash::AHashSet;
use csv::{ReaderBuilder, StringRecord, Trim, WriterBuilder};
use skip_logic::{SkipLogic, translate};
use tracing::debug;

const FORMAT: Format = Format::Survey;

// Node metadata keys.
pub const QUESTION_TYPE_KEY: &str = "question_type";
pub const RELEVANT_KEY: &str = "relevant";
pub const REQUIRED_KEY: &str = "required";
pub const CHOICES_KEY: &str = "choices";
pub const GROUP_KEY: &str = "group";
pub const HINT_KEY: &str = "hint";

const EXPORT_HEADER: [&str; 7] = ["type", "name", "label", "hint", "relevant", "required", "choices"];

/// Accepted spellings of each column, lowercased.
const NAME_COLUMNS: &[&str] = &["name", "variable / field name", "field_name", "variable"];
const LABEL_COLUMNS: &[&str] = &["label", "field label", "field_label", "question"];
const TYPE_COLUMNS: &[&str] = &["type", "field type", "field_type"];
const HINT_COLUMNS: &[&str] = &["hint", "field note", "field_note"];
const RELEVANT_COLUMNS: &[&str] = &[
    "relevant",
    "branching logic (show field only if...)",
    "branching_logic",
    "skip_logic",
];
const REQUIRED_COLUMNS: &[&str] = &["required", "required field?", "required_field"];
const CHOICES_COLUMNS: &[&str] = &[
    "choices",
    "choices, calculations, or slider labels",
    "select_choices_or_calculations",
];

struct Columns {
    name: usize,
    label: Option<usize>,
    question_type: Option<usize>,
    hint: Option<usize>,
    relevant: Option<usize>,
    required: Option<usize>,
    choices: Option<usize>,
}

impl Columns {
    fn from_header(header: &StringRecord) -> Option<Self> {
        let find = |aliases: &[&str]| {
            header
                .iter()
                .position(|h| aliases.contains(&h.trim().to_ascii_lowercase().as_str()))
        };
        Some(Self {
            name: find(NAME_COLUMNS)?,
            label: find(LABEL_COLUMNS),
            question_type: find(TYPE_COLUMNS),
            hint: find(HINT_COLUMNS),
            relevant: find(RELEVANT_COLUMNS),
            required: find(REQUIRED_COLUMNS),
            choices: find(CHOICES_COLUMNS),
        })
    }
}

fn delimiter(text: &str) -> u8 {
    let header = text.lines().next().unwrap_or("");
    if header.contains('\t') && !header.contains(',') {
        b'\t'
    } else {
        b','
    }
}

fn cell(record: &StringRecord, column: Option<usize>) -> &str {
    column.and_then(|c| record.get(c)).unwrap_or("").trim()
}

pub struct SurveyTranscoder;

impl Transcoder for SurveyTranscoder {
    fn format(&self) -> Format {
        FORMAT
    }

    fn detect(&self, payload: &Payload) -> bool {
        let Payload::Table(text) = payload else {
            return false;
        };
        let mut reader = ReaderBuilder::new()
            .delimiter(delimiter(text))
            .flexible(true)
            .from_reader(text.as_bytes());
        reader
            .headers()
            .ok()
            .and_then(Columns::from_header)
            .is_some_and(|c| c.label.is_some() || c.question_type.is_some())
    }

    fn import(&self, payload: &Payload) -> Result<Graph, TranscodeError> {
        let Payload::Table(text) = payload else {
            return Err(TranscodeError::malformed(FORMAT, "expected spreadsheet text"));
        };
        let mut reader = ReaderBuilder::new()
            .delimiter(delimiter(text))
            .flexible(true)
            .trim(Trim::All)
            .from_reader(text.as_bytes());
        let header = reader
            .headers()
            .map_err(|e| TranscodeError::malformed(FORMAT, e.to_string()))?
            .clone();
        let columns = Columns::from_header(&header)
            .ok_or_else(|| TranscodeError::malformed(FORMAT, "no question name column"))?;

        let mut questions: Vec<Node> = Vec::new();
        let mut logic: Vec<Option<SkipLogic>> = Vec::new();
        let mut groups: Vec<String> = Vec::new();
        for (line, record) in reader.records().enumerate() {
            let record = record.map_err(|e| TranscodeError::malformed(FORMAT, e.to_string()))?;
            let name = cell(&record, Some(columns.name));
            let question_type = cell(&record, columns.question_type);
            let normalized = question_type.to_ascii_lowercase().replace(' ', "_");

            if normalized.starts_with("begin_") {
                let label = cell(&record, columns.label);
                let group = if name.is_empty() { label } else { name };
                groups.push(group.to_string());
                continue;
            }
            if normalized.starts_with("end_") {
                groups.pop();
                continue;
            }
            if name.is_empty() {
                debug!(row = line + 2, "skipping row without a question name");
                continue;
            }

            let label = cell(&record, columns.label);
            let hint = cell(&record, columns.hint);
            let prompt = if hint.is_empty() {
                label.to_string()
            } else {
                format!("{}\n\n{}", label, hint)
            };

            let mut node = Node::new(name, prompt);
            let fields = [
                (QUESTION_TYPE_KEY, question_type),
                (HINT_KEY, hint),
                (RELEVANT_KEY, cell(&record, columns.relevant)),
                (REQUIRED_KEY, cell(&record, columns.required)),
                (CHOICES_KEY, cell(&record, columns.choices)),
            ];
            for (key, value) in fields {
                if !value.is_empty() {
                    node.metadata.insert(key.into(), value.into());
                }
            }
            if let Some(group) = groups.last() {
                node.metadata.insert(GROUP_KEY.into(), group.clone().into());
            }

            let relevant = cell(&record, columns.relevant);
            let translated = (!relevant.is_empty()).then(|| translate(relevant));
            if translated.as_ref().is_some_and(|l| !l.recognized) {
                debug!(question = %node.id, expression = %relevant, "skip logic kept verbatim");
            }
            questions.push(node);
            logic.push(translated);
        }

        if questions.is_empty() {
            return Err(TranscodeError::malformed(FORMAT, "survey has no question rows"));
        }

        let ids: Vec<String> = questions.iter().map(|q| q.id.clone()).collect();
        let edges = survey_edges(&ids, &logic);
        let mut builder = GraphBuilder::new();
        builder.source_format(FORMAT);
        for question in questions {
            builder.add_node(question)?;
        }
        let edge_count = edges.len();
        for (source, target, condition) in edges {
            builder.connect(ids[source].clone(), ids[target].clone(), condition, None);
        }

        let graph = builder.build()?;
        debug!(questions = ids.len(), edges = edge_count, "imported survey");
        Ok(graph)
    }

    fn export(&self, graph: &Graph) -> Result<Native, TranscodeError> {
        if let Some((node, tool)) = graph
            .nodes()
            .iter()
            .find_map(|n| n.tools.iter().find(|t| !t.kind.is_terminal()).map(|t| (n, t)))
        {
            return Err(TranscodeError::unsupported(
                FORMAT,
                format!("node '{}' carries tool '{}'; surveys cannot call tools", node.id, tool.name),
            ));
        }

        check_edges(graph)?;

        let mut writer = WriterBuilder::new().from_writer(Vec::new());
        let write_error = |e: csv::Error| TranscodeError::unsupported(FORMAT, e.to_string());
        writer.write_record(EXPORT_HEADER).map_err(write_error)?;

        let mut open_group: Option<&str> = None;
        for node in graph.nodes() {
            let group = node.metadata_str(GROUP_KEY);
            if group != open_group {
                if let Some(name) = open_group {
                    writer
                        .write_record(["end_group", name, "", "", "", "", ""])
                        .map_err(write_error)?;
                }
                if let Some(name) = group {
                    writer
                        .write_record(["begin_group", name, name, "", "", "", ""])
                        .map_err(write_error)?;
                }
                open_group = group;
            }

            let hint = node.metadata_str(HINT_KEY).unwrap_or("");
            let label = if hint.is_empty() {
                node.prompt.as_str()
            } else {
                node.prompt
                    .strip_suffix(hint)
                    .and_then(|p| p.strip_suffix("\n\n"))
                    .unwrap_or(&node.prompt)
            };
            writer
                .write_record([
                    node.metadata_str(QUESTION_TYPE_KEY).unwrap_or("text"),
                    node.id.as_str(),
                    label,
                    hint,
                    node.metadata_str(RELEVANT_KEY).unwrap_or(""),
                    node.metadata_str(REQUIRED_KEY).unwrap_or(""),
                    node.metadata_str(CHOICES_KEY).unwrap_or(""),
                ])
                .map_err(write_error)?;
        }
        if let Some(name) = open_group {
            writer
                .write_record(["end_group", name, "", "", "", "", ""])
                .map_err(write_error)?;
        }

        let bytes = writer
            .into_inner()
            .map_err(|e| TranscodeError::unsupported(FORMAT, e.to_string()))?;
        let text =
            String::from_utf8(bytes).map_err(|e| TranscodeError::unsupported(FORMAT, e.to_string()))?;
        Ok(Native::Table(text))
    }
}

/// A survey only stores row order and `relevant` expressions, so the graph's
/// edges must be exactly the ones those imply.
fn check_edges(graph: &Graph) -> Result<(), TranscodeError> {
    let nodes = graph.nodes();
    if nodes.first().map(|n| n.id.as_str()) != Some(graph.entry_node_id()) {
        return Err(TranscodeError::unsupported(
            FORMAT,
            format!("entry node '{}' is not the first question", graph.entry_node_id()),
        ));
    }

    let ids: Vec<String> = nodes.iter().map(|n| n.id.clone()).collect();
    let logic: Vec<Option<SkipLogic>> = nodes
        .iter()
        .map(|n| n.metadata_str(RELEVANT_KEY).map(translate))
        .collect();
    let derived = survey_edges(&ids, &logic);
    let implied: Vec<(&str, &str, &Condition)> = derived
        .iter()
        .map(|(source, target, condition)| (ids[*source].as_str(), ids[*target].as_str(), condition))
        .collect();
    let actual: Vec<(&str, &str, &Condition)> = nodes
        .iter()
        .flat_map(|n| {
            n.transitions
                .iter()
                .map(move |t| (n.id.as_str(), t.target_node_id.as_str(), &t.condition))
        })
        .collect();

    if let Some((source, target, condition)) = actual.iter().find(|edge| !implied.contains(*edge)) {
        return Err(TranscodeError::unsupported(
            FORMAT,
            format!(
                "edge '{}' -> '{}' ({}) cannot be expressed by row order and skip logic",
                source,
                target,
                condition.text()
            ),
        ));
    }
    if let Some((source, target, _)) = implied.iter().find(|edge| !actual.contains(*edge)) {
        return Err(TranscodeError::unsupported(
            FORMAT,
            format!("row order implies an edge '{}' -> '{}' the graph lacks", source, target),
        ));
    }
    Ok(())
}

/// Edges between question rows, as `(source, target, condition)` indices.
///
/// A row named by a later row's skip logic gets a conditional edge to that
/// row. Then every row chains forward: conditional successors get their
/// condition, and the first unconditional successor gets an `always` edge.
fn survey_edges(ids: &[String], logic: &[Option<SkipLogic>]) -> Vec<(usize, usize, Condition)> {
    let mut edges = Vec::new();
    let mut seen: AHashSet<(usize, usize)> = AHashSet::new();

    for (target, skip) in logic.iter().enumerate() {
        let Some(skip) = skip else {
            continue;
        };
        for reference in &skip.references {
            let driver = ids[..target].iter().position(|id| id == reference);
            if let Some(source) = driver {
                if seen.insert((source, target)) {
                    edges.push((source, target, skip.condition.clone()));
                }
            }
        }
    }

    for source in 0..logic.len() {
        for (target, skip) in logic.iter().enumerate().skip(source + 1) {
            match skip {
                Some(skip) => {
                    if seen.insert((source, target)) {
                        edges.push((source, target, skip.condition.clone()));
                    }
                }
                None => {
                    if seen.insert((source, target)) {
                        edges.push((source, target, Condition::Always));
                    }
                    break;
                }
            }
        }
    }

    // Driver edges first, then chaining, per source row.
    edges.sort_by_key(|(source, _, _)| *source);
    edges
}
