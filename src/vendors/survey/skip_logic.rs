//! Translation of survey skip-logic expressions into transition conditions.
//!
//! Recognised clause shapes, with `${q}` (ODK/XLSForm) or `[q]` (REDCap)
//! question references:
//!
//! | shape       | example               |
//! |-------------|-----------------------|
//! | equality    | `${smoker} = 'yes'`   |
//! | inequality  | `[smoker] != '1'`     |
//! | membership  | `selected(${fruit}, 'apple')` |
//! | comparison  | `${age} >= 18`        |
//!
//! Clauses may be joined with `and` / `or`. Anything else is echoed verbatim.

use crate::graph::Condition;
use once_cell::sync::Lazy;
use regex::Regex;

const REFERENCE: &str = r"(?:\$\{(\w+)\}|\[(\w+)(?:\(\w+\))?\])";
const VALUE: &str = r#"('[^']*'|"[^"]*"|-?\d+(?:\.\d+)?)"#;

static REFERENCES: Lazy<Regex> = Lazy::new(|| Regex::new(REFERENCE).expect("valid regex"));

static COMPARISON: Lazy<Regex> = Lazy::new(|| {
    Regex::new(&format!(
        r"^{}\s*(==|!=|<>|>=|<=|=|>|<)\s*{}$",
        REFERENCE, VALUE
    ))
    .expect("valid regex")
});

static SELECTED: Lazy<Regex> = Lazy::new(|| {
    Regex::new(&format!(
        r#"^selected\(\s*{}\s*,\s*('[^']*'|"[^"]*")\s*\)$"#,
        REFERENCE
    ))
    .expect("valid regex")
});

/// A translated `relevant` expression.
#[derive(Debug, Clone, PartialEq)]
pub struct SkipLogic {
    pub condition: Condition,
    /// Questions the expression reads, in order of first mention.
    pub references: Vec<String>,
    pub recognized: bool,
}

pub fn translate(expression: &str) -> SkipLogic {
    let expression = expression.trim();
    let references = references(expression);
    match describe(expression) {
        Some(text) => SkipLogic {
            condition: Condition::prompt(text),
            references,
            recognized: true,
        },
        None => SkipLogic {
            condition: Condition::prompt(expression),
            references,
            recognized: false,
        },
    }
}

fn references(expression: &str) -> Vec<String> {
    let mut found: Vec<String> = Vec::new();
    for caps in REFERENCES.captures_iter(expression) {
        if let Some(name) = caps.get(1).or_else(|| caps.get(2)) {
            if !found.iter().any(|f| f == name.as_str()) {
                found.push(name.as_str().to_string());
            }
        }
    }
    found
}

fn describe(expression: &str) -> Option<String> {
    let expression = strip_parens(expression);
    for keyword in ["or", "and"] {
        let parts = split_top_level(expression, keyword);
        if parts.len() > 1 {
            let described = parts
                .into_iter()
                .map(describe)
                .collect::<Option<Vec<_>>>()?;
            return Some(described.join(&format!(" {} ", keyword)));
        }
    }
    clause(expression)
}

fn clause(expression: &str) -> Option<String> {
    if let Some(caps) = SELECTED.captures(expression) {
        let question = caps.get(1).or_else(|| caps.get(2))?.as_str();
        let value = unquote(caps.get(3)?.as_str());
        return Some(format!("The answer to {} includes \"{}\"", question, value));
    }

    let caps = COMPARISON.captures(expression)?;
    let question = caps.get(1).or_else(|| caps.get(2))?.as_str();
    let operator = caps.get(3)?.as_str();
    let raw = caps.get(4)?.as_str();
    let quoted = raw.starts_with(['\'', '"']);
    let value = if quoted {
        format!("\"{}\"", unquote(raw))
    } else {
        raw.to_string()
    };

    let relation = match operator {
        "=" | "==" => "is",
        "!=" | "<>" => "is not",
        ">" => "is greater than",
        ">=" => "is at least",
        "<" => "is less than",
        "<=" => "is at most",
        _ => return None,
    };
    Some(format!("The answer to {} {} {}", question, relation, value))
}

fn unquote(value: &str) -> &str {
    value
        .strip_prefix(['\'', '"'])
        .and_then(|v| v.strip_suffix(['\'', '"']))
        .unwrap_or(value)
}

/// Removes parentheses that wrap the whole expression.
fn strip_parens(mut expression: &str) -> &str {
    loop {
        expression = expression.trim();
        if !expression.starts_with('(') || !expression.ends_with(')') {
            return expression;
        }
        let mut depth = 0usize;
        for (i, c) in expression.char_indices() {
            match c {
                '(' => depth += 1,
                ')' => {
                    depth = depth.saturating_sub(1);
                    if depth == 0 && i + 1 < expression.len() {
                        // The opening paren closes before the end: not a wrapper.
                        return expression;
                    }
                }
                _ => {}
            }
        }
        expression = &expression[1..expression.len() - 1];
    }
}

/// Splits on a word operator outside parentheses and quotes, ignoring case.
fn split_top_level<'a>(expression: &'a str, keyword: &str) -> Vec<&'a str> {
    let needle = format!(" {} ", keyword);
    let bytes = expression.as_bytes();
    let mut parts = Vec::new();
    let mut depth = 0usize;
    let mut quote: Option<u8> = None;
    let mut start = 0;
    let mut i = 0;

    while i < bytes.len() {
        let b = bytes[i];
        match quote {
            Some(q) if b == q => quote = None,
            Some(_) => {}
            None => match b {
                b'\'' | b'"' => quote = Some(b),
                b'(' => depth += 1,
                b')' => depth = depth.saturating_sub(1),
                _ if depth == 0
                    && bytes.len() - i >= needle.len()
                    && bytes[i..i + needle.len()].eq_ignore_ascii_case(needle.as_bytes()) =>
                {
                    parts.push(&expression[start..i]);
                    i += needle.len();
                    start = i;
                    continue;
                }
                _ => {}
            },
        }
        i += 1;
    }
    parts.push(&expression[start..]);
    parts
}
