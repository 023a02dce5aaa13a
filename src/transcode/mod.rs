//! The two-way contract between vendor formats and the canonical [`Graph`].

pub mod dedup;
pub mod passthrough;
pub mod registry;
pub mod synthesis;

pub use dedup::*;
pub use passthrough::*;
pub use registry::*;
pub use synthesis::*;

use crate::error::TranscodeError;
use crate::graph::Graph;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::fmt;
use std::fs;
use std::path::{Path, PathBuf};
use std::str::FromStr;

/// Tag of every supported vendor format. Adding a vendor means adding a variant.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Format {
    #[serde(rename = "retell_llm")]
    RetellLlm,
    #[serde(rename = "retell_flow")]
    RetellFlow,
    #[serde(rename = "vapi")]
    Vapi,
    #[serde(rename = "bland")]
    Bland,
    #[serde(rename = "livekit")]
    LiveKit,
    #[serde(rename = "survey")]
    Survey,
}

impl Format {
    pub const ALL: [Format; 6] = [
        Format::RetellLlm,
        Format::RetellFlow,
        Format::Vapi,
        Format::Bland,
        Format::LiveKit,
        Format::Survey,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            Format::RetellLlm => "retell_llm",
            Format::RetellFlow => "retell_flow",
            Format::Vapi => "vapi",
            Format::Bland => "bland",
            Format::LiveKit => "livekit",
            Format::Survey => "survey",
        }
    }
}

impl fmt::Display for Format {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Format {
    type Err = TranscodeError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let normalized = s.trim().to_ascii_lowercase().replace('-', "_");
        Format::ALL
            .into_iter()
            .find(|f| f.as_str() == normalized)
            .ok_or_else(|| TranscodeError::UnknownFormat(s.to_string()))
    }
}

/// A vendor payload held in memory.
#[derive(Debug, Clone, PartialEq)]
pub enum Payload {
    /// A decoded JSON document.
    Json(Value),
    /// Program source text, for formats mined from code.
    Source(String),
    /// Delimited spreadsheet text (CSV with a header row).
    Table(String),
}

impl Payload {
    /// Reads a payload from disk, choosing its shape by file extension.
    ///
    /// Unknown extensions are tried as JSON first and kept as source text
    /// otherwise. The file handle is released before this returns.
    pub fn from_path(path: &Path) -> Result<Self, TranscodeError> {
        let text = fs::read_to_string(path).map_err(|e| TranscodeError::Io {
            path: path.display().to_string(),
            message: e.to_string(),
        })?;
        let extension = path
            .extension()
            .and_then(|e| e.to_str())
            .map(str::to_ascii_lowercase);

        match extension.as_deref() {
            Some("json") => serde_json::from_str(&text)
                .map(Payload::Json)
                .map_err(|e| TranscodeError::Io {
                    path: path.display().to_string(),
                    message: format!("invalid JSON: {}", e),
                }),
            Some("py") => Ok(Payload::Source(text)),
            Some("csv") | Some("tsv") => Ok(Payload::Table(text)),
            _ => Ok(serde_json::from_str(&text)
                .map(Payload::Json)
                .unwrap_or(Payload::Source(text))),
        }
    }

    pub fn as_json(&self) -> Option<&Value> {
        match self {
            Payload::Json(value) => Some(value),
            _ => None,
        }
    }

    pub fn as_text(&self) -> Option<&str> {
        match self {
            Payload::Source(text) | Payload::Table(text) => Some(text),
            Payload::Json(_) => None,
        }
    }
}

impl From<Value> for Payload {
    fn from(value: Value) -> Self {
        Payload::Json(value)
    }
}

/// What the registry accepts: a path to read, or a payload already in memory.
#[derive(Debug, Clone)]
pub enum Input {
    Path(PathBuf),
    Payload(Payload),
}

impl Input {
    pub fn load(self) -> Result<Payload, TranscodeError> {
        match self {
            Input::Path(path) => Payload::from_path(&path),
            Input::Payload(payload) => Ok(payload),
        }
    }
}

impl From<Payload> for Input {
    fn from(payload: Payload) -> Self {
        Input::Payload(payload)
    }
}

impl From<Value> for Input {
    fn from(value: Value) -> Self {
        Input::Payload(Payload::Json(value))
    }
}

impl From<PathBuf> for Input {
    fn from(path: PathBuf) -> Self {
        Input::Path(path)
    }
}

impl From<&Path> for Input {
    fn from(path: &Path) -> Self {
        Input::Path(path.to_path_buf())
    }
}

/// A vendor-native export result.
#[derive(Debug, Clone, PartialEq)]
pub enum Native {
    Json(Value),
    Source(String),
    Table(String),
}

impl Native {
    pub fn as_json(&self) -> Option<&Value> {
        match self {
            Native::Json(value) => Some(value),
            _ => None,
        }
    }

    pub fn into_json(self) -> Option<Value> {
        match self {
            Native::Json(value) => Some(value),
            _ => None,
        }
    }

    pub fn as_text(&self) -> Option<&str> {
        match self {
            Native::Source(text) | Native::Table(text) => Some(text),
            Native::Json(_) => None,
        }
    }

    /// Serialized text form of the export.
    pub fn to_text(&self, pretty: bool) -> String {
        match self {
            Native::Json(value) if pretty => format!("{:#}", value),
            Native::Json(value) => value.to_string(),
            Native::Source(text) | Native::Table(text) => text.clone(),
        }
    }

    pub fn write_to(&self, path: &Path, pretty: bool) -> Result<(), TranscodeError> {
        fs::write(path, self.to_text(pretty)).map_err(|e| TranscodeError::Io {
            path: path.display().to_string(),
            message: e.to_string(),
        })
    }
}

/// A vendor-specific, stateless, bidirectional converter.
///
/// `detect` is a cheap sniff and must never panic; anything it cannot make
/// sense of is simply "not mine". `import` either returns a complete graph or
/// a typed error, never a partial graph.
pub trait Transcoder: Send + Sync {
    fn format(&self) -> Format;
    fn detect(&self, payload: &Payload) -> bool;
    fn import(&self, payload: &Payload) -> Result<Graph, TranscodeError>;
    fn export(&self, graph: &Graph) -> Result<Native, TranscodeError>;
}

/// Deserializes a typed vendor schema, mapping failures to a malformed-input error.
pub(crate) fn coerce<T: serde::de::DeserializeOwned>(
    format: Format,
    value: &Value,
) -> Result<T, TranscodeError> {
    T::deserialize(value).map_err(|e| TranscodeError::malformed(format, e.to_string()))
}

pub(crate) fn expect_json(format: Format, payload: &Payload) -> Result<&Value, TranscodeError> {
    payload
        .as_json()
        .ok_or_else(|| TranscodeError::malformed(format, "expected a JSON document"))
}
