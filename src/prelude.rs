//! Prelude module for convenient imports
//!
//! Re-exports the types most callers need to import, inspect and export graphs.
//!
//! # Example
//!
//! ```rust,no_run
//! use voxflow::prelude::*;
//!
//! # fn run_example() -> Result<()> {
//! let registry = Registry::new();
//! let graph = registry.import(std::path::Path::new("path/to/agent.json"))?;
//! let native = registry.export(&graph, Format::Bland)?;
//! println!("{}", native.to_text(true));
//! # Ok(())
//! # }
//! ```

// Canonical model
pub use crate::graph::{
    Condition, Graph, GraphArtifact, GraphBuilder, Node, NodeKind, Tool, ToolKind, Transition,
    ValidationReport,
};

// Transcoding
pub use crate::transcode::{Format, Input, Native, Payload, Registry, Transcoder};

// Error types
pub use crate::error::{GraphError, PersistError, TranscodeError};

// Configuration
pub use crate::config::Config;

// Result type alias for convenience
pub type Result<T> = std::result::Result<T, Box<dyn std::error::Error>>;
