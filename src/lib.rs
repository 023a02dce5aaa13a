//! # Voxflow - Voice-Agent Configuration Transcoder
//!
//! **Voxflow** reads conversational-agent configurations exported by several
//! voice-AI platforms and normalizes them into one canonical directed graph.
//! The same graph can be written back out in any supported format, including
//! one different from the source, to migrate agents between platforms.
//!
//! ## Core Workflow
//!
//! 1.  **Import**: Hand a file path or an in-memory payload to the [`Registry`](transcode::Registry).
//!     It sniffs the format (or takes the one you name) and returns a canonical [`Graph`](graph::Graph).
//! 2.  **Inspect**: Walk nodes, prompts, tools and transitions; run [`Graph::validate`](graph::Graph::validate)
//!     for non-fatal issues such as unreachable nodes.
//! 3.  **Export**: Ask the registry for any [`Format`](transcode::Format). Node-based targets get
//!     end and transfer nodes synthesized from the graph's terminal tools.
//! 4.  **Persist** (optional): Save the graph as a compact binary [`GraphArtifact`](graph::GraphArtifact).
//!
//! ## Supported Formats
//!
//! | Format        | Shape                                              |
//! |---------------|----------------------------------------------------|
//! | `retell_llm`  | Retell multi-state LLM (states + edges)            |
//! | `retell_flow` | Retell conversation flow (typed nodes)             |
//! | `vapi`        | Vapi assistant or squad                            |
//! | `bland`       | Bland conversational pathway                       |
//! | `livekit`     | LiveKit Agents Python source                       |
//! | `survey`      | Spreadsheet survey with skip logic (CSV)           |
//!
//! ## Quick Start
//!
//! ```rust,no_run
//! use voxflow::prelude::*;
//! use std::path::Path;
//!
//! fn main() -> Result<()> {
//!     let registry = Registry::new();
//!
//!     // Auto-detect the vendor and import
//!     let graph = registry.import(Path::new("agents/support.json"))?;
//!     println!("{} nodes, entry '{}'", graph.nodes().len(), graph.entry_node_id());
//!
//!     // Report structural issues without failing
//!     let report = graph.validate();
//!     if !report.is_clean() {
//!         println!("{}", report);
//!     }
//!
//!     // Migrate to another platform
//!     let native = registry.export(&graph, Format::RetellFlow)?;
//!     println!("{}", native.to_text(true));
//!     Ok(())
//! }
//! ```

pub mod config;
pub mod error;
pub mod graph;
pub mod prelude;
pub mod transcode;
pub mod vendors;
