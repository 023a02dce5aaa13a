use clap::{Parser, Subcommand};
use std::path::{Path, PathBuf};
use std::time::Instant;
use tracing_subscriber::EnvFilter;
use voxflow::prelude::*;
use voxflow::vendors::RetellFlowTranscoder;

/// Converts voice-agent configurations between vendor formats
#[derive(Parser, Debug)]
#[command(version, about, long_about = None)]
struct Cli {
    /// Path to a voxflow.toml config file
    #[arg(short, long, global = true)]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Print every format that claims the input
    Detect { path: PathBuf },

    /// Import a file and print the canonical graph as JSON
    Import {
        path: PathBuf,
        /// Skip detection and use this format
        #[arg(short, long)]
        format: Option<String>,
        /// Also save the graph as a binary artifact
        #[arg(long)]
        artifact: Option<PathBuf>,
    },

    /// Convert a file to another vendor format
    Convert {
        path: PathBuf,
        /// Target format
        #[arg(short, long)]
        to: String,
        /// Source format (detected when omitted)
        #[arg(short, long)]
        from: Option<String>,
        /// Output file (stdout when omitted)
        #[arg(short, long)]
        output: Option<PathBuf>,
        /// Wrap retell_flow output in the UI-importable agent envelope
        #[arg(long)]
        envelope: bool,
    },

    /// Import a file and report structural issues
    Validate { path: PathBuf },
}

fn main() {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_env("VOXFLOW_LOG")
                .or_else(|_| EnvFilter::try_from_default_env())
                .unwrap_or_else(|_| EnvFilter::new("warn")),
        )
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();
    let config = Config::load(cli.config.as_deref());
    let registry = Registry::new();

    match cli.command {
        Command::Detect { path } => run_detect(&registry, &path),
        Command::Import {
            path,
            format,
            artifact,
        } => {
            let graph = load_graph(&registry, &config, &path, format.as_deref());
            let json = serde_json::to_string_pretty(&graph)
                .unwrap_or_else(|e| exit_with_error(&format!("Failed to serialize graph: {}", e)));
            println!("{}", json);
            if let Some(artifact_path) = artifact {
                GraphArtifact::from_graph(&graph)
                    .save(&artifact_path.to_string_lossy())
                    .unwrap_or_else(|e| exit_with_error(&format!("Failed to save artifact: {}", e)));
                eprintln!("Saved artifact to {}", artifact_path.display());
            }
        }
        Command::Convert {
            path,
            to,
            from,
            output,
            envelope,
        } => run_convert(&registry, &config, &path, &to, from.as_deref(), output, envelope),
        Command::Validate { path } => {
            let graph = load_graph(&registry, &config, &path, None);
            let report = graph.validate();
            if report.is_clean() {
                println!("No issues found ({} nodes).", graph.nodes().len());
            } else {
                println!("{}", report);
                std::process::exit(2);
            }
        }
    }
}

fn run_detect(registry: &Registry, path: &Path) {
    let payload = Payload::from_path(path)
        .unwrap_or_else(|e| exit_with_error(&format!("Failed to read '{}': {}", path.display(), e)));
    let formats = registry.detect_all(&payload);
    if formats.is_empty() {
        exit_with_error("No registered format accepts this input.");
    }
    for format in formats {
        println!("{}", format);
    }
}

fn load_graph(registry: &Registry, config: &Config, path: &Path, format: Option<&str>) -> Graph {
    let start = Instant::now();
    let result = match format {
        Some(name) => {
            let format: Format = name
                .parse()
                .unwrap_or_else(|e| exit_with_error(&format!("{}", e)));
            registry.import_as(format, path)
        }
        None => registry.import(path),
    };
    let mut graph =
        result.unwrap_or_else(|e| exit_with_error(&format!("Import of '{}' failed: {}", path.display(), e)));

    if graph.default_model().is_none() {
        if let Some(model) = &config.import.default_model {
            graph = graph.with_default_model(Some(model.clone()));
        }
    }
    if config.import.validate {
        for issue in graph.validate().iter() {
            tracing::warn!(%issue, "validation issue");
        }
    }
    tracing::debug!(elapsed = ?start.elapsed(), "import finished");
    graph
}

fn run_convert(
    registry: &Registry,
    config: &Config,
    path: &Path,
    to: &str,
    from: Option<&str>,
    output: Option<PathBuf>,
    envelope: bool,
) {
    let target: Format = to
        .parse()
        .unwrap_or_else(|e| exit_with_error(&format!("{}", e)));
    let graph = load_graph(registry, config, path, from);

    let native = if target == Format::RetellFlow && (envelope || config.export.envelope) {
        RetellFlowTranscoder.export_agent_envelope(&graph)
    } else {
        registry
            .export(&graph, target)
            .unwrap_or_else(|e| exit_with_error(&format!("Export failed: {}", e)))
    };

    match output {
        Some(out) => {
            native
                .write_to(&out, config.export.pretty)
                .unwrap_or_else(|e| exit_with_error(&format!("{}", e)));
            eprintln!(
                "Converted {} -> {} ({} nodes) into {}",
                graph.source_format().map(|f| f.as_str()).unwrap_or("?"),
                target,
                graph.nodes().len(),
                out.display()
            );
        }
        None => println!("{}", native.to_text(config.export.pretty)),
    }
}

fn exit_with_error(message: &str) -> ! {
    eprintln!("\nError: {}", message);
    std::process::exit(1);
}
