use super::{Format, Input, Native, Payload, Transcoder};
use crate::error::TranscodeError;
use crate::graph::Graph;
use crate::vendors::{
    BlandTranscoder, LiveKitTranscoder, RetellFlowTranscoder, RetellLlmTranscoder,
    SurveyTranscoder, VapiTranscoder,
};
use std::panic::{AssertUnwindSafe, catch_unwind};
use std::path::Path;
use tracing::{debug, info, warn};

/// Holds every registered transcoder and dispatches to them.
///
/// Registration is append-only; there is no removal API, so a registry that
/// has finished registration can be shared read-only across threads.
pub struct Registry {
    transcoders: Vec<Box<dyn Transcoder>>,
}

impl Default for Registry {
    fn default() -> Self {
        Self::new()
    }
}

impl Registry {
    /// A registry with every built-in vendor transcoder.
    pub fn new() -> Self {
        Self::empty()
            .with_transcoder(Box::new(RetellFlowTranscoder))
            .with_transcoder(Box::new(RetellLlmTranscoder))
            .with_transcoder(Box::new(VapiTranscoder))
            .with_transcoder(Box::new(BlandTranscoder))
            .with_transcoder(Box::new(LiveKitTranscoder))
            .with_transcoder(Box::new(SurveyTranscoder))
    }

    pub fn empty() -> Self {
        Self {
            transcoders: Vec::new(),
        }
    }

    pub fn with_transcoder(mut self, transcoder: Box<dyn Transcoder>) -> Self {
        self.register(transcoder);
        self
    }

    /// Appends a transcoder. The first transcoder registered for a format wins lookups.
    pub fn register(&mut self, transcoder: Box<dyn Transcoder>) {
        if self.get(transcoder.format()).is_some() {
            warn!(format = %transcoder.format(), "format already registered; keeping the first");
        }
        self.transcoders.push(transcoder);
    }

    pub fn formats(&self) -> Vec<Format> {
        let mut formats: Vec<Format> = Vec::new();
        for t in &self.transcoders {
            if !formats.contains(&t.format()) {
                formats.push(t.format());
            }
        }
        formats
    }

    pub fn get(&self, format: Format) -> Option<&dyn Transcoder> {
        self.transcoders
            .iter()
            .find(|t| t.format() == format)
            .map(|t| t.as_ref())
    }

    /// Looks a transcoder up by its format tag.
    pub fn lookup(&self, name: &str) -> Result<&dyn Transcoder, TranscodeError> {
        let format: Format = name.parse()?;
        self.require(format)
    }

    fn require(&self, format: Format) -> Result<&dyn Transcoder, TranscodeError> {
        self.get(format)
            .ok_or_else(|| TranscodeError::UnknownFormat(format.to_string()))
    }

    /// Every format whose transcoder claims the payload, in registration order.
    pub fn detect_all(&self, payload: &Payload) -> Vec<Format> {
        self.transcoders
            .iter()
            .filter(|t| sniff(t.as_ref(), payload))
            .map(|t| t.format())
            .collect()
    }

    /// The first format whose transcoder claims the payload.
    pub fn detect(&self, payload: &Payload) -> Option<Format> {
        let candidates = self.detect_all(payload);
        if candidates.len() > 1 {
            warn!(?candidates, "payload matches several formats; using the first");
        }
        candidates.first().copied()
    }

    /// Imports with format auto-detection.
    pub fn import(&self, input: impl Into<Input>) -> Result<Graph, TranscodeError> {
        let payload = input.into().load()?;
        let format = self
            .detect(&payload)
            .ok_or(TranscodeError::NoMatchingFormat)?;
        debug!(%format, "detected input format");
        self.import_payload(format, &payload)
    }

    /// Imports with an explicitly selected format, skipping detection.
    pub fn import_as(&self, format: Format, input: impl Into<Input>) -> Result<Graph, TranscodeError> {
        let payload = input.into().load()?;
        self.import_payload(format, &payload)
    }

    fn import_payload(&self, format: Format, payload: &Payload) -> Result<Graph, TranscodeError> {
        let graph = self.require(format)?.import(payload)?;
        info!(
            %format,
            nodes = graph.nodes().len(),
            entry = graph.entry_node_id(),
            "imported graph"
        );
        Ok(graph)
    }

    pub fn export(&self, graph: &Graph, format: Format) -> Result<Native, TranscodeError> {
        let native = self.require(format)?.export(graph)?;
        info!(%format, nodes = graph.nodes().len(), "exported graph");
        Ok(native)
    }

    pub fn export_to_path(
        &self,
        graph: &Graph,
        format: Format,
        path: &Path,
        pretty: bool,
    ) -> Result<(), TranscodeError> {
        self.export(graph, format)?.write_to(path, pretty)
    }
}

/// Runs a transcoder's sniff, treating a panic as "cannot handle".
fn sniff(transcoder: &dyn Transcoder, payload: &Payload) -> bool {
    catch_unwind(AssertUnwindSafe(|| transcoder.detect(payload))).unwrap_or_else(|_| {
        warn!(format = %transcoder.format(), "detect panicked; treating as no match");
        false
    })
}
