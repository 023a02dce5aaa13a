use crate::graph::Metadata;
use serde_json::Map;
use serde_json::Value;

/// Explicit allow-list of vendor keys copied verbatim between a vendor
/// envelope and a canonical metadata bag.
///
/// Keys outside the list are dropped on import and never fabricated on export.
#[derive(Debug, Clone, Copy)]
pub struct Passthrough {
    keys: &'static [&'static str],
}

impl Passthrough {
    pub const fn new(keys: &'static [&'static str]) -> Self {
        Self { keys }
    }

    pub fn keys(&self) -> &'static [&'static str] {
        self.keys
    }

    pub fn allows(&self, key: &str) -> bool {
        self.keys.contains(&key)
    }

    /// Copies allowed keys out of a vendor object.
    pub fn lift(&self, source: &Map<String, Value>) -> Metadata {
        self.keys
            .iter()
            .filter_map(|key| source.get(*key).map(|v| (key.to_string(), v.clone())))
            .collect()
    }

    /// Copies allowed keys from metadata into a vendor object.
    ///
    /// Keys the exporter already wrote take precedence.
    pub fn lower(&self, metadata: &Metadata, target: &mut Map<String, Value>) {
        for key in self.keys {
            if let Some(value) = metadata.get(*key) {
                target
                    .entry(key.to_string())
                    .or_insert_with(|| value.clone());
            }
        }
    }
}
