//! File-based configuration, read from `voxflow.toml`.

use serde::Deserialize;
use std::path::{Path, PathBuf};
use tracing::{debug, warn};

/// Default config file, looked up in the working directory.
pub const CONFIG_FILE: &str = "voxflow.toml";

#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
pub struct Config {
    #[serde(default)]
    pub import: ImportConfig,
    #[serde(default)]
    pub export: ExportConfig,
}

#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
pub struct ImportConfig {
    /// Log validation issues after every import.
    #[serde(default)]
    pub validate: bool,
    /// Model assigned to imported graphs that name none.
    pub default_model: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct ExportConfig {
    #[serde(default = "default_pretty")]
    pub pretty: bool,
    /// Wrap `retell_flow` exports in the UI-importable agent envelope.
    #[serde(default)]
    pub envelope: bool,
}

fn default_pretty() -> bool {
    true
}

impl Default for ExportConfig {
    fn default() -> Self {
        Self {
            pretty: default_pretty(),
            envelope: false,
        }
    }
}

impl Config {
    /// Loads `path`, or `voxflow.toml` in the working directory.
    ///
    /// A missing file yields defaults; an unparsable one is logged and also
    /// yields defaults.
    pub fn load(path: Option<&Path>) -> Self {
        let path = path
            .map(Path::to_path_buf)
            .unwrap_or_else(|| PathBuf::from(CONFIG_FILE));

        match std::fs::read_to_string(&path) {
            Ok(contents) => match toml::from_str(&contents) {
                Ok(config) => {
                    debug!(path = %path.display(), "loaded config");
                    config
                }
                Err(e) => {
                    warn!(path = %path.display(), error = %e, "failed to parse config; using defaults");
                    Self::default()
                }
            },
            Err(_) => {
                debug!(path = %path.display(), "config file not found; using defaults");
                Self::default()
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_all_sections() {
        let toml = r#"
[import]
validate = true
default_model = "gpt-4o"

[export]
pretty = false
envelope = true
"#;
        let config: Config = toml::from_str(toml).unwrap();
        assert!(config.import.validate);
        assert_eq!(config.import.default_model.as_deref(), Some("gpt-4o"));
        assert!(!config.export.pretty);
        assert!(config.export.envelope);
    }

    #[test]
    fn empty_file_gives_defaults() {
        let config: Config = toml::from_str("").unwrap();
        assert_eq!(config, Config::default());
        assert!(config.export.pretty);
    }

    #[test]
    fn missing_file_gives_defaults() {
        let config = Config::load(Some(Path::new("/nonexistent/voxflow.toml")));
        assert_eq!(config, Config::default());
    }
}
