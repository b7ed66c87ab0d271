//! Process startup configuration for the recorder, loaded the way
//! `OnyxConfig`/`ObsidianConfig` load theirs: a TOML file with
//! `#[serde(default = "...")]` fallbacks, a `thiserror` error enum
//! distinguishing "couldn't read the file" from "couldn't parse it".

use serde::Deserialize;
use std::path::Path;

#[derive(Debug, Deserialize)]
pub struct RecorderConfig {
    /// Default ring capacity for channels that don't specify their own.
    #[serde(default = "defaults::default_capacity")]
    pub default_capacity: u32,

    /// Path to the shared-export file; absent means export stays disabled.
    #[serde(default)]
    pub export_path: Option<String>,

    /// Maximum directory slots reserved in the export file, including the
    /// configuration channel.
    #[serde(default = "defaults::max_channels")]
    pub max_channels: u32,

    /// An initial `RECORDER_TRACES`-style clause string, applied once at
    /// startup before any `RECORDER_TRACES` environment override.
    #[serde(default)]
    pub initial_traces: String,
}

#[derive(Debug, thiserror::Error)]
pub enum RegistryConfigError {
    #[error("failed to read '{path}'")]
    Read {
        path: String,
        #[source]
        source: std::io::Error,
    },

    #[error("failed to parse recorder config")]
    Parse(#[from] toml::de::Error),
}

mod defaults {
    pub fn default_capacity() -> u32 {
        1024
    }

    pub fn max_channels() -> u32 {
        64
    }
}

impl RecorderConfig {
    pub fn load(path: impl AsRef<Path> + ToString) -> Result<Self, RegistryConfigError> {
        let text = std::fs::read_to_string(&path).map_err(|source| RegistryConfigError::Read {
            path: path.to_string(),
            source,
        })?;
        let config: RecorderConfig = toml::from_str(&text)?;
        Ok(config)
    }
}

impl Default for RecorderConfig {
    fn default() -> Self {
        Self {
            default_capacity: defaults::default_capacity(),
            export_path: None,
            max_channels: defaults::max_channels(),
            initial_traces: String::new(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_apply_when_fields_are_absent() {
        let config: RecorderConfig = toml::from_str("").unwrap();
        assert_eq!(config.default_capacity, 1024);
        assert_eq!(config.max_channels, 64);
        assert!(config.export_path.is_none());
    }

    #[test]
    fn overrides_parse() {
        let toml = r#"
            default_capacity = 4096
            export_path = "/tmp/recorder.bus"
            initial_traces = "http_error=1"
        "#;
        let config: RecorderConfig = toml::from_str(toml).unwrap();
        assert_eq!(config.default_capacity, 4096);
        assert_eq!(config.export_path.as_deref(), Some("/tmp/recorder.bus"));
        assert_eq!(config.initial_traces, "http_error=1");
    }
}
