//! Configuration types for configuration sessions
//!
//! This module defines all configuration structures used throughout the crate.

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use std::path::Path;

use crate::diff::DiffStrategy;

/// Main configuration
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct NetConvergeConfig {
    /// Run mode options
    #[serde(default)]
    pub run: RunOptions,

    /// Backend tuning
    #[serde(default)]
    pub backend: BackendConfig,

    /// Reconciler settings
    #[serde(default)]
    pub reconciler: ReconcilerConfig,
}

impl NetConvergeConfig {
    /// Create a new configuration with defaults
    pub fn new() -> Self {
        Self::default()
    }

    /// Validate the configuration
    pub fn validate(&self) -> Result<(), crate::Error> {
        self.backend.validate()?;
        self.reconciler.validate()?;
        Ok(())
    }

    /// Parse and validate a JSON document
    pub fn from_json_str(json: &str) -> Result<Self, crate::Error> {
        let config: Self = serde_json::from_str(json)?;
        config.validate()?;
        Ok(config)
    }

    /// Read, parse and validate a JSON configuration file
    pub async fn from_file(path: impl AsRef<Path>) -> Result<Self, crate::Error> {
        let contents = tokio::fs::read_to_string(path.as_ref()).await?;
        Self::from_json_str(&contents)
    }
}

/// Run mode, injected into the reconciler
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct RunOptions {
    /// Never commit; report what would change and abort
    #[serde(default)]
    pub dry_run: bool,

    /// Fail the pass when the device flags the loaded candidate as invalid
    ///
    /// Off by default: the flag is only reported in the load result and the
    /// pass carries on to the diff.
    #[serde(default)]
    pub reject_invalid_load: bool,
}

impl RunOptions {
    /// Options for an apply run
    pub fn apply() -> Self {
        Self::default()
    }

    /// Options for a dry run
    pub fn dry_run() -> Self {
        Self {
            dry_run: true,
            ..Self::default()
        }
    }
}

/// Backend tuning shared by all vendor backends
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BackendConfig {
    /// Diff policy of the Arista backend
    ///
    /// Only `set_difference` and `symmetric_difference` are meaningful.
    #[serde(default = "default_arista_diff")]
    pub arista_diff: DiffStrategy,

    /// Delay multiplier passed with the load's command submission
    #[serde(default = "default_load_delay_factor")]
    pub load_delay_factor: u32,

    /// Delay multiplier passed when fetching a session's configuration
    #[serde(default = "default_session_show_delay_factor")]
    pub session_show_delay_factor: u32,

    /// Options forwarded to the Junos load RPC
    #[serde(default)]
    pub junos_load: JunosLoadOptions,
}

impl BackendConfig {
    /// Validate the backend configuration
    pub fn validate(&self) -> Result<(), crate::Error> {
        match self.arista_diff {
            DiffStrategy::SetDifference | DiffStrategy::SymmetricDifference => {}
            other => {
                return Err(crate::Error::config(format!(
                    "Arista diff strategy must be set_difference or symmetric_difference, got {}",
                    other
                )));
            }
        }

        if !(1..=MAX_DELAY_FACTOR).contains(&self.load_delay_factor) {
            return Err(crate::Error::config(format!(
                "load_delay_factor must be between 1 and {}. Got: {}",
                MAX_DELAY_FACTOR, self.load_delay_factor
            )));
        }

        if !(1..=MAX_DELAY_FACTOR).contains(&self.session_show_delay_factor) {
            return Err(crate::Error::config(format!(
                "session_show_delay_factor must be between 1 and {}. Got: {}",
                MAX_DELAY_FACTOR, self.session_show_delay_factor
            )));
        }

        self.junos_load.validate()
    }
}

impl Default for BackendConfig {
    fn default() -> Self {
        Self {
            arista_diff: default_arista_diff(),
            load_delay_factor: default_load_delay_factor(),
            session_show_delay_factor: default_session_show_delay_factor(),
            junos_load: JunosLoadOptions::default(),
        }
    }
}

const MAX_DELAY_FACTOR: u32 = 20;

fn default_arista_diff() -> DiffStrategy {
    DiffStrategy::SymmetricDifference
}

fn default_load_delay_factor() -> u32 {
    2
}

fn default_session_show_delay_factor() -> u32 {
    4
}

/// Options forwarded to the Junos load RPC
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct JunosLoadOptions {
    /// Configuration format (`text`, `set`, `xml`, `json`)
    #[serde(default)]
    pub format: Option<String>,

    /// Replace the whole configuration instead of merging
    #[serde(default)]
    pub overwrite: bool,

    /// Replace only the `replace:`-tagged statements
    #[serde(default)]
    pub replace: bool,
}

impl JunosLoadOptions {
    /// Validate the Junos load options
    pub fn validate(&self) -> Result<(), crate::Error> {
        if let Some(format) = &self.format
            && !matches!(format.as_str(), "text" | "set" | "xml" | "json")
        {
            return Err(crate::Error::config(format!(
                "Junos load format '{}' is not supported. Supported formats: text, set, xml, json",
                format
            )));
        }

        if self.overwrite && self.replace {
            return Err(crate::Error::config(
                "Junos load options overwrite and replace are mutually exclusive",
            ));
        }

        Ok(())
    }

    /// Keyword arguments for the load call
    pub fn to_kwargs(&self) -> Map<String, Value> {
        let mut kwargs = Map::new();
        if let Some(format) = &self.format {
            kwargs.insert("format".to_string(), Value::from(format.clone()));
        }
        if self.overwrite {
            kwargs.insert("overwrite".to_string(), Value::Bool(true));
        }
        if self.replace {
            kwargs.insert("replace".to_string(), Value::Bool(true));
        }
        kwargs
    }
}

/// Reconciler configuration
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ReconcilerConfig {
    /// Capacity of the reconciler event channel
    ///
    /// When full, new events are dropped (with a warning log).
    ///
    /// Default: 100 events
    #[serde(default = "default_event_channel_capacity")]
    pub event_channel_capacity: usize,
}

impl ReconcilerConfig {
    /// Validate the reconciler configuration
    pub fn validate(&self) -> Result<(), crate::Error> {
        if self.event_channel_capacity == 0 {
            return Err(crate::Error::config("event_channel_capacity must be > 0"));
        }
        Ok(())
    }
}

impl Default for ReconcilerConfig {
    fn default() -> Self {
        Self {
            event_channel_capacity: default_event_channel_capacity(),
        }
    }
}

fn default_event_channel_capacity() -> usize {
    100
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    #[test]
    fn test_defaults_validate() {
        let config = NetConvergeConfig::new();
        assert!(config.validate().is_ok());
        assert!(!config.run.dry_run);
        assert!(!config.run.reject_invalid_load);
        assert_eq!(config.backend.load_delay_factor, 2);
        assert_eq!(config.backend.session_show_delay_factor, 4);
        assert_eq!(config.backend.arista_diff, DiffStrategy::SymmetricDifference);
    }

    #[test]
    fn test_empty_document_uses_defaults() {
        let config = NetConvergeConfig::from_json_str("{}").unwrap();
        assert_eq!(config, NetConvergeConfig::default());
    }

    #[test]
    fn test_arista_diff_must_compare_lines() {
        let json = r#"{"backend": {"arista_diff": "unsupported"}}"#;
        let err = NetConvergeConfig::from_json_str(json).unwrap_err();
        assert!(matches!(err, crate::Error::Config(_)));

        let json = r#"{"backend": {"arista_diff": "set_difference"}}"#;
        let config = NetConvergeConfig::from_json_str(json).unwrap();
        assert_eq!(config.backend.arista_diff, DiffStrategy::SetDifference);
    }

    #[test]
    fn test_delay_factor_range() {
        let mut config = BackendConfig::default();
        config.load_delay_factor = 0;
        assert!(config.validate().is_err());

        config.load_delay_factor = 21;
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_junos_load_options() {
        let options = JunosLoadOptions {
            format: Some("set".to_string()),
            overwrite: false,
            replace: true,
        };
        assert!(options.validate().is_ok());

        let kwargs = options.to_kwargs();
        assert_eq!(kwargs["format"], "set");
        assert_eq!(kwargs["replace"], true);
        assert!(!kwargs.contains_key("overwrite"));

        let conflicting = JunosLoadOptions {
            format: None,
            overwrite: true,
            replace: true,
        };
        assert!(conflicting.validate().is_err());

        let bad_format = JunosLoadOptions {
            format: Some("yaml".to_string()),
            ..Default::default()
        };
        assert!(bad_format.validate().is_err());
    }

    #[test]
    fn test_zero_channel_capacity_rejected() {
        let config = ReconcilerConfig {
            event_channel_capacity: 0,
        };
        assert!(config.validate().is_err());
    }

    #[tokio::test]
    async fn test_from_file() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        write!(
            file,
            r#"{{"run": {{"dry_run": true, "reject_invalid_load": true}}}}"#
        )
        .unwrap();

        let config = NetConvergeConfig::from_file(file.path()).await.unwrap();
        assert!(config.run.dry_run);
        assert!(config.run.reject_invalid_load);
    }
}
