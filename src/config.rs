//! YAML configuration file support for EMPI.
//!
//! Aggregates every tunable sub-config (metrics, comparators, matching,
//! graph, storage, server) behind one `EmpiConfig` so an operator can
//! describe a whole deployment in one file, mirroring how the stage
//! configs of the content-fingerprinting pipeline this engine grew out
//! of were bundled into one YAML document.
//!
//! ## Example YAML Configuration
//!
//! ```yaml
//! version: "1.0"
//!
//! metrics: {}
//!
//! comparators:
//!   slice_min: 3
//!
//! match:
//!   mode: "prod"
//!   threshold: 0.5
//!   slice_min: 3
//!
//! graph:
//!   threshold: 0.5
//!
//! store:
//!   backend: "memory"
//!
//! server:
//!   bind_address: "0.0.0.0:8080"
//!   api_keys: ["dev-key"]
//!   rate_limit_per_minute: 600
//!   batch_deadline_secs: 300
//! ```

use std::collections::HashMap;
use std::fs;
use std::path::Path;

use serde::{Deserialize, Serialize};
use thiserror::Error;

use match_engine::MatchConfig;

/// Errors that can occur when loading YAML configuration files.
#[derive(Debug, Error)]
pub enum ConfigLoadError {
    #[error("failed to read config file: {0}")]
    FileRead(#[from] std::io::Error),

    #[error("failed to parse YAML: {0}")]
    YamlParse(#[from] serde_yaml::Error),

    #[error("validation error: {0}")]
    Validation(String),

    #[error("unsupported config version: {0}")]
    UnsupportedVersion(String),
}

/// Top-level YAML configuration for an EMPI deployment.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub struct EmpiConfig {
    pub version: String,

    #[serde(default)]
    pub name: Option<String>,

    #[serde(default)]
    pub metrics: MetricsConfig,

    #[serde(default)]
    pub comparators: ComparatorConfig,

    #[serde(default, rename = "match")]
    pub match_config: MatchConfig,

    #[serde(default)]
    pub graph: GraphConfig,

    #[serde(default)]
    pub store: StoreConfig,

    #[serde(default)]
    pub server: ServerConfig,

    #[serde(default)]
    pub env_overrides: HashMap<String, String>,
}

impl EmpiConfig {
    /// Load a YAML configuration file from the given path.
    pub fn from_file<P: AsRef<Path>>(path: P) -> Result<Self, ConfigLoadError> {
        let content = fs::read_to_string(path)?;
        Self::from_yaml(&content)
    }

    /// Parse YAML configuration from a string.
    pub fn from_yaml(yaml: &str) -> Result<Self, ConfigLoadError> {
        let config: EmpiConfig = serde_yaml::from_str(yaml)?;
        config.validate()?;
        Ok(config)
    }

    fn validate(&self) -> Result<(), ConfigLoadError> {
        match self.version.as_str() {
            "1.0" | "1" => Ok(()),
            v => Err(ConfigLoadError::UnsupportedVersion(v.to_string())),
        }?;

        self.comparators.validate()?;
        self.match_config
            .validate()
            .map_err(|err| ConfigLoadError::Validation(err.to_string()))?;
        self.graph.validate()?;
        self.server.validate()?;
        Ok(())
    }
}

impl Default for EmpiConfig {
    fn default() -> Self {
        Self {
            version: "1.0".to_string(),
            name: None,
            metrics: MetricsConfig::default(),
            comparators: ComparatorConfig::default(),
            match_config: MatchConfig::default(),
            graph: GraphConfig::default(),
            store: StoreConfig::default(),
            server: ServerConfig::default(),
            env_overrides: HashMap::new(),
        }
    }
}

/// String-metric kit configuration. No tunables today — reserved so a
/// future weighting scheme doesn't need a breaking YAML shape change.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct MetricsConfig {}

/// Field-comparator configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ComparatorConfig {
    #[serde(default = "default_slice_min")]
    pub slice_min: usize,
}

impl ComparatorConfig {
    fn validate(&self) -> Result<(), ConfigLoadError> {
        if self.slice_min == 0 {
            return Err(ConfigLoadError::Validation(
                "comparators.slice_min must be greater than zero".to_string(),
            ));
        }
        Ok(())
    }
}

impl Default for ComparatorConfig {
    fn default() -> Self {
        Self {
            slice_min: default_slice_min(),
        }
    }
}

fn default_slice_min() -> usize {
    comparators::DEFAULT_SLICE_MIN
}

/// Graph recursor/cursor configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GraphConfig {
    #[serde(default = "default_graph_threshold")]
    pub threshold: f64,
}

impl GraphConfig {
    fn validate(&self) -> Result<(), ConfigLoadError> {
        if !(0.0..=1.0).contains(&self.threshold) {
            return Err(ConfigLoadError::Validation(
                "graph.threshold must be between 0.0 and 1.0".to_string(),
            ));
        }
        Ok(())
    }
}

impl Default for GraphConfig {
    fn default() -> Self {
        Self {
            threshold: default_graph_threshold(),
        }
    }
}

fn default_graph_threshold() -> f64 {
    0.5
}

/// Which [`store::StoreBackend`] to build.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "backend", rename_all = "snake_case")]
pub enum StoreConfig {
    Memory,
    #[cfg(feature = "backend-redb")]
    Redb { path: String },
}

impl Default for StoreConfig {
    fn default() -> Self {
        StoreConfig::Memory
    }
}

/// HTTP server configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ServerConfig {
    #[serde(default = "default_bind_address")]
    pub bind_address: String,

    #[serde(default)]
    pub api_keys: Vec<String>,

    #[serde(default = "default_rate_limit_per_minute")]
    pub rate_limit_per_minute: u32,

    #[serde(default = "default_batch_deadline_secs")]
    pub batch_deadline_secs: u64,
}

impl ServerConfig {
    fn validate(&self) -> Result<(), ConfigLoadError> {
        if self.rate_limit_per_minute == 0 {
            return Err(ConfigLoadError::Validation(
                "server.rate_limit_per_minute must be greater than zero".to_string(),
            ));
        }
        Ok(())
    }
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            bind_address: default_bind_address(),
            api_keys: Vec::new(),
            rate_limit_per_minute: default_rate_limit_per_minute(),
            batch_deadline_secs: default_batch_deadline_secs(),
        }
    }
}

fn default_bind_address() -> String {
    "0.0.0.0:8080".to_string()
}

fn default_rate_limit_per_minute() -> u32 {
    600
}

fn default_batch_deadline_secs() -> u64 {
    300
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_config_round_trips_and_validates() {
        let config = EmpiConfig::default();
        let yaml = serde_yaml::to_string(&config).unwrap();
        let parsed = EmpiConfig::from_yaml(&yaml).unwrap();
        assert_eq!(parsed.version, "1.0");
        assert_eq!(parsed.server.bind_address, "0.0.0.0:8080");
    }

    #[test]
    fn partial_yaml_uses_field_defaults() {
        let yaml = r#"
version: "1.0"
server:
  bind_address: "127.0.0.1:9090"
  api_keys: ["a-key"]
"#;
        let config = EmpiConfig::from_yaml(yaml).unwrap();
        assert_eq!(config.server.bind_address, "127.0.0.1:9090");
        assert_eq!(config.server.api_keys, vec!["a-key".to_string()]);
        assert_eq!(config.server.rate_limit_per_minute, 600);
        assert_eq!(config.comparators.slice_min, comparators::DEFAULT_SLICE_MIN);
    }

    #[test]
    fn unsupported_version_is_rejected() {
        let yaml = "version: \"9.9\"\n";
        let err = EmpiConfig::from_yaml(yaml).unwrap_err();
        assert!(matches!(err, ConfigLoadError::UnsupportedVersion(_)));
    }

    #[test]
    fn zero_rate_limit_is_rejected() {
        let mut config = EmpiConfig::default();
        config.server.rate_limit_per_minute = 0;
        let yaml = serde_yaml::to_string(&config).unwrap();
        let err = EmpiConfig::from_yaml(&yaml).unwrap_err();
        assert!(matches!(err, ConfigLoadError::Validation(_)));
    }
}
