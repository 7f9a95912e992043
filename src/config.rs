//! Generator Configuration
//!
//! Every field has a default, so an empty JSON object is a complete config.

use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;
use thiserror::Error;

use crate::codegen::BackendKind;
use crate::provider::RetryPolicy;

pub const DEFAULT_REACT_HOOKS_MODULE: &str = "@your-ds/data";
pub const DEFAULT_ANGULAR_SERVICES_MODULE: &str = "@your-ds/angular/services";

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Failed to read config {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Invalid config: {0}")]
    Parse(#[from] serde_json::Error),
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct GeneratorConfig {
    #[serde(default = "default_out_dir")]
    pub out_dir: PathBuf,
    #[serde(default)]
    pub backend: BackendKind,
    #[serde(default = "default_manifest_path")]
    pub manifest_path: PathBuf,
    /// Run the textual checks on emitted source.
    #[serde(default = "default_true")]
    pub validate_output: bool,
    /// Run the external formatter on the written file.
    #[serde(default)]
    pub format: bool,
    #[serde(default = "default_formatter")]
    pub formatter: Vec<String>,
    #[serde(default)]
    pub data_layer: DataLayerConfig,
    #[serde(default)]
    pub retry: RetryConfig,
}

fn default_true() -> bool { true }
fn default_out_dir() -> PathBuf { PathBuf::from("src/pages") }
fn default_manifest_path() -> PathBuf { PathBuf::from("design-system/components.manifest.json") }
fn default_formatter() -> Vec<String> {
    ["npx", "prettier", "--write"].iter().map(|s| s.to_string()).collect()
}

impl Default for GeneratorConfig {
    fn default() -> Self {
        Self {
            out_dir: default_out_dir(),
            backend: BackendKind::default(),
            manifest_path: default_manifest_path(),
            validate_output: true,
            format: false,
            formatter: default_formatter(),
            data_layer: DataLayerConfig::default(),
            retry: RetryConfig::default(),
        }
    }
}

impl GeneratorConfig {
    pub fn load(path: &Path) -> Result<Self, ConfigError> {
        let content = fs::read_to_string(path).map_err(|source| ConfigError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        Ok(serde_json::from_str(&content)?)
    }

    /// Load when a path is given, defaults otherwise.
    pub fn load_or_default(path: Option<&Path>) -> Result<Self, ConfigError> {
        match path {
            Some(path) => Self::load(path),
            None => Ok(Self::default()),
        }
    }
}

/// Where generated code imports its data-access helpers from.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct DataLayerConfig {
    #[serde(default = "default_react_hooks_module")]
    pub react_hooks_module: String,
    #[serde(default = "default_angular_services_module")]
    pub angular_services_module: String,
}

fn default_react_hooks_module() -> String { DEFAULT_REACT_HOOKS_MODULE.to_string() }
fn default_angular_services_module() -> String { DEFAULT_ANGULAR_SERVICES_MODULE.to_string() }

impl Default for DataLayerConfig {
    fn default() -> Self {
        Self {
            react_hooks_module: default_react_hooks_module(),
            angular_services_module: default_angular_services_module(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct RetryConfig {
    #[serde(default = "default_max_attempts")]
    pub max_attempts: u32,
    #[serde(default = "default_delay_ms")]
    pub delay_ms: u64,
}

fn default_max_attempts() -> u32 { 3 }
fn default_delay_ms() -> u64 { 1000 }

impl Default for RetryConfig {
    fn default() -> Self {
        Self {
            max_attempts: default_max_attempts(),
            delay_ms: default_delay_ms(),
        }
    }
}

impl From<&RetryConfig> for RetryPolicy {
    fn from(config: &RetryConfig) -> Self {
        RetryPolicy::new(config.max_attempts, Duration::from_millis(config.delay_ms))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_empty_object_is_default() {
        let config: GeneratorConfig = serde_json::from_str("{}").unwrap();
        assert_eq!(config, GeneratorConfig::default());
        assert_eq!(config.backend, BackendKind::Angular);
        assert!(config.validate_output);
    }

    #[test]
    fn test_partial_override() {
        let config: GeneratorConfig = serde_json::from_str(
            r#"{"backend": "react", "outDir": "web/pages", "retry": {"maxAttempts": 5}}"#,
        )
        .unwrap();
        assert_eq!(config.backend, BackendKind::React);
        assert_eq!(config.out_dir, PathBuf::from("web/pages"));
        assert_eq!(config.retry.max_attempts, 5);
        assert_eq!(config.retry.delay_ms, 1000);
        assert_eq!(config.data_layer.react_hooks_module, DEFAULT_REACT_HOOKS_MODULE);
    }

    #[test]
    fn test_retry_policy_from_config() {
        let policy = RetryPolicy::from(&RetryConfig { max_attempts: 2, delay_ms: 50 });
        assert_eq!(policy.max_attempts, 2);
        assert_eq!(policy.delay, Duration::from_millis(50));
    }

    #[test]
    fn test_missing_file_is_io_error() {
        let err = GeneratorConfig::load(Path::new("/nonexistent/pagesmith.json")).unwrap_err();
        assert!(matches!(err, ConfigError::Io { .. }));
    }
}
