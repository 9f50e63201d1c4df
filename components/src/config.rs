//! Registry configuration.

use crate::error::{Error, Result};
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::Path;

/// What to do when a component is unloaded before it ever became fully
/// loaded. This is usually a teardown-ordering bug, but shutdown can
/// legitimately race ahead of initialization.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PrematureUnloadPolicy {
  /// Emit a `warn` event and continue.
  #[default]
  Warn,
  /// Continue silently.
  Ignore,
  /// Panic at the offending teardown. Meant for debugging sessions.
  Panic,
}

/// Configuration of a [`Registry`](crate::Registry).
///
/// ```
/// use fibre_components::{PrematureUnloadPolicy, RegistryConfig};
///
/// let config = RegistryConfig::from_yaml_str("label: ui\npremature_unload: ignore\n").unwrap();
/// assert_eq!(config.label, "ui");
/// assert_eq!(config.premature_unload, PrematureUnloadPolicy::Ignore);
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct RegistryConfig {
  /// Attached to every log event the registry emits.
  pub label: String,
  pub premature_unload: PrematureUnloadPolicy,
}

impl Default for RegistryConfig {
  fn default() -> Self {
    Self {
      label: "default".to_string(),
      premature_unload: PrematureUnloadPolicy::default(),
    }
  }
}

impl RegistryConfig {
  pub fn from_yaml_str(source: &str) -> Result<Self> {
    serde_yaml::from_str(source).map_err(|e| Error::ConfigParse(e.to_string()))
  }

  /// Reads a YAML configuration file.
  pub fn from_file(path: impl AsRef<Path>) -> Result<Self> {
    let contents = fs::read_to_string(path)?;
    Self::from_yaml_str(&contents)
  }

  pub fn with_label(mut self, label: impl Into<String>) -> Self {
    self.label = label.into();
    self
  }

  pub fn with_premature_unload(mut self, policy: PrematureUnloadPolicy) -> Self {
    self.premature_unload = policy;
    self
  }
}
