//! Configuration for datapipe.
//!
//! Settings can be loaded from a TOML file:
//!
//! ```toml
//! [registry]
//! on_duplicate = "reject"   # or "replace" (default)
//! ```

use std::path::Path;

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};

/// What to do when a chain operation name is registered twice.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DuplicatePolicy {
    /// The newer factory replaces the older one; a warning is logged.
    #[default]
    Replace,
    /// Registration fails with `DuplicateOperation`.
    Reject,
}

/// Chain registry settings.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct RegistryConfig {
    /// Policy for re-registering an existing name.
    #[serde(default)]
    pub on_duplicate: DuplicatePolicy,
}

/// Top-level datapipe configuration.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct DatapipeConfig {
    /// Chain registry settings.
    #[serde(default)]
    pub registry: RegistryConfig,
}

impl DatapipeConfig {
    /// Load configuration from `path`.
    ///
    /// If the file doesn't exist, returns default configuration.
    pub fn load_from(path: &Path) -> Result<Self> {
        if !path.exists() {
            tracing::debug!("No config file at {}, using defaults", path.display());
            return Ok(Self::default());
        }

        let content = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read config from {}", path.display()))?;

        Self::from_toml_str(&content)
            .with_context(|| format!("Failed to parse config from {}", path.display()))
    }

    /// Parse configuration from TOML text.
    pub fn from_toml_str(content: &str) -> Result<Self> {
        Ok(toml::from_str(content)?)
    }

    /// Serialize back to TOML.
    pub fn to_toml_string(&self) -> Result<String> {
        Ok(toml::to_string_pretty(self)?)
    }
}
