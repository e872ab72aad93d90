//! tabhold CLI Configuration
//!
//! An optional TOML file holds the `[arbiter]` table and the path of the
//! persisted settings. Command line flags are applied on top by the caller.

use crate::error::{CliError, Result};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use std::path::{Path, PathBuf};
use tabhold_core::ArbiterConfig;
use tracing::info;

/// Complete configuration for the CLI
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct CliConfig {
    /// Runtime configuration
    pub arbiter: ArbiterConfig,

    /// JSON file with the persisted settings, loaded at startup
    #[serde(skip_serializing_if = "Option::is_none")]
    pub settings_file: Option<PathBuf>,
}

impl CliConfig {
    /// Load configuration from a specific file path
    pub fn load_from_file<P: AsRef<Path>>(path: P) -> Result<Self> {
        let contents = std::fs::read_to_string(path.as_ref())?;
        let config = Self::from_toml(&contents)?;
        info!("Loaded configuration from {}", path.as_ref().display());
        Ok(config)
    }

    pub fn from_toml(contents: &str) -> Result<Self> {
        let config: CliConfig = toml::from_str(contents)?;
        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> Result<()> {
        self.arbiter.validate()?;
        Ok(())
    }
}

/// Read persisted settings: a JSON object of setting names to values
pub fn load_settings_file<P: AsRef<Path>>(path: P) -> Result<Map<String, Value>> {
    let contents = std::fs::read_to_string(path.as_ref())?;
    match serde_json::from_str(&contents)? {
        Value::Object(values) => Ok(values),
        _ => Err(CliError::Config(format!(
            "{} does not contain a JSON object",
            path.as_ref().display()
        ))),
    }
}
