//! Command execution

use crate::bridge;
use crate::cli::{Cli, Commands};
use crate::config::{load_settings_file, CliConfig};
use crate::error::Result;
use serde_json::{Map, Value};
use std::path::PathBuf;
use tabhold_core::SettingsMirror;
use tabhold_runtime::listening_types;
use tokio::io::BufReader;
use tracing::info;

pub struct CommandDispatcher;

impl CommandDispatcher {
    pub async fn execute(cli: Cli, config: CliConfig) -> Result<()> {
        let settings_file = cli
            .settings
            .map(PathBuf::from)
            .or_else(|| config.settings_file.clone());
        let settings = match &settings_file {
            Some(path) => {
                info!("Loading settings from {}", path.display());
                Some(load_settings_file(path)?)
            }
            None => None,
        };

        match cli.command {
            Commands::Serve { host_id, name } => {
                let mut arbiter = config.arbiter;
                if let Some(host_id) = host_id {
                    arbiter.host_extension_id = host_id;
                }
                if let Some(name) = name {
                    arbiter.extension_name = name;
                }
                arbiter.validate()?;

                if settings.is_none() {
                    info!("No settings file; waiting for a storage-loaded line");
                }
                bridge::serve(
                    arbiter,
                    settings,
                    BufReader::new(tokio::io::stdin()),
                    tokio::io::stdout(),
                )
                .await
            }
            Commands::ListeningTypes => {
                let types = Self::listening_types_for(&settings.unwrap_or_default());
                println!("{}", serde_json::to_string(&types)?);
                Ok(())
            }
        }
    }

    /// Registration type set for persisted values, missing keys at defaults
    fn listening_types_for(values: &Map<String, Value>) -> Vec<tabhold_core::ListeningType> {
        let mirror = SettingsMirror::new();
        mirror.load(values);
        listening_types(&mirror.snapshot())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;
    use tabhold_core::ListeningType;

    #[test]
    fn test_listening_types_from_stored_values() {
        let values = match json!({
            "detectDragAndDrop": false,
            "detectLongPressedTabs": true,
            "preventDragAndDropAfterLongPress": true,
            "preventDragAndDropAfterLongPress_Legacy": true,
        }) {
            Value::Object(map) => map,
            _ => unreachable!(),
        };

        let types = CommandDispatcher::listening_types_for(&values);
        assert!(!types.contains(&ListeningType::NativeTabDragstart));
        assert!(types.contains(&ListeningType::TabDragstart));
        assert!(types.contains(&ListeningType::TabDragready));
    }
}
