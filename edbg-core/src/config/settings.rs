//! Debugger settings

use std::fs;
use std::io;
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};
use thiserror::Error;
use tracing::{debug, info};

use crate::value::ValueDisplayFormat;

/// Errors loading the debugger settings
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("cannot read configuration: {0}")]
    Io(#[from] io::Error),
    #[error("invalid configuration: {0}")]
    Toml(#[from] toml::de::Error),
}

/// Settings of one debugger connection
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct DebuggerConfig {
    /// Connector name, used as the first layout directory level
    pub connector_name: String,
    /// Root directory of stored register layouts
    pub layout_dir: PathBuf,
    /// Format used to show register values
    pub display_format: ValueDisplayFormat,
    /// Broadcast GetVersion as soon as the transport connects
    pub search_on_connect: bool,
    /// Turn all debug channels off after a node is discovered
    pub reset_channels_on_discovery: bool,
}

impl Default for DebuggerConfig {
    fn default() -> Self {
        Self {
            connector_name: "Serial".to_string(),
            layout_dir: PathBuf::from("configurations"),
            display_format: ValueDisplayFormat::Default,
            search_on_connect: true,
            reset_channels_on_discovery: true,
        }
    }
}

impl DebuggerConfig {
    /// Parse settings from TOML text; missing keys take their defaults
    pub fn from_toml_str(text: &str) -> Result<Self, ConfigError> {
        let config: Self = toml::from_str(text)?;
        Ok(config)
    }

    /// Load settings from a TOML file
    pub fn load(path: &Path) -> Result<Self, ConfigError> {
        info!("Loading debugger configuration from {}", path.display());
        let text = fs::read_to_string(path)?;
        debug!("Read {} bytes of TOML", text.len());

        let config = Self::from_toml_str(&text)?;
        debug!("  connector: {}", config.connector_name);
        debug!("  layouts: {}", config.layout_dir.display());
        Ok(config)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_empty_config_uses_defaults() {
        let config = DebuggerConfig::from_toml_str("").unwrap();
        assert_eq!(config, DebuggerConfig::default());
    }

    #[test]
    fn test_partial_config() {
        let config = DebuggerConfig::from_toml_str(
            r#"
            connector_name = "TCP"
            display_format = "Hex"
            search_on_connect = false
            "#,
        )
        .unwrap();

        assert_eq!(config.connector_name, "TCP");
        assert_eq!(config.display_format, ValueDisplayFormat::Hex);
        assert!(!config.search_on_connect);
        assert!(config.reset_channels_on_discovery);
        assert_eq!(config.layout_dir, PathBuf::from("configurations"));
    }

    #[test]
    fn test_invalid_config() {
        assert!(matches!(
            DebuggerConfig::from_toml_str("search_on_connect = \"yes\""),
            Err(ConfigError::Toml(_))
        ));
    }

    #[test]
    fn test_load_missing_file() {
        let dir = tempfile::tempdir().unwrap();
        let result = DebuggerConfig::load(&dir.path().join("missing.toml"));
        assert!(matches!(result, Err(ConfigError::Io(_))));
    }
}
