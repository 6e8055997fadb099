//! Configuration types and management for flytta.

use std::path::PathBuf;

use serde::{Deserialize, Serialize};

use crate::core::errors::{FlyttaError, Result};
use crate::relocate::request::WrapperStrategy;

/// Main configuration for the relocation engine.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct FlyttaConfig {
    /// Call-site wrapper settings
    #[serde(default)]
    pub wrappers: WrapperConfig,

    /// Anchor defaults
    #[serde(default)]
    pub anchors: AnchorConfig,

    /// Persistence settings
    #[serde(default)]
    pub persistence: PersistenceConfig,
}

impl FlyttaConfig {
    /// Load configuration from a YAML file.
    pub fn from_yaml_file(path: impl Into<PathBuf>) -> Result<Self> {
        let path = path.into();
        let content = std::fs::read_to_string(&path).map_err(|e| {
            FlyttaError::io(format!("Failed to read config file: {}", path.display()), e)
        })?;

        let config: Self = serde_yaml::from_str(&content)?;
        config.validate()?;
        Ok(config)
    }

    /// Save configuration to a YAML file.
    pub fn to_yaml_file(&self, path: impl Into<PathBuf>) -> Result<()> {
        let path = path.into();
        let content = serde_yaml::to_string(self)?;
        std::fs::write(&path, content).map_err(|e| {
            FlyttaError::io(
                format!("Failed to write config file: {}", path.display()),
                e,
            )
        })
    }

    /// Validate the configuration.
    pub fn validate(&self) -> Result<()> {
        if !is_identifier(&self.anchors.default_parameter_name) {
            return Err(FlyttaError::config_field(
                format!(
                    "'{}' is not a valid identifier",
                    self.anchors.default_parameter_name
                ),
                "anchors.default_parameter_name",
            ));
        }
        if !self.persistence.file_extension.starts_with('.') {
            return Err(FlyttaError::config_field(
                format!(
                    "extension '{}' must start with '.'",
                    self.persistence.file_extension
                ),
                "persistence.file_extension",
            ));
        }
        Ok(())
    }
}

/// Call-site wrapper settings.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct WrapperConfig {
    /// Strategy used when a batch does not specify one
    #[serde(default)]
    pub default_strategy: WrapperStrategy,
}

/// Anchor defaults.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AnchorConfig {
    /// Parameter name used by convert-to-static when the caller gives none
    #[serde(default = "AnchorConfig::default_parameter")]
    pub default_parameter_name: String,

    /// Whether a field anchor naming a missing target field creates it
    #[serde(default = "AnchorConfig::default_create_missing")]
    pub create_missing_fields: bool,
}

impl AnchorConfig {
    fn default_parameter() -> String {
        "self".to_string()
    }

    fn default_create_missing() -> bool {
        true
    }
}

impl Default for AnchorConfig {
    fn default() -> Self {
        Self {
            default_parameter_name: Self::default_parameter(),
            create_missing_fields: Self::default_create_missing(),
        }
    }
}

/// Persistence settings.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PersistenceConfig {
    /// Create missing parent directories when persisting units
    #[serde(default = "PersistenceConfig::default_create_dirs")]
    pub create_missing_dirs: bool,

    /// Extension for units created by the materializer
    #[serde(default = "PersistenceConfig::default_extension")]
    pub file_extension: String,
}

impl PersistenceConfig {
    fn default_create_dirs() -> bool {
        true
    }

    fn default_extension() -> String {
        ".cs".to_string()
    }
}

impl Default for PersistenceConfig {
    fn default() -> Self {
        Self {
            create_missing_dirs: Self::default_create_dirs(),
            file_extension: Self::default_extension(),
        }
    }
}

fn is_identifier(name: &str) -> bool {
    let mut chars = name.chars();
    match chars.next() {
        Some(c) if c.is_alphabetic() || c == '_' => {}
        _ => return false,
    }
    chars.all(|c| c.is_alphanumeric() || c == '_')
}
