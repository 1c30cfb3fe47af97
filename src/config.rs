use serde::Deserialize;
use std::path::Path;

use crate::constants::DEFAULT_DESCRIPTOR_FILE_NAME;

fn default_true() -> bool {
    true
}

fn default_descriptor_file_name() -> String {
    DEFAULT_DESCRIPTOR_FILE_NAME.to_string()
}

/// Options for building a container from a descriptor (maps to [create] in TOML)
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct CreateOptions {
    /// Reject steps whose `sound` does not name an asset in the same descriptor (default: true)
    #[serde(default = "default_true")]
    pub check_sound_references: bool,
    /// Replace an existing file at the target once the new container is complete (default: false)
    #[serde(default)]
    pub overwrite: bool,
}

impl Default for CreateOptions {
    fn default() -> Self {
        Self {
            check_sound_references: true,
            overwrite: false,
        }
    }
}

/// Options for extracting a container (maps to [extract] in TOML)
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct ExtractOptions {
    /// File name of the JSON descriptor written into the output directory (default: ptimer.json)
    #[serde(default = "default_descriptor_file_name")]
    pub descriptor_file_name: String,
    /// Remove an existing output directory before extracting (default: false)
    #[serde(default)]
    pub clean: bool,
}

impl Default for ExtractOptions {
    fn default() -> Self {
        Self {
            descriptor_file_name: default_descriptor_file_name(),
            clean: false,
        }
    }
}

/// Configuration file structure
///
/// Format:
/// ```toml
/// [create]
/// check_sound_references = true
/// overwrite = false
///
/// [extract]
/// descriptor_file_name = "ptimer.json"
/// clean = false
/// ```
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct Config {
    #[serde(default)]
    pub create: CreateOptions,
    #[serde(default)]
    pub extract: ExtractOptions,
}

impl Config {
    /// Load a config file; `None` yields the defaults
    pub fn load(path: Option<&Path>) -> Result<Self, String> {
        let Some(path) = path else {
            return Ok(Self::default());
        };

        let content = std::fs::read_to_string(path)
            .map_err(|e| format!("Failed to read config file '{}': {}", path.display(), e))?;
        let config: Config = toml::from_str(&content)
            .map_err(|e| format!("Failed to parse config file '{}': {}", path.display(), e))?;

        config.validate()?;
        Ok(config)
    }

    /// The descriptor name must be a plain file name so it lands directly in the output directory
    pub fn validate(&self) -> Result<(), String> {
        let name = &self.extract.descriptor_file_name;
        let mut components = Path::new(name).components();
        match (components.next(), components.next()) {
            (Some(std::path::Component::Normal(_)), None) => Ok(()),
            _ => Err(format!(
                "extract.descriptor_file_name must be a plain file name, got '{}'",
                name
            )),
        }
    }
}
