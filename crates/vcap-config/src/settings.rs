//! Typed settings for document locations and aggregation behavior.
//!
//! Settings are read from `vcap.toml`. Every field has a built-in default, so
//! an absent file or a partial file is valid.

use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

use crate::resolve::ConfigPath;
use crate::validate::{ValidationError, ValidationResult};

/// Default directory holding the raw hypervisor documents.
pub const DEFAULT_DOCUMENTS_DIR: &str = "/var/lib/vcap";

/// Default file name of the domain capabilities dump.
pub const DEFAULT_CAPABILITIES_FILE: &str = "virsh_domcapabilities.xml";

/// Default prefix of per-model feature documents (`cpu_model_Haswell.xml`).
pub const DEFAULT_FEATURE_FILE_PREFIX: &str = "cpu_model_";

/// Default suffix of per-model feature documents.
pub const DEFAULT_FEATURE_FILE_SUFFIX: &str = ".xml";

/// What to do with a usable model whose feature document could not be
/// fetched or parsed.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum UnavailableFeatures {
    /// Leave the model out of the snapshot entirely.
    #[default]
    Exclude,
    /// Keep the model with an empty feature map. It then contributes an
    /// empty guaranteed set, so the baseline collapses to nothing.
    Empty,
}

impl std::fmt::Display for UnavailableFeatures {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            UnavailableFeatures::Exclude => write!(f, "exclude"),
            UnavailableFeatures::Empty => write!(f, "empty"),
        }
    }
}

/// vcap settings.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct Settings {
    /// Schema version of this settings file.
    pub schema_version: String,

    /// Directory containing the capability and feature documents.
    pub documents_dir: PathBuf,

    /// File name of the domain capabilities document inside `documents_dir`.
    pub capabilities_file: String,

    /// Prefix of per-model feature document file names.
    pub feature_file_prefix: String,

    /// Suffix of per-model feature document file names.
    pub feature_file_suffix: String,

    /// Handling of usable models without feature data.
    pub unavailable_features: UnavailableFeatures,

    /// Usable models to drop before aggregation (e.g. obsolete models).
    pub ignored_models: Vec<String>,
}

impl Default for Settings {
    fn default() -> Self {
        Settings {
            schema_version: crate::CONFIG_SCHEMA_VERSION.to_string(),
            documents_dir: PathBuf::from(DEFAULT_DOCUMENTS_DIR),
            capabilities_file: DEFAULT_CAPABILITIES_FILE.to_string(),
            feature_file_prefix: DEFAULT_FEATURE_FILE_PREFIX.to_string(),
            feature_file_suffix: DEFAULT_FEATURE_FILE_SUFFIX.to_string(),
            unavailable_features: UnavailableFeatures::default(),
            ignored_models: Vec::new(),
        }
    }
}

impl Settings {
    /// Load settings from a TOML file.
    pub fn from_file(path: &Path) -> ValidationResult<Self> {
        let content = std::fs::read_to_string(path).map_err(|e| {
            ValidationError::IoError(format!("Failed to read {}: {}", path.display(), e))
        })?;

        Self::parse_toml(&content)
    }

    /// Parse settings from a TOML string.
    pub fn parse_toml(content: &str) -> ValidationResult<Self> {
        toml::from_str(content)
            .map_err(|e| ValidationError::ParseError(format!("Invalid TOML: {}", e)))
    }

    /// Load from a resolved path, falling back to defaults when none was found,
    /// then validate.
    pub fn load(resolved: &ConfigPath) -> ValidationResult<Self> {
        let settings = match resolved.path.as_deref() {
            Some(path) => Self::from_file(path)?,
            None => Self::default(),
        };
        crate::validate::validate_settings(&settings)?;
        Ok(settings)
    }

    /// Path of the capability document.
    pub fn capabilities_path(&self) -> PathBuf {
        self.documents_dir.join(&self.capabilities_file)
    }

    /// File name of the feature document for `model`.
    pub fn feature_file_name(&self, model: &str) -> String {
        format!(
            "{}{}{}",
            self.feature_file_prefix, model, self.feature_file_suffix
        )
    }
}
