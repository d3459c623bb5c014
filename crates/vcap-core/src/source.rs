//! Raw document sources.
//!
//! A [`DocumentSource`] hands out the raw bytes of the capability document and
//! of each model's feature-policy document. How those bytes are obtained
//! (hypervisor queries, a sidecar's dump directory) is up to the source;
//! the engine never talks to the hypervisor itself.

use std::collections::HashMap;
use std::fs;
use std::io::ErrorKind;
use std::path::{Path, PathBuf};
use thiserror::Error;
use vcap_config::Settings;

/// Errors obtaining a raw document.
#[derive(Debug, Error)]
pub enum SourceError {
    #[error("{document} not found")]
    NotFound { document: String },

    #[error("failed to read {document}: {source}")]
    Io {
        document: String,
        #[source]
        source: std::io::Error,
    },

    #[error("model name '{0}' cannot be mapped to a document")]
    InvalidModelName(String),
}

impl SourceError {
    /// Name of the document the error refers to.
    pub fn document(&self) -> &str {
        match self {
            SourceError::NotFound { document } | SourceError::Io { document, .. } => {
                document.as_str()
            }
            SourceError::InvalidModelName(name) => name.as_str(),
        }
    }
}

/// Provider of raw hypervisor documents.
pub trait DocumentSource {
    /// Raw domain capabilities document.
    fn capabilities(&self) -> Result<Vec<u8>, SourceError>;

    /// Raw feature-policy document for `model`.
    fn feature_policy(&self, model: &str) -> Result<Vec<u8>, SourceError>;

    /// Short description for logs.
    fn describe(&self) -> String;
}

/// Reads documents from a directory, the layout a node-labeller sidecar
/// writes: one capability dump plus `<prefix><model><suffix>` per model.
#[derive(Debug, Clone)]
pub struct DirectorySource {
    layout: Settings,
}

impl DirectorySource {
    /// Source over `dir` with the default file naming.
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        DirectorySource {
            layout: Settings {
                documents_dir: dir.into(),
                ..Settings::default()
            },
        }
    }

    /// Source configured from settings.
    pub fn from_settings(settings: &Settings) -> Self {
        DirectorySource {
            layout: settings.clone(),
        }
    }

    /// Override the directory, keeping file naming.
    pub fn with_dir(mut self, dir: impl Into<PathBuf>) -> Self {
        self.layout.documents_dir = dir.into();
        self
    }

    pub fn dir(&self) -> &Path {
        &self.layout.documents_dir
    }

    /// Path of the feature document for `model`.
    pub fn feature_path(&self, model: &str) -> Result<PathBuf, SourceError> {
        if model.is_empty()
            || model.contains('/')
            || model.contains('\\')
            || model == "."
            || model == ".."
        {
            return Err(SourceError::InvalidModelName(model.to_string()));
        }
        Ok(self
            .layout
            .documents_dir
            .join(self.layout.feature_file_name(model)))
    }
}

fn read_document(path: &Path) -> Result<Vec<u8>, SourceError> {
    let document = path.display().to_string();
    fs::read(path).map_err(|source| match source.kind() {
        ErrorKind::NotFound => SourceError::NotFound { document },
        _ => SourceError::Io { document, source },
    })
}

impl DocumentSource for DirectorySource {
    fn capabilities(&self) -> Result<Vec<u8>, SourceError> {
        read_document(&self.layout.capabilities_path())
    }

    fn feature_policy(&self, model: &str) -> Result<Vec<u8>, SourceError> {
        read_document(&self.feature_path(model)?)
    }

    fn describe(&self) -> String {
        format!("dir:{}", self.layout.documents_dir.display())
    }
}

/// In-memory documents, for embedding and tests.
#[derive(Debug, Clone, Default)]
pub struct StaticSource {
    capabilities: Option<Vec<u8>>,
    features: HashMap<String, Vec<u8>>,
}

impl StaticSource {
    pub fn new(capabilities: impl Into<Vec<u8>>) -> Self {
        StaticSource {
            capabilities: Some(capabilities.into()),
            features: HashMap::new(),
        }
    }

    /// A source whose capability document is missing.
    pub fn without_capabilities() -> Self {
        Self::default()
    }

    pub fn with_feature(mut self, model: impl Into<String>, document: impl Into<Vec<u8>>) -> Self {
        self.features.insert(model.into(), document.into());
        self
    }
}

impl DocumentSource for StaticSource {
    fn capabilities(&self) -> Result<Vec<u8>, SourceError> {
        self.capabilities
            .clone()
            .ok_or_else(|| SourceError::NotFound {
                document: "capabilities".to_string(),
            })
    }

    fn feature_policy(&self, model: &str) -> Result<Vec<u8>, SourceError> {
        self.features
            .get(model)
            .cloned()
            .ok_or_else(|| SourceError::NotFound {
                document: format!("features of {}", model),
            })
    }

    fn describe(&self) -> String {
        format!("static:{} feature documents", self.features.len())
    }
}
