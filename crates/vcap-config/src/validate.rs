//! Configuration validation errors and semantic validation.

use std::collections::HashSet;
use thiserror::Error;

use crate::settings::Settings;

/// Validation result type.
pub type ValidationResult<T> = Result<T, ValidationError>;

/// Configuration validation errors.
#[derive(Error, Debug)]
pub enum ValidationError {
    #[error("I/O error: {0}")]
    IoError(String),

    #[error("Parse error: {0}")]
    ParseError(String),

    #[error("Invalid value for {field}: {message}")]
    InvalidValue { field: String, message: String },

    #[error("Version mismatch: expected {expected}, got {actual}")]
    VersionMismatch { expected: String, actual: String },
}

impl ValidationError {
    /// Error code for structured error reporting.
    pub fn code(&self) -> u32 {
        match self {
            ValidationError::IoError(_) => 60,
            ValidationError::ParseError(_) => 61,
            ValidationError::InvalidValue { .. } => 65,
            ValidationError::VersionMismatch { .. } => 66,
        }
    }
}

/// Validate settings semantically.
pub fn validate_settings(settings: &Settings) -> ValidationResult<()> {
    if settings.schema_version != crate::CONFIG_SCHEMA_VERSION {
        return Err(ValidationError::VersionMismatch {
            expected: crate::CONFIG_SCHEMA_VERSION.to_string(),
            actual: settings.schema_version.clone(),
        });
    }

    if settings.documents_dir.as_os_str().is_empty() {
        return Err(invalid("documents_dir", "must not be empty"));
    }

    validate_file_component("capabilities_file", &settings.capabilities_file, false)?;
    validate_file_component("feature_file_prefix", &settings.feature_file_prefix, true)?;
    validate_file_component("feature_file_suffix", &settings.feature_file_suffix, true)?;

    let mut seen = HashSet::new();
    for model in &settings.ignored_models {
        if model.trim().is_empty() {
            return Err(invalid("ignored_models", "entries must not be empty"));
        }
        if !seen.insert(model.as_str()) {
            return Err(invalid(
                "ignored_models",
                &format!("duplicate entry '{}'", model),
            ));
        }
    }

    Ok(())
}

/// A file name or file name fragment: no path separators, and non-empty
/// unless `allow_empty`.
fn validate_file_component(field: &str, value: &str, allow_empty: bool) -> ValidationResult<()> {
    if value.is_empty() && !allow_empty {
        return Err(invalid(field, "must not be empty"));
    }
    if value.contains('/') || value.contains('\\') {
        return Err(invalid(
            field,
            &format!("must be a file name, got '{}'", value),
        ));
    }
    Ok(())
}

fn invalid(field: &str, message: &str) -> ValidationError {
    ValidationError::InvalidValue {
        field: field.to_string(),
        message: message.to_string(),
    }
}
