//! Error types for vcap.
//!
//! This module provides structured error handling with:
//! - Stable error codes for machine parsing
//! - Category classification for error grouping
//! - Recoverability hints for automation
//! - Remediation suggestions for humans
//!
//! # Human-Facing Output
//!
//! ```text
//! ✗ Malformed Capability Document
//!   Reason: malformed document virsh_domcapabilities.xml: unexpected end of input
//!   Fix: Regenerate the document with 'virsh domcapabilities' and refresh again.
//! ```
//!
//! # Agent-Facing Output
//!
//! ```json
//! {
//!   "code": 21,
//!   "category": "document",
//!   "message": "malformed document virsh_domcapabilities.xml: unexpected end of input",
//!   "recoverable": true,
//!   "suggested_action": "refetch",
//!   "context": { "document": "virsh_domcapabilities.xml" }
//! }
//! ```

use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use thiserror::Error;

/// Result type alias for vcap operations.
pub type Result<T> = std::result::Result<T, Error>;

/// Error categories for grouping related errors.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ErrorCategory {
    /// Configuration file errors.
    Config,
    /// Capability and feature-policy document errors.
    Document,
    /// Failures in vcap itself, such as serializing its own output.
    Internal,
}

impl std::fmt::Display for ErrorCategory {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ErrorCategory::Config => write!(f, "config"),
            ErrorCategory::Document => write!(f, "document"),
            ErrorCategory::Internal => write!(f, "internal"),
        }
    }
}

/// Suggested actions for agents to take in response to errors.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SuggestedAction {
    /// Retry the operation (possibly with backoff).
    Retry,
    /// Fetch the raw documents from the hypervisor again.
    Refetch,
    /// Run the configuration check command.
    RunCheck,
    /// Reset configuration to defaults.
    ResetConfig,
    /// Manual intervention required.
    ManualIntervention,
}

impl std::fmt::Display for SuggestedAction {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            SuggestedAction::Retry => write!(f, "retry"),
            SuggestedAction::Refetch => write!(f, "refetch"),
            SuggestedAction::RunCheck => write!(f, "run_check"),
            SuggestedAction::ResetConfig => write!(f, "reset_config"),
            SuggestedAction::ManualIntervention => write!(f, "manual_intervention"),
        }
    }
}

/// Unified error type for vcap.
#[derive(Error, Debug)]
pub enum Error {
    // Configuration errors (10-19)
    #[error("configuration error: {0}")]
    Config(String),

    #[error("invalid settings: {0}")]
    InvalidSettings(String),

    // Document errors (20-29)
    #[error("document {document} unavailable: {reason}")]
    DocumentUnavailable { document: String, reason: String },

    #[error("malformed document {document}: {reason}")]
    MalformedDocument { document: String, reason: String },

    // Internal errors (60-69)
    #[error("JSON serialization error: {0}")]
    Json(#[from] serde_json::Error),
}

impl Error {
    /// Returns the error code for this error type.
    ///
    /// Error codes are stable and grouped by category:
    /// - 10-19: Configuration errors
    /// - 20-29: Document errors
    /// - 60-69: Internal errors
    pub fn code(&self) -> u32 {
        match self {
            Error::Config(_) => 10,
            Error::InvalidSettings(_) => 11,
            Error::DocumentUnavailable { .. } => 20,
            Error::MalformedDocument { .. } => 21,
            Error::Json(_) => 61,
        }
    }

    /// Returns the error category for grouping and filtering.
    pub fn category(&self) -> ErrorCategory {
        match self {
            Error::Config(_) | Error::InvalidSettings(_) => ErrorCategory::Config,
            Error::DocumentUnavailable { .. } | Error::MalformedDocument { .. } => {
                ErrorCategory::Document
            }
            Error::Json(_) => ErrorCategory::Internal,
        }
    }

    /// Returns whether this error is potentially recoverable.
    ///
    /// Document errors are recoverable: the next refresh re-fetches the raw
    /// documents and replaces the snapshot wholesale.
    pub fn is_recoverable(&self) -> bool {
        match self {
            Error::Config(_) => true,
            Error::InvalidSettings(_) => true,
            Error::DocumentUnavailable { .. } => true,
            Error::MalformedDocument { .. } => true,
            // Serialization of our own types failing is a bug.
            Error::Json(_) => false,
        }
    }

    /// Returns the suggested action for agents.
    pub fn suggested_action(&self) -> SuggestedAction {
        match self {
            Error::Config(_) => SuggestedAction::RunCheck,
            Error::InvalidSettings(_) => SuggestedAction::ResetConfig,
            Error::DocumentUnavailable { .. } => SuggestedAction::Retry,
            Error::MalformedDocument { .. } => SuggestedAction::Refetch,
            Error::Json(_) => SuggestedAction::ManualIntervention,
        }
    }

    /// Returns a human-readable remediation hint.
    pub fn remediation(&self) -> &'static str {
        match self {
            Error::Config(_) => "Run 'vcap check' to validate the configuration file.",
            Error::InvalidSettings(_) => {
                "Fix the reported field in vcap.toml, or remove the file to use built-in defaults."
            }
            Error::DocumentUnavailable { .. } => {
                "Check that the documents directory exists and holds the capability dump."
            }
            Error::MalformedDocument { .. } => {
                "Regenerate the document with 'virsh domcapabilities' and refresh again."
            }
            Error::Json(_) => "Internal serialization failure. Please report this as a bug.",
        }
    }

    /// Returns a short headline for human-readable output.
    pub fn headline(&self) -> &'static str {
        match self {
            Error::Config(_) => "Configuration Error",
            Error::InvalidSettings(_) => "Invalid Settings",
            Error::DocumentUnavailable { .. } => "Capability Document Unavailable",
            Error::MalformedDocument { .. } => "Malformed Capability Document",
            Error::Json(_) => "JSON Serialization Error",
        }
    }
}

/// Structured error response for JSON output.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StructuredError {
    /// Stable error code.
    pub code: u32,

    /// Error category for grouping.
    pub category: ErrorCategory,

    /// Human-readable error message.
    pub message: String,

    /// Whether the error is potentially recoverable.
    pub recoverable: bool,

    /// Suggested action for agents.
    pub suggested_action: SuggestedAction,

    /// Additional structured context (e.g., document name).
    #[serde(default, skip_serializing_if = "HashMap::is_empty")]
    pub context: HashMap<String, serde_json::Value>,
}

impl From<&Error> for StructuredError {
    fn from(err: &Error) -> Self {
        let mut context = HashMap::new();

        match err {
            Error::DocumentUnavailable { document, .. }
            | Error::MalformedDocument { document, .. } => {
                context.insert("document".to_string(), serde_json::json!(document));
            }
            _ => {}
        }

        StructuredError {
            code: err.code(),
            category: err.category(),
            message: err.to_string(),
            recoverable: err.is_recoverable(),
            suggested_action: err.suggested_action(),
            context,
        }
    }
}

impl StructuredError {
    /// Add additional context to the error.
    pub fn with_context(mut self, key: impl Into<String>, value: impl Serialize) -> Self {
        if let Ok(v) = serde_json::to_value(value) {
            self.context.insert(key.into(), v);
        }
        self
    }

    /// Serialize to JSON string.
    pub fn to_json(&self) -> String {
        serde_json::to_string(self).unwrap_or_else(|_| {
            format!(r#"{{"code":{},"error":"serialization_failed"}}"#, self.code)
        })
    }
}

/// Format an error for human-readable stderr output.
///
/// Output format:
/// ```text
/// ✗ [Headline]
///   Reason: [Error message]
///   Fix: [Remediation hint]
/// ```
pub fn format_error_human(err: &Error, use_color: bool) -> String {
    let (red, cyan, reset) = if use_color {
        ("\x1b[31m", "\x1b[36m", "\x1b[0m")
    } else {
        ("", "", "")
    };

    format!(
        "{red}✗{reset} {headline}\n  Reason: {message}\n  {cyan}Fix:{reset} {remediation}",
        red = red,
        cyan = cyan,
        reset = reset,
        headline = err.headline(),
        message = err,
        remediation = err.remediation()
    )
}
