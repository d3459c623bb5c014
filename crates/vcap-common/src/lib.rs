//! vcap common types and errors.
//!
//! This crate provides the foundational types shared across the vcap crates:
//! - The workspace-wide error type with stable codes
//! - Output formats for the CLI
//! - The snapshot schema version

pub mod error;
pub mod output;

pub use error::{format_error_human, Error, ErrorCategory, Result, StructuredError, SuggestedAction};
pub use output::OutputFormat;

/// Schema version of the serialized snapshot envelope.
pub const SCHEMA_VERSION: &str = "1.0.0";
