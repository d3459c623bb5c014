//! vcap configuration loading and validation.
//!
//! This crate provides:
//! - Typed settings for document locations and aggregation behavior
//! - Config resolution (CLI → env → XDG → system → defaults)
//! - Semantic validation

pub mod resolve;
pub mod settings;
pub mod validate;

pub use resolve::{resolve_config, ConfigPath, ConfigSource};
pub use settings::{Settings, UnavailableFeatures};
pub use validate::{validate_settings, ValidationError, ValidationResult};

/// Schema version for configuration files.
pub const CONFIG_SCHEMA_VERSION: &str = "1.0.0";
