//! Hypervisor capability documents.
//!
//! This module decodes the two raw document kinds the hypervisor reports:
//! - The domain capabilities document: CPU modes, each with a vendor and a
//!   list of candidate models flagged `usable='yes|no|unknown'`
//! - Per-model feature-policy documents: `(feature name, policy)` pairs
//!
//! Loosely typed attribute strings (`usable`, `policy`) are decoded into
//! closed enums here, so nothing downstream compares strings.
//!
//! Parsing is all-or-nothing: a malformed document yields a [`ParseError`]
//! and never a partial result.

mod capabilities;
mod features;
mod xml;

pub use capabilities::parse_capabilities;
pub use features::parse_feature_policy;

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Errors decoding a capability or feature-policy document.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum ParseError {
    #[error("document is not valid UTF-8: {0}")]
    InvalidUtf8(String),

    #[error("malformed XML at byte {position}: {message}")]
    Malformed { position: u64, message: String },

    #[error("document has no root element")]
    MissingRoot,

    #[error("<model> element has an empty name")]
    EmptyModelName,

    #[error("<feature> element has no name")]
    EmptyFeatureName,

    #[error("unknown policy '{policy}' for feature '{feature}'")]
    UnknownPolicy { feature: String, policy: String },
}

/// Tri-state usability flag of a candidate model.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Usability {
    Yes,
    No,
    /// Missing or unrecognized flag. Treated as not usable.
    Unknown,
}

impl Usability {
    /// Decode the raw `usable` attribute.
    pub fn from_attr(raw: Option<&str>) -> Self {
        match raw {
            Some("yes") => Usability::Yes,
            Some("no") => Usability::No,
            _ => Usability::Unknown,
        }
    }
}

impl std::fmt::Display for Usability {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Usability::Yes => write!(f, "yes"),
            Usability::No => write!(f, "no"),
            Usability::Unknown => write!(f, "unknown"),
        }
    }
}

/// A candidate CPU model within a mode.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CpuModel {
    pub name: String,
    pub usable: Usability,
}

/// One capability-reporting mode (`host-passthrough`, `host-model`, `custom`).
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct CpuMode {
    /// Mode name; empty when the attribute is absent.
    pub name: String,

    /// Vendor name; empty when no `<vendor>` element is present.
    pub vendor: String,

    /// Candidate models, unique by name, in document order.
    pub models: Vec<CpuModel>,

    /// Feature entries listed directly under the mode (host-model).
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub features: Vec<FeaturePolicy>,
}

/// Decoded domain capabilities document.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct CapabilityDocument {
    pub modes: Vec<CpuMode>,
}

impl CapabilityDocument {
    /// Iterate every `(mode, model)` pair in document order.
    pub fn models(&self) -> impl Iterator<Item = (&CpuMode, &CpuModel)> {
        self.modes
            .iter()
            .flat_map(|mode| mode.models.iter().map(move |model| (mode, model)))
    }

    /// Names of models flagged `usable='yes'`, first occurrence across all
    /// modes, in document order.
    pub fn usable_models(&self) -> Vec<&str> {
        let mut names: Vec<&str> = Vec::new();
        for (_, model) in self.models() {
            if model.usable == Usability::Yes && !names.contains(&model.name.as_str()) {
                names.push(&model.name);
            }
        }
        names
    }

    /// Find a mode by name.
    pub fn mode(&self, name: &str) -> Option<&CpuMode> {
        self.modes.iter().find(|m| m.name == name)
    }
}

/// Feature policy directive.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Policy {
    Require,
    Force,
    Optional,
    Disable,
}

impl Policy {
    /// Decode a raw `policy` attribute. libvirt's `forbid` means the feature
    /// must not be present, which is `Disable` here.
    pub fn parse(raw: &str) -> Option<Self> {
        match raw {
            "require" => Some(Policy::Require),
            "force" => Some(Policy::Force),
            "optional" => Some(Policy::Optional),
            "disable" | "forbid" => Some(Policy::Disable),
            _ => None,
        }
    }

    /// Whether the feature is available under the model.
    pub fn is_supported(self) -> bool {
        !matches!(self, Policy::Disable)
    }

    /// Whether the feature is present whenever the model is selected, without
    /// an explicit request.
    pub fn is_guaranteed(self) -> bool {
        matches!(self, Policy::Require | Policy::Force)
    }

    pub fn as_str(self) -> &'static str {
        match self {
            Policy::Require => "require",
            Policy::Force => "force",
            Policy::Optional => "optional",
            Policy::Disable => "disable",
        }
    }
}

impl std::fmt::Display for Policy {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// One `(name, policy)` feature entry.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FeaturePolicy {
    pub name: String,
    pub policy: Policy,
}

impl FeaturePolicy {
    pub fn new(name: impl Into<String>, policy: Policy) -> Self {
        FeaturePolicy {
            name: name.into(),
            policy,
        }
    }
}

/// Decoded feature-policy document for a single model.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct FeaturePolicyDocument {
    pub features: Vec<FeaturePolicy>,
}

impl FeaturePolicyDocument {
    pub fn new(features: Vec<FeaturePolicy>) -> Self {
        FeaturePolicyDocument { features }
    }

    pub fn is_empty(&self) -> bool {
        self.features.is_empty()
    }
}
