//! Capability snapshot: the immutable result of one refresh.
//!
//! The snapshot is handed to the label-builder as a read-only value. It is
//! never patched: a refresh produces a new snapshot that replaces the old one
//! wholesale (see [`crate::store::SnapshotStore`]).
//!
//! Serialized form:
//! ```json
//! {
//!   "models": { "Haswell": { "vmx": true, "mpx": true } },
//!   "supportedFeatures": ["vmx"]
//! }
//! ```

use indexmap::IndexMap;
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};
use std::collections::BTreeMap;

/// Feature-support map for one model, in document order.
///
/// A feature absent from the map was not evaluated for the model; it is not
/// an assertion that the feature is unsupported.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct CpuFeatures(IndexMap<String, bool>);

impl CpuFeatures {
    pub(crate) fn from_map(map: IndexMap<String, bool>) -> Self {
        CpuFeatures(map)
    }

    /// `Some(supported)` if the feature was evaluated, `None` otherwise.
    pub fn get(&self, feature: &str) -> Option<bool> {
        self.0.get(feature).copied()
    }

    /// Whether the feature was evaluated and found supported.
    pub fn is_supported(&self, feature: &str) -> bool {
        self.get(feature) == Some(true)
    }

    pub fn contains(&self, feature: &str) -> bool {
        self.0.contains_key(feature)
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, bool)> {
        self.0.iter().map(|(k, v)| (k.as_str(), *v))
    }

    /// Names of supported features, in document order.
    pub fn supported(&self) -> impl Iterator<Item = &str> {
        self.iter().filter(|(_, s)| *s).map(|(k, _)| k)
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

/// Full per-node capability snapshot.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CapabilitySnapshot {
    /// Usable model name → feature-support map.
    models: BTreeMap<String, CpuFeatures>,

    /// Features guaranteed under every usable model, first-seen order.
    supported_features: Vec<String>,

    /// Usable models whose feature data was unavailable.
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    degraded_models: Vec<String>,
}

impl CapabilitySnapshot {
    pub(crate) fn new(
        models: BTreeMap<String, CpuFeatures>,
        supported_features: Vec<String>,
        degraded_models: Vec<String>,
    ) -> Self {
        CapabilitySnapshot {
            models,
            supported_features,
            degraded_models,
        }
    }

    /// Snapshot of a node with no usable models.
    pub fn empty() -> Self {
        Self::default()
    }

    pub fn models(&self) -> &BTreeMap<String, CpuFeatures> {
        &self.models
    }

    pub fn model(&self, name: &str) -> Option<&CpuFeatures> {
        self.models.get(name)
    }

    pub fn model_names(&self) -> impl Iterator<Item = &str> {
        self.models.keys().map(String::as_str)
    }

    pub fn supported_features(&self) -> &[String] {
        &self.supported_features
    }

    pub fn degraded_models(&self) -> &[String] {
        &self.degraded_models
    }

    /// True when the node exposes no usable model.
    pub fn is_empty(&self) -> bool {
        self.models.is_empty()
    }

    /// SHA-256 over a canonical rendering of the snapshot.
    ///
    /// Every name is length-prefixed, so no choice of model or feature name
    /// can make two different snapshots render the same bytes. Per-model
    /// feature order does not affect the fingerprint; baseline order does,
    /// since it is part of the output contract.
    pub fn fingerprint(&self) -> String {
        fn field(hasher: &mut Sha256, value: &str) {
            hasher.update((value.len() as u64).to_le_bytes());
            hasher.update(value.as_bytes());
        }

        let mut hasher = Sha256::new();
        hasher.update(b"M");
        hasher.update((self.models.len() as u64).to_le_bytes());
        for (model, features) in &self.models {
            field(&mut hasher, model);
            let sorted: BTreeMap<&str, bool> = features.iter().collect();
            hasher.update((sorted.len() as u64).to_le_bytes());
            for (feature, supported) in sorted {
                field(&mut hasher, feature);
                hasher.update([u8::from(supported)]);
            }
        }
        hasher.update(b"B");
        hasher.update((self.supported_features.len() as u64).to_le_bytes());
        for feature in &self.supported_features {
            field(&mut hasher, feature);
        }
        hasher.update(b"D");
        hasher.update((self.degraded_models.len() as u64).to_le_bytes());
        for model in &self.degraded_models {
            field(&mut hasher, model);
        }
        hex::encode(hasher.finalize())
    }

    /// One-line summary for quick status checks.
    pub fn summary(&self) -> String {
        let mut line = format!(
            "Models: {} | Baseline features: {}",
            self.models.len(),
            self.supported_features.len()
        );
        if !self.degraded_models.is_empty() {
            line.push_str(&format!(" | Degraded: {}", self.degraded_models.join(",")));
        }
        line
    }
}
