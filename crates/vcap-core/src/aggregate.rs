//! Capability aggregation.
//!
//! Folds a parsed capability document and the per-model feature-policy
//! documents into a [`CapabilitySnapshot`]:
//!
//! 1. Select models flagged `usable='yes'` (`no` and `unknown` are excluded).
//! 2. Per model, resolve each feature to its policy; `require`, `force` and
//!    `optional` map to `true`, `disable` to `false`.
//! 3. Baseline = intersection over models of the `require`/`force` features,
//!    in first-seen order.
//!
//! The aggregator is a pure function of its inputs: no I/O, no retries.

use indexmap::IndexMap;
use std::collections::{BTreeMap, HashMap, HashSet};
use tracing::{debug, warn};
use vcap_config::{Settings, UnavailableFeatures};

use crate::domcaps::{CapabilityDocument, FeaturePolicyDocument, Policy};
use crate::snapshot::{CapabilitySnapshot, CpuFeatures};

/// Aggregation options.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct AggregateOptions {
    /// Handling of usable models whose feature data is missing.
    pub unavailable: UnavailableFeatures,

    /// Usable models to drop before aggregation.
    pub ignored_models: Vec<String>,
}

impl From<&Settings> for AggregateOptions {
    fn from(settings: &Settings) -> Self {
        AggregateOptions {
            unavailable: settings.unavailable_features,
            ignored_models: settings.ignored_models.clone(),
        }
    }
}

/// Per-model derivation result.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ModelFeatures {
    /// Feature-support map.
    pub features: CpuFeatures,

    /// Features guaranteed present when the model is selected, document order.
    pub guaranteed: Vec<String>,
}

/// Derive the feature-support map and the guaranteed set for one model.
///
/// A feature listed more than once is decided by its last entry, for both the
/// map and the guaranteed set.
pub fn derive_model_features(doc: &FeaturePolicyDocument) -> ModelFeatures {
    let mut resolved: IndexMap<&str, Policy> = IndexMap::new();
    for feature in &doc.features {
        resolved.insert(feature.name.as_str(), feature.policy);
    }

    let features = resolved
        .iter()
        .map(|(name, policy)| (name.to_string(), policy.is_supported()))
        .collect();
    let guaranteed = resolved
        .iter()
        .filter(|(_, policy)| policy.is_guaranteed())
        .map(|(name, _)| name.to_string())
        .collect();

    ModelFeatures {
        features: CpuFeatures::from_map(features),
        guaranteed,
    }
}

/// Intersection of guaranteed sets, in the order of the first set.
pub fn baseline<S: AsRef<[String]>>(sets: &[S]) -> Vec<String> {
    let Some((first, rest)) = sets.split_first() else {
        return Vec::new();
    };

    let rest: Vec<HashSet<&str>> = rest
        .iter()
        .map(|set| set.as_ref().iter().map(String::as_str).collect())
        .collect();

    let mut seen = HashSet::new();
    first
        .as_ref()
        .iter()
        .filter(|feature| rest.iter().all(|set| set.contains(feature.as_str())))
        .filter(|feature| seen.insert(feature.as_str()))
        .cloned()
        .collect()
}

/// Folds parsed documents into a snapshot.
#[derive(Debug, Clone, Default)]
pub struct CapabilityAggregator {
    options: AggregateOptions,
}

impl CapabilityAggregator {
    pub fn new(options: AggregateOptions) -> Self {
        CapabilityAggregator { options }
    }

    pub fn options(&self) -> &AggregateOptions {
        &self.options
    }

    /// Usable models that take part in aggregation, in document order.
    pub fn candidate_models<'a>(&self, caps: &'a CapabilityDocument) -> Vec<&'a str> {
        caps.usable_models()
            .into_iter()
            .filter(|name| !self.options.ignored_models.iter().any(|m| m.as_str() == *name))
            .collect()
    }

    /// Build the snapshot.
    ///
    /// `features` holds the parsed feature document of each usable model; a
    /// usable model missing from it is treated as having unavailable feature
    /// data. Zero usable models yields an empty snapshot.
    pub fn aggregate(
        &self,
        caps: &CapabilityDocument,
        features: &HashMap<String, FeaturePolicyDocument>,
    ) -> CapabilitySnapshot {
        let mut models = BTreeMap::new();
        let mut guaranteed_sets: Vec<Vec<String>> = Vec::new();
        let mut degraded = Vec::new();

        for name in self.candidate_models(caps) {
            match features.get(name) {
                Some(doc) => {
                    let derived = derive_model_features(doc);
                    debug!(
                        model = name,
                        features = derived.features.len(),
                        guaranteed = derived.guaranteed.len(),
                        "derived model features"
                    );
                    models.insert(name.to_string(), derived.features);
                    guaranteed_sets.push(derived.guaranteed);
                }
                None => {
                    degraded.push(name.to_string());
                    match self.options.unavailable {
                        UnavailableFeatures::Exclude => {
                            warn!(model = name, "feature data unavailable, model excluded");
                        }
                        UnavailableFeatures::Empty => {
                            warn!(model = name, "feature data unavailable, keeping empty map");
                            models.insert(name.to_string(), CpuFeatures::default());
                            guaranteed_sets.push(Vec::new());
                        }
                    }
                }
            }
        }

        let supported = baseline(&guaranteed_sets);
        CapabilitySnapshot::new(models, supported, degraded)
    }
}
