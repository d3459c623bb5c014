//! vcap core: virtual-CPU capability aggregation.
//!
//! Turns the hypervisor's raw capability reports into a normalized snapshot
//! of which CPU models a node can run and which features each model exposes:
//! - `domcaps`: domain capabilities and feature-policy document parsers
//! - `aggregate`: usable-model selection, feature maps, baseline features
//! - `snapshot`: the immutable result handed to the label-builder
//! - `source`: the boundary to whatever fetches the raw documents
//! - `refresh`/`store`: one refresh cycle and swap-on-refresh publication

pub mod aggregate;
pub mod domcaps;
pub mod exit_codes;
pub mod logging;
pub mod refresh;
pub mod snapshot;
pub mod source;
pub mod store;

pub use aggregate::{AggregateOptions, CapabilityAggregator};
pub use domcaps::{
    parse_capabilities, parse_feature_policy, CapabilityDocument, FeaturePolicyDocument,
    ParseError, Policy, Usability,
};
pub use refresh::{refresh, RefreshError, RefreshReport};
pub use snapshot::{CapabilitySnapshot, CpuFeatures};
pub use source::{DirectorySource, DocumentSource, SourceError, StaticSource};
pub use store::{Published, SnapshotStore};
