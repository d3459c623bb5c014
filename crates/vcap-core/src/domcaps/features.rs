//! Feature-policy document parser.
//!
//! Two layouts are accepted. Features listed directly under the root:
//!
//! ```text
//! <cpu>
//!   <feature policy='require' name='vmx'/>
//!   <feature policy='optional' name='mpx'/>
//! </cpu>
//! ```
//!
//! and the libvirt `cpu_map` layout, where features sit under a `model`:
//!
//! ```text
//! <cpus>
//!   <model name='Haswell'>
//!     <feature name='vmx'/>
//!   </model>
//! </cpus>
//! ```
//!
//! A missing `policy` attribute means `require`. Names are matched exactly.

use tracing::debug;

use super::xml::{parse_document, Element};
use super::{FeaturePolicy, FeaturePolicyDocument, ParseError, Policy};

/// Parse a feature-policy document for a single model.
pub fn parse_feature_policy(bytes: &[u8]) -> Result<FeaturePolicyDocument, ParseError> {
    let root = parse_document(bytes)?;

    let mut features = Vec::new();
    for child in &root.children {
        match child.name.as_str() {
            "feature" => features.push(feature_from_element(child)?),
            "model" => {
                for feature in child.children_named("feature") {
                    features.push(feature_from_element(feature)?);
                }
            }
            _ => {}
        }
    }

    debug!(features = features.len(), "parsed feature-policy document");
    Ok(FeaturePolicyDocument { features })
}

/// Decode one `<feature name=.. policy=..>` element.
pub(super) fn feature_from_element(element: &Element) -> Result<FeaturePolicy, ParseError> {
    let name = match element.attr("name") {
        Some(name) if !name.is_empty() => name,
        _ => return Err(ParseError::EmptyFeatureName),
    };

    let policy = match element.attr("policy") {
        None => Policy::Require,
        Some(raw) => Policy::parse(raw).ok_or_else(|| ParseError::UnknownPolicy {
            feature: name.to_string(),
            policy: raw.to_string(),
        })?,
    };

    Ok(FeaturePolicy::new(name, policy))
}
