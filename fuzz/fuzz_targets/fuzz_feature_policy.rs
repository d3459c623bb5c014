//! Fuzz target for feature-policy document parsing.

#![no_main]

use libfuzzer_sys::fuzz_target;
use vcap_core::aggregate::derive_model_features;
use vcap_core::parse_feature_policy;

fuzz_target!(|data: &[u8]| {
    if let Ok(doc) = parse_feature_policy(data) {
        let derived = derive_model_features(&doc);
        assert!(derived.guaranteed.len() <= derived.features.len());
    }
});
