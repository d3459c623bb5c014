//! Fuzz target for a whole refresh cycle.
//!
//! Feeds an arbitrary capability document plus arbitrary per-model feature
//! documents through `refresh` and checks the baseline invariant.

#![no_main]

use arbitrary::Arbitrary;
use libfuzzer_sys::fuzz_target;
use vcap_core::{refresh, CapabilityAggregator, StaticSource};

#[derive(Debug, Arbitrary)]
struct Node {
    capabilities: Vec<u8>,
    features: Vec<(String, Vec<u8>)>,
}

fuzz_target!(|node: Node| {
    let mut source = StaticSource::new(node.capabilities);
    for (model, document) in node.features {
        source = source.with_feature(model, document);
    }

    if let Ok(report) = refresh(&source, &CapabilityAggregator::default()) {
        for feature in report.snapshot.supported_features() {
            for (_, map) in report.snapshot.models() {
                assert_eq!(map.get(feature), Some(true));
            }
        }
    }
});
