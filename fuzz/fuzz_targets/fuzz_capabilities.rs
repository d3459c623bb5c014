//! Fuzz target for domain capabilities parsing.
//!
//! Tests that `parse_capabilities` handles arbitrary input without panicking.

#![no_main]

use libfuzzer_sys::fuzz_target;
use vcap_core::{parse_capabilities, CapabilityAggregator};

fuzz_target!(|data: &[u8]| {
    // The parser should never panic, only return a ParseError
    if let Ok(doc) = parse_capabilities(data) {
        let _ = CapabilityAggregator::default().candidate_models(&doc);
    }
});
