//! Fuzz target for vcap.toml parsing and validation.

#![no_main]

use libfuzzer_sys::fuzz_target;
use vcap_config::{validate_settings, Settings};

fuzz_target!(|data: &str| {
    // Should never panic, only return a ValidationError
    if let Ok(settings) = Settings::parse_toml(data) {
        let _ = validate_settings(&settings);
    }
});
