//! Fuzz target for loader config parsing.

#![no_main]

use libfuzzer_sys::fuzz_target;
use socrata_loader::config::from_yaml_slice;

fuzz_target!(|data: &[u8]| {
    if data.len() > 1024 * 1024 {
        return;
    }

    if let Ok(config) = from_yaml_slice(data) {
        let _ = config.validate();
    }
});
