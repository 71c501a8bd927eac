//! Fuzz target for tenant.yaml decoding.
//!
//! Tests that manifest parsing and module lookup handle arbitrary input
//! without panicking.

#![no_main]

use libfuzzer_sys::fuzz_target;
use tb_tenant::TenantConfig;

fuzz_target!(|data: &[u8]| {
    // Should never panic, only return an error
    if let Ok(mut config) = TenantConfig::unmarshal(data) {
        let names: Vec<String> = config.modules.iter().map(|m| m.name.clone()).collect();
        for name in names {
            let _ = config.find_module_mut(&name);
        }
        let _ = config.marshal();
    }
});
