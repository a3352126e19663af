#![no_main]
use libfuzzer_sys::fuzz_target;

fuzz_target!(|data: &str| {
    // Parsing and validation may reject anything, but must never panic.
    if let Ok(cfg) = toml::from_str::<ax12_config::Config>(data) {
        let _ = cfg.validate();
    }
});
