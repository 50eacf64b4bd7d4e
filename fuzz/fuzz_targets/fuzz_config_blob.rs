//! Fuzz target: `SamplerConfig::from_postcard` / `from_json`
//!
//! Feeds arbitrary provisioning blobs through both decoders and asserts
//! that any config passing `validate` is safe to run: non-zero period and
//! a report that fits the history.
//!
//! cargo fuzz run fuzz_config_blob

#![no_main]

use libfuzzer_sys::fuzz_target;
use temphist::config::SamplerConfig;
use temphist::history::HISTORY_CAPACITY;

fn check(cfg: &SamplerConfig) {
    if cfg.validate(HISTORY_CAPACITY).is_ok() {
        assert!(cfg.period_ticks() > 0, "validated config has zero period");
        assert!(cfg.report_depth <= HISTORY_CAPACITY);
    }
}

fuzz_target!(|data: &[u8]| {
    if let Ok(cfg) = SamplerConfig::from_postcard(data) {
        check(&cfg);
        // Re-encoding a decoded config must round-trip.
        let bytes = cfg.to_postcard().expect("encode");
        assert_eq!(SamplerConfig::from_postcard(&bytes).ok(), Some(cfg));
    }
    if let Ok(cfg) = SamplerConfig::from_json(data) {
        check(&cfg);
    }
});
