//! Fuzz target: provisioning payload parser
//!
//! Feeds arbitrary bytes to `parse_payload` and verifies:
//! - No panics under arbitrary input
//! - Every rejection maps to a 4xx status
//! - Bodies above `MAX_CONFIG_BODY` are always refused with 413
//! - An accepted body yields credentials the Wi-Fi layer will take
//!
//! cargo fuzz run fuzz_config_payload

#![no_main]

use hazardwatch::adapters::wifi::{validate_password, validate_ssid};
use hazardwatch::provisioning::{MAX_CONFIG_BODY, parse_payload};
use libfuzzer_sys::fuzz_target;

fuzz_target!(|data: &[u8]| {
    match parse_payload(data) {
        Ok(cfg) => {
            assert!(data.len() <= MAX_CONFIG_BODY);
            assert!(!cfg.api_key.is_empty());
            assert!(validate_ssid(&cfg.network_ssid).is_ok());
            assert!(validate_password(&cfg.network_password).is_ok());

            // The accepted record parses back to itself.
            let json = serde_json::json!({
                "api_key": cfg.api_key,
                "ssid": cfg.network_ssid,
                "password": cfg.network_password,
                "motion": cfg.motion,
                "sound": cfg.sound,
                "gas": cfg.gas,
                "fire": cfg.fire,
            })
            .to_string();
            if json.len() <= MAX_CONFIG_BODY {
                assert_eq!(parse_payload(json.as_bytes()).as_ref(), Ok(&cfg));
            }
        }
        Err(e) => {
            assert!((400..500).contains(&e.status()));
            if data.len() > MAX_CONFIG_BODY {
                assert_eq!(e.status(), 413, "oversized body accepted for parsing");
            }
        }
    }
});
