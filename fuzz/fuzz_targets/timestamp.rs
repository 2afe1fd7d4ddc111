#![no_main]

use libfuzzer_sys::fuzz_target;
use canarywatch_pipeline::summary::{coerce_bytes, parse_timestamp};

fuzz_target!(|data: &[u8]| {
    if let Ok(text) = std::str::from_utf8(data) {
        let _ = parse_timestamp(text);
        let _ = coerce_bytes(Some(&serde_json::Value::String(text.to_owned())));
    }
});
