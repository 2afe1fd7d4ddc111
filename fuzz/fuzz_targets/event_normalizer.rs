#![no_main]

use libfuzzer_sys::fuzz_target;
use canarywatch_core::event::EventNormalizer;

fuzz_target!(|data: &[u8]| {
    let Ok(value) = serde_json::from_slice::<serde_json::Value>(data) else {
        return;
    };
    let is_object = value.is_object();
    match EventNormalizer::default().normalize(value) {
        Ok(event) => {
            assert!(is_object);
            assert!(!event.label.is_empty());
        }
        Err(_) => assert!(!is_object),
    }
});
