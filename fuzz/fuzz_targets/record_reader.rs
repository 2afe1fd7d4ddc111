#![no_main]

use libfuzzer_sys::fuzz_target;
use canarywatch_core::event::EventNormalizer;
use canarywatch_pipeline::reader::{EventReader, RecordReader};

fuzz_target!(|data: &[u8]| {
    let records = RecordReader::from_bytes("fuzz", data.to_vec());
    let mut events = EventReader::new(records, EventNormalizer::default());
    for event in events.by_ref() {
        // 반환된 레코드는 항상 객체여야 함
        assert!(event.raw.is_object());
    }
    let _ = events.malformed_lines();
});
