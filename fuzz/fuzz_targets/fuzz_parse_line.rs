#![no_main]

use libfuzzer_sys::fuzz_target;
use reflowlog::protocol::{parse_line, LineEvent};

fuzz_target!(|data: &[u8]| {
    // Device bytes are decoded lossily before parsing
    let text = String::from_utf8_lossy(data);

    for raw in text.split('\n') {
        // Classification must never panic
        if let LineEvent::Sample(sample) = parse_line(raw) {
            // An accepted sample must survive its own serialization
            match parse_line(&sample.to_line()) {
                LineEvent::Sample(again) => {
                    assert_eq!(again.mode, sample.mode);
                    // NaN loses its sign when formatted
                    if sample.time.is_nan() {
                        assert!(again.time.is_nan());
                    } else {
                        assert_eq!(again.time.to_bits(), sample.time.to_bits());
                    }
                }
                other => panic!("re-serialized sample rejected: {:?}", other),
            }
        }
    }
});
