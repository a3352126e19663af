#![no_main]
use ax12_hardware::FrameParser;
use libfuzzer_sys::fuzz_target;

fuzz_target!(|data: &[u8]| {
    // Arbitrary wire bytes may produce framing errors but never a panic,
    // and the parser must keep accepting bytes after every error.
    let mut parser = FrameParser::new();
    for &b in data {
        let _ = parser.push(b);
    }
});
