#![no_main]

use libfuzzer_sys::fuzz_target;
use wisp_signal::message::{PreKeyMessage, SignalMessage};

fuzz_target!(|data: &[u8]| {
    // Fuzz envelope parsing - should never panic on any input
    let _ = SignalMessage::parse(data);
    let _ = PreKeyMessage::parse(data);
});
