#![no_main]

use libfuzzer_sys::fuzz_target;

fuzz_target!(|data: &[u8]| {
    // Fuzz node decoding - should never panic on any input
    let _ = wisp_core::decode(data);
});
