#![no_main]

use libfuzzer_sys::fuzz_target;
use portal_engine::json_string::{decode_json_string, encode_json_string};

fuzz_target!(|data: &[u8]| {
    let Ok(text) = std::str::from_utf8(data) else {
        return;
    };

    let encoded = encode_json_string(text);
    assert!(!encoded.contains('\n'));
    assert!(!encoded.contains('\t'));
    assert!(!encoded.contains('\r'));

    // Inputs that already contain the sentinel code points are outside
    // the codec's domain; for everything else the decode is exact.
    if !text.contains('\u{E000}') && !text.contains('\u{E001}') && !text.contains('\u{E002}') {
        assert_eq!(decode_json_string(&encoded), text);
    }

    // Decoding arbitrary text never panics.
    let _ = decode_json_string(text);
});
