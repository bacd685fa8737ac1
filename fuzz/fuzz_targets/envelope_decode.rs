#![no_main]

use libfuzzer_sys::fuzz_target;
use portal_engine::envelope::{CallbackOutcome, Envelope};

fuzz_target!(|data: &[u8]| {
    let Ok(text) = std::str::from_utf8(data) else {
        return;
    };

    // Parsing hostile wire input never panics; a successful parse must
    // re-encode and parse back to the same envelope.
    if let Ok(envelope) = serde_json::from_str::<Envelope>(text) {
        let reencoded = serde_json::to_string(&envelope).expect("reencode");
        let reparsed: Envelope = serde_json::from_str(&reencoded).expect("reparse");
        assert_eq!(reparsed, envelope);
    }

    if let Ok(outcome) = CallbackOutcome::decode(text) {
        let _ = outcome.into_result();
    }
});
