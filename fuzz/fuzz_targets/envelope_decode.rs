//! Request envelope and body parsing must never panic on arbitrary
//! JSON, and accepted documents must re-serialize losslessly.

#![no_main]

use latchkey_proto::{RequestBody, RequestEnvelope};
use libfuzzer_sys::fuzz_target;

fuzz_target!(|data: &[u8]| {
    let Ok(text) = std::str::from_utf8(data) else {
        return;
    };
    if let Ok(envelope) = RequestEnvelope::from_json(text) {
        if let Ok(json) = envelope.to_json() {
            assert_eq!(RequestEnvelope::from_json(&json).ok(), Some(envelope));
        }
    }
    if let Ok(body) = RequestBody::from_json(text) {
        if let Ok(json) = body.to_json() {
            assert_eq!(RequestBody::from_json(&json).ok(), Some(body));
        }
    }
});
