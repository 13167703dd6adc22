//! Response packet decoding must never panic, and accepted packets must
//! round-trip byte for byte.

#![no_main]

use latchkey_proto::ResponseFrame;
use libfuzzer_sys::fuzz_target;

fuzz_target!(|data: &[u8]| {
    if let Ok(Some(response)) = ResponseFrame::decode(data) {
        assert_eq!(response.encode().as_ref(), data);
    }
});
