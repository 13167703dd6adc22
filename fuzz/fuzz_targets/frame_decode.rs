//! Frame decoding must never panic, and every accepted frame must
//! re-encode to the exact input bytes.

#![no_main]

use latchkey_proto::Frame;
use libfuzzer_sys::fuzz_target;

fuzz_target!(|data: &[u8]| {
    if let Ok(Some(frame)) = Frame::decode(data) {
        assert_eq!(frame.encode().as_ref(), data);
        assert_eq!(frame.encoded_len(), data.len());
        // Accessors walk the payload; none may panic on arbitrary bytes.
        let _ = frame.uid();
        let _ = frame.status_token();
        let _ = frame.header().kind();
        let _ = frame.header().device();
    }
});
