//! The deframer must survive arbitrary byte streams fed in arbitrary
//! chunk sizes, and every frame it yields must be a valid frame.

#![no_main]

use latchkey_proto::{Deframer, Frame};
use libfuzzer_sys::fuzz_target;

fuzz_target!(|data: &[u8]| {
    // First input byte picks the chunking; the rest is the stream.
    let Some((&chunk_byte, stream)) = data.split_first() else {
        return;
    };
    let chunk = usize::from(chunk_byte).max(1);

    let mut deframer = Deframer::new();
    for piece in stream.chunks(chunk) {
        deframer.push(piece);
        while let Some(frame) = deframer.next_frame() {
            // Anything yielded survived the CRC, so it must re-decode.
            let encoded = frame.encode();
            assert!(matches!(Frame::decode(&encoded), Ok(Some(_))));
        }
    }
});
