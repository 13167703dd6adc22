//! Wire formats for the latchkey device-command protocol.
//!
//! Two channels, two formats. The radio channel carries compact binary
//! frames: a fixed 3-byte channel prefix, an 8-byte nibble-packed header,
//! a length byte, up to 255 payload bytes, and a trailing CRC-32. The
//! local network
//! channel carries small JSON documents: a signed `{body, hmac}` request
//! envelope and the command/ack/status messages around it.
//!
//! Everything in this crate is pure and stateless. Decoding never trusts a
//! frame partially: a checksum or structure failure discards the whole
//! candidate. Short input is "no frame yet", not an error, because the
//! radio delivers bytes in arbitrary chunks.
//!
//! # Security
//!
//! The CRC is an integrity check against channel noise, not an
//! authenticator. Authentication lives in the signed request envelope and
//! is verified hub-side; see the `latchkey-crypto` and `latchkey-hub`
//! crates.
#![forbid(unsafe_code)]
#![warn(missing_docs)]

pub mod crc;
pub mod errors;
pub mod flags;
pub mod frame;
pub mod header;
pub mod kinds;
pub mod payloads;
pub mod response;

pub use errors::{FrameError, Result};
pub use flags::FrameFlags;
pub use frame::{Deframer, Frame, FRAME_PREFIX, MIN_FRAME_LEN};
pub use header::FrameHeader;
pub use kinds::{DeviceKind, MessageKind};
pub use payloads::{
    CommandAck, CommandMessage, DeviceStatus, RequestBody, RequestEnvelope, UNLOCK_REQUEST_CMD,
};
pub use response::{ResponseFrame, Verdict, RESPONSE_CHANNEL, RESPONSE_PREFIX};
