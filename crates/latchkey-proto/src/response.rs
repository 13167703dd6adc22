//! Hub-to-device response packets.
//!
//! Responses travel on a separate fixed-transmission path and use a
//! smaller layout than data frames: a 3-byte head, a big-endian target
//! address, the radio channel byte, a length byte, and a short ASCII
//! status token. There is no checksum; a garbled response fails token
//! matching and the device keeps polling.

use bytes::{BufMut, Bytes, BytesMut};

use crate::errors::{FrameError, Result};

/// Fixed head opening every response packet.
pub const RESPONSE_PREFIX: [u8; 3] = [0xC0, 0x00, 0x00];

/// Radio channel byte every response must carry.
pub const RESPONSE_CHANNEL: u8 = 0x17;

/// Bytes before the token: head, address, channel, and length.
pub const RESPONSE_HEADER_LEN: usize = RESPONSE_PREFIX.len() + 2 + 1 + 1;

/// Token granting access. Five bytes, the same length as
/// [`DENY_TOKEN`], so every verdict response is identical in size on
/// the air.
pub const GRANT_TOKEN: &str = "GRANT";

/// Token refusing access.
pub const DENY_TOKEN: &str = "DENY5";

/// How a receiving device reads a status token.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Verdict {
    /// Token is exactly `GRANT`.
    Grant,
    /// Token starts with `DENY`.
    Deny,
}

/// A decoded hub response.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ResponseFrame {
    address: u16,
    token: String,
}

impl ResponseFrame {
    /// Builds a response carrying an arbitrary token.
    ///
    /// # Errors
    ///
    /// Returns [`FrameError::PayloadTooLarge`] when the token exceeds the
    /// 8-bit length field.
    pub fn new(address: u16, token: impl Into<String>) -> Result<Self> {
        let token = token.into();
        if token.len() > usize::from(u8::MAX) {
            return Err(FrameError::PayloadTooLarge {
                max: usize::from(u8::MAX),
                actual: token.len(),
            });
        }
        Ok(Self { address, token })
    }

    /// A grant response for the given device address.
    #[must_use]
    pub fn grant(address: u16) -> Self {
        Self {
            address,
            token: GRANT_TOKEN.to_owned(),
        }
    }

    /// A deny response for the given device address.
    #[must_use]
    pub fn deny(address: u16) -> Self {
        Self {
            address,
            token: DENY_TOKEN.to_owned(),
        }
    }

    /// Target device address. Receivers on a broadcast link ignore it.
    #[must_use]
    pub fn address(&self) -> u16 {
        self.address
    }

    /// The raw status token.
    #[must_use]
    pub fn token(&self) -> &str {
        &self.token
    }

    /// Interprets the token the way gate firmware does: `GRANT` must match
    /// exactly, any token starting with `DENY` refuses, everything else is
    /// unknown and the caller discards the response.
    #[must_use]
    pub fn verdict(&self) -> Option<Verdict> {
        if self.token == GRANT_TOKEN {
            Some(Verdict::Grant)
        } else if self.token.starts_with("DENY") {
            Some(Verdict::Deny)
        } else {
            None
        }
    }

    /// Serializes to wire bytes.
    #[must_use]
    pub fn encode(&self) -> Bytes {
        let mut buf = BytesMut::with_capacity(RESPONSE_HEADER_LEN + self.token.len());
        buf.extend_from_slice(&RESPONSE_PREFIX);
        buf.put_u16(self.address);
        buf.put_u8(RESPONSE_CHANNEL);
        buf.put_u8(self.token.len() as u8);
        buf.extend_from_slice(self.token.as_bytes());
        buf.freeze()
    }

    /// Decodes one response from `data`.
    ///
    /// `Ok(None)` means more bytes are needed. Structural mismatches are
    /// errors; receivers discard the packet and keep polling.
    ///
    /// # Errors
    ///
    /// [`FrameError::Malformed`] for a bad head, a foreign channel byte, a
    /// length field that disagrees with the byte count, or a token that is
    /// not UTF-8.
    pub fn decode(data: &[u8]) -> Result<Option<Self>> {
        if data.len() < RESPONSE_HEADER_LEN {
            return Ok(None);
        }
        if data[..RESPONSE_PREFIX.len()] != RESPONSE_PREFIX {
            return Err(FrameError::Malformed {
                reason: "response head mismatch",
            });
        }
        if data[5] != RESPONSE_CHANNEL {
            return Err(FrameError::Malformed {
                reason: "foreign radio channel",
            });
        }
        let token_len = usize::from(data[6]);
        let total = RESPONSE_HEADER_LEN + token_len;
        if data.len() < total {
            return Ok(None);
        }
        if data.len() > total {
            return Err(FrameError::Malformed {
                reason: "length field disagrees with byte count",
            });
        }
        let token = std::str::from_utf8(&data[RESPONSE_HEADER_LEN..total])
            .map_err(|_| FrameError::Malformed {
                reason: "status token is not valid UTF-8",
            })?
            .to_owned();
        Ok(Some(Self {
            address: u16::from_be_bytes([data[3], data[4]]),
            token,
        }))
    }
}

#[cfg(test)]
mod tests {
    use super::{ResponseFrame, Verdict, DENY_TOKEN, GRANT_TOKEN, RESPONSE_HEADER_LEN};
    use crate::errors::FrameError;
    use hex_literal::hex;

    #[test]
    fn encodes_the_documented_layout() {
        let bytes = ResponseFrame::grant(0x0001).encode();
        assert_eq!(&bytes[..RESPONSE_HEADER_LEN], hex!("C0 00 00 00 01 17 05"));
        assert_eq!(&bytes[RESPONSE_HEADER_LEN..], GRANT_TOKEN.as_bytes());
    }

    #[test]
    fn grant_and_deny_responses_are_the_same_size() {
        assert_eq!(
            ResponseFrame::grant(7).encode().len(),
            ResponseFrame::deny(7).encode().len(),
        );
    }

    #[test]
    fn round_trips_with_a_big_endian_address() {
        let response = ResponseFrame::deny(0xBEEF);
        let decoded = ResponseFrame::decode(&response.encode()).unwrap().unwrap();
        assert_eq!(decoded, response);
        assert_eq!(decoded.address(), 0xBEEF);
        assert_eq!(decoded.token(), DENY_TOKEN);
    }

    #[test]
    fn short_input_is_not_an_error() {
        let bytes = ResponseFrame::grant(1).encode();
        for cut in [0, RESPONSE_HEADER_LEN - 1, bytes.len() - 1] {
            assert_eq!(ResponseFrame::decode(&bytes[..cut]).unwrap(), None);
        }
    }

    #[test]
    fn rejects_a_foreign_channel_byte() {
        let mut bytes = ResponseFrame::grant(1).encode().to_vec();
        bytes[5] = 0x18;
        assert!(matches!(
            ResponseFrame::decode(&bytes),
            Err(FrameError::Malformed { .. })
        ));
    }

    #[test]
    fn rejects_trailing_bytes() {
        let mut bytes = ResponseFrame::grant(1).encode().to_vec();
        bytes.push(0x00);
        assert!(matches!(
            ResponseFrame::decode(&bytes),
            Err(FrameError::Malformed { .. })
        ));
    }

    #[test]
    fn verdict_matching_follows_the_gate_rules() {
        assert_eq!(ResponseFrame::grant(1).verdict(), Some(Verdict::Grant));
        assert_eq!(ResponseFrame::deny(1).verdict(), Some(Verdict::Deny));
        // Any DENY-prefixed token refuses; anything else is unknown.
        let deny9 = ResponseFrame::new(1, "DENY9").unwrap();
        assert_eq!(deny9.verdict(), Some(Verdict::Deny));
        let lower = ResponseFrame::new(1, "grant").unwrap();
        assert_eq!(lower.verdict(), None);
        let padded = ResponseFrame::new(1, "GRANTX").unwrap();
        assert_eq!(padded.verdict(), None);
    }

    #[test]
    fn oversized_token_is_rejected_at_construction() {
        let result = ResponseFrame::new(1, "x".repeat(256));
        assert!(matches!(
            result,
            Err(FrameError::PayloadTooLarge { actual: 256, .. })
        ));
    }
}
