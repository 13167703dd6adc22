//! Fixed frame header, the eight bytes between the channel prefix and the
//! payload length byte.

use crate::flags::FrameFlags;
use crate::kinds::{DeviceKind, MessageKind};

/// Protocol version carried in the low nibble of header byte 0.
pub const PROTOCOL_VERSION: u8 = 1;

/// Decoded frame header. Kind and device nibbles are stored raw so a frame
/// with an unassigned code point still round-trips byte for byte; the typed
/// accessors return `None` for those.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FrameHeader {
    message_type: u8,
    version: u8,
    flags: FrameFlags,
    device_type: u8,
    sequence: u16,
    timestamp: u32,
}

impl FrameHeader {
    /// Encoded size of the header on the wire.
    pub const WIRE_LEN: usize = 8;

    /// Header for an outbound frame at the current protocol version.
    ///
    /// `timestamp` is seconds since the sending device booted, not wall
    /// clock. It exists for operator logs only and must never feed a
    /// freshness check.
    #[must_use]
    pub fn new(kind: MessageKind, device: DeviceKind, sequence: u16, timestamp: u32) -> Self {
        Self {
            message_type: kind as u8,
            version: PROTOCOL_VERSION,
            flags: FrameFlags::default(),
            device_type: device as u8,
            sequence,
            timestamp,
        }
    }

    /// Message kind, if the nibble is an assigned code point.
    #[must_use]
    pub fn kind(&self) -> Option<MessageKind> {
        MessageKind::from_nibble(self.message_type)
    }

    /// Raw message-kind nibble as received.
    #[must_use]
    pub fn kind_raw(&self) -> u8 {
        self.message_type
    }

    /// Sending device class, if the nibble is an assigned code point.
    #[must_use]
    pub fn device(&self) -> Option<DeviceKind> {
        DeviceKind::from_nibble(self.device_type)
    }

    /// Raw device-class nibble as received.
    #[must_use]
    pub fn device_raw(&self) -> u8 {
        self.device_type
    }

    /// Protocol version nibble.
    #[must_use]
    pub fn version(&self) -> u8 {
        self.version
    }

    /// Flag nibble.
    #[must_use]
    pub fn flags(&self) -> FrameFlags {
        self.flags
    }

    /// Per-boot-session sequence counter. Wraps at 65536.
    #[must_use]
    pub fn sequence(&self) -> u16 {
        self.sequence
    }

    /// Seconds since the sending device booted.
    #[must_use]
    pub fn timestamp(&self) -> u32 {
        self.timestamp
    }

    /// Pack into wire order: kind/version byte, flags/device byte, then
    /// little-endian sequence and timestamp.
    #[must_use]
    pub fn to_bytes(&self) -> [u8; Self::WIRE_LEN] {
        let mut bytes = [0u8; Self::WIRE_LEN];
        bytes[0] = (self.message_type << 4) | (self.version & 0x0F);
        bytes[1] = (self.flags.to_nibble() << 4) | (self.device_type & 0x0F);
        bytes[2..4].copy_from_slice(&self.sequence.to_le_bytes());
        bytes[4..8].copy_from_slice(&self.timestamp.to_le_bytes());
        bytes
    }

    /// Unpack from wire order. Never fails: every bit pattern is a
    /// structurally valid header.
    #[must_use]
    pub fn from_bytes(bytes: [u8; Self::WIRE_LEN]) -> Self {
        Self {
            message_type: bytes[0] >> 4,
            version: bytes[0] & 0x0F,
            flags: FrameFlags::from_nibble(bytes[1] >> 4),
            device_type: bytes[1] & 0x0F,
            sequence: u16::from_le_bytes([bytes[2], bytes[3]]),
            timestamp: u32::from_le_bytes([bytes[4], bytes[5], bytes[6], bytes[7]]),
        }
    }
}
