//! Frame header flag nibble.

use bitflags::bitflags;

bitflags! {
    /// Flag nibble of the frame header. No bits are assigned yet: senders
    /// leave the nibble zero, receivers carry unrecognized bits through
    /// unchanged so the checksum and re-encode stay byte-faithful.
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
    pub struct FrameFlags: u8 {}
}

impl FrameFlags {
    /// Width of the flag field on the wire.
    pub const WIRE_BITS: u32 = 4;

    /// Rebuild from the header nibble, keeping reserved bits.
    #[must_use]
    pub fn from_nibble(nibble: u8) -> Self {
        Self::from_bits_retain(nibble & 0x0F)
    }

    /// The nibble to pack into the header byte.
    #[must_use]
    pub fn to_nibble(self) -> u8 {
        self.bits() & 0x0F
    }
}
