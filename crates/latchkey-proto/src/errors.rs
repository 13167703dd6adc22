//! Error types for wire-format decoding.

use thiserror::Error;

/// Convenience alias for frame decoding results.
pub type Result<T> = std::result::Result<T, FrameError>;

/// Why a candidate frame was rejected.
///
/// Both variants mean the bytes are discarded in full. On the lossy radio
/// channel these are expected events, counted by the receiver and otherwise
/// indistinguishable from noise.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
pub enum FrameError {
    /// Structural failure: wrong prefix, truncated header, or a payload
    /// length that disagrees with the byte count.
    #[error("malformed frame: {reason}")]
    Malformed {
        /// What the decoder tripped on.
        reason: &'static str,
    },

    /// The recomputed CRC-32 disagreed with the trailing checksum.
    #[error("checksum mismatch: computed {computed:#010x}, received {received:#010x}")]
    ChecksumMismatch {
        /// CRC computed over the received post-prefix region.
        computed: u32,
        /// CRC carried in the frame trailer.
        received: u32,
    },

    /// Encode-side rejection: the payload does not fit the 8-bit length
    /// field.
    #[error("payload too large: max {max}, got {actual}")]
    PayloadTooLarge {
        /// Largest payload the length field can describe.
        max: usize,
        /// Size of the payload handed to the encoder.
        actual: usize,
    },
}
