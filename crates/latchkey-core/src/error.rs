//! Session and transport error types.

use thiserror::Error;

/// Transport-level failures reported by a driver to a state machine.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
pub enum TransportError {
    /// The driver could not hand the bytes to the radio or channel.
    #[error("send failed")]
    SendFailed,

    /// The driver gave up waiting on the channel.
    #[error("channel timed out")]
    Timeout,
}

/// Failures surfaced by the device state machines.
///
/// These mean the caller misused the machine or a build step failed; they
/// are never produced by inbound bytes, which are silently discarded when
/// invalid.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum SessionError {
    /// The operation is not legal in the current state.
    #[error("operation {operation} invalid in state {state}")]
    InvalidState {
        /// State the machine was in.
        state: &'static str,
        /// Operation the caller attempted.
        operation: &'static str,
    },

    /// Outbound frame construction failed.
    #[error(transparent)]
    Frame(#[from] latchkey_proto::FrameError),

    /// Request signing failed.
    #[error(transparent)]
    Crypto(#[from] latchkey_crypto::CryptoError),

    /// Request body serialization failed.
    #[error("request serialization failed: {reason}")]
    Encode {
        /// What the serializer reported.
        reason: String,
    },
}
