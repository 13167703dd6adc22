//! Transport abstractions for the two device channels.
//!
//! The card gate reaches the hub only through a long-range radio; the
//! keypad door and the hub talk over a local network message channel.
//! Both are collaborators supplied by a driver: production wires in the
//! hardware radio and the broker client, tests wire in lossy in-memory
//! simulations.

use async_trait::async_trait;
use bytes::Bytes;

use crate::error::TransportError;

/// Unreliable byte-oriented radio link.
///
/// The link gives no delivery, ordering, or framing guarantee: `poll` may
/// return a partial frame, several frames fused together, or noise. The
/// frame codec in `latchkey-proto` is responsible for making sense of it.
pub trait RadioLink {
    /// Hands bytes to the radio for transmission.
    ///
    /// # Errors
    ///
    /// [`TransportError::SendFailed`] when the driver could not transmit.
    /// Sessions retry this with backoff; the radio itself does not.
    fn send(&mut self, bytes: &[u8]) -> Result<(), TransportError>;

    /// Returns received bytes, or `None` when nothing is pending.
    /// Never blocks; device control loops poll this cooperatively.
    fn poll(&mut self) -> Option<Bytes>;
}

/// A message delivered on a named channel of the local network bus.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ChannelMessage {
    /// Channel the message arrived on.
    pub channel: String,
    /// Raw message payload, JSON for every latchkey document.
    pub payload: Bytes,
}

impl ChannelMessage {
    /// Builds a message for the given channel.
    #[must_use]
    pub fn new(channel: impl Into<String>, payload: impl Into<Bytes>) -> Self {
        Self {
            channel: channel.into(),
            payload: payload.into(),
        }
    }
}

/// Publish/subscribe seam over the local network broker.
///
/// The broker itself is out of scope; this trait is the whole contract.
/// An endpoint receives every message on the channels it was subscribed
/// to at construction.
#[async_trait]
pub trait MessageChannel: Send {
    /// Publishes a payload on a channel.
    ///
    /// # Errors
    ///
    /// [`TransportError::SendFailed`] when the broker rejected the message.
    async fn publish(&self, channel: &str, payload: Bytes) -> Result<(), TransportError>;

    /// Waits for the next inbound message. `None` means the channel is
    /// closed and the caller should shut down.
    async fn next_message(&mut self) -> Option<ChannelMessage>;
}
