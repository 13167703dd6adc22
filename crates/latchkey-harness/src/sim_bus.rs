//! In-memory publish/subscribe broker.
//!
//! [`SimBus`] stands in for the local network broker: endpoints
//! subscribe with channel patterns at creation and receive every message
//! published on a matching channel, including their own. Patterns use
//! `+` for one channel segment and `#` for the remaining tail.

use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use async_trait::async_trait;
use bytes::Bytes;
use latchkey_core::{ChannelMessage, MessageChannel, TransportError};
use tokio::sync::mpsc;

#[derive(Debug)]
struct Subscriber {
    patterns: Vec<String>,
    tx: mpsc::UnboundedSender<ChannelMessage>,
}

/// Whether a subscription pattern matches a concrete channel name.
fn matches(pattern: &str, channel: &str) -> bool {
    let mut pattern_parts = pattern.split('/');
    let mut channel_parts = channel.split('/');
    loop {
        match (pattern_parts.next(), channel_parts.next()) {
            (Some("#"), _) => return true,
            (Some("+"), Some(_)) => {}
            (Some(p), Some(c)) if p == c => {}
            (None, None) => return true,
            _ => return false,
        }
    }
}

/// The shared broker. Cloning yields another handle to the same bus.
#[derive(Debug, Clone, Default)]
pub struct SimBus {
    subscribers: Arc<Mutex<Vec<Subscriber>>>,
}

impl SimBus {
    /// Creates an empty bus.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    fn lock(&self) -> MutexGuard<'_, Vec<Subscriber>> {
        self.subscribers.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Creates an endpoint subscribed to the given channel patterns.
    #[must_use]
    pub fn endpoint(&self, patterns: &[&str]) -> BusEndpoint {
        let (tx, rx) = mpsc::unbounded_channel();
        self.lock().push(Subscriber {
            patterns: patterns.iter().map(|&p| p.to_owned()).collect(),
            tx,
        });
        BusEndpoint { bus: self.clone(), rx }
    }

    fn deliver(&self, channel: &str, payload: &Bytes) {
        let mut subscribers = self.lock();
        subscribers.retain(|subscriber| {
            if !subscriber.patterns.iter().any(|p| matches(p, channel)) {
                return true;
            }
            // A closed receiver means the endpoint was dropped; forget it.
            subscriber
                .tx
                .send(ChannelMessage::new(channel, payload.clone()))
                .is_ok()
        });
    }
}

/// One subscriber endpoint on the bus.
#[derive(Debug)]
pub struct BusEndpoint {
    bus: SimBus,
    rx: mpsc::UnboundedReceiver<ChannelMessage>,
}

#[async_trait]
impl MessageChannel for BusEndpoint {
    async fn publish(&self, channel: &str, payload: Bytes) -> Result<(), TransportError> {
        self.bus.deliver(channel, &payload);
        Ok(())
    }

    async fn next_message(&mut self) -> Option<ChannelMessage> {
        self.rx.recv().await
    }
}
