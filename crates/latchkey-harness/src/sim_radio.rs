//! In-memory lossy radio link.
//!
//! A [`SimRadio`] pair models the gate-to-hub radio: each side's `send`
//! appends to the peer's inbound queue, and faults are injected per side
//! with counted knobs. Delivery is instantaneous; latency in a scenario
//! comes from when the test chooses to poll.

use std::collections::VecDeque;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use bytes::Bytes;
use latchkey_core::{RadioLink, TransportError};

type Queue = Arc<Mutex<VecDeque<Bytes>>>;

fn lock(queue: &Queue) -> MutexGuard<'_, VecDeque<Bytes>> {
    queue.lock().unwrap_or_else(PoisonError::into_inner)
}

/// One endpoint of a simulated radio link.
#[derive(Debug)]
pub struct SimRadio {
    inbound: Queue,
    peer_inbound: Queue,
    fail_next: u32,
    drop_next: u32,
    sent: u64,
}

impl SimRadio {
    /// Creates a connected pair of radio endpoints.
    #[must_use]
    pub fn pair() -> (Self, Self) {
        let a: Queue = Arc::default();
        let b: Queue = Arc::default();
        (
            Self {
                inbound: Arc::clone(&a),
                peer_inbound: Arc::clone(&b),
                fail_next: 0,
                drop_next: 0,
                sent: 0,
            },
            Self {
                inbound: b,
                peer_inbound: a,
                fail_next: 0,
                drop_next: 0,
                sent: 0,
            },
        )
    }

    /// Makes the next `count` sends on this side report failure to the
    /// caller without transmitting.
    pub fn fail_next_sends(&mut self, count: u32) {
        self.fail_next += count;
    }

    /// Makes the next `count` sends on this side vanish silently: the
    /// caller sees success but the peer receives nothing.
    pub fn drop_next_sends(&mut self, count: u32) {
        self.drop_next += count;
    }

    /// Injects raw bytes into this side's inbound queue, as channel noise
    /// or a forged transmission would arrive.
    pub fn inject(&self, bytes: &[u8]) {
        lock(&self.inbound).push_back(Bytes::copy_from_slice(bytes));
    }

    /// Sends this side reported as successful so far.
    #[must_use]
    pub fn sent(&self) -> u64 {
        self.sent
    }
}

impl RadioLink for SimRadio {
    fn send(&mut self, bytes: &[u8]) -> Result<(), TransportError> {
        if self.fail_next > 0 {
            self.fail_next -= 1;
            return Err(TransportError::SendFailed);
        }
        self.sent += 1;
        if self.drop_next > 0 {
            self.drop_next -= 1;
            return Ok(());
        }
        lock(&self.peer_inbound).push_back(Bytes::copy_from_slice(bytes));
        Ok(())
    }

    fn poll(&mut self) -> Option<Bytes> {
        lock(&self.inbound).pop_front()
    }
}
