//! Replay guard: the `(client, nonce)` reuse cache.
//!
//! Accepted nonces are remembered for the acceptance window; a second
//! appearance inside the window is a replay. Entries are evicted once
//! the window passes (a request that old fails the freshness check
//! instead) and by a capacity bound that caps memory under a nonce
//! flood. State is in-memory only; a hub restart clears it, which is an
//! accepted risk of the protocol.

use std::collections::{HashSet, VecDeque};
use std::time::{Duration, Instant};

/// Bounded cache of recently accepted `(client, nonce)` pairs.
#[derive(Debug)]
pub struct ReplayGuard {
    window: Duration,
    capacity: usize,
    seen: HashSet<(String, u32)>,
    order: VecDeque<(Instant, (String, u32))>,
}

impl ReplayGuard {
    /// Creates a guard remembering pairs for `window`, holding at most
    /// `capacity` entries (oldest evicted first).
    #[must_use]
    pub fn new(window: Duration, capacity: usize) -> Self {
        Self {
            window,
            capacity,
            seen: HashSet::new(),
            order: VecDeque::new(),
        }
    }

    /// Drops entries older than the window.
    pub fn prune(&mut self, now: Instant) {
        while let Some((seen_at, _)) = self.order.front() {
            if now.duration_since(*seen_at) > self.window {
                if let Some((_, key)) = self.order.pop_front() {
                    self.seen.remove(&key);
                }
            } else {
                break;
            }
        }
    }

    /// Accepts the pair if it is fresh, recording it; returns `false`
    /// for a pair already seen inside the window.
    pub fn check_and_record(&mut self, client_id: &str, nonce: u32, now: Instant) -> bool {
        self.prune(now);
        let key = (client_id.to_owned(), nonce);
        if self.seen.contains(&key) {
            return false;
        }
        if self.order.len() >= self.capacity {
            if let Some((_, oldest)) = self.order.pop_front() {
                self.seen.remove(&oldest);
            }
        }
        self.seen.insert(key.clone());
        self.order.push_back((now, key));
        true
    }

    /// Pairs currently remembered.
    #[must_use]
    pub fn len(&self) -> usize {
        self.order.len()
    }

    /// Whether the cache is empty.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.order.is_empty()
    }
}
