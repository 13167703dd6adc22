//! Per-device sliding-window rate limiter.
//!
//! Unlike a fixed window that resets at an edge, this remembers the
//! individual request instants and counts only those inside the trailing
//! window, so a burst straddling a window boundary cannot double the
//! allowance. One deque per device key; pruning happens on the request
//! path, with a capacity bound as a backstop.

use std::collections::{HashMap, VecDeque};
use std::time::{Duration, Instant};

/// Hard cap on remembered instants per device, above the configured
/// limit, in case a deployment configures a very large window.
const MAX_ENTRIES_PER_DEVICE: usize = 1024;

/// Sliding-window request counter keyed by device.
#[derive(Debug)]
pub struct RateLimiter {
    window: Duration,
    max_requests: u32,
    history: HashMap<String, VecDeque<Instant>>,
}

impl RateLimiter {
    /// Creates a limiter allowing `max_requests` per `window` per device.
    #[must_use]
    pub fn new(window: Duration, max_requests: u32) -> Self {
        Self {
            window,
            max_requests,
            history: HashMap::new(),
        }
    }

    /// Admits the request if the device is under its limit, recording it.
    pub fn check_and_record(&mut self, device: &str, now: Instant) -> bool {
        let entries = self.history.entry(device.to_owned()).or_default();
        while let Some(oldest) = entries.front() {
            if now.duration_since(*oldest) >= self.window {
                entries.pop_front();
            } else {
                break;
            }
        }
        if entries.len() >= self.max_requests as usize {
            return false;
        }
        entries.push_back(now);
        if entries.len() > MAX_ENTRIES_PER_DEVICE {
            entries.pop_front();
        }
        true
    }

    /// Drops expired entries and forgets idle devices.
    pub fn prune(&mut self, now: Instant) {
        self.history.retain(|_, entries| {
            while let Some(oldest) = entries.front() {
                if now.duration_since(*oldest) >= self.window {
                    entries.pop_front();
                } else {
                    break;
                }
            }
            !entries.is_empty()
        });
    }

    /// Requests currently counted for a device.
    #[must_use]
    pub fn current(&self, device: &str) -> usize {
        self.history.get(device).map_or(0, VecDeque::len)
    }
}
