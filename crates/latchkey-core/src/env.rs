//! Environment abstraction for time and randomness.
//!
//! State machines never read the clock or an RNG themselves; everything
//! comes through this trait so tests can substitute a controlled
//! implementation and replay exact timings.

use std::future::Future;
use std::time::{Duration, Instant, SystemTime, UNIX_EPOCH};

/// Source of time and randomness for device and hub logic.
pub trait Environment {
    /// Current monotonic time. Drives every deadline in the state machines.
    fn now(&self) -> Instant;

    /// Current wall-clock time in whole seconds since the Unix epoch.
    /// Only the keypad request path uses this; the radio channel never
    /// trusts wall clocks.
    fn unix_time(&self) -> u64;

    /// Sleep for the given duration. Drivers use this between poll cycles;
    /// the state machines themselves never sleep.
    fn sleep(&self, duration: Duration) -> impl Future<Output = ()> + Send;

    /// Fill `buffer` with random bytes.
    fn random_bytes(&self, buffer: &mut [u8]);
}

/// Draws a fresh request nonce: a random non-negative 31-bit integer.
pub fn random_nonce(env: &impl Environment) -> u32 {
    let mut bytes = [0u8; 4];
    env.random_bytes(&mut bytes);
    u32::from_le_bytes(bytes) & 0x7FFF_FFFF
}

/// Production environment backed by the OS clock and RNG.
#[derive(Debug, Clone, Copy, Default)]
pub struct SystemEnv;

impl SystemEnv {
    /// Creates the system environment.
    #[must_use]
    pub fn new() -> Self {
        Self
    }
}

impl Environment for SystemEnv {
    fn now(&self) -> Instant {
        Instant::now()
    }

    fn unix_time(&self) -> u64 {
        SystemTime::now()
            .duration_since(UNIX_EPOCH)
            .map(|d| d.as_secs())
            .unwrap_or(0)
    }

    fn sleep(&self, duration: Duration) -> impl Future<Output = ()> + Send {
        tokio::time::sleep(duration)
    }

    fn random_bytes(&self, buffer: &mut [u8]) {
        use rand::RngCore;
        rand::thread_rng().fill_bytes(buffer);
    }
}
