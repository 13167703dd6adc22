//! Hub deployment configuration.

use std::time::Duration;

use serde::Deserialize;

/// Tunable hub constants, loadable from a JSON deployment file.
///
/// Defaults are the fleet's production values; a config file overrides
/// only the fields it names.
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct HubConfig {
    /// Half-width of the `issued_at` acceptance window, seconds. A
    /// request is fresh when `|now - issued_at|` is at most this.
    pub accept_window_secs: u64,
    /// Requests allowed per device per rate window.
    pub rate_limit_max: u32,
    /// Width of the sliding rate window, seconds.
    pub rate_limit_window_secs: u64,
    /// Capacity bound of the replay cache.
    pub replay_capacity: usize,
    /// Radio address verdict responses are addressed to.
    pub gate_address: u16,
    /// How long the hub waits for a remote-command ack before reporting
    /// the command unconfirmed, seconds.
    pub ack_window_secs: u64,
}

impl Default for HubConfig {
    fn default() -> Self {
        Self {
            accept_window_secs: 90,
            rate_limit_max: 10,
            rate_limit_window_secs: 60,
            replay_capacity: 4096,
            gate_address: 0x0001,
            ack_window_secs: 60,
        }
    }
}

impl HubConfig {
    /// The acceptance window as a duration.
    #[must_use]
    pub fn accept_window(&self) -> Duration {
        Duration::from_secs(self.accept_window_secs)
    }

    /// The rate window as a duration.
    #[must_use]
    pub fn rate_limit_window(&self) -> Duration {
        Duration::from_secs(self.rate_limit_window_secs)
    }

    /// The ack window as a duration.
    #[must_use]
    pub fn ack_window(&self) -> Duration {
        Duration::from_secs(self.ack_window_secs)
    }
}
