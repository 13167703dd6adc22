//! Hub-side verifier and dispatcher for the latchkey protocol.
//!
//! The hub sits between the field devices and the rest of the system. It
//! reassembles frames from the lossy radio, verifies signed keypad
//! requests, decides grant/deny verdicts, dispatches operator-issued
//! remote commands, and records every outcome for audit. The REST API,
//! database, and dashboard are collaborators behind the message channel;
//! nothing in this crate talks to them directly.
//!
//! # Concurrency
//!
//! Devices are strictly single-outstanding, but the hub serves many of
//! them at once. All shared verifier state (replay cache, rate windows,
//! registry) lives behind one lock whose critical sections never await,
//! so any number of channel tasks can call into [`Hub`] concurrently.
//!
//! # Components
//!
//! - [`verifier`]: signature, freshness, replay, and credential pipeline
//! - [`dispatch`]: frame/message routing and remote-command bookkeeping
//! - [`registry`]: registered credentials and card UIDs
//! - [`replay`]: bounded `(client, nonce)` replay cache
//! - [`ratelimit`]: per-device sliding request window
//! - [`audit`]: outcome records published on the uplink channel
//! - [`channel`]: channel naming shared with drivers and the harness
//! - [`config`]: deployment configuration

#![forbid(unsafe_code)]
#![warn(missing_docs)]

pub mod audit;
pub mod channel;
pub mod config;
pub mod dispatch;
pub mod error;
pub mod ratelimit;
pub mod registry;
pub mod replay;
pub mod verifier;

pub use audit::AuditRecord;
pub use config::HubConfig;
pub use dispatch::{Hub, HubAction, HubStats};
pub use error::AuthError;
pub use ratelimit::RateLimiter;
pub use registry::{CardRecord, Registry};
pub use replay::ReplayGuard;
pub use verifier::{VerifiedRequest, Verifier};
