//! Card-gate session state machine.
//!
//! One scan, one session. The gate reads a card UID, sends a scan frame
//! over the radio with bounded retries, waits for the hub's verdict
//! within a fixed window, and actuates on a grant. Responses carry no
//! request id: correlation is purely the single-outstanding-request rule,
//! so a new scan is refused until the current session resolves.
//!
//! # Architecture: Action-Based State Machine
//!
//! This state machine follows the action pattern:
//! - Methods accept time as a parameter (no stored Environment)
//! - Methods return actions for the driver to execute
//! - The driver reports transmission results back (`send_succeeded`,
//!   `send_failed`), since only it knows whether the radio took the bytes
//!
//! # State Machine
//!
//! ```text
//! ┌──────┐  scan    ┌─────────┐  sent   ┌──────────────────┐
//! │ Idle │─────────>│ Sending │────────>│ AwaitingResponse │
//! └──────┘          └─────────┘         └──────────────────┘
//!     ↑                  │ retries           │         │
//!     │                  │ exhausted   DENY/ │         │ GRANT
//!     │                  ↓           timeout │         ↓
//!     │              (resolve Error)         │      ┌──────┐
//!     └──────────────────┴───────────────────┘      │ Open │
//!     ↑                                  hold over  └──────┘
//!     └─────────────────────────────────────────────────┘
//! ```
//!
//! Every exit path returns to `Idle`; no verdict, failure, or garbage
//! response can leave the gate unable to take the next scan.

use std::time::{Duration, Instant};

use latchkey_proto::{DeviceKind, Frame, MessageKind, ResponseFrame, Verdict};

use crate::env::Environment;
use crate::error::SessionError;

/// Status token emitted when the actuator opens.
pub const STATUS_OPEN: &str = "open";
/// Status token emitted when the actuator closes after the hold.
pub const STATUS_CLOSED: &str = "clos";
/// Status token emitted when a session resolves with an error.
pub const STATUS_ERROR: &str = "erro";

/// Largest card UID the reader hands over.
pub const MAX_UID_LEN: usize = 10;

/// Actions returned by the gate state machine.
///
/// The driver (firmware loop or test harness) executes these: frames go
/// to the radio, `Open`/`Close` go to the lock actuator, indications go
/// to the local LED/beeper.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum GateAction {
    /// Encode and transmit this frame over the radio.
    SendFrame(Frame),
    /// Engage the actuator (open the gate).
    Open,
    /// Release the actuator (close the gate).
    Close,
    /// Show a brief local indication; no actuation.
    Indicate(Indication),
}

/// Local indication for a session that ended without a grant.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Indication {
    /// The hub explicitly refused the credential.
    Denied,
    /// The session failed: bad UID, send retries exhausted, or no
    /// response within the window. Distinct from an explicit deny.
    Failed,
}

/// Gate session state.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum GateState {
    /// Ready for a scan.
    Idle,
    /// Scan frame built, transmission (or a retry of it) in progress.
    Sending,
    /// Frame on the air, polling for the hub's verdict.
    AwaitingResponse,
    /// Grant received, actuator engaged until the hold elapses.
    Open,
}

impl GateState {
    fn name(self) -> &'static str {
        match self {
            Self::Idle => "Idle",
            Self::Sending => "Sending",
            Self::AwaitingResponse => "AwaitingResponse",
            Self::Open => "Open",
        }
    }
}

/// Gate timing and retry configuration.
#[derive(Debug, Clone)]
pub struct GateConfig {
    /// How long to poll for a verdict after a successful send.
    pub response_timeout: Duration,
    /// Total transmission attempts before the session fails.
    pub send_attempts: u32,
    /// Delay before the first retry; doubles on each further attempt.
    pub backoff_base: Duration,
    /// How long the actuator stays open on a grant.
    pub hold_open: Duration,
    /// Ignore new scans this long after a session ends.
    pub debounce: Duration,
}

impl Default for GateConfig {
    fn default() -> Self {
        Self {
            response_timeout: Duration::from_secs(12),
            send_attempts: 3,
            backoff_base: Duration::from_secs(2),
            hold_open: Duration::from_secs(5),
            debounce: Duration::from_secs(3),
        }
    }
}

/// Counters the gate keeps for the operator log.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct GateStats {
    /// Scans accepted into a session (debounced scans excluded).
    pub scans: u64,
    /// Sessions resolved with a grant.
    pub grants: u64,
    /// Sessions resolved with an explicit deny.
    pub denials: u64,
    /// Transport-level send failures, including retried ones.
    pub send_errors: u64,
    /// Sessions that saw no valid verdict within the window.
    pub timeouts: u64,
}

/// The per-device gate session.
///
/// Owns all mutable gate state: the sequence counter, deadlines, and the
/// in-flight frame. The control loop threads one instance through its
/// iterations; nothing here is global.
#[derive(Debug, Clone)]
pub struct GateSession {
    state: GateState,
    config: GateConfig,
    /// Per-boot frame sequence, randomized at construction, shared by
    /// scan and status frames.
    sequence: u16,
    boot: Instant,
    in_flight: Option<Frame>,
    attempts: u32,
    retry_at: Option<Instant>,
    response_deadline: Option<Instant>,
    close_at: Option<Instant>,
    debounce_until: Option<Instant>,
    stats: GateStats,
}

impl GateSession {
    /// Creates an idle session.
    ///
    /// The sequence counter starts at a random value so a reboot does not
    /// replay the sequence numbers of the previous boot session.
    pub fn new(now: Instant, config: GateConfig, env: &impl Environment) -> Self {
        let mut seed = [0u8; 2];
        env.random_bytes(&mut seed);
        Self {
            state: GateState::Idle,
            config,
            sequence: u16::from_le_bytes(seed),
            boot: now,
            in_flight: None,
            attempts: 0,
            retry_at: None,
            response_deadline: None,
            close_at: None,
            debounce_until: None,
            stats: GateStats::default(),
        }
    }

    /// Current state.
    #[must_use]
    pub fn state(&self) -> GateState {
        self.state
    }

    /// Session counters.
    #[must_use]
    pub fn stats(&self) -> GateStats {
        self.stats
    }

    /// Sequence number the next frame will carry.
    #[must_use]
    pub fn sequence(&self) -> u16 {
        self.sequence
    }

    fn next_sequence(&mut self) -> u16 {
        let sequence = self.sequence;
        self.sequence = self.sequence.wrapping_add(1);
        sequence
    }

    fn boot_seconds(&self, now: Instant) -> u32 {
        now.duration_since(self.boot).as_secs() as u32
    }

    fn status_frame(&mut self, now: Instant, token: &str) -> Option<Frame> {
        let sequence = self.next_sequence();
        let timestamp = self.boot_seconds(now);
        Frame::status(
            MessageKind::GateStatus,
            DeviceKind::RfidGate,
            sequence,
            timestamp,
            token,
        )
        .ok()
    }

    /// Return to `Idle` and start the scan debounce interval.
    fn finish(&mut self, now: Instant) {
        self.state = GateState::Idle;
        self.in_flight = None;
        self.attempts = 0;
        self.retry_at = None;
        self.response_deadline = None;
        self.close_at = None;
        self.debounce_until = Some(now + self.config.debounce);
    }

    /// Resolve the session as failed: one `erro` status frame, a local
    /// indication, back to idle.
    fn fail(&mut self, now: Instant) -> Vec<GateAction> {
        self.finish(now);
        let mut actions = Vec::new();
        if let Some(frame) = self.status_frame(now, STATUS_ERROR) {
            actions.push(GateAction::SendFrame(frame));
        }
        actions.push(GateAction::Indicate(Indication::Failed));
        actions
    }

    /// Starts a session for a freshly read card UID.
    ///
    /// A scan inside the debounce interval is ignored and returns no
    /// actions. A UID outside 1..=[`MAX_UID_LEN`] bytes resolves the
    /// session as failed immediately, without transmitting.
    ///
    /// # Errors
    ///
    /// Returns [`SessionError::InvalidState`] while a session is already
    /// in flight; one request at a time is the protocol's correlation
    /// rule, not a resource limit.
    pub fn scan(&mut self, uid: &[u8], now: Instant) -> Result<Vec<GateAction>, SessionError> {
        if self.state != GateState::Idle {
            return Err(SessionError::InvalidState {
                state: self.state.name(),
                operation: "scan",
            });
        }
        if self.debounce_until.is_some_and(|until| now < until) {
            return Ok(Vec::new());
        }
        self.debounce_until = None;
        self.stats.scans += 1;

        if uid.is_empty() || uid.len() > MAX_UID_LEN {
            return Ok(self.fail(now));
        }

        let sequence = self.next_sequence();
        let timestamp = self.boot_seconds(now);
        let frame = Frame::scan(DeviceKind::RfidGate, sequence, timestamp, uid)?;
        self.state = GateState::Sending;
        self.attempts = 1;
        self.in_flight = Some(frame.clone());
        Ok(vec![GateAction::SendFrame(frame)])
    }

    /// Reports that the radio accepted the in-flight frame. The session
    /// moves to polling for the verdict.
    ///
    /// # Errors
    ///
    /// Returns [`SessionError::InvalidState`] unless a send was in
    /// progress.
    pub fn send_succeeded(&mut self, now: Instant) -> Result<(), SessionError> {
        if self.state != GateState::Sending {
            return Err(SessionError::InvalidState {
                state: self.state.name(),
                operation: "send_succeeded",
            });
        }
        self.state = GateState::AwaitingResponse;
        self.retry_at = None;
        self.response_deadline = Some(now + self.config.response_timeout);
        Ok(())
    }

    /// Reports that the radio refused the in-flight frame.
    ///
    /// Schedules a retry with exponential backoff, or resolves the
    /// session as failed once the attempt budget is spent. The returned
    /// actions are the failure path only; a scheduled retry surfaces
    /// later through [`tick`](Self::tick).
    ///
    /// # Errors
    ///
    /// Returns [`SessionError::InvalidState`] unless a send was in
    /// progress.
    pub fn send_failed(&mut self, now: Instant) -> Result<Vec<GateAction>, SessionError> {
        if self.state != GateState::Sending {
            return Err(SessionError::InvalidState {
                state: self.state.name(),
                operation: "send_failed",
            });
        }
        self.stats.send_errors += 1;
        if self.attempts >= self.config.send_attempts {
            return Ok(self.fail(now));
        }
        // Base delay before the first retry, doubling for each after it.
        let delay = self.config.backoff_base * 2u32.saturating_pow(self.attempts - 1);
        self.retry_at = Some(now + delay);
        Ok(Vec::new())
    }

    /// Feeds received radio bytes to the session.
    ///
    /// Outside `AwaitingResponse` the bytes are ignored: late verdicts
    /// and noise are expected on this channel. Structurally invalid
    /// responses and unrecognized tokens are discarded and polling
    /// continues; they neither resolve the session nor extend the
    /// response deadline.
    pub fn handle_response(&mut self, bytes: &[u8], now: Instant) -> Vec<GateAction> {
        if self.state != GateState::AwaitingResponse {
            return Vec::new();
        }
        let Ok(Some(response)) = ResponseFrame::decode(bytes) else {
            return Vec::new();
        };
        match response.verdict() {
            Some(Verdict::Grant) => {
                self.stats.grants += 1;
                self.state = GateState::Open;
                self.response_deadline = None;
                self.close_at = Some(now + self.config.hold_open);
                let mut actions = vec![GateAction::Open];
                if let Some(frame) = self.status_frame(now, STATUS_OPEN) {
                    actions.push(GateAction::SendFrame(frame));
                }
                actions
            }
            Some(Verdict::Deny) => {
                self.stats.denials += 1;
                self.finish(now);
                vec![GateAction::Indicate(Indication::Denied)]
            }
            None => Vec::new(),
        }
    }

    /// Advances deadline-driven work: due retries, the response timeout,
    /// and the end of the hold-open period.
    ///
    /// Call this every control-loop iteration. It never blocks; all
    /// waiting is a comparison against `now`.
    pub fn tick(&mut self, now: Instant) -> Vec<GateAction> {
        match self.state {
            GateState::Sending => {
                if self.retry_at.is_some_and(|at| now >= at) {
                    self.retry_at = None;
                    self.attempts += 1;
                    if let Some(frame) = self.in_flight.clone() {
                        return vec![GateAction::SendFrame(frame)];
                    }
                }
                Vec::new()
            }
            GateState::AwaitingResponse => {
                if self.response_deadline.is_some_and(|deadline| now >= deadline) {
                    self.stats.timeouts += 1;
                    return self.fail(now);
                }
                Vec::new()
            }
            GateState::Open => {
                if self.close_at.is_some_and(|at| now >= at) {
                    self.finish(now);
                    let mut actions = vec![GateAction::Close];
                    if let Some(frame) = self.status_frame(now, STATUS_CLOSED) {
                        actions.push(GateAction::SendFrame(frame));
                    }
                    return actions;
                }
                Vec::new()
            }
            GateState::Idle => Vec::new(),
        }
    }
}
