//! Keypad door controller state machine.
//!
//! The door never sends a raw passcode. A keypad entry becomes a salted
//! credential digest wrapped in a signed, replay-resistant request
//! envelope; the hub answers with an `OPEN`/`LOCK` verdict on the
//! device's command channel. The same channel carries operator-issued
//! remote unlock/lock commands, which the door acknowledges explicitly
//! so the operator can confirm execution.
//!
//! Like the gate session, this is an action-returning machine: nothing
//! here does I/O, sleeps, or reads a clock. The driver executes the
//! returned actions and calls [`tick`](DoorSession::tick) each loop
//! iteration with the current time.

use std::time::{Duration, Instant};

use latchkey_crypto::{hash_passcode, sign};
use latchkey_proto::{CommandAck, CommandMessage, DeviceStatus, RequestBody, RequestEnvelope};

use crate::env::{random_nonce, Environment};
use crate::error::SessionError;

/// Actuator state reported on the status channel.
pub const STATE_OPENED: &str = "OPENED";
/// Actuator state reported when the door relocks.
pub const STATE_CLOSED: &str = "CLOSED";
/// Status state for a refused request.
pub const STATE_LOCKED: &str = "LOCKED";

/// Actions returned by the door state machine.
#[derive(Debug, Clone, PartialEq)]
pub enum DoorAction {
    /// Publish this signed unlock request on the device's request channel.
    PublishRequest(RequestEnvelope),
    /// Publish this report on the device's status channel.
    PublishStatus(DeviceStatus),
    /// Publish this acknowledgment on the device's status channel.
    PublishAck(CommandAck),
    /// Engage the strike (unlock the door).
    Unlock,
    /// Release the strike (lock the door).
    Lock,
    /// Show a brief local indication; nothing is transmitted for it.
    Indicate(DoorIndication),
}

/// Local indications on the keypad.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DoorIndication {
    /// Passcode is not 4–8 digits; refused without transmitting.
    InvalidPasscode,
    /// The device-side request window is exhausted; refused without
    /// transmitting. Reported distinctly from a credential failure.
    RateLimited,
    /// A request is already in flight; entry ignored.
    Busy,
    /// The hub refused the credential.
    Denied,
    /// No verdict arrived within the reply deadline.
    Timeout,
}

/// Whether the strike is engaged.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LockState {
    /// Strike engaged; the door cannot be opened.
    Locked,
    /// Strike released until the stored deadline.
    Unlocked,
}

/// Tracks an in-flight operator-issued unlock.
///
/// Created when a remote unlock is accepted, deactivated when its
/// duration elapses or an explicit remote lock arrives first; whichever
/// fires second is a no-op. Never persisted beyond device runtime.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RemoteCommandState {
    /// Correlation id from the accepted command.
    pub command_id: String,
    /// Operator who issued the command.
    pub initiated_by: String,
    /// Free-form justification carried for the audit trail.
    pub reason: Option<String>,
    /// Hold duration after clamping.
    pub duration: Duration,
    /// False once the unlock has been cancelled or has expired.
    pub active: bool,
    /// When the unlock took effect.
    pub start_time: Instant,
}

/// Door configuration. Constants mirror the deployed keypad firmware.
#[derive(Debug, Clone)]
pub struct DoorConfig {
    /// Stable device identifier the hub knows this keypad by.
    pub client_id: String,
    /// Per-device salt mixed into the credential digest.
    pub salt: String,
    /// Pre-shared HMAC key, known to this device and the hub only.
    pub key: Vec<u8>,
    /// Minimum accepted passcode length.
    pub passcode_min: usize,
    /// Maximum accepted passcode length.
    pub passcode_max: usize,
    /// Requests allowed per fixed rate window.
    pub rate_limit_max: u32,
    /// Width of the fixed rate window.
    pub rate_limit_window: Duration,
    /// How long to wait for a verdict before resolving as a timeout.
    pub reply_deadline: Duration,
    /// How long a keypad grant holds the door open.
    pub unlock_hold: Duration,
    /// Whether operator-issued remote unlocks are honored at all.
    pub remote_enabled: bool,
    /// Smallest remote-unlock hold the device will accept.
    pub min_unlock: Duration,
    /// Largest remote-unlock hold the device will accept.
    pub max_unlock: Duration,
    /// Hold applied when a remote unlock names no duration.
    pub default_unlock: Duration,
}

impl DoorConfig {
    /// Configuration with the fleet's standard timings for one device.
    #[must_use]
    pub fn new(client_id: impl Into<String>, salt: impl Into<String>, key: Vec<u8>) -> Self {
        Self {
            client_id: client_id.into(),
            salt: salt.into(),
            key,
            passcode_min: 4,
            passcode_max: 8,
            rate_limit_max: 5,
            rate_limit_window: Duration::from_secs(60),
            reply_deadline: Duration::from_secs(10),
            unlock_hold: Duration::from_secs(5),
            remote_enabled: true,
            min_unlock: Duration::from_secs(1),
            max_unlock: Duration::from_secs(30),
            default_unlock: Duration::from_secs(5),
        }
    }
}

/// Counters the door keeps for the operator log.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct DoorStats {
    /// Requests transmitted to the hub.
    pub requests: u64,
    /// Verdicts that granted access.
    pub granted: u64,
    /// Verdicts that refused access.
    pub denied: u64,
    /// Entries refused locally by the rate window.
    pub rate_limited: u64,
    /// Requests that saw no verdict within the deadline.
    pub timeouts: u64,
}

#[derive(Debug, Clone)]
struct PendingRequest {
    nonce: u32,
    deadline: Instant,
}

#[derive(Debug, Clone)]
struct RequestWindow {
    started: Instant,
    count: u32,
}

/// The per-device door controller.
#[derive(Debug, Clone)]
pub struct DoorSession {
    config: DoorConfig,
    lock_state: LockState,
    relock_at: Option<Instant>,
    pending: Option<PendingRequest>,
    window: RequestWindow,
    remote: Option<RemoteCommandState>,
    stats: DoorStats,
}

impl DoorSession {
    /// Creates a locked, idle controller.
    #[must_use]
    pub fn new(now: Instant, config: DoorConfig) -> Self {
        Self {
            config,
            lock_state: LockState::Locked,
            relock_at: None,
            pending: None,
            window: RequestWindow { started: now, count: 0 },
            remote: None,
            stats: DoorStats::default(),
        }
    }

    /// Current strike state.
    #[must_use]
    pub fn lock_state(&self) -> LockState {
        self.lock_state
    }

    /// The active remote-unlock bookkeeping, if any.
    #[must_use]
    pub fn remote_state(&self) -> Option<&RemoteCommandState> {
        self.remote.as_ref()
    }

    /// Session counters.
    #[must_use]
    pub fn stats(&self) -> DoorStats {
        self.stats
    }

    /// Nonce of the request currently awaiting a verdict, if any.
    #[must_use]
    pub fn pending_nonce(&self) -> Option<u32> {
        self.pending.as_ref().map(|p| p.nonce)
    }

    fn passcode_acceptable(&self, passcode: &str) -> bool {
        (self.config.passcode_min..=self.config.passcode_max).contains(&passcode.len())
            && passcode.bytes().all(|b| b.is_ascii_digit())
    }

    /// Fixed window: reset when elapsed, then count against the budget.
    fn window_allows(&mut self, now: Instant) -> bool {
        if now.duration_since(self.window.started) >= self.config.rate_limit_window {
            self.window.started = now;
            self.window.count = 0;
        }
        if self.window.count >= self.config.rate_limit_max {
            return false;
        }
        self.window.count += 1;
        true
    }

    fn status(&self, state: &str, env: &impl Environment) -> DeviceStatus {
        DeviceStatus::new(self.config.client_id.clone(), state, env.unix_time())
    }

    fn ack(
        &self,
        command_id: &str,
        success: bool,
        status: &str,
        env: &impl Environment,
    ) -> CommandAck {
        CommandAck {
            device_id: self.config.client_id.clone(),
            command_id: command_id.to_owned(),
            success,
            status: status.to_owned(),
            timestamp: env.unix_time(),
        }
    }

    fn unlock_for(&mut self, hold: Duration, now: Instant) {
        self.lock_state = LockState::Unlocked;
        self.relock_at = Some(now + hold);
    }

    fn relock(&mut self) {
        self.lock_state = LockState::Locked;
        self.relock_at = None;
        if let Some(remote) = self.remote.as_mut() {
            remote.active = false;
        }
    }

    /// Handles a complete passcode entry.
    ///
    /// Local guards run before anything touches the network: passcode
    /// shape, the single-outstanding rule, and the device-side rate
    /// window each refuse with a distinct indication and transmit
    /// nothing. An accepted entry yields a signed request envelope.
    ///
    /// # Errors
    ///
    /// Returns [`SessionError::Crypto`] or [`SessionError::Encode`] when
    /// the request could not be built; neither occurs with a provisioned
    /// key.
    pub fn submit_passcode(
        &mut self,
        passcode: &str,
        env: &impl Environment,
    ) -> Result<Vec<DoorAction>, SessionError> {
        let now = env.now();
        if self.pending.is_some() {
            return Ok(vec![DoorAction::Indicate(DoorIndication::Busy)]);
        }
        if !self.passcode_acceptable(passcode) {
            return Ok(vec![DoorAction::Indicate(DoorIndication::InvalidPasscode)]);
        }
        if !self.window_allows(now) {
            self.stats.rate_limited += 1;
            return Ok(vec![DoorAction::Indicate(DoorIndication::RateLimited)]);
        }

        let nonce = random_nonce(env);
        let body = RequestBody::unlock_request(
            self.config.client_id.clone(),
            hash_passcode(&self.config.salt, passcode),
            env.unix_time(),
            nonce,
        );
        let body_json = body
            .to_json()
            .map_err(|e| SessionError::Encode { reason: e.to_string() })?;
        let signature = sign(&self.config.key, body_json.as_bytes())?;

        self.pending = Some(PendingRequest {
            nonce,
            deadline: now + self.config.reply_deadline,
        });
        self.stats.requests += 1;
        Ok(vec![DoorAction::PublishRequest(RequestEnvelope::new(
            body_json, signature,
        ))])
    }

    /// Handles a command from the hub: a verdict answering the pending
    /// request, or an operator-issued remote command.
    ///
    /// Verdicts with no pending request are stale and ignored. Remote
    /// commands are always acknowledged, successful or not.
    pub fn handle_command(
        &mut self,
        command: &CommandMessage,
        env: &impl Environment,
    ) -> Vec<DoorAction> {
        let now = env.now();
        match command {
            CommandMessage::Open => {
                if self.pending.take().is_none() {
                    return Vec::new();
                }
                self.stats.granted += 1;
                self.unlock_for(self.config.unlock_hold, now);
                vec![
                    DoorAction::Unlock,
                    DoorAction::PublishStatus(
                        self.status(STATE_OPENED, env).with_method("keypad"),
                    ),
                ]
            }
            CommandMessage::Lock { reason } => {
                if self.pending.take().is_none() {
                    return Vec::new();
                }
                self.stats.denied += 1;
                let mut status = self.status(STATE_LOCKED, env).with_method("keypad");
                if let Some(reason) = reason {
                    status = status.with_reason(reason.clone());
                }
                vec![
                    DoorAction::Indicate(DoorIndication::Denied),
                    DoorAction::PublishStatus(status),
                ]
            }
            CommandMessage::RemoteUnlock {
                command_id,
                initiated_by,
                reason,
                duration_ms,
            } => self.handle_remote_unlock(
                command_id,
                initiated_by,
                reason.clone(),
                *duration_ms,
                now,
                env,
            ),
            CommandMessage::RemoteLock { command_id, .. } => {
                let was_unlocked = self.lock_state == LockState::Unlocked;
                self.relock();
                let mut actions = Vec::new();
                if was_unlocked {
                    actions.push(DoorAction::Lock);
                    actions.push(DoorAction::PublishStatus(
                        self.status(STATE_CLOSED, env).with_method("remote_lock"),
                    ));
                }
                actions.push(DoorAction::PublishAck(self.ack(command_id, true, "locked", env)));
                actions
            }
            CommandMessage::UpdateConfig {
                command_id,
                remote_enabled,
                default_duration_ms,
                max_duration_ms,
            } => {
                if let Some(enabled) = remote_enabled {
                    self.config.remote_enabled = *enabled;
                }
                if let Some(ms) = default_duration_ms {
                    self.config.default_unlock = Duration::from_millis(*ms);
                }
                if let Some(ms) = max_duration_ms {
                    self.config.max_unlock = Duration::from_millis(*ms);
                }
                vec![DoorAction::PublishAck(self.ack(command_id, true, "config_updated", env))]
            }
        }
    }

    fn handle_remote_unlock(
        &mut self,
        command_id: &str,
        initiated_by: &str,
        reason: Option<String>,
        duration_ms: Option<u64>,
        now: Instant,
        env: &impl Environment,
    ) -> Vec<DoorAction> {
        if !self.config.remote_enabled {
            return vec![DoorAction::PublishAck(self.ack(
                command_id,
                false,
                "remote_unlock_disabled",
                env,
            ))];
        }
        let duration = duration_ms.map_or(self.config.default_unlock, |ms| {
            Duration::from_millis(ms).clamp(self.config.min_unlock, self.config.max_unlock)
        });
        self.remote = Some(RemoteCommandState {
            command_id: command_id.to_owned(),
            initiated_by: initiated_by.to_owned(),
            reason,
            duration,
            active: true,
            start_time: now,
        });
        self.unlock_for(duration, now);
        vec![
            DoorAction::Unlock,
            DoorAction::PublishStatus(self.status(STATE_OPENED, env).with_method("remote_unlock")),
            DoorAction::PublishAck(self.ack(command_id, true, "unlocked", env)),
        ]
    }

    /// Advances deadline-driven work: the reply deadline on a pending
    /// request and the automatic relock.
    ///
    /// The relock is idempotent by construction: an explicit remote lock
    /// clears the deadline, so the original timer firing later finds
    /// nothing to do.
    pub fn tick(&mut self, env: &impl Environment) -> Vec<DoorAction> {
        let now = env.now();
        let mut actions = Vec::new();

        if self.pending.as_ref().is_some_and(|p| now >= p.deadline) {
            self.pending = None;
            self.stats.timeouts += 1;
            actions.push(DoorAction::Indicate(DoorIndication::Timeout));
        }

        if self.lock_state == LockState::Unlocked
            && self.relock_at.is_some_and(|at| now >= at)
        {
            self.relock();
            actions.push(DoorAction::Lock);
            actions.push(DoorAction::PublishStatus(
                self.status(STATE_CLOSED, env).with_method("auto_relock"),
            ));
        }

        actions
    }
}
