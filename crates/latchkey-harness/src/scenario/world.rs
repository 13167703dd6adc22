//! World state for scenario execution.
//!
//! One gate on a simulated radio, one keypad door wired straight into
//! the hub's message handling, and the hub between them. The world
//! executes every action the state machines return, so a test reads
//! like the deployment: scan a card, advance time, look at what the
//! actuators and the audit trail did.

use std::time::Duration;

use latchkey_core::{
    ChannelMessage, DoorAction, DoorConfig, DoorIndication, DoorSession, Environment, GateAction,
    GateConfig, GateSession, GateState, Indication, LockState, RadioLink, SessionError,
};
use latchkey_crypto::hash_passcode;
use latchkey_hub::channel::{command_channel, request_channel, status_channel};
use latchkey_hub::{AuditRecord, Hub, HubAction, HubConfig, HubStats, Registry};
use latchkey_proto::{CommandMessage, RequestEnvelope};

use crate::sim_env::SimEnv;
use crate::sim_radio::SimRadio;

/// Card UID provisioned in every world.
pub const CARD_UID: [u8; 4] = [0x04, 0xA3, 0x7F, 0x12];
/// Keypad device id provisioned in every world.
pub const CLIENT_ID: &str = "passkey_01";
/// Salt for the provisioned keypad credential.
pub const SALT: &str = "passkey_01_salt";
/// Passcode registered for [`CLIENT_ID`].
pub const PASSCODE: &str = "4821";
/// Pre-shared request signing key.
pub const KEY: &[u8] = b"0123456789abcdef0123456789abcdef";

/// Something the gate's actuator or indicator did.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum GateEvent {
    /// The actuator opened.
    Opened,
    /// The actuator closed after the hold.
    Closed,
    /// The deny indication fired.
    Denied,
    /// The failure indication fired.
    Failed,
}

/// Something the door's strike or keypad indicator did.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DoorEvent {
    /// The strike released.
    Unlocked,
    /// The strike engaged.
    Locked,
    /// A keypad indication fired.
    Indicated(DoorIndication),
}

/// The simulated deployment under test.
#[derive(Debug)]
pub struct World {
    env: SimEnv,
    gate: GateSession,
    gate_radio: SimRadio,
    hub_radio: SimRadio,
    hub: Hub,
    door: DoorSession,
    hub_silenced: bool,
    gate_events: Vec<GateEvent>,
    gate_status: Vec<String>,
    status_send_failures: u64,
    door_events: Vec<DoorEvent>,
    audit: Vec<AuditRecord>,
    published: Vec<(String, String)>,
}

impl World {
    /// Creates a world with the standard provisioning and the given RNG
    /// seed.
    #[must_use]
    pub fn new(seed: u64) -> Self {
        let env = SimEnv::with_seed(seed);
        let (gate_radio, hub_radio) = SimRadio::pair();

        let mut registry = Registry::new();
        registry.register_client(CLIENT_ID, hash_passcode(SALT, PASSCODE));
        registry.register_card(&CARD_UID, "resident 3");

        let gate = GateSession::new(env.now(), GateConfig::default(), &env);
        let door = DoorSession::new(env.now(), DoorConfig::new(CLIENT_ID, SALT, KEY.to_vec()));
        let hub = Hub::new(HubConfig::default(), KEY.to_vec(), registry);

        Self {
            env,
            gate,
            gate_radio,
            hub_radio,
            hub,
            door,
            hub_silenced: false,
            gate_events: Vec::new(),
            gate_status: Vec::new(),
            status_send_failures: 0,
            door_events: Vec::new(),
            audit: Vec::new(),
            published: Vec::new(),
        }
    }

    /// Presents a card at the gate reader.
    ///
    /// # Errors
    ///
    /// Propagates [`SessionError`] from the gate session, e.g. a scan
    /// while a session is already in flight.
    pub fn scan(&mut self, uid: &[u8]) -> Result<(), SessionError> {
        let actions = self.gate.scan(uid, self.env.now())?;
        self.run_gate_actions(actions)?;
        self.pump()
    }

    /// Enters a passcode on the door keypad.
    ///
    /// # Errors
    ///
    /// Propagates [`SessionError`] from request construction.
    pub fn submit_passcode(&mut self, passcode: &str) -> Result<(), SessionError> {
        let actions = self.door.submit_passcode(passcode, &self.env)?;
        self.run_door_actions(actions)
    }

    /// Delivers a raw request envelope to the hub, as a replaying
    /// attacker on the bus would.
    ///
    /// # Errors
    ///
    /// Returns [`SessionError::Encode`] when the envelope does not
    /// serialize.
    pub fn submit_raw_request(&mut self, envelope: &RequestEnvelope) -> Result<(), SessionError> {
        let payload = envelope
            .to_json()
            .map_err(|e| SessionError::Encode { reason: e.to_string() })?;
        let message = ChannelMessage::new(request_channel(CLIENT_ID), payload);
        let actions =
            self.hub.handle_channel_message(&message, self.env.now(), self.env.unix_time());
        self.run_hub_actions(actions)
    }

    /// Issues an operator remote unlock for the door.
    ///
    /// # Errors
    ///
    /// Propagates [`SessionError`] from the door's response handling.
    pub fn remote_unlock(
        &mut self,
        command_id: &str,
        duration_ms: Option<u64>,
    ) -> Result<(), SessionError> {
        let actions = self.hub.issue_remote_unlock(
            CLIENT_ID,
            command_id,
            "admin",
            None,
            duration_ms,
            self.env.now(),
        );
        self.run_hub_actions(actions)
    }

    /// Issues an operator remote lock for the door.
    ///
    /// # Errors
    ///
    /// Propagates [`SessionError`] from the door's response handling.
    pub fn remote_lock(&mut self, command_id: &str) -> Result<(), SessionError> {
        let actions = self.hub.issue_remote_lock(CLIENT_ID, command_id, "admin", self.env.now());
        self.run_hub_actions(actions)
    }

    /// Delivers a command straight to the door, as the management plane
    /// would for runtime configuration.
    ///
    /// # Errors
    ///
    /// Propagates [`SessionError`] from the door's response handling.
    pub fn update_door_config(&mut self, command: &CommandMessage) -> Result<(), SessionError> {
        let actions = self.door.handle_command(command, &self.env);
        self.run_door_actions(actions)
    }

    /// Advances simulated time in 100ms control-loop steps, ticking both
    /// devices and moving radio traffic each step.
    ///
    /// # Errors
    ///
    /// Propagates [`SessionError`] from the state machines.
    pub fn advance(&mut self, total: Duration) -> Result<(), SessionError> {
        let step = Duration::from_millis(100);
        let mut remaining = total;
        while remaining > Duration::ZERO {
            let slice = remaining.min(step);
            self.env.advance(slice);
            remaining -= slice;

            let gate_actions = self.gate.tick(self.env.now());
            self.run_gate_actions(gate_actions)?;
            let door_actions = self.door.tick(&self.env);
            self.run_door_actions(door_actions)?;
            let hub_actions = self.hub.prune(self.env.now(), self.env.unix_time());
            self.run_hub_actions(hub_actions)?;
            self.pump()?;
        }
        Ok(())
    }

    /// Makes the next gate transmissions fail at the radio.
    pub fn fail_gate_sends(&mut self, count: u32) {
        self.gate_radio.fail_next_sends(count);
    }

    /// Injects raw bytes into the hub's radio receive path.
    pub fn noise_at_hub(&mut self, bytes: &[u8]) {
        self.hub_radio.inject(bytes);
    }

    /// Suppresses or restores the hub's radio responses, simulating a
    /// hub that hears the gate but cannot reach it.
    pub fn silence_hub(&mut self, silenced: bool) {
        self.hub_silenced = silenced;
    }

    /// The shared simulated environment.
    #[must_use]
    pub fn env(&self) -> &SimEnv {
        &self.env
    }

    /// The gate session under test.
    #[must_use]
    pub fn gate(&self) -> &GateSession {
        &self.gate
    }

    /// Current gate state.
    #[must_use]
    pub fn gate_state(&self) -> GateState {
        self.gate.state()
    }

    /// The door session under test.
    #[must_use]
    pub fn door(&self) -> &DoorSession {
        &self.door
    }

    /// Current door strike state.
    #[must_use]
    pub fn door_lock_state(&self) -> LockState {
        self.door.lock_state()
    }

    /// The hub under test, for provisioning updates.
    #[must_use]
    pub fn hub(&self) -> &Hub {
        &self.hub
    }

    /// Hub counters.
    #[must_use]
    pub fn hub_stats(&self) -> HubStats {
        self.hub.stats()
    }

    /// Gate actuator and indicator events, in order.
    #[must_use]
    pub fn gate_events(&self) -> &[GateEvent] {
        &self.gate_events
    }

    /// Status tokens the gate transmitted, in order.
    #[must_use]
    pub fn gate_status(&self) -> &[String] {
        &self.gate_status
    }

    /// Status frames lost to radio send failures.
    #[must_use]
    pub fn status_send_failures(&self) -> u64 {
        self.status_send_failures
    }

    /// Door strike and indicator events, in order.
    #[must_use]
    pub fn door_events(&self) -> &[DoorEvent] {
        &self.door_events
    }

    /// Audit records the hub produced, in order.
    #[must_use]
    pub fn audit(&self) -> &[AuditRecord] {
        &self.audit
    }

    /// Every payload the hub published, with its channel.
    #[must_use]
    pub fn published(&self) -> &[(String, String)] {
        &self.published
    }

    fn run_gate_actions(&mut self, actions: Vec<GateAction>) -> Result<(), SessionError> {
        for action in actions {
            match action {
                GateAction::SendFrame(frame) => {
                    if let Some(token) = frame.status_token() {
                        self.gate_status.push(token.to_owned());
                    }
                    let bytes = frame.encode();
                    if self.gate.state() == GateState::Sending {
                        match self.gate_radio.send(&bytes) {
                            Ok(()) => self.gate.send_succeeded(self.env.now())?,
                            Err(_) => {
                                let follow = self.gate.send_failed(self.env.now())?;
                                self.run_gate_actions(follow)?;
                            }
                        }
                    } else if self.gate_radio.send(&bytes).is_err() {
                        // Status frames are fire and forget; a lost one
                        // is only counted.
                        self.status_send_failures += 1;
                    }
                }
                GateAction::Open => self.gate_events.push(GateEvent::Opened),
                GateAction::Close => self.gate_events.push(GateEvent::Closed),
                GateAction::Indicate(Indication::Denied) => {
                    self.gate_events.push(GateEvent::Denied);
                }
                GateAction::Indicate(Indication::Failed) => {
                    self.gate_events.push(GateEvent::Failed);
                }
            }
        }
        Ok(())
    }

    fn run_door_actions(&mut self, actions: Vec<DoorAction>) -> Result<(), SessionError> {
        for action in actions {
            match action {
                DoorAction::PublishRequest(envelope) => {
                    let payload = envelope
                        .to_json()
                        .map_err(|e| SessionError::Encode { reason: e.to_string() })?;
                    let message = ChannelMessage::new(request_channel(CLIENT_ID), payload);
                    let hub_actions = self.hub.handle_channel_message(
                        &message,
                        self.env.now(),
                        self.env.unix_time(),
                    );
                    self.run_hub_actions(hub_actions)?;
                }
                DoorAction::PublishStatus(status) => {
                    let payload = status
                        .to_json()
                        .map_err(|e| SessionError::Encode { reason: e.to_string() })?;
                    self.forward_device_report(payload)?;
                }
                DoorAction::PublishAck(ack) => {
                    let payload = ack
                        .to_json()
                        .map_err(|e| SessionError::Encode { reason: e.to_string() })?;
                    self.forward_device_report(payload)?;
                }
                DoorAction::Unlock => self.door_events.push(DoorEvent::Unlocked),
                DoorAction::Lock => self.door_events.push(DoorEvent::Locked),
                DoorAction::Indicate(indication) => {
                    self.door_events.push(DoorEvent::Indicated(indication));
                }
            }
        }
        Ok(())
    }

    fn forward_device_report(&mut self, payload: String) -> Result<(), SessionError> {
        let message = ChannelMessage::new(status_channel(CLIENT_ID), payload);
        let actions =
            self.hub.handle_channel_message(&message, self.env.now(), self.env.unix_time());
        self.run_hub_actions(actions)
    }

    fn run_hub_actions(&mut self, actions: Vec<HubAction>) -> Result<(), SessionError> {
        for action in actions {
            match action {
                HubAction::SendResponse(response) => {
                    if !self.hub_silenced {
                        let _ = self.hub_radio.send(&response.encode());
                    }
                }
                HubAction::Publish { channel, payload } => {
                    self.published.push((channel.clone(), payload.clone()));
                    if channel == command_channel(CLIENT_ID) {
                        if let Ok(command) = CommandMessage::from_json(&payload) {
                            let door_actions = self.door.handle_command(&command, &self.env);
                            self.run_door_actions(door_actions)?;
                        }
                    }
                }
                HubAction::Record(record) => self.audit.push(record),
            }
        }
        Ok(())
    }

    /// Moves radio traffic both ways until neither side has pending
    /// bytes.
    fn pump(&mut self) -> Result<(), SessionError> {
        loop {
            let mut progress = false;
            while let Some(bytes) = self.hub_radio.poll() {
                progress = true;
                let actions =
                    self.hub.handle_radio_bytes(&bytes, self.env.now(), self.env.unix_time());
                self.run_hub_actions(actions)?;
            }
            while let Some(bytes) = self.gate_radio.poll() {
                progress = true;
                let actions = self.gate.handle_response(&bytes, self.env.now());
                self.run_gate_actions(actions)?;
            }
            if !progress {
                return Ok(());
            }
        }
    }
}
