//! Frame and message routing.
//!
//! [`Hub`] is the coordinator's brain: radio bytes and bus messages go
//! in, actions come out. Like the device sessions it never performs IO
//! itself; the driver feeds it input and executes the returned
//! [`HubAction`]s, so tests can run the whole grant path without a
//! radio or a broker. [`Hub::serve`] is the production driver for the
//! bus side.
//!
//! All mutable state sits behind one `Mutex` whose critical sections
//! never await, so concurrent channel tasks can share one `Hub`.

use std::collections::HashMap;
use std::sync::{Mutex, PoisonError};
use std::time::{Duration, Instant};

use latchkey_core::{ChannelMessage, Environment, MessageChannel};
use latchkey_proto::{
    CommandAck, CommandMessage, Deframer, DeviceKind, Frame, MessageKind, RequestEnvelope,
    ResponseFrame,
};
use tracing::{debug, info, warn};

use crate::audit::{AccessMethod, AuditRecord};
use crate::channel::{command_channel, device_from_request_channel, device_from_status_channel,
    telemetry_channel, UPLINK_CHANNEL};
use crate::config::HubConfig;
use crate::error::AuthError;
use crate::registry::Registry;
use crate::verifier::Verifier;

/// How often [`Hub::serve`] runs maintenance when the bus is quiet.
const MAINTENANCE_INTERVAL: Duration = Duration::from_secs(30);

/// Something the driver must do on the hub's behalf.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum HubAction {
    /// Transmit a verdict response on the radio.
    SendResponse(ResponseFrame),
    /// Publish a JSON payload on a bus channel.
    Publish {
        /// Destination channel.
        channel: String,
        /// Serialized JSON document.
        payload: String,
    },
    /// Append an audit record; [`Hub::serve`] publishes these on the
    /// uplink channel.
    Record(AuditRecord),
}

/// Counters exposed for operator diagnostics.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct HubStats {
    /// Valid frames reassembled from the radio.
    pub frames_received: u64,
    /// Card scans that produced a grant.
    pub scans_granted: u64,
    /// Card scans that produced a deny.
    pub scans_denied: u64,
    /// Keypad requests that passed verification.
    pub requests_granted: u64,
    /// Keypad requests refused by the verifier.
    pub requests_denied: u64,
    /// Remote commands issued by an operator.
    pub commands_issued: u64,
    /// Command acks matched to a pending command.
    pub acks_matched: u64,
    /// Command acks with no pending command, counted and dropped.
    pub acks_unmatched: u64,
    /// Pending commands that aged out without an ack.
    pub acks_timed_out: u64,
    /// Telemetry and motion frames republished on the bus.
    pub telemetry_forwarded: u64,
    /// Device status reports consumed from radio or bus.
    pub status_reports: u64,
}

/// A remote command awaiting its device ack.
#[derive(Debug)]
struct PendingCommand {
    device_id: String,
    method: AccessMethod,
    initiated_by: String,
    issued: Instant,
}

#[derive(Debug)]
struct HubState {
    verifier: Verifier,
    deframer: Deframer,
    pending: HashMap<String, PendingCommand>,
    stats: HubStats,
}

/// The hub coordinator.
#[derive(Debug)]
pub struct Hub {
    config: HubConfig,
    state: Mutex<HubState>,
}

impl Hub {
    /// Creates a hub around the pre-shared request key and the
    /// provisioned registry.
    #[must_use]
    pub fn new(config: HubConfig, key: Vec<u8>, registry: Registry) -> Self {
        let verifier = Verifier::new(key, registry, &config);
        Self {
            config,
            state: Mutex::new(HubState {
                verifier,
                deframer: Deframer::new(),
                pending: HashMap::new(),
                stats: HubStats::default(),
            }),
        }
    }

    fn lock(&self) -> std::sync::MutexGuard<'_, HubState> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Feeds raw radio bytes through the deframer and decides a verdict
    /// for every frame that survives.
    ///
    /// Garbage and corrupt candidates are counted by the deframer and
    /// produce no action.
    pub fn handle_radio_bytes(&self, bytes: &[u8], now: Instant, unix_now: u64) -> Vec<HubAction> {
        let mut actions = Vec::new();
        let mut state = self.lock();
        state.deframer.push(bytes);
        while let Some(frame) = state.deframer.next_frame() {
            state.stats.frames_received += 1;
            self.dispatch_frame(&mut state, &frame, now, unix_now, &mut actions);
        }
        actions
    }

    fn dispatch_frame(
        &self,
        state: &mut HubState,
        frame: &Frame,
        now: Instant,
        unix_now: u64,
        actions: &mut Vec<HubAction>,
    ) {
        let device = frame.header().device().map_or("unknown", DeviceKind::name);
        match frame.header().kind() {
            Some(MessageKind::Scan) => {
                let uid = frame.uid().unwrap_or_default();
                let uid_hex = hex::encode(uid);
                match state.verifier.verify_scan(device, uid, now) {
                    Ok(label) => {
                        info!(device, uid = %uid_hex, label = %label, "card scan granted");
                        state.stats.scans_granted += 1;
                        actions.push(HubAction::SendResponse(ResponseFrame::grant(
                            self.config.gate_address,
                        )));
                        actions.push(HubAction::Record(AuditRecord::granted(
                            device,
                            AccessMethod::Rfid,
                            Some(uid_hex),
                            unix_now,
                        )));
                    }
                    Err(error) => {
                        warn!(device, uid = %uid_hex, reason = error.reason_code(), "card scan denied");
                        state.stats.scans_denied += 1;
                        actions.push(HubAction::SendResponse(ResponseFrame::deny(
                            self.config.gate_address,
                        )));
                        actions.push(HubAction::Record(AuditRecord::denied(
                            device,
                            AccessMethod::Rfid,
                            Some(uid_hex),
                            error.reason_code(),
                            unix_now,
                        )));
                    }
                }
            }
            Some(MessageKind::GateStatus | MessageKind::DoorStatus) => {
                state.stats.status_reports += 1;
                if let Some(token) = frame.status_token() {
                    debug!(device, token, "actuator status over radio");
                } else {
                    debug!(device, "status frame with a non-ASCII token, dropped");
                }
            }
            Some(kind @ (MessageKind::Telemetry | MessageKind::Motion | MessageKind::SystemStatus)) => {
                state.stats.telemetry_forwarded += 1;
                let document = serde_json::json!({
                    "device_id": device,
                    "kind": kind.name(),
                    "payload": hex::encode(frame.payload()),
                    "sequence": frame.header().sequence(),
                    "timestamp": unix_now,
                });
                actions.push(HubAction::Publish {
                    channel: telemetry_channel(device),
                    payload: document.to_string(),
                });
            }
            Some(kind) => {
                debug!(device, kind = kind.name(), "frame kind not handled by the hub");
            }
            None => {
                debug!(device, nibble = frame.header().kind_raw(), "unassigned frame kind, dropped");
            }
        }
    }

    /// Routes one bus message: a signed unlock request or a device's
    /// ack/status report. Messages on foreign channels are ignored.
    pub fn handle_channel_message(
        &self,
        message: &ChannelMessage,
        now: Instant,
        unix_now: u64,
    ) -> Vec<HubAction> {
        if let Some(device) = device_from_request_channel(&message.channel) {
            return self.handle_unlock_request(&device, &message.payload, now, unix_now);
        }
        if let Some(device) = device_from_status_channel(&message.channel) {
            return self.handle_device_report(&device, &message.payload, unix_now);
        }
        debug!(channel = %message.channel, "message on a foreign channel, ignored");
        Vec::new()
    }

    fn handle_unlock_request(
        &self,
        device: &str,
        payload: &[u8],
        now: Instant,
        unix_now: u64,
    ) -> Vec<HubAction> {
        let envelope = std::str::from_utf8(payload)
            .ok()
            .and_then(|text| RequestEnvelope::from_json(text).ok());
        let outcome = match envelope {
            Some(envelope) => {
                let mut state = self.lock();
                state.verifier.verify_unlock(&envelope, now, unix_now)
            }
            None => Err(AuthError::MalformedRequest),
        };

        let mut actions = Vec::with_capacity(2);
        match outcome {
            Ok(verified) => {
                info!(device, client_id = %verified.client_id, "unlock request granted");
                self.lock().stats.requests_granted += 1;
                actions.push(self.publish_command(device, &CommandMessage::Open));
                actions.push(HubAction::Record(AuditRecord::granted(
                    device,
                    AccessMethod::Keypad,
                    Some(verified.client_id),
                    unix_now,
                )));
            }
            Err(error) => {
                warn!(device, reason = error.reason_code(), "unlock request denied");
                self.lock().stats.requests_denied += 1;
                actions.push(self.publish_command(
                    device,
                    &CommandMessage::Lock {
                        reason: Some(error.reason_code().to_owned()),
                    },
                ));
                actions.push(HubAction::Record(AuditRecord::denied(
                    device,
                    AccessMethod::Keypad,
                    Some(device.to_owned()),
                    error.reason_code(),
                    unix_now,
                )));
            }
        }
        actions
    }

    fn handle_device_report(&self, device: &str, payload: &[u8], unix_now: u64) -> Vec<HubAction> {
        let Ok(text) = std::str::from_utf8(payload) else {
            debug!(device, "non-UTF-8 status payload, dropped");
            return Vec::new();
        };

        if let Ok(ack) = CommandAck::from_json(text) {
            let mut state = self.lock();
            let Some(pending) = state.pending.remove(&ack.command_id) else {
                warn!(device, command_id = %ack.command_id, "ack for an unknown command");
                state.stats.acks_unmatched += 1;
                return Vec::new();
            };
            state.stats.acks_matched += 1;
            info!(
                device,
                command_id = %ack.command_id,
                success = ack.success,
                status = %ack.status,
                "remote command acknowledged",
            );
            let record = if ack.success {
                AuditRecord::granted(
                    pending.device_id,
                    pending.method,
                    Some(pending.initiated_by),
                    unix_now,
                )
            } else {
                AuditRecord::denied(
                    pending.device_id,
                    pending.method,
                    Some(pending.initiated_by),
                    ack.status,
                    unix_now,
                )
            };
            return vec![HubAction::Record(record)];
        }

        if let Ok(status) = latchkey_proto::DeviceStatus::from_json(text) {
            debug!(device, state = %status.state, method = ?status.method, "device status report");
            self.lock().stats.status_reports += 1;
            return Vec::new();
        }

        debug!(device, "unparseable status payload, dropped");
        Vec::new()
    }

    /// Issues an operator-initiated timed unlock to a device.
    pub fn issue_remote_unlock(
        &self,
        device_id: &str,
        command_id: &str,
        initiated_by: &str,
        reason: Option<String>,
        duration_ms: Option<u64>,
        now: Instant,
    ) -> Vec<HubAction> {
        let command = CommandMessage::RemoteUnlock {
            command_id: command_id.to_owned(),
            initiated_by: initiated_by.to_owned(),
            reason,
            duration_ms,
        };
        self.issue_command(device_id, command_id, initiated_by, AccessMethod::RemoteUnlock, &command, now)
    }

    /// Issues an operator-initiated relock to a device.
    pub fn issue_remote_lock(
        &self,
        device_id: &str,
        command_id: &str,
        initiated_by: &str,
        now: Instant,
    ) -> Vec<HubAction> {
        let command = CommandMessage::RemoteLock {
            command_id: command_id.to_owned(),
            initiated_by: initiated_by.to_owned(),
        };
        self.issue_command(device_id, command_id, initiated_by, AccessMethod::RemoteLock, &command, now)
    }

    fn issue_command(
        &self,
        device_id: &str,
        command_id: &str,
        initiated_by: &str,
        method: AccessMethod,
        command: &CommandMessage,
        now: Instant,
    ) -> Vec<HubAction> {
        info!(device_id, command_id, initiated_by, ?method, "remote command issued");
        let mut state = self.lock();
        state.stats.commands_issued += 1;
        state.pending.insert(
            command_id.to_owned(),
            PendingCommand {
                device_id: device_id.to_owned(),
                method,
                initiated_by: initiated_by.to_owned(),
                issued: now,
            },
        );
        drop(state);
        vec![self.publish_command(device_id, command)]
    }

    fn publish_command(&self, device_id: &str, command: &CommandMessage) -> HubAction {
        // CommandMessage serialization cannot fail: every field is a
        // string, bool, or integer.
        let payload = command.to_json().unwrap_or_default();
        HubAction::Publish {
            channel: command_channel(device_id),
            payload,
        }
    }

    /// Evicts expired verifier state and reports remote commands whose
    /// ack window passed without an answer.
    pub fn prune(&self, now: Instant, unix_now: u64) -> Vec<HubAction> {
        let ack_window = self.config.ack_window();
        let mut state = self.lock();
        state.verifier.prune(now);

        let expired: Vec<String> = state
            .pending
            .iter()
            .filter(|(_, pending)| now.duration_since(pending.issued) >= ack_window)
            .map(|(id, _)| id.clone())
            .collect();
        let mut actions = Vec::with_capacity(expired.len());
        for command_id in expired {
            if let Some(pending) = state.pending.remove(&command_id) {
                warn!(
                    device_id = %pending.device_id,
                    command_id = %command_id,
                    "remote command never acknowledged",
                );
                state.stats.acks_timed_out += 1;
                actions.push(HubAction::Record(AuditRecord::denied(
                    pending.device_id,
                    pending.method,
                    Some(pending.initiated_by),
                    "ack_timeout",
                    unix_now,
                )));
            }
        }
        actions
    }

    /// Snapshot of the diagnostic counters.
    #[must_use]
    pub fn stats(&self) -> HubStats {
        self.lock().stats
    }

    /// Frames the deframer rejected for a CRC mismatch.
    #[must_use]
    pub fn crc_errors(&self) -> u64 {
        self.lock().deframer.crc_errors()
    }

    /// Applies a provisioning update to the registry.
    pub fn with_registry(&self, update: impl FnOnce(&mut Registry)) {
        update(self.lock().verifier.registry_mut());
    }

    /// Drives the bus side of the hub until the channel closes.
    ///
    /// Inbound messages are routed through [`Self::handle_channel_message`];
    /// `Publish` actions go back out on the channel and `Record` actions
    /// are published on the uplink channel. Maintenance runs between
    /// messages. Radio IO is the radio driver's job, via
    /// [`Self::handle_radio_bytes`].
    pub async fn serve<C, E>(&self, channel: &mut C, env: &E)
    where
        C: MessageChannel,
        E: Environment,
    {
        loop {
            tokio::select! {
                message = channel.next_message() => {
                    let Some(message) = message else {
                        info!("message channel closed, hub loop exiting");
                        return;
                    };
                    let actions =
                        self.handle_channel_message(&message, env.now(), env.unix_time());
                    self.execute(channel, actions).await;
                }
                () = env.sleep(MAINTENANCE_INTERVAL) => {
                    let actions = self.prune(env.now(), env.unix_time());
                    self.execute(channel, actions).await;
                }
            }
        }
    }

    async fn execute<C: MessageChannel>(&self, channel: &C, actions: Vec<HubAction>) {
        for action in actions {
            let (target, payload) = match action {
                HubAction::Publish { channel, payload } => (channel, payload),
                HubAction::Record(record) => match record.to_json() {
                    Ok(json) => (UPLINK_CHANNEL.to_owned(), json),
                    Err(error) => {
                        warn!(%error, "audit record failed to serialize, dropped");
                        continue;
                    }
                },
                HubAction::SendResponse(_) => continue,
            };
            if let Err(error) = channel.publish(&target, payload.into()).await {
                warn!(channel = %target, %error, "bus publish failed, message dropped");
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use std::time::{Duration, Instant};

    use latchkey_core::ChannelMessage;
    use latchkey_crypto::{hash_passcode, sign};
    use latchkey_proto::{
        CommandAck, DeviceKind, Frame, RequestBody, RequestEnvelope, ResponseFrame,
    };

    use super::{Hub, HubAction};
    use crate::audit::AccessMethod;
    use crate::channel::{command_channel, request_channel, status_channel};
    use crate::config::HubConfig;
    use crate::registry::Registry;

    const KEY: &[u8] = b"0123456789abcdef0123456789abcdef";
    const UNIX_NOW: u64 = 1_700_000_000;
    const CARD: [u8; 4] = [0x04, 0xA3, 0x7F, 0x12];

    fn hub() -> Hub {
        let mut registry = Registry::new();
        registry.register_client("passkey_01", hash_passcode("passkey_01_salt", "4821"));
        registry.register_card(&CARD, "resident 3");
        Hub::new(HubConfig::default(), KEY.to_vec(), registry)
    }

    fn scan_bytes(sequence: u16, uid: &[u8]) -> Vec<u8> {
        Frame::scan(DeviceKind::RfidGate, sequence, 3600, uid)
            .unwrap()
            .encode()
            .to_vec()
    }

    fn request_message(passcode: &str, issued_at: u64, nonce: u32) -> ChannelMessage {
        let body = RequestBody::unlock_request(
            "passkey_01",
            hash_passcode("passkey_01_salt", passcode),
            issued_at,
            nonce,
        )
        .to_json()
        .unwrap();
        let hmac = sign(KEY, body.as_bytes()).unwrap();
        let envelope = RequestEnvelope::new(body, hmac).to_json().unwrap();
        ChannelMessage::new(request_channel("passkey_01"), envelope)
    }

    #[test]
    fn registered_card_scan_grants() {
        let hub = hub();
        let t0 = Instant::now();
        let actions = hub.handle_radio_bytes(&scan_bytes(1, &CARD), t0, UNIX_NOW);

        assert_eq!(actions.len(), 2);
        assert_eq!(
            actions[0],
            HubAction::SendResponse(ResponseFrame::grant(0x0001)),
        );
        let HubAction::Record(record) = &actions[1] else {
            panic!("expected an audit record, got {:?}", actions[1]);
        };
        assert!(record.granted);
        assert_eq!(record.method, AccessMethod::Rfid);
        assert_eq!(record.credential.as_deref(), Some("04a37f12"));

        let stats = hub.stats();
        assert_eq!(stats.frames_received, 1);
        assert_eq!(stats.scans_granted, 1);
    }

    #[test]
    fn unknown_card_scan_denies() {
        let hub = hub();
        let actions = hub.handle_radio_bytes(&scan_bytes(1, &[0xFF; 4]), Instant::now(), UNIX_NOW);

        assert_eq!(
            actions[0],
            HubAction::SendResponse(ResponseFrame::deny(0x0001)),
        );
        let HubAction::Record(record) = &actions[1] else {
            panic!("expected an audit record");
        };
        assert!(!record.granted);
        assert_eq!(record.reason.as_deref(), Some("credential_mismatch"));
        assert_eq!(hub.stats().scans_denied, 1);
    }

    #[test]
    fn garbage_and_split_frames_are_reassembled() {
        let hub = hub();
        let t0 = Instant::now();
        let bytes = scan_bytes(2, &CARD);

        // Leading noise, then the frame split across two pushes.
        let mid = bytes.len() / 2;
        let mut first = vec![0x55, 0xAA, 0x13];
        first.extend_from_slice(&bytes[..mid]);
        assert!(hub.handle_radio_bytes(&first, t0, UNIX_NOW).is_empty());
        let actions = hub.handle_radio_bytes(&bytes[mid..], t0, UNIX_NOW);
        assert_eq!(actions.len(), 2);
        assert_eq!(hub.stats().frames_received, 1);
    }

    #[test]
    fn corrupted_frame_counts_a_crc_error() {
        let hub = hub();
        let mut bytes = scan_bytes(3, &CARD);
        let last = bytes.len() - 1;
        bytes[last] ^= 0xFF;
        assert!(hub.handle_radio_bytes(&bytes, Instant::now(), UNIX_NOW).is_empty());
        assert_eq!(hub.crc_errors(), 1);
        assert_eq!(hub.stats().frames_received, 0);
    }

    #[test]
    fn telemetry_frames_are_republished() {
        let hub = hub();
        let frame = Frame::new(
            latchkey_proto::FrameHeader::new(
                latchkey_proto::MessageKind::Telemetry,
                DeviceKind::TempSensor,
                9,
                120,
            ),
            &[0x01, 0x72][..],
        )
        .unwrap();
        let actions = hub.handle_radio_bytes(&frame.encode(), Instant::now(), UNIX_NOW);

        let [HubAction::Publish { channel, payload }] = actions.as_slice() else {
            panic!("expected one publish, got {actions:?}");
        };
        assert_eq!(channel, "home/devices/temp_sensor/telemetry");
        assert!(payload.contains(r#""payload":"0172""#));
        assert_eq!(hub.stats().telemetry_forwarded, 1);
    }

    #[test]
    fn valid_unlock_request_publishes_open() {
        let hub = hub();
        let actions =
            hub.handle_channel_message(&request_message("4821", UNIX_NOW, 1), Instant::now(), UNIX_NOW);

        assert_eq!(actions.len(), 2);
        assert_eq!(
            actions[0],
            HubAction::Publish {
                channel: command_channel("passkey_01"),
                payload: r#"{"cmd":"OPEN"}"#.to_owned(),
            },
        );
        let HubAction::Record(record) = &actions[1] else {
            panic!("expected an audit record");
        };
        assert!(record.granted);
        assert_eq!(record.method, AccessMethod::Keypad);
        assert_eq!(hub.stats().requests_granted, 1);
    }

    #[test]
    fn bad_passcode_publishes_lock_with_the_reason() {
        let hub = hub();
        let actions =
            hub.handle_channel_message(&request_message("9999", UNIX_NOW, 1), Instant::now(), UNIX_NOW);

        assert_eq!(
            actions[0],
            HubAction::Publish {
                channel: command_channel("passkey_01"),
                payload: r#"{"cmd":"LOCK","reason":"credential_mismatch"}"#.to_owned(),
            },
        );
        assert_eq!(hub.stats().requests_denied, 1);
    }

    #[test]
    fn replayed_request_is_denied_the_second_time() {
        let hub = hub();
        let t0 = Instant::now();
        let message = request_message("4821", UNIX_NOW, 7);

        assert_eq!(hub.handle_channel_message(&message, t0, UNIX_NOW).len(), 2);
        let actions = hub.handle_channel_message(&message, t0, UNIX_NOW);
        let HubAction::Record(record) = &actions[1] else {
            panic!("expected an audit record");
        };
        assert_eq!(record.reason.as_deref(), Some("replay_detected"));
    }

    #[test]
    fn unparseable_request_payload_is_malformed() {
        let hub = hub();
        let message = ChannelMessage::new(request_channel("passkey_01"), &b"{broken"[..]);
        let actions = hub.handle_channel_message(&message, Instant::now(), UNIX_NOW);
        let HubAction::Record(record) = &actions[1] else {
            panic!("expected an audit record");
        };
        assert_eq!(record.reason.as_deref(), Some("malformed_request"));
    }

    #[test]
    fn foreign_channels_are_ignored() {
        let hub = hub();
        let message = ChannelMessage::new("home/hub/audit", &b"{}"[..]);
        assert!(hub.handle_channel_message(&message, Instant::now(), UNIX_NOW).is_empty());
    }

    #[test]
    fn remote_unlock_round_trips_through_its_ack() {
        let hub = hub();
        let t0 = Instant::now();
        let actions = hub.issue_remote_unlock(
            "passkey_01",
            "cmd-1",
            "admin",
            Some("delivery".to_owned()),
            Some(10_000),
            t0,
        );
        let [HubAction::Publish { channel, payload }] = actions.as_slice() else {
            panic!("expected one publish, got {actions:?}");
        };
        assert_eq!(channel, &command_channel("passkey_01"));
        assert!(payload.contains(r#""cmd":"remote_unlock""#));
        assert!(payload.contains(r#""duration_ms":10000"#));

        let ack = CommandAck {
            device_id: "passkey_01".to_owned(),
            command_id: "cmd-1".to_owned(),
            success: true,
            status: "unlocked".to_owned(),
            timestamp: UNIX_NOW,
        };
        let message =
            ChannelMessage::new(status_channel("passkey_01"), ack.to_json().unwrap());
        let actions = hub.handle_channel_message(&message, t0, UNIX_NOW);
        let [HubAction::Record(record)] = actions.as_slice() else {
            panic!("expected one audit record, got {actions:?}");
        };
        assert!(record.granted);
        assert_eq!(record.method, AccessMethod::RemoteUnlock);
        assert_eq!(record.credential.as_deref(), Some("admin"));

        let stats = hub.stats();
        assert_eq!(stats.commands_issued, 1);
        assert_eq!(stats.acks_matched, 1);
    }

    #[test]
    fn failed_ack_is_recorded_with_its_status() {
        let hub = hub();
        let t0 = Instant::now();
        hub.issue_remote_unlock("passkey_01", "cmd-2", "admin", None, None, t0);

        let ack = CommandAck {
            device_id: "passkey_01".to_owned(),
            command_id: "cmd-2".to_owned(),
            success: false,
            status: "remote_unlock_disabled".to_owned(),
            timestamp: UNIX_NOW,
        };
        let message =
            ChannelMessage::new(status_channel("passkey_01"), ack.to_json().unwrap());
        let actions = hub.handle_channel_message(&message, t0, UNIX_NOW);
        let [HubAction::Record(record)] = actions.as_slice() else {
            panic!("expected one audit record, got {actions:?}");
        };
        assert!(!record.granted);
        assert_eq!(record.reason.as_deref(), Some("remote_unlock_disabled"));
    }

    #[test]
    fn unmatched_ack_is_counted_and_dropped() {
        let hub = hub();
        let ack = CommandAck {
            device_id: "passkey_01".to_owned(),
            command_id: "never-issued".to_owned(),
            success: true,
            status: "unlocked".to_owned(),
            timestamp: UNIX_NOW,
        };
        let message =
            ChannelMessage::new(status_channel("passkey_01"), ack.to_json().unwrap());
        assert!(hub.handle_channel_message(&message, Instant::now(), UNIX_NOW).is_empty());
        assert_eq!(hub.stats().acks_unmatched, 1);
    }

    #[test]
    fn unacknowledged_command_times_out_at_the_ack_window() {
        let hub = hub();
        let t0 = Instant::now();
        hub.issue_remote_lock("passkey_01", "cmd-3", "admin", t0);

        assert!(hub.prune(t0 + Duration::from_secs(59), UNIX_NOW + 59).is_empty());
        let actions = hub.prune(t0 + Duration::from_secs(60), UNIX_NOW + 60);
        let [HubAction::Record(record)] = actions.as_slice() else {
            panic!("expected one audit record, got {actions:?}");
        };
        assert!(!record.granted);
        assert_eq!(record.method, AccessMethod::RemoteLock);
        assert_eq!(record.reason.as_deref(), Some("ack_timeout"));
        assert_eq!(hub.stats().acks_timed_out, 1);

        // Late acks after the timeout no longer match.
        let ack = CommandAck {
            device_id: "passkey_01".to_owned(),
            command_id: "cmd-3".to_owned(),
            success: true,
            status: "locked".to_owned(),
            timestamp: UNIX_NOW + 61,
        };
        let message =
            ChannelMessage::new(status_channel("passkey_01"), ack.to_json().unwrap());
        hub.handle_channel_message(&message, t0 + Duration::from_secs(61), UNIX_NOW + 61);
        assert_eq!(hub.stats().acks_unmatched, 1);
    }

    #[test]
    fn provisioning_updates_take_effect() {
        let hub = hub();
        let t0 = Instant::now();
        hub.with_registry(|registry| registry.revoke_card(&CARD));
        let actions = hub.handle_radio_bytes(&scan_bytes(4, &CARD), t0, UNIX_NOW);
        assert_eq!(
            actions[0],
            HubAction::SendResponse(ResponseFrame::deny(0x0001)),
        );
    }
}
