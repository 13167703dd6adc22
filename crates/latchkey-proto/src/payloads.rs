//! JSON documents exchanged over the message bus.
//!
//! Unlock requests travel as a signed envelope: the body is kept as the
//! exact string the sender serialized, because the signature covers those
//! bytes and re-serialization would not be canonical. Commands, acks, and
//! status reports are plain documents. Deserialization tolerates missing
//! optional fields and ignores unknown ones, matching what the device
//! firmware accepts.

use serde::{Deserialize, Serialize};

/// The only request command verifiers accept.
pub const UNLOCK_REQUEST_CMD: &str = "unlock_request";

/// Signed wrapper published on a device's request channel.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RequestEnvelope {
    /// Exact JSON text of the [`RequestBody`]; the signature covers these
    /// bytes as sent.
    pub body: String,
    /// Lowercase hex HMAC-SHA256 of `body`.
    pub hmac: String,
}

impl RequestEnvelope {
    /// Pairs a serialized body with its signature.
    #[must_use]
    pub fn new(body: impl Into<String>, hmac: impl Into<String>) -> Self {
        Self {
            body: body.into(),
            hmac: hmac.into(),
        }
    }

    /// Serializes to a JSON string.
    ///
    /// # Errors
    ///
    /// Propagates `serde_json` failures.
    pub fn to_json(&self) -> serde_json::Result<String> {
        serde_json::to_string(self)
    }

    /// Parses an envelope from JSON text.
    ///
    /// # Errors
    ///
    /// Propagates `serde_json` failures.
    pub fn from_json(json: &str) -> serde_json::Result<Self> {
        serde_json::from_str(json)
    }
}

/// Inner unlock request, serialized and then signed by the device.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RequestBody {
    /// Request command, [`UNLOCK_REQUEST_CMD`] for unlock attempts.
    pub cmd: String,
    /// Identity the device claims.
    pub client_id: String,
    /// Lowercase hex credential hash, never the raw passcode.
    pub pw: String,
    /// Unix seconds at which the device issued the request.
    pub ts: u64,
    /// Single-use random value; the verifier accepts each
    /// `(client_id, nonce)` pair at most once.
    pub nonce: u32,
}

impl RequestBody {
    /// Builds an unlock request body.
    #[must_use]
    pub fn unlock_request(
        client_id: impl Into<String>,
        credential_hash: impl Into<String>,
        issued_at: u64,
        nonce: u32,
    ) -> Self {
        Self {
            cmd: UNLOCK_REQUEST_CMD.to_owned(),
            client_id: client_id.into(),
            pw: credential_hash.into(),
            ts: issued_at,
            nonce,
        }
    }

    /// Serializes to the JSON string that gets signed.
    ///
    /// # Errors
    ///
    /// Propagates `serde_json` failures.
    pub fn to_json(&self) -> serde_json::Result<String> {
        serde_json::to_string(self)
    }

    /// Parses a body from the verified envelope text.
    ///
    /// # Errors
    ///
    /// Propagates `serde_json` failures.
    pub fn from_json(json: &str) -> serde_json::Result<Self> {
        serde_json::from_str(json)
    }
}

/// Command published on a device's command channel.
///
/// Verdicts use the uppercase legacy spellings; operator-initiated remote
/// commands use snake case. The `cmd` field tags the variant.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "cmd")]
pub enum CommandMessage {
    /// Verdict: open the actuator.
    #[serde(rename = "OPEN")]
    Open,
    /// Verdict: keep or return the actuator locked.
    #[serde(rename = "LOCK")]
    Lock {
        /// Why access was refused, when the verifier says.
        #[serde(default, skip_serializing_if = "Option::is_none")]
        reason: Option<String>,
    },
    /// Operator-initiated timed unlock.
    #[serde(rename = "remote_unlock")]
    RemoteUnlock {
        /// Correlation id echoed in the ack.
        #[serde(default)]
        command_id: String,
        /// Operator who issued the command.
        #[serde(default, rename = "user")]
        initiated_by: String,
        /// Free-form justification for the audit trail.
        #[serde(default, skip_serializing_if = "Option::is_none")]
        reason: Option<String>,
        /// How long to hold the door open; the device clamps this.
        #[serde(default, skip_serializing_if = "Option::is_none")]
        duration_ms: Option<u64>,
    },
    /// Operator-initiated relock, cancelling an active remote unlock.
    #[serde(rename = "remote_lock")]
    RemoteLock {
        /// Correlation id echoed in the ack.
        #[serde(default)]
        command_id: String,
        /// Operator who issued the command.
        #[serde(default, rename = "user")]
        initiated_by: String,
    },
    /// Runtime adjustment of the remote-unlock knobs.
    #[serde(rename = "update_config")]
    UpdateConfig {
        /// Correlation id echoed in the ack.
        #[serde(default)]
        command_id: String,
        /// Enable or disable remote unlock entirely.
        #[serde(default, skip_serializing_if = "Option::is_none")]
        remote_enabled: Option<bool>,
        /// New default hold duration.
        #[serde(default, skip_serializing_if = "Option::is_none")]
        default_duration_ms: Option<u64>,
        /// New upper bound on hold duration.
        #[serde(default, skip_serializing_if = "Option::is_none")]
        max_duration_ms: Option<u64>,
    },
}

impl CommandMessage {
    /// Serializes to a JSON string.
    ///
    /// # Errors
    ///
    /// Propagates `serde_json` failures.
    pub fn to_json(&self) -> serde_json::Result<String> {
        serde_json::to_string(self)
    }

    /// Parses a command from JSON text.
    ///
    /// # Errors
    ///
    /// Propagates `serde_json` failures.
    pub fn from_json(json: &str) -> serde_json::Result<Self> {
        serde_json::from_str(json)
    }
}

/// Device acknowledgment of a remote command.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CommandAck {
    /// Responding device.
    pub device_id: String,
    /// Correlation id of the command being answered.
    pub command_id: String,
    /// Whether the command took effect.
    pub success: bool,
    /// Outcome detail, e.g. `unlocked` or `remote_unlock_disabled`.
    pub status: String,
    /// Unix seconds on the device.
    pub timestamp: u64,
}

impl CommandAck {
    /// Serializes to a JSON string.
    ///
    /// # Errors
    ///
    /// Propagates `serde_json` failures.
    pub fn to_json(&self) -> serde_json::Result<String> {
        serde_json::to_string(self)
    }

    /// Parses an ack from JSON text.
    ///
    /// # Errors
    ///
    /// Propagates `serde_json` failures.
    pub fn from_json(json: &str) -> serde_json::Result<Self> {
        serde_json::from_str(json)
    }
}

/// Actuator state report published on a device's status channel.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DeviceStatus {
    /// Reporting device.
    pub device_id: String,
    /// State token, e.g. `OPENED`, `CLOSED`, `LOCKED`.
    pub state: String,
    /// What triggered the transition, e.g. `keypad` or `remote_unlock`.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub method: Option<String>,
    /// Refusal detail accompanying a `LOCKED` report.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub reason: Option<String>,
    /// Unix seconds on the device.
    pub timestamp: u64,
}

impl DeviceStatus {
    /// A bare state report.
    #[must_use]
    pub fn new(device_id: impl Into<String>, state: impl Into<String>, timestamp: u64) -> Self {
        Self {
            device_id: device_id.into(),
            state: state.into(),
            method: None,
            reason: None,
            timestamp,
        }
    }

    /// Attaches the triggering method.
    #[must_use]
    pub fn with_method(mut self, method: impl Into<String>) -> Self {
        self.method = Some(method.into());
        self
    }

    /// Attaches a refusal reason.
    #[must_use]
    pub fn with_reason(mut self, reason: impl Into<String>) -> Self {
        self.reason = Some(reason.into());
        self
    }

    /// Serializes to a JSON string.
    ///
    /// # Errors
    ///
    /// Propagates `serde_json` failures.
    pub fn to_json(&self) -> serde_json::Result<String> {
        serde_json::to_string(self)
    }

    /// Parses a status report from JSON text.
    ///
    /// # Errors
    ///
    /// Propagates `serde_json` failures.
    pub fn from_json(json: &str) -> serde_json::Result<Self> {
        serde_json::from_str(json)
    }
}
