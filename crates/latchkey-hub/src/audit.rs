//! Audit records.
//!
//! Every verdict and remote-command outcome produces one record. The hub
//! publishes them as JSON on the uplink channel; the store and dashboard
//! behind it are collaborators and never see anything else.

use serde::{Deserialize, Serialize};

/// How the access attempt was made.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AccessMethod {
    /// Card scanned at the gate reader.
    Rfid,
    /// Passcode entered on the door keypad.
    Keypad,
    /// Operator-issued remote unlock.
    RemoteUnlock,
    /// Operator-issued remote lock.
    RemoteLock,
}

/// One auditable outcome.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AuditRecord {
    /// Device the attempt arrived on or was directed at.
    pub device_id: String,
    /// How the attempt was made.
    pub method: AccessMethod,
    /// What identified the requester: a card UID in hex, a client id, or
    /// an operator name for remote commands.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub credential: Option<String>,
    /// Whether the attempt succeeded.
    pub granted: bool,
    /// Refusal reason code or remote-command status.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub reason: Option<String>,
    /// Hub wall-clock seconds when the outcome was decided.
    pub timestamp: u64,
}

impl AuditRecord {
    /// A granted outcome.
    #[must_use]
    pub fn granted(
        device_id: impl Into<String>,
        method: AccessMethod,
        credential: Option<String>,
        timestamp: u64,
    ) -> Self {
        Self {
            device_id: device_id.into(),
            method,
            credential,
            granted: true,
            reason: None,
            timestamp,
        }
    }

    /// A refused outcome with its reason code.
    #[must_use]
    pub fn denied(
        device_id: impl Into<String>,
        method: AccessMethod,
        credential: Option<String>,
        reason: impl Into<String>,
        timestamp: u64,
    ) -> Self {
        Self {
            device_id: device_id.into(),
            method,
            credential,
            granted: false,
            reason: Some(reason.into()),
            timestamp,
        }
    }

    /// Serializes to the uplink JSON document.
    ///
    /// # Errors
    ///
    /// Propagates `serde_json` failures.
    pub fn to_json(&self) -> serde_json::Result<String> {
        serde_json::to_string(self)
    }
}

#[cfg(test)]
mod tests {
    use super::{AccessMethod, AuditRecord};

    #[test]
    fn denied_record_serializes_the_reason() {
        let record = AuditRecord::denied(
            "passkey_01",
            AccessMethod::Keypad,
            Some("passkey_01".to_owned()),
            "replay_detected",
            1_700_000_000,
        );
        assert_eq!(
            record.to_json().unwrap(),
            r#"{"device_id":"passkey_01","method":"keypad","credential":"passkey_01","granted":false,"reason":"replay_detected","timestamp":1700000000}"#,
        );
    }

    #[test]
    fn granted_record_omits_the_reason() {
        let record = AuditRecord::granted(
            "rfid_gate",
            AccessMethod::Rfid,
            Some("04a37f12".to_owned()),
            1_700_000_001,
        );
        let json = record.to_json().unwrap();
        assert!(json.contains(r#""granted":true"#));
        assert!(!json.contains("reason"));
        assert!(json.contains(r#""method":"rfid""#));
    }
}
