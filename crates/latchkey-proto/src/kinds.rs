//! Message and device kind codes carried in the frame header nibbles.

use serde_repr::{Deserialize_repr, Serialize_repr};

/// What a frame carries. Occupies the high nibble of header byte 0.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize_repr, Deserialize_repr)]
#[repr(u8)]
pub enum MessageKind {
    /// Card UID captured at a gate reader.
    Scan = 0x1,
    /// Sensor telemetry (temperature and similar).
    Telemetry = 0x2,
    /// Motion detector trigger.
    Motion = 0x3,
    /// Relay on/off control.
    RelayControl = 0x4,
    /// Keypad passkey event.
    Passkey = 0x5,
    /// Gate actuator status token (`open`, `clos`, `erro`).
    GateStatus = 0x6,
    /// Device health report.
    SystemStatus = 0x7,
    /// Door actuator status token.
    DoorStatus = 0x8,
    /// Acknowledgment.
    Ack = 0x9,
    /// Device-reported fault.
    Error = 0xF,
}

impl MessageKind {
    /// Decode a header nibble. Unknown code points return `None`; the frame
    /// is still structurally valid and the receiver decides what to do.
    #[must_use]
    pub fn from_nibble(nibble: u8) -> Option<Self> {
        match nibble & 0x0F {
            0x1 => Some(Self::Scan),
            0x2 => Some(Self::Telemetry),
            0x3 => Some(Self::Motion),
            0x4 => Some(Self::RelayControl),
            0x5 => Some(Self::Passkey),
            0x6 => Some(Self::GateStatus),
            0x7 => Some(Self::SystemStatus),
            0x8 => Some(Self::DoorStatus),
            0x9 => Some(Self::Ack),
            0xF => Some(Self::Error),
            _ => None,
        }
    }

    /// Stable lowercase name used in logs and audit records.
    #[must_use]
    pub fn name(self) -> &'static str {
        match self {
            Self::Scan => "rfid_scan",
            Self::Telemetry => "telemetry",
            Self::Motion => "motion_detect",
            Self::RelayControl => "relay_control",
            Self::Passkey => "passkey",
            Self::GateStatus => "gate_status",
            Self::SystemStatus => "system_status",
            Self::DoorStatus => "door_status",
            Self::Ack => "ack",
            Self::Error => "error",
        }
    }

    /// Whether the payload is an ASCII actuator-status token.
    #[must_use]
    pub fn carries_status_token(self) -> bool {
        matches!(self, Self::GateStatus | Self::DoorStatus)
    }
}

/// Which device class sent the frame. Low nibble of header byte 1.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize_repr, Deserialize_repr)]
#[repr(u8)]
pub enum DeviceKind {
    /// Card-gate controller on the radio link.
    RfidGate = 0x1,
    /// Fan relay controller.
    RelayFan = 0x2,
    /// Temperature sensor.
    TempSensor = 0x3,
    /// The coordinating hub itself.
    Gateway = 0x4,
    /// Keypad door controller.
    Passkey = 0x5,
    /// Outdoor motion detector.
    MotionOutdoor = 0x7,
    /// Indoor motion detector.
    MotionIndoor = 0x8,
}

impl DeviceKind {
    /// Decode a header nibble. Code point 0x6 is unassigned in the fleet.
    #[must_use]
    pub fn from_nibble(nibble: u8) -> Option<Self> {
        match nibble & 0x0F {
            0x1 => Some(Self::RfidGate),
            0x2 => Some(Self::RelayFan),
            0x3 => Some(Self::TempSensor),
            0x4 => Some(Self::Gateway),
            0x5 => Some(Self::Passkey),
            0x7 => Some(Self::MotionOutdoor),
            0x8 => Some(Self::MotionIndoor),
            _ => None,
        }
    }

    /// Stable lowercase name used in logs and audit records.
    #[must_use]
    pub fn name(self) -> &'static str {
        match self {
            Self::RfidGate => "rfid_gate",
            Self::RelayFan => "relay_fan",
            Self::TempSensor => "temp_sensor",
            Self::Gateway => "gateway",
            Self::Passkey => "passkey",
            Self::MotionOutdoor => "motion_outdoor",
            Self::MotionIndoor => "motion_indoor",
        }
    }
}
