//! Channel naming.
//!
//! Devices and hub agree on a per-device channel triple under a fixed
//! root: requests flow device → hub, commands hub → device, and status
//! reports and acks device → hub. Audit records leave on a single uplink
//! channel. Drivers and the test harness both use these helpers so the
//! names cannot drift apart.

/// Root of the per-device channel tree.
pub const DEVICE_ROOT: &str = "home/devices";

/// Channel the hub publishes audit records on.
pub const UPLINK_CHANNEL: &str = "home/hub/audit";

/// Channel a device publishes signed unlock requests on.
#[must_use]
pub fn request_channel(device_id: &str) -> String {
    format!("{DEVICE_ROOT}/{device_id}/request")
}

/// Channel the hub publishes verdicts and remote commands on.
#[must_use]
pub fn command_channel(device_id: &str) -> String {
    format!("{DEVICE_ROOT}/{device_id}/command")
}

/// Channel a device publishes status reports and command acks on.
#[must_use]
pub fn status_channel(device_id: &str) -> String {
    format!("{DEVICE_ROOT}/{device_id}/status")
}

/// Channel the hub republishes radio telemetry on.
#[must_use]
pub fn telemetry_channel(device_id: &str) -> String {
    format!("{DEVICE_ROOT}/{device_id}/telemetry")
}

fn device_from(channel: &str, suffix: &str) -> Option<String> {
    let rest = channel.strip_prefix(DEVICE_ROOT)?.strip_prefix('/')?;
    let device = rest.strip_suffix(suffix)?.strip_suffix('/')?;
    (!device.is_empty() && !device.contains('/')).then(|| device.to_owned())
}

/// Extracts the device id from a request channel name.
#[must_use]
pub fn device_from_request_channel(channel: &str) -> Option<String> {
    device_from(channel, "request")
}

/// Extracts the device id from a status channel name.
#[must_use]
pub fn device_from_status_channel(channel: &str) -> Option<String> {
    device_from(channel, "status")
}
