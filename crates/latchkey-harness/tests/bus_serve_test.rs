//! The hub's serve loop driven over the simulated broker.

use std::error::Error;
use std::sync::Arc;
use std::time::Duration;

use latchkey_core::MessageChannel;
use latchkey_crypto::{hash_passcode, sign};
use latchkey_harness::{SimBus, SimEnv};
use latchkey_hub::channel::{command_channel, request_channel, UPLINK_CHANNEL};
use latchkey_hub::{AuditRecord, Hub, HubConfig, Registry};
use latchkey_proto::{RequestBody, RequestEnvelope};
use tokio::time::timeout;

const KEY: &[u8] = b"0123456789abcdef0123456789abcdef";
const CLIENT_ID: &str = "passkey_01";
const UNIX_BASE: u64 = 1_700_000_000;

fn provisioned_hub() -> Hub {
    let mut registry = Registry::new();
    registry.register_client(CLIENT_ID, hash_passcode("passkey_01_salt", "4821"));
    Hub::new(HubConfig::default(), KEY.to_vec(), registry)
}

fn signed_request(passcode: &str, nonce: u32) -> Result<String, Box<dyn Error>> {
    let body = RequestBody::unlock_request(
        CLIENT_ID,
        hash_passcode("passkey_01_salt", passcode),
        UNIX_BASE,
        nonce,
    )
    .to_json()?;
    let hmac = sign(KEY, body.as_bytes())?;
    Ok(RequestEnvelope::new(body, hmac).to_json()?)
}

async fn next_payload(
    endpoint: &mut latchkey_harness::BusEndpoint,
) -> Result<String, Box<dyn Error>> {
    let message = timeout(Duration::from_secs(1), endpoint.next_message())
        .await?
        .ok_or("bus closed")?;
    Ok(String::from_utf8(message.payload.to_vec())?)
}

#[tokio::test]
async fn serve_answers_a_request_and_uplinks_the_audit_record() -> Result<(), Box<dyn Error>> {
    let bus = SimBus::new();
    let mut hub_endpoint = bus.endpoint(&["home/devices/+/request", "home/devices/+/status"]);
    let device_commands = command_channel(CLIENT_ID);
    let mut commands = bus.endpoint(&[device_commands.as_str()]);
    let mut uplink = bus.endpoint(&[UPLINK_CHANNEL]);
    let device = bus.endpoint(&[]);

    let hub = Arc::new(provisioned_hub());
    let env = SimEnv::with_seed(9);
    let serve_hub = Arc::clone(&hub);
    let serve_env = env.clone();
    tokio::spawn(async move { serve_hub.serve(&mut hub_endpoint, &serve_env).await });

    device
        .publish(&request_channel(CLIENT_ID), signed_request("4821", 1)?.into())
        .await?;

    assert_eq!(next_payload(&mut commands).await?, r#"{"cmd":"OPEN"}"#);

    let record: AuditRecord = serde_json::from_str(&next_payload(&mut uplink).await?)?;
    assert!(record.granted);
    assert_eq!(record.device_id, CLIENT_ID);
    assert_eq!(record.credential.as_deref(), Some(CLIENT_ID));
    assert_eq!(hub.stats().requests_granted, 1);
    Ok(())
}

#[tokio::test]
async fn serve_refuses_a_bad_passcode_over_the_bus() -> Result<(), Box<dyn Error>> {
    let bus = SimBus::new();
    let mut hub_endpoint = bus.endpoint(&["home/devices/+/request", "home/devices/+/status"]);
    let device_commands = command_channel(CLIENT_ID);
    let mut commands = bus.endpoint(&[device_commands.as_str()]);
    let mut uplink = bus.endpoint(&[UPLINK_CHANNEL]);
    let device = bus.endpoint(&[]);

    let hub = Arc::new(provisioned_hub());
    let env = SimEnv::with_seed(10);
    let serve_hub = Arc::clone(&hub);
    let serve_env = env.clone();
    tokio::spawn(async move { serve_hub.serve(&mut hub_endpoint, &serve_env).await });

    device
        .publish(&request_channel(CLIENT_ID), signed_request("9999", 2)?.into())
        .await?;

    assert_eq!(
        next_payload(&mut commands).await?,
        r#"{"cmd":"LOCK","reason":"credential_mismatch"}"#,
    );
    let record: AuditRecord = serde_json::from_str(&next_payload(&mut uplink).await?)?;
    assert!(!record.granted);
    assert_eq!(record.reason.as_deref(), Some("credential_mismatch"));
    Ok(())
}
