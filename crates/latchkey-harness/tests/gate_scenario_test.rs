//! Gate lifecycle scenarios: grant, deny, verdict timeout, debounce.

use std::time::Duration;

use latchkey_core::GateState;
use latchkey_harness::scenario::world::{CARD_UID, CLIENT_ID};
use latchkey_harness::{Scenario, World};

#[test]
fn registered_card_opens_then_closes() {
    use latchkey_harness::scenario::world::GateEvent;

    Scenario::new("registered card grant")
        .seed(7)
        .scan(&CARD_UID)
        .advance(Duration::from_secs(6))
        .oracle(Box::new(|world: &World| {
            if world.gate_events() != [GateEvent::Opened, GateEvent::Closed] {
                return Err(format!("unexpected gate events: {:?}", world.gate_events()));
            }
            if world.gate_status() != ["open", "clos"] {
                return Err(format!("unexpected status tokens: {:?}", world.gate_status()));
            }
            let audit = world.audit();
            if audit.len() != 1 || !audit[0].granted {
                return Err(format!("unexpected audit trail: {audit:?}"));
            }
            if world.gate_state() != GateState::Idle {
                return Err(format!("gate not idle: {:?}", world.gate_state()));
            }
            Ok(())
        }))
        .run()
        .unwrap();
}

#[test]
fn unknown_card_is_denied_without_actuating() {
    use latchkey_harness::scenario::world::GateEvent;

    let mut world = World::new(1);
    world.scan(&[0xFF; 4]).unwrap();

    assert_eq!(world.gate_events(), [GateEvent::Denied]);
    assert!(world.gate_status().is_empty(), "deny must not emit a status frame");
    assert_eq!(world.gate_state(), GateState::Idle);

    let audit = world.audit();
    assert_eq!(audit.len(), 1);
    assert!(!audit[0].granted);
    assert_eq!(audit[0].reason.as_deref(), Some("credential_mismatch"));
    assert_eq!(world.gate().stats().denials, 1);
}

#[test]
fn revoked_card_is_denied() {
    let mut world = World::new(1);
    world.hub().with_registry(|registry| registry.revoke_card(&CARD_UID));
    world.scan(&CARD_UID).unwrap();

    assert_eq!(world.gate().stats().denials, 1);
    assert_eq!(world.audit()[0].reason.as_deref(), Some("credential_mismatch"));
}

#[test]
fn silent_hub_times_out_with_exactly_one_error_frame() {
    use latchkey_harness::scenario::world::GateEvent;

    Scenario::new("verdict timeout")
        .seed(3)
        .silence_hub(true)
        .scan(&CARD_UID)
        .advance(Duration::from_secs(13))
        .oracle(Box::new(|world: &World| {
            if world.gate_events() != [GateEvent::Failed] {
                return Err(format!("unexpected gate events: {:?}", world.gate_events()));
            }
            let errors =
                world.gate_status().iter().filter(|token| token.as_str() == "erro").count();
            if errors != 1 {
                return Err(format!("expected exactly one erro frame, saw {errors}"));
            }
            if world.gate().stats().timeouts != 1 {
                return Err("timeout not counted".to_owned());
            }
            // The hub heard the scan and granted; only the response was
            // lost.
            if world.hub_stats().scans_granted != 1 {
                return Err("hub never saw the scan".to_owned());
            }
            Ok(())
        }))
        .run()
        .unwrap();
}

#[test]
fn scans_inside_the_debounce_interval_are_ignored() {
    let mut world = World::new(5);
    world.scan(&[0xEE; 4]).unwrap(); // denied, session over, debounce starts
    assert_eq!(world.gate().stats().scans, 1);

    world.advance(Duration::from_secs(1)).unwrap();
    world.scan(&CARD_UID).unwrap();
    assert_eq!(world.gate().stats().scans, 1, "debounced scan must not count");

    world.advance(Duration::from_secs(2)).unwrap();
    world.scan(&CARD_UID).unwrap();
    assert_eq!(world.gate().stats().scans, 2);
    assert_eq!(world.gate().stats().grants, 1);
}

#[test]
fn status_frames_reach_the_hub_as_reports() {
    let mut world = World::new(11);
    world.scan(&CARD_UID).unwrap();
    world.advance(Duration::from_secs(6)).unwrap();

    // "open" and "clos" both arrived over the radio.
    assert_eq!(world.hub_stats().status_reports, 2);
}

/// The device id in the audit record is the radio device name for scans
/// and the client id for keypad requests.
#[test]
fn audit_attribution_distinguishes_the_channels() {
    let mut world = World::new(13);
    world.scan(&CARD_UID).unwrap();
    world.submit_passcode("4821").unwrap();

    let audit = world.audit();
    assert_eq!(audit.len(), 2);
    assert_eq!(audit[0].device_id, "rfid_gate");
    assert_eq!(audit[1].device_id, CLIENT_ID);
}
