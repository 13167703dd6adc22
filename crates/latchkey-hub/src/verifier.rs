//! The request verification pipeline.
//!
//! Both device channels converge here: signed keypad envelopes and card
//! scans off the radio. The pipeline stops at the first failure, in a
//! fixed order chosen so the cheapest and most security-relevant checks
//! run first and no later check can mask an earlier one:
//!
//! 1. envelope completeness (`missing_signature`)
//! 2. HMAC over the body bytes as received (`invalid_signature`)
//! 3. body parse (`malformed_request`)
//! 4. per-device rate window (`rate_limit_exceeded`)
//! 5. freshness of `issued_at`, both directions (`stale`)
//! 6. `(client, nonce)` replay cache (`replay_detected`)
//! 7. registered credential comparison (`credential_mismatch`)
//!
//! The signature is verified over the exact body string from the
//! envelope; re-serializing the parsed body would not be canonical.

use std::time::{Duration, Instant};

use latchkey_crypto::{verify, verify_credential};
use latchkey_proto::{RequestBody, RequestEnvelope, UNLOCK_REQUEST_CMD};
use tracing::{debug, warn};

use crate::config::HubConfig;
use crate::error::AuthError;
use crate::ratelimit::RateLimiter;
use crate::registry::Registry;
use crate::replay::ReplayGuard;

/// A request that passed every check.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct VerifiedRequest {
    /// Authenticated client identity.
    pub client_id: String,
    /// Nonce consumed by this request.
    pub nonce: u32,
    /// The request's wall-clock issue time.
    pub issued_at: u64,
}

/// Verifier state: the shared key, registered credentials, and the
/// anti-abuse caches. Callers serialize access; see [`crate::dispatch`].
#[derive(Debug)]
pub struct Verifier {
    key: Vec<u8>,
    registry: Registry,
    replay: ReplayGuard,
    limiter: RateLimiter,
    accept_window: Duration,
}

impl Verifier {
    /// Creates a verifier around the pre-shared key and the registry.
    #[must_use]
    pub fn new(key: Vec<u8>, registry: Registry, config: &HubConfig) -> Self {
        Self {
            key,
            registry,
            replay: ReplayGuard::new(config.accept_window(), config.replay_capacity),
            limiter: RateLimiter::new(config.rate_limit_window(), config.rate_limit_max),
            accept_window: config.accept_window(),
        }
    }

    /// The registry, for provisioning updates.
    pub fn registry_mut(&mut self) -> &mut Registry {
        &mut self.registry
    }

    /// Runs the full pipeline on a keypad unlock envelope.
    ///
    /// # Errors
    ///
    /// The first failing check's [`AuthError`]; the caller turns it into
    /// a verdict and an audit record. Failures are terminal for this
    /// request; the hub never retries authentication.
    pub fn verify_unlock(
        &mut self,
        envelope: &RequestEnvelope,
        now: Instant,
        unix_now: u64,
    ) -> Result<VerifiedRequest, AuthError> {
        if envelope.body.is_empty() || envelope.hmac.is_empty() {
            warn!("unlock request with empty body or signature");
            return Err(AuthError::MissingSignature);
        }
        if !verify(&self.key, envelope.body.as_bytes(), &envelope.hmac) {
            warn!("unlock request signature mismatch");
            return Err(AuthError::InvalidSignature);
        }

        let body = RequestBody::from_json(&envelope.body).map_err(|e| {
            debug!(error = %e, "signed body does not parse");
            AuthError::MalformedRequest
        })?;
        if body.cmd != UNLOCK_REQUEST_CMD {
            debug!(cmd = %body.cmd, "signed body carries an unexpected command");
            return Err(AuthError::MalformedRequest);
        }
        let client_id = body.client_id;

        if !self.limiter.check_and_record(&client_id, now) {
            warn!(client_id = %client_id, "request rate limit exceeded");
            return Err(AuthError::RateLimitExceeded);
        }
        if unix_now.abs_diff(body.ts) > self.accept_window.as_secs() {
            warn!(client_id = %client_id, issued_at = body.ts, "request outside the acceptance window");
            return Err(AuthError::Stale);
        }
        if !self.replay.check_and_record(&client_id, body.nonce, now) {
            warn!(client_id = %client_id, nonce = body.nonce, "nonce replay detected");
            return Err(AuthError::ReplayDetected);
        }

        let Some(stored) = self.registry.credential_hash(&client_id) else {
            warn!(client_id = %client_id, "unlock request from unregistered client");
            return Err(AuthError::UnknownClient);
        };
        if !verify_credential(stored, &body.pw) {
            warn!(client_id = %client_id, "credential mismatch");
            return Err(AuthError::CredentialMismatch);
        }

        Ok(VerifiedRequest {
            client_id,
            nonce: body.nonce,
            issued_at: body.ts,
        })
    }

    /// Checks a card scan from the radio: rate window, then the card
    /// registry. Returns the card's label for the audit record.
    ///
    /// # Errors
    ///
    /// [`AuthError::RateLimitExceeded`] or
    /// [`AuthError::CredentialMismatch`]; an unknown card is
    /// indistinguishable from a revoked one by design.
    pub fn verify_scan(&mut self, device: &str, uid: &[u8], now: Instant) -> Result<String, AuthError> {
        if !self.limiter.check_and_record(device, now) {
            warn!(device = %device, "scan rate limit exceeded");
            return Err(AuthError::RateLimitExceeded);
        }
        match self.registry.card(uid) {
            Some(card) if card.authorized => Ok(card.label.clone()),
            Some(_) => {
                warn!(device = %device, uid = %hex::encode(uid), "revoked card presented");
                Err(AuthError::CredentialMismatch)
            }
            None => {
                warn!(device = %device, uid = %hex::encode(uid), "unknown card presented");
                Err(AuthError::CredentialMismatch)
            }
        }
    }

    /// Evicts expired replay and rate-window entries.
    pub fn prune(&mut self, now: Instant) {
        self.replay.prune(now);
        self.limiter.prune(now);
    }
}

#[cfg(test)]
mod tests {
    use std::time::{Duration, Instant};

    use latchkey_crypto::{hash_passcode, sign};
    use latchkey_proto::{RequestBody, RequestEnvelope};

    use super::Verifier;
    use crate::config::HubConfig;
    use crate::error::AuthError;
    use crate::registry::Registry;

    const KEY: &[u8] = b"0123456789abcdef0123456789abcdef";
    const UNIX_NOW: u64 = 1_700_000_000;

    fn verifier() -> Verifier {
        let mut registry = Registry::new();
        registry.register_client("passkey_01", hash_passcode("passkey_01_salt", "4821"));
        Verifier::new(KEY.to_vec(), registry, &HubConfig::default())
    }

    fn envelope_with(passcode: &str, issued_at: u64, nonce: u32) -> RequestEnvelope {
        let body = RequestBody::unlock_request(
            "passkey_01",
            hash_passcode("passkey_01_salt", passcode),
            issued_at,
            nonce,
        );
        let body_json = body.to_json().unwrap();
        let hmac = sign(KEY, body_json.as_bytes()).unwrap();
        RequestEnvelope::new(body_json, hmac)
    }

    #[test]
    fn a_valid_request_is_granted() {
        let t0 = Instant::now();
        let verified = verifier()
            .verify_unlock(&envelope_with("4821", UNIX_NOW, 1), t0, UNIX_NOW)
            .unwrap();
        assert_eq!(verified.client_id, "passkey_01");
        assert_eq!(verified.nonce, 1);
    }

    #[test]
    fn missing_fields_are_rejected_before_anything_else() {
        let t0 = Instant::now();
        let mut verifier = verifier();
        let valid = envelope_with("4821", UNIX_NOW, 1);

        let no_sig = RequestEnvelope::new(valid.body.clone(), "");
        assert_eq!(
            verifier.verify_unlock(&no_sig, t0, UNIX_NOW),
            Err(AuthError::MissingSignature),
        );
        let no_body = RequestEnvelope::new("", valid.hmac);
        assert_eq!(
            verifier.verify_unlock(&no_body, t0, UNIX_NOW),
            Err(AuthError::MissingSignature),
        );
    }

    #[test]
    fn a_tampered_signature_is_invalid_signature_never_credential_mismatch() {
        let t0 = Instant::now();
        let mut verifier = verifier();
        // Wrong passcode AND corrupted signature: the signature check
        // must win.
        let envelope = envelope_with("9999", UNIX_NOW, 1);
        let mut hmac = envelope.hmac.clone().into_bytes();
        hmac[0] = if hmac[0] == b'0' { b'1' } else { b'0' };
        let tampered = RequestEnvelope::new(envelope.body, String::from_utf8(hmac).unwrap());

        assert_eq!(
            verifier.verify_unlock(&tampered, t0, UNIX_NOW),
            Err(AuthError::InvalidSignature),
        );
    }

    #[test]
    fn a_tampered_body_is_invalid_signature() {
        let t0 = Instant::now();
        let mut verifier = verifier();
        let envelope = envelope_with("4821", UNIX_NOW, 1);
        let tampered = RequestEnvelope::new(envelope.body.replace('1', "2"), envelope.hmac);
        assert_eq!(
            verifier.verify_unlock(&tampered, t0, UNIX_NOW),
            Err(AuthError::InvalidSignature),
        );
    }

    #[test]
    fn a_signed_but_unparseable_body_is_malformed() {
        let t0 = Instant::now();
        let mut verifier = verifier();
        let body = "not an unlock request";
        let hmac = sign(KEY, body.as_bytes()).unwrap();
        assert_eq!(
            verifier.verify_unlock(&RequestEnvelope::new(body, hmac), t0, UNIX_NOW),
            Err(AuthError::MalformedRequest),
        );
    }

    #[test]
    fn window_boundary_is_inclusive() {
        let t0 = Instant::now();
        let mut verifier = verifier();

        // Exactly at now - window: accepted.
        assert!(verifier
            .verify_unlock(&envelope_with("4821", UNIX_NOW - 90, 1), t0, UNIX_NOW)
            .is_ok());
        // One second older: rejected.
        assert_eq!(
            verifier.verify_unlock(&envelope_with("4821", UNIX_NOW - 91, 2), t0, UNIX_NOW),
            Err(AuthError::Stale),
        );
        // Too far in the future is rejected too.
        assert_eq!(
            verifier.verify_unlock(&envelope_with("4821", UNIX_NOW + 91, 3), t0, UNIX_NOW),
            Err(AuthError::Stale),
        );
    }

    #[test]
    fn replay_is_rejected_in_window_and_stale_after_it() {
        let t0 = Instant::now();
        let mut verifier = verifier();
        let envelope = envelope_with("4821", UNIX_NOW, 42);

        assert!(verifier.verify_unlock(&envelope, t0, UNIX_NOW).is_ok());
        // Immediate replay.
        assert_eq!(
            verifier.verify_unlock(&envelope, t0, UNIX_NOW),
            Err(AuthError::ReplayDetected),
        );
        // Replay after the window expires: the freshness check rejects
        // it first.
        let t1 = t0 + Duration::from_secs(120);
        assert_eq!(
            verifier.verify_unlock(&envelope, t1, UNIX_NOW + 120),
            Err(AuthError::Stale),
        );
    }

    #[test]
    fn wrong_passcode_is_credential_mismatch() {
        let t0 = Instant::now();
        assert_eq!(
            verifier().verify_unlock(&envelope_with("9999", UNIX_NOW, 1), t0, UNIX_NOW),
            Err(AuthError::CredentialMismatch),
        );
    }

    #[test]
    fn unregistered_clients_are_rejected() {
        let t0 = Instant::now();
        let mut verifier = Verifier::new(KEY.to_vec(), Registry::new(), &HubConfig::default());
        assert_eq!(
            verifier.verify_unlock(&envelope_with("4821", UNIX_NOW, 1), t0, UNIX_NOW),
            Err(AuthError::UnknownClient),
        );
    }

    #[test]
    fn rate_limit_boundary_and_reset() {
        let t0 = Instant::now();
        let mut verifier = verifier();

        for nonce in 0..10 {
            assert!(
                verifier
                    .verify_unlock(&envelope_with("4821", UNIX_NOW, nonce), t0, UNIX_NOW)
                    .is_ok(),
                "request {nonce} should be admitted",
            );
        }
        assert_eq!(
            verifier.verify_unlock(&envelope_with("4821", UNIX_NOW, 10), t0, UNIX_NOW),
            Err(AuthError::RateLimitExceeded),
        );

        // Window slides: after 60s the budget is back.
        let t1 = t0 + Duration::from_secs(60);
        assert!(verifier
            .verify_unlock(&envelope_with("4821", UNIX_NOW + 60, 11), t1, UNIX_NOW + 60)
            .is_ok());
    }

    #[test]
    fn scans_check_the_card_registry() {
        let t0 = Instant::now();
        let mut verifier = verifier();
        let uid = [0x04, 0xA3, 0x7F, 0x12];
        verifier.registry_mut().register_card(&uid, "resident 3");

        assert_eq!(
            verifier.verify_scan("rfid_gate", &uid, t0).as_deref(),
            Ok("resident 3"),
        );
        assert_eq!(
            verifier.verify_scan("rfid_gate", &[0xFF; 4], t0),
            Err(AuthError::CredentialMismatch),
        );

        verifier.registry_mut().revoke_card(&uid);
        assert_eq!(
            verifier.verify_scan("rfid_gate", &uid, t0),
            Err(AuthError::CredentialMismatch),
        );
    }
}
