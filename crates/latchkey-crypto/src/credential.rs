//! Salted passcode digests.

use sha2::{Digest, Sha256};
use subtle::ConstantTimeEq;

/// Length of a credential digest rendered as lowercase hex.
pub const CREDENTIAL_HEX_LEN: usize = 64;

/// Computes the credential digest a device sends in place of its passcode:
/// lowercase hex `SHA-256(salt ‖ passcode)`.
///
/// The salt is fixed per device and shared with the hub's registry, so
/// both sides derive the same digest independently.
///
/// # Examples
///
/// ```
/// let digest = latchkey_crypto::hash_passcode("passkey_01_salt", "4821");
/// assert_eq!(digest.len(), latchkey_crypto::CREDENTIAL_HEX_LEN);
/// assert!(digest.chars().all(|c| c.is_ascii_hexdigit() && !c.is_uppercase()));
/// ```
#[must_use]
pub fn hash_passcode(salt: &str, passcode: &str) -> String {
    let mut hasher = Sha256::new();
    hasher.update(salt.as_bytes());
    hasher.update(passcode.as_bytes());
    hex::encode(hasher.finalize())
}

/// Compares a stored credential digest against a presented one in constant
/// time. Both sides are lowercase hex by construction; no normalization is
/// applied.
#[must_use]
pub fn verify_credential(expected_hex: &str, presented_hex: &str) -> bool {
    expected_hex
        .as_bytes()
        .ct_eq(presented_hex.as_bytes())
        .into()
}
