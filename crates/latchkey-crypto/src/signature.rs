//! HMAC-SHA256 request signatures.

use hmac::{Hmac, Mac};
use sha2::Sha256;

use crate::error::CryptoError;

type HmacSha256 = Hmac<Sha256>;

/// Signs a message, returning the tag as lowercase hex.
///
/// The message is the exact serialized body string; any re-serialization
/// on the verifying side would break the signature, so verifiers must
/// check the bytes as received.
///
/// # Errors
///
/// Returns [`CryptoError::InvalidKey`] if the MAC implementation rejects
/// the key. HMAC accepts keys of any length, so this does not happen with
/// the keys devices are provisioned with.
pub fn sign(key: &[u8], message: &[u8]) -> Result<String, CryptoError> {
    let mut mac = HmacSha256::new_from_slice(key).map_err(|_| CryptoError::InvalidKey)?;
    mac.update(message);
    Ok(hex::encode(mac.finalize().into_bytes()))
}

/// Verifies a lowercase hex signature over a message in constant time.
///
/// Anything that prevents comparison counts as failure: hex that does not
/// decode, a tag of the wrong width, or a key the MAC rejects.
#[must_use]
pub fn verify(key: &[u8], message: &[u8], signature_hex: &str) -> bool {
    let Ok(expected) = hex::decode(signature_hex) else {
        return false;
    };
    let Ok(mut mac) = HmacSha256::new_from_slice(key) else {
        return false;
    };
    mac.update(message);
    mac.verify_slice(&expected).is_ok()
}
