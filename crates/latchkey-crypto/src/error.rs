//! Error types for the signing primitives.

use thiserror::Error;

/// Failures surfaced by the signing API.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
pub enum CryptoError {
    /// The MAC implementation rejected the signing key.
    #[error("signing key rejected by the MAC implementation")]
    InvalidKey,
}
