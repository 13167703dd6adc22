//! Authentication failure taxonomy.

use thiserror::Error;

/// Why the verifier refused a request.
///
/// Ordering matters: the pipeline stops at the first failure, so a
/// request with a bad signature is always `InvalidSignature`, never a
/// later reason, and a tampered body can never be mistaken for a wrong
/// credential. Authentication failures are never retried by the hub; a
/// fresh attempt must carry a new nonce and timestamp.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
pub enum AuthError {
    /// The envelope is missing the signature or the body.
    #[error("request envelope missing signature or body")]
    MissingSignature,

    /// The recomputed HMAC does not match the received signature.
    #[error("request signature invalid")]
    InvalidSignature,

    /// The signed body does not parse as an unlock request.
    #[error("request body malformed")]
    MalformedRequest,

    /// The device exceeded its request window.
    #[error("request rate limit exceeded")]
    RateLimitExceeded,

    /// `issued_at` falls outside the acceptance window, in either
    /// direction.
    #[error("request timestamp outside the acceptance window")]
    Stale,

    /// The `(client, nonce)` pair was already accepted once.
    #[error("request nonce already used")]
    ReplayDetected,

    /// No credentials are registered for the claimed client.
    #[error("client not registered")]
    UnknownClient,

    /// The presented credential does not match the registered one.
    #[error("credential mismatch")]
    CredentialMismatch,
}

impl AuthError {
    /// Stable snake-case reason code used in verdicts and audit records.
    #[must_use]
    pub fn reason_code(self) -> &'static str {
        match self {
            Self::MissingSignature => "missing_signature",
            Self::InvalidSignature => "invalid_signature",
            Self::MalformedRequest => "malformed_request",
            Self::RateLimitExceeded => "rate_limit_exceeded",
            Self::Stale => "stale",
            Self::ReplayDetected => "replay_detected",
            Self::UnknownClient => "unknown_client",
            Self::CredentialMismatch => "credential_mismatch",
        }
    }
}
