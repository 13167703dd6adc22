//! Credential hashing and request signing.
//!
//! Keypad devices never send a raw passcode. They send a salted SHA-256
//! digest of it, wrapped in a body that is HMAC-SHA256 signed with a key
//! shared between the device and the hub. The hub recomputes both and
//! compares; this crate holds the primitives both sides use.
//!
//! # Security
//!
//! The signature authenticates the sender and pins the body bytes; the
//! credential digest keeps the passcode off the wire but is only as
//! strong as the passcode space behind it. All comparisons here are
//! constant time, so a rejection reveals nothing about how close the
//! attempt was.

#![forbid(unsafe_code)]
#![warn(missing_docs)]

pub mod credential;
pub mod error;
pub mod signature;

pub use credential::{hash_passcode, verify_credential, CREDENTIAL_HEX_LEN};
pub use error::CryptoError;
pub use signature::{sign, verify};
