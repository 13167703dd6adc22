//! Latchkey device logic
//!
//! Pure state machine logic for the endpoint controllers, completely
//! decoupled from I/O. This enables deterministic testing of the retry,
//! timeout, and actuation behavior without real radios or real time.
//!
//! # Architecture
//!
//! Device logic in this crate is implemented as deterministic state
//! machines that are isolated from I/O, time, randomness, and scheduling.
//! All external effects are supplied explicitly by the caller.
//!
//! State transitions produce declarative actions that describe intended
//! effects rather than executing them directly. A runtime or test harness
//! is responsible for interpreting and executing these actions: handing a
//! frame to the radio driver, engaging the lock actuator, publishing a
//! message on the local network channel.
//!
//! This separation keeps protocol correctness independent of execution
//! concerns and allows the same code to be reused across device firmware
//! drivers, deterministic unit tests, and simulation environments with
//! fault injection.
//!
//! # Components
//!
//! - [`gate`]: Card-gate session state machine (scan, retry, verdict, hold)
//! - [`door`]: Keypad door controller (signed requests, remote commands)
//! - [`mod@env`]: Environment abstraction (time, RNG)
//! - [`transport`]: Transport abstraction (radio link, message channel)
//! - [`error`]: Session and transport error types

#![forbid(unsafe_code)]
#![warn(missing_docs)]

pub mod door;
pub mod env;
pub mod error;
pub mod gate;
pub mod transport;

pub use door::{DoorAction, DoorConfig, DoorIndication, DoorSession, LockState, RemoteCommandState};
pub use env::{Environment, SystemEnv};
pub use error::{SessionError, TransportError};
pub use gate::{GateAction, GateConfig, GateSession, GateState, Indication};
pub use transport::{ChannelMessage, MessageChannel, RadioLink};
