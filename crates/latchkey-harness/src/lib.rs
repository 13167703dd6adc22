//! Deterministic simulation harness for latchkey protocol testing.
//!
//! In-memory implementations of the Environment and transport traits, a
//! [`World`](scenario::World) that wires a gate, a door, and a hub
//! together without any real IO, and a scenario builder that makes an
//! oracle check mandatory. Time only moves when a test advances it, and
//! all randomness comes from a seeded generator, so every run of a
//! scenario is byte-for-byte identical.

#![forbid(unsafe_code)]
#![warn(missing_docs)]

pub mod scenario;
pub mod sim_bus;
pub mod sim_env;
pub mod sim_radio;

pub use scenario::{Scenario, World};
pub use sim_bus::{BusEndpoint, SimBus};
pub use sim_env::SimEnv;
pub use sim_radio::SimRadio;
