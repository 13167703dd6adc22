//! Scenario execution for whole-protocol tests.
//!
//! A [`World`] wires a gate session, a door session, and a hub together
//! through simulated transports; the [`Scenario`] builder drives it
//! through a scripted sequence of events and requires an oracle check at
//! the end, so no scenario can run without verifying something.

pub mod builder;
pub mod world;

pub use builder::{OracleFn, RunnableScenario, Scenario};
pub use world::{DoorEvent, GateEvent, World};
