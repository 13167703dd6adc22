//! Scenario builder API.
//!
//! Declarative construction of scenario tests. The oracle is mandatory:
//! a [`Scenario`] only becomes runnable once `.oracle()` supplies the
//! final verification, so no scenario can silently assert nothing.

use std::time::Duration;

use crate::scenario::World;

/// Final verification run against the world after every step.
pub type OracleFn = Box<dyn FnOnce(&World) -> Result<(), String>>;

#[derive(Debug, Clone)]
enum Step {
    Scan(Vec<u8>),
    Passcode(String),
    Advance(Duration),
    FailGateSends(u32),
    SilenceHub(bool),
    NoiseAtHub(Vec<u8>),
    RemoteUnlock { command_id: String, duration_ms: Option<u64> },
    RemoteLock { command_id: String },
}

/// Scenario under construction.
#[derive(Debug)]
pub struct Scenario {
    name: String,
    seed: u64,
    steps: Vec<Step>,
}

impl Scenario {
    /// Starts a scenario with the given name.
    #[must_use]
    pub fn new(name: impl Into<String>) -> Self {
        Self { name: name.into(), seed: 0, steps: Vec::new() }
    }

    /// Sets the RNG seed; scenarios with the same seed replay exactly.
    #[must_use]
    pub fn seed(mut self, seed: u64) -> Self {
        self.seed = seed;
        self
    }

    /// Presents a card at the gate.
    #[must_use]
    pub fn scan(mut self, uid: &[u8]) -> Self {
        self.steps.push(Step::Scan(uid.to_vec()));
        self
    }

    /// Enters a passcode on the door keypad.
    #[must_use]
    pub fn passcode(mut self, passcode: impl Into<String>) -> Self {
        self.steps.push(Step::Passcode(passcode.into()));
        self
    }

    /// Advances simulated time.
    #[must_use]
    pub fn advance(mut self, duration: Duration) -> Self {
        self.steps.push(Step::Advance(duration));
        self
    }

    /// Makes the next gate transmissions fail at the radio.
    #[must_use]
    pub fn fail_gate_sends(mut self, count: u32) -> Self {
        self.steps.push(Step::FailGateSends(count));
        self
    }

    /// Suppresses or restores the hub's radio responses.
    #[must_use]
    pub fn silence_hub(mut self, silenced: bool) -> Self {
        self.steps.push(Step::SilenceHub(silenced));
        self
    }

    /// Injects raw bytes into the hub's radio receive path.
    #[must_use]
    pub fn noise_at_hub(mut self, bytes: &[u8]) -> Self {
        self.steps.push(Step::NoiseAtHub(bytes.to_vec()));
        self
    }

    /// Issues an operator remote unlock for the door.
    #[must_use]
    pub fn remote_unlock(mut self, command_id: impl Into<String>, duration_ms: Option<u64>) -> Self {
        self.steps.push(Step::RemoteUnlock { command_id: command_id.into(), duration_ms });
        self
    }

    /// Issues an operator remote lock for the door.
    #[must_use]
    pub fn remote_lock(mut self, command_id: impl Into<String>) -> Self {
        self.steps.push(Step::RemoteLock { command_id: command_id.into() });
        self
    }

    /// Sets the oracle and returns a runnable scenario. The oracle is
    /// mandatory; a scenario without one cannot run.
    #[must_use]
    pub fn oracle(self, oracle: OracleFn) -> RunnableScenario {
        RunnableScenario { scenario: self, oracle }
    }
}

/// A scenario with its oracle, ready to execute.
pub struct RunnableScenario {
    scenario: Scenario,
    oracle: OracleFn,
}

impl RunnableScenario {
    /// Executes every step in order, then runs the oracle against the
    /// final world.
    ///
    /// # Errors
    ///
    /// A step failure or an oracle failure, tagged with the scenario
    /// name.
    pub fn run(self) -> Result<(), String> {
        let name = self.scenario.name;
        let mut world = World::new(self.scenario.seed);
        for step in self.scenario.steps {
            let result = match step {
                Step::Scan(uid) => world.scan(&uid),
                Step::Passcode(passcode) => world.submit_passcode(&passcode),
                Step::Advance(duration) => world.advance(duration),
                Step::FailGateSends(count) => {
                    world.fail_gate_sends(count);
                    Ok(())
                }
                Step::SilenceHub(silenced) => {
                    world.silence_hub(silenced);
                    Ok(())
                }
                Step::NoiseAtHub(bytes) => {
                    world.noise_at_hub(&bytes);
                    Ok(())
                }
                Step::RemoteUnlock { command_id, duration_ms } => {
                    world.remote_unlock(&command_id, duration_ms)
                }
                Step::RemoteLock { command_id } => world.remote_lock(&command_id),
            };
            result.map_err(|e| format!("scenario {name}: {e}"))?;
        }
        (self.oracle)(&world).map_err(|e| format!("scenario {name}: oracle: {e}"))
    }
}
