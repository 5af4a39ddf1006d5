use alloc::vec::Vec;
use core::fmt;

use crate::{subsystem::Subsystem, OutputError, Result};

/// Pneumatic mechanisms used by the climb sequences.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Actuator {
    /// Rear climber pistons that lift the robot off a platform edge.
    Pistons,
    /// Front lever that hooks onto the platform.
    Lever,
}

impl fmt::Display for Actuator {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Self::Pistons => "climber pistons",
            Self::Lever => "climb lever",
        })
    }
}

/// Solenoid command for a double-acting cylinder.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum ActuatorCommand {
    Extend,
    Retract,
    /// Both valves closed; the cylinder holds wherever it is.
    #[default]
    Neutral,
}

pub trait ActuatorOutput {
    fn set(&mut self, actuator: Actuator, command: ActuatorCommand) -> Result;
}

/// In-memory actuators used by simulation and tests.
#[derive(Debug, Default)]
pub struct SimActuators {
    pistons: ActuatorCommand,
    lever: ActuatorCommand,
    history: Vec<(Actuator, ActuatorCommand)>,
    faulted: Option<Actuator>,
}

impl SimActuators {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn command(&self, actuator: Actuator) -> ActuatorCommand {
        match actuator {
            Actuator::Pistons => self.pistons,
            Actuator::Lever => self.lever,
        }
    }

    /// Every command issued so far, oldest first.
    pub fn history(&self) -> &[(Actuator, ActuatorCommand)] {
        &self.history
    }

    pub fn set_fault(&mut self, actuator: Option<Actuator>) {
        self.faulted = actuator;
    }
}

impl ActuatorOutput for SimActuators {
    fn set(&mut self, actuator: Actuator, command: ActuatorCommand) -> Result {
        if self.faulted == Some(actuator) {
            return Err(OutputError::ActuatorFault { actuator });
        }
        self.history.push((actuator, command));
        match actuator {
            Actuator::Pistons => self.pistons = command,
            Actuator::Lever => self.lever = command,
        }
        Ok(())
    }
}

impl Subsystem for SimActuators {}
