#![cfg_attr(not(feature = "std"), no_std)]

extern crate alloc;

use snafu::Snafu;

pub mod actuator;
pub mod arbiter;
pub mod climber;
pub mod config;
pub mod controller;
pub mod drivetrain;
pub mod event;
#[cfg(target_os = "vexos")]
pub mod hal;
#[cfg(feature = "std")]
pub mod logger;
pub mod maneuver;
pub mod robot;
pub mod sequencer;
pub mod shaper;
pub mod subsystem;
pub mod time;

pub use actuator::{Actuator, ActuatorCommand, ActuatorOutput};
pub use arbiter::JoystickArbiter;
pub use climber::ClimbRobot;
pub use drivetrain::{BrakeMode, DriveCommand, MotionOutput, Side};
pub use maneuver::TimedDrive;
pub use sequencer::{Phase, Sequence, Sequencer};
pub use shaper::{DriveShaper, JoystickSample};
pub use time::Timestamp;

/// A hardware write that did not reach its device.
#[derive(Debug, Clone, PartialEq, Eq, Snafu)]
pub enum OutputError {
    #[snafu(display("The {side} motor group is not responding."))]
    Unresponsive { side: Side },
    #[snafu(display("The {actuator} actuator could not be commanded."))]
    ActuatorFault { actuator: Actuator },
}

pub type Result<T = (), E = OutputError> = core::result::Result<T, E>;
