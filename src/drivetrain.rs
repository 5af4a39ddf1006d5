//! Two-sided drive output.
//!
//! [`MotionOutput`] is the only path by which any part of the controller moves
//! the robot. Implementations are thin sinks: they accept percent-output
//! commands for the left and right motor groups, switch the neutral behavior
//! between brake and coast, and expose the encoder counter of each side.

use alloc::vec::Vec;
use core::fmt;

use serde::{Deserialize, Serialize};

use crate::{subsystem::Subsystem, OutputError, Result};

/// Encoder counts accumulated per control cycle at full output in simulation.
pub const SIM_COUNTS_PER_CYCLE: f64 = 80.0;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Side {
    Left,
    Right,
}

impl fmt::Display for Side {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Self::Left => "left",
            Self::Right => "right",
        })
    }
}

/// How a motor behaves while commanded to zero output.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum BrakeMode {
    /// Actively resist motion.
    Brake,
    /// Freewheel.
    #[default]
    Coast,
}

/// Percent output for both sides of the drivetrain, each in `[-1, 1]`.
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct DriveCommand {
    pub left: f64,
    pub right: f64,
}

impl DriveCommand {
    pub const STOP: Self = Self::new(0.0, 0.0);

    pub const fn new(left: f64, right: f64) -> Self {
        Self { left, right }
    }

    /// Clamps both sides into `[-1, 1]`. NaN becomes zero.
    pub fn clamped(self) -> Self {
        Self {
            left: clamp_unit(self.left),
            right: clamp_unit(self.right),
        }
    }

    pub fn is_stop(&self) -> bool {
        self.left == 0.0 && self.right == 0.0
    }
}

pub(crate) fn clamp_unit(value: f64) -> f64 {
    if value.is_nan() {
        0.0
    } else {
        value.clamp(-1.0, 1.0)
    }
}

/// Last commanded state of one motor group.
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct MotorGroupState {
    pub percent_output: f64,
    pub brake_mode: BrakeMode,
    pub position: i32,
}

/// Sink for drivetrain commands.
pub trait MotionOutput {
    fn set_output(&mut self, side: Side, percent: f64) -> Result;

    fn set_brake_mode(&mut self, mode: BrakeMode) -> Result;

    /// Encoder counts since the last reset.
    fn position(&self, side: Side) -> Result<i32>;

    fn reset_position(&mut self) -> Result;

    /// Commands both motor groups.
    ///
    /// Both sides are always written; the first failure is returned.
    fn drive(&mut self, command: DriveCommand) -> Result {
        let command = command.clamped();
        let left = self.set_output(Side::Left, command.left);
        let right = self.set_output(Side::Right, command.right);
        left.and(right)
    }

    fn stop(&mut self) -> Result {
        self.drive(DriveCommand::STOP)
    }
}

/// In-memory drivetrain used by simulation and tests.
///
/// Every [`MotionOutput::drive`] call is recorded so callers can inspect the
/// exact sequence of commands a tick produced.
#[derive(Debug, Default)]
pub struct SimDrivetrain {
    left: MotorGroupState,
    right: MotorGroupState,
    commands: Vec<DriveCommand>,
    faulted: Option<Side>,
}

impl SimDrivetrain {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn state(&self, side: Side) -> MotorGroupState {
        match side {
            Side::Left => self.left,
            Side::Right => self.right,
        }
    }

    /// The output currently held by both groups.
    pub fn output(&self) -> DriveCommand {
        DriveCommand::new(self.left.percent_output, self.right.percent_output)
    }

    pub fn brake_mode(&self) -> BrakeMode {
        self.left.brake_mode
    }

    /// Every drive command issued so far, oldest first.
    pub fn commands(&self) -> &[DriveCommand] {
        &self.commands
    }

    pub fn clear_commands(&mut self) {
        self.commands.clear();
    }

    /// Makes every subsequent write to `side` fail, or clears the fault with `None`.
    pub fn set_fault(&mut self, side: Option<Side>) {
        self.faulted = side;
    }

    fn group_mut(&mut self, side: Side) -> &mut MotorGroupState {
        match side {
            Side::Left => &mut self.left,
            Side::Right => &mut self.right,
        }
    }
}

impl MotionOutput for SimDrivetrain {
    fn set_output(&mut self, side: Side, percent: f64) -> Result {
        if self.faulted == Some(side) {
            return Err(OutputError::Unresponsive { side });
        }
        self.group_mut(side).percent_output = clamp_unit(percent);
        Ok(())
    }

    fn set_brake_mode(&mut self, mode: BrakeMode) -> Result {
        self.left.brake_mode = mode;
        self.right.brake_mode = mode;
        Ok(())
    }

    fn position(&self, side: Side) -> Result<i32> {
        Ok(self.state(side).position)
    }

    fn reset_position(&mut self) -> Result {
        self.left.position = 0;
        self.right.position = 0;
        Ok(())
    }

    fn drive(&mut self, command: DriveCommand) -> Result {
        let command = command.clamped();
        self.commands.push(command);
        let left = self.set_output(Side::Left, command.left);
        let right = self.set_output(Side::Right, command.right);
        left.and(right)
    }
}

impl Subsystem for SimDrivetrain {
    fn sim_periodic(&mut self) {
        for group in [&mut self.left, &mut self.right] {
            group.position += (group.percent_output * SIM_COUNTS_PER_CYCLE) as i32;
        }
    }
}
