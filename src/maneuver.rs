use core::time::Duration;

use log::debug;

use crate::{
    drivetrain::{DriveCommand, MotionOutput},
    time::{self, Timestamp},
    Result,
};

/// What a timed drive wants from the drivetrain at a given instant.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum ManeuverStep {
    /// Still inside the drive window; hold this command.
    Driving(DriveCommand),
    /// The deadline has passed; the drivetrain must be stopped.
    Complete,
}

/// Drive both sides at fixed power for a fixed time.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct TimedDrive {
    pub command: DriveCommand,
    pub duration: Duration,
}

impl TimedDrive {
    pub const fn new(left: f64, right: f64, duration: Duration) -> Self {
        Self {
            command: DriveCommand::new(left, right),
            duration,
        }
    }

    /// Builds a timed drive from a duration in seconds.
    pub fn from_seconds(left: f64, right: f64, seconds: f64) -> Self {
        Self::new(left, right, time::seconds(seconds))
    }

    pub fn deadline(&self, start: Timestamp) -> Timestamp {
        start + self.duration
    }

    pub fn poll(&self, start: Timestamp, now: Timestamp) -> ManeuverStep {
        if now >= self.deadline(start) {
            ManeuverStep::Complete
        } else {
            ManeuverStep::Driving(self.command)
        }
    }

    /// Drives until `duration` has elapsed since `start`, then stops.
    ///
    /// Returns `true` on the first call at or after the deadline, which also
    /// commands a full stop. The caller is expected to move on afterwards.
    pub fn advance(
        &self,
        start: Timestamp,
        now: Timestamp,
        output: &mut impl MotionOutput,
    ) -> Result<bool> {
        match self.poll(start, now) {
            ManeuverStep::Driving(command) => {
                output.drive(command)?;
                Ok(false)
            }
            ManeuverStep::Complete => {
                debug!("Timed drive started at {start} finished at {now}");
                output.stop()?;
                Ok(true)
            }
        }
    }
}
