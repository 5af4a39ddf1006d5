use log::info;

use crate::{
    drivetrain::{DriveCommand, MotionOutput},
    Result,
};

/// Decides whether the driver's joystick reaches the drivetrain.
///
/// Manual drive starts disabled; whoever owns the drivetrain at startup must
/// hand it over explicitly.
#[derive(Debug, Default)]
pub struct JoystickArbiter {
    enabled: bool,
}

impl JoystickArbiter {
    pub const fn new() -> Self {
        Self { enabled: false }
    }

    pub const fn is_enabled(&self) -> bool {
        self.enabled
    }

    /// Hands the drivetrain to (or takes it from) the driver.
    ///
    /// Always stops the drivetrain so no command from the previous owner
    /// survives the handoff.
    pub fn set_enabled(&mut self, enabled: bool, output: &mut impl MotionOutput) -> Result {
        self.enabled = enabled;
        let stopped = output.stop();

        if enabled {
            info!("Joystick enabled");
        } else {
            info!("Joystick disabled");
        }
        stopped
    }

    /// Forwards a shaped joystick command, or does nothing while disabled.
    pub fn apply(&self, command: DriveCommand, output: &mut impl MotionOutput) -> Result {
        if !self.enabled {
            return Ok(());
        }
        output.drive(command)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::drivetrain::SimDrivetrain;

    #[test]
    fn disabled_arbiter_ignores_the_joystick() {
        let arbiter = JoystickArbiter::new();
        let mut drivetrain = SimDrivetrain::new();

        arbiter.apply(DriveCommand::new(0.7, 0.7), &mut drivetrain).unwrap();
        assert!(drivetrain.commands().is_empty());
    }

    #[test]
    fn enabling_stops_then_passes_commands_through() {
        let mut arbiter = JoystickArbiter::new();
        let mut drivetrain = SimDrivetrain::new();

        arbiter.set_enabled(true, &mut drivetrain).unwrap();
        arbiter.apply(DriveCommand::new(0.7, -0.2), &mut drivetrain).unwrap();

        assert!(arbiter.is_enabled());
        assert_eq!(drivetrain.commands(), &[DriveCommand::STOP, DriveCommand::new(0.7, -0.2)]);
    }

    #[test]
    fn disabling_clears_a_stale_command() {
        let mut arbiter = JoystickArbiter::new();
        let mut drivetrain = SimDrivetrain::new();
        arbiter.set_enabled(true, &mut drivetrain).unwrap();
        arbiter.apply(DriveCommand::new(1.0, 1.0), &mut drivetrain).unwrap();

        arbiter.set_enabled(false, &mut drivetrain).unwrap();

        assert!(!arbiter.is_enabled());
        assert_eq!(drivetrain.output(), DriveCommand::STOP);
    }

    #[test]
    fn enabling_twice_is_harmless() {
        let mut once = SimDrivetrain::new();
        let mut arbiter = JoystickArbiter::new();
        arbiter.set_enabled(true, &mut once).unwrap();

        let mut twice = SimDrivetrain::new();
        let mut arbiter_twice = JoystickArbiter::new();
        arbiter_twice.set_enabled(true, &mut twice).unwrap();
        arbiter_twice.set_enabled(true, &mut twice).unwrap();

        assert_eq!(arbiter.is_enabled(), arbiter_twice.is_enabled());
        assert_eq!(once.output(), twice.output());
        assert!(twice.commands().iter().all(DriveCommand::is_stop));
    }
}
