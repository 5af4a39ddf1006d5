use core::time::Duration;

use log::{error, info};

use crate::{
    controller::ButtonSet,
    shaper::JoystickSample,
    time::{Clock, Timestamp},
    Result,
};

/// Returns true if the code is running on a real robot and not in simulation.
pub const fn is_real() -> bool {
    cfg!(target_os = "vexos")
}

/// Returns true if the code is running in simulation and not on a real robot.
pub const fn is_sim() -> bool {
    !is_real()
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CompetitionMode {
    Disabled,
    Autonomous,
    Opcontrol,
}

/// Everything the robot reads from the outside world on one tick.
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct TickInputs {
    pub now: Timestamp,
    pub joystick: JoystickSample,
    pub buttons: ButtonSet,
}

#[allow(unused_variables)]
pub trait ScheduledRobot {
    fn periodic(&mut self, inputs: &TickInputs) -> Result {
        Ok(())
    }
    fn sim_periodic(&mut self, inputs: &TickInputs) -> Result {
        Ok(())
    }
    fn disabled_init(&mut self, inputs: &TickInputs) -> Result {
        Ok(())
    }
    fn disabled_periodic(&mut self, inputs: &TickInputs) -> Result {
        Ok(())
    }
    fn autonomous_init(&mut self, inputs: &TickInputs) -> Result {
        Ok(())
    }
    fn autonomous_periodic(&mut self, inputs: &TickInputs) -> Result {
        Ok(())
    }
    fn opcontrol_init(&mut self, inputs: &TickInputs) -> Result {
        Ok(())
    }
    fn opcontrol_periodic(&mut self, inputs: &TickInputs) -> Result {
        Ok(())
    }
}

pub const ITERATION_PERIOD: Duration = Duration::from_millis(20);

/// Where a robot program runs: the field controller, the driver's inputs and
/// the loop timer.
pub trait Host: Clock {
    fn mode(&self) -> CompetitionMode;

    /// Snapshots the driver's controller for this tick.
    fn sample(&mut self) -> TickInputs;

    fn delay(&mut self, period: Duration);
}

/// Calls a robot's init hook whenever the competition mode changes, then its
/// periodic hooks.
#[derive(Debug, Default)]
pub struct ModeDispatcher {
    previous_mode: Option<CompetitionMode>,
}

impl ModeDispatcher {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn previous_mode(&self) -> Option<CompetitionMode> {
        self.previous_mode
    }

    /// Runs one control cycle.
    ///
    /// A failing hook does not skip the ones after it; the first error is
    /// returned once the cycle is complete.
    pub fn tick(
        &mut self,
        robot: &mut impl ScheduledRobot,
        mode: CompetitionMode,
        inputs: &TickInputs,
    ) -> Result {
        let entering = self.previous_mode != Some(mode);
        if entering {
            info!("Entering {mode:?}");
        }

        let mut result = Ok(());
        match mode {
            CompetitionMode::Disabled => {
                if entering {
                    result = result.and(robot.disabled_init(inputs));
                }
                result = result.and(robot.disabled_periodic(inputs));
            }
            CompetitionMode::Autonomous => {
                if entering {
                    result = result.and(robot.autonomous_init(inputs));
                }
                result = result.and(robot.autonomous_periodic(inputs));
            }
            CompetitionMode::Opcontrol => {
                if entering {
                    result = result.and(robot.opcontrol_init(inputs));
                }
                result = result.and(robot.opcontrol_periodic(inputs));
            }
        }
        self.previous_mode = Some(mode);

        result = result.and(robot.periodic(inputs));
        if is_sim() {
            result = result.and(robot.sim_periodic(inputs));
        }
        result
    }
}

/// Runs `robot` forever at [`ITERATION_PERIOD`].
///
/// Errors are logged and the loop carries on; a failed write must not cost
/// the robot its next tick.
pub fn start_robot(mut robot: impl ScheduledRobot, mut host: impl Host) -> ! {
    let mut dispatcher = ModeDispatcher::new();

    loop {
        let mode = host.mode();
        let inputs = host.sample();
        if let Err(err) = dispatcher.tick(&mut robot, mode, &inputs) {
            error!("Control cycle at {} failed: {err}", inputs.now);
        }

        host.delay(ITERATION_PERIOD);
    }
}
