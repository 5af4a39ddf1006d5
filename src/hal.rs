//! V5 hardware bindings.
//!
//! Each side of the drivetrain is a pair of smart motors driven together.
//! The pneumatics are double-acting cylinders on two ADI solenoid ports each.

use core::time::Duration;

use log::{LevelFilter, Metadata, Record};
use pros::core::{task::Interval, time::Instant};
use pros::devices::{
    adi::AdiError,
    competition,
    controller::{Controller, ControllerButton, JoystickAxis},
};
use pros::prelude::*;
use snafu::Snafu;

use crate::{
    actuator::{Actuator, ActuatorCommand, ActuatorOutput},
    climber::ClimbRobot,
    config::{AutoFlagSource, RobotConfig},
    controller::{ButtonId, ButtonSet},
    drivetrain::{self, MotionOutput, Side},
    robot::{self, CompetitionMode, Host, TickInputs},
    shaper::JoystickSample,
    subsystem::Subsystem,
    time::{Clock, Timestamp},
    OutputError, Result,
};

/// Controller buttons in [`ButtonId`] order, starting at 1.
const BUTTONS: [ControllerButton; 12] = [
    ControllerButton::A,
    ControllerButton::B,
    ControllerButton::X,
    ControllerButton::Y,
    ControllerButton::Up,
    ControllerButton::Down,
    ControllerButton::Left,
    ControllerButton::Right,
    ControllerButton::LeftTrigger1,
    ControllerButton::LeftTrigger2,
    ControllerButton::RightTrigger1,
    ControllerButton::RightTrigger2,
];

#[derive(Debug)]
pub struct ProsDrivetrain {
    left: [Motor; 2],
    right: [Motor; 2],
}

impl ProsDrivetrain {
    pub fn new(left: [SmartPort; 2], right: [SmartPort; 2]) -> pros::Result<Self> {
        let [front_left, rear_left] = left;
        let [front_right, rear_right] = right;
        Ok(Self {
            left: [
                Motor::new(front_left, BrakeMode::None)?,
                Motor::new(rear_left, BrakeMode::None)?,
            ],
            right: [
                Motor::new(front_right, BrakeMode::None)?,
                Motor::new(rear_right, BrakeMode::None)?,
            ],
        })
    }

    fn group(&self, side: Side) -> &[Motor; 2] {
        match side {
            Side::Left => &self.left,
            Side::Right => &self.right,
        }
    }

    fn group_mut(&mut self, side: Side) -> &mut [Motor; 2] {
        match side {
            Side::Left => &mut self.left,
            Side::Right => &mut self.right,
        }
    }
}

impl MotionOutput for ProsDrivetrain {
    fn set_output(&mut self, side: Side, percent: f64) -> Result {
        // Right side motors are mounted mirrored.
        let output = match side {
            Side::Left => percent,
            Side::Right => -percent,
        };
        let mut result = Ok(());
        for motor in self.group_mut(side) {
            if motor.set_output(drivetrain::clamp_unit(output) as f32).is_err() {
                result = Err(OutputError::Unresponsive { side });
            }
        }
        result
    }

    fn set_brake_mode(&mut self, mode: drivetrain::BrakeMode) -> Result {
        let mode = match mode {
            drivetrain::BrakeMode::Brake => BrakeMode::Brake,
            drivetrain::BrakeMode::Coast => BrakeMode::None,
        };
        let mut result = Ok(());
        for side in [Side::Left, Side::Right] {
            for motor in self.group_mut(side) {
                if motor.set_brake_mode(mode).is_err() {
                    result = Err(OutputError::Unresponsive { side });
                }
            }
        }
        result
    }

    fn position(&self, side: Side) -> Result<i32> {
        // The rear motor of each side carries the encoder we report.
        let motor = &self.group(side)[1];
        let position = motor
            .position()
            .map_err(|_| OutputError::Unresponsive { side })?;
        Ok(position.into_counts() as i32)
    }

    fn reset_position(&mut self) -> Result {
        let mut result = Ok(());
        for side in [Side::Left, Side::Right] {
            for motor in self.group_mut(side) {
                if motor.zero().is_err() {
                    result = Err(OutputError::Unresponsive { side });
                }
            }
        }
        result
    }
}

impl Subsystem for ProsDrivetrain {}

/// A double-acting cylinder on an extend and a retract solenoid.
#[derive(Debug)]
pub struct Cylinder {
    extend: AdiSolenoid,
    retract: AdiSolenoid,
}

impl Cylinder {
    pub fn new(extend: AdiPort, retract: AdiPort) -> Self {
        Self {
            extend: AdiSolenoid::new(extend),
            retract: AdiSolenoid::new(retract),
        }
    }

    fn set(&mut self, command: ActuatorCommand) -> core::result::Result<(), AdiError> {
        let (extend, retract) = match command {
            ActuatorCommand::Extend => (true, false),
            ActuatorCommand::Retract => (false, true),
            ActuatorCommand::Neutral => (false, false),
        };
        self.extend.set_value(extend)?;
        self.retract.set_value(retract)?;
        Ok(())
    }
}

#[derive(Debug)]
pub struct ProsActuators {
    pistons: Cylinder,
    lever: Cylinder,
}

impl ProsActuators {
    pub fn new(pistons: Cylinder, lever: Cylinder) -> Self {
        Self { pistons, lever }
    }
}

impl ActuatorOutput for ProsActuators {
    fn set(&mut self, actuator: Actuator, command: ActuatorCommand) -> Result {
        let cylinder = match actuator {
            Actuator::Pistons => &mut self.pistons,
            Actuator::Lever => &mut self.lever,
        };
        cylinder
            .set(command)
            .map_err(|_| OutputError::ActuatorFault { actuator })
    }
}

impl Subsystem for ProsActuators {}

/// The field controller and the master controller.
pub struct ProsHost {
    controller: Controller,
    started: Instant,
    interval: Interval,
}

impl ProsHost {
    pub fn new() -> Self {
        Self {
            controller: Controller::Master,
            started: Instant::now(),
            interval: Interval::start(),
        }
    }

    fn axis(&self, axis: JoystickAxis) -> f64 {
        self.controller.joystick_axis(axis).unwrap_or(0.0) as f64
    }
}

impl Clock for ProsHost {
    fn now(&self) -> Timestamp {
        Timestamp::from_millis(self.started.elapsed().as_millis() as u64)
    }
}

impl Host for ProsHost {
    fn mode(&self) -> CompetitionMode {
        match competition::mode() {
            competition::CompetitionMode::Disabled => CompetitionMode::Disabled,
            competition::CompetitionMode::Autonomous => CompetitionMode::Autonomous,
            competition::CompetitionMode::Opcontrol => CompetitionMode::Opcontrol,
        }
    }

    fn sample(&mut self) -> TickInputs {
        // The V5 sticks read positive forward; the shaper expects forward negative.
        let x = self.axis(JoystickAxis::RightX);
        let y = -self.axis(JoystickAxis::LeftY);
        // Max norm, there is no sqrt without std.
        let magnitude = x.abs().max(y.abs());

        let buttons = BUTTONS
            .iter()
            .zip(1..)
            .filter(|(button, _)| self.controller.button(**button).unwrap_or(false))
            .map(|(_, id)| ButtonId(id))
            .collect::<ButtonSet>();

        TickInputs {
            now: self.now(),
            // No throttle lever on a V5 controller, so always full power.
            joystick: JoystickSample::new(x, y, -1.0, magnitude),
            buttons,
        }
    }

    fn delay(&mut self, period: Duration) {
        self.interval.delay(period);
    }
}

struct ProsLogger;

impl log::Log for ProsLogger {
    fn enabled(&self, metadata: &Metadata<'_>) -> bool {
        metadata.level() <= log::max_level()
    }

    fn log(&self, record: &Record<'_>) {
        if self.enabled(record.metadata()) {
            println!("{} {} - {}", record.level(), record.target(), record.args());
        }
    }

    fn flush(&self) {}
}

static LOGGER: ProsLogger = ProsLogger;

/// Builds the robot on the standard port map and runs it forever.
///
/// Left drive on smart ports 1 and 2, right drive on 3 and 4. The pistons
/// use ADI ports A and B, the lever C and D.
///
/// The brain has no `std`, so robot builds must pass `--no-default-features`.
pub fn run(auto_flag: impl AutoFlagSource, config: &RobotConfig) -> pros::Result {
    if log::set_logger(&LOGGER).is_ok() {
        log::set_max_level(LevelFilter::Info);
    }

    let peripherals = Peripherals::take().ok_or(PeripheralsTaken)?;
    let drivetrain = ProsDrivetrain::new(
        [peripherals.smart_1, peripherals.smart_2],
        [peripherals.smart_3, peripherals.smart_4],
    )?;
    let actuators = ProsActuators::new(
        Cylinder::new(peripherals.adi_a, peripherals.adi_b),
        Cylinder::new(peripherals.adi_c, peripherals.adi_d),
    );
    let robot = ClimbRobot::new(drivetrain, actuators, auto_flag, config)?;

    robot::start_robot(robot, ProsHost::new())
}

#[derive(Debug, Snafu)]
#[snafu(display("The robot's peripherals were already taken."))]
struct PeripheralsTaken;
