use log::{debug, error, info, warn};

use crate::{
    actuator::ActuatorOutput,
    arbiter::JoystickArbiter,
    config::{AutoFlagSource, RobotConfig},
    controller::{Action, BindingError, ButtonMap},
    drivetrain::{MotionOutput, Side},
    event::EventLoop,
    robot::{ScheduledRobot, TickInputs},
    sequencer::{Sequencer, StepInputs},
    shaper::DriveShaper,
    subsystem::Subsystem,
    Result,
};

/// The competition robot: a drivetrain, the climb pneumatics, and the logic
/// deciding who gets to move them on each tick.
pub struct ClimbRobot<D, A, F> {
    drivetrain: D,
    actuators: A,
    auto_flag: F,
    arbiter: JoystickArbiter,
    sequencer: Sequencer,
    shaper: DriveShaper,
    buttons: ButtonMap,
    events: EventLoop,
}

impl<D, A, F> ClimbRobot<D, A, F>
where
    D: MotionOutput + Subsystem,
    A: ActuatorOutput + Subsystem,
    F: AutoFlagSource,
{
    /// Zeroes the encoders and puts the drivetrain in its released brake mode.
    ///
    /// Manual drive stays disabled until a competition mode hands it out.
    pub fn new(
        mut drivetrain: D,
        actuators: A,
        auto_flag: F,
        config: &RobotConfig,
    ) -> core::result::Result<Self, BindingError> {
        let buttons = config.buttons.button_map()?;

        if let Err(err) = drivetrain.reset_position() {
            warn!("Could not zero drive encoders: {err}");
        }
        if let Err(err) = drivetrain.set_brake_mode(config.sequence.brake.released) {
            warn!("Could not set drive brake mode: {err}");
        }
        info!("Drivetrain initialized");

        Ok(Self {
            drivetrain,
            actuators,
            auto_flag,
            arbiter: JoystickArbiter::new(),
            sequencer: Sequencer::new(config.sequence),
            shaper: config.shaper,
            buttons,
            events: EventLoop::new(),
        })
    }

    pub fn drivetrain(&self) -> &D {
        &self.drivetrain
    }

    pub fn actuators(&self) -> &A {
        &self.actuators
    }

    pub fn sequencer(&self) -> &Sequencer {
        &self.sequencer
    }

    /// The driver's joystick currently reaches the drivetrain.
    pub fn is_manual(&self) -> bool {
        self.arbiter.is_enabled()
    }

    /// One control cycle: sequence first, then the joystick if it owns the drive.
    pub fn tick(&mut self, inputs: &TickInputs) -> Result {
        self.events.poll(&self.buttons, inputs.buttons);
        for action in [Action::Cancel, Action::ClimbUp] {
            if self.events.rising(action) {
                info!("{action} chord pressed");
            }
        }

        let step = StepInputs {
            now: inputs.now,
            cancel: self.events.is_high(Action::Cancel),
            climb_up_pressed: self.events.rising(Action::ClimbUp),
        };
        let sequenced = self
            .sequencer
            .advance(&step, &mut self.drivetrain, &mut self.actuators, &mut self.arbiter);

        let guarded = self.guard_ownership();

        let command = self.shaper.shape(&inputs.joystick);
        let manual = self.arbiter.apply(command, &mut self.drivetrain);

        sequenced.and(guarded).and(manual)
    }

    /// Makes sure exactly one of the sequencer and the driver owns the drivetrain.
    fn guard_ownership(&mut self) -> Result {
        match (self.sequencer.is_active(), self.arbiter.is_enabled()) {
            (false, false) => {
                error!(
                    "Nothing owns the drivetrain in {}, returning it to the driver",
                    self.sequencer.phase()
                );
                self.arbiter.set_enabled(true, &mut self.drivetrain)
            }
            (true, true) => {
                error!(
                    "Joystick enabled while {} is running, disabling it",
                    self.sequencer.phase()
                );
                self.arbiter.set_enabled(false, &mut self.drivetrain)
            }
            _ => Ok(()),
        }
    }
}

impl<D, A, F> ScheduledRobot for ClimbRobot<D, A, F>
where
    D: MotionOutput + Subsystem,
    A: ActuatorOutput + Subsystem,
    F: AutoFlagSource,
{
    fn periodic(&mut self, _: &TickInputs) -> Result {
        self.drivetrain.periodic();
        self.actuators.periodic();

        if let (Ok(left), Ok(right)) = (
            self.drivetrain.position(Side::Left),
            self.drivetrain.position(Side::Right),
        ) {
            debug!("Encoders: left {left}, right {right}");
        }
        Ok(())
    }

    fn sim_periodic(&mut self, _: &TickInputs) -> Result {
        self.drivetrain.sim_periodic();
        self.actuators.sim_periodic();
        Ok(())
    }

    fn disabled_init(&mut self, _: &TickInputs) -> Result {
        info!("Robot disabled");
        self.drivetrain.stop()
    }

    fn autonomous_init(&mut self, inputs: &TickInputs) -> Result {
        let auto_enabled = self.auto_flag.auto_enabled();
        let state = if auto_enabled { "enabled" } else { "disabled" };
        info!("Initializing autonomous, climb down {state}");

        self.events.clear();
        self.sequencer.begin_down(
            auto_enabled,
            inputs.now,
            &mut self.drivetrain,
            &mut self.actuators,
            &mut self.arbiter,
        )
    }

    fn autonomous_periodic(&mut self, inputs: &TickInputs) -> Result {
        self.tick(inputs)
    }

    fn opcontrol_init(&mut self, inputs: &TickInputs) -> Result {
        info!("Initializing operator control");

        self.events.clear();
        self.sequencer
            .arm_up(inputs.now, &mut self.drivetrain, &mut self.actuators, &mut self.arbiter)
    }

    fn opcontrol_periodic(&mut self, inputs: &TickInputs) -> Result {
        self.tick(inputs)
    }
}
