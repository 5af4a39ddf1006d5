//! Climb maneuver sequencing.
//!
//! Two fixed sequences are supported. Climbing down off the platform runs in
//! autonomous:
//!
//! ```text
//! DownWaitCmd -> DownPistonExtend -> DownDriveY -> DownPistonRetract -> DownDriveZ -> DownDone
//! ```
//!
//! Climbing up runs in operator control once the driver holds the climb chord:
//!
//! ```text
//! UpWaitCmd -> UpLeverExtend -> UpDriveZ -> UpPistonExtend -> UpDriveA
//!           -> UpLeverRetract -> UpDriveB -> UpPistonRetract -> UpDriveC -> UpDone
//! ```
//!
//! Actuation phases hold a solenoid for a fixed time; drive phases run a
//! [`TimedDrive`](crate::maneuver::TimedDrive). Each phase carries its own
//! timing, so nothing from a finished or abandoned phase can leak into the
//! next one. [`transition`] is
//! the pure step function; [`Sequencer`] owns the current phase and pushes the
//! resulting [`Effects`] out to the hardware.

use core::fmt;

use log::{error, info};

use crate::{
    actuator::{Actuator, ActuatorCommand, ActuatorOutput},
    arbiter::JoystickArbiter,
    config::{Leg, SequenceConfig},
    drivetrain::{BrakeMode, DriveCommand, MotionOutput},
    maneuver::ManeuverStep,
    time::Timestamp,
    Result,
};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Sequence {
    Down,
    Up,
}

impl Sequence {
    /// Where the sequence settles after it is cancelled or found in a bad state.
    ///
    /// Climbing down only happens once per match, so it rests in `DownDone`.
    /// Climbing up goes back to waiting so the driver can try again.
    pub const fn rest_phase(self) -> Phase {
        match self {
            Self::Down => Phase::DownDone,
            Self::Up => Phase::UpWaitCmd,
        }
    }

    fn brake_engaged(self, config: &SequenceConfig) -> bool {
        match self {
            Self::Down => config.brake.engage_during_down,
            Self::Up => config.brake.engage_during_up,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Phase {
    DownWaitCmd,
    DownPistonExtend { until: Timestamp },
    DownDriveY { started: Timestamp },
    DownPistonRetract { until: Timestamp },
    DownDriveZ { started: Timestamp },
    DownDone,
    UpWaitCmd,
    UpLeverExtend { until: Timestamp },
    UpDriveZ { started: Timestamp },
    UpPistonExtend { until: Timestamp },
    UpDriveA { started: Timestamp },
    UpLeverRetract { until: Timestamp },
    UpDriveB { started: Timestamp },
    UpPistonRetract { until: Timestamp },
    UpDriveC { started: Timestamp },
    UpDone,
}

impl Phase {
    pub const fn sequence(&self) -> Sequence {
        match self {
            Self::DownWaitCmd
            | Self::DownPistonExtend { .. }
            | Self::DownDriveY { .. }
            | Self::DownPistonRetract { .. }
            | Self::DownDriveZ { .. }
            | Self::DownDone => Sequence::Down,
            _ => Sequence::Up,
        }
    }

    /// Waiting for a command or finished; nothing is being driven.
    pub const fn is_idle(&self) -> bool {
        matches!(
            self,
            Self::DownWaitCmd | Self::DownDone | Self::UpWaitCmd | Self::UpDone
        )
    }

    pub const fn is_done(&self) -> bool {
        matches!(self, Self::DownDone | Self::UpDone)
    }

    /// The solenoid this phase holds, the command it holds it at, and until when.
    pub const fn actuation(&self) -> Option<(Actuator, ActuatorCommand, Timestamp)> {
        use ActuatorCommand::{Extend, Retract};
        use Actuator::{Lever, Pistons};

        match *self {
            Self::DownPistonExtend { until } | Self::UpPistonExtend { until } => {
                Some((Pistons, Extend, until))
            }
            Self::DownPistonRetract { until } | Self::UpPistonRetract { until } => {
                Some((Pistons, Retract, until))
            }
            Self::UpLeverExtend { until } => Some((Lever, Extend, until)),
            Self::UpLeverRetract { until } => Some((Lever, Retract, until)),
            _ => None,
        }
    }

    pub const fn name(&self) -> &'static str {
        match self {
            Self::DownWaitCmd => "DownWaitCmd",
            Self::DownPistonExtend { .. } => "DownPistonExtend",
            Self::DownDriveY { .. } => "DownDriveY",
            Self::DownPistonRetract { .. } => "DownPistonRetract",
            Self::DownDriveZ { .. } => "DownDriveZ",
            Self::DownDone => "DownDone",
            Self::UpWaitCmd => "UpWaitCmd",
            Self::UpLeverExtend { .. } => "UpLeverExtend",
            Self::UpDriveZ { .. } => "UpDriveZ",
            Self::UpPistonExtend { .. } => "UpPistonExtend",
            Self::UpDriveA { .. } => "UpDriveA",
            Self::UpLeverRetract { .. } => "UpLeverRetract",
            Self::UpDriveB { .. } => "UpDriveB",
            Self::UpPistonRetract { .. } => "UpPistonRetract",
            Self::UpDriveC { .. } => "UpDriveC",
            Self::UpDone => "UpDone",
        }
    }
}

impl fmt::Display for Phase {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// What the sequencer sees of the world on one tick.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct StepInputs {
    pub now: Timestamp,
    /// The cancel chord is held.
    pub cancel: bool,
    /// The climb-up chord went down this tick. Holding it does not re-arm.
    pub climb_up_pressed: bool,
}

/// Output requests produced by one transition.
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct Effects {
    pub drive: Option<DriveCommand>,
    pub actuator: Option<(Actuator, ActuatorCommand)>,
    pub brake: Option<BrakeMode>,
    /// `Some(true)` hands the drivetrain to the driver, `Some(false)` takes it.
    pub manual: Option<bool>,
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Transition {
    pub phase: Phase,
    pub effects: Effects,
}

impl Transition {
    const fn stay(phase: Phase) -> Self {
        Self {
            phase,
            effects: Effects {
                drive: None,
                actuator: None,
                brake: None,
                manual: None,
            },
        }
    }
}

/// Starts the climb-down sequence, or skips straight to `DownDone` when
/// autonomous is disabled.
pub fn activate_down(auto_enabled: bool, now: Timestamp, config: &SequenceConfig) -> Transition {
    if !auto_enabled {
        return Transition {
            phase: Phase::DownDone,
            effects: Effects {
                manual: Some(true),
                ..Effects::default()
            },
        };
    }

    let step = Step {
        sequence: Sequence::Down,
        phase: Phase::DownWaitCmd,
        now,
        config,
    };
    step.take_over(Phase::DownPistonExtend {
        until: now + config.actuation_time(),
    })
}

/// Advances `phase` by at most one step while running `sequence`.
pub fn transition(
    sequence: Sequence,
    phase: Phase,
    inputs: &StepInputs,
    config: &SequenceConfig,
) -> Transition {
    use Phase::*;

    let step = Step {
        sequence,
        phase,
        now: inputs.now,
        config,
    };

    if phase.sequence() != sequence {
        error!(
            "Phase {phase} does not belong to the {sequence:?} sequence, \
             returning control to the driver"
        );
        return step.abandon();
    }

    if inputs.cancel && !phase.is_idle() {
        info!("{sequence:?} sequence cancelled during {phase}");
        return step.abandon();
    }

    let now = inputs.now;
    let actuation_end = now + config.actuation_time();

    match phase {
        DownWaitCmd | DownDone | UpDone => Transition::stay(phase),
        UpWaitCmd if inputs.climb_up_pressed && !inputs.cancel => {
            step.take_over(UpLeverExtend { until: actuation_end })
        }
        UpWaitCmd => Transition::stay(phase),

        DownPistonExtend { .. } => step.hold(DownDriveY { started: now }),
        DownDriveY { started } => {
            step.drive(config.down_y, started, DownPistonRetract { until: actuation_end })
        }
        DownPistonRetract { .. } => step.hold(DownDriveZ { started: now }),
        DownDriveZ { started } => step.drive(config.down_z, started, DownDone),

        UpLeverExtend { .. } => step.hold(UpDriveZ { started: now }),
        UpDriveZ { started } => {
            step.drive(config.up_z, started, UpPistonExtend { until: actuation_end })
        }
        UpPistonExtend { .. } => step.hold(UpDriveA { started: now }),
        UpDriveA { started } => {
            step.drive(config.up_a, started, UpLeverRetract { until: actuation_end })
        }
        UpLeverRetract { .. } => step.hold(UpDriveB { started: now }),
        UpDriveB { started } => {
            step.drive(config.up_b, started, UpPistonRetract { until: actuation_end })
        }
        UpPistonRetract { .. } => step.hold(UpDriveC { started: now }),
        UpDriveC { started } => step.drive(config.up_c, started, UpDone),
    }
}

struct Step<'a> {
    sequence: Sequence,
    phase: Phase,
    now: Timestamp,
    config: &'a SequenceConfig,
}

impl Step<'_> {
    /// Effects of arriving in `next`.
    fn enter(&self, next: Phase) -> Transition {
        let mut effects = Effects::default();

        if let Some((actuator, command, _)) = next.actuation() {
            effects.actuator = Some((actuator, command));
        }
        if next.is_done() {
            effects.manual = Some(true);
            if self.sequence.brake_engaged(self.config) {
                effects.brake = Some(self.config.brake.released);
            }
        }

        Transition { phase: next, effects }
    }

    /// Takes the drivetrain away from the driver and starts the sequence at `first`.
    fn take_over(&self, first: Phase) -> Transition {
        let mut transition = self.enter(first);
        transition.effects.manual = Some(false);
        transition.effects.drive = Some(DriveCommand::STOP);
        if self.sequence.brake_engaged(self.config) {
            transition.effects.brake = Some(self.config.brake.engaged);
        }
        transition
    }

    /// Keeps a solenoid at its active output until its time is up, then neutral.
    fn hold(&self, next: Phase) -> Transition {
        let Some((actuator, command, until)) = self.phase.actuation() else {
            return Transition::stay(self.phase);
        };

        let mut transition = if self.now >= until {
            let mut transition = self.enter(next);
            transition.effects.actuator = Some((actuator, ActuatorCommand::Neutral));
            transition
        } else {
            let mut transition = Transition::stay(self.phase);
            transition.effects.actuator = Some((actuator, command));
            transition
        };
        transition.effects.drive = Some(DriveCommand::STOP);
        transition
    }

    fn drive(&self, leg: Leg, started: Timestamp, next: Phase) -> Transition {
        match leg.maneuver().poll(started, self.now) {
            ManeuverStep::Driving(command) => {
                let mut transition = Transition::stay(self.phase);
                transition.effects.drive = Some(command);
                transition
            }
            ManeuverStep::Complete => {
                let mut transition = self.enter(next);
                transition.effects.drive = Some(DriveCommand::STOP);
                transition
            }
        }
    }

    /// Gives up on the running phase and returns the drivetrain to the driver.
    fn abandon(&self) -> Transition {
        let mut effects = Effects {
            manual: Some(true),
            ..Effects::default()
        };
        if let Some((actuator, _, _)) = self.phase.actuation() {
            effects.actuator = Some((actuator, ActuatorCommand::Neutral));
        }
        if self.config.brake.restore_on_cancel && self.sequence.brake_engaged(self.config) {
            effects.brake = Some(self.config.brake.released);
        }

        Transition {
            phase: self.sequence.rest_phase(),
            effects,
        }
    }
}

/// Owns the running sequence and its current phase.
#[derive(Debug, Clone)]
pub struct Sequencer {
    sequence: Sequence,
    phase: Phase,
    config: SequenceConfig,
}

impl Sequencer {
    pub fn new(config: SequenceConfig) -> Self {
        Self::resume(Sequence::Down, Phase::DownWaitCmd, config)
    }

    /// Builds a sequencer already sitting in `phase`.
    pub fn resume(sequence: Sequence, phase: Phase, config: SequenceConfig) -> Self {
        Self { sequence, phase, config }
    }

    pub fn phase(&self) -> Phase {
        self.phase
    }

    pub fn sequence(&self) -> Sequence {
        self.sequence
    }

    pub fn config(&self) -> &SequenceConfig {
        &self.config
    }

    /// A sequence is mid-flight and owns the drivetrain.
    pub fn is_active(&self) -> bool {
        !self.phase.is_idle()
    }

    /// Starts climbing down at the beginning of autonomous.
    pub fn begin_down(
        &mut self,
        auto_enabled: bool,
        now: Timestamp,
        drive: &mut impl MotionOutput,
        actuators: &mut impl ActuatorOutput,
        arbiter: &mut JoystickArbiter,
    ) -> Result {
        let wound_down = self.wind_down(now, drive, actuators, arbiter);

        if !auto_enabled {
            info!("Autonomous disabled, skipping climb down");
        }
        self.sequence = Sequence::Down;
        let transition = activate_down(auto_enabled, now, &self.config);
        let started = self.commit(transition, drive, actuators, arbiter);

        wound_down.and(started)
    }

    /// Waits for the climb-up chord, abandoning anything still running.
    pub fn arm_up(
        &mut self,
        now: Timestamp,
        drive: &mut impl MotionOutput,
        actuators: &mut impl ActuatorOutput,
        arbiter: &mut JoystickArbiter,
    ) -> Result {
        let wound_down = self.wind_down(now, drive, actuators, arbiter);

        let mut transition = Transition::stay(Phase::UpWaitCmd);
        transition.effects.manual = Some(true);

        self.sequence = Sequence::Up;
        let armed = self.commit(transition, drive, actuators, arbiter);

        wound_down.and(armed)
    }

    /// Brings a sequence cut short by a mode change back to rest: its
    /// actuator to neutral and the brake released. Ownership of the drive is
    /// left to whatever starts next.
    fn wind_down(
        &mut self,
        now: Timestamp,
        drive: &mut impl MotionOutput,
        actuators: &mut impl ActuatorOutput,
        arbiter: &mut JoystickArbiter,
    ) -> Result {
        if !self.is_active() {
            return Ok(());
        }

        info!("{:?} sequence still running at {now}, abandoning it", self.sequence);
        let mut transition = Step {
            sequence: self.sequence,
            phase: self.phase,
            now,
            config: &self.config,
        }
        .abandon();
        transition.effects.manual = None;
        self.commit(transition, drive, actuators, arbiter)
    }

    /// Runs one tick of the current sequence.
    pub fn advance(
        &mut self,
        inputs: &StepInputs,
        drive: &mut impl MotionOutput,
        actuators: &mut impl ActuatorOutput,
        arbiter: &mut JoystickArbiter,
    ) -> Result {
        let transition = transition(self.sequence, self.phase, inputs, &self.config);
        self.commit(transition, drive, actuators, arbiter)
    }

    /// Moves to the transition's phase and pushes its effects out.
    ///
    /// Every output is attempted even if an earlier one fails; the first
    /// failure is returned.
    fn commit(
        &mut self,
        transition: Transition,
        drive: &mut impl MotionOutput,
        actuators: &mut impl ActuatorOutput,
        arbiter: &mut JoystickArbiter,
    ) -> Result {
        if transition.phase != self.phase {
            info!("{} -> {}", self.phase, transition.phase);
        }
        self.phase = transition.phase;

        let Effects {
            drive: command,
            actuator,
            brake,
            manual,
        } = transition.effects;
        let mut result = Ok(());

        if manual == Some(false) {
            result = result.and(arbiter.set_enabled(false, drive));
        }
        if let Some(mode) = brake {
            result = result.and(drive.set_brake_mode(mode));
        }
        if let Some((actuator, command)) = actuator {
            result = result.and(actuators.set(actuator, command));
        }
        if let Some(command) = command {
            result = result.and(drive.drive(command));
        }
        if manual == Some(true) {
            result = result.and(arbiter.set_enabled(true, drive));
        }

        result
    }
}

#[cfg(test)]
mod tests {
    use alloc::vec::Vec;
    use core::time::Duration;

    use super::*;
    use crate::{actuator::SimActuators, drivetrain::SimDrivetrain, OutputError, Side};

    fn at(millis: u64) -> Timestamp {
        Timestamp::from_millis(millis)
    }

    struct Rig {
        sequencer: Sequencer,
        drive: SimDrivetrain,
        actuators: SimActuators,
        arbiter: JoystickArbiter,
    }

    impl Rig {
        fn new(sequencer: Sequencer) -> Self {
            Self {
                sequencer,
                drive: SimDrivetrain::new(),
                actuators: SimActuators::new(),
                arbiter: JoystickArbiter::new(),
            }
        }

        fn down(auto_enabled: bool) -> Self {
            let mut rig = Self::new(Sequencer::new(SequenceConfig::default()));
            rig.sequencer
                .begin_down(
                    auto_enabled,
                    at(0),
                    &mut rig.drive,
                    &mut rig.actuators,
                    &mut rig.arbiter,
                )
                .unwrap();
            rig
        }

        fn up() -> Self {
            let mut rig = Self::new(Sequencer::new(SequenceConfig::default()));
            rig.sequencer
                .arm_up(at(0), &mut rig.drive, &mut rig.actuators, &mut rig.arbiter)
                .unwrap();
            rig
        }

        fn tick(&mut self, now: u64, cancel: bool, climb_up: bool) -> Result {
            let inputs = StepInputs {
                now: at(now),
                cancel,
                climb_up_pressed: climb_up,
            };
            self.sequencer
                .advance(&inputs, &mut self.drive, &mut self.actuators, &mut self.arbiter)
        }

        fn run_until_idle(&mut self, from: u64, climb_up: bool) -> Vec<&'static str> {
            let mut phases = alloc::vec![self.sequencer.phase().name()];
            let mut now = from;
            while self.sequencer.is_active() || now == from {
                self.tick(now, false, climb_up).unwrap();
                let name = self.sequencer.phase().name();
                if phases.last() != Some(&name) {
                    phases.push(name);
                }
                now += 1;
                assert!(now < 60_000, "sequence never finished");
            }
            phases
        }
    }

    #[test]
    fn climb_down_timeline() {
        let mut rig = Rig::down(true);
        let drive_power = DriveCommand::new(0.25, 0.25);

        assert!(!rig.arbiter.is_enabled());
        assert_eq!(rig.drive.brake_mode(), BrakeMode::Brake);
        assert_eq!(rig.actuators.command(Actuator::Pistons), ActuatorCommand::Extend);

        for now in 0..=4_800 {
            rig.tick(now, false, false).unwrap();
            let phase = rig.sequencer.phase();
            let output = rig.drive.output();
            let pistons = rig.actuators.command(Actuator::Pistons);

            match now {
                0..=1_999 => {
                    assert!(matches!(phase, Phase::DownPistonExtend { .. }), "{now}: {phase}");
                    assert_eq!(pistons, ActuatorCommand::Extend);
                    assert_eq!(output, DriveCommand::STOP);
                }
                2_000 => {
                    assert_eq!(phase, Phase::DownDriveY { started: at(2_000) });
                    assert_eq!(pistons, ActuatorCommand::Neutral);
                    assert_eq!(output, DriveCommand::STOP);
                }
                2_001..=2_374 => {
                    assert_eq!(phase, Phase::DownDriveY { started: at(2_000) });
                    assert_eq!(output, drive_power, "{now}");
                }
                2_375 => {
                    assert_eq!(phase, Phase::DownPistonRetract { until: at(4_375) });
                    assert_eq!(pistons, ActuatorCommand::Retract);
                    assert_eq!(output, DriveCommand::STOP);
                }
                2_376..=4_374 => {
                    assert!(matches!(phase, Phase::DownPistonRetract { .. }), "{now}: {phase}");
                    assert_eq!(pistons, ActuatorCommand::Retract);
                    assert_eq!(output, DriveCommand::STOP);
                }
                4_375 => {
                    assert_eq!(phase, Phase::DownDriveZ { started: at(4_375) });
                    assert_eq!(pistons, ActuatorCommand::Neutral);
                }
                4_376..=4_749 => {
                    assert_eq!(output, drive_power, "{now}");
                    assert!(!rig.arbiter.is_enabled());
                    assert_eq!(rig.drive.brake_mode(), BrakeMode::Brake);
                }
                _ => {
                    assert_eq!(phase, Phase::DownDone);
                    assert_eq!(output, DriveCommand::STOP);
                    assert!(rig.arbiter.is_enabled());
                    assert_eq!(rig.drive.brake_mode(), BrakeMode::Coast);
                }
            }
        }
    }

    #[test]
    fn climb_down_skipped_when_auto_disabled() {
        let mut rig = Rig::down(false);

        assert_eq!(rig.sequencer.phase(), Phase::DownDone);
        assert!(rig.arbiter.is_enabled());
        assert!(rig.actuators.history().is_empty());

        rig.tick(50, false, false).unwrap();
        assert_eq!(rig.sequencer.phase(), Phase::DownDone);
        assert_eq!(rig.drive.brake_mode(), BrakeMode::Coast);
    }

    #[test]
    fn climb_up_waits_for_the_chord() {
        let mut rig = Rig::up();
        assert!(rig.arbiter.is_enabled());

        rig.tick(20, false, false).unwrap();
        assert_eq!(rig.sequencer.phase(), Phase::UpWaitCmd);
        assert!(rig.arbiter.is_enabled());

        rig.tick(40, false, true).unwrap();
        assert_eq!(rig.sequencer.phase(), Phase::UpLeverExtend { until: at(2_040) });
        assert!(!rig.arbiter.is_enabled());
        assert_eq!(rig.actuators.command(Actuator::Lever), ActuatorCommand::Extend);
        assert_eq!(rig.drive.output(), DriveCommand::STOP);
    }

    #[test]
    fn climb_up_runs_every_phase_in_order() {
        let mut rig = Rig::up();

        let phases = rig.run_until_idle(100, true);

        assert_eq!(
            phases,
            [
                "UpWaitCmd",
                "UpLeverExtend",
                "UpDriveZ",
                "UpPistonExtend",
                "UpDriveA",
                "UpLeverRetract",
                "UpDriveB",
                "UpPistonRetract",
                "UpDriveC",
                "UpDone",
            ]
        );
        assert!(rig.arbiter.is_enabled());
        assert_eq!(rig.drive.output(), DriveCommand::STOP);
        assert_eq!(rig.actuators.command(Actuator::Lever), ActuatorCommand::Neutral);
        assert_eq!(rig.actuators.command(Actuator::Pistons), ActuatorCommand::Neutral);

        // The chord does nothing once the climb is finished.
        rig.tick(60_000, false, true).unwrap();
        assert_eq!(rig.sequencer.phase(), Phase::UpDone);
    }

    #[test]
    fn climb_up_drive_legs_use_their_own_power() {
        let config = SequenceConfig::default();
        let mut rig = Rig::new(Sequencer::resume(
            Sequence::Up,
            Phase::UpDriveB { started: at(0) },
            config,
        ));

        rig.tick(10, false, false).unwrap();
        assert_eq!(rig.drive.output(), DriveCommand::new(config.up_b.power, config.up_b.power));
    }

    fn active_phases() -> Vec<(Sequence, Phase)> {
        let until = at(10_000);
        let started = at(900);
        alloc::vec![
            (Sequence::Down, Phase::DownPistonExtend { until }),
            (Sequence::Down, Phase::DownDriveY { started }),
            (Sequence::Down, Phase::DownPistonRetract { until }),
            (Sequence::Down, Phase::DownDriveZ { started }),
            (Sequence::Up, Phase::UpLeverExtend { until }),
            (Sequence::Up, Phase::UpDriveZ { started }),
            (Sequence::Up, Phase::UpPistonExtend { until }),
            (Sequence::Up, Phase::UpDriveA { started }),
            (Sequence::Up, Phase::UpLeverRetract { until }),
            (Sequence::Up, Phase::UpDriveB { started }),
            (Sequence::Up, Phase::UpPistonRetract { until }),
            (Sequence::Up, Phase::UpDriveC { started }),
        ]
    }

    #[test]
    fn cancel_from_any_active_phase() {
        for (sequence, phase) in active_phases() {
            let mut rig = Rig::new(Sequencer::resume(sequence, phase, SequenceConfig::default()));
            rig.drive.set_brake_mode(BrakeMode::Brake).unwrap();
            rig.drive.drive(DriveCommand::new(0.5, 0.5)).unwrap();

            rig.tick(1_000, true, false).unwrap();

            assert_eq!(rig.sequencer.phase(), sequence.rest_phase(), "cancelling {phase}");
            assert!(rig.arbiter.is_enabled(), "cancelling {phase}");
            assert_eq!(rig.drive.output(), DriveCommand::STOP, "cancelling {phase}");
            if let Some((actuator, _, _)) = phase.actuation() {
                assert_eq!(rig.actuators.command(actuator), ActuatorCommand::Neutral);
            }
            let expected_brake = match sequence {
                Sequence::Down => BrakeMode::Coast,
                Sequence::Up => BrakeMode::Brake,
            };
            assert_eq!(rig.drive.brake_mode(), expected_brake, "cancelling {phase}");
        }
    }

    #[test]
    fn cancel_beats_a_phase_finishing_on_the_same_tick() {
        let config = SequenceConfig::default();
        let mut rig = Rig::new(Sequencer::resume(
            Sequence::Up,
            Phase::UpPistonExtend { until: at(100) },
            config,
        ));

        rig.tick(100, true, false).unwrap();

        assert_eq!(rig.sequencer.phase(), Phase::UpWaitCmd);
        assert_eq!(rig.drive.commands(), &[DriveCommand::STOP]);
    }

    #[test]
    fn cancelled_climb_up_can_be_rearmed() {
        let mut rig = Rig::up();
        rig.tick(0, false, true).unwrap();
        rig.tick(500, true, true).unwrap();
        assert_eq!(rig.sequencer.phase(), Phase::UpWaitCmd);

        // Pressing climb-up while cancel is held does not restart the climb.
        rig.tick(520, true, true).unwrap();
        assert_eq!(rig.sequencer.phase(), Phase::UpWaitCmd);
        assert!(rig.arbiter.is_enabled());

        rig.tick(540, false, true).unwrap();
        assert_eq!(rig.sequencer.phase(), Phase::UpLeverExtend { until: at(2_540) });
    }

    #[test]
    fn climbing_down_abandons_an_unfinished_climb_up() {
        let mut config = SequenceConfig::default();
        config.brake.engage_during_up = true;
        let mut rig = Rig::new(Sequencer::new(config));
        rig.sequencer
            .arm_up(at(0), &mut rig.drive, &mut rig.actuators, &mut rig.arbiter)
            .unwrap();
        rig.tick(20, false, true).unwrap();
        assert_eq!(rig.actuators.command(Actuator::Lever), ActuatorCommand::Extend);
        assert_eq!(rig.drive.brake_mode(), BrakeMode::Brake);

        rig.sequencer
            .begin_down(false, at(60), &mut rig.drive, &mut rig.actuators, &mut rig.arbiter)
            .unwrap();

        assert_eq!(rig.sequencer.phase(), Phase::DownDone);
        assert_eq!(rig.sequencer.sequence(), Sequence::Down);
        assert_eq!(rig.actuators.command(Actuator::Lever), ActuatorCommand::Neutral);
        assert_eq!(rig.drive.brake_mode(), BrakeMode::Coast);
        assert!(rig.arbiter.is_enabled());
    }

    #[test]
    fn climbing_down_after_a_cut_off_climb_up_still_runs() {
        let mut rig = Rig::up();
        rig.tick(20, false, true).unwrap();
        assert!(rig.sequencer.is_active());

        rig.sequencer
            .begin_down(true, at(60), &mut rig.drive, &mut rig.actuators, &mut rig.arbiter)
            .unwrap();

        assert_eq!(rig.sequencer.phase(), Phase::DownPistonExtend { until: at(2_060) });
        assert_eq!(rig.actuators.command(Actuator::Lever), ActuatorCommand::Neutral);
        assert_eq!(rig.actuators.command(Actuator::Pistons), ActuatorCommand::Extend);
        assert_eq!(rig.drive.brake_mode(), BrakeMode::Brake);
        assert!(!rig.arbiter.is_enabled());
    }

    #[test]
    fn cancel_is_ignored_while_idle() {
        let mut rig = Rig::up();
        rig.drive.clear_commands();

        rig.tick(20, true, false).unwrap();

        assert_eq!(rig.sequencer.phase(), Phase::UpWaitCmd);
        assert!(rig.drive.commands().is_empty());
    }

    #[test]
    fn brake_policy_can_skip_restoring_on_cancel() {
        let mut config = SequenceConfig::default();
        config.brake.restore_on_cancel = false;
        let mut rig = Rig::new(Sequencer::resume(
            Sequence::Down,
            Phase::DownDriveY { started: at(0) },
            config,
        ));
        rig.drive.set_brake_mode(BrakeMode::Brake).unwrap();

        rig.tick(10, true, false).unwrap();

        assert_eq!(rig.sequencer.phase(), Phase::DownDone);
        assert_eq!(rig.drive.brake_mode(), BrakeMode::Brake);
    }

    #[test]
    fn foreign_phase_falls_back_to_manual() {
        let config = SequenceConfig::default();

        let mut rig = Rig::new(Sequencer::resume(

            Sequence::Down,

            Phase::UpDriveA { started: at(0) },

            config,

        ));
        rig.tick(10, false, false).unwrap();
        assert_eq!(rig.sequencer.phase(), Phase::DownDone);
        assert!(rig.arbiter.is_enabled());

        let mut rig = Rig::new(Sequencer::resume(

            Sequence::Up,

            Phase::DownPistonExtend { until: at(50) },

            config,

        ));
        rig.tick(10, false, false).unwrap();
        assert_eq!(rig.sequencer.phase(), Phase::UpWaitCmd);
        assert!(rig.arbiter.is_enabled());
        assert_eq!(rig.actuators.command(Actuator::Pistons), ActuatorCommand::Neutral);
    }

    #[test]
    fn arming_up_abandons_an_unfinished_climb_down() {
        let mut rig = Rig::down(true);
        rig.tick(2_100, false, false).unwrap();
        assert!(rig.sequencer.is_active());

        rig.sequencer
            .arm_up(at(2_200), &mut rig.drive, &mut rig.actuators, &mut rig.arbiter)
            .unwrap();

        assert_eq!(rig.sequencer.phase(), Phase::UpWaitCmd);
        assert_eq!(rig.sequencer.sequence(), Sequence::Up);
        assert!(rig.arbiter.is_enabled());
        assert_eq!(rig.drive.brake_mode(), BrakeMode::Coast);
    }

    #[test]
    fn pure_transition_reports_effects() {
        let config = SequenceConfig::default();
        let inputs = StepInputs {
            now: at(2_000),
            ..StepInputs::default()
        };

        let extending = Phase::DownPistonExtend { until: at(2_000) };
        let next = transition(Sequence::Down, extending, &inputs, &config);

        assert_eq!(next.phase, Phase::DownDriveY { started: at(2_000) });
        assert_eq!(next.effects.actuator, Some((Actuator::Pistons, ActuatorCommand::Neutral)));
        assert_eq!(next.effects.drive, Some(DriveCommand::STOP));
        assert_eq!(next.effects.manual, None);

        let start = activate_down(true, at(0), &config);
        let until = at(0) + Duration::from_millis(2_000);
        assert_eq!(start.phase, Phase::DownPistonExtend { until });
        assert_eq!(start.effects.manual, Some(false));
        assert_eq!(start.effects.brake, Some(BrakeMode::Brake));
    }

    #[test]
    fn output_faults_do_not_stop_the_sequence() {
        let mut rig = Rig::down(true);
        rig.drive.set_fault(Some(Side::Left));

        let result = rig.tick(2_000, false, false);

        assert_eq!(result, Err(OutputError::Unresponsive { side: Side::Left }));
        assert_eq!(rig.sequencer.phase(), Phase::DownDriveY { started: at(2_000) });
        assert_eq!(rig.actuators.command(Actuator::Pistons), ActuatorCommand::Neutral);
    }
}
