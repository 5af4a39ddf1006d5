//! Joystick to drivetrain mapping.
//!
//! The shaper turns one joystick snapshot into a left/right command using
//! arcade mixing. Stick deflection is squared (keeping its sign) so small
//! movements give fine control, and the throttle lever scales the result.

use serde::{Deserialize, Serialize};

use crate::drivetrain::{clamp_unit, DriveCommand};

/// Stick magnitude at or below which the stick counts as centered.
pub const DEADZONE: f64 = 0.05;

/// How far back the stick must be pushed before steering is mirrored.
pub const REVERSE_POINT: f64 = 0.15;

/// One tick's worth of joystick axes, as reported by the driver station.
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct JoystickSample {
    pub x: f64,
    pub y: f64,
    /// The throttle lever (z axis), `-1` fully forward.
    pub throttle: f64,
    pub magnitude: f64,
}

impl JoystickSample {
    pub const fn new(x: f64, y: f64, throttle: f64, magnitude: f64) -> Self {
        Self {
            x,
            y,
            throttle,
            magnitude,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct DriveShaper {
    pub deadzone: f64,
    pub reverse_point: f64,
}

impl Default for DriveShaper {
    fn default() -> Self {
        Self {
            deadzone: DEADZONE,
            reverse_point: REVERSE_POINT,
        }
    }
}

impl DriveShaper {
    pub fn shape(&self, sample: &JoystickSample) -> DriveCommand {
        let mut x = sample.x;
        let mut y = -sample.y;

        let throttle = clamp_throttle((-sample.throttle + 1.0) * 0.5);

        if sample.magnitude <= self.deadzone {
            x = 0.0;
            y = 0.0;
        }

        // Keep turns pointing the way the driver expects while backing up.
        if y < -self.reverse_point {
            x = -x;
        }

        let x = signed_square(x) * throttle;
        let y = signed_square(y) * throttle;

        DriveCommand::new(clamp_unit(y + x), clamp_unit(y - x))
    }
}

/// Shapes raw axes with the default deadzone and reverse point.
pub fn shape(x: f64, y: f64, throttle: f64, magnitude: f64) -> DriveCommand {
    DriveShaper::default().shape(&JoystickSample::new(x, y, throttle, magnitude))
}

fn clamp_throttle(throttle: f64) -> f64 {
    if throttle.is_nan() {
        0.0
    } else {
        throttle.clamp(0.0, 1.0)
    }
}

fn signed_square(value: f64) -> f64 {
    if value < 0.0 {
        -(value * value)
    } else {
        value * value
    }
}
