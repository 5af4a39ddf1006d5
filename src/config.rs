//! Robot tunables and the autonomous enable flag.
//!
//! Tunables live in a TOML file deployed next to the program. Anything the
//! file leaves out keeps its default, and a missing file means "all defaults".
//! The autonomous flag is a separate single-line file so it can be flipped
//! between matches without touching the tunables: `1` enables the climb-down
//! sequence, anything else (including no file at all) disables it.

use core::time::Duration;

use log::warn;
use serde::{Deserialize, Serialize};

use crate::{
    controller::{ButtonId, ButtonMap, BindingError},
    drivetrain::BrakeMode,
    maneuver::TimedDrive,
    shaper::DriveShaper,
};

pub const CONFIG_PATH: &str = "climb.toml";
pub const AUTO_FLAG_PATH: &str = "auto_enabled.txt";

/// How long a pneumatic actuation is held before the sequence moves on.
pub const ACTUATION_TIME: Duration = Duration::from_millis(2000);

/// Power used for both climb-down drive legs.
pub const DRIVE_DOWN_POWER: f64 = 0.25;

/// One timed drive leg of a sequence. Both sides get the same power.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Leg {
    pub power: f64,
    pub seconds: f64,
}

impl Leg {
    pub const fn new(power: f64, seconds: f64) -> Self {
        Self { power, seconds }
    }

    pub fn maneuver(&self) -> TimedDrive {
        TimedDrive::from_seconds(self.power, self.power, self.seconds)
    }
}

/// Which neutral mode the drivetrain uses while a sequence runs and after it.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct BrakePolicy {
    pub engaged: BrakeMode,
    pub released: BrakeMode,
    pub engage_during_down: bool,
    pub engage_during_up: bool,
    /// Restore `released` when a sequence is cancelled, not only when it finishes.
    pub restore_on_cancel: bool,
}

impl Default for BrakePolicy {
    fn default() -> Self {
        Self {
            engaged: BrakeMode::Brake,
            released: BrakeMode::Coast,
            engage_during_down: true,
            engage_during_up: false,
            restore_on_cancel: true,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SequenceConfig {
    pub actuation_ms: u64,
    pub down_y: Leg,
    pub down_z: Leg,
    pub up_z: Leg,
    pub up_a: Leg,
    pub up_b: Leg,
    pub up_c: Leg,
    pub brake: BrakePolicy,
}

impl SequenceConfig {
    pub fn actuation_time(&self) -> Duration {
        Duration::from_millis(self.actuation_ms)
    }
}

impl Default for SequenceConfig {
    fn default() -> Self {
        Self {
            actuation_ms: ACTUATION_TIME.as_millis() as u64,
            down_y: Leg::new(DRIVE_DOWN_POWER, 0.375),
            down_z: Leg::new(DRIVE_DOWN_POWER, 0.375),
            up_z: Leg::new(0.3, 0.5),
            up_a: Leg::new(0.3, 0.5),
            up_b: Leg::new(0.25, 0.375),
            up_c: Leg::new(0.25, 0.375),
            brake: BrakePolicy::default(),
        }
    }
}

/// Button pairs as written in the config file.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ButtonConfig {
    pub cancel: [u8; 2],
    pub climb_up: [u8; 2],
}

impl Default for ButtonConfig {
    fn default() -> Self {
        Self {
            cancel: [7, 8],
            climb_up: [11, 12],
        }
    }
}

impl ButtonConfig {
    pub fn button_map(&self) -> Result<ButtonMap, BindingError> {
        let [cancel_a, cancel_b] = self.cancel.map(ButtonId);
        let [climb_a, climb_b] = self.climb_up.map(ButtonId);
        ButtonMap::new((cancel_a, cancel_b), (climb_a, climb_b))
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct RobotConfig {
    pub sequence: SequenceConfig,
    pub buttons: ButtonConfig,
    pub shaper: DriveShaper,
}

/// Reads the autonomous enable flag once per autonomous period.
pub trait AutoFlagSource {
    fn auto_enabled(&mut self) -> bool;
}

/// A flag decided at construction time, used by simulation and tests.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct FixedFlag(pub bool);

impl AutoFlagSource for FixedFlag {
    fn auto_enabled(&mut self) -> bool {
        self.0
    }
}

/// Interprets the contents of the auto flag file.
///
/// Only a first line of exactly `1` (surrounding whitespace ignored) enables
/// autonomous.
pub fn parse_auto_flag(contents: &str) -> bool {
    match contents.lines().next() {
        Some(line) => line.trim() == "1",
        None => {
            warn!("Auto flag file is empty, autonomous disabled");
            false
        }
    }
}

#[cfg(feature = "std")]
pub use self::file::{ConfigError, FileFlag};

#[cfg(feature = "std")]
mod file {
    use std::{
        fs, io,
        path::{Path, PathBuf},
    };

    use log::{info, warn};
    use snafu::{ResultExt, Snafu};

    use super::{parse_auto_flag, AutoFlagSource, RobotConfig};
    use crate::controller::BindingError;

    #[derive(Debug, Snafu)]
    pub enum ConfigError {
        #[snafu(display("Could not read config file {}", path.display()))]
        Read { path: PathBuf, source: io::Error },
        #[snafu(display("Malformed config file {}", path.display()))]
        Parse { path: PathBuf, source: toml::de::Error },
        #[snafu(display("Invalid button bindings in {}", path.display()))]
        Bindings { path: PathBuf, source: BindingError },
    }

    impl RobotConfig {
        /// Parses tunables, then checks that the button chords are usable.
        pub fn from_toml_str(contents: &str, path: &Path) -> Result<Self, ConfigError> {
            let config: RobotConfig = toml::from_str(contents).context(ParseSnafu { path })?;
            config.buttons.button_map().context(BindingsSnafu { path })?;
            Ok(config)
        }

        pub fn load(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
            let path = path.as_ref();
            match fs::read_to_string(path) {
                Ok(contents) => {
                    let config = Self::from_toml_str(&contents, path)?;
                    info!("Loaded configuration from {}", path.display());
                    Ok(config)
                }
                Err(err) if err.kind() == io::ErrorKind::NotFound => {
                    warn!("{} not found, using default configuration", path.display());
                    Ok(Self::default())
                }
                Err(source) => Err(ConfigError::Read {
                    path: path.to_path_buf(),
                    source,
                }),
            }
        }
    }

    /// The auto flag as a deployed text file.
    #[derive(Debug, Clone)]
    pub struct FileFlag {
        path: PathBuf,
    }

    impl FileFlag {
        pub fn new(path: impl Into<PathBuf>) -> Self {
            Self { path: path.into() }
        }
    }

    impl AutoFlagSource for FileFlag {
        fn auto_enabled(&mut self) -> bool {
            match fs::read_to_string(&self.path) {
                Ok(contents) => parse_auto_flag(&contents),
                Err(err) => {
                    warn!("Could not read {} ({err}), autonomous disabled", self.path.display());
                    false
                }
            }
        }
    }
}
