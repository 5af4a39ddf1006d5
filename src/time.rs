use core::{
    fmt,
    ops::{Add, Sub},
    time::Duration,
};

/// A point on the robot's monotonic clock, in milliseconds since program start.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct Timestamp(u64);

impl Timestamp {
    pub const ZERO: Self = Self(0);

    pub const fn from_millis(millis: u64) -> Self {
        Self(millis)
    }

    pub const fn as_millis(self) -> u64 {
        self.0
    }

    /// Time elapsed between `earlier` and `self`, or zero if `earlier` is later.
    pub const fn saturating_since(self, earlier: Timestamp) -> Duration {
        Duration::from_millis(self.0.saturating_sub(earlier.0))
    }
}

impl Add<Duration> for Timestamp {
    type Output = Timestamp;

    fn add(self, rhs: Duration) -> Self::Output {
        let millis = u64::try_from(rhs.as_millis()).unwrap_or(u64::MAX);
        Timestamp(self.0.saturating_add(millis))
    }
}

impl Sub for Timestamp {
    type Output = Duration;

    fn sub(self, rhs: Timestamp) -> Self::Output {
        self.saturating_since(rhs)
    }
}

impl fmt::Display for Timestamp {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}ms", self.0)
    }
}

/// Converts a duration given in seconds to whole milliseconds.
///
/// Fractions of a millisecond are truncated. Negative and NaN inputs become zero.
pub fn seconds(seconds: f64) -> Duration {
    // `as` saturates: NaN and negatives land on 0.
    Duration::from_millis((seconds * 1000.0) as u64)
}

/// Source of the current time for the control loop.
pub trait Clock {
    fn now(&self) -> Timestamp;
}
