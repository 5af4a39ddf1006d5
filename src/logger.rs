//! Console logger for simulation and bench runs.
//!
//! Implements the [`log`] facade. Each line carries the level, the time since
//! the logger was installed, and the module that logged it:
//!
//! ```text
//! INFO [4750ms] pros_climb::sequencer - DownDriveZ -> DownDone
//! ```

use std::{
    io::Write,
    sync::OnceLock,
    time::{Duration, Instant},
};

use log::{LevelFilter, Metadata, Record, SetLoggerError};

pub struct ConsoleLogger {
    started: Instant,
}

impl ConsoleLogger {
    fn new() -> Self {
        Self {
            started: Instant::now(),
        }
    }

    fn uptime(&self) -> Duration {
        self.started.elapsed()
    }
}

/// Formats one log line without the trailing newline.
pub fn format_line(
    level: log::Level,
    uptime: Duration,
    target: &str,
    args: &core::fmt::Arguments<'_>,
) -> String {
    format!("{level} [{}ms] {target} - {args}", uptime.as_millis())
}

impl log::Log for ConsoleLogger {
    fn enabled(&self, metadata: &Metadata<'_>) -> bool {
        metadata.level() <= log::max_level()
    }

    fn log(&self, record: &Record<'_>) {
        if !self.enabled(record.metadata()) {
            return;
        }

        let line = format_line(record.level(), self.uptime(), record.target(), record.args());
        let mut stderr = std::io::stderr().lock();
        let _ = writeln!(stderr, "{line}");
    }

    fn flush(&self) {
        let _ = std::io::stderr().flush();
    }
}

static LOGGER: OnceLock<ConsoleLogger> = OnceLock::new();

/// Installs the console logger.
///
/// # Errors
///
/// Returns [`SetLoggerError`] if a logger has already been set.
pub fn init(level: LevelFilter) -> Result<(), SetLoggerError> {
    let logger = LOGGER.get_or_init(ConsoleLogger::new);
    log::set_logger(logger).map(|()| log::set_max_level(level))
}
