//! Logging collaborator for messages coming from the processor.
//!
//! The processor cannot log directly from the audio thread, so it sends LOG
//! messages over the bridge. The correlator hands them to a [`Logger`],
//! which by default forwards them to `tracing`.

use std::sync::Arc;

/// Severity of a processor log line, `0` (debug) through `4` (none).
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Default)]
pub enum LogLevel {
    /// Verbose diagnostics.
    #[default]
    Debug = 0,
    /// Normal operation.
    Info = 1,
    /// Something unexpected that the pipeline recovered from.
    Warning = 2,
    /// A failure.
    Error = 3,
    /// Logging disabled.
    None = 4,
}

impl LogLevel {
    /// Converts a raw severity, clamping out-of-range values into `0..=4`.
    pub fn from_raw(level: i32) -> Self {
        match level.clamp(0, 4) {
            0 => Self::Debug,
            1 => Self::Info,
            2 => Self::Warning,
            3 => Self::Error,
            _ => Self::None,
        }
    }

    /// Upper-case name used in log output.
    pub fn name(self) -> &'static str {
        match self {
            Self::Debug => "DEBUG",
            Self::Info => "INFO",
            Self::Warning => "WARNING",
            Self::Error => "ERROR",
            Self::None => "NONE",
        }
    }
}

impl std::fmt::Display for LogLevel {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.name())
    }
}

/// Receives log lines forwarded from the processor.
///
/// Called from the dispatcher task, so implementations must not block.
pub trait Logger: Send + Sync {
    /// Records one log line.
    fn log(&self, level: LogLevel, message: &str);
}

/// [`Logger`] that forwards to `tracing`.
///
/// Lines below the minimum level are dropped before they reach `tracing`.
/// Nothing is ever emitted at [`LogLevel::None`].
#[derive(Debug, Clone, Copy, Default)]
pub struct TracingLogger {
    min_level: LogLevel,
}

impl TracingLogger {
    /// Creates a logger that forwards every level.
    pub fn new() -> Self {
        Self::default()
    }

    /// Creates a logger that forwards `min_level` and above.
    pub fn with_level(min_level: LogLevel) -> Self {
        Self { min_level }
    }

    /// Returns the minimum forwarded level.
    pub fn min_level(&self) -> LogLevel {
        self.min_level
    }

    fn enabled(&self, level: LogLevel) -> bool {
        level != LogLevel::None && level >= self.min_level
    }
}

impl Logger for TracingLogger {
    fn log(&self, level: LogLevel, message: &str) {
        if !self.enabled(level) {
            return;
        }
        match level {
            LogLevel::Debug => tracing::debug!(target: "volume_meter::processor", "{message}"),
            LogLevel::Info => tracing::info!(target: "volume_meter::processor", "{message}"),
            LogLevel::Warning => tracing::warn!(target: "volume_meter::processor", "{message}"),
            LogLevel::Error => tracing::error!(target: "volume_meter::processor", "{message}"),
            LogLevel::None => {}
        }
    }
}

/// Shared handle to a logger.
pub type SharedLogger = Arc<dyn Logger>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_from_raw_clamps() {
        assert_eq!(LogLevel::from_raw(-3), LogLevel::Debug);
        assert_eq!(LogLevel::from_raw(2), LogLevel::Warning);
        assert_eq!(LogLevel::from_raw(99), LogLevel::None);
    }

    #[test]
    fn test_level_ordering() {
        assert!(LogLevel::Debug < LogLevel::Info);
        assert!(LogLevel::Error < LogLevel::None);
    }

    #[test]
    fn test_level_display() {
        assert_eq!(LogLevel::Warning.to_string(), "WARNING");
    }

    #[test]
    fn test_tracing_logger_threshold() {
        let logger = TracingLogger::with_level(LogLevel::Warning);
        assert!(!logger.enabled(LogLevel::Info));
        assert!(logger.enabled(LogLevel::Warning));
        assert!(logger.enabled(LogLevel::Error));
        assert!(!logger.enabled(LogLevel::None));
    }

    #[test]
    fn test_tracing_logger_default_forwards_debug() {
        let logger = TracingLogger::new();
        assert_eq!(logger.min_level(), LogLevel::Debug);
        assert!(logger.enabled(LogLevel::Debug));
        // Must not panic without a subscriber installed.
        logger.log(LogLevel::Debug, "hello");
    }
}
