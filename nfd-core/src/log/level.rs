// Severity levels of the module logging facility

use std::fmt;
use std::str::FromStr;

use crate::error::Error;
use crate::log::Priority;

/// Severity level of a log message, or minimum level of a logger.
///
/// Ranks follow the numeric values below. `Fatal` ranks under `None` so a FATAL message
/// passes every configuration, including `None`.
#[repr(i16)]
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum LogLevel {
    /// Fatal (logged unconditionally)
    Fatal = -1,
    /// No messages except FATAL
    None = 0,
    /// Serious error messages
    Error = 1,
    /// Warning messages
    Warn = 2,
    /// Informational messages
    Info = 3,
    /// Debug messages
    Debug = 4,
    /// Trace messages (most verbose)
    Trace = 5,
    /// All messages
    All = 255,
}

impl LogLevel {
    /// Every named level, most severe first.
    pub const ALL_LEVELS: [LogLevel; 8] = [
        LogLevel::Fatal,
        LogLevel::None,
        LogLevel::Error,
        LogLevel::Warn,
        LogLevel::Info,
        LogLevel::Debug,
        LogLevel::Trace,
        LogLevel::All,
    ];

    /// Numeric rank stored in a logger's level cell.
    #[inline]
    pub const fn as_i16(self) -> i16 {
        self as i16
    }

    /// Inverse of [`as_i16`](Self::as_i16); `None` for values that name no level.
    pub const fn from_i16(value: i16) -> Option<Self> {
        match value {
            -1 => Some(LogLevel::Fatal),
            0 => Some(LogLevel::None),
            1 => Some(LogLevel::Error),
            2 => Some(LogLevel::Warn),
            3 => Some(LogLevel::Info),
            4 => Some(LogLevel::Debug),
            5 => Some(LogLevel::Trace),
            255 => Some(LogLevel::All),
            _ => None,
        }
    }

    /// Upper-case name, as accepted by [`FromStr`].
    pub const fn as_str(self) -> &'static str {
        match self {
            LogLevel::Fatal => "FATAL",
            LogLevel::None => "NONE",
            LogLevel::Error => "ERROR",
            LogLevel::Warn => "WARN",
            LogLevel::Info => "INFO",
            LogLevel::Debug => "DEBUG",
            LogLevel::Trace => "TRACE",
            LogLevel::All => "ALL",
        }
    }

    /// Android log priority used when a message of this level is emitted.
    pub const fn priority(self) -> Priority {
        match self {
            LogLevel::Trace | LogLevel::All => Priority::Verbose,
            LogLevel::Debug => Priority::Debug,
            LogLevel::Info => Priority::Info,
            LogLevel::Warn => Priority::Warn,
            LogLevel::Error => Priority::Error,
            LogLevel::Fatal | LogLevel::None => Priority::Fatal,
        }
    }
}

impl fmt::Display for LogLevel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for LogLevel {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        LogLevel::ALL_LEVELS
            .iter()
            .copied()
            .find(|level| level.as_str() == s)
            .ok_or_else(|| {
                Error::invalid_argument(format!("unrecognized log level '{s}'"))
            })
    }
}
