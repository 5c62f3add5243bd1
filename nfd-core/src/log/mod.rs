//! Module-level logging facility for the daemon wrapper.
//!
//! Every source module owns one [`Logger`] identity, declared with
//! [`nfd_log_init!`](crate::nfd_log_init). A logger's minimum level is an atomic cell read
//! without locking on the hot path; the [`Logging`] registry pushes level changes into the
//! registered loggers under its own mutex. Messages that pass the filter go straight to the
//! installed [`PlatformLog`], while stream-style output goes through [`LogStreamBuf`].

mod level;
mod logger;
#[macro_use]
mod macros;
mod platform;
mod registry;
mod sink;

pub use level::LogLevel;
pub use logger::Logger;
#[cfg(target_os = "android")]
pub use platform::AndroidLog;
pub use platform::{
    install_platform_log, platform_log, AndroidRecord, LogRecord, MemoryLog, PlatformLog,
    Priority, TracingLog,
};
pub use registry::{Logging, INITIAL_DEFAULT_LEVEL, WILDCARD};
pub use sink::{LineSink, LogStreamBuf, MAX_BUF_SIZE, NATIVE_TAG, RECORD_CAPACITY};
