// Level-filtered logger bound to one module name

use std::fmt;
use std::sync::atomic::{AtomicI16, Ordering};

use super::registry::INITIAL_DEFAULT_LEVEL;
use super::{platform_log, LogLevel, PlatformLog};

/// Logger for a single module.
///
/// The module name never changes; the minimum level is an atomic cell so the check on
/// the logging path needs no lock. A level change pushed by the registry may be observed
/// slightly late by other threads, which is acceptable for log filtering.
#[derive(Debug)]
pub struct Logger {
    module_name: String,
    current_level: AtomicI16,
}

impl Logger {
    /// Create an unregistered logger at the initial default level (NONE).
    pub fn new(module_name: impl Into<String>) -> Self {
        Self {
            module_name: module_name.into(),
            current_level: AtomicI16::new(INITIAL_DEFAULT_LEVEL.as_i16()),
        }
    }

    /// Name this logger is registered under; also the record tag.
    pub fn module_name(&self) -> &str {
        &self.module_name
    }

    /// True iff a message at `level` passes this logger's minimum level.
    #[inline]
    pub fn is_enabled(&self, level: LogLevel) -> bool {
        self.current_level.load(Ordering::Relaxed) >= level.as_i16()
    }

    /// Store a new minimum level.
    #[inline]
    pub fn set_level(&self, level: LogLevel) {
        self.current_level.store(level.as_i16(), Ordering::Relaxed);
    }

    /// Current minimum level.
    pub fn level(&self) -> LogLevel {
        LogLevel::from_i16(self.current_level.load(Ordering::Relaxed))
            .unwrap_or(INITIAL_DEFAULT_LEVEL)
    }

    /// Filter, format and forward a message to the installed platform log.
    pub fn log(&self, level: LogLevel, args: fmt::Arguments<'_>) {
        if self.is_enabled(level) {
            self.write_to(platform_log(), level, args);
        }
    }

    /// Format and forward without filtering. Callers check [`Logger::is_enabled`] first.
    pub fn write_to(&self, out: &dyn PlatformLog, level: LogLevel, args: fmt::Arguments<'_>) {
        let message = match args.as_str() {
            Some(s) => s.to_owned(),
            None => args.to_string(),
        };
        out.write(level.priority(), &self.module_name, &message);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    use crate::log::{MemoryLog, Priority};

    fn level_strategy() -> impl Strategy<Value = LogLevel> {
        proptest::sample::select(LogLevel::ALL_LEVELS.to_vec())
    }

    #[test]
    fn new_logger_starts_at_none() {
        let logger = Logger::new("Forwarder");
        assert_eq!(logger.module_name(), "Forwarder");
        assert_eq!(logger.level(), LogLevel::None);
        assert!(logger.is_enabled(LogLevel::Fatal));
        assert!(!logger.is_enabled(LogLevel::Error));
    }

    #[test]
    fn fatal_passes_every_configuration() {
        let logger = Logger::new("Test");
        for level in LogLevel::ALL_LEVELS {
            logger.set_level(level);
            assert!(
                logger.is_enabled(LogLevel::Fatal),
                "FATAL suppressed at {level}"
            );
        }
    }

    #[test]
    fn write_to_tags_with_module_name() {
        let out = MemoryLog::new();
        let logger = Logger::new("FaceTable");
        logger.set_level(LogLevel::Debug);
        if logger.is_enabled(LogLevel::Warn) {
            logger.write_to(&out, LogLevel::Warn, format_args!("face {} closed", 261));
        }
        let records = out.records();
        assert_eq!(records.len(), 1);
        assert_eq!(records[0].priority, Priority::Warn);
        assert_eq!(records[0].tag, "FaceTable");
        assert_eq!(records[0].message, "face 261 closed");
    }

    #[test]
    fn concurrent_set_and_check() {
        let logger = std::sync::Arc::new(Logger::new("Concurrent"));
        let writer = {
            let logger = logger.clone();
            std::thread::spawn(move || {
                for i in 0..1000 {
                    logger.set_level([LogLevel::Trace, LogLevel::None][i % 2]);
                }
            })
        };
        for _ in 0..1000 {
            assert!(logger.is_enabled(LogLevel::Fatal));
        }
        writer.join().unwrap();
        assert_eq!(logger.level(), LogLevel::None);
    }

    proptest! {
        #[test]
        fn configured_level_enables_everything_at_or_above(
            configured in level_strategy(),
            msg in level_strategy(),
        ) {
            let logger = Logger::new("Prop");
            logger.set_level(configured);
            prop_assert_eq!(logger.is_enabled(msg), configured >= msg);
            if msg < configured {
                prop_assert!(logger.is_enabled(msg));
            }
        }
    }
}
