// Logging registry: module name => loggers, module name => configured level

use std::collections::HashMap;
use std::sync::Arc;

use once_cell::sync::Lazy;
use parking_lot::Mutex;

use super::{LogLevel, Logger};
use crate::error::{Error, Result};

/// Level every logger gets when neither its module nor the wildcard is configured.
pub const INITIAL_DEFAULT_LEVEL: LogLevel = LogLevel::None;

/// Module name that addresses the default level.
pub const WILDCARD: &str = "*";

static GLOBAL: Lazy<Logging> = Lazy::new(Logging::new);

/// Registry that controls the level of every registered [`Logger`].
///
/// Invariant: each registered logger's level equals the override for its module, else
/// the wildcard override, else [`INITIAL_DEFAULT_LEVEL`]. All mutations take the
/// registry mutex; the logging path only reads the logger's own atomic level.
#[derive(Debug, Default)]
pub struct Logging {
    inner: Mutex<Inner>,
}

#[derive(Debug, Default)]
struct Inner {
    /// module name (or `*`) => minimum level
    enabled_level: HashMap<String, LogLevel>,
    /// module name => loggers; one module may be declared more than once
    loggers: HashMap<String, Vec<Arc<Logger>>>,
}

impl Inner {
    fn configured_level(&self, module_name: &str) -> LogLevel {
        self.enabled_level
            .get(module_name)
            .or_else(|| self.enabled_level.get(WILDCARD))
            .copied()
            .unwrap_or(INITIAL_DEFAULT_LEVEL)
    }

    fn set_level(&mut self, module_name: &str, level: LogLevel) {
        if module_name == WILDCARD {
            self.set_default_level(level);
            return;
        }

        self.enabled_level.insert(module_name.to_owned(), level);
        if let Some(loggers) = self.loggers.get(module_name) {
            for logger in loggers {
                logger.set_level(level);
            }
        }
    }

    fn set_default_level(&mut self, level: LogLevel) {
        self.enabled_level.clear();
        self.enabled_level.insert(WILDCARD.to_owned(), level);

        for logger in self.loggers.values().flatten() {
            logger.set_level(level);
        }
    }
}

impl Logging {
    /// An empty registry. Most code uses [`Logging::global`].
    pub fn new() -> Self {
        Self::default()
    }

    /// The process-wide registry used by `nfd_log_init!`.
    pub fn global() -> &'static Logging {
        &GLOBAL
    }

    /// Register a logger and immediately apply its configured level.
    pub fn add_logger(&self, logger: Arc<Logger>) {
        let mut inner = self.inner.lock();
        let level = inner.configured_level(logger.module_name());
        logger.set_level(level);
        inner
            .loggers
            .entry(logger.module_name().to_owned())
            .or_default()
            .push(logger);
    }

    /// Create and register a logger for `module_name`.
    pub fn register(&self, module_name: &str) -> Arc<Logger> {
        let logger = Arc::new(Logger::new(module_name));
        self.add_logger(logger.clone());
        logger
    }

    /// Set the minimum level of one module, or of all modules when `module_name` is `*`.
    pub fn set_level(&self, module_name: &str, level: LogLevel) {
        self.inner.lock().set_level(module_name, level);
    }

    /// Replace every override with a single default level.
    ///
    /// Changing the default level overwrites individual module settings.
    pub fn set_default_level(&self, level: LogLevel) {
        self.inner.lock().set_default_level(level);
    }

    /// Apply a colon-separated `module=LEVEL` list, left to right.
    ///
    /// ```
    /// use nfd_core::log::{LogLevel, Logging};
    ///
    /// let logging = Logging::new();
    /// let face = logging.register("Face");
    /// logging.set_levels("*=INFO:Face=DEBUG:NfdController=WARN").unwrap();
    /// assert_eq!(face.level(), LogLevel::Debug);
    /// ```
    ///
    /// Tokens before a bad one stay applied: a failure part way through is not rolled
    /// back.
    pub fn set_levels(&self, config: &str) -> Result<()> {
        // a single trailing ':' does not produce an empty token
        let config = config.strip_suffix(':').unwrap_or(config);
        if config.is_empty() {
            return Ok(());
        }

        for token in config.split(':') {
            let Some((module_name, level_name)) = token.split_once('=') else {
                let why = format!("'=' is missing in '{token}'");
                return Err(Error::malformed_config(why));
            };
            let level: LogLevel = level_name.parse()?;
            self.set_level(module_name, level);
        }
        Ok(())
    }

    /// Names of all registered modules, in registry iteration order.
    pub fn module_names(&self) -> Vec<String> {
        self.inner.lock().loggers.keys().cloned().collect()
    }

    /// Level a logger of `module_name` has (or would get on registration).
    pub fn level_of(&self, module_name: &str) -> LogLevel {
        self.inner.lock().configured_level(module_name)
    }

    /// Snapshot of the configured overrides, wildcard included.
    pub fn overrides(&self) -> HashMap<String, LogLevel> {
        self.inner.lock().enabled_level.clone()
    }
}
