// Logging macros: declare a module logger, then emit through it

/// Declare the log module of the current Rust module.
///
/// Expands to `pub(crate) fn nfd_module_logger()`, which registers the logger with
/// [`Logging::global`](crate::log::Logging::global) on first use. Call it once at
/// start-up to make the module visible in the registry before it logs anything.
#[macro_export]
macro_rules! nfd_log_init {
    ($name:expr) => {
        #[allow(dead_code)]
        pub(crate) fn nfd_module_logger() -> &'static ::std::sync::Arc<$crate::log::Logger> {
            static LOGGER: $crate::__private::Lazy<::std::sync::Arc<$crate::log::Logger>> =
                $crate::__private::Lazy::new(|| $crate::log::Logging::global().register($name));
            &LOGGER
        }
    };
}

/// Emit at `level` through the module logger; formatting only happens when enabled.
#[macro_export]
macro_rules! nfd_log {
    ($level:ident, $($arg:tt)+) => {{
        let logger = nfd_module_logger();
        if logger.is_enabled($crate::log::LogLevel::$level) {
            logger.write_to(
                $crate::log::platform_log(),
                $crate::log::LogLevel::$level,
                ::std::format_args!($($arg)+),
            );
        }
    }};
}

/// Emit at TRACE through the module logger.
#[macro_export]
macro_rules! nfd_log_trace {
    ($($arg:tt)+) => { $crate::nfd_log!(Trace, $($arg)+) };
}

/// Emit at DEBUG.
#[macro_export]
macro_rules! nfd_log_debug {
    ($($arg:tt)+) => { $crate::nfd_log!(Debug, $($arg)+) };
}

/// Emit at INFO.
#[macro_export]
macro_rules! nfd_log_info {
    ($($arg:tt)+) => { $crate::nfd_log!(Info, $($arg)+) };
}

/// Emit at WARN.
#[macro_export]
macro_rules! nfd_log_warn {
    ($($arg:tt)+) => { $crate::nfd_log!(Warn, $($arg)+) };
}

/// Emit at ERROR.
#[macro_export]
macro_rules! nfd_log_error {
    ($($arg:tt)+) => { $crate::nfd_log!(Error, $($arg)+) };
}

/// Emit at FATAL, which no level configuration suppresses.
#[macro_export]
macro_rules! nfd_log_fatal {
    ($($arg:tt)+) => { $crate::nfd_log!(Fatal, $($arg)+) };
}
