//! Core building blocks shared by the NFD Android wrapper crates.
//!
//! - [`error`]: the error taxonomy surfaced by configuration and session start-up
//! - [`log`]: per-module level-filtered loggers, the process-wide registry and the
//!   platform log bridge
//! - [`config`]: the daemon configuration tree with its built-in defaults

pub mod config;
pub mod error;
pub mod log;

pub use config::{ConfigTree, DEFAULT_CONFIG};
pub use error::{Error, Result};
pub use log::{LogLevel, Logger, Logging};

#[doc(hidden)]
pub mod __private {
    pub use once_cell::sync::Lazy;
}
