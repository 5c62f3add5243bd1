//! Error taxonomy for the wrapper.
//!
//! Configuration-time errors ([`Error::InvalidArgument`], [`Error::MalformedConfig`])
//! are returned to whoever applied the configuration. Everything raised while a daemon
//! session starts is caught at the session thread and logged once at FATAL.

use thiserror::Error;

/// Result alias used across the wrapper crates.
pub type Result<T, E = Error> = core::result::Result<T, E>;

/// Every failure the wrapper reports.
#[derive(Debug, Error)]
pub enum Error {
    /// Unrecognized severity level name (or other bad argument).
    #[error("invalid argument: {0}")]
    InvalidArgument(String),
    /// Logging config token without `=`.
    #[error("malformed logging config: {0}")]
    MalformedConfig(String),
    /// The configuration text itself could not be parsed.
    #[error("config parse: {0}")]
    ConfigParse(String),
    /// Forwarder / RIB construction or initialization failed.
    #[error("subsystem init failure: {0}")]
    SubsystemInit(String),
    /// Raising or dropping process privileges failed.
    #[error("privilege: {0}")]
    Privilege(String),
    /// Filesystem or socket error.
    #[error("io: {0}")]
    Io(#[from] std::io::Error),
    /// Anything else that went wrong while starting a session.
    #[error("unknown fatal error: {0}")]
    Unknown(String),
}

impl Error {
    /// Builds [`Error::InvalidArgument`].
    pub fn invalid_argument(msg: impl Into<String>) -> Self {
        Self::InvalidArgument(msg.into())
    }

    /// Builds [`Error::MalformedConfig`].
    pub fn malformed_config(msg: impl Into<String>) -> Self {
        Self::MalformedConfig(msg.into())
    }

    /// Builds [`Error::ConfigParse`].
    pub fn config_parse(msg: impl Into<String>) -> Self {
        Self::ConfigParse(msg.into())
    }

    /// Builds [`Error::SubsystemInit`].
    pub fn subsystem_init(msg: impl Into<String>) -> Self {
        Self::SubsystemInit(msg.into())
    }

    /// Builds [`Error::Privilege`].
    pub fn privilege(msg: impl Into<String>) -> Self {
        Self::Privilege(msg.into())
    }

    /// Builds [`Error::Unknown`].
    pub fn unknown(msg: impl Into<String>) -> Self {
        Self::Unknown(msg.into())
    }

    /// Short stable name of the error kind, used in FATAL records and FFI status mapping.
    pub fn kind(&self) -> &'static str {
        match self {
            Self::InvalidArgument(_) => "invalid-argument",
            Self::MalformedConfig(_) => "malformed-config",
            Self::ConfigParse(_) => "config-parse",
            Self::SubsystemInit(_) => "subsystem-init",
            Self::Privilege(_) => "privilege",
            Self::Io(_) => "io",
            Self::Unknown(_) => "unknown",
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn kinds_and_messages() {
        let e = Error::malformed_config("'=' is missing");
        assert_eq!(e.kind(), "malformed-config");
        assert_eq!(e.to_string(), "malformed logging config: '=' is missing");

        let io: Error = std::io::Error::new(std::io::ErrorKind::AddrInUse, "busy").into();
        assert_eq!(io.kind(), "io");
    }
}
