//! Lifecycle of an NFD session embedded in an application process.
//!
//! A session is one construct → initialize → run → stop cycle of a [`Runner`] on a
//! dedicated thread. Each session gets its own [`RuntimeContext`] (event loop and stop
//! signal), so nothing process-wide has to be reset between sessions.

pub mod context;
pub mod forwarder;
pub mod keychain;
pub mod privilege;
pub mod rib;
pub mod runner;
pub mod session;
pub mod subsystem;

pub use context::{IoHandle, RuntimeContext, StopHandle};
pub use keychain::KeyChain;
pub use runner::{Runner, RunnerHandle, RunnerState};
pub use session::{SessionManager, HOME_PATH_KEY};
pub use subsystem::{BuiltinDaemon, DaemonFactory, Subsystem};

/// Register every log module of this crate with the global registry so they are listed
/// before the first session logs anything.
pub fn register_log_modules() {
    forwarder::nfd_module_logger();
    keychain::nfd_module_logger();
    privilege::nfd_module_logger();
    rib::nfd_module_logger();
    runner::nfd_module_logger();
    session::nfd_module_logger();
}
