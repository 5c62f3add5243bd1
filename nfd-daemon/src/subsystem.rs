//! Seams between the runner and the daemon components it drives.

use std::sync::Arc;

use async_trait::async_trait;
use nfd_core::{ConfigTree, Result};

use crate::context::IoHandle;
use crate::forwarder::Forwarder;
use crate::keychain::KeyChain;
use crate::rib::RibService;

/// One of the daemon's long-lived components (forwarder, RIB service).
///
/// Lifecycle: `initialize` once after construction (may bind sockets, must not spawn
/// tasks), `attach` once the event loop is about to run, `shutdown` on the loop when the
/// session stops.
#[async_trait]
pub trait Subsystem: Send {
    /// Name used in log messages.
    fn name(&self) -> &str;

    /// Validate configuration and acquire resources such as listening sockets.
    fn initialize(&mut self) -> Result<()>;

    /// Start the subsystem's tasks on the session loop.
    fn attach(&mut self, io: &IoHandle) -> Result<()>;

    /// Stop tasks and release resources. Runs on the loop; must not fail.
    async fn shutdown(&mut self);
}

/// Builds the subsystems of one session.
pub trait DaemonFactory: Send + Sync {
    /// Build the forwarder from the session configuration.
    fn create_forwarder(&self, config: &ConfigTree, keychain: &Arc<KeyChain>)
        -> Result<Box<dyn Subsystem>>;

    /// Build the RIB service from the session configuration.
    fn create_rib(&self, config: &ConfigTree, keychain: &Arc<KeyChain>)
        -> Result<Box<dyn Subsystem>>;
}

/// Factory for the in-crate forwarder and RIB service.
#[derive(Debug, Default, Clone, Copy)]
pub struct BuiltinDaemon;

impl DaemonFactory for BuiltinDaemon {
    fn create_forwarder(
        &self,
        config: &ConfigTree,
        keychain: &Arc<KeyChain>,
    ) -> Result<Box<dyn Subsystem>> {
        Ok(Box::new(Forwarder::from_config(config, keychain.clone())?))
    }

    fn create_rib(
        &self,
        config: &ConfigTree,
        keychain: &Arc<KeyChain>,
    ) -> Result<Box<dyn Subsystem>> {
        Ok(Box::new(RibService::from_config(config, keychain.clone())?))
    }
}
