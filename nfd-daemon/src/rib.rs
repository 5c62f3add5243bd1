//! Built-in RIB service: validates the `rib` section and drives remote-registration
//! refresh on the event loop.

use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use nfd_core::{nfd_log_info, nfd_log_init, nfd_log_trace, ConfigTree, Error, Result};
use serde::Deserialize;
use tokio::task::JoinHandle;

use crate::context::IoHandle;
use crate::keychain::KeyChain;
use crate::subsystem::Subsystem;

nfd_log_init!("RibManager");

/// `rib` section.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct RibSection {
    /// Validation of local prefix registrations.
    pub localhost_security: Option<LocalhostSecurity>,
    /// Propagation of local registrations to the hub; absent disables it.
    pub remote_register: Option<RemoteRegister>,
}

/// `rib.localhost_security` section.
#[derive(Debug, Clone, Deserialize)]
pub struct LocalhostSecurity {
    #[allow(missing_docs)]
    #[serde(rename = "trust-anchor")]
    pub trust_anchor: TrustAnchor,
}

/// Trust anchor of command validation: `any`, or `file` with a `file-name`.
#[derive(Debug, Clone, Deserialize)]
pub struct TrustAnchor {
    #[allow(missing_docs)]
    #[serde(rename = "type")]
    pub kind: String,
    #[allow(missing_docs)]
    #[serde(rename = "file-name", default)]
    pub file_name: Option<String>,
}

/// `rib.remote_register` section.
#[derive(Debug, Clone, Deserialize)]
pub struct RemoteRegister {
    /// Route cost announced to the hub.
    pub cost: u64,
    /// Milliseconds.
    pub timeout: u64,
    /// Retries per registration.
    pub retry: u32,
    /// Seconds.
    pub refresh_interval: u64,
}

impl RibSection {
    fn validate(&self) -> Result<()> {
        if let Some(security) = &self.localhost_security {
            let anchor = &security.trust_anchor;
            match anchor.kind.as_str() {
                "any" => {}
                "file" if anchor.file_name.as_deref().is_some_and(|f| !f.is_empty()) => {}
                "file" => {
                    return Err(Error::subsystem_init(
                        "rib.localhost_security: trust-anchor of type 'file' needs a file-name",
                    ));
                }
                other => {
                    return Err(Error::subsystem_init(format!(
                        "rib.localhost_security: unsupported trust-anchor type '{other}'"
                    )));
                }
            }
        }
        if let Some(remote) = &self.remote_register {
            if remote.refresh_interval == 0 {
                return Err(Error::subsystem_init(
                    "rib.remote_register: refresh_interval must be positive",
                ));
            }
        }
        Ok(())
    }
}

/// RIB subsystem: keeps the remote-registration refresh running while the session lives.
pub struct RibService {
    section: RibSection,
    keychain: Arc<KeyChain>,
    refresh: Option<JoinHandle<()>>,
}

impl RibService {
    /// Read and validate the `rib` section.
    pub fn from_config(config: &ConfigTree, keychain: Arc<KeyChain>) -> Result<Self> {
        let section: RibSection = config.section_as("rib")?;
        section.validate()?;
        Ok(Self {
            section,
            keychain,
            refresh: None,
        })
    }

    /// Parsed `rib` section.
    pub fn section(&self) -> &RibSection {
        &self.section
    }
}

#[async_trait]
impl Subsystem for RibService {
    fn name(&self) -> &str {
        "RibManager"
    }

    fn initialize(&mut self) -> Result<()> {
        let anchor = self
            .section
            .localhost_security
            .as_ref()
            .map_or("none", |s| s.trust_anchor.kind.as_str());
        nfd_log_info!(
            "localhost trust anchor={anchor} signing key={}",
            self.keychain.key_id()
        );
        Ok(())
    }

    fn attach(&mut self, io: &IoHandle) -> Result<()> {
        if let Some(remote) = self.section.remote_register.clone() {
            let period = Duration::from_secs(remote.refresh_interval);
            self.refresh = Some(io.spawn(async move {
                let mut ticker = tokio::time::interval(period);
                // first tick completes immediately
                ticker.tick().await;
                loop {
                    ticker.tick().await;
                    nfd_log_trace!(
                        "refresh remote registrations cost={} timeout={}ms retry={}",
                        remote.cost,
                        remote.timeout,
                        remote.retry
                    );
                }
            }));
        }
        Ok(())
    }

    async fn shutdown(&mut self) {
        if let Some(task) = self.refresh.take() {
            task.abort();
            let _ = task.await;
        }
        nfd_log_info!("rib service stopped");
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::context::RuntimeContext;

    fn build(overrides: &[(&str, &str)], home: &tempfile::TempDir) -> Result<RibService> {
        let mut config = ConfigTree::builtin().unwrap();
        for (path, value) in overrides {
            config.put(path, value).unwrap();
        }
        let keychain = Arc::new(KeyChain::open_in(home.path()).unwrap());
        RibService::from_config(&config, keychain)
    }

    #[test]
    fn builtin_section_parses() {
        let home = tempfile::tempdir().unwrap();
        let rib = build(&[], &home).unwrap();
        let remote = rib.section().remote_register.as_ref().unwrap();
        assert_eq!(remote.cost, 15);
        assert_eq!(remote.timeout, 10000);
        assert_eq!(remote.refresh_interval, 300);
        let security = rib.section().localhost_security.as_ref().unwrap();
        assert_eq!(security.trust_anchor.kind, "any");
    }

    #[test]
    fn invalid_sections_fail() {
        let home = tempfile::tempdir().unwrap();

        let no_refresh = ("rib.remote_register.refresh_interval", "0");
        let result = build(&[no_refresh], &home);
        assert!(matches!(result, Err(Error::SubsystemInit(_))));

        let dir_anchor = ("rib.localhost_security.trust-anchor.type", "dir");
        let result = build(&[dir_anchor], &home);
        assert!(matches!(result, Err(Error::SubsystemInit(_))));

        let file_anchor = ("rib.localhost_security.trust-anchor.type", "file");
        assert!(build(&[file_anchor], &home).is_err());
        let file_name = ("rib.localhost_security.trust-anchor.file-name", "anchor.cert");
        assert!(build(&[file_anchor, file_name], &home).is_ok());
    }

    #[test]
    fn refresh_ticker_stops_on_shutdown() {
        let home = tempfile::tempdir().unwrap();
        let mut rib = build(&[], &home).unwrap();
        rib.initialize().unwrap();

        let ctx = RuntimeContext::new().unwrap();
        let io = ctx.io_handle();
        ctx.block_on(async move {
            rib.attach(&io).unwrap();
            assert!(rib.refresh.is_some());
            rib.shutdown().await;
            assert!(rib.refresh.is_none());
        });
    }
}
