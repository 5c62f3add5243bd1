//! One daemon session: configuration, subsystems and the blocking run.
//!
//! ```text
//! Constructed --finish_init--> Initialized --run--> Running --stop--> Stopping --> Stopped
//! ```
//!
//! A runner is not reusable. A later session builds a new runner on a new
//! [`RuntimeContext`].

use std::path::PathBuf;
use std::sync::Arc;

use nfd_core::log::WILDCARD;
use nfd_core::{
    nfd_log_debug, nfd_log_info, nfd_log_init, ConfigTree, Error, LogLevel, Logging, Result,
};
use parking_lot::Mutex;

use crate::context::{RuntimeContext, StopHandle};
use crate::keychain::KeyChain;
use crate::privilege::PrivilegeHelper;
use crate::subsystem::{BuiltinDaemon, DaemonFactory, Subsystem};

nfd_log_init!("NfdRunner");

const DEFAULT_LEVEL_KEY: &str = "default_level";

/// Where a runner is in its one-way lifecycle.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RunnerState {
    /// Built; configuration overrides still accepted.
    Constructed,
    /// Subsystems built and initialized.
    Initialized,
    /// `run` is driving the loop.
    Running,
    /// Stop observed; subsystems are shutting down.
    Stopping,
    /// `run` returned.
    Stopped,
}

#[derive(Debug)]
struct Shared {
    state: RunnerState,
    /// Bound only while `run` drives the loop.
    stop: Option<StopHandle>,
}

/// Owns the configuration and subsystems of one session.
pub struct Runner {
    ctx: Arc<RuntimeContext>,
    factory: Arc<dyn DaemonFactory>,
    logging: &'static Logging,
    config: ConfigTree,
    home: Option<PathBuf>,
    keychain: Option<Arc<KeyChain>>,
    forwarder: Option<Box<dyn Subsystem>>,
    rib: Option<Box<dyn Subsystem>>,
    shared: Arc<Mutex<Shared>>,
}

impl Runner {
    /// Runner with the built-in subsystems, logging through the global registry.
    pub fn new(ctx: Arc<RuntimeContext>) -> Result<Self> {
        Self::with_factory(ctx, Arc::new(BuiltinDaemon), Logging::global())
    }

    /// Runner whose subsystems come from `factory`.
    pub fn with_factory(
        ctx: Arc<RuntimeContext>,
        factory: Arc<dyn DaemonFactory>,
        logging: &'static Logging,
    ) -> Result<Self> {
        let config = ConfigTree::builtin()?;
        Ok(Self {
            ctx,
            factory,
            logging,
            config,
            home: None,
            keychain: None,
            forwarder: None,
            rib: None,
            shared: Arc::new(Mutex::new(Shared {
                state: RunnerState::Constructed,
                stop: None,
            })),
        })
    }

    /// Current lifecycle state.
    pub fn state(&self) -> RunnerState {
        self.shared.lock().state
    }

    /// Handle for stopping the runner from another thread.
    pub fn handle(&self) -> RunnerHandle {
        RunnerHandle {
            shared: self.shared.clone(),
        }
    }

    /// Configuration the subsystems are (or will be) built from.
    pub fn config(&self) -> &ConfigTree {
        &self.config
    }

    /// Key store of the session; set by `finish_init`, released when `run` returns.
    pub fn keychain(&self) -> Option<&Arc<KeyChain>> {
        self.keychain.as_ref()
    }

    /// Open the key store under `home` instead of `$HOME`.
    pub fn set_home(&mut self, home: impl Into<PathBuf>) {
        self.home = Some(home.into());
    }

    /// Override one configuration value. Only allowed before `finish_init`.
    pub fn set_config_value(&mut self, path: &str, value: &str) -> Result<()> {
        if self.state() != RunnerState::Constructed {
            return Err(Error::invalid_argument(format!(
                "cannot override '{path}' after initialization"
            )));
        }
        nfd_log_debug!("config override {path}={value}");
        self.config.put(path, value)
    }

    /// [`set_config_value`](Self::set_config_value) for each pair, in order.
    pub fn apply_overrides<I, K, V>(&mut self, overrides: I) -> Result<()>
    where
        I: IntoIterator<Item = (K, V)>,
        K: AsRef<str>,
        V: AsRef<str>,
    {
        for (path, value) in overrides {
            self.set_config_value(path.as_ref(), value.as_ref())?;
        }
        Ok(())
    }

    /// Build and initialize the forwarder, then the RIB service.
    ///
    /// On error the runner stays `Constructed`; dropping it releases whatever was built.
    pub fn finish_init(&mut self) -> Result<()> {
        if self.state() != RunnerState::Constructed {
            return Err(Error::unknown("finish_init called twice"));
        }
        self.apply_log_section()?;

        let keychain = Arc::new(match &self.home {
            Some(home) => KeyChain::open_in(home)?,
            None => KeyChain::open()?,
        });

        {
            // sockets created here register with this session's loop
            let _entered = self.ctx.enter();

            let mut forwarder = self.factory.create_forwarder(&self.config, &keychain)?;
            forwarder.initialize()?;
            nfd_log_debug!("{} initialized", forwarder.name());
            self.forwarder = Some(forwarder);

            let mut rib = self.factory.create_rib(&self.config, &keychain)?;
            rib.initialize()?;
            nfd_log_debug!("{} initialized", rib.name());
            self.rib = Some(rib);
        }
        self.keychain = Some(keychain);

        let privileges = PrivilegeHelper::from_config(&self.config)?;
        privileges.drop_privileges()?;

        self.shared.lock().state = RunnerState::Initialized;
        Ok(())
    }

    /// Drive the event loop until stopped. Blocks the calling thread.
    ///
    /// Both subsystems are shut down on the loop (RIB service first) and released before
    /// this returns.
    pub fn run(&mut self) -> Result<()> {
        if self.state() != RunnerState::Initialized {
            return Err(Error::unknown("run called before finish_init"));
        }
        let forwarder = self.forwarder.take();
        let rib = self.rib.take();
        let (Some(mut forwarder), Some(mut rib)) = (forwarder, rib) else {
            return Err(Error::unknown("subsystems missing after finish_init"));
        };

        {
            let mut shared = self.shared.lock();
            shared.stop = Some(self.ctx.stop_handle());
            shared.state = RunnerState::Running;
        }
        nfd_log_info!("running");

        let io = self.ctx.io_handle();
        let shared = self.shared.clone();
        let result = self.ctx.block_on(async move {
            let attached = forwarder.attach(&io).and_then(|()| rib.attach(&io));
            if attached.is_ok() {
                io.stopped().await;
            }
            shared.lock().state = RunnerState::Stopping;
            rib.shutdown().await;
            forwarder.shutdown().await;
            attached
        });

        self.keychain = None;
        {
            let mut shared = self.shared.lock();
            shared.stop = None;
            shared.state = RunnerState::Stopped;
        }
        nfd_log_info!("stopped");
        result
    }

    fn apply_log_section(&self) -> Result<()> {
        let Some(section) = self.config.section("log") else {
            return Ok(());
        };

        let level_of = |key: &str, value: &toml::Value| -> Result<LogLevel> {
            let Some(name) = value.as_str() else {
                let why = format!("log.{key} must be a level name");
                return Err(Error::invalid_argument(why));
            };
            name.parse()
        };

        if let Some(value) = section.get(DEFAULT_LEVEL_KEY) {
            self.logging.set_default_level(level_of(DEFAULT_LEVEL_KEY, value)?);
        }
        for (module, value) in section {
            if module == DEFAULT_LEVEL_KEY {
                continue;
            }
            let level = level_of(module, value)?;
            if module == WILDCARD {
                self.logging.set_default_level(level);
            } else {
                self.logging.set_level(module, level);
            }
        }
        Ok(())
    }
}

/// Thread-safe view of a runner that may be running on another thread.
#[derive(Clone)]
pub struct RunnerHandle {
    shared: Arc<Mutex<Shared>>,
}

impl RunnerHandle {
    /// Request the loop to stop. A no-op unless `run` is in progress.
    pub fn stop(&self) {
        if let Some(stop) = &self.shared.lock().stop {
            stop.stop();
        }
    }

    /// Current state of the runner.
    pub fn state(&self) -> RunnerState {
        self.shared.lock().state
    }
}
