//! Process-wide session slot behind the start/stop/isRunning entry points.
//!
//! At most one session exists at a time. `start` and `stop` never block: the session runs
//! on its own `nfd-runner` thread and clears the slot when it exits.

use std::collections::HashMap;
use std::panic::{self, AssertUnwindSafe};
use std::sync::Arc;
use std::time::Duration;

use nfd_core::{nfd_log_debug, nfd_log_fatal, nfd_log_info, nfd_log_init, Error, Logging, Result};
use once_cell::sync::Lazy;
use parking_lot::{Condvar, Mutex};

use crate::context::{RuntimeContext, StopHandle};
use crate::runner::Runner;
use crate::subsystem::{BuiltinDaemon, DaemonFactory};

nfd_log_init!("NfdWrapper");

/// Parameter naming the directory used as `HOME` for the session.
pub const HOME_PATH_KEY: &str = "homePath";

const RUNNER_THREAD: &str = "nfd-runner";

static GLOBAL: Lazy<SessionManager> = Lazy::new(|| {
    crate::register_log_modules();
    SessionManager::new(Arc::new(BuiltinDaemon), Logging::global())
});

#[derive(Debug)]
struct Session {
    id: u64,
    /// Set once the session's context exists.
    stop: Option<StopHandle>,
    stop_requested: bool,
    runner_live: bool,
}

#[derive(Debug, Default)]
struct Slot {
    session: Option<Session>,
    next_id: u64,
}

#[derive(Default)]
struct Shared {
    slot: Mutex<Slot>,
    idle: Condvar,
}

/// Owner of the single session slot.
pub struct SessionManager {
    factory: Arc<dyn DaemonFactory>,
    logging: &'static Logging,
    shared: Arc<Shared>,
}

impl SessionManager {
    /// The manager used by the FFI entry points.
    pub fn global() -> &'static SessionManager {
        &GLOBAL
    }

    /// Manager whose sessions use `factory` and configure `logging`.
    pub fn new(factory: Arc<dyn DaemonFactory>, logging: &'static Logging) -> Self {
        Self {
            factory,
            logging,
            shared: Arc::default(),
        }
    }

    /// Start a session unless one exists. Returns immediately.
    ///
    /// `params` must carry [`HOME_PATH_KEY`]; every other entry is a dotted-path
    /// configuration override. Failures are logged at FATAL.
    pub fn start(&self, params: HashMap<String, String>) {
        let home = params.get(HOME_PATH_KEY).filter(|h| !h.is_empty());
        let Some(home) = home.cloned() else {
            nfd_log_fatal!("cannot start NFD: '{HOME_PATH_KEY}' parameter is missing");
            return;
        };

        let id = {
            let mut slot = self.shared.slot.lock();
            if slot.session.is_some() {
                nfd_log_info!("NFD is already running; start request ignored");
                return;
            }
            slot.next_id += 1;
            let id = slot.next_id;
            slot.session = Some(Session {
                id,
                stop: None,
                stop_requested: false,
                runner_live: false,
            });
            id
        };

        let factory = self.factory.clone();
        let logging = self.logging;
        let shared = self.shared.clone();
        let spawned = std::thread::Builder::new()
            .name(RUNNER_THREAD.to_owned())
            .spawn(move || {
                run_session(id, home, params, factory, logging, shared);
            });

        if let Err(e) = spawned {
            nfd_log_fatal!("cannot spawn {RUNNER_THREAD} thread: {e}");
            self.shared.release(id);
        }
    }

    /// Ask the active session to stop. Does not wait for it.
    pub fn stop(&self) {
        let mut slot = self.shared.slot.lock();
        match slot.session.as_mut() {
            None => nfd_log_debug!("stop requested but NFD is not running"),
            Some(session) => {
                nfd_log_info!("stopping NFD");
                session.stop_requested = true;
                if let Some(stop) = &session.stop {
                    stop.stop();
                }
            }
        }
    }

    /// True while the session's runner exists.
    pub fn is_running(&self) -> bool {
        self.shared
            .slot
            .lock()
            .session
            .as_ref()
            .is_some_and(|s| s.runner_live)
    }

    /// Block until no session exists or `timeout` elapses; true when idle.
    pub fn wait_idle(&self, timeout: Duration) -> bool {
        let mut slot = self.shared.slot.lock();
        self.shared
            .idle
            .wait_while_for(&mut slot, |slot| slot.session.is_some(), timeout);
        slot.session.is_none()
    }

    /// Names of every registered log module.
    pub fn list_log_modules(&self) -> Vec<String> {
        self.logging.module_names()
    }
}

impl Shared {
    fn release(&self, id: u64) {
        let mut slot = self.slot.lock();
        if slot.session.as_ref().is_some_and(|s| s.id == id) {
            slot.session = None;
        }
        self.idle.notify_all();
    }

    fn with_session(&self, id: u64, f: impl FnOnce(&mut Session)) {
        if let Some(session) = self.slot.lock().session.as_mut().filter(|s| s.id == id) {
            f(session);
        }
    }
}

fn run_session(
    id: u64,
    home: String,
    params: HashMap<String, String>,
    factory: Arc<dyn DaemonFactory>,
    logging: &'static Logging,
    shared: Arc<Shared>,
) {
    let outcome = panic::catch_unwind(AssertUnwindSafe(|| {
        session_main(id, &home, &params, factory, logging, &shared)
    }));
    match outcome {
        Ok(Ok(())) => nfd_log_info!("NFD session ended"),
        Ok(Err(e)) => nfd_log_fatal!("NFD session failed [{}]: {e}", e.kind()),
        Err(payload) => nfd_log_fatal!("NFD session panicked: {}", panic_message(&*payload)),
    }
    shared.release(id);
}

fn session_main(
    id: u64,
    home: &str,
    params: &HashMap<String, String>,
    factory: Arc<dyn DaemonFactory>,
    logging: &'static Logging,
    shared: &Shared,
) -> Result<()> {
    // HOME is process-wide and unsynchronized with threads that read the environment,
    // JVM threads calling getenv included. The key store gets its directory through
    // `Runner::set_home`; HOME stays set for libraries that resolve it themselves.
    std::env::set_var("HOME", home);

    let ctx = Arc::new(RuntimeContext::new()?);
    shared.with_session(id, |session| {
        let stop = ctx.stop_handle();
        if session.stop_requested {
            stop.stop();
        }
        session.stop = Some(stop);
    });

    let mut runner = Runner::with_factory(ctx, factory, logging)?;
    runner.set_home(home);
    shared.with_session(id, |session| session.runner_live = true);

    let overrides = params.iter().filter(|(key, _)| *key != HOME_PATH_KEY);
    runner.apply_overrides(overrides)?;
    runner.finish_init()?;
    runner.run()
}

fn panic_message(payload: &(dyn std::any::Any + Send)) -> String {
    if let Some(s) = payload.downcast_ref::<&str>() {
        (*s).to_owned()
    } else if let Some(s) = payload.downcast_ref::<String>() {
        s.clone()
    } else {
        Error::unknown("non-string panic payload").to_string()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn manager() -> SessionManager {
        let logging = Box::leak(Box::new(Logging::new()));
        SessionManager::new(Arc::new(BuiltinDaemon), logging)
    }

    #[test]
    fn panic_messages() {
        let payload = panic::catch_unwind(|| panic!("boom {}", 1)).unwrap_err();
        assert_eq!(panic_message(&*payload), "boom 1");
        let payload = panic::catch_unwind(|| panic!("static")).unwrap_err();
        assert_eq!(panic_message(&*payload), "static");
    }

    #[test]
    fn stop_without_session_is_noop() {
        let manager = manager();
        manager.stop();
        manager.stop();
        assert!(!manager.is_running());
        assert!(manager.wait_idle(Duration::from_millis(1)));
    }

    #[test]
    fn missing_home_starts_nothing() {
        let manager = manager();
        manager.start(HashMap::new());
        let empty_home = HashMap::from([(HOME_PATH_KEY.to_owned(), String::new())]);
        manager.start(empty_home);
        assert!(manager.shared.slot.lock().session.is_none());
    }
}
