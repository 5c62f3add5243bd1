//! Mobile FFI bindings for the embedded NFD.
//!
//! Two surfaces drive the same [`SessionManager`]:
//!
//! - JNI entry points for `net.named_data.nfd.service.NfdService` (Android only)
//! - a C ABI (`nfd_mobile_*`) usable from any host, returning [`NfdStatus`] codes
//!
//! ## Safety
//! No panic crosses either boundary. C strings passed in must be NUL-terminated; output
//! buffers must be valid for the length given.

use std::ffi::CStr;
use std::panic::{self, AssertUnwindSafe};

use libc::{c_char, c_int, size_t};
use nfd_core::{Error, Logging};
use nfd_daemon::SessionManager;
use once_cell::sync::OnceCell;
use tracing::{info, warn};

#[cfg(target_os = "android")]
mod android;
mod bridge;

pub use bridge::{last_error, parse_params, NfdStatus};

static INITIALIZED: OnceCell<()> = OnceCell::new();

/// Run `f`, turning a panic into [`NfdStatus::Internal`].
fn guarded(f: impl FnOnce() -> NfdStatus) -> c_int {
    match panic::catch_unwind(AssertUnwindSafe(f)) {
        Ok(status) => status.code(),
        Err(_) => {
            bridge::set_last_error("panic in native code");
            NfdStatus::Internal.code()
        }
    }
}

/// # Safety
/// `ptr` must be null or a NUL-terminated string.
unsafe fn str_arg<'a>(ptr: *const c_char, what: &str) -> Result<&'a str, Error> {
    if ptr.is_null() {
        return Err(Error::invalid_argument(format!("{what} is null")));
    }
    CStr::from_ptr(ptr)
        .to_str()
        .map_err(|e| Error::invalid_argument(format!("{what}: {e}")))
}

/// Install the tracing subscriber and register the daemon's log modules.
#[no_mangle]
pub extern "C" fn nfd_mobile_init() -> c_int {
    guarded(|| {
        // ignore error if a subscriber is already installed
        let _ = tracing_subscriber::fmt::try_init();

        if INITIALIZED.set(()).is_err() {
            warn!("NFD mobile FFI already initialized");
            return NfdStatus::AlreadyInitialized;
        }
        // first use registers every daemon log module
        let modules = SessionManager::global().list_log_modules();
        info!(modules = modules.len(), "NFD mobile FFI initialized");
        NfdStatus::Ok
    })
}

/// Start a session from a JSON object of string parameters. Must contain `homePath`.
///
/// # Safety
/// `params_json` must be null or a NUL-terminated string.
#[no_mangle]
pub unsafe extern "C" fn nfd_mobile_start(params_json: *const c_char) -> c_int {
    guarded(|| {
        let params = match str_arg(params_json, "params_json").and_then(parse_params) {
            Ok(params) => params,
            Err(e) => return bridge::fail(&e),
        };
        SessionManager::global().start(params);
        NfdStatus::Ok
    })
}

/// Ask the running session, if any, to stop. Returns without waiting.
#[no_mangle]
pub extern "C" fn nfd_mobile_stop() -> c_int {
    guarded(|| {
        SessionManager::global().stop();
        NfdStatus::Ok
    })
}

/// 1 while a session's runner exists, 0 otherwise.
#[no_mangle]
pub extern "C" fn nfd_mobile_is_running() -> c_int {
    panic::catch_unwind(|| SessionManager::global().is_running())
        .map_or(0, c_int::from)
}

/// Write the registered log module names as a JSON array.
///
/// # Safety
/// `buf` must be null or valid for writes of `len` bytes.
#[no_mangle]
pub unsafe extern "C" fn nfd_mobile_log_modules(buf: *mut c_char, len: size_t) -> c_int {
    guarded(|| {
        let json = bridge::modules_json(&SessionManager::global().list_log_modules());
        bridge::copy_to_buffer(&json, buf, len)
    })
}

/// Apply a `module=LEVEL:module=LEVEL` string to the global registry.
///
/// Tokens before a failing one stay applied.
///
/// # Safety
/// `config` must be null or a NUL-terminated string.
#[no_mangle]
pub unsafe extern "C" fn nfd_mobile_set_log_levels(config: *const c_char) -> c_int {
    guarded(|| {
        let config = match str_arg(config, "config") {
            Ok(config) => config,
            Err(e) => return bridge::fail(&e),
        };
        match Logging::global().set_levels(config) {
            Ok(()) => NfdStatus::Ok,
            Err(e) => bridge::fail(&e),
        }
    })
}

/// Copy the message of the last failed call into `buf`; empty when none.
///
/// # Safety
/// `buf` must be null or valid for writes of `len` bytes.
#[no_mangle]
pub unsafe extern "C" fn nfd_mobile_last_error(buf: *mut c_char, len: size_t) -> c_int {
    guarded(|| {
        let message = last_error().unwrap_or_default();
        bridge::copy_to_buffer(&message, buf, len)
    })
}
