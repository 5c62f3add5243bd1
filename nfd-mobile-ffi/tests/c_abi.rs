//! End-to-end checks of the C ABI against the global session manager.

use std::ffi::{CStr, CString};
use std::os::raw::c_char;
use std::time::{Duration, Instant};

use nfd_core::{LogLevel, Logging};
use nfd_daemon::SessionManager;
use nfd_mobile_ffi::*;
use parking_lot::{Mutex, MutexGuard};

static SERIAL: Mutex<()> = parking_lot::const_mutex(());

fn setup() -> MutexGuard<'static, ()> {
    let guard = SERIAL.lock();
    let status = nfd_mobile_init();
    let expected = [NfdStatus::Ok, NfdStatus::AlreadyInitialized];
    assert!(expected.iter().any(|s| s.code() == status));
    guard
}

fn read_buffer(f: unsafe extern "C" fn(*mut c_char, usize) -> i32) -> String {
    let mut buf = vec![0 as c_char; 4096];
    let status = unsafe { f(buf.as_mut_ptr(), buf.len()) };
    assert_eq!(status, NfdStatus::Ok.code());
    let text = unsafe { CStr::from_ptr(buf.as_ptr()) };
    text.to_str().unwrap().to_owned()
}

#[test]
fn log_modules_list_daemon_modules() {
    let _guard = setup();
    let json = read_buffer(nfd_mobile_log_modules);
    let modules: Vec<String> = serde_json::from_str(&json).unwrap();
    for name in ["Forwarder", "RibManager", "NfdRunner", "NfdWrapper"] {
        assert!(
            modules.iter().any(|m| m == name),
            "{name} missing from {json}"
        );
    }

    let mut tiny = [0 as c_char; 4];
    let status = unsafe { nfd_mobile_log_modules(tiny.as_mut_ptr(), tiny.len()) };
    assert_eq!(status, NfdStatus::BufferTooSmall.code());
}

#[test]
fn log_levels_apply_and_report_errors() {
    let _guard = setup();
    let good = CString::new("*=INFO:Forwarder=DEBUG").unwrap();
    let status = unsafe { nfd_mobile_set_log_levels(good.as_ptr()) };
    assert_eq!(status, NfdStatus::Ok.code());
    assert_eq!(Logging::global().level_of("Forwarder"), LogLevel::Debug);
    assert_eq!(Logging::global().level_of("RibManager"), LogLevel::Info);

    let partial = CString::new("RibManager=WARN:Broken").unwrap();
    assert_eq!(
        unsafe { nfd_mobile_set_log_levels(partial.as_ptr()) },
        NfdStatus::MalformedConfig.code()
    );
    assert_eq!(Logging::global().level_of("RibManager"), LogLevel::Warn);
    assert!(read_buffer(nfd_mobile_last_error).contains("Broken"));

    let unknown = CString::new("Forwarder=LOUD").unwrap();
    assert_eq!(
        unsafe { nfd_mobile_set_log_levels(unknown.as_ptr()) },
        NfdStatus::InvalidArgument.code()
    );
    assert!(read_buffer(nfd_mobile_last_error).contains("LOUD"));
}

#[test]
fn start_and_stop_session() {
    let _guard = setup();
    let home = tempfile::tempdir().unwrap();
    let params = serde_json::json!({
        "homePath": home.path().display().to_string(),
        "face_system.tcp.port": 0,
        "face_system.udp.port": 0,
    });
    let params = CString::new(params.to_string()).unwrap();

    let status = unsafe { nfd_mobile_start(params.as_ptr()) };
    assert_eq!(status, NfdStatus::Ok.code());
    let deadline = Instant::now() + Duration::from_secs(10);
    while nfd_mobile_is_running() == 0 {
        assert!(Instant::now() < deadline, "session never came up");
        std::thread::sleep(Duration::from_millis(5));
    }

    assert_eq!(nfd_mobile_stop(), NfdStatus::Ok.code());
    assert!(SessionManager::global().wait_idle(Duration::from_secs(10)));
    assert_eq!(nfd_mobile_is_running(), 0);

    // stopping again is harmless
    assert_eq!(nfd_mobile_stop(), NfdStatus::Ok.code());
}
