// Platform log backends (logcat on device, tracing elsewhere)

use std::ffi::{c_int, CString};
use std::sync::Arc;

use once_cell::sync::OnceCell;
use parking_lot::Mutex;

/// Android `android_LogPriority` values.
#[repr(i32)]
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum Priority {
    /// `ANDROID_LOG_VERBOSE`
    Verbose = 2,
    /// `ANDROID_LOG_DEBUG`
    Debug = 3,
    /// `ANDROID_LOG_INFO`
    Info = 4,
    /// `ANDROID_LOG_WARN`
    Warn = 5,
    /// `ANDROID_LOG_ERROR`
    Error = 6,
    /// `ANDROID_LOG_FATAL`
    Fatal = 7,
}

impl Priority {
    /// One-letter logcat label.
    pub const fn as_str(self) -> &'static str {
        match self {
            Priority::Verbose => "V",
            Priority::Debug => "D",
            Priority::Info => "I",
            Priority::Warn => "W",
            Priority::Error => "E",
            Priority::Fatal => "F",
        }
    }
}

/// Destination of formatted log records.
///
/// Delivery failures are swallowed by implementations; nothing is reported back.
pub trait PlatformLog: Send + Sync {
    /// Deliver one record.
    fn write(&self, priority: Priority, tag: &str, message: &str);
}

static PLATFORM: OnceCell<Box<dyn PlatformLog>> = OnceCell::new();

/// Install the process-wide platform log. Returns false if one was already installed
/// (explicitly or implicitly by the first message logged).
pub fn install_platform_log(log: impl PlatformLog + 'static) -> bool {
    PLATFORM.set(Box::new(log)).is_ok()
}

/// The installed platform log, falling back to logcat on Android and `tracing` elsewhere.
pub fn platform_log() -> &'static dyn PlatformLog {
    PLATFORM.get_or_init(default_platform_log).as_ref()
}

#[cfg(target_os = "android")]
fn default_platform_log() -> Box<dyn PlatformLog> {
    Box::new(AndroidLog)
}

#[cfg(not(target_os = "android"))]
fn default_platform_log() -> Box<dyn PlatformLog> {
    Box::new(TracingLog)
}

/// Arguments of one `__android_log_write` call.
///
/// Interior NUL bytes cannot cross the C boundary and are dropped from both strings.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AndroidRecord {
    /// Raw `android_LogPriority`.
    pub priority: c_int,
    /// Logcat tag.
    pub tag: CString,
    /// Message body.
    pub text: CString,
}

impl AndroidRecord {
    /// Builds the call arguments for a record.
    pub fn new(priority: Priority, tag: &str, message: &str) -> Self {
        Self {
            priority: priority as c_int,
            tag: c_string(tag),
            text: c_string(message),
        }
    }
}

fn c_string(s: &str) -> CString {
    let bytes: Vec<u8> = s.bytes().filter(|&b| b != 0).collect();
    CString::new(bytes).unwrap_or_default()
}

/// Writes records straight to logcat, keeping the module tag and every priority up to
/// `ANDROID_LOG_FATAL`.
#[cfg(target_os = "android")]
#[derive(Debug, Clone, Copy, Default)]
pub struct AndroidLog;

#[cfg(target_os = "android")]
impl PlatformLog for AndroidLog {
    fn write(&self, priority: Priority, tag: &str, message: &str) {
        let record = AndroidRecord::new(priority, tag, message);
        // SAFETY: both pointers come from live, NUL-terminated `CString`s.
        unsafe {
            android_log_sys::__android_log_write(
                record.priority,
                record.tag.as_ptr(),
                record.text.as_ptr(),
            );
        }
    }
}

/// Emits each record as a `tracing` event carrying the tag and the Android priority.
#[derive(Debug, Clone, Copy, Default)]
pub struct TracingLog;

impl PlatformLog for TracingLog {
    fn write(&self, priority: Priority, tag: &str, message: &str) {
        match priority {
            Priority::Verbose => tracing::trace!(tag, "{message}"),
            Priority::Debug => tracing::debug!(tag, "{message}"),
            Priority::Info => tracing::info!(tag, "{message}"),
            Priority::Warn => tracing::warn!(tag, "{message}"),
            Priority::Error => tracing::error!(tag, "{message}"),
            Priority::Fatal => tracing::error!(tag, fatal = true, "{message}"),
        }
    }
}

/// A record captured by [`MemoryLog`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LogRecord {
    /// Priority it was written with.
    pub priority: Priority,
    /// Module tag.
    pub tag: String,
    /// Message text.
    pub message: String,
}

/// Keeps every record in memory. Clones share the same record list.
#[derive(Debug, Clone, Default)]
pub struct MemoryLog {
    records: Arc<Mutex<Vec<LogRecord>>>,
}

impl MemoryLog {
    /// Empty log.
    pub fn new() -> Self {
        Self::default()
    }

    /// Snapshot of every record so far.
    pub fn records(&self) -> Vec<LogRecord> {
        self.records.lock().clone()
    }

    /// Records emitted under `tag`, in order.
    pub fn records_for(&self, tag: &str) -> Vec<LogRecord> {
        self.records
            .lock()
            .iter()
            .filter(|r| r.tag == tag)
            .cloned()
            .collect()
    }

    /// Forget every record.
    pub fn clear(&self) {
        self.records.lock().clear();
    }
}

impl PlatformLog for MemoryLog {
    fn write(&self, priority: Priority, tag: &str, message: &str) {
        self.records.lock().push(LogRecord {
            priority,
            tag: tag.to_owned(),
            message: message.to_owned(),
        });
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn memory_log_clones_share_records() {
        let log = MemoryLog::new();
        let other = log.clone();
        other.write(Priority::Info, "Native", "hello");
        log.write(Priority::Error, "Forwarder", "boom");
        assert_eq!(log.records().len(), 2);
        assert_eq!(log.records_for("Forwarder")[0].priority, Priority::Error);
        log.clear();
        assert!(other.records().is_empty());
    }

    #[test]
    fn priority_values_match_android() {
        assert_eq!(Priority::Verbose as i32, 2);
        assert_eq!(Priority::Fatal as i32, 7);
    }

    #[test]
    fn android_record_keeps_fatal_priority_and_tag() {
        let record = AndroidRecord::new(Priority::Fatal, "NfdWrapper", "session died");
        assert_eq!(record.priority, 7);
        assert_eq!(record.tag.to_str().unwrap(), "NfdWrapper");
        assert_eq!(record.text.to_str().unwrap(), "session died");

        let record = AndroidRecord::new(Priority::Verbose, "Forwarder", "x");
        assert_eq!(record.priority, 2);
        assert_eq!(record.tag.to_str().unwrap(), "Forwarder");
    }

    #[test]
    fn android_record_drops_interior_nul() {
        let record = AndroidRecord::new(Priority::Info, "Ta\0g", "a\0b");
        assert_eq!(record.tag.as_bytes(), b"Tag");
        assert_eq!(record.text.as_bytes(), b"ab");
    }

    #[test]
    fn tracing_log_accepts_every_priority() {
        let all = [
            Priority::Verbose,
            Priority::Debug,
            Priority::Info,
            Priority::Warn,
            Priority::Error,
            Priority::Fatal,
        ];
        for p in all {
            TracingLog.write(p, "Test", p.as_str());
        }
    }
}
