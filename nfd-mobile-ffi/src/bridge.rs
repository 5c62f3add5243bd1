//! Conversions shared by the C ABI and JNI entry points.

use std::collections::HashMap;

use libc::{c_char, c_int, size_t};
use nfd_core::{Error, Result};
use once_cell::sync::Lazy;
use parking_lot::Mutex;
use serde_json::Value;

/// Status codes returned by the C ABI.
#[repr(C)]
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NfdStatus {
    /// Success.
    Ok = 0,
    /// `nfd_mobile_init` already ran; not an error.
    AlreadyInitialized = 1,
    /// Null or non-UTF-8 argument, bad JSON, or unknown level name.
    InvalidArgument = -1,
    /// Logging config token without `=`.
    MalformedConfig = -2,
    /// Output buffer cannot hold the text and its terminator.
    BufferTooSmall = -3,
    /// A panic was caught or another error occurred.
    Internal = -4,
}

impl NfdStatus {
    /// Integer returned across the C ABI.
    pub fn code(self) -> c_int {
        self as c_int
    }
}

impl From<&Error> for NfdStatus {
    fn from(e: &Error) -> Self {
        match e {
            Error::InvalidArgument(_) => Self::InvalidArgument,
            Error::MalformedConfig(_) => Self::MalformedConfig,
            _ => Self::Internal,
        }
    }
}

static LAST_ERROR: Lazy<Mutex<Option<String>>> = Lazy::new(|| Mutex::new(None));

/// Replace the message reported by `nfd_mobile_last_error`.
pub fn set_last_error(message: impl Into<String>) {
    *LAST_ERROR.lock() = Some(message.into());
}

/// Message of the most recent failure, if any.
pub fn last_error() -> Option<String> {
    LAST_ERROR.lock().clone()
}

/// Record `e` as the last error and return its status.
pub fn fail(e: &Error) -> NfdStatus {
    set_last_error(e.to_string());
    NfdStatus::from(e)
}

/// Start parameters from a flat JSON object. Scalars are stringified; nested values and
/// nulls are rejected.
pub fn parse_params(json: &str) -> Result<HashMap<String, String>> {
    let value: Value = match serde_json::from_str(json) {
        Ok(value) => value,
        Err(e) => return Err(Error::invalid_argument(format!("params: {e}"))),
    };
    let Value::Object(object) = value else {
        return Err(Error::invalid_argument("params must be a JSON object"));
    };

    object
        .into_iter()
        .map(|(key, value)| {
            let value = match value {
                Value::String(s) => s,
                Value::Bool(b) => b.to_string(),
                Value::Number(n) => n.to_string(),
                other => {
                    return Err(Error::invalid_argument(format!(
                        "params.{key}: unsupported value {other}"
                    )));
                }
            };
            Ok((key, value))
        })
        .collect()
}

/// Module names as a JSON array of strings.
pub fn modules_json(modules: &[String]) -> String {
    Value::from(modules.to_vec()).to_string()
}

/// Copy `text` NUL-terminated into `buf`. Fails without writing when it does not fit.
///
/// # Safety
/// `buf` must be null or valid for writes of `len` bytes.
pub unsafe fn copy_to_buffer(text: &str, buf: *mut c_char, len: size_t) -> NfdStatus {
    if buf.is_null() {
        return NfdStatus::InvalidArgument;
    }
    let bytes = text.as_bytes();
    if bytes.len() >= len {
        return NfdStatus::BufferTooSmall;
    }
    std::ptr::copy_nonoverlapping(bytes.as_ptr(), buf.cast::<u8>(), bytes.len());
    *buf.add(bytes.len()) = 0;
    NfdStatus::Ok
}
