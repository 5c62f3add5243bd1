//! JNI entry points of `net.named_data.nfd.service.NfdService`.

use std::collections::HashMap;
use std::panic::{self, AssertUnwindSafe};

use jni::objects::{JClass, JObject, JString, JValue};
use jni::sys::{jboolean, jobject, JNI_FALSE, JNI_TRUE};
use jni::JNIEnv;
use nfd_core::{nfd_log_error, nfd_log_fatal, nfd_log_init, Logging};
use nfd_daemon::SessionManager;

nfd_log_init!("NfdService");

const ILLEGAL_ARGUMENT: &str = "java/lang/IllegalArgumentException";
const LIST_ADD_SIG: &str = "(Ljava/lang/Object;)Z";

/// Run a JNI body, logging a panic instead of unwinding into the VM.
fn guarded<T>(what: &str, fallback: T, f: impl FnOnce() -> T) -> T {
    match panic::catch_unwind(AssertUnwindSafe(f)) {
        Ok(value) => value,
        Err(payload) => {
            let message = payload
                .downcast_ref::<&str>()
                .map(|s| (*s).to_owned())
                .or_else(|| payload.downcast_ref::<String>().cloned())
                .unwrap_or_else(|| "unknown panic".to_owned());
            nfd_log_fatal!("panic in {what}: {message}");
            fallback
        }
    }
}

fn map_to_params(
    env: &mut JNIEnv,
    map: &JObject,
) -> jni::errors::Result<HashMap<String, String>> {
    let mut params = HashMap::new();
    let map = env.get_map(map)?;
    let mut entries = map.iter(env)?;
    while let Some((key, value)) = entries.next(env)? {
        let key = JString::from(key);
        let value = JString::from(value);
        let k: String = env.get_string(&key)?.into();
        let v: String = env.get_string(&value)?.into();
        env.delete_local_ref(key)?;
        env.delete_local_ref(value)?;
        params.insert(k, v);
    }
    Ok(params)
}

fn string_list<'local>(
    env: &mut JNIEnv<'local>,
    items: &[String],
) -> jni::errors::Result<JObject<'local>> {
    let list = env.new_object("java/util/ArrayList", "()V", &[])?;
    for item in items {
        let s = env.new_string(item)?;
        env.call_method(&list, "add", LIST_ADD_SIG, &[JValue::Object(&s)])?;
        env.delete_local_ref(s)?;
    }
    Ok(list)
}

/// Starts the daemon from a `Map<String, String>` of parameters.
#[no_mangle]
pub extern "system" fn Java_net_named_1data_nfd_service_NfdService_startNfd(
    mut env: JNIEnv,
    _class: JClass,
    params: JObject,
) {
    guarded("startNfd", (), || match map_to_params(&mut env, &params) {
        Ok(params) => SessionManager::global().start(params),
        Err(e) => nfd_log_fatal!("cannot read start parameters: {e}"),
    })
}

/// Stops the daemon and waits for it to wind down.
#[no_mangle]
pub extern "system" fn Java_net_named_1data_nfd_service_NfdService_stopNfd(
    _env: JNIEnv,
    _class: JClass,
) {
    guarded("stopNfd", (), || SessionManager::global().stop())
}

/// Whether a session is live.
#[no_mangle]
pub extern "system" fn Java_net_named_1data_nfd_service_NfdService_isNfdRunning(
    _env: JNIEnv,
    _class: JClass,
) -> jboolean {
    guarded("isNfdRunning", JNI_FALSE, || {
        if SessionManager::global().is_running() {
            JNI_TRUE
        } else {
            JNI_FALSE
        }
    })
}

/// Log module names as a `java.util.ArrayList`, or null on failure.
#[no_mangle]
pub extern "system" fn Java_net_named_1data_nfd_service_NfdService_getNfdLogModules(
    mut env: JNIEnv,
    _class: JClass,
) -> jobject {
    guarded("getNfdLogModules", std::ptr::null_mut(), || {
        let modules = SessionManager::global().list_log_modules();
        match string_list(&mut env, &modules) {
            Ok(list) => list.into_raw(),
            Err(e) => {
                nfd_log_error!("cannot build module list: {e}");
                std::ptr::null_mut()
            }
        }
    })
}

/// Throws `IllegalArgumentException` when the string is rejected; earlier tokens stay
/// applied.
#[no_mangle]
pub extern "system" fn Java_net_named_1data_nfd_service_NfdService_setLogLevels(
    mut env: JNIEnv,
    _class: JClass,
    config: JString,
) {
    guarded("setLogLevels", (), || {
        let message = match env.get_string(&config) {
            Ok(config) => match Logging::global().set_levels(&String::from(config)) {
                Ok(()) => return,
                Err(e) => e.to_string(),
            },
            Err(e) => e.to_string(),
        };
        if let Err(e) = env.throw_new(ILLEGAL_ARGUMENT, &message) {
            nfd_log_error!("cannot throw {ILLEGAL_ARGUMENT}: {e}");
        }
    })
}
