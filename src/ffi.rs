//! C ABI entry points for hosts that drive an engine attachment directly
//!
//! Hosts implement [`HostApp`] and use `export_host_app!` to generate the
//! constructors; the remaining entry points here are shared by every host.

use std::{
    ffi::{CStr, CString, c_char},
    sync::Mutex,
};

use log::error;

use crate::{Engine, HostApp, LaunchContext};

/// Stores the last error that occurred in an entry point
static LAST_ERROR: Mutex<Option<String>> = Mutex::new(None);

/// Store an error message for the host to pick up
#[doc(hidden)]
pub fn store_error(message: String) {
    error!("{message}");
    if let Ok(mut last_error) = LAST_ERROR.lock() {
        *last_error = Some(message);
    }
}

/// Retrieve and clear the last error message
#[doc(hidden)]
pub fn take_last_error() -> Option<String> {
    LAST_ERROR.lock().ok().and_then(|mut e| e.take())
}

/// Creates an engine from a JSON object of launch extras; a null pointer
/// means no extras.
///
/// # Safety
/// `extras_json` must be null or a valid NUL-terminated string.
#[doc(hidden)]
pub unsafe fn create_engine<A: HostApp>(extras_json: *const c_char) -> *mut Engine {
    let launch = if extras_json.is_null() {
        LaunchContext::new()
    } else {
        let json = match unsafe { CStr::from_ptr(extras_json) }.to_str() {
            Ok(json) => json,
            Err(_) => {
                store_error("Launch extras are not valid UTF-8".to_string());
                return std::ptr::null_mut();
            }
        };
        match LaunchContext::from_json(json) {
            Ok(launch) => launch,
            Err(e) => {
                store_error(format!("Invalid launch extras: {e}"));
                return std::ptr::null_mut();
            }
        }
    };

    Box::into_raw(Box::new(Engine::attach::<A>(launch)))
}

/// Creates an engine from the process launch arguments
#[doc(hidden)]
pub fn create_engine_from_args<A: HostApp>() -> *mut Engine {
    let launch = LaunchContext::from_launch_args(std::env::args().skip(1));
    Box::into_raw(Box::new(Engine::attach::<A>(launch)))
}

/// Creates an engine from a launch context assembled by platform glue,
/// taking ownership of it.
///
/// # Safety
/// `launch` must be null or a pointer obtained from `Box::into_raw`.
#[doc(hidden)]
pub unsafe fn attach_engine<A: HostApp>(launch: *mut LaunchContext) -> *mut Engine {
    let launch = if launch.is_null() {
        LaunchContext::new()
    } else {
        *unsafe { Box::from_raw(launch) }
    };
    Box::into_raw(Box::new(Engine::attach::<A>(launch)))
}

/// Export a host application
///
/// Generates:
/// - `webspace_engine_create(extras_json)` - attach an engine from JSON extras
/// - `webspace_engine_create_from_launch_args()` - attach from process arguments
/// - `webspace_engine_attach(launch)` - attach from a prepared launch context
///
/// # Example
///
/// ```no_run
/// use webspace_host::{WebspaceHost, export_host_app};
///
/// export_host_app!(WebspaceHost);
/// ```
#[macro_export]
macro_rules! export_host_app {
    ($app_type:ty) => {
        /// Attach an engine; `extras_json` is a JSON object of launch extras or null
        #[unsafe(no_mangle)]
        pub unsafe extern "C" fn webspace_engine_create(
            extras_json: *const std::os::raw::c_char,
        ) -> *mut $crate::Engine {
            unsafe { $crate::ffi::create_engine::<$app_type>(extras_json) }
        }

        /// Attach an engine configured from `-KEY value` process arguments
        #[unsafe(no_mangle)]
        pub extern "C" fn webspace_engine_create_from_launch_args() -> *mut $crate::Engine {
            $crate::ffi::create_engine_from_args::<$app_type>()
        }

        /// Attach an engine from a launch context built by platform glue
        #[unsafe(no_mangle)]
        pub unsafe extern "C" fn webspace_engine_attach(
            launch: *mut $crate::LaunchContext,
        ) -> *mut $crate::Engine {
            unsafe { $crate::ffi::attach_engine::<$app_type>(launch) }
        }
    };
}

/// Deliver an encoded call on `channel` and return the encoded reply.
///
/// Returns null with `*out_len == 0` for a not-implemented reply or on
/// error; errors are available from `webspace_engine_get_last_error`. A
/// non-null buffer must be released with `webspace_free_buffer`.
///
/// # Safety
/// `engine` must come from an engine constructor, `channel` must be a valid
/// NUL-terminated string, `data` must point to `len` readable bytes (or be
/// null when `len` is 0) and `out_len` must be writable.
#[unsafe(no_mangle)]
pub unsafe extern "C" fn webspace_engine_send(
    engine: *mut Engine,
    channel: *const c_char,
    data: *const u8,
    len: usize,
    out_len: *mut usize,
) -> *mut u8 {
    if out_len.is_null() {
        store_error("Null out_len pointer".to_string());
        return std::ptr::null_mut();
    }
    unsafe { *out_len = 0 };

    if engine.is_null() || channel.is_null() || (data.is_null() && len > 0) {
        store_error("Null pointer passed to webspace_engine_send".to_string());
        return std::ptr::null_mut();
    }

    let channel = match unsafe { CStr::from_ptr(channel) }.to_str() {
        Ok(channel) => channel,
        Err(_) => {
            store_error("Channel name is not valid UTF-8".to_string());
            return std::ptr::null_mut();
        }
    };
    let payload = if len == 0 {
        Vec::new()
    } else {
        unsafe { std::slice::from_raw_parts(data, len) }.to_vec()
    };

    let engine = unsafe { &mut *engine };
    match engine.send_raw(channel, payload) {
        Ok(reply) if reply.is_empty() => std::ptr::null_mut(),
        Ok(reply) => {
            let reply = reply.into_boxed_slice();
            unsafe { *out_len = reply.len() };
            Box::into_raw(reply) as *mut u8
        }
        Err(e) => {
            store_error(format!("Failed to deliver call on `{channel}`: {e}"));
            std::ptr::null_mut()
        }
    }
}

/// Free a buffer returned by `webspace_engine_send`
///
/// # Safety
/// `buffer` and `len` must be exactly what `webspace_engine_send` returned.
#[unsafe(no_mangle)]
pub unsafe extern "C" fn webspace_free_buffer(buffer: *mut u8, len: usize) {
    if !buffer.is_null() {
        unsafe {
            let _ = Box::from_raw(std::ptr::slice_from_raw_parts_mut(buffer, len));
        }
    }
}

/// Rebuild the engine attachment, dropping every handler of the old one
///
/// # Safety
/// `engine` must be null or come from an engine constructor.
#[unsafe(no_mangle)]
pub unsafe extern "C" fn webspace_engine_recreate(engine: *mut Engine) -> u8 {
    if engine.is_null() {
        store_error("Null engine pointer".to_string());
        return 1;
    }
    unsafe { (*engine).recreate() };
    0
}

/// Get the last error message (if any) and clear it
/// The caller is responsible for freeing the returned string with webspace_free_error
#[unsafe(no_mangle)]
pub extern "C" fn webspace_engine_get_last_error() -> *mut c_char {
    if let Some(error) = take_last_error() {
        if let Ok(c_string) = CString::new(error) {
            return c_string.into_raw();
        }
    }
    std::ptr::null_mut()
}

/// Free an error string returned by webspace_engine_get_last_error
///
/// # Safety
/// `error` must be null or a pointer returned by `webspace_engine_get_last_error`.
#[unsafe(no_mangle)]
pub unsafe extern "C" fn webspace_free_error(error: *mut c_char) {
    if !error.is_null() {
        unsafe {
            let _ = CString::from_raw(error);
        }
    }
}

/// Cleanup and destroy the engine
///
/// # Safety
/// `engine` must be null or come from an engine constructor, and must not be
/// used afterwards.
#[unsafe(no_mangle)]
pub unsafe extern "C" fn webspace_engine_destroy(engine: *mut Engine) {
    if !engine.is_null() {
        unsafe {
            let _ = Box::from_raw(engine);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::WebspaceHost;

    fn send(engine: *mut Engine, channel: &CStr, data: &[u8]) -> Option<Vec<u8>> {
        let mut len = 0usize;
        let buffer =
            unsafe { webspace_engine_send(engine, channel.as_ptr(), data.as_ptr(), data.len(), &mut len) };
        if buffer.is_null() {
            assert_eq!(len, 0);
            return None;
        }
        let reply = unsafe { std::slice::from_raw_parts(buffer, len) }.to_vec();
        unsafe { webspace_free_buffer(buffer, len) };
        Some(reply)
    }

    #[test]
    fn round_trip_over_c_abi() {
        let engine = unsafe { create_engine::<WebspaceHost>(c"{\"DEMO_MODE\": true}".as_ptr()) };
        assert!(!engine.is_null());

        let reply = send(engine, c"app.channel", br#"{"method":"getDemoMode","args":null}"#);
        assert_eq!(reply.as_deref(), Some(&b"[true]"[..]));

        let reply = send(engine, c"app.channel", br#"{"method":"unknownMethod"}"#);
        assert_eq!(reply, None);

        assert_eq!(unsafe { webspace_engine_recreate(engine) }, 0);
        let reply = send(engine, c"app.channel", br#"{"method":"getDemoMode"}"#);
        assert_eq!(reply.as_deref(), Some(&b"[true]"[..]));

        unsafe { webspace_engine_destroy(engine) };
    }

    #[test]
    fn null_extras_default_to_empty_context() {
        let engine = unsafe { create_engine::<WebspaceHost>(std::ptr::null()) };
        let reply = send(engine, c"app.channel", br#"{"method":"getDemoMode"}"#);
        assert_eq!(reply.as_deref(), Some(&b"[false]"[..]));
        unsafe { webspace_engine_destroy(engine) };
    }

    #[test]
    fn attach_takes_ownership_of_launch_context() {
        let launch = Box::into_raw(Box::new(LaunchContext::new().with_extra("DEMO_MODE", true)));
        let engine = unsafe { attach_engine::<WebspaceHost>(launch) };
        let reply = send(engine, c"app.channel", br#"{"method":"getDemoMode"}"#);
        assert_eq!(reply.as_deref(), Some(&b"[true]"[..]));
        unsafe { webspace_engine_destroy(engine) };
    }

    #[test]
    fn null_engine_is_reported() {
        let mut len = 7usize;
        let buffer = unsafe {
            webspace_engine_send(std::ptr::null_mut(), c"app.channel".as_ptr(), std::ptr::null(), 0, &mut len)
        };
        assert!(buffer.is_null());
        assert_eq!(len, 0);
        assert!(take_last_error().is_some());
        assert_eq!(unsafe { webspace_engine_recreate(std::ptr::null_mut()) }, 1);
    }
}
