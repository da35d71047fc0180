//! Android-specific host integration with JNI functions
//!
//! The activity attaches one engine per `configureFlutterEngine` call and
//! forwards platform messages here; the launch context is read from the
//! activity's intent extras.
use jni::{
    JNIEnv,
    objects::{JByteArray, JObject, JString, JValue},
    sys::{jbyteArray, jlong},
};
use log::{debug, error, warn};

use crate::{DEMO_MODE_KEY, Engine, LaunchContext};

/// Builds the launch context from `activity.getIntent()`.
///
/// A missing intent or extra leaves the flag at its default.
pub fn launch_context_from_intent(
    env: &mut JNIEnv,
    activity: &JObject,
) -> jni::errors::Result<LaunchContext> {
    let intent = env
        .call_method(activity, "getIntent", "()Landroid/content/Intent;", &[])?
        .l()?;
    if intent.is_null() {
        debug!("Activity has no intent, using default launch context");
        return Ok(LaunchContext::new());
    }

    let key = env.new_string(DEMO_MODE_KEY)?;
    let demo_mode = env
        .call_method(
            &intent,
            "getBooleanExtra",
            "(Ljava/lang/String;Z)Z",
            &[(&key).into(), JValue::Bool(0)],
        )?
        .z()?;

    Ok(LaunchContext::new().with_extra(DEMO_MODE_KEY, demo_mode))
}

// ============================================================================
// JNI Entry Points
// ============================================================================

#[unsafe(no_mangle)]
pub extern "C" fn Java_org_codeberg_theoden8_webspace_MainActivity_nativeAttachEngine(
    mut env: JNIEnv,
    activity: JObject,
) -> jlong {
    let launch = match launch_context_from_intent(&mut env, &activity) {
        Ok(launch) => launch,
        Err(e) => {
            warn!("Failed to read intent extras, using defaults: {:?}", e);
            LaunchContext::new()
        }
    };

    // Provided by the host crate through export_host_app!
    unsafe extern "C" {
        fn webspace_engine_attach(launch: *mut LaunchContext) -> *mut Engine;
    }

    let engine_ptr = unsafe { webspace_engine_attach(Box::into_raw(Box::new(launch))) };
    if engine_ptr.is_null() {
        error!("Failed to attach engine");
        return 0;
    }

    debug!("Engine attached: {:p}", engine_ptr);
    engine_ptr as jlong
}

#[unsafe(no_mangle)]
pub extern "C" fn Java_org_codeberg_theoden8_webspace_MainActivity_nativeSendPlatformMessage(
    mut env: JNIEnv,
    _activity: JObject,
    engine_ptr: jlong,
    channel: JString,
    data: JByteArray,
) -> jbyteArray {
    let engine = engine_ptr as *mut Engine;
    if engine.is_null() {
        return JObject::null().into_raw() as jbyteArray;
    }

    let channel: String = match env.get_string(&channel) {
        Ok(channel) => channel.into(),
        Err(e) => {
            error!("Failed to read channel name: {:?}", e);
            return JObject::null().into_raw() as jbyteArray;
        }
    };

    let bytes = match env.convert_byte_array(data) {
        Ok(bytes) => bytes,
        Err(e) => {
            error!("Failed to convert byte array: {:?}", e);
            return JObject::null().into_raw() as jbyteArray;
        }
    };

    let engine = unsafe { &mut *engine };
    match engine.send_raw(&channel, bytes) {
        // Not implemented: the Java side sees a null reply
        Ok(reply) if reply.is_empty() => {}
        Ok(reply) => match env.byte_array_from_slice(&reply) {
            Ok(array) => return array.into_raw(),
            Err(e) => error!("Failed to create byte array: {:?}", e),
        },
        Err(e) => error!("Failed to deliver message on `{}`: {}", channel, e),
    }

    JObject::null().into_raw() as jbyteArray
}

#[unsafe(no_mangle)]
pub extern "C" fn Java_org_codeberg_theoden8_webspace_MainActivity_nativeDestroyEngine(
    _env: JNIEnv,
    _activity: JObject,
    engine_ptr: jlong,
) {
    if engine_ptr == 0 {
        return;
    }

    debug!("Destroying engine");
    unsafe {
        crate::ffi::webspace_engine_destroy(engine_ptr as *mut Engine);
    }
}
