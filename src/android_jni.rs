//! JNI bindings for the Android app.
//!
//! Each public function here corresponds to an `external fun` declaration
//! in GuidanceBridge.kt. The function names follow JNI naming conventions:
//! Java_<package>_<class>_<method> with dots replaced by underscores.

use jni::objects::{JClass, JString};
use jni::sys::{jdouble, jstring};
use jni::JNIEnv;
use log::warn;

use crate::error::RouteError;
use crate::localization::format_distance;
use crate::route_builder::{route_from_gpx, BuildOptions};

/// Returns the guidance-core library version.
/// Maps to: GuidanceBridge.version() -> String
#[unsafe(no_mangle)]
pub extern "system" fn Java_com_roadguide_core_GuidanceBridge_version(
    env: JNIEnv,
    _class: JClass,
) -> jstring {
    to_jstring(&env, crate::VERSION)
}

/// Routes `log` output to logcat. Safe to call more than once.
/// Maps to: GuidanceBridge.initLogging()
#[unsafe(no_mangle)]
pub extern "system" fn Java_com_roadguide_core_GuidanceBridge_initLogging(
    _env: JNIEnv,
    _class: JClass,
) {
    #[cfg(target_os = "android")]
    android_logger::init_once(
        android_logger::Config::default()
            .with_max_level(log::LevelFilter::Debug)
            .with_tag("guidance"),
    );
}

/// Maps to: GuidanceBridge.formatDistance(meters: Double) -> String
#[unsafe(no_mangle)]
pub extern "system" fn Java_com_roadguide_core_GuidanceBridge_formatDistance(
    env: JNIEnv,
    _class: JClass,
    meters: jdouble,
) -> jstring {
    to_jstring(&env, &format_distance(meters))
}

/// Builds a guidance route from GPX text and returns it as JSON, or null
/// when the document cannot be used.
/// Maps to: GuidanceBridge.routeFromGpx(gpx: String) -> String?
#[unsafe(no_mangle)]
pub extern "system" fn Java_com_roadguide_core_GuidanceBridge_routeFromGpx(
    mut env: JNIEnv,
    _class: JClass,
    gpx: JString,
) -> jstring {
    let gpx: String = match env.get_string(&gpx) {
        Ok(s) => s.into(),
        Err(e) => {
            warn!("routeFromGpx: unreadable argument: {e}");
            return std::ptr::null_mut();
        }
    };
    match route_json_from_gpx(gpx.as_bytes()) {
        Ok(json) => to_jstring(&env, &json),
        Err(e) => {
            warn!("routeFromGpx: {e}");
            std::ptr::null_mut()
        }
    }
}

/// GPX bytes to route JSON with default build options.
pub fn route_json_from_gpx(data: &[u8]) -> Result<String, RouteError> {
    let route = route_from_gpx(data, &BuildOptions::default())?;
    serde_json::to_string(&route).map_err(|e| RouteError::Json(e.to_string()))
}

fn to_jstring(env: &JNIEnv, value: &str) -> jstring {
    match env.new_string(value) {
        Ok(s) => s.into_raw(),
        Err(e) => {
            warn!("failed to create Java string: {e}");
            std::ptr::null_mut()
        }
    }
}
