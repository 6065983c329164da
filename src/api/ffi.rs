//! C-compatible API consumed by the HTTP layer.
//!
//! Callers open a service handle, exchange JSON strings with it and release
//! every returned string with [`aerodamage_free_str`]. Failures come back as
//! `{"error": "...", "code": n}` objects or as [`AeroCode`] values.

use std::ffi::{CStr, CString};
use std::os::raw::c_char;
use std::path::PathBuf;
use std::sync::Arc;

use serde::Serialize;
use serde_json::json;
use tracing::warn;

use crate::common::config::AppCfg;
use crate::common::error::{AeroCode, AeroError, AeroResult};
use crate::common::log;
use crate::features::domain::InputRecord;
use crate::inference::service::PredictionService;
use crate::models::repo_fs::FsModelRepo;

/// ABI version to coordinate with the HTTP layer.
#[no_mangle]
pub extern "C" fn aerodamage_api_version() -> u32 {
    1
}

/// Open a service over `models_dir`, or the configured directory when null.
/// Settings come from the JSON file named by `AERODAMAGE_CONFIG`, if any, and
/// the environment. Returns null only if `models_dir` is not valid UTF-8.
#[no_mangle]
pub extern "C" fn aerodamage_open(models_dir: *const c_char) -> *mut PredictionService {
    let (mut cfg, cfg_err) = match AppCfg::discover() {
        Ok(cfg) => (cfg, None),
        Err(err) => (AppCfg::load(), Some(err)),
    };
    if !models_dir.is_null() {
        match unsafe { CStr::from_ptr(models_dir) }.to_str() {
            Ok(dir) => cfg.models_dir = PathBuf::from(dir),
            Err(_) => return std::ptr::null_mut(),
        }
    }
    // the host may already have installed a subscriber
    let _ = log::init(&cfg);
    if let Some(err) = cfg_err {
        warn!(error = %err, "config file unusable, using environment settings");
    }

    let service = PredictionService::new(Arc::new(FsModelRepo::new(&cfg)));
    Box::into_raw(Box::new(service))
}

/// Release a handle returned by [`aerodamage_open`].
#[no_mangle]
pub extern "C" fn aerodamage_close(handle: *mut PredictionService) {
    if handle.is_null() {
        return;
    }
    unsafe {
        drop(Box::from_raw(handle));
    }
}

/// `{"models": [...]}`.
#[no_mangle]
pub extern "C" fn aerodamage_list_models(handle: *const PredictionService) -> *const c_char {
    with_service(handle, |svc| Ok(json!({ "models": svc.list_models() })))
}

/// `{"features": [...]}` with the curated subset shown to end users.
#[no_mangle]
pub extern "C" fn aerodamage_features(handle: *const PredictionService) -> *const c_char {
    with_service(handle, |svc| Ok(json!({ "features": svc.feature_names() })))
}

/// `{"active_model": id}`, or `null` when nothing is loaded.
#[no_mangle]
pub extern "C" fn aerodamage_active_model(handle: *const PredictionService) -> *const c_char {
    with_service(handle, |svc| Ok(json!({ "active_model": svc.active_model() })))
}

/// `{"schema": [...]}`: every column the active model consumes, in order.
#[no_mangle]
pub extern "C" fn aerodamage_schema(handle: *const PredictionService) -> *const c_char {
    with_service(handle, |svc| {
        let schema = svc.schema().ok_or(AeroError::NoModelLoaded)?;
        Ok(json!({ "schema": schema }))
    })
}

/// Switch the active model. Returns an [`AeroCode`] value.
#[no_mangle]
pub extern "C" fn aerodamage_activate(
    handle: *const PredictionService,
    model_id: *const c_char,
) -> u32 {
    let Some(svc) = (unsafe { handle.as_ref() }) else {
        return AeroCode::InvalidInput as u32;
    };
    let outcome = read_str(model_id).and_then(|id| svc.activate(&id));
    match outcome {
        Ok(()) => AeroCode::Ok as u32,
        Err(err) => {
            warn!(error = %err, "activation rejected");
            err.code() as u32
        }
    }
}

/// Predict one JSON object record.
#[no_mangle]
pub extern "C" fn aerodamage_predict(
    handle: *const PredictionService,
    record_json: *const c_char,
) -> *const c_char {
    with_service(handle, |svc| {
        let record: InputRecord = parse(&read_str(record_json)?)?;
        to_value(&svc.predict(&record)?)
    })
}

/// Predict a JSON array of records: `{"predictions": [...], "total_rows": n}`.
#[no_mangle]
pub extern "C" fn aerodamage_predict_batch(
    handle: *const PredictionService,
    records_json: *const c_char,
) -> *const c_char {
    with_service(handle, |svc| {
        let records: Vec<InputRecord> = parse(&read_str(records_json)?)?;
        let rows = svc.predict_batch(&records);
        Ok(json!({ "total_rows": rows.len(), "predictions": rows }))
    })
}

/// Free strings allocated by Rust.
#[no_mangle]
pub extern "C" fn aerodamage_free_str(ptr: *const c_char) {
    if ptr.is_null() {
        return;
    }
    unsafe {
        let _ = CString::from_raw(ptr as *mut c_char);
    }
}

fn with_service<F>(handle: *const PredictionService, op: F) -> *const c_char
where
    F: FnOnce(&PredictionService) -> AeroResult<serde_json::Value>,
{
    let outcome = match unsafe { handle.as_ref() } {
        Some(svc) => op(svc),
        None => Err(AeroError::InvalidInput("null service handle".into())),
    };
    let body = match outcome {
        Ok(value) => value,
        Err(err) => json!({ "error": err.to_string(), "code": err.code() as u32 }),
    };
    string_to_raw(body.to_string())
}

fn read_str(ptr: *const c_char) -> AeroResult<String> {
    if ptr.is_null() {
        return Err(AeroError::InvalidInput("null string".into()));
    }
    unsafe { CStr::from_ptr(ptr) }
        .to_str()
        .map(str::to_owned)
        .map_err(|e| AeroError::InvalidInput(e.to_string()))
}

fn parse<T: serde::de::DeserializeOwned>(raw: &str) -> AeroResult<T> {
    serde_json::from_str(raw).map_err(|e| AeroError::InvalidInput(e.to_string()))
}

fn to_value<T: Serialize>(value: &T) -> AeroResult<serde_json::Value> {
    serde_json::to_value(value).map_err(|e| AeroError::InvalidInput(e.to_string()))
}

fn string_to_raw(s: String) -> *const c_char {
    match CString::new(s) {
        Ok(cstring) => cstring.into_raw(),
        Err(_) => fallback_json_raw(),
    }
}

fn fallback_json_raw() -> *const c_char {
    CString::new(r#"{"error":"response contained a NUL byte"}"#)
        .map(CString::into_raw)
        .unwrap_or(std::ptr::null_mut())
}
