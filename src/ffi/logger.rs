/*!
 * Native Logger Initialization
 * One-shot configuration of the native library's own diagnostic output
 */

use super::library::NativeLibrary;
use super::rc::ReturnCode;
use crate::core::{BridgeConfig, BridgeError, BridgeResult};
use parking_lot::Mutex;
use std::ffi::CString;
use std::path::Path;
use std::ptr;
use tracing::{debug, info};

/// Held across the native call; set only after it succeeds
static INITIALIZED: Mutex<bool> = parking_lot::const_mutex(false);

/// Configure native logging once per process
///
/// Returns `true` when this call performed the initialization and `false` when
/// an earlier call already did; later calls never reconfigure the logger.
pub fn init_native_logger(
    library: &NativeLibrary,
    filters: &str,
    file_path: Option<&Path>,
) -> BridgeResult<bool> {
    let mut initialized = INITIALIZED.lock();
    if *initialized {
        debug!("Native logger already initialized");
        return Ok(false);
    }

    // A failed call leaves the flag clear so a later call can retry
    call_logger_init(library, filters, file_path)?;
    *initialized = true;
    Ok(true)
}

/// Configure native logging from `log_filters`/`log_file`; no-op without filters
pub fn init_native_logger_from_config(
    library: &NativeLibrary,
    config: &BridgeConfig,
) -> BridgeResult<bool> {
    match config.log_filters.as_deref() {
        Some(filters) => init_native_logger(library, filters, config.log_file()),
        None => Ok(false),
    }
}

/// True once native logging has been configured in this process
pub fn native_logger_initialized() -> bool {
    *INITIALIZED.lock()
}

fn call_logger_init(
    library: &NativeLibrary,
    filters: &str,
    file_path: Option<&Path>,
) -> BridgeResult<()> {
    let filters = CString::new(filters)
        .map_err(|_| BridgeError::Argument("log filter contains a NUL byte".into()))?;
    let file_path = file_path
        .map(|p| {
            CString::new(p.to_string_lossy().into_owned())
                .map_err(|_| BridgeError::Argument("log file path contains a NUL byte".into()))
        })
        .transpose()?;

    let file_ptr = file_path.as_ref().map_or(ptr::null(), |p| p.as_ptr());

    // SAFETY: both strings are NUL-terminated and outlive the call
    let rc = ReturnCode::from(unsafe { (library.api().env_logger_init)(filters.as_ptr(), file_ptr) });
    if !rc.is_ok() {
        return Err(BridgeError::native(rc, None));
    }

    info!(
        filters = %filters.to_string_lossy(),
        file = ?file_path,
        "Native logger initialized"
    );
    Ok(())
}
