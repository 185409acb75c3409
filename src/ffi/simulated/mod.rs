/*!
 * Simulated Native Library
 *
 * In-process implementation of every consumed `tsurugi_ffi_*` entry point,
 * used to exercise the bridge without a database. Objects are boxed Rust
 * values behind opaque pointers; disposal can be observed through probes.
 */

mod context;
mod job;

pub use context::{create_probed_context, ServerDetail};
pub use job::{value_dispose, value_payload, JobSpec, Outcome};

use super::api::{NativeApi, RawRc};
use super::library::NativeLibrary;
use super::rc::ReturnCode;
use parking_lot::Mutex;
use std::ffi::{c_char, CStr};
use std::fs::OpenOptions;
use std::io::Write;
use std::path::PathBuf;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, OnceLock};

/// Counts how many times a simulated object was disposed
#[derive(Debug, Clone, Default)]
pub struct DisposeProbe(Arc<AtomicUsize>);

impl DisposeProbe {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn count(&self) -> usize {
        self.0.load(Ordering::SeqCst)
    }

    pub(crate) fn record(&self) {
        self.0.fetch_add(1, Ordering::SeqCst);
    }
}

/// Write through an out-parameter, ignoring null
///
/// # Safety
///
/// `out` must be null or valid for a write of `T`.
pub(crate) unsafe fn write_out<T>(out: *mut T, value: T) {
    if !out.is_null() {
        out.write(value);
    }
}

/// Symbol table backed by the simulation
pub fn api() -> NativeApi {
    NativeApi {
        context_create: context::context_create,
        context_get_return_code: context::context_get_return_code,
        context_get_error_name: context::context_get_error_name,
        context_get_error_type: context::context_get_error_type,
        context_get_error_message: context::context_get_error_message,
        context_get_server_error_category_number: context::context_get_server_error_category_number,
        context_get_server_error_category_str: context::context_get_server_error_category_str,
        context_get_server_error_code_number: context::context_get_server_error_code_number,
        context_get_server_error_structured_code: context::context_get_server_error_structured_code,
        context_dispose: context::context_dispose,
        cancel_job_wait: job::cancel_job_wait,
        cancel_job_is_done: job::cancel_job_is_done,
        cancel_job_dispose: job::cancel_job_dispose,
        job_get_name: job::job_get_name,
        job_wait: job::job_wait,
        job_is_done: job::job_is_done,
        job_take: job::job_take,
        job_take_for: job::job_take_for,
        job_take_if_ready: job::job_take_if_ready,
        job_cancel: job::job_cancel,
        job_cancel_for: job::job_cancel_for,
        job_cancel_async: job::job_cancel_async,
        job_close: job::job_close,
        job_dispose: job::job_dispose,
        env_logger_init,
    }
}

/// Simulated library wrapped for use with the bridge
pub fn library() -> Arc<NativeLibrary> {
    NativeLibrary::from_api(api(), "simulated")
}

/// Settings captured by the first successful logger initialization
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LoggerSettings {
    pub filters: String,
    pub file_path: Option<PathBuf>,
}

static LOGGER: OnceLock<LoggerSettings> = OnceLock::new();
static LOGGER_FILE: Mutex<Option<std::fs::File>> = parking_lot::const_mutex(None);

/// Logger settings applied in this process, if any
pub fn logger_settings() -> Option<LoggerSettings> {
    LOGGER.get().cloned()
}

unsafe fn read_str(ptr: *const c_char) -> Option<String> {
    if ptr.is_null() {
        None
    } else {
        Some(CStr::from_ptr(ptr).to_string_lossy().into_owned())
    }
}

unsafe extern "C" fn env_logger_init(filters: *const c_char, file_path: *const c_char) -> RawRc {
    let Some(filters) = read_str(filters) else {
        return ReturnCode::FFI_ARG0_ERROR.raw();
    };
    let file_path = read_str(file_path).map(PathBuf::from);

    if LOGGER.get().is_some() {
        return ReturnCode::OK.raw();
    }

    if let Some(path) = &file_path {
        let file = OpenOptions::new().create(true).append(true).open(path);
        match file {
            Ok(mut file) => {
                if writeln!(file, "logger initialized filters={filters}").is_err() {
                    return ReturnCode::CORE_CLIENT_IO_ERROR.raw();
                }
                *LOGGER_FILE.lock() = Some(file);
            }
            Err(_) => return ReturnCode::CORE_CLIENT_IO_ERROR.raw(),
        }
    }

    let _ = LOGGER.set(LoggerSettings { filters, file_path });
    ReturnCode::OK.raw()
}
