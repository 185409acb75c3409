/*!
 * Native Boundary
 *
 * Symbol table, status codes and loading of the native client library.
 *
 * ## Calling Convention
 *
 * Every entry point takes an optional context handle, its inputs and output
 * pointers, and returns a `u32` status. Output strings are owned by the
 * native side and copied into `String`s immediately after a successful call.
 */

pub mod api;
pub mod library;
pub mod logger;
pub mod rc;
#[cfg(any(test, feature = "simulated"))]
pub mod simulated;

pub use api::NativeApi;
pub use library::{LibraryOrigin, NativeLibrary};
pub use logger::{init_native_logger, init_native_logger_from_config, native_logger_initialized};
pub use rc::{RcType, ReturnCode};

use std::ffi::{c_char, CStr};

/// Copy a native string into an owned `String`; `None` for null
///
/// # Safety
///
/// `ptr` must be null or point to a NUL-terminated string that stays valid
/// for the duration of this call.
pub(crate) unsafe fn read_string(ptr: *const c_char) -> Option<String> {
    if ptr.is_null() {
        return None;
    }
    Some(CStr::from_ptr(ptr).to_string_lossy().into_owned())
}
