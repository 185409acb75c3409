/*!
 * Simulated Context
 * Per-caller diagnostic slot overwritten by every call that receives it
 */

use super::{write_out, DisposeProbe};
use crate::ffi::api::RawRc;
use crate::ffi::rc::ReturnCode;
use parking_lot::Mutex;
use std::ffi::{c_char, c_void, CString};
use std::ptr;

/// Server-reported diagnostic detail
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ServerDetail {
    pub category_number: i32,
    pub category_str: String,
    pub code_number: i32,
    pub structured_code: String,
}

#[derive(Debug, Clone)]
struct Failure {
    rc: ReturnCode,
    message: String,
    server: Option<ServerDetail>,
}

pub(crate) struct SimContext {
    last: Mutex<Option<Failure>>,
    // Backing storage for the most recently returned string
    returned: Mutex<Option<CString>>,
    probe: Option<DisposeProbe>,
}

impl SimContext {
    fn new(probe: Option<DisposeProbe>) -> Self {
        Self {
            last: Mutex::new(None),
            returned: Mutex::new(None),
            probe,
        }
    }

    fn hold(&self, value: &str) -> *const c_char {
        let cstring = CString::new(value.replace('\0', " ")).unwrap_or_default();
        let mut slot = self.returned.lock();
        let ptr = cstring.as_ptr();
        *slot = Some(cstring);
        ptr
    }
}

/// Clear the context's slot; returns `OK`
pub(crate) fn succeed(ctx: *mut c_void) -> RawRc {
    if let Some(context) = as_context(ctx) {
        *context.last.lock() = None;
    }
    ReturnCode::OK.raw()
}

/// Record a failure in the context (when given); returns the status
pub(crate) fn fail(
    ctx: *mut c_void,
    rc: ReturnCode,
    message: impl Into<String>,
    server: Option<ServerDetail>,
) -> RawRc {
    if let Some(context) = as_context(ctx) {
        *context.last.lock() = Some(Failure {
            rc,
            message: message.into(),
            server,
        });
    }
    rc.raw()
}

fn as_context<'a>(ctx: *mut c_void) -> Option<&'a SimContext> {
    // SAFETY: non-null context pointers are only ever produced by
    // `tsurugi_ffi_context_create` and stay valid until disposed
    unsafe { (ctx as *const SimContext).as_ref() }
}

/// Create a context whose disposal is counted by `probe`
pub fn create_probed_context(probe: &DisposeProbe) -> *mut c_void {
    Box::into_raw(Box::new(SimContext::new(Some(probe.clone())))) as *mut c_void
}

pub(crate) unsafe extern "C" fn context_create(out: *mut *mut c_void) -> RawRc {
    if out.is_null() {
        return ReturnCode::FFI_ARG0_ERROR.raw();
    }
    let context = Box::into_raw(Box::new(SimContext::new(None)));
    write_out(out, context as *mut c_void);
    ReturnCode::OK.raw()
}

pub(crate) unsafe extern "C" fn context_dispose(ctx: *mut c_void) {
    if ctx.is_null() {
        return;
    }
    let context = Box::from_raw(ctx as *mut SimContext);
    if let Some(probe) = &context.probe {
        probe.record();
    }
}

fn with_failure<T>(
    ctx: *mut c_void,
    out: *mut T,
    read: impl FnOnce(&SimContext, Option<&Failure>) -> Option<T>,
) -> RawRc {
    let Some(context) = as_context(ctx) else {
        return ReturnCode::FFI_ARG0_ERROR.raw();
    };
    if out.is_null() {
        return ReturnCode::FFI_ARG1_ERROR.raw();
    }
    let last = context.last.lock().clone();
    match read(context, last.as_ref()) {
        Some(value) => {
            // SAFETY: checked non-null above; caller provides writable storage
            unsafe { write_out(out, value) };
            ReturnCode::OK.raw()
        }
        None => ReturnCode::FFI_DIAGNOSTIC_CODE_NOT_FOUND.raw(),
    }
}

pub(crate) unsafe extern "C" fn context_get_return_code(ctx: *mut c_void, out: *mut u32) -> RawRc {
    with_failure(ctx, out, |_, last| {
        Some(last.map_or(ReturnCode::OK.raw(), |f| f.rc.raw()))
    })
}

pub(crate) unsafe extern "C" fn context_get_error_type(ctx: *mut c_void, out: *mut u32) -> RawRc {
    with_failure(ctx, out, |_, last| {
        Some(last.map_or(0, |f| f.rc.raw() >> 30))
    })
}

pub(crate) unsafe extern "C" fn context_get_error_name(
    ctx: *mut c_void,
    out: *mut *const c_char,
) -> RawRc {
    with_failure(ctx, out, |context, last| {
        Some(match last {
            Some(f) => context.hold(&f.rc.name()),
            None => ptr::null(),
        })
    })
}

pub(crate) unsafe extern "C" fn context_get_error_message(
    ctx: *mut c_void,
    out: *mut *const c_char,
) -> RawRc {
    with_failure(ctx, out, |context, last| {
        Some(match last {
            Some(f) => context.hold(&f.message),
            None => ptr::null(),
        })
    })
}

pub(crate) unsafe extern "C" fn context_get_server_error_category_number(
    ctx: *mut c_void,
    out: *mut i32,
) -> RawRc {
    with_failure(ctx, out, |_, last| {
        last.and_then(|f| f.server.as_ref()).map(|s| s.category_number)
    })
}

pub(crate) unsafe extern "C" fn context_get_server_error_category_str(
    ctx: *mut c_void,
    out: *mut *const c_char,
) -> RawRc {
    with_failure(ctx, out, |context, last| {
        last.and_then(|f| f.server.as_ref())
            .map(|s| context.hold(&s.category_str))
    })
}

pub(crate) unsafe extern "C" fn context_get_server_error_code_number(
    ctx: *mut c_void,
    out: *mut i32,
) -> RawRc {
    with_failure(ctx, out, |_, last| {
        last.and_then(|f| f.server.as_ref()).map(|s| s.code_number)
    })
}

pub(crate) unsafe extern "C" fn context_get_server_error_structured_code(
    ctx: *mut c_void,
    out: *mut *const c_char,
) -> RawRc {
    with_failure(ctx, out, |context, last| {
        last.and_then(|f| f.server.as_ref())
            .map(|s| context.hold(&s.structured_code))
    })
}
