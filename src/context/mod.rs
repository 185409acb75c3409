/*!
 * Error Context
 *
 * Caller-owned holder of the latest native diagnostic. Passing a context to
 * an operation lets a failure carry the server's message and codes; without
 * one, errors carry only the status code.
 *
 * ## Lock Order
 *
 * Target resource first, then the context. The diagnostic is read while the
 * context lock is still held, so concurrent users of the same context cannot
 * overwrite it in between.
 */

mod diagnostic;

pub use diagnostic::NativeDiagnostic;

use crate::core::{BridgeError, BridgeResult, RawHandle, ResourceKind};
use crate::ffi::api::{GetStrFn, RawRc};
use crate::ffi::rc::{RcType, ReturnCode};
use crate::ffi::{read_string, NativeLibrary};
use crate::monitoring::NativeCallSpan;
use crate::resource::{NativeObject, NativeResource, ResourceManager};
use diagnostic::read_diagnostic;
use std::ffi::{c_char, c_void};
use std::fmt;
use std::ptr;
use std::sync::Arc;
use tracing::trace;

pub struct ErrorContext {
    resource: NativeResource,
    library: Arc<NativeLibrary>,
}

impl ErrorContext {
    /// Create a native context registered with `manager`
    pub fn create(library: &Arc<NativeLibrary>, manager: &ResourceManager) -> BridgeResult<Self> {
        let out = manager.allocate_out::<*mut c_void>(ptr::null_mut())?;

        // SAFETY: out is a valid, initialized pointer slot
        let rc = ReturnCode::from(unsafe { (library.api().context_create)(out.as_mut_ptr()) });
        if !rc.is_ok() {
            return Err(BridgeError::native(rc, None));
        }

        let handle = RawHandle::new(out.read()).ok_or(BridgeError::NullHandle {
            operation: "tsurugi_ffi_context_create",
        })?;
        Self::adopt(library, manager, handle)
    }

    /// Wrap a context handle obtained elsewhere
    pub fn adopt(
        library: &Arc<NativeLibrary>,
        manager: &ResourceManager,
        handle: RawHandle,
    ) -> BridgeResult<Self> {
        let owner = Arc::clone(library);
        let resource = NativeResource::adopt(manager, handle, ResourceKind::Context, move |h| {
            // SAFETY: called once with the handle created by this library
            unsafe { (owner.api().context_dispose)(h.as_ptr()) };
            Ok(())
        })?;

        Ok(Self {
            resource,
            library: Arc::clone(library),
        })
    }

    /// Status code of the latest call
    pub fn return_code(&self) -> BridgeResult<ReturnCode> {
        self.get_value(self.library.api().context_get_return_code, 0u32)
            .map(|rc| ReturnCode::from(rc.unwrap_or(0)))
    }

    pub fn error_type(&self) -> BridgeResult<RcType> {
        self.get_value(self.library.api().context_get_error_type, 0u32)
            .map(|raw| RcType::from_raw(raw.unwrap_or(0)))
    }

    pub fn error_name(&self) -> BridgeResult<Option<String>> {
        self.get_string(self.library.api().context_get_error_name)
    }

    pub fn error_message(&self) -> BridgeResult<Option<String>> {
        self.get_string(self.library.api().context_get_error_message)
    }

    /// Server error category number; `None` unless the latest failure came from the server
    pub fn server_error_category_number(&self) -> BridgeResult<Option<i32>> {
        self.get_value(self.library.api().context_get_server_error_category_number, 0i32)
    }

    pub fn server_error_category_str(&self) -> BridgeResult<Option<String>> {
        self.get_string(self.library.api().context_get_server_error_category_str)
    }

    pub fn server_error_code_number(&self) -> BridgeResult<Option<i32>> {
        self.get_value(self.library.api().context_get_server_error_code_number, 0i32)
    }

    pub fn server_error_structured_code(&self) -> BridgeResult<Option<String>> {
        self.get_string(self.library.api().context_get_server_error_structured_code)
    }

    /// All fields at once, consistent with each other
    pub fn diagnostic(&self) -> BridgeResult<NativeDiagnostic> {
        let api = self.library.api();
        self.resource.with_handle(|ctx| {
            let mut raw = 0u32;
            // SAFETY: ctx is live under the lock; raw is a valid local
            let rc = ReturnCode::from(unsafe { (api.context_get_return_code)(ctx.as_ptr(), &mut raw) });
            if !rc.is_ok() {
                return Err(BridgeError::native(rc, None));
            }
            Ok(read_diagnostic(api, ctx, ReturnCode::from(raw)))
        })?
    }

    pub fn close(&self) -> BridgeResult<()> {
        self.resource.close()
    }

    fn get_value<T: Copy>(
        &self,
        getter: unsafe extern "C" fn(*mut c_void, *mut T) -> RawRc,
        init: T,
    ) -> BridgeResult<Option<T>> {
        let out = self.resource.allocate_out(init)?;
        // SAFETY: ctx is live under the lock; out is valid for a write of T
        let rc = self
            .resource
            .with_handle(|ctx| ReturnCode::from(unsafe { getter(ctx.as_ptr(), out.as_mut_ptr()) }))?;
        match rc {
            ReturnCode::OK => Ok(Some(out.read())),
            ReturnCode::FFI_DIAGNOSTIC_CODE_NOT_FOUND => Ok(None),
            rc => Err(BridgeError::native(rc, None)),
        }
    }

    fn get_string(&self, getter: GetStrFn) -> BridgeResult<Option<String>> {
        let out = self.resource.allocate_out::<*const c_char>(ptr::null())?;
        self.resource.with_handle(|ctx| {
            // SAFETY: ctx is live under the lock; the returned string stays
            // valid until the next call on this context, which the lock excludes
            unsafe {
                match ReturnCode::from(getter(ctx.as_ptr(), out.as_mut_ptr())) {
                    ReturnCode::OK => Ok(read_string(out.read())),
                    ReturnCode::FFI_DIAGNOSTIC_CODE_NOT_FOUND => Ok(None),
                    rc => Err(BridgeError::native(rc, None)),
                }
            }
        })?
    }
}

impl NativeObject for ErrorContext {
    fn resource(&self) -> &NativeResource {
        &self.resource
    }
}

impl fmt::Debug for ErrorContext {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ErrorContext")
            .field("resource", &self.resource)
            .finish()
    }
}

/// Invoke a native entry point, classifying its status
///
/// `call` receives the context pointer (null without a context). On failure
/// the context's diagnostic is captured before its lock is released.
pub(crate) fn call_native<F>(context: Option<&ErrorContext>, operation: &'static str, call: F) -> BridgeResult<()>
where
    F: FnOnce(*mut c_void) -> RawRc,
{
    trace!(operation, with_context = context.is_some(), "Native call");
    let span = NativeCallSpan::new(operation);
    let _entered = span.enter();

    let Some(context) = context else {
        let rc = ReturnCode::from(call(ptr::null_mut()));
        span.record_rc(rc);
        return if rc.is_ok() {
            Ok(())
        } else {
            Err(BridgeError::native(rc, None))
        };
    };

    let api = context.library.api();
    context.resource.with_handle(|ctx| {
        let rc = ReturnCode::from(call(ctx.as_ptr()));
        span.record_rc(rc);
        if rc.is_ok() {
            Ok(())
        } else {
            Err(BridgeError::native(rc, Some(read_diagnostic(api, ctx, rc))))
        }
    })?
}
