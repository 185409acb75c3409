/*!
 * Cancellation Handle
 * Tracks an asynchronous cancellation request started by `AsyncJob::cancel_async`
 */

use crate::context::{call_native, ErrorContext};
use crate::core::{duration_to_nanos, BridgeResult, RawHandle, ResourceKind};
use crate::ffi::NativeLibrary;
use crate::resource::{ManagerInner, NativeObject, NativeResource, Releaser};
use std::fmt;
use std::sync::Arc;
use std::time::Duration;

pub struct CancellationHandle {
    resource: NativeResource,
    library: Arc<NativeLibrary>,
}

impl CancellationHandle {
    pub(crate) fn adopt_in(
        library: &Arc<NativeLibrary>,
        manager: &Arc<ManagerInner>,
        handle: RawHandle,
    ) -> BridgeResult<Self> {
        let owner = Arc::clone(library);
        let release: Releaser = Arc::new(move |h: RawHandle| {
            // SAFETY: called once with a handle produced by job_cancel_async
            unsafe { (owner.api().cancel_job_dispose)(h.as_ptr()) };
            Ok(())
        });
        let resource = NativeResource::adopt_in(manager, handle, ResourceKind::CancelJob, release)?;
        Ok(Self {
            resource,
            library: Arc::clone(library),
        })
    }

    /// Block up to `timeout`; true once the server acknowledged the cancel
    pub fn wait(&self, context: Option<&ErrorContext>, timeout: Duration) -> BridgeResult<bool> {
        let done = self.resource.allocate_out(false)?;
        let api = self.library.api();
        self.resource.with_handle(|cancel_job| {
            call_native(context, "tsurugi_ffi_cancel_job_wait", |ctx| unsafe {
                (api.cancel_job_wait)(ctx, cancel_job.as_ptr(), duration_to_nanos(timeout), done.as_mut_ptr())
            })
        })??;
        Ok(done.read())
    }

    /// Non-blocking acknowledgment check
    pub fn is_done(&self, context: Option<&ErrorContext>) -> BridgeResult<bool> {
        let done = self.resource.allocate_out(false)?;
        let api = self.library.api();
        self.resource.with_handle(|cancel_job| {
            call_native(context, "tsurugi_ffi_cancel_job_is_done", |ctx| unsafe {
                (api.cancel_job_is_done)(ctx, cancel_job.as_ptr(), done.as_mut_ptr())
            })
        })??;
        Ok(done.read())
    }

    pub fn close(&self) -> BridgeResult<()> {
        self.resource.close()
    }
}

impl NativeObject for CancellationHandle {
    fn resource(&self) -> &NativeResource {
        &self.resource
    }
}

impl fmt::Debug for CancellationHandle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("CancellationHandle")
            .field("resource", &self.resource)
            .finish()
    }
}
