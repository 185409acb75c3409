/*!
 * Asynchronous Job
 *
 * Bridges one in-flight native operation to wait / poll / take / cancel.
 *
 * ## Consumption
 *
 * The result can be taken once, through `take`, `take_for` or
 * `take_if_ready`. The taken flag is checked and set under the instance lock,
 * so the first successful consumption is authoritative and every later one
 * fails with `AlreadyTaken`. A timed-out `take_for` consumes nothing.
 */

use super::cancel::CancellationHandle;
use super::value::TakenValue;
use crate::context::{call_native, ErrorContext};
use crate::core::{duration_to_nanos, BridgeError, BridgeResult, RawHandle, ResourceKind};
use crate::ffi::{read_string, NativeLibrary};
use crate::resource::{ManagerInner, NativeObject, NativeResource, ResourceManager};
use std::ffi::{c_char, c_void};
use std::fmt;
use std::ptr;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, OnceLock};
use std::time::Duration;
use tracing::{debug, trace};

/// Converts the raw taken value into the job's result type
pub type Converter<T> = Box<dyn Fn(TakenValue) -> BridgeResult<T> + Send + Sync>;

/// Job whose result carries no value
pub type VoidJob = AsyncJob<()>;

#[derive(Debug, Clone, Copy)]
enum TakeMode {
    Blocking,
    Bounded(Duration),
    IfReady,
}

enum TakeOutcome {
    Taken(Option<RawHandle>),
    NotReady,
    AlreadyTaken,
}

pub struct AsyncJob<T> {
    resource: NativeResource,
    library: Arc<NativeLibrary>,
    converter: Converter<T>,
    taken: AtomicBool,
    name: OnceLock<String>,
}

impl<T> AsyncJob<T> {
    /// Wrap a job handle returned by a native `*_async` entry point
    ///
    /// `converter` turns the taken value into `T` on successful consumption.
    pub fn new<F>(
        library: &Arc<NativeLibrary>,
        manager: &ResourceManager,
        handle: RawHandle,
        converter: F,
    ) -> BridgeResult<Self>
    where
        F: Fn(TakenValue) -> BridgeResult<T> + Send + Sync + 'static,
    {
        let owner = Arc::clone(library);
        let resource = NativeResource::adopt(manager, handle, ResourceKind::Job, move |h| {
            // SAFETY: called once with a job handle produced by this library
            unsafe { (owner.api().job_dispose)(h.as_ptr()) };
            Ok(())
        })?;

        Ok(Self {
            resource,
            library: Arc::clone(library),
            converter: Box::new(converter),
            taken: AtomicBool::new(false),
            name: OnceLock::new(),
        })
    }

    /// Label of the underlying operation, cached after the first call
    pub fn name(&self, context: Option<&ErrorContext>) -> BridgeResult<String> {
        if let Some(name) = self.name.get() {
            return Ok(name.clone());
        }

        let out = self.resource.allocate_out::<*const c_char>(ptr::null())?;
        let api = self.library.api();
        let name = self.resource.with_handle(|job| -> BridgeResult<String> {
            call_native(context, "tsurugi_ffi_job_get_name", |ctx| unsafe {
                (api.job_get_name)(ctx, job.as_ptr(), out.as_mut_ptr())
            })?;
            // SAFETY: the name is owned by the job, which the lock keeps alive
            Ok(unsafe { read_string(out.read()) }.unwrap_or_default())
        })??;

        Ok(self.name.get_or_init(|| name).clone())
    }

    /// Block up to `timeout`; true when the operation completed
    pub fn wait(&self, context: Option<&ErrorContext>, timeout: Duration) -> BridgeResult<bool> {
        let api = self.library.api();
        self.query_bool(|job, out| {
            call_native(context, "tsurugi_ffi_job_wait", |c| unsafe {
                (api.job_wait)(c, job, duration_to_nanos(timeout), out)
            })
        })
    }

    /// Non-blocking completion check
    pub fn is_done(&self, context: Option<&ErrorContext>) -> BridgeResult<bool> {
        let api = self.library.api();
        self.query_bool(|job, out| {
            call_native(context, "tsurugi_ffi_job_is_done", |c| unsafe {
                (api.job_is_done)(c, job, out)
            })
        })
    }

    /// Block until completion and consume the result
    pub fn take(&self, context: Option<&ErrorContext>) -> BridgeResult<T> {
        self.take_with(context, TakeMode::Blocking)?
            .ok_or(BridgeError::NullHandle {
                operation: "tsurugi_ffi_job_take",
            })
    }

    /// Consume the result, waiting at most `timeout`
    ///
    /// On timeout the error satisfies `is_timeout()` and the result stays
    /// available for a later take.
    pub fn take_for(&self, context: Option<&ErrorContext>, timeout: Duration) -> BridgeResult<T> {
        self.take_with(context, TakeMode::Bounded(timeout))?
            .ok_or(BridgeError::NullHandle {
                operation: "tsurugi_ffi_job_take_for",
            })
    }

    /// Consume the result if it already arrived; `None` while pending
    pub fn take_if_ready(&self, context: Option<&ErrorContext>) -> BridgeResult<Option<T>> {
        self.take_with(context, TakeMode::IfReady)
    }

    /// Request cancellation and block until acknowledged
    pub fn cancel(&self, context: Option<&ErrorContext>) -> BridgeResult<bool> {
        let api = self.library.api();
        self.query_bool(|job, out| {
            call_native(context, "tsurugi_ffi_job_cancel", |c| unsafe {
                (api.job_cancel)(c, job, out)
            })
        })
    }

    /// Request cancellation and wait at most `timeout` for the acknowledgment
    pub fn cancel_for(&self, context: Option<&ErrorContext>, timeout: Duration) -> BridgeResult<bool> {
        let api = self.library.api();
        self.query_bool(|job, out| {
            call_native(context, "tsurugi_ffi_job_cancel_for", |c| unsafe {
                (api.job_cancel_for)(c, job, duration_to_nanos(timeout), out)
            })
        })
    }

    /// Request cancellation without blocking
    ///
    /// `None` when the operation already completed or a cancel is in flight.
    pub fn cancel_async(&self, context: Option<&ErrorContext>) -> BridgeResult<Option<CancellationHandle>> {
        let manager = self.manager()?;
        let out = manager.allocate_out::<*mut c_void>(ptr::null_mut())?;
        let api = self.library.api();
        self.resource.with_handle(|job| {
            call_native(context, "tsurugi_ffi_job_cancel_async", |c| unsafe {
                (api.job_cancel_async)(c, job.as_ptr(), out.as_mut_ptr())
            })
        })??;

        match RawHandle::new(out.read()) {
            Some(handle) => {
                CancellationHandle::adopt_in(&self.library, &manager, handle).map(Some)
            }
            None => Ok(None),
        }
    }

    /// Release the job's bookkeeping; never cancels or waits
    ///
    /// Repeated calls are no-ops. The native job is closed, then disposed even
    /// if closing reported an error.
    pub fn close(&self, context: Option<&ErrorContext>) -> BridgeResult<()> {
        let api = self.library.api();
        let closed = match self.resource.with_handle(|job| {
            call_native(context, "tsurugi_ffi_job_close", |c| unsafe {
                (api.job_close)(c, job.as_ptr())
            })
        }) {
            Ok(result) => result,
            Err(BridgeError::AlreadyClosed { .. }) => return Ok(()),
            Err(e) => return Err(e),
        };

        let disposed = self.resource.close();
        closed.and(disposed)
    }

    /// True once a take succeeded
    pub fn is_taken(&self) -> bool {
        self.taken.load(Ordering::Acquire)
    }

    fn manager(&self) -> BridgeResult<Arc<ManagerInner>> {
        self.resource.manager()
    }

    /// Run a native call that reports through one `bool` out-parameter
    fn query_bool<F>(&self, call: F) -> BridgeResult<bool>
    where
        F: FnOnce(*mut c_void, *mut bool) -> BridgeResult<()>,
    {
        let out = self.resource.allocate_out(false)?;
        self.resource
            .with_handle(|job| call(job.as_ptr(), out.as_mut_ptr()))??;
        Ok(out.read())
    }

    fn take_with(&self, context: Option<&ErrorContext>, mode: TakeMode) -> BridgeResult<Option<T>> {
        let manager = self.manager()?;
        let value_out = manager.allocate_out::<*mut c_void>(ptr::null_mut())?;
        let ready_out = manager.allocate_out(false)?;
        let api = self.library.api();

        let outcome = self.resource.with_handle(|job| -> BridgeResult<TakeOutcome> {
            if self.taken.load(Ordering::Acquire) {
                return Ok(TakeOutcome::AlreadyTaken);
            }

            let job = job.as_ptr();
            let value = value_out.as_mut_ptr();
            match mode {
                TakeMode::Blocking => call_native(context, "tsurugi_ffi_job_take", |c| unsafe {
                    (api.job_take)(c, job, value)
                })?,
                TakeMode::Bounded(timeout) => {
                    call_native(context, "tsurugi_ffi_job_take_for", |c| unsafe {
                        (api.job_take_for)(c, job, duration_to_nanos(timeout), value)
                    })?
                }
                TakeMode::IfReady => {
                    call_native(context, "tsurugi_ffi_job_take_if_ready", |c| unsafe {
                        (api.job_take_if_ready)(c, job, ready_out.as_mut_ptr(), value)
                    })?;
                    if !ready_out.read() {
                        return Ok(TakeOutcome::NotReady);
                    }
                }
            }

            self.taken.store(true, Ordering::Release);
            Ok(TakeOutcome::Taken(RawHandle::new(value_out.read())))
        })??;

        match outcome {
            TakeOutcome::AlreadyTaken => Err(BridgeError::AlreadyTaken {
                name: self.display_name(context),
            }),
            TakeOutcome::NotReady => {
                trace!(job = self.resource.id(), "Job result not ready");
                Ok(None)
            }
            TakeOutcome::Taken(handle) => {
                debug!(job = self.resource.id(), mode = ?mode, has_value = handle.is_some(), "Job result taken");
                let value = TakenValue::new(handle, manager, Arc::clone(&self.library), self.display_name(context));
                (self.converter)(value).map(Some)
            }
        }
    }

    fn display_name(&self, context: Option<&ErrorContext>) -> String {
        self.name(context).unwrap_or_else(|_| "?".to_string())
    }
}

impl VoidJob {
    /// Wrap a job that completes without a value
    pub fn void(
        library: &Arc<NativeLibrary>,
        manager: &ResourceManager,
        handle: RawHandle,
    ) -> BridgeResult<Self> {
        Self::new(library, manager, handle, |_| Ok(()))
    }
}

impl<T> NativeObject for AsyncJob<T> {
    fn resource(&self) -> &NativeResource {
        &self.resource
    }

    fn dispose(&self) -> BridgeResult<()> {
        self.close(None)
    }
}

impl<T> fmt::Debug for AsyncJob<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("AsyncJob")
            .field("resource", &self.resource)
            .field("name", &self.name.get())
            .field("taken", &self.is_taken())
            .finish()
    }
}
