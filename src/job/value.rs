/*!
 * Taken Job Values
 */

use crate::core::{BridgeError, BridgeResult, RawHandle, ResourceKind};
use crate::ffi::NativeLibrary;
use crate::resource::{ManagerInner, NativeResource, Releaser};
use std::fmt;
use std::sync::Arc;
use tracing::warn;

/// Raw result of a job's single consumption, handed to the job's converter
///
/// A non-null value must be adopted with `into_resource`; dropping it
/// unadopted leaks the native object and logs a warning.
pub struct TakenValue {
    handle: Option<RawHandle>,
    manager: Arc<ManagerInner>,
    library: Arc<NativeLibrary>,
    job_name: String,
}

impl TakenValue {
    pub(crate) fn new(
        handle: Option<RawHandle>,
        manager: Arc<ManagerInner>,
        library: Arc<NativeLibrary>,
        job_name: String,
    ) -> Self {
        Self {
            handle,
            manager,
            library,
            job_name,
        }
    }

    /// True for void jobs, whose value pointer stays null
    pub fn is_void(&self) -> bool {
        self.handle.is_none()
    }

    pub fn raw(&self) -> Option<RawHandle> {
        self.handle
    }

    pub fn library(&self) -> &Arc<NativeLibrary> {
        &self.library
    }

    pub fn job_name(&self) -> &str {
        &self.job_name
    }

    /// Register the value with the job's manager under `release`
    pub fn into_resource<F>(mut self, kind: ResourceKind, release: F) -> BridgeResult<NativeResource>
    where
        F: Fn(RawHandle) -> BridgeResult<()> + Send + Sync + 'static,
    {
        let handle = self.handle.take().ok_or(BridgeError::NullHandle {
            operation: "tsurugi_ffi_job_take",
        })?;
        let release: Releaser = Arc::new(release);
        NativeResource::adopt_in(&self.manager, handle, kind, release)
    }
}

impl fmt::Debug for TakenValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("TakenValue")
            .field("handle", &self.handle)
            .field("job", &self.job_name)
            .finish()
    }
}

impl Drop for TakenValue {
    fn drop(&mut self) {
        if let Some(handle) = self.handle {
            warn!(
                job = %self.job_name,
                handle = ?handle,
                "Job value dropped without being adopted"
            );
        }
    }
}
