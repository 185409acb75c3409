/*!
 * Native Resource
 *
 * Exclusive owner of one native handle with exactly-once release.
 *
 * ## State Machine
 *
 * `Open(handle) -> Closed`, guarded by a per-instance lock. Closing swaps the
 * state under the lock and runs the release action outside it, so a slow
 * native dispose never blocks readers of the state. `Drop` performs the same
 * close as the reclamation safety net.
 */

use super::manager::{ManagerInner, ResourceManager};
use super::region::Scratch;
use crate::core::{BridgeError, BridgeResult, RawHandle, ResourceId, ResourceKind};
use parking_lot::Mutex;
use std::fmt;
use std::mem;
use std::sync::{Arc, Weak};
use std::time::Instant;
use tracing::{debug, trace, warn};

/// Release action run exactly once with the handle
pub type Releaser = Arc<dyn Fn(RawHandle) -> BridgeResult<()> + Send + Sync>;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum HandleState {
    Open(RawHandle),
    Closed,
}

/// Shared lifecycle state; the manager's registry holds a second reference
pub(crate) struct ResourceCore {
    id: ResourceId,
    kind: ResourceKind,
    state: Mutex<HandleState>,
    release: Releaser,
    manager: Weak<ManagerInner>,
    created: Instant,
}

impl ResourceCore {
    #[inline]
    pub(crate) fn id(&self) -> ResourceId {
        self.id
    }

    #[inline]
    pub(crate) fn kind(&self) -> ResourceKind {
        self.kind
    }

    pub(crate) fn is_closed(&self) -> bool {
        *self.state.lock() == HandleState::Closed
    }

    /// Close once; `Ok(true)` when this call performed the release
    ///
    /// A failed release still leaves the resource closed and deregistered.
    pub(crate) fn close(&self) -> BridgeResult<bool> {
        let handle = match mem::replace(&mut *self.state.lock(), HandleState::Closed) {
            HandleState::Open(handle) => handle,
            HandleState::Closed => return Ok(false),
        };

        let result = (self.release)(handle);

        if let Some(manager) = self.manager.upgrade() {
            manager.deregister(self.id);
        }

        debug!(
            id = self.id,
            kind = %self.kind,
            lifetime_micros = self.created.elapsed().as_micros() as u64,
            ok = result.is_ok(),
            "Native resource released"
        );

        result.map(|()| true)
    }
}

impl fmt::Debug for ResourceCore {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ResourceCore")
            .field("id", &self.id)
            .field("kind", &self.kind)
            .field("state", &*self.state.lock())
            .finish()
    }
}

/// Exclusive wrapper around one native handle
///
/// # Example
///
/// ```rust,ignore
/// let resource = NativeResource::adopt(&manager, handle, ResourceKind::Custom("Endpoint"), |h| {
///     unsafe { endpoint_dispose(h.as_ptr()) };
///     Ok(())
/// })?;
/// resource.with_handle(|h| unsafe { endpoint_use(h.as_ptr()) })?;
/// // Released by close(), by drop, or by the manager's close, whichever comes first
/// ```
pub struct NativeResource {
    core: Arc<ResourceCore>,
}

impl NativeResource {
    /// Take ownership of `handle` and register it with `manager`
    ///
    /// If the manager is already closed the handle is released immediately
    /// and `ManagerClosed` is returned.
    pub fn adopt<F>(
        manager: &ResourceManager,
        handle: RawHandle,
        kind: ResourceKind,
        release: F,
    ) -> BridgeResult<Self>
    where
        F: Fn(RawHandle) -> BridgeResult<()> + Send + Sync + 'static,
    {
        Self::adopt_in(manager.inner(), handle, kind, Arc::new(release))
    }

    pub(crate) fn adopt_in(
        manager: &Arc<ManagerInner>,
        handle: RawHandle,
        kind: ResourceKind,
        release: Releaser,
    ) -> BridgeResult<Self> {
        let core = Arc::new(ResourceCore {
            id: manager.next_id(),
            kind,
            state: Mutex::new(HandleState::Open(handle)),
            release,
            manager: Arc::downgrade(manager),
            created: Instant::now(),
        });

        if let Err(err) = manager.register(&core) {
            *core.state.lock() = HandleState::Closed;
            if let Err(release_err) = (core.release)(handle) {
                warn!(kind = %kind, error = %release_err, "Release of unregistered handle failed");
            }
            return Err(err);
        }

        trace!(id = core.id, kind = %kind, handle = ?handle, "Native resource adopted");
        Ok(Self { core })
    }

    #[inline]
    pub fn id(&self) -> ResourceId {
        self.core.id
    }

    #[inline]
    pub fn kind(&self) -> ResourceKind {
        self.core.kind
    }

    pub fn is_closed(&self) -> bool {
        self.core.is_closed()
    }

    /// Run `f` with the live handle while holding the instance lock
    ///
    /// The lock spans the whole closure, so a concurrent `close` waits for the
    /// native call to return. `f` must not touch this same resource again.
    pub fn with_handle<R>(&self, f: impl FnOnce(RawHandle) -> R) -> BridgeResult<R> {
        let state = self.core.state.lock();
        match *state {
            HandleState::Open(handle) => Ok(f(handle)),
            HandleState::Closed => Err(BridgeError::AlreadyClosed {
                kind: self.core.kind,
            }),
        }
    }

    /// Snapshot of the live handle, for diagnostics
    pub fn handle(&self) -> BridgeResult<RawHandle> {
        self.with_handle(|handle| handle)
    }

    /// Release the handle; repeated calls are no-ops
    pub fn close(&self) -> BridgeResult<()> {
        self.core.close().map(|_| ())
    }

    /// Scratch out-parameter from the owning manager's region
    pub fn allocate_out<T: Copy>(&self, init: T) -> BridgeResult<Scratch<T>> {
        self.manager()?.allocate_out(init)
    }

    pub(crate) fn manager(&self) -> BridgeResult<Arc<ManagerInner>> {
        self.core
            .manager
            .upgrade()
            .ok_or(BridgeError::ManagerClosed)
    }

    pub(crate) fn core(&self) -> &Arc<ResourceCore> {
        &self.core
    }
}

impl fmt::Debug for NativeResource {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        self.core.fmt(f)
    }
}

impl Drop for NativeResource {
    fn drop(&mut self) {
        match self.core.close() {
            Ok(true) => debug!(id = self.core.id, kind = %self.core.kind, "Released on drop"),
            Ok(false) => {}
            Err(e) => warn!(
                id = self.core.id,
                kind = %self.core.kind,
                error = %e,
                "Release on drop failed"
            ),
        }
    }
}
