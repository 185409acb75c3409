/*!
 * Resource Manager
 *
 * Scope that owns an allocation region and a registry of every live native
 * resource created through it. Closing the scope releases stragglers in
 * reverse construction order, then hands back the region unconditionally.
 */

use super::native::{NativeResource, ResourceCore};
use super::region::{handle_pointers, Region, Scratch};
use super::stats::TeardownStats;
use crate::core::limits::{DEFAULT_REGION_CAPACITY, REGISTRY_INITIAL_CAPACITY, REGISTRY_SHARDS};
use crate::core::{BridgeConfig, BridgeError, BridgeResult, ManagerId, RawHandle, ResourceId};
use crate::monitoring::warn_slow_teardown;
use ahash::RandomState;
use dashmap::DashMap;
use parking_lot::{Mutex, RwLock};
use std::ffi::{c_char, c_void};
use std::fmt;
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::Arc;
use tracing::{debug, info, warn};

pub(crate) struct ManagerInner {
    id: ManagerId,
    closed: AtomicBool,
    // Registrations hold it shared; close holds it exclusively while draining
    gate: RwLock<()>,
    registry: DashMap<ResourceId, Arc<ResourceCore>, RandomState>,
    region: Mutex<Option<Region>>,
    next_id: AtomicU64,
}

impl ManagerInner {
    fn new(region_capacity: usize) -> Self {
        Self {
            id: ManagerId::generate(),
            closed: AtomicBool::new(false),
            gate: RwLock::new(()),
            registry: DashMap::with_capacity_and_hasher_and_shard_amount(
                REGISTRY_INITIAL_CAPACITY,
                RandomState::new(),
                REGISTRY_SHARDS,
            ),
            region: Mutex::new(Some(Region::with_capacity(region_capacity))),
            next_id: AtomicU64::new(1),
        }
    }

    #[inline]
    pub(crate) fn next_id(&self) -> ResourceId {
        self.next_id.fetch_add(1, Ordering::Relaxed)
    }

    pub(crate) fn is_closed(&self) -> bool {
        self.closed.load(Ordering::Acquire)
    }

    /// Idempotent; fails once the manager is closed
    pub(crate) fn register(&self, core: &Arc<ResourceCore>) -> BridgeResult<()> {
        let _gate = self.gate.read();
        if self.is_closed() {
            return Err(BridgeError::ManagerClosed);
        }
        self.registry
            .entry(core.id())
            .or_insert_with(|| Arc::clone(core));
        Ok(())
    }

    /// Idempotent; true when the id was registered
    pub(crate) fn deregister(&self, id: ResourceId) -> bool {
        self.registry.remove(&id).is_some()
    }

    fn with_region<R>(&self, f: impl FnOnce(&Region) -> R) -> BridgeResult<R> {
        let region = self.region.lock();
        match region.as_ref() {
            Some(region) => Ok(f(region)),
            None => Err(BridgeError::ManagerClosed),
        }
    }

    pub(crate) fn allocate_out<T: Copy>(&self, init: T) -> BridgeResult<Scratch<T>> {
        self.with_region(|region| region.alloc(init))
    }

    fn close(&self) -> BridgeResult<TeardownStats> {
        let mut stragglers: Vec<Arc<ResourceCore>> = {
            let _gate = self.gate.write();
            if self.closed.swap(true, Ordering::AcqRel) {
                return Ok(TeardownStats::default());
            }
            let drained = self
                .registry
                .iter()
                .map(|entry| Arc::clone(entry.value()))
                .collect();
            self.registry.clear();
            drained
        };

        // Newest first: later resources may depend on earlier ones
        stragglers.sort_unstable_by(|a, b| b.id().cmp(&a.id()));

        let mut errors = Vec::new();
        let mut stats = TeardownStats::with_timing(|| {
            let mut stats = TeardownStats::default();
            for core in &stragglers {
                match core.close() {
                    Ok(true) => stats.record(core.kind().as_str(), false),
                    Ok(false) => {}
                    Err(e) => {
                        warn!(id = core.id(), kind = %core.kind(), error = %e, "Straggler release failed");
                        stats.record(core.kind().as_str(), true);
                        errors.push(e);
                    }
                }
            }
            stats
        });

        stats.bytes_released = self.region.lock().take().map_or(0, Region::release);

        info!(
            manager = %self.id,
            disposed = stats.resources_disposed,
            errors = stats.errors_encountered,
            bytes = stats.bytes_released,
            micros = stats.duration_micros,
            "Resource manager closed"
        );

        warn_slow_teardown(
            &self.id.to_string(),
            std::time::Duration::from_micros(stats.duration_micros),
        );

        match BridgeError::aggregate(errors) {
            Some(err) => Err(err),
            None => Ok(stats),
        }
    }
}

/// Scope owning an allocation region and the resources created in it
///
/// Not `Clone`: exactly one owner decides when the scope ends. Resources keep
/// only a weak back-reference, so they never extend the scope.
pub struct ResourceManager {
    inner: Arc<ManagerInner>,
}

impl ResourceManager {
    /// Open a new scope; never fails
    pub fn create() -> Self {
        Self::with_region_capacity(DEFAULT_REGION_CAPACITY)
    }

    pub fn with_region_capacity(bytes: usize) -> Self {
        let inner = Arc::new(ManagerInner::new(bytes));
        debug!(manager = %inner.id, region_capacity = bytes, "Resource manager created");
        Self { inner }
    }

    pub fn from_config(config: &BridgeConfig) -> Self {
        Self::with_region_capacity(config.region_capacity)
    }

    #[inline]
    pub fn id(&self) -> ManagerId {
        self.inner.id
    }

    pub fn is_closed(&self) -> bool {
        self.inner.is_closed()
    }

    /// Number of registered, not yet released resources
    pub fn live_count(&self) -> usize {
        self.inner.registry.len()
    }

    /// Region bytes in use; zero after close
    pub fn allocated_bytes(&self) -> usize {
        self.inner
            .with_region(|region| region.allocated_bytes())
            .unwrap_or(0)
    }

    /// Register a resource adopted by this manager; repeated calls are no-ops
    pub fn register(&self, resource: &NativeResource) -> BridgeResult<()> {
        self.check_owner(resource)?;
        if resource.is_closed() {
            return Err(BridgeError::AlreadyClosed {
                kind: resource.kind(),
            });
        }
        self.inner.register(resource.core())
    }

    /// Remove a resource from the registry without releasing it
    ///
    /// Returns false when it was not registered. The resource then relies on
    /// its own `close` or drop for release.
    pub fn deregister(&self, resource: &NativeResource) -> bool {
        let removed = self.inner.deregister(resource.id());
        if removed {
            debug!(id = resource.id(), kind = %resource.kind(), "Resource deregistered");
        }
        removed
    }

    /// True when `resource` is currently registered here
    pub fn contains(&self, resource: &NativeResource) -> bool {
        self.inner
            .registry
            .get(&resource.id())
            .map_or(false, |entry| Arc::ptr_eq(entry.value(), resource.core()))
    }

    /// NUL-terminated copy of `value` for a `const char*` parameter
    pub fn allocate_string(&self, value: &str) -> BridgeResult<Scratch<c_char>> {
        self.inner.with_region(|region| region.alloc_c_string(value))?
    }

    /// Initialized out-parameter slot
    pub fn allocate_out<T: Copy>(&self, init: T) -> BridgeResult<Scratch<T>> {
        self.inner.allocate_out(init)
    }

    /// Array of raw handles for a `T**` list parameter
    pub fn allocate_handle_array(&self, handles: &[RawHandle]) -> BridgeResult<Scratch<*mut c_void>> {
        let pointers = handle_pointers(handles);
        self.inner.with_region(|region| region.alloc_slice(&pointers))
    }

    /// Array of NUL-terminated strings for a `const char**` parameter
    ///
    /// The strings live in the same region, kept alive by the returned buffer.
    pub fn allocate_string_array(&self, values: &[&str]) -> BridgeResult<Scratch<*const c_char>> {
        self.inner.with_region(|region| {
            let pointers = values
                .iter()
                .map(|value| region.alloc_c_string(value).map(|s| s.as_ptr()))
                .collect::<BridgeResult<Vec<_>>>()?;
            Ok(region.alloc_slice(&pointers))
        })?
    }

    /// End the scope
    ///
    /// Releases every still-registered resource (newest first), then the
    /// region. Every release is attempted; failures come back as one
    /// `Teardown` error. A second call is a no-op.
    pub fn close(&self) -> BridgeResult<TeardownStats> {
        self.inner.close()
    }

    pub(crate) fn inner(&self) -> &Arc<ManagerInner> {
        &self.inner
    }

    fn check_owner(&self, resource: &NativeResource) -> BridgeResult<()> {
        match resource.manager() {
            Ok(owner) if Arc::ptr_eq(&owner, &self.inner) => Ok(()),
            Ok(_) => Err(BridgeError::Argument(format!(
                "{} #{} belongs to another resource manager",
                resource.kind(),
                resource.id()
            ))),
            Err(e) => Err(e),
        }
    }
}

impl Default for ResourceManager {
    fn default() -> Self {
        Self::create()
    }
}

impl fmt::Debug for ResourceManager {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ResourceManager")
            .field("id", &self.inner.id)
            .field("closed", &self.is_closed())
            .field("live", &self.live_count())
            .finish()
    }
}

impl Drop for ResourceManager {
    fn drop(&mut self) {
        if self.is_closed() {
            return;
        }
        match self.close() {
            Ok(stats) if stats.resources_disposed > 0 => debug!(
                manager = %self.inner.id,
                disposed = stats.resources_disposed,
                "Resource manager released stragglers on drop"
            ),
            Ok(_) => {}
            Err(e) => warn!(manager = %self.inner.id, error = %e, "Resource manager drop had errors"),
        }
    }
}
