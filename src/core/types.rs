/*!
 * Core Types
 * Handle, identity and duration types shared by every layer of the bridge
 */

use serde::{Deserialize, Serialize};
use std::ffi::c_void;
use std::fmt;
use std::ptr::NonNull;
use std::time::Duration;
use uuid::Uuid;

/// Manager-unique sequence number of a registered resource
///
/// Monotonically increasing per manager, so ordering by id is construction order.
pub type ResourceId = u64;

/// Native timeout unit
pub type Nanos = u64;

/// Common result type for bridge operations
pub type BridgeResult<T> = Result<T, super::errors::BridgeError>;

/// Convert a duration to native nanoseconds, saturating at `u64::MAX`
#[inline]
pub fn duration_to_nanos(timeout: Duration) -> Nanos {
    u64::try_from(timeout.as_nanos()).unwrap_or(u64::MAX)
}

/// Opaque, non-null handle to an object owned by the native library
///
/// The bridge never dereferences it; it is only handed back to native entry
/// points. Exclusive ownership is enforced by the wrapper that holds it.
#[derive(Clone, Copy, PartialEq, Eq, Hash)]
pub struct RawHandle(NonNull<c_void>);

// SAFETY: the pointer is an opaque token. All access to the pointee happens
// inside the native library, serialized by the owning wrapper's lock.
unsafe impl Send for RawHandle {}
unsafe impl Sync for RawHandle {}

impl RawHandle {
    /// Wrap a pointer returned by the native library; `None` for null
    #[inline]
    pub fn new(ptr: *mut c_void) -> Option<Self> {
        NonNull::new(ptr).map(Self)
    }

    #[inline]
    pub fn as_ptr(self) -> *mut c_void {
        self.0.as_ptr()
    }

    #[inline]
    pub fn addr(self) -> usize {
        self.0.as_ptr() as usize
    }
}

impl fmt::Debug for RawHandle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "RawHandle({:#x})", self.addr())
    }
}

/// Category of native object a resource wraps
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
pub enum ResourceKind {
    Context,
    Job,
    CancelJob,
    Value,
    /// Domain wrappers outside the core (connection options, statements, ...)
    Custom(&'static str),
}

impl ResourceKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            ResourceKind::Context => "Context",
            ResourceKind::Job => "Job",
            ResourceKind::CancelJob => "CancelJob",
            ResourceKind::Value => "Value",
            ResourceKind::Custom(name) => name,
        }
    }
}

impl fmt::Display for ResourceKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Identity of a resource manager scope
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct ManagerId(Uuid);

impl ManagerId {
    pub(crate) fn generate() -> Self {
        Self(Uuid::new_v4())
    }

    pub fn as_uuid(&self) -> Uuid {
        self.0
    }
}

impl fmt::Display for ManagerId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}
