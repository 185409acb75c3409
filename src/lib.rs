/*!
 * Tsurugi Bridge Library
 * Resource-safe bindings core for the native Tsurugi client library
 *
 * Every native object obtained across the C boundary is wrapped exactly once,
 * released exactly once, and registered with a `ResourceManager` scope that
 * releases stragglers when it closes.
 */

pub mod context;
pub mod core;
pub mod ffi;
pub mod job;
pub mod monitoring;
pub mod resource;

// Re-exports
pub use context::{ErrorContext, NativeDiagnostic};
pub use crate::core::{
    BridgeConfig, BridgeError, BridgeResult, ErrorCategory, ManagerId, RawHandle, ResourceId,
    ResourceKind,
};
pub use ffi::{NativeLibrary, RcType, ReturnCode};
pub use job::{AsyncJob, CancellationHandle, TakenValue, VoidJob};
pub use monitoring::init_tracing;
pub use resource::{NativeObject, NativeResource, ResourceManager, Scratch, TeardownStats};
