/*!
 * Resource Lifecycle Tests
 * Exactly-once release through close, drop and manager teardown
 */

use pretty_assertions::assert_eq;
use std::sync::Arc;
use tsurugi_bridge::ffi::simulated::{self, DisposeProbe};
use tsurugi_bridge::{BridgeError, ErrorContext, NativeObject, RawHandle, ResourceKind, ResourceManager};

fn probed_context(manager: &ResourceManager, probe: &DisposeProbe) -> ErrorContext {
    let library = simulated::library();
    let handle = RawHandle::new(simulated::create_probed_context(probe))
        .expect("simulated context is never null");
    ErrorContext::adopt(&library, manager, handle).expect("Failed to adopt context")
}

#[test]
fn test_explicit_close_then_manager_close() {
    let manager = ResourceManager::create();
    let probe = DisposeProbe::new();
    let context = probed_context(&manager, &probe);

    context.close().expect("Failed to close context");
    assert_eq!(probe.count(), 1);
    assert!(context.is_closed());
    assert_eq!(manager.live_count(), 0);

    let stats = manager.close().expect("Failed to close manager");
    assert_eq!(stats.resources_disposed, 0);
    assert_eq!(probe.count(), 1, "manager must not dispose a closed context again");
}

#[test]
fn test_never_closed_resource_released_by_manager() {
    let manager = ResourceManager::create();
    let probe = DisposeProbe::new();
    let context = probed_context(&manager, &probe);
    assert_eq!(manager.live_count(), 1);

    let stats = manager.close().expect("Failed to close manager");
    assert_eq!(stats.resources_disposed, 1);
    assert_eq!(stats.by_kind.get("Context"), Some(&1));
    assert_eq!(probe.count(), 1);
    assert!(context.is_closed());

    // The wrapper outliving its scope must not release a second time
    drop(context);
    assert_eq!(probe.count(), 1);
}

#[test]
fn test_close_is_idempotent_through_trait() {
    let manager = ResourceManager::create();
    let probe = DisposeProbe::new();
    let context = probed_context(&manager, &probe);

    context.dispose().expect("first dispose");
    context.dispose().expect("second dispose");
    context.close().expect("close after dispose");

    assert_eq!(probe.count(), 1);
    assert_eq!(context.kind(), ResourceKind::Context);
}

#[test]
fn test_use_after_close_is_rejected() {
    let manager = ResourceManager::create();
    let probe = DisposeProbe::new();
    let context = probed_context(&manager, &probe);
    context.close().expect("Failed to close context");

    let err = context.return_code().expect_err("closed context must reject calls");
    assert!(matches!(
        err,
        BridgeError::AlreadyClosed {
            kind: ResourceKind::Context
        }
    ));
    assert_eq!(err.to_string(), "Context already closed");
}

#[test]
fn test_drop_without_close_releases_once() {
    let manager = ResourceManager::create();
    let probe = DisposeProbe::new();
    {
        let _context = probed_context(&manager, &probe);
        assert_eq!(manager.live_count(), 1);
    }
    assert_eq!(probe.count(), 1);
    assert_eq!(manager.live_count(), 0);

    manager.close().expect("Failed to close manager");
    assert_eq!(probe.count(), 1);
}

#[test]
fn test_dropping_manager_releases_stragglers() {
    let probe = DisposeProbe::new();
    let context = {
        let manager = ResourceManager::create();
        probed_context(&manager, &probe)
    };

    assert_eq!(probe.count(), 1);
    assert!(context.is_closed());
}

#[test]
fn test_scratch_outlives_manager() {
    let manager = ResourceManager::create();
    let name = manager.allocate_string("sql").expect("Failed to allocate string");
    manager.close().expect("Failed to close manager");

    let text = unsafe { std::ffi::CStr::from_ptr(name.as_ptr()) };
    assert_eq!(text.to_str().expect("valid utf-8"), "sql");
}

#[test]
fn test_release_runs_with_adopted_handle() {
    let manager = ResourceManager::create();
    let seen = Arc::new(parking_lot::Mutex::new(None));
    let sink = Arc::clone(&seen);
    let handle = RawHandle::new(0x1000 as *mut std::ffi::c_void).expect("non-null");

    let resource = tsurugi_bridge::NativeResource::adopt(
        &manager,
        handle,
        ResourceKind::Custom("Endpoint"),
        move |h| {
            *sink.lock() = Some(h);
            Ok(())
        },
    )
    .expect("Failed to adopt");
    resource.close().expect("Failed to close");

    assert_eq!(*seen.lock(), Some(handle));
    assert_eq!(resource.kind().to_string(), "Endpoint");
}
